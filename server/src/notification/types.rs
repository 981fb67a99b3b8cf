//! Notification type definitions.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use twitch_client::eventsub::ChannelUpdateEvent;

const TWITCH_WEB_BASE: &str = "https://twitch.tv";
const VIEW_STREAM_ACTION: &str = "View Stream";

/// A push notification as handed to the delivery sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub url: String,
    pub action: String,
}

fn channel_url(login: &str) -> String {
    format!("{TWITCH_WEB_BASE}/{login}")
}

fn update_line(update: &ChannelUpdateEvent) -> String {
    format!("- \"{}\" ({})", update.title, update.category_name)
}

impl PushMessage {
    pub fn stream_started(streamer_name: &str) -> Self {
        Self {
            title: "Stream started!".into(),
            body: format!("Streamer {streamer_name} started a stream"),
            url: channel_url(streamer_name),
            action: VIEW_STREAM_ACTION.into(),
        }
    }

    /// Single channel update, stamped with the local time it was received.
    pub fn channel_updated<Tz: TimeZone>(update: &ChannelUpdateEvent, received_at: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        let login = &update.broadcaster_user_login;
        Self {
            title: format!("{login} updated their channel"),
            body: format!(
                "Title changed to \"{}\" ({}) ({})",
                update.title,
                update.category_name,
                received_at.format("%H:%M")
            ),
            url: channel_url(login),
            action: VIEW_STREAM_ACTION.into(),
        }
    }

    /// Summary of a batch of updates, oldest first. Identical title/category
    /// lines are shown once; the header counts every update.
    pub fn channel_updates_batched(updates: &[ChannelUpdateEvent]) -> Option<Self> {
        let latest = updates.last()?;
        let login = &latest.broadcaster_user_login;

        let mut lines: Vec<String> = Vec::with_capacity(updates.len());
        for line in updates.iter().map(update_line) {
            if !lines.contains(&line) {
                lines.push(line);
            }
        }
        let mut body = lines.join("\n");
        if updates.len() > 1 {
            body = format!("{} changes\n{body}", updates.len());
        }

        Some(Self {
            title: format!("{login} updated their channel"),
            body,
            url: channel_url(login),
            action: VIEW_STREAM_ACTION.into(),
        })
    }
}
