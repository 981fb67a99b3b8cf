//! Plain-text report of the live channels a user follows.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use twitch_client::api::StreamInfo;

/// Markdown summary, most watched first.
pub fn format_live_streams(streams: &[StreamInfo], now: DateTime<Utc>) -> String {
    if streams.is_empty() {
        return "No streamers are currently live.".to_string();
    }

    let mut sorted: Vec<&StreamInfo> = streams.iter().collect();
    sorted.sort_by(|a, b| b.viewer_count.cmp(&a.viewer_count));
    let total_viewers: u64 = streams.iter().map(|s| s.viewer_count).sum();

    let mut out = format!(
        "## Currently Live Streamers ({})\nTotal viewers: {}\n\n",
        streams.len(),
        group_thousands(total_viewers)
    );
    for stream in sorted {
        let name = if stream.user_name.is_empty() {
            &stream.user_login
        } else {
            &stream.user_name
        };
        let _ = writeln!(out, "### {name}");
        let _ = writeln!(out, "- Title: {}", stream.title);
        let _ = writeln!(out, "- Game: {}", stream.game_name);
        let _ = writeln!(out, "- Viewers: {}", group_thousands(stream.viewer_count));
        if let Some(started) = stream.started_at.as_deref().and_then(parse_time) {
            let _ = writeln!(out, "- Started: {}", ago(now, started));
        }
        let _ = writeln!(out, "- Language: {}", stream.language);
        if stream.is_mature {
            out.push_str("- Mature content: Yes\n");
        }
        out.push('\n');
    }
    out
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn ago(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let minutes = (now - then).num_minutes().max(0);
    match minutes {
        0 => "just now".to_string(),
        m if m < 60 => format!("{m}m ago"),
        m if m < 24 * 60 => format!("{}h ago", m / 60),
        m => format!("{}d ago", m / (24 * 60)),
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
