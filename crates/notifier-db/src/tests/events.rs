use serde_json::json;

use super::test_db;
use crate::NewTwitchEvent;

fn online_event(event_id: Option<&str>, occurred_at: i64) -> NewTwitchEvent {
    NewTwitchEvent {
        event_id: event_id.map(str::to_string),
        event_type: "stream.online".into(),
        streamer_id: "123456".into(),
        streamer_name: "TestStreamer".into(),
        payload: json!({"id": event_id, "type": "live"}),
        occurred_at,
    }
}

#[test]
fn test_duplicate_event_id_is_ignored() {
    let db = test_db();
    assert!(db.record_twitch_event(&online_event(Some("stream-123"), 100)).unwrap());
    assert!(!db.record_twitch_event(&online_event(Some("stream-123"), 100)).unwrap());
    assert_eq!(db.count_twitch_events("stream.online").unwrap(), 1);
}

#[test]
fn test_events_without_id_are_never_deduplicated() {
    let db = test_db();
    let update = NewTwitchEvent {
        event_id: None,
        event_type: "channel.update".into(),
        streamer_id: "123456".into(),
        streamer_name: "TestStreamer".into(),
        payload: json!({"title": "same"}),
        occurred_at: 100,
    };
    assert!(db.record_twitch_event(&update).unwrap());
    assert!(db.record_twitch_event(&update).unwrap());
    assert_eq!(db.count_twitch_events("channel.update").unwrap(), 2);
}

#[test]
fn test_recent_events_newest_first_with_limit() {
    let db = test_db();
    for i in 0..5 {
        db.record_twitch_event(&online_event(Some(&format!("s-{i}")), 100 + i))
            .unwrap();
    }

    let events = db.recent_events_for_streamer("123456", 3).unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].event_id.as_deref(), Some("s-4"));
    assert_eq!(events[2].event_id.as_deref(), Some("s-2"));
    assert_eq!(events[0].payload["type"], "live");
    assert!(events[0].received_at > 0);

    assert!(db.recent_events_for_streamer("other", 10).unwrap().is_empty());
}
