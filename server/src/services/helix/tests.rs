use twitch_client::api::ScheduleData;

use super::*;
use crate::test_support::FakeHelix;

fn segment(id: &str, start: &str, canceled: bool) -> ScheduleSegment {
    ScheduleSegment {
        id: id.into(),
        start_time: start.into(),
        end_time: None,
        title: format!("Segment {id}"),
        canceled_until: canceled.then(|| "2099-12-31T00:00:00Z".to_string()),
        category: None,
        is_recurring: true,
    }
}

fn schedule(broadcaster_id: &str, segments: Vec<ScheduleSegment>) -> BroadcastSchedule {
    BroadcastSchedule {
        data: ScheduleData {
            segments: Some(segments),
            broadcaster_id: broadcaster_id.into(),
            broadcaster_name: format!("Streamer{broadcaster_id}"),
            broadcaster_login: format!("streamer{broadcaster_id}"),
        },
    }
}

fn cached(fake: &Arc<FakeHelix>) -> CachedHelix {
    CachedHelix::new(fake.clone(), CacheStore::new())
}

#[tokio::test]
async fn followed_channels_are_fetched_once() {
    let fake = Arc::new(FakeHelix::default());
    fake.followed.lock().unwrap().push(FollowedChannel {
        broadcaster_id: "123456".into(),
        broadcaster_login: "teststreamer".into(),
        broadcaster_name: "TestStreamer".into(),
        followed_at: "2024-01-01T00:00:00Z".into(),
    });
    let helix = cached(&fake);

    let first = helix.followed_channels("user-token", "9001").await.unwrap();
    let second = helix.followed_channels("user-token", "9001").await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(second[0].broadcaster_login, "teststreamer");
    assert_eq!(fake.calls(), vec!["followed:9001"]);
}

#[tokio::test(start_paused = true)]
async fn followed_streams_honour_the_requested_ttl() {
    let fake = Arc::new(FakeHelix::default());
    let helix = cached(&fake);

    helix
        .followed_streams("user-token", "9001", Duration::from_secs(120))
        .await
        .unwrap();
    tokio::time::advance(Duration::from_secs(119)).await;
    helix
        .followed_streams("user-token", "9001", Duration::from_secs(120))
        .await
        .unwrap();
    tokio::time::advance(Duration::from_secs(2)).await;
    helix
        .followed_streams("user-token", "9001", Duration::from_secs(120))
        .await
        .unwrap();

    assert_eq!(fake.calls(), vec!["streams:9001", "streams:9001"]);
}

#[tokio::test(start_paused = true)]
async fn missing_schedule_is_cached_for_half_as_long() {
    let fake = Arc::new(FakeHelix::default());
    let helix = cached(&fake);

    assert!(helix.broadcast_schedule("app", "123456").await.unwrap().is_none());
    assert!(helix.broadcast_schedule("app", "123456").await.unwrap().is_none());
    assert_eq!(fake.calls().len(), 1);

    tokio::time::advance(BROADCAST_SCHEDULE_TTL / 2 + Duration::from_secs(1)).await;
    assert!(helix.broadcast_schedule("app", "123456").await.unwrap().is_none());
    assert_eq!(fake.calls().len(), 2);
}

#[tokio::test]
async fn scheduled_streams_pick_next_live_segment_soonest_first() {
    let fake = Arc::new(FakeHelix::default());
    {
        let mut schedules = fake.schedules.lock().unwrap();
        schedules.insert(
            "1".into(),
            schedule(
                "1",
                vec![
                    segment("past", "2020-01-01T18:00:00Z", false),
                    segment("cancelled", "2098-01-01T18:00:00Z", true),
                    segment("later", "2099-03-01T18:00:00Z", false),
                ],
            ),
        );
        schedules.insert(
            "2".into(),
            schedule("2", vec![segment("soon", "2099-01-01T18:00:00Z", false)]),
        );
        schedules.insert(
            "3".into(),
            schedule("3", vec![segment("gone", "2020-05-01T18:00:00Z", false)]),
        );
    }
    let helix = cached(&fake);

    let ids: Vec<String> = ["1", "2", "3", "4"].iter().map(|s| s.to_string()).collect();
    let upcoming = helix.scheduled_streams_for("app", &ids).await;

    let picked: Vec<(&str, &str)> = upcoming
        .iter()
        .map(|s| (s.broadcaster_id.as_str(), s.segment.id.as_str()))
        .collect();
    assert_eq!(picked, vec![("2", "soon"), ("1", "later")]);
}
