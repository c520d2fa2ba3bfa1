//! Discovery announcement tests.

mod common;

use std::sync::Arc;

use common::*;
use lumibridge_devices::{catalog, ENTITIES};
use lumibridge_sync::{DiscoveryPublisher, SyncEngine, Topics};
use serde_json::Value;

fn announcements(publisher: &RecordingPublisher) -> Vec<(String, String)> {
    publisher
        .published()
        .into_iter()
        .filter(|(topic, payload, _)| topic.ends_with("/config") && !payload.is_empty())
        .map(|(topic, payload, _)| (topic, payload))
        .collect()
}

fn plain_entity_count() -> usize {
    ENTITIES
        .iter()
        .filter(|e| !catalog::is_composite_key(e.attr))
        .count()
}

#[tokio::test]
async fn test_announcement_count_with_spotlight() {
    let publisher = Arc::new(RecordingPublisher::default());
    let discovery = DiscoveryPublisher::new(publisher.clone(), Topics::new("homeassistant"));
    let device = bridged(true);

    let count = discovery
        .announce(&device.identity, device.capabilities)
        .await
        .unwrap();

    assert_eq!(count, plain_entity_count() + 1 + 4);
    assert_eq!(announcements(&publisher).len(), count);
    assert_eq!(
        publisher.subscriptions(),
        vec![format!("homeassistant/+/{}/+/set", SLUG)]
    );
}

#[tokio::test]
async fn test_announcement_count_without_spotlight() {
    let publisher = Arc::new(RecordingPublisher::default());
    let discovery = DiscoveryPublisher::new(publisher.clone(), Topics::new("homeassistant"));
    let device = bridged(false);

    let count = discovery
        .announce(&device.identity, device.capabilities)
        .await
        .unwrap();

    assert_eq!(count, plain_entity_count() + 4);
    assert_eq!(announcements(&publisher).len(), count);

    // a stale spotlight announcement is cleared
    let light_config = format!("homeassistant/light/{}/spotlight/config", SLUG);
    assert_eq!(publisher.payloads_for(&light_config), vec![String::new()]);
}

#[tokio::test]
async fn test_all_announcements_retained() {
    let publisher = Arc::new(RecordingPublisher::default());
    let discovery = DiscoveryPublisher::new(publisher.clone(), Topics::new("homeassistant"));
    let device = bridged(true);

    discovery
        .announce(&device.identity, device.capabilities)
        .await
        .unwrap();

    assert!(publisher.published().iter().all(|(_, _, retain)| *retain));
}

#[tokio::test]
async fn test_storage_announcements() {
    let publisher = Arc::new(RecordingPublisher::default());
    let discovery = DiscoveryPublisher::new(publisher.clone(), Topics::new("homeassistant"));

    discovery
        .publish_storage_discovery(&bridged(false).identity)
        .await
        .unwrap();

    let topics: Vec<String> = announcements(&publisher).into_iter().map(|(t, _)| t).collect();
    assert_eq!(
        topics,
        ["sdcard_total", "sdcard_free", "sdcard_status", "sdcard_percent"]
            .iter()
            .map(|attr| format!("homeassistant/sensor/{}/{}/config", SLUG, attr))
            .collect::<Vec<_>>()
    );

    let percent: Value = serde_json::from_str(&announcements(&publisher)[3].1).unwrap();
    assert_eq!(percent["unit_of_measurement"], "%");
    assert_eq!(
        percent["state_topic"],
        format!("homeassistant/sensor/{}/sdcard_percent/state", SLUG)
    );
}

#[tokio::test]
async fn test_replay_is_byte_identical() {
    let adapter = Arc::new(FakeAdapter::default());
    let publisher = Arc::new(RecordingPublisher::default());
    let engine = SyncEngine::new(adapter, publisher.clone(), vec![bridged(true)], "homeassistant");

    assert_eq!(engine.announce_all().await, 1);
    let first = publisher.published();
    publisher.clear();

    assert_eq!(engine.announce_all().await, 1);
    let second = publisher.published();

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_custom_prefix() {
    let publisher = Arc::new(RecordingPublisher::default());
    let discovery = DiscoveryPublisher::new(publisher.clone(), Topics::new("ha"));
    let device = bridged(false);

    discovery
        .announce(&device.identity, device.capabilities)
        .await
        .unwrap();

    assert!(publisher.published().iter().all(|(t, _, _)| t.starts_with("ha/")));
    assert_eq!(publisher.subscriptions(), vec![format!("ha/+/{}/+/set", SLUG)]);
}
