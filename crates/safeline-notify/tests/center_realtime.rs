//! Notification center fed by a realtime channel.

use std::sync::Arc;

use serde_json::json;

use safeline_notify::{NotificationCenter, NotificationKind, NotifyConfig};
use safeline_realtime::{ChangeEvent, ChannelRegistry, LocalTransport, RealtimeConfig};

struct TestContext {
    transport: Arc<LocalTransport>,
    registry: ChannelRegistry,
    center: Arc<NotificationCenter>,
    _dir: tempfile::TempDir,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(LocalTransport::new().with_auto_connect());
        let registry = ChannelRegistry::new(transport.clone(), RealtimeConfig::default()).unwrap();
        let config = NotifyConfig::new(dir.path().join("settings.json"));
        let center = Arc::new(NotificationCenter::open(config).unwrap());

        Self {
            transport,
            registry,
            center,
            _dir: dir,
        }
    }

    fn publish(&self, event: ChangeEvent) {
        self.transport.publish("notifications", &event);
    }
}

#[test]
fn test_inserted_rows_become_notifications() {
    let ctx = TestContext::new();
    let _handle = ctx.center.listen(&ctx.registry);
    assert!(ctx.registry.is_connected("notifications"));

    ctx.publish(ChangeEvent::insert(
        "notifications",
        json!({"id": "n-1", "kind": "sos", "title": "SOS from Sam", "body": "Near the station"}),
    ));
    ctx.publish(ChangeEvent::insert(
        "notifications",
        json!({"id": "n-2", "kind": "guardian", "title": "Alex accepted your invite"}),
    ));

    let list = ctx.center.list();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].id, "n-2");
    assert_eq!(list[1].kind, NotificationKind::Sos);
    assert_eq!(ctx.center.unread_count(), 2);
}

#[test]
fn test_updates_and_deletes_follow_the_feed() {
    let ctx = TestContext::new();
    let _handle = ctx.center.listen(&ctx.registry);

    ctx.publish(ChangeEvent::insert(
        "notifications",
        json!({"id": "n-1", "kind": "diary", "title": "Log your walk home"}),
    ));
    ctx.publish(ChangeEvent::update(
        "notifications",
        json!({"id": "n-1", "kind": "diary", "title": "Log your walk home", "read": true}),
        None,
    ));
    assert_eq!(ctx.center.unread_count(), 0);
    assert_eq!(ctx.center.len(), 1);

    ctx.publish(ChangeEvent::delete("notifications", json!({"id": "n-1"})));
    assert!(ctx.center.is_empty());
}

#[test]
fn test_bad_rows_are_skipped() {
    let ctx = TestContext::new();
    let _handle = ctx.center.listen(&ctx.registry);

    ctx.publish(ChangeEvent::insert("notifications", json!({"title": "no id"})));
    ctx.publish(ChangeEvent::insert(
        "notifications",
        json!({"id": "n-2", "kind": "system", "title": "Welcome"}),
    ));

    assert_eq!(ctx.center.len(), 1);
}

#[test]
fn test_muted_kinds_are_dropped() {
    let ctx = TestContext::new();
    let _handle = ctx.center.listen(&ctx.registry);
    ctx.center
        .update_settings(|settings| settings.guardian_updates = false)
        .unwrap();

    ctx.publish(ChangeEvent::insert(
        "notifications",
        json!({"id": "n-1", "kind": "guardian", "title": "Location shared"}),
    ));

    assert!(ctx.center.is_empty());
}

#[test]
fn test_update_to_muted_kind_removes_row() {
    let ctx = TestContext::new();
    let _handle = ctx.center.listen(&ctx.registry);
    ctx.center
        .update_settings(|settings| settings.guardian_updates = false)
        .unwrap();

    ctx.publish(ChangeEvent::insert(
        "notifications",
        json!({"id": "n", "kind": "sos", "title": "SOS from Sam"}),
    ));
    ctx.publish(ChangeEvent::update(
        "notifications",
        json!({"id": "n", "kind": "guardian", "title": "Sam shared a location"}),
        None,
    ));

    assert!(ctx.center.is_empty());
    assert_eq!(ctx.center.unread_count(), 0);
}

#[test]
fn test_dropping_handle_stops_listening() {
    let ctx = TestContext::new();
    let handle = ctx.center.listen(&ctx.registry);
    drop(handle);

    assert_eq!(ctx.registry.subscriber_count("notifications"), 0);
    assert_eq!(ctx.transport.close_count(), 1);

    ctx.publish(ChangeEvent::insert(
        "notifications",
        json!({"id": "n-1", "kind": "system", "title": "Ignored"}),
    ));
    assert!(ctx.center.is_empty());
}
