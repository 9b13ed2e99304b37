use super::*;
use crate::api::types::ActivityKind;
use serde_json::json;

#[test]
fn decodes_count_update() {
    let event = PushEvent::decode(COUNT_UPDATE, &[json!({"model": "blog", "count": 5})]).unwrap();
    assert_eq!(event, Some(PushEvent::CountUpdate { model: "blog".into(), count: 5 }));
}

#[test]
fn decodes_new_activity() {
    let payload = json!({"_id": "a1", "type": "publish", "action": "Published post", "createdAt": "2026-10-18T09:30:00Z"});
    let Some(PushEvent::NewActivity(record)) = PushEvent::decode(NEW_ACTIVITY, &[payload]).unwrap() else {
        panic!("expected activity");
    };
    assert_eq!(record.id, "a1");
    assert_eq!(record.kind, ActivityKind::Publish);
}

#[test]
fn unknown_event_is_ignored() {
    assert_eq!(PushEvent::decode("presence", &[json!({})]).unwrap(), None);
}

#[test]
fn malformed_count_is_an_error() {
    let err = PushEvent::decode(COUNT_UPDATE, &[json!({"model": "blog", "count": "many"})]).unwrap_err();
    assert_eq!(err.event, COUNT_UPDATE);
    assert!(PushEvent::decode(COUNT_UPDATE, &[]).is_err());
}
