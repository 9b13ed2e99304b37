use super::*;
use time::macros::datetime;

fn note(id: &str, minute: u8, is_read: bool) -> NotificationRecord {
    NotificationRecord {
        id: id.to_owned(),
        subject: format!("subject {id}"),
        name: "Visitor".to_owned(),
        email: "v@example.test".to_owned(),
        message: "hello".to_owned(),
        created_at: Some(datetime!(2026-10-18 09:00 UTC) + time::Duration::minutes(i64::from(minute))),
        is_read,
    }
}

#[test]
fn snapshot_sorts_most_recent_first() {
    let mut inbox = NotificationReconciler::new();
    inbox.apply_snapshot(vec![note("a", 1, false), note("c", 30, false), note("b", 10, true)]);
    let ids: Vec<_> = inbox.items().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, ["c", "b", "a"]);
    assert_eq!(inbox.unread_count(), 2);
    assert!(inbox.is_loaded());
}

#[test]
fn contact_count_update_requests_snapshot() {
    let mut inbox = NotificationReconciler::new();
    let contact = PushEvent::CountUpdate { model: CONTACT_KEY.to_owned(), count: 4 };
    let blog = PushEvent::CountUpdate { model: "blog".to_owned(), count: 4 };
    assert_eq!(inbox.apply_push(&contact), PushOutcome::NeedsSnapshot);
    assert_eq!(inbox.apply_push(&blog), PushOutcome::Unchanged);
    assert!(!inbox.accepts(&blog));
}

#[test]
fn confirm_read_removes_from_unread() {
    let mut inbox = NotificationReconciler::new();
    inbox.apply_snapshot(vec![note("a", 1, false), note("b", 2, false)]);

    assert!(inbox.confirm_read("a"));
    assert_eq!(inbox.unread().map(|n| n.id.as_str()).collect::<Vec<_>>(), ["b"]);
    assert!(!inbox.confirm_read("a"));
    assert!(!inbox.confirm_read("missing"));
    assert_eq!(inbox.items().len(), 2);
}
