#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use cfgtx_core::logging_facility::test_capture::init_test_capture;
use cfgtx_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use common::{broker_strategy, item, item_path, path};

#[tokio::test]
async fn test_put_emits_start_and_end() {
    // GIVEN log capture
    let capture = init_test_capture();
    let (_, _, strategy) = broker_strategy(&[]);

    // WHEN a put succeeds
    strategy.put(&item_path("a"), item("a"), None).await.unwrap();

    // THEN exactly one start and one end event carry the operation
    let events = capture.events_for_op("put");
    let starts: Vec<_> = events
        .iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_START))
        .collect();
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0].field("path"), Some("/top/item/item[name=a]"));
    capture.assert_event_exists("put", EVENT_END);
    let end = events
        .iter()
        .find(|e| e.event.as_deref() == Some(EVENT_END))
        .unwrap();
    assert!(end.field("duration_ms").is_some());
}

#[tokio::test]
async fn test_failed_delete_emits_error_event_with_code() {
    let capture = init_test_capture();
    let (_, _, strategy) = broker_strategy(&[]);

    strategy.delete(&path("/top/mtu")).await.unwrap_err();

    capture.assert_event_exists("delete", EVENT_START);
    let events = capture.events_for_op("delete");
    let error = events
        .iter()
        .find(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("error event");
    assert_eq!(error.field("err_code"), Some("ERR_DATA_MISSING"));
    assert!(!events
        .iter()
        .any(|e| e.event.as_deref() == Some(EVENT_END)));
}
