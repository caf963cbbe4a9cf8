#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use cfgtx_core::{DataNode, ErrorTag, RpcError, Transaction, TxError, TxState};
use std::sync::Arc;
use std::time::Duration;

use cfgtx_netconf::{Fault, NetconfTransaction, RpcCall};
use common::{device, items, open, path, queued_calls, read_count, schema, StalledEdits};

#[tokio::test]
async fn test_commit_runs_lock_edits_commit_unlock() {
    // GIVEN an open transaction with two edits
    let device = device();
    let mut tx = open(&device);
    tx.merge(&path("/top"), DataNode::container("top"))
        .await
        .unwrap();
    tx.create(&path("/top/mtu"), DataNode::leaf("mtu", 1500i64))
        .await
        .unwrap();

    // WHEN it commits
    let info = tx.commit().await.unwrap();

    // THEN the device saw the calls in order and running holds the data
    assert_eq!(
        queued_calls(&device),
        vec!["lock", "merge", "create", "commit", "unlock"]
    );
    assert!(info.warnings.is_empty());
    assert!(device.running().contains(&path("/top/mtu")));
    assert!(!device.is_locked());
    assert_eq!(tx.state(), TxState::Committed);
}

#[tokio::test]
async fn test_collection_create_expands_to_entries() {
    let device = device();
    let mut tx = open(&device);

    tx.create(&path("/top/item"), items(&["a", "b"]))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(
        queued_calls(&device),
        vec!["lock", "merge", "create", "create", "commit", "unlock"]
    );
    assert!(device.running().contains(&path("/top/item/item[name=b]")));
}

#[tokio::test]
async fn test_warnings_do_not_abort() {
    // GIVEN a device that answers the merge with a warning
    let device = device();
    device.inject(
        "merge",
        Fault::Warning(RpcError::warning(ErrorTag::InUse, "value normalized")),
    );
    let mut tx = open(&device);
    tx.merge(&path("/top"), DataNode::container("top"))
        .await
        .unwrap();

    // WHEN the transaction commits
    let info = tx.commit().await.unwrap();

    // THEN the commit goes through and the warning is handed back
    assert_eq!(info.warnings.len(), 1);
    assert_eq!(info.warnings[0].message, "value normalized");
    assert!(queued_calls(&device).contains(&"commit"));
    assert!(device.running().contains(&path("/top")));
}

#[tokio::test]
async fn test_failed_edit_is_compensated_without_commit() {
    // GIVEN a device that already holds the leaf being created
    let device = device();
    device
        .seed_running(&path("/top/mtu"), DataNode::leaf("mtu", 1500i64))
        .unwrap();
    let mut tx = open(&device);
    tx.create(&path("/top/mtu"), DataNode::leaf("mtu", 9000i64))
        .await
        .unwrap();

    // WHEN the transaction commits
    let err = tx.commit().await.unwrap_err();

    // THEN edits are discarded, the lock released and commit never sent
    assert_eq!(
        queued_calls(&device),
        vec!["lock", "create", "discard-changes", "unlock"]
    );
    assert!(matches!(err, TxError::CommitFailed { .. }));
    assert_eq!(err.rpc_errors()[0].tag, ErrorTag::DataExists);
    assert!(!device.is_locked());
}

#[tokio::test]
async fn test_lock_failure_short_circuits_edits() {
    // GIVEN a device that refuses the lock
    let device = device();
    device.inject(
        "lock",
        Fault::Error(RpcError::error(ErrorTag::LockDenied, "held by session 4")),
    );
    let mut tx = open(&device);
    tx.merge(&path("/top"), DataNode::container("top"))
        .await
        .unwrap();

    // WHEN the transaction commits
    let err = tx.commit().await.unwrap_err();

    // THEN the edit never reached the device and nothing is compensated
    assert!(matches!(err, TxError::LockDenied { .. }));
    assert_eq!(err.code(), "ERR_LOCK_DENIED");
    assert_eq!(queued_calls(&device), vec!["lock"]);
    assert!(!tx.is_locked());
}

#[tokio::test]
async fn test_transport_failure_is_reported_after_compensation() {
    let device = device();
    device.inject("merge", Fault::Transport("connection reset".to_string()));
    let mut tx = open(&device);
    tx.merge(&path("/top"), DataNode::container("top"))
        .await
        .unwrap();
    tx.merge(&path("/top/mtu"), DataNode::leaf("mtu", 1i64))
        .await
        .unwrap();

    let err = tx.commit().await.unwrap_err();

    assert!(matches!(err, TxError::Transport { .. }));
    assert_eq!(err.code(), "ERR_TRANSPORT_FAILURE");
    // the second merge inherits the failure and is never sent
    assert_eq!(
        queued_calls(&device),
        vec!["lock", "merge", "discard-changes", "unlock"]
    );
}

#[tokio::test]
async fn test_rejected_commit_is_compensated() {
    let device = device();
    device.inject(
        "commit",
        Fault::Error(RpcError::error(ErrorTag::OperationFailed, "validation failed")),
    );
    let mut tx = open(&device);
    tx.merge(&path("/top"), DataNode::container("top"))
        .await
        .unwrap();

    let err = tx.commit().await.unwrap_err();

    assert!(matches!(err, TxError::CommitFailed { .. }));
    assert!(err.to_string().contains("validation failed"));
    assert_eq!(
        queued_calls(&device),
        vec!["lock", "merge", "commit", "discard-changes", "unlock"]
    );
    assert!(device.running().top_level().is_empty());
}

#[tokio::test]
async fn test_cancel_discards_and_unlocks() {
    // GIVEN a transaction with a queued edit
    let device = device();
    let mut tx = open(&device);
    tx.merge(&path("/top"), DataNode::container("top"))
        .await
        .unwrap();

    // WHEN it is cancelled
    tx.cancel().await.unwrap();

    // THEN the candidate is reverted and the lock released
    assert_eq!(
        queued_calls(&device),
        vec!["lock", "merge", "discard-changes", "unlock"]
    );
    assert!(device.candidate().top_level().is_empty());
    assert!(!device.is_locked());
    assert_eq!(tx.state(), TxState::Cancelled);
}

#[tokio::test]
async fn test_cancel_abandons_unanswered_edits() {
    // GIVEN a transaction whose queued edit never gets a reply
    let device = device();
    let mut tx = NetconfTransaction::new(Arc::new(StalledEdits(device.clone())), schema());
    tx.merge(&path("/top"), DataNode::container("top"))
        .await
        .unwrap();

    // WHEN it is cancelled
    let cancelled = tokio::time::timeout(Duration::from_secs(2), tx.cancel()).await;

    // THEN cancel returns without the edit and still releases the lock
    assert!(cancelled.is_ok(), "cancel waited for an unanswered edit");
    cancelled.unwrap().unwrap();
    assert_eq!(
        queued_calls(&device),
        vec!["lock", "discard-changes", "unlock"]
    );
    assert!(!device.is_locked());
    assert_eq!(tx.state(), TxState::Cancelled);
}

#[tokio::test]
async fn test_terminal_state_rejects_every_call() {
    // GIVEN a committed transaction
    let device = device();
    let mut tx = open(&device);
    tx.merge(&path("/top"), DataNode::container("top"))
        .await
        .unwrap();
    tx.commit().await.unwrap();
    let calls = device.journal().len();

    // WHEN it is used again
    let results = [
        tx.commit().await.map(|_| ()),
        tx.cancel().await,
        tx.merge(&path("/top"), DataNode::container("top")).await,
        tx.delete(&path("/top")).await,
    ];

    // THEN every call fails with IllegalState and the device saw nothing
    for result in results {
        assert_eq!(result.unwrap_err().code(), "ERR_ILLEGAL_STATE");
    }
    assert_eq!(device.journal().len(), calls);
}

#[tokio::test]
async fn test_list_delete_issues_one_edit_per_entry() {
    // GIVEN a device holding entries a and b
    let device = device();
    device
        .seed_running(&path("/top/item"), items(&["a", "b"]))
        .unwrap();
    let mut tx = open(&device);

    // WHEN the whole list is deleted
    tx.delete(&path("/top/item")).await.unwrap();
    tx.commit().await.unwrap();

    // THEN each entry was deleted individually
    let deleted: Vec<String> = device
        .journal()
        .into_iter()
        .filter_map(|call| match call {
            RpcCall::Edit {
                operation: "delete",
                path,
            } => Some(path.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(
        deleted,
        vec!["/top/item/item[name=a]", "/top/item/item[name=b]"]
    );
    assert!(device
        .running()
        .get(&path("/top/item"))
        .and_then(DataNode::children)
        .map_or(true, |entries| entries.is_empty()));
}

#[tokio::test]
async fn test_empty_list_removal_emits_no_edit() {
    let device = device();
    let mut tx = open(&device);

    tx.remove(&path("/top/item")).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(queued_calls(&device), vec!["lock", "commit", "unlock"]);
}

#[tokio::test]
async fn test_read_list_result_is_reused_for_removal() {
    // GIVEN a list that was already read through the transaction
    let device = device();
    device
        .seed_running(&path("/top/item"), items(&["a"]))
        .unwrap();
    let mut tx = open(&device);
    let list = tx.read_list(&path("/top/item")).await.unwrap().unwrap();
    assert_eq!(list.children().unwrap().len(), 1);

    // WHEN the list is removed
    tx.remove(&path("/top/item")).await.unwrap();

    // THEN no second read was needed
    assert_eq!(read_count(&device), 1);
    tx.commit().await.unwrap();
    assert!(device
        .running()
        .get(&path("/top/item/item[name=a]"))
        .is_none());
}
