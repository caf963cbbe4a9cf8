//! In-memory data broker
//!
//! Each read-write transaction works on a private copy of the datastores
//! taken when it was opened and journals its writes. Commit replays the
//! journal onto the current broker state under the write lock, so the last
//! committer wins on overlapping paths. A failed commit leaves the broker
//! untouched.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use cfgtx_core::errors::Result as TxResult;
use cfgtx_core::model::{DataNode, DataPath, DataTree, Datastore};
use cfgtx_core::ops::EditOperation;
use cfgtx_core::transaction::DataReader;

use crate::broker::{BrokerReadTx, BrokerReadWriteTx, DataBroker};
use crate::errors::{BrokerError, CommitFailure, Result};
use crate::hook::{BrokerCommitHook, NoopCommitHook};

type Stores = HashMap<Datastore, DataTree>;

struct BrokerState {
    stores: RwLock<Stores>,
    hook: Arc<dyn BrokerCommitHook>,
    next_tx: AtomicU64,
    commits: AtomicU64,
}

impl BrokerState {
    fn snapshot(&self) -> Stores {
        self.stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[derive(Clone)]
pub struct MemoryBroker {
    state: Arc<BrokerState>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::with_hook(Arc::new(NoopCommitHook))
    }

    pub fn with_hook(hook: Arc<dyn BrokerCommitHook>) -> Self {
        Self {
            state: Arc::new(BrokerState {
                stores: RwLock::new(Stores::new()),
                hook,
                next_tx: AtomicU64::new(1),
                commits: AtomicU64::new(0),
            }),
        }
    }

    /// Write data directly, bypassing transactions and the commit hook
    ///
    /// # Errors
    ///
    /// `InvalidWrite` when the node does not fit the path.
    pub fn seed(&self, store: Datastore, path: &DataPath, data: DataNode) -> Result<()> {
        let mut stores = self
            .state
            .stores
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        stores
            .entry(store)
            .or_default()
            .put(path, data)
            .map_err(|err| BrokerError::InvalidWrite(err.to_string()))
    }

    /// Copy of the committed content of `store`
    pub fn snapshot(&self, store: Datastore) -> DataTree {
        self.state
            .stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&store)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of successful commits
    pub fn commit_count(&self) -> u64 {
        self.state.commits.load(Ordering::Acquire)
    }

    fn next_tx_id(&self) -> String {
        self.state.next_tx.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

impl DataBroker for MemoryBroker {
    fn new_read_write_transaction(&self) -> Arc<dyn BrokerReadWriteTx> {
        let tx_id = self.next_tx_id();
        tracing::debug!(broker_tx = %tx_id, "opened read-write broker transaction");
        Arc::new(MemoryReadWriteTx {
            tx_id,
            broker: Arc::clone(&self.state),
            inner: Mutex::new(WriteState {
                view: self.state.snapshot(),
                journal: Vec::new(),
                closed: false,
            }),
        })
    }

    fn new_read_only_transaction(&self) -> Arc<dyn BrokerReadTx> {
        Arc::new(MemoryReadTx {
            view: self.state.snapshot(),
        })
    }
}

struct MemoryReadTx {
    view: Stores,
}

#[async_trait]
impl DataReader for MemoryReadTx {
    async fn read(&self, store: Datastore, path: &DataPath) -> TxResult<Option<DataNode>> {
        Ok(self.view.get(&store).and_then(|tree| tree.get(path)).cloned())
    }
}

impl BrokerReadTx for MemoryReadTx {}

struct WriteState {
    view: Stores,
    journal: Vec<(Datastore, EditOperation)>,
    closed: bool,
}

struct MemoryReadWriteTx {
    tx_id: String,
    broker: Arc<BrokerState>,
    inner: Mutex<WriteState>,
}

impl MemoryReadWriteTx {
    fn record(&self, store: Datastore, edit: EditOperation) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.closed {
            return Err(BrokerError::Closed {
                tx_id: self.tx_id.clone(),
            });
        }
        edit.apply(inner.view.entry(store).or_default())
            .map_err(|err| BrokerError::InvalidWrite(err.to_string()))?;
        inner.journal.push((store, edit));
        Ok(())
    }

    fn failure(&self, cause: impl Into<BrokerError>) -> CommitFailure {
        CommitFailure {
            tx_id: self.tx_id.clone(),
            cause: cause.into(),
        }
    }
}

#[async_trait]
impl DataReader for MemoryReadWriteTx {
    async fn read(&self, store: Datastore, path: &DataPath) -> TxResult<Option<DataNode>> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.view.get(&store).and_then(|tree| tree.get(path)).cloned())
    }
}

#[async_trait]
impl BrokerReadWriteTx for MemoryReadWriteTx {
    fn id(&self) -> &str {
        &self.tx_id
    }

    fn put(&self, store: Datastore, path: &DataPath, data: DataNode) -> Result<()> {
        self.record(store, EditOperation::Replace(path.clone(), data))
    }

    fn merge(&self, store: Datastore, path: &DataPath, data: DataNode) -> Result<()> {
        self.record(store, EditOperation::Merge(path.clone(), data))
    }

    fn delete(&self, store: Datastore, path: &DataPath) -> Result<()> {
        self.record(store, EditOperation::Remove(path.clone()))
    }

    async fn commit(&self) -> std::result::Result<(), CommitFailure> {
        let journal = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            if inner.closed {
                return Err(self.failure(BrokerError::Closed {
                    tx_id: self.tx_id.clone(),
                }));
            }
            inner.closed = true;
            std::mem::take(&mut inner.journal)
        };

        self.broker
            .hook
            .check(&self.tx_id, &journal)
            .map_err(|err| self.failure(err))?;

        let mut stores = self
            .broker
            .stores
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut staged = stores.clone();
        for (store, edit) in &journal {
            edit.apply(staged.entry(*store).or_default())
                .map_err(|err| self.failure(BrokerError::InvalidWrite(err.to_string())))?;
        }
        *stores = staged;
        self.broker.commits.fetch_add(1, Ordering::AcqRel);

        tracing::debug!(
            broker_tx = %self.tx_id,
            edits = journal.len(),
            "broker transaction committed"
        );
        Ok(())
    }

    fn cancel(&self) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.closed {
            return false;
        }
        inner.closed = true;
        inner.journal.clear();
        tracing::debug!(broker_tx = %self.tx_id, "broker transaction cancelled");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DocumentedError;
    use crate::hook::RejectingCommitHook;
    use cfgtx_core::rpc::ErrorTag;

    fn path(text: &str) -> DataPath {
        DataPath::parse(text).unwrap()
    }

    #[tokio::test]
    async fn test_writes_are_isolated_until_commit() {
        let broker = MemoryBroker::new();
        let tx = broker.new_read_write_transaction();
        tx.put(
            Datastore::Configuration,
            &path("/top"),
            DataNode::container("top"),
        )
        .unwrap();

        assert!(tx
            .exists(Datastore::Configuration, &path("/top"))
            .await
            .unwrap());
        assert!(!broker.snapshot(Datastore::Configuration).contains(&path("/top")));

        tx.commit().await.unwrap();
        assert!(broker.snapshot(Datastore::Configuration).contains(&path("/top")));
        assert_eq!(broker.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_read_only_view_is_a_snapshot() {
        let broker = MemoryBroker::new();
        let reader = broker.new_read_only_transaction();
        broker
            .seed(Datastore::Operational, &path("/top"), DataNode::container("top"))
            .unwrap();

        assert!(reader
            .read(Datastore::Operational, &path("/top"))
            .await
            .unwrap()
            .is_none());
        assert!(broker
            .new_read_only_transaction()
            .read(Datastore::Operational, &path("/top"))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_cancel_discards_and_closes() {
        let broker = MemoryBroker::new();
        let tx = broker.new_read_write_transaction();
        tx.merge(
            Datastore::Configuration,
            &path("/top"),
            DataNode::container("top"),
        )
        .unwrap();

        assert!(tx.cancel());
        assert!(!tx.cancel());
        assert!(matches!(
            tx.delete(Datastore::Configuration, &path("/top")),
            Err(BrokerError::Closed { .. })
        ));
        assert!(tx.commit().await.is_err());
        assert!(broker.snapshot(Datastore::Configuration).top_level().is_empty());
    }

    #[tokio::test]
    async fn test_hook_rejection_leaves_state_untouched() {
        let broker = MemoryBroker::with_hook(Arc::new(RejectingCommitHook::new(
            DocumentedError::new(ErrorTag::DataExists, "conflict"),
        )));
        let tx = broker.new_read_write_transaction();
        tx.put(
            Datastore::Configuration,
            &path("/top"),
            DataNode::container("top"),
        )
        .unwrap();

        let failure = tx.commit().await.unwrap_err();
        assert!(matches!(failure.cause, BrokerError::Documented(_)));
        assert!(broker.snapshot(Datastore::Configuration).top_level().is_empty());
        assert_eq!(broker.commit_count(), 0);
    }
}
