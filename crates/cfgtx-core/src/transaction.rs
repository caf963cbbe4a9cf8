//! Transaction contract and lifecycle bookkeeping
//!
//! A transaction is Open until `commit()` or `cancel()` is called; both are
//! terminal. Any call on a terminal transaction, including a second commit
//! or cancel, is rejected with `TransactionClosed` before it has any effect.

use async_trait::async_trait;
use cfgtx_core_types::TxId;
use serde::Serialize;

use crate::errors::{Result, TxError};
use crate::model::{DataNode, DataPath, Datastore};
use crate::rpc::RpcError;
use crate::schema::SchemaContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxState {
    Open,
    /// Commit was requested; the outcome is reported by `commit()` itself
    Committed,
    Cancelled,
}

impl std::fmt::Display for TxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxState::Open => write!(f, "open"),
            TxState::Committed => write!(f, "committed"),
            TxState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// State machine embedded by every transaction implementation
#[derive(Debug)]
pub struct TxLifecycle {
    id: TxId,
    backend: &'static str,
    state: TxState,
}

impl TxLifecycle {
    pub fn new(backend: &'static str) -> Self {
        Self {
            id: TxId::new(),
            backend,
            state: TxState::Open,
        }
    }

    pub fn id(&self) -> &TxId {
        &self.id
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    /// # Errors
    ///
    /// `TransactionClosed` once the transaction is terminal.
    pub fn ensure_open(&self, op: &str) -> Result<()> {
        if self.state == TxState::Open {
            return Ok(());
        }
        tracing::warn!(
            tx_id = %self.id,
            backend = self.backend,
            op,
            state = %self.state,
            "call on terminal transaction rejected"
        );
        Err(TxError::TransactionClosed {
            tx_id: self.id.to_string(),
            op: op.to_string(),
            state: self.state,
        })
    }

    /// Enter a terminal state
    ///
    /// # Errors
    ///
    /// `TransactionClosed` if a terminal state was already reached.
    pub fn finish(&mut self, op: &str, target: TxState) -> Result<()> {
        self.ensure_open(op)?;
        self.state = target;
        Ok(())
    }
}

impl Drop for TxLifecycle {
    fn drop(&mut self) {
        if self.state == TxState::Open {
            tracing::warn!(
                tx_id = %self.id,
                backend = self.backend,
                "transaction dropped while still open"
            );
        }
    }
}

/// Outcome of a successful commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub tx_id: TxId,
    /// Warnings reported by the backend while the transaction ran
    pub warnings: Vec<RpcError>,
}

/// Read view used by existence probes and strategy reads
#[async_trait]
pub trait DataReader: Send + Sync {
    async fn read(&self, store: Datastore, path: &DataPath) -> Result<Option<DataNode>>;

    async fn exists(&self, store: Datastore, path: &DataPath) -> Result<bool> {
        Ok(self.read(store, path).await?.is_some())
    }
}

/// Atomic set of edits against the configuration datastore
#[async_trait]
pub trait Transaction: Send {
    fn id(&self) -> &TxId;

    fn state(&self) -> TxState;

    fn schema(&self) -> &dyn SchemaContext;

    /// Delete data that must exist
    async fn delete(&mut self, path: &DataPath) -> Result<()>;

    /// Delete data if it exists
    async fn remove(&mut self, path: &DataPath) -> Result<()>;

    async fn merge(&mut self, path: &DataPath, data: DataNode) -> Result<()>;

    /// Write data that must not exist yet
    async fn create(&mut self, path: &DataPath, data: DataNode) -> Result<()>;

    async fn replace(&mut self, path: &DataPath, data: DataNode) -> Result<()>;

    /// Current content of the collection at `path`, as the positional
    /// insert planner needs it
    async fn read_list(&mut self, path: &DataPath) -> Result<Option<DataNode>>;

    /// Merge the empty structure leading down to the parent of `path`
    async fn ensure_parents_by_merge(&mut self, path: &DataPath) -> Result<()> {
        let shell = self.schema().implicit_parent_shell(path)?;
        if let Some((anchor, node)) = shell {
            self.merge(&anchor, node).await?;
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<CommitInfo>;

    /// Abandon the transaction and roll back backend state
    async fn cancel(&mut self) -> Result<()>;
}
