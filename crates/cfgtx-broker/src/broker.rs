//! Broker interface
//!
//! A broker hands out isolated transactions over its datastores. Reads on a
//! read-write transaction observe that transaction's own uncommitted writes.

use std::sync::Arc;

use async_trait::async_trait;
use cfgtx_core::model::{DataNode, DataPath, Datastore};
use cfgtx_core::transaction::DataReader;

use crate::errors::{CommitFailure, Result};

pub trait DataBroker: Send + Sync {
    fn new_read_write_transaction(&self) -> Arc<dyn BrokerReadWriteTx>;

    fn new_read_only_transaction(&self) -> Arc<dyn BrokerReadTx>;
}

/// Read-only view of the broker, fixed at creation time
pub trait BrokerReadTx: DataReader {}

#[async_trait]
pub trait BrokerReadWriteTx: DataReader {
    fn id(&self) -> &str;

    /// # Errors
    ///
    /// `Closed` after commit or cancel, `InvalidWrite` for malformed data.
    fn put(&self, store: Datastore, path: &DataPath, data: DataNode) -> Result<()>;

    /// # Errors
    ///
    /// `Closed` after commit or cancel, `InvalidWrite` for malformed data.
    fn merge(&self, store: Datastore, path: &DataPath, data: DataNode) -> Result<()>;

    /// Remove data if present
    ///
    /// # Errors
    ///
    /// `Closed` after commit or cancel.
    fn delete(&self, store: Datastore, path: &DataPath) -> Result<()>;

    /// Apply every recorded write atomically
    ///
    /// # Errors
    ///
    /// A `CommitFailure` whose cause chain explains the rejection.
    async fn commit(&self) -> std::result::Result<(), CommitFailure>;

    /// Discard recorded writes; `false` when already closed
    fn cancel(&self) -> bool;
}
