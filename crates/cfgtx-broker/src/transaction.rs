//! `Transaction` implementation over a data broker
//!
//! Writes always target the configuration datastore. Existence preconditions
//! are checked by reading through the broker transaction before writing, so
//! they observe this transaction's own earlier writes.

use std::sync::Arc;

use async_trait::async_trait;
use cfgtx_core::errors::{Result, TxError};
use cfgtx_core::model::{DataNode, DataPath, Datastore};
use cfgtx_core::ops::{check_existence, expand_collection_write, CollectionWrite};
use cfgtx_core::schema::SchemaContext;
use cfgtx_core::transaction::{CommitInfo, TxLifecycle, TxState};
use cfgtx_core_types::TxId;

use crate::broker::{BrokerReadWriteTx, DataBroker};
use crate::errors::decode_commit_failure;

const BACKEND: &str = "broker";
const STORE: Datastore = Datastore::Configuration;

pub struct BrokerTransaction {
    lifecycle: TxLifecycle,
    rw: Arc<dyn BrokerReadWriteTx>,
    schema: Arc<dyn SchemaContext>,
}

impl BrokerTransaction {
    pub fn new(broker: &dyn DataBroker, schema: Arc<dyn SchemaContext>) -> Self {
        let lifecycle = TxLifecycle::new(BACKEND);
        let rw = broker.new_read_write_transaction();
        tracing::debug!(
            tx_id = %lifecycle.id(),
            broker_tx = rw.id(),
            "broker transaction opened"
        );
        Self {
            lifecycle,
            rw,
            schema,
        }
    }

    fn write_collection(&self, write: CollectionWrite) -> Result<()> {
        self.rw.merge(STORE, &write.shell_path, write.shell)?;
        for (path, child) in write.children {
            self.rw.put(STORE, &path, child)?;
        }
        Ok(())
    }
}

#[async_trait]
impl cfgtx_core::Transaction for BrokerTransaction {
    fn id(&self) -> &TxId {
        self.lifecycle.id()
    }

    fn state(&self) -> TxState {
        self.lifecycle.state()
    }

    fn schema(&self) -> &dyn SchemaContext {
        self.schema.as_ref()
    }

    async fn delete(&mut self, path: &DataPath) -> Result<()> {
        self.lifecycle.ensure_open("delete")?;
        if !self.rw.exists(STORE, path).await? {
            return Err(TxError::data_missing(path));
        }
        self.rw.delete(STORE, path)?;
        Ok(())
    }

    async fn remove(&mut self, path: &DataPath) -> Result<()> {
        self.lifecycle.ensure_open("remove")?;
        self.rw.delete(STORE, path)?;
        Ok(())
    }

    async fn merge(&mut self, path: &DataPath, data: DataNode) -> Result<()> {
        self.lifecycle.ensure_open("merge")?;
        self.rw.merge(STORE, path, data)?;
        Ok(())
    }

    async fn create(&mut self, path: &DataPath, data: DataNode) -> Result<()> {
        self.lifecycle.ensure_open("create")?;
        match expand_collection_write(self.schema.as_ref(), path, &data)? {
            Some(write) => {
                let entries: Vec<DataNode> =
                    write.children.iter().map(|(_, node)| node.clone()).collect();
                check_existence(Arc::clone(&self.rw), STORE, path, &entries, false)
                    .await
                    .into_result(false)?;
                self.write_collection(write)
            }
            None => {
                if self.rw.exists(STORE, path).await? {
                    return Err(TxError::data_exists(path));
                }
                self.rw.put(STORE, path, data)?;
                Ok(())
            }
        }
    }

    async fn replace(&mut self, path: &DataPath, data: DataNode) -> Result<()> {
        self.lifecycle.ensure_open("replace")?;
        match expand_collection_write(self.schema.as_ref(), path, &data)? {
            Some(write) => self.write_collection(write),
            None => {
                self.rw.put(STORE, path, data)?;
                Ok(())
            }
        }
    }

    async fn read_list(&mut self, path: &DataPath) -> Result<Option<DataNode>> {
        self.lifecycle.ensure_open("read_list")?;
        self.rw.read(STORE, path).await
    }

    async fn commit(&mut self) -> Result<CommitInfo> {
        self.lifecycle.finish("commit", TxState::Committed)?;
        self.rw.commit().await.map_err(|failure| {
            let err = decode_commit_failure(&failure);
            tracing::warn!(
                tx_id = %self.lifecycle.id(),
                error = %failure,
                code = err.code(),
                "broker commit failed"
            );
            err
        })?;
        Ok(CommitInfo {
            tx_id: self.lifecycle.id().clone(),
            warnings: Vec::new(),
        })
    }

    async fn cancel(&mut self) -> Result<()> {
        self.lifecycle.finish("cancel", TxState::Cancelled)?;
        if !self.rw.cancel() {
            tracing::warn!(
                tx_id = %self.lifecycle.id(),
                "broker transaction was already closed on cancel"
            );
        }
        Ok(())
    }
}
