//! Strategy facade over the data backends
//!
//! `DataStrategy` picks the transaction implementation and the read path for
//! one backend. Every public operation owns its boundary logging.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cfgtx_broker::{BrokerReadTx, BrokerTransaction, DataBroker};
use cfgtx_core::errors::{Result, TxError};
use cfgtx_core::model::{DataNode, DataPath, Datastore};
use cfgtx_core::ops::EditOperation;
use cfgtx_core::rpc::ErrorTag;
use cfgtx_core::schema::SchemaContext;
use cfgtx_core::transaction::{DataReader, Transaction};
use cfgtx_core::{log_op_end, log_op_error, log_op_start};
use cfgtx_netconf::{DeviceReader, NetconfTransaction, RpcClient};

use crate::config::{BackendKind, DatastoreConfig};

/// Backend handles available to `DataStrategy::from_config`
#[derive(Clone, Default)]
pub struct Backends {
    pub broker: Option<Arc<dyn DataBroker>>,
    pub device: Option<Arc<dyn RpcClient>>,
}

#[derive(Clone)]
pub enum DataStrategy {
    /// Local data broker
    Broker {
        broker: Arc<dyn DataBroker>,
        schema: Arc<dyn SchemaContext>,
    },
    /// Remote device reached through an RPC session
    Netconf {
        client: Arc<dyn RpcClient>,
        schema: Arc<dyn SchemaContext>,
    },
    /// No backend; every operation is unsupported
    NoData,
}

impl std::fmt::Debug for DataStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.backend_name())
    }
}

impl DataStrategy {
    pub fn broker(broker: Arc<dyn DataBroker>, schema: Arc<dyn SchemaContext>) -> Self {
        DataStrategy::Broker { broker, schema }
    }

    pub fn netconf(client: Arc<dyn RpcClient>, schema: Arc<dyn SchemaContext>) -> Self {
        DataStrategy::Netconf { client, schema }
    }

    /// Build the strategy selected by `config`
    ///
    /// # Errors
    ///
    /// `Configuration` when the selected backend has no handle in `backends`.
    pub fn from_config(
        config: &DatastoreConfig,
        backends: Backends,
        schema: Arc<dyn SchemaContext>,
    ) -> Result<Self> {
        let missing = |backend: &str| TxError::Configuration {
            message: format!("backend '{}' selected but no handle was provided", backend),
        };
        match config.backend {
            BackendKind::Broker => {
                let broker = backends.broker.ok_or_else(|| missing("broker"))?;
                Ok(DataStrategy::broker(broker, schema))
            }
            BackendKind::Netconf => {
                let client = backends.device.ok_or_else(|| missing("netconf"))?;
                Ok(DataStrategy::netconf(client, schema))
            }
            BackendKind::None => Ok(DataStrategy::NoData),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            DataStrategy::Broker { .. } => "broker",
            DataStrategy::Netconf { .. } => "netconf",
            DataStrategy::NoData => "none",
        }
    }

    pub(crate) fn schema(&self) -> Result<&Arc<dyn SchemaContext>> {
        match self {
            DataStrategy::Broker { schema, .. } | DataStrategy::Netconf { schema, .. } => Ok(schema),
            DataStrategy::NoData => Err(no_data()),
        }
    }

    /// Open a transaction on the backend
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation` for `NoData`.
    pub fn prepare_write_execution(&self) -> Result<Box<dyn Transaction>> {
        match self {
            DataStrategy::Broker { broker, schema } => Ok(Box::new(BrokerTransaction::new(
                broker.as_ref(),
                Arc::clone(schema),
            ))),
            DataStrategy::Netconf { client, schema } => Ok(Box::new(NetconfTransaction::new(
                Arc::clone(client),
                Arc::clone(schema),
            ))),
            DataStrategy::NoData => Err(no_data()),
        }
    }

    /// Read view used for existence checks outside a transaction
    pub(crate) fn reader(&self) -> Result<Arc<dyn DataReader>> {
        match self {
            DataStrategy::Broker { broker, .. } => {
                Ok(Arc::new(BrokerView(broker.new_read_only_transaction())))
            }
            DataStrategy::Netconf { client, .. } => {
                Ok(Arc::new(DeviceReader::new(Arc::clone(client))))
            }
            DataStrategy::NoData => Err(no_data()),
        }
    }

    /// # Errors
    ///
    /// Read failures from the backend; `UnsupportedOperation` for `NoData`.
    pub async fn read(&self, store: Datastore, path: &DataPath) -> Result<Option<DataNode>> {
        let start = Instant::now();
        log_op_start!("read", path = %path, store = %store, backend = self.backend_name());
        let result = self.read_inner(store, path).await;
        log_outcome("read", start, &result);
        result
    }

    pub(crate) async fn read_inner(
        &self,
        store: Datastore,
        path: &DataPath,
    ) -> Result<Option<DataNode>> {
        self.reader()?.read(store, path).await
    }

    /// Read only the subtrees selected by `fields` (paths relative to `path`)
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation` unless the backend is a device.
    pub async fn read_fields(
        &self,
        store: Datastore,
        path: &DataPath,
        fields: &[DataPath],
    ) -> Result<Option<DataNode>> {
        let start = Instant::now();
        log_op_start!("read_fields", path = %path, store = %store, fields = fields.len());
        let result = self.read_fields_inner(store, path, fields).await;
        log_outcome("read_fields", start, &result);
        result
    }

    pub(crate) async fn read_fields_inner(
        &self,
        store: Datastore,
        path: &DataPath,
        fields: &[DataPath],
    ) -> Result<Option<DataNode>> {
        match self {
            DataStrategy::Netconf { client, .. } => match store {
                Datastore::Configuration => client.get_config(path, Some(fields)).await,
                Datastore::Operational => client.get(path, Some(fields)).await,
            },
            DataStrategy::Broker { .. } => Err(TxError::unsupported(
                "Reading of selected subtrees is not supported by the broker backend",
            )),
            DataStrategy::NoData => Err(no_data()),
        }
    }

    /// # Errors
    ///
    /// Read failures from the backend; `UnsupportedOperation` for `NoData`.
    pub async fn exists(&self, store: Datastore, path: &DataPath) -> Result<bool> {
        let start = Instant::now();
        log_op_start!("exists", path = %path, store = %store);
        let result = self.exists_inner(store, path).await;
        log_outcome("exists", start, &result);
        result
    }

    pub(crate) async fn exists_inner(&self, store: Datastore, path: &DataPath) -> Result<bool> {
        self.reader()?.exists(store, path).await
    }

    /// Delete data that must exist and commit
    ///
    /// # Errors
    ///
    /// `DataMissing` when nothing is at `path`, or the decoded commit failure.
    pub async fn delete(&self, path: &DataPath) -> Result<()> {
        let start = Instant::now();
        log_op_start!("delete", path = %path, backend = self.backend_name());
        let result = self.delete_inner(path).await;
        log_outcome("delete", start, &result);
        result
    }

    async fn delete_inner(&self, path: &DataPath) -> Result<()> {
        let mut tx = self.prepare_write_execution()?;
        if let Err(err) = tx.delete(path).await {
            return Err(abort(tx.as_mut(), err).await);
        }
        commit(tx.as_mut(), "DELETE").await
    }

    /// Merge `data` at `path`, creating missing ancestors, and commit
    ///
    /// # Errors
    ///
    /// Edit failures, or the decoded commit failure.
    pub async fn merge(&self, path: &DataPath, data: DataNode) -> Result<()> {
        let start = Instant::now();
        log_op_start!("merge", path = %path, backend = self.backend_name());
        let result = self.merge_inner(path, data).await;
        log_outcome("merge", start, &result);
        result
    }

    async fn merge_inner(&self, path: &DataPath, data: DataNode) -> Result<()> {
        let mut tx = self.prepare_write_execution()?;
        let edited = match tx.ensure_parents_by_merge(path).await {
            Ok(()) => tx.merge(path, data).await,
            Err(err) => Err(err),
        };
        if let Err(err) = edited {
            return Err(abort(tx.as_mut(), err).await);
        }
        commit(tx.as_mut(), "MERGE").await
    }
}

/// Read-only broker transaction seen as a plain reader
struct BrokerView(Arc<dyn BrokerReadTx>);

#[async_trait]
impl DataReader for BrokerView {
    async fn read(&self, store: Datastore, path: &DataPath) -> Result<Option<DataNode>> {
        self.0.read(store, path).await
    }
}

fn no_data() -> TxError {
    TxError::unsupported("No data backend is configured")
}

pub(crate) fn log_outcome<T>(op: &str, start: Instant, result: &Result<T>) {
    let duration_ms = millis(start.elapsed());
    match result {
        Ok(_) => {
            log_op_end!(op, duration_ms = duration_ms);
        }
        Err(err) => {
            log_op_error!(op, err.clone(), duration_ms = duration_ms);
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`
fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Cancel `tx` after a failed edit and hand back the edit error
pub(crate) async fn abort(tx: &mut dyn Transaction, err: TxError) -> TxError {
    cancel_quietly(tx).await;
    err
}

/// Cancel `tx`; a failure is only logged
pub(crate) async fn cancel_quietly(tx: &mut dyn Transaction) {
    if let Err(cancel_err) = tx.cancel().await {
        tracing::warn!(
            tx_id = %tx.id(),
            error = %cancel_err,
            "cancel after failed edit did not complete"
        );
    }
}

/// Commit `tx`, decoding failures for operation `op`
pub(crate) async fn commit(tx: &mut dyn Transaction, op: &str) -> Result<()> {
    tx.commit()
        .await
        .map(|info| {
            if !info.warnings.is_empty() {
                tracing::debug!(
                    tx_id = %info.tx_id,
                    warnings = info.warnings.len(),
                    "committed with warnings"
                );
            }
        })
        .map_err(|err| decode_failure(err, op))
}

/// Surface data-exists and data-missing commit errors as such
///
/// Any other commit failure stays `CommitFailed`, labelled with `op`.
pub fn decode_failure(err: TxError, op: &str) -> TxError {
    let TxError::CommitFailed { message, errors } = err else {
        return err;
    };
    let tagged = |tag: ErrorTag| errors.iter().find(|e| !e.is_warning() && e.tag == tag);
    if let Some(error) = tagged(ErrorTag::DataExists) {
        return TxError::data_exists(error.path.clone().unwrap_or_default());
    }
    if let Some(error) = tagged(ErrorTag::DataMissing) {
        return TxError::data_missing(error.path.clone().unwrap_or_default());
    }
    TxError::CommitFailed {
        message: format!("Transaction({}) not committed correctly: {}", op, message),
        errors,
    }
}

/// Apply a planned edit through the transaction
pub(crate) async fn apply_edit(tx: &mut dyn Transaction, edit: EditOperation) -> Result<()> {
    match edit {
        EditOperation::Delete(path) => tx.delete(&path).await,
        EditOperation::Remove(path) => tx.remove(&path).await,
        EditOperation::Merge(path, data) => tx.merge(&path, data).await,
        EditOperation::Create(path, data) => tx.create(&path, data).await,
        EditOperation::Replace(path, data) => tx.replace(&path, data).await,
    }
}
