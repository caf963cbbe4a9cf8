//! RPC client interface
//!
//! Every call resolves to the device reply. `Err` is reserved for transport
//! failures and local decoding problems; device-reported errors and warnings
//! travel inside the `RpcResult`.

use std::sync::Arc;

use async_trait::async_trait;
use cfgtx_core::errors::Result;
use cfgtx_core::model::{DataNode, DataPath, Datastore};
use cfgtx_core::ops::EditOperation;
use cfgtx_core::rpc::RpcResult;
use cfgtx_core::transaction::DataReader;

#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Lock the candidate datastore
    async fn lock(&self) -> Result<RpcResult>;

    async fn unlock(&self) -> Result<RpcResult>;

    /// Revert the candidate datastore to the running configuration
    async fn discard_changes(&self) -> Result<RpcResult>;

    /// Configuration and state data at `path`
    ///
    /// `fields` are paths relative to `path` selecting the subtrees to
    /// return; for a list they apply to every entry.
    async fn get(&self, path: &DataPath, fields: Option<&[DataPath]>) -> Result<Option<DataNode>>;

    /// Configuration data at `path`, with the same field selection as `get`
    async fn get_config(
        &self,
        path: &DataPath,
        fields: Option<&[DataPath]>,
    ) -> Result<Option<DataNode>>;

    /// Send one `edit-config` operation against the candidate datastore
    async fn edit_config(&self, edit: EditOperation) -> Result<RpcResult>;

    async fn commit(&self) -> Result<RpcResult>;

    async fn merge(&self, path: &DataPath, data: DataNode) -> Result<RpcResult> {
        self.edit_config(EditOperation::Merge(path.clone(), data)).await
    }

    async fn create(&self, path: &DataPath, data: DataNode) -> Result<RpcResult> {
        self.edit_config(EditOperation::Create(path.clone(), data)).await
    }

    async fn replace(&self, path: &DataPath, data: DataNode) -> Result<RpcResult> {
        self.edit_config(EditOperation::Replace(path.clone(), data)).await
    }

    async fn delete(&self, path: &DataPath) -> Result<RpcResult> {
        self.edit_config(EditOperation::Delete(path.clone())).await
    }

    async fn remove(&self, path: &DataPath) -> Result<RpcResult> {
        self.edit_config(EditOperation::Remove(path.clone())).await
    }
}

/// Read view over a device session
///
/// Configuration reads use `get-config`; operational reads use `get`.
pub struct DeviceReader {
    client: Arc<dyn RpcClient>,
}

impl DeviceReader {
    pub fn new(client: Arc<dyn RpcClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataReader for DeviceReader {
    async fn read(&self, store: Datastore, path: &DataPath) -> Result<Option<DataNode>> {
        match store {
            Datastore::Configuration => self.client.get_config(path, None).await,
            Datastore::Operational => self.client.get(path, None).await,
        }
    }
}
