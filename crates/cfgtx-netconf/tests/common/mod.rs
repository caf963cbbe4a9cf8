use std::sync::Arc;

use cfgtx_core::ops::EditOperation;
use cfgtx_core::{
    DataNode, DataPath, ListOrdering, Result, RpcResult, SchemaContext, SchemaNode, SchemaTree,
};
use cfgtx_netconf::{LoopbackDevice, NetconfTransaction, RpcCall, RpcClient};

/// Schema shared by the device tests
///
/// ```text
/// top
///   item   (list, key name, ordered-by user)
///   tags   (leaf-list)
///   mtu    (leaf)
/// ```
pub fn schema() -> Arc<dyn SchemaContext> {
    Arc::new(
        SchemaTree::default().with_root(
            SchemaNode::container("top")
                .child(
                    SchemaNode::list("item", ["name"])
                        .ordered_by_user()
                        .child(SchemaNode::leaf("value")),
                )
                .child(SchemaNode::leaf_list("tags"))
                .child(SchemaNode::leaf("mtu")),
        ),
    )
}

#[allow(dead_code)]
pub fn path(text: &str) -> DataPath {
    DataPath::parse(text).unwrap()
}

#[allow(dead_code)]
pub fn item(name: &str) -> DataNode {
    DataNode::map_entry("item", [("name", name)]).with_child(DataNode::leaf("value", 1i64))
}

#[allow(dead_code)]
pub fn items(names: &[&str]) -> DataNode {
    names
        .iter()
        .fold(DataNode::list("item", ListOrdering::User), |list, n| {
            list.with_child(item(n))
        })
}

pub fn device() -> Arc<LoopbackDevice> {
    Arc::new(LoopbackDevice::new())
}

#[allow(dead_code)]
pub fn open(device: &Arc<LoopbackDevice>) -> NetconfTransaction {
    NetconfTransaction::new(device.clone(), schema())
}

/// Call names with reads filtered out
///
/// Reads are issued directly rather than through the queue, so their
/// position relative to queued RPCs is not fixed.
#[allow(dead_code)]
pub fn queued_calls(device: &LoopbackDevice) -> Vec<&'static str> {
    device
        .journal()
        .iter()
        .filter(|call| !matches!(call, RpcCall::Get(_) | RpcCall::GetConfig(_)))
        .map(RpcCall::name)
        .collect()
}

#[allow(dead_code)]
pub fn read_count(device: &LoopbackDevice) -> usize {
    device
        .journal()
        .iter()
        .filter(|call| matches!(call, RpcCall::GetConfig(_)))
        .count()
}

/// Device whose `edit-config` replies never arrive
///
/// Every other RPC is answered by the wrapped loopback device.
#[allow(dead_code)]
pub struct StalledEdits(pub Arc<LoopbackDevice>);

#[async_trait::async_trait]
impl RpcClient for StalledEdits {
    async fn lock(&self) -> Result<RpcResult> {
        self.0.lock().await
    }

    async fn unlock(&self) -> Result<RpcResult> {
        self.0.unlock().await
    }

    async fn discard_changes(&self) -> Result<RpcResult> {
        self.0.discard_changes().await
    }

    async fn get(&self, path: &DataPath, fields: Option<&[DataPath]>) -> Result<Option<DataNode>> {
        self.0.get(path, fields).await
    }

    async fn get_config(
        &self,
        path: &DataPath,
        fields: Option<&[DataPath]>,
    ) -> Result<Option<DataNode>> {
        self.0.get_config(path, fields).await
    }

    async fn edit_config(&self, _edit: EditOperation) -> Result<RpcResult> {
        std::future::pending().await
    }

    async fn commit(&self) -> Result<RpcResult> {
        self.0.commit().await
    }
}
