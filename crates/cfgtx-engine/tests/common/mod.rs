use std::sync::{Arc, Mutex};

use cfgtx_broker::{BrokerCommitHook, DocumentedError, MemoryBroker};
use cfgtx_core::{
    DataNode, DataPath, DataTree, Datastore, EditOperation, ListOrdering, PathArg, SchemaContext,
    SchemaNode, SchemaTree,
};
use cfgtx_engine::DataStrategy;
use cfgtx_netconf::{LoopbackDevice, RpcCall};

/// Schema shared by the engine tests
///
/// ```text
/// top
///   item   (list, key name, ordered-by user)
///   plain  (list, key id)
///   tags   (leaf-list, ordered-by user)
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
                .child(SchemaNode::list("plain", ["id"]))
                .child(SchemaNode::leaf_list("tags").ordered_by_user())
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
pub fn item_path(name: &str) -> DataPath {
    path(&format!("/top/item/item[name={}]", name))
}

#[allow(dead_code)]
pub fn point(name: &str) -> PathArg {
    PathArg::entry("item", [("name", name)])
}

#[allow(dead_code)]
pub fn items(names: &[&str]) -> DataNode {
    names
        .iter()
        .fold(DataNode::list("item", ListOrdering::User), |list, n| {
            list.with_child(item(n))
        })
}

#[allow(dead_code)]
pub fn mtu(value: i64) -> DataNode {
    DataNode::leaf("mtu", value)
}

/// Key values of the `item` list in tree order
#[allow(dead_code)]
pub fn item_order(tree: &DataTree) -> Vec<String> {
    tree.get(&path("/top/item"))
        .and_then(DataNode::children)
        .map(|entries| {
            entries
                .values()
                .filter_map(|n| n.child(&PathArg::node("name")))
                .filter_map(DataNode::value)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Commit hook recording the edit names of every commit it allows
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingHook {
    commits: Mutex<Vec<Vec<&'static str>>>,
}

impl RecordingHook {
    #[allow(dead_code)]
    pub fn commits(&self) -> Vec<Vec<&'static str>> {
        self.commits.lock().unwrap().clone()
    }
}

impl BrokerCommitHook for RecordingHook {
    fn check(
        &self,
        _: &str,
        edits: &[(Datastore, EditOperation)],
    ) -> Result<(), DocumentedError> {
        let names = edits.iter().map(|(_, edit)| edit.name()).collect();
        self.commits.lock().unwrap().push(names);
        Ok(())
    }
}

/// Broker seeded with `/top/item` entries for `names`, plus its strategy
#[allow(dead_code)]
pub fn broker_strategy(names: &[&str]) -> (MemoryBroker, Arc<RecordingHook>, DataStrategy) {
    let hook = Arc::new(RecordingHook::default());
    let broker = MemoryBroker::with_hook(hook.clone());
    if !names.is_empty() {
        broker
            .seed(Datastore::Configuration, &path("/top/item"), items(names))
            .unwrap();
    }
    let strategy = DataStrategy::broker(Arc::new(broker.clone()), schema());
    (broker, hook, strategy)
}

#[allow(dead_code)]
pub fn committed(broker: &MemoryBroker) -> DataTree {
    broker.snapshot(Datastore::Configuration)
}

/// Device whose running datastore holds `/top/item` entries for `names`
#[allow(dead_code)]
pub fn device_strategy(names: &[&str]) -> (Arc<LoopbackDevice>, DataStrategy) {
    let device = Arc::new(LoopbackDevice::new());
    if !names.is_empty() {
        device.seed_running(&path("/top/item"), items(names)).unwrap();
    }
    let strategy = DataStrategy::netconf(device.clone(), schema());
    (device, strategy)
}

/// Call names with reads filtered out
#[allow(dead_code)]
pub fn queued_calls(device: &LoopbackDevice) -> Vec<&'static str> {
    device
        .journal()
        .iter()
        .filter(|call| !matches!(call, RpcCall::Get(_) | RpcCall::GetConfig(_)))
        .map(RpcCall::name)
        .collect()
}
