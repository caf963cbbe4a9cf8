use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use cfgtx_core::errors::{Result, TxError};
use cfgtx_core::{
    DataNode, DataPath, DataReader, DataTree, Datastore, ListOrdering, PathArg, SchemaNode,
    SchemaTree,
};
use tokio::sync::oneshot;

/// Schema used across the core tests
///
/// ```text
/// top
///   item   (list, key name, ordered-by user)
///   plain  (list, key id)
///   tags   (leaf-list, ordered-by user)
/// ```
#[allow(dead_code)]
pub fn sample_schema() -> SchemaTree {
    SchemaTree::default().with_root(
        SchemaNode::container("top")
            .child(
                SchemaNode::list("item", ["name"])
                    .ordered_by_user()
                    .child(SchemaNode::leaf("value")),
            )
            .child(SchemaNode::list("plain", ["id"]))
            .child(SchemaNode::leaf_list("tags").ordered_by_user()),
    )
}

#[allow(dead_code)]
pub fn path(text: &str) -> DataPath {
    DataPath::parse(text).unwrap()
}

#[allow(dead_code)]
pub fn item(name: &str) -> DataNode {
    DataNode::map_entry("item", [("name", name)])
}

#[allow(dead_code)]
pub fn item_point(name: &str) -> PathArg {
    PathArg::entry("item", [("name", name)])
}

#[allow(dead_code)]
pub fn item_list(names: &[String]) -> DataNode {
    names
        .iter()
        .fold(DataNode::list("item", ListOrdering::User), |list, n| {
            list.with_child(item(n))
        })
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

/// Reader whose probes block until their gate is released
///
/// Lets a test decide the exact order in which probes complete.
#[allow(dead_code)]
pub struct GatedReader {
    present: HashSet<DataPath>,
    failing: HashSet<DataPath>,
    gates: Mutex<HashMap<DataPath, oneshot::Receiver<()>>>,
}

#[allow(dead_code)]
impl GatedReader {
    pub fn new(
        paths: &[DataPath],
        present: HashSet<DataPath>,
        failing: HashSet<DataPath>,
    ) -> (Self, HashMap<DataPath, oneshot::Sender<()>>) {
        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        for p in paths {
            let (tx, rx) = oneshot::channel();
            senders.insert(p.clone(), tx);
            receivers.insert(p.clone(), rx);
        }
        let reader = Self {
            present,
            failing,
            gates: Mutex::new(receivers),
        };
        (reader, senders)
    }
}

#[async_trait]
impl DataReader for GatedReader {
    async fn read(&self, _store: Datastore, path: &DataPath) -> Result<Option<DataNode>> {
        let gate = self.gates.lock().unwrap().remove(path);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.failing.contains(path) {
            return Err(TxError::ReadFailed {
                path: path.to_string(),
                message: "probe failed".to_string(),
            });
        }
        Ok(self.present.contains(path).then(|| {
            let name = path.last().map(|a| a.name().clone()).unwrap();
            DataNode::leaf(name, true)
        }))
    }
}

/// Let every runnable task make progress on a current-thread runtime
#[allow(dead_code)]
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
