use std::sync::Arc;

use cfgtx_broker::MemoryBroker;
use cfgtx_core::{DataNode, DataPath, Datastore, ListOrdering, SchemaContext, SchemaNode, SchemaTree};

/// Schema shared by the broker tests
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
    DataNode::map_entry("item", [("name", name)])
}

#[allow(dead_code)]
pub fn items(names: &[&str]) -> DataNode {
    names
        .iter()
        .fold(DataNode::list("item", ListOrdering::User), |list, n| {
            list.with_child(item(n))
        })
}

/// Broker holding `/top/item` entries for `names`
#[allow(dead_code)]
pub fn broker_with_items(names: &[&str]) -> MemoryBroker {
    let broker = MemoryBroker::new();
    if !names.is_empty() {
        broker
            .seed(Datastore::Configuration, &path("/top/item"), items(names))
            .unwrap();
    }
    broker
}

#[allow(dead_code)]
pub fn committed(broker: &MemoryBroker, text: &str) -> Option<DataNode> {
    broker
        .snapshot(Datastore::Configuration)
        .get(&path(text))
        .cloned()
}
