//! Schema interface consumed by the transaction layer
//!
//! The transaction layer only needs to know which paths address lists and
//! leaf-lists, how they are ordered, what their keys are, and how to build
//! the empty structure leading down to a path. `SchemaContext` exposes
//! exactly that; `SchemaTree` is a small static implementation for wiring
//! and tests.

use crate::errors::{Result, TxError};
use crate::model::{DataNode, DataPath, ListOrdering, PathArg, QName};

/// Kind of a schema node as seen from a data path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaKind {
    Container,
    List {
        keys: Vec<QName>,
        ordering: ListOrdering,
    },
    LeafList {
        ordering: ListOrdering,
    },
    Leaf,
    Choice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    List,
    LeafList,
}

pub trait SchemaContext: Send + Sync {
    /// Schema node addressed by `path`
    ///
    /// Entry segments resolve to the list or leaf-list they belong to.
    /// Choices are transparent and never returned for a data path.
    fn lookup(&self, path: &DataPath) -> Option<SchemaKind>;

    /// Collection addressed as a whole by `path` (last segment is a node
    /// segment naming a list or leaf-list)
    fn collection_kind(&self, path: &DataPath) -> Option<(CollectionKind, ListOrdering)> {
        if !path.last()?.is_node() {
            return None;
        }
        match self.lookup(path)? {
            SchemaKind::List { ordering, .. } => Some((CollectionKind::List, ordering)),
            SchemaKind::LeafList { ordering } => Some((CollectionKind::LeafList, ordering)),
            _ => None,
        }
    }

    fn is_ordered_collection(&self, path: &DataPath) -> bool {
        matches!(self.collection_kind(path), Some((_, ListOrdering::User)))
    }

    /// Key leaves of the list addressed by `path`, empty for anything else
    fn list_keys(&self, path: &DataPath) -> Vec<QName> {
        match self.lookup(path) {
            Some(SchemaKind::List { keys, .. }) => keys,
            _ => Vec::new(),
        }
    }

    /// Empty structure from the first segment of `path` down to `path`
    ///
    /// The result is anchored at `path.head()`: merging it there creates
    /// every missing ancestor without touching existing content.
    fn empty_subtree(&self, path: &DataPath) -> Result<DataNode> {
        let args = path.args();
        if args.is_empty() {
            return Err(TxError::invalid_input(
                "no empty structure exists for the datastore root",
            ));
        }
        let mut levels = Vec::with_capacity(args.len());
        for depth in 1..=args.len() {
            let prefix = DataPath::from_args(args[..depth].iter().cloned());
            let kind = self.lookup(&prefix).ok_or_else(|| {
                TxError::invalid_input(format!("no schema node found for {}", prefix))
            })?;
            levels.push(shell_node(&args[depth - 1], &kind)?);
        }

        let mut node = levels
            .pop()
            .ok_or_else(|| TxError::internal("empty path produced no structure"))?;
        while let Some(mut parent) = levels.pop() {
            parent.insert_child(node);
            node = parent;
        }
        Ok(node)
    }

    /// Shell that has to be merged before writing at `path`
    ///
    /// Returns the anchor path (the first segment) and the empty structure
    /// down to the parent of `path`, or `None` for top-level paths.
    fn implicit_parent_shell(&self, path: &DataPath) -> Result<Option<(DataPath, DataNode)>> {
        if path.len() < 2 {
            return Ok(None);
        }
        let (Some(parent), Some(head)) = (path.parent(), path.head()) else {
            return Ok(None);
        };
        Ok(Some((head, self.empty_subtree(&parent)?)))
    }
}

fn shell_node(arg: &PathArg, kind: &SchemaKind) -> Result<DataNode> {
    match (arg, kind) {
        (PathArg::Node(name), SchemaKind::Container) => Ok(DataNode::container(name.clone())),
        (PathArg::Node(name), SchemaKind::List { ordering, .. }) => {
            Ok(DataNode::list(name.clone(), *ordering))
        }
        (PathArg::Node(name), SchemaKind::LeafList { ordering }) => {
            Ok(DataNode::leaf_set(name.clone(), *ordering))
        }
        (PathArg::Entry { name, keys }, SchemaKind::List { .. }) => {
            Ok(DataNode::map_entry_with_keys(name.clone(), keys.clone()))
        }
        (PathArg::Value { name, value }, SchemaKind::LeafList { .. }) => {
            Ok(DataNode::leaf_set_entry(name.clone(), value.clone()))
        }
        (_, SchemaKind::Leaf) => Err(TxError::invalid_input(format!(
            "leaf {} has no empty structure",
            arg
        ))),
        _ => Err(TxError::invalid_input(format!(
            "segment {} does not match its schema node",
            arg
        ))),
    }
}

/// Node of a static schema tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaNode {
    name: QName,
    kind: SchemaKind,
    children: Vec<SchemaNode>,
}

impl SchemaNode {
    fn new(name: impl Into<QName>, kind: SchemaKind) -> Self {
        Self {
            name: name.into(),
            kind,
            children: Vec::new(),
        }
    }

    pub fn container(name: impl Into<QName>) -> Self {
        Self::new(name, SchemaKind::Container)
    }

    /// Keyed list; key leaves are declared automatically
    pub fn list<K: Into<QName>>(name: impl Into<QName>, keys: impl IntoIterator<Item = K>) -> Self {
        let keys: Vec<QName> = keys.into_iter().map(Into::into).collect();
        let children = keys.iter().cloned().map(SchemaNode::leaf).collect();
        Self {
            name: name.into(),
            kind: SchemaKind::List {
                keys,
                ordering: ListOrdering::System,
            },
            children,
        }
    }

    pub fn leaf_list(name: impl Into<QName>) -> Self {
        Self::new(
            name,
            SchemaKind::LeafList {
                ordering: ListOrdering::System,
            },
        )
    }

    pub fn leaf(name: impl Into<QName>) -> Self {
        Self::new(name, SchemaKind::Leaf)
    }

    pub fn choice(name: impl Into<QName>) -> Self {
        Self::new(name, SchemaKind::Choice)
    }

    /// Mark a list or leaf-list as ordered-by user
    pub fn ordered_by_user(mut self) -> Self {
        match &mut self.kind {
            SchemaKind::List { ordering, .. } | SchemaKind::LeafList { ordering } => {
                *ordering = ListOrdering::User;
            }
            _ => {}
        }
        self
    }

    pub fn child(mut self, child: SchemaNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn name(&self) -> &QName {
        &self.name
    }

    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }
}

fn find_schema_child<'a>(children: &'a [SchemaNode], name: &QName) -> Option<&'a SchemaNode> {
    children.iter().find(|c| &c.name == name).or_else(|| {
        children
            .iter()
            .filter(|c| c.kind == SchemaKind::Choice)
            .find_map(|c| find_schema_child(&c.children, name))
    })
}

/// Static schema made of top-level schema nodes
#[derive(Debug, Clone, Default)]
pub struct SchemaTree {
    roots: Vec<SchemaNode>,
}

impl SchemaTree {
    pub fn new(roots: Vec<SchemaNode>) -> Self {
        Self { roots }
    }

    pub fn with_root(mut self, root: SchemaNode) -> Self {
        self.roots.push(root);
        self
    }
}

impl SchemaContext for SchemaTree {
    fn lookup(&self, path: &DataPath) -> Option<SchemaKind> {
        let mut current: Option<&SchemaNode> = None;
        for arg in path.args() {
            let siblings = current.map_or(self.roots.as_slice(), |n| n.children.as_slice());
            current = match arg {
                PathArg::Node(name) => Some(find_schema_child(siblings, name)?),
                PathArg::Entry { name, .. } => {
                    let list = match current {
                        Some(node) if &node.name == name => node,
                        _ => find_schema_child(siblings, name)?,
                    };
                    if !matches!(list.kind, SchemaKind::List { .. }) {
                        return None;
                    }
                    Some(list)
                }
                PathArg::Value { name, .. } => {
                    let leaf_list = match current {
                        Some(node) if &node.name == name => node,
                        _ => find_schema_child(siblings, name)?,
                    };
                    if !matches!(leaf_list.kind, SchemaKind::LeafList { .. }) {
                        return None;
                    }
                    Some(leaf_list)
                }
            };
        }
        current.map(|node| node.kind.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> SchemaTree {
        SchemaTree::default().with_root(
            SchemaNode::container("top")
                .child(
                    SchemaNode::list("item", ["name"])
                        .ordered_by_user()
                        .child(SchemaNode::leaf("value")),
                )
                .child(SchemaNode::list("plain", ["id"]))
                .child(SchemaNode::leaf_list("tags").ordered_by_user())
                .child(SchemaNode::choice("transport").child(SchemaNode::container("tcp"))),
        )
    }

    fn path(text: &str) -> DataPath {
        DataPath::parse(text).unwrap()
    }

    #[test]
    fn test_collection_kind_requires_node_segment() {
        let schema = schema();
        assert_eq!(
            schema.collection_kind(&path("/top/item")),
            Some((CollectionKind::List, ListOrdering::User))
        );
        assert_eq!(schema.collection_kind(&path("/top/item/item[name=a]")), None);
        assert!(schema.is_ordered_collection(&path("/top/tags")));
        assert!(!schema.is_ordered_collection(&path("/top/plain")));
    }

    #[test]
    fn test_list_keys() {
        let schema = schema();
        assert_eq!(
            schema.list_keys(&path("/top/item")),
            vec![QName::local("name")]
        );
        assert!(schema.list_keys(&path("/top")).is_empty());
    }

    #[test]
    fn test_lookup_through_choice() {
        assert_eq!(
            schema().lookup(&path("/top/tcp")),
            Some(SchemaKind::Container)
        );
    }

    #[test]
    fn test_empty_subtree_builds_from_root() {
        let shell = schema()
            .empty_subtree(&path("/top/item/item[name=a]"))
            .unwrap();

        let expected = DataNode::container("top").with_child(
            DataNode::list("item", ListOrdering::User)
                .with_child(DataNode::map_entry("item", [("name", "a")])),
        );
        assert_eq!(shell, expected);
    }

    #[test]
    fn test_empty_subtree_rejects_leaf_and_unknown() {
        let schema = schema();
        assert!(schema
            .empty_subtree(&path("/top/item/item[name=a]/value"))
            .is_err());
        assert!(schema.empty_subtree(&path("/nope")).is_err());
    }

    #[test]
    fn test_implicit_parent_shell() {
        let schema = schema();
        assert_eq!(schema.implicit_parent_shell(&path("/top")).unwrap(), None);

        let (anchor, shell) = schema
            .implicit_parent_shell(&path("/top/item/item[name=a]"))
            .unwrap()
            .unwrap();
        assert_eq!(anchor, path("/top"));
        assert_eq!(
            shell,
            DataNode::container("top").with_child(DataNode::list("item", ListOrdering::User))
        );
    }
}
