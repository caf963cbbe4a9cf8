//! Normalized data nodes

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::path::{KeyPredicates, PathArg, QName, Scalar};
use crate::errors::{Result, TxError};

/// Children of an interior node keyed by their path segment
///
/// Iteration order is insertion order, which is the user-visible order of
/// ordered-by-user lists and leaf-lists.
pub type Children = IndexMap<PathArg, DataNode>;

/// Ordering declared for a list or leaf-list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListOrdering {
    #[default]
    System,
    User,
}

/// Node kind, used when reporting structural mismatches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Leaf,
    LeafSetEntry,
    LeafSet,
    Container,
    List,
    MapEntry,
    UnkeyedList,
    Choice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataNode {
    Leaf {
        name: QName,
        value: Scalar,
    },
    LeafSetEntry {
        name: QName,
        value: Scalar,
    },
    LeafSet {
        name: QName,
        ordering: ListOrdering,
        entries: Children,
    },
    Container {
        name: QName,
        children: Children,
    },
    List {
        name: QName,
        ordering: ListOrdering,
        entries: Children,
    },
    MapEntry {
        name: QName,
        keys: KeyPredicates,
        children: Children,
    },
    UnkeyedList {
        name: QName,
        entries: Vec<DataNode>,
    },
    /// Transparent to paths: its children are addressed as children of the
    /// enclosing node
    Choice {
        name: QName,
        children: Children,
    },
}

impl DataNode {
    pub fn leaf(name: impl Into<QName>, value: impl Into<Scalar>) -> Self {
        DataNode::Leaf {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn container(name: impl Into<QName>) -> Self {
        DataNode::Container {
            name: name.into(),
            children: Children::new(),
        }
    }

    pub fn choice(name: impl Into<QName>) -> Self {
        DataNode::Choice {
            name: name.into(),
            children: Children::new(),
        }
    }

    pub fn list(name: impl Into<QName>, ordering: ListOrdering) -> Self {
        DataNode::List {
            name: name.into(),
            ordering,
            entries: Children::new(),
        }
    }

    /// List entry; key leaves are added as children
    pub fn map_entry<K, V>(name: impl Into<QName>, keys: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<QName>,
        V: Into<Scalar>,
    {
        let keys: KeyPredicates = keys
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::map_entry_with_keys(name.into(), keys)
    }

    pub(crate) fn map_entry_with_keys(name: QName, keys: KeyPredicates) -> Self {
        let children = keys
            .iter()
            .map(|(key, value)| {
                let leaf = DataNode::Leaf {
                    name: key.clone(),
                    value: value.clone(),
                };
                (leaf.identifier(), leaf)
            })
            .collect();
        DataNode::MapEntry {
            name,
            keys,
            children,
        }
    }

    pub fn leaf_set(name: impl Into<QName>, ordering: ListOrdering) -> Self {
        DataNode::LeafSet {
            name: name.into(),
            ordering,
            entries: Children::new(),
        }
    }

    pub fn leaf_set_entry(name: impl Into<QName>, value: impl Into<Scalar>) -> Self {
        DataNode::LeafSetEntry {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn unkeyed_list(name: impl Into<QName>, entries: Vec<DataNode>) -> Self {
        DataNode::UnkeyedList {
            name: name.into(),
            entries,
        }
    }

    /// Builder-style child insertion
    ///
    /// Children of leaves and unkeyed lists are ignored.
    pub fn with_child(mut self, child: DataNode) -> Self {
        self.insert_child(child);
        self
    }

    /// Insert or replace a child, returning `false` when this node cannot
    /// have keyed children
    pub fn insert_child(&mut self, child: DataNode) -> bool {
        match self.children_mut() {
            Some(children) => {
                children.insert(child.identifier(), child);
                true
            }
            None => false,
        }
    }

    pub fn name(&self) -> &QName {
        match self {
            DataNode::Leaf { name, .. }
            | DataNode::LeafSetEntry { name, .. }
            | DataNode::LeafSet { name, .. }
            | DataNode::Container { name, .. }
            | DataNode::List { name, .. }
            | DataNode::MapEntry { name, .. }
            | DataNode::UnkeyedList { name, .. }
            | DataNode::Choice { name, .. } => name,
        }
    }

    /// The path segment that addresses this node below its parent
    pub fn identifier(&self) -> PathArg {
        match self {
            DataNode::MapEntry { name, keys, .. } => PathArg::Entry {
                name: name.clone(),
                keys: keys.clone(),
            },
            DataNode::LeafSetEntry { name, value } => PathArg::Value {
                name: name.clone(),
                value: value.clone(),
            },
            other => PathArg::Node(other.name().clone()),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            DataNode::Leaf { .. } => NodeKind::Leaf,
            DataNode::LeafSetEntry { .. } => NodeKind::LeafSetEntry,
            DataNode::LeafSet { .. } => NodeKind::LeafSet,
            DataNode::Container { .. } => NodeKind::Container,
            DataNode::List { .. } => NodeKind::List,
            DataNode::MapEntry { .. } => NodeKind::MapEntry,
            DataNode::UnkeyedList { .. } => NodeKind::UnkeyedList,
            DataNode::Choice { .. } => NodeKind::Choice,
        }
    }

    /// Keyed children (entries of collections, members of containers)
    pub fn children(&self) -> Option<&Children> {
        match self {
            DataNode::Container { children, .. }
            | DataNode::MapEntry { children, .. }
            | DataNode::Choice { children, .. } => Some(children),
            DataNode::List { entries, .. } | DataNode::LeafSet { entries, .. } => Some(entries),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Children> {
        match self {
            DataNode::Container { children, .. }
            | DataNode::MapEntry { children, .. }
            | DataNode::Choice { children, .. } => Some(children),
            DataNode::List { entries, .. } | DataNode::LeafSet { entries, .. } => Some(entries),
            _ => None,
        }
    }

    /// Lists and leaf-lists
    pub fn is_collection(&self) -> bool {
        matches!(self, DataNode::List { .. } | DataNode::LeafSet { .. })
    }

    pub fn ordering(&self) -> Option<ListOrdering> {
        match self {
            DataNode::List { ordering, .. } | DataNode::LeafSet { ordering, .. } => {
                Some(*ordering)
            }
            _ => None,
        }
    }

    /// Direct child lookup, looking through choices
    pub fn child(&self, arg: &PathArg) -> Option<&DataNode> {
        self.children().and_then(|children| find_child(children, arg))
    }

    /// Value of a leaf or leaf-list entry
    pub fn value(&self) -> Option<&Scalar> {
        match self {
            DataNode::Leaf { value, .. } | DataNode::LeafSetEntry { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Node of the same identity and kind without any content
    ///
    /// Key leaves of a list entry are kept.
    pub fn empty_like(&self) -> DataNode {
        match self {
            DataNode::LeafSet { name, ordering, .. } => DataNode::leaf_set(name.clone(), *ordering),
            DataNode::Container { name, .. } => DataNode::container(name.clone()),
            DataNode::List { name, ordering, .. } => DataNode::list(name.clone(), *ordering),
            DataNode::MapEntry { name, keys, .. } => {
                DataNode::map_entry_with_keys(name.clone(), keys.clone())
            }
            DataNode::UnkeyedList { name, .. } => DataNode::unkeyed_list(name.clone(), Vec::new()),
            DataNode::Choice { name, .. } => DataNode::choice(name.clone()),
            leaf => leaf.clone(),
        }
    }

    /// Interior node standing in for a missing ancestor addressed by `arg`
    ///
    /// The kind is inferred from the segment and the one that follows it.
    pub(crate) fn skeleton(arg: &PathArg, next: Option<&PathArg>) -> Result<DataNode> {
        match arg {
            PathArg::Node(name) => Ok(match next {
                Some(PathArg::Entry { .. }) => DataNode::list(name.clone(), ListOrdering::System),
                Some(PathArg::Value { .. }) => {
                    DataNode::leaf_set(name.clone(), ListOrdering::System)
                }
                _ => DataNode::container(name.clone()),
            }),
            PathArg::Entry { name, keys } => {
                Ok(DataNode::map_entry_with_keys(name.clone(), keys.clone()))
            }
            PathArg::Value { .. } => Err(TxError::invalid_input(format!(
                "leaf-list entry {} cannot have children",
                arg
            ))),
        }
    }
}

/// Child lookup that looks through choice nodes
pub(crate) fn find_child<'a>(children: &'a Children, arg: &PathArg) -> Option<&'a DataNode> {
    if let Some(found) = children.get(arg) {
        return Some(found);
    }
    children.values().find_map(|node| match node {
        DataNode::Choice { children, .. } => find_child(children, arg),
        _ => None,
    })
}

pub(crate) fn find_child_mut<'a>(
    children: &'a mut Children,
    arg: &PathArg,
) -> Option<&'a mut DataNode> {
    if children.contains_key(arg) {
        return children.get_mut(arg);
    }
    for node in children.values_mut() {
        if let DataNode::Choice { children: inner, .. } = node {
            if let Some(found) = find_child_mut(inner, arg) {
                return Some(found);
            }
        }
    }
    None
}

/// Remove a child, looking through choices; sibling order is preserved
pub(crate) fn remove_child(children: &mut Children, arg: &PathArg) -> Option<DataNode> {
    if let Some(removed) = children.shift_remove(arg) {
        return Some(removed);
    }
    for node in children.values_mut() {
        if let DataNode::Choice { children: inner, .. } = node {
            if let Some(removed) = remove_child(inner, arg) {
                return Some(removed);
            }
        }
    }
    None
}
