//! In-memory data tree
//!
//! Backs the reference broker and the loopback device. Writes create any
//! missing ancestors on the way down; the ancestor kind is inferred from the
//! path (a segment followed by an entry segment becomes a list, and so on).

use super::node::{find_child, find_child_mut, remove_child, Children, DataNode};
use super::path::{DataPath, PathArg};
use crate::errors::{Result, TxError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataTree {
    root: Children,
}

impl DataTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level nodes
    pub fn top_level(&self) -> &Children {
        &self.root
    }

    /// Node at `path`; the root itself is not a node
    pub fn get(&self, path: &DataPath) -> Option<&DataNode> {
        let (first, rest) = path.args().split_first()?;
        let mut current = find_child(&self.root, first)?;
        for arg in rest {
            current = current.child(arg)?;
        }
        Some(current)
    }

    pub fn contains(&self, path: &DataPath) -> bool {
        self.get(path).is_some()
    }

    /// Store `node` at `path`, replacing whatever was there
    ///
    /// A replaced list entry keeps its position among its siblings.
    pub fn put(&mut self, path: &DataPath, node: DataNode) -> Result<()> {
        let arg = check_identity(path, &node)?;
        let children = self.parent_children_mut(path)?;
        match find_child_mut(children, &arg) {
            Some(existing) => *existing = node,
            None => {
                children.insert(arg, node);
            }
        }
        Ok(())
    }

    /// Merge `node` into whatever is at `path`
    pub fn merge(&mut self, path: &DataPath, node: DataNode) -> Result<()> {
        let arg = check_identity(path, &node)?;
        let children = self.parent_children_mut(path)?;
        match find_child_mut(children, &arg) {
            Some(existing) => merge_into(existing, node),
            None => {
                children.insert(arg, node);
            }
        }
        Ok(())
    }

    /// Remove the node at `path`, returning whether anything was removed
    pub fn delete(&mut self, path: &DataPath) -> bool {
        let Some((last, parents)) = path.args().split_last() else {
            let had_data = !self.root.is_empty();
            self.root.clear();
            return had_data;
        };
        let mut current = &mut self.root;
        for arg in parents {
            let Some(node) = find_child_mut(current, arg) else {
                return false;
            };
            let Some(children) = node.children_mut() else {
                return false;
            };
            current = children;
        }
        remove_child(current, last).is_some()
    }

    fn parent_children_mut(&mut self, path: &DataPath) -> Result<&mut Children> {
        let args = path.args();
        let parents = args.len().saturating_sub(1);
        let mut current = &mut self.root;
        for idx in 0..parents {
            let arg = &args[idx];
            if find_child_mut(current, arg).is_none() {
                let skeleton = DataNode::skeleton(arg, args.get(idx + 1))?;
                current.insert(arg.clone(), skeleton);
            }
            let node = find_child_mut(current, arg)
                .ok_or_else(|| TxError::internal(format!("ancestor {} vanished", arg)))?;
            current = node.children_mut().ok_or_else(|| {
                TxError::invalid_input(format!("path {} traverses non-interior node {}", path, arg))
            })?;
        }
        Ok(current)
    }
}

fn check_identity(path: &DataPath, node: &DataNode) -> Result<PathArg> {
    let arg = path
        .last()
        .ok_or_else(|| TxError::invalid_input("cannot write at the datastore root"))?;
    let identifier = node.identifier();
    if *arg != identifier {
        return Err(TxError::invalid_input(format!(
            "node {} does not match last path segment {} of {}",
            identifier, arg, path
        )));
    }
    Ok(identifier)
}

/// Structural merge: source children are merged into matching target
/// children, new ones are appended, scalars take the source value
pub(crate) fn merge_into(target: &mut DataNode, source: DataNode) {
    if target.kind() != source.kind() {
        *target = source;
        return;
    }
    match source {
        DataNode::Leaf { .. } | DataNode::LeafSetEntry { .. } | DataNode::UnkeyedList { .. } => {
            *target = source;
        }
        DataNode::Container { children, .. }
        | DataNode::MapEntry { children, .. }
        | DataNode::Choice { children, .. }
        | DataNode::List {
            entries: children, ..
        }
        | DataNode::LeafSet {
            entries: children, ..
        } => {
            let Some(target_children) = target.children_mut() else {
                return;
            };
            for (arg, child) in children {
                match find_child_mut(target_children, &arg) {
                    Some(existing) => merge_into(existing, child),
                    None => {
                        target_children.insert(arg, child);
                    }
                }
            }
        }
    }
}
