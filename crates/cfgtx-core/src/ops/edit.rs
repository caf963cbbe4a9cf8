//! Primitive edit operations and collection-write expansion

use std::fmt;

use crate::errors::{Result, TxError};
use crate::model::{DataNode, DataPath, DataTree, PathArg};
use crate::schema::SchemaContext;

/// Primitive edit understood by every backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOperation {
    /// Delete existing data; fails when absent
    Delete(DataPath),
    /// Delete if present
    Remove(DataPath),
    Merge(DataPath, DataNode),
    /// Write new data; fails when present
    Create(DataPath, DataNode),
    Replace(DataPath, DataNode),
}

impl EditOperation {
    pub fn path(&self) -> &DataPath {
        match self {
            EditOperation::Delete(path) | EditOperation::Remove(path) => path,
            EditOperation::Merge(path, _)
            | EditOperation::Create(path, _)
            | EditOperation::Replace(path, _) => path,
        }
    }

    /// Protocol operation name
    pub fn name(&self) -> &'static str {
        match self {
            EditOperation::Delete(_) => "delete",
            EditOperation::Remove(_) => "remove",
            EditOperation::Merge(..) => "merge",
            EditOperation::Create(..) => "create",
            EditOperation::Replace(..) => "replace",
        }
    }

    /// Apply to an in-memory tree with protocol semantics
    ///
    /// # Errors
    ///
    /// `DataMissing` for a delete of absent data, `DataExists` for a create
    /// of present data, `InvalidInput` for malformed writes.
    pub fn apply(&self, tree: &mut DataTree) -> Result<()> {
        match self {
            EditOperation::Delete(path) => {
                if tree.delete(path) {
                    Ok(())
                } else {
                    Err(TxError::data_missing(path))
                }
            }
            EditOperation::Remove(path) => {
                tree.delete(path);
                Ok(())
            }
            EditOperation::Merge(path, node) => tree.merge(path, node.clone()),
            EditOperation::Create(path, node) => {
                if tree.contains(path) {
                    return Err(TxError::data_exists(path));
                }
                tree.put(path, node.clone())
            }
            EditOperation::Replace(path, node) => tree.put(path, node.clone()),
        }
    }
}

impl fmt::Display for EditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name(), self.path())
    }
}

/// Requested position of a new entry in an ordered-by-user collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertPosition {
    First,
    Last,
    /// Before the sibling addressed by the segment
    Before(PathArg),
    /// After the sibling addressed by the segment
    After(PathArg),
}

impl InsertPosition {
    pub fn point(&self) -> Option<&PathArg> {
        match self {
            InsertPosition::Before(point) | InsertPosition::After(point) => Some(point),
            InsertPosition::First | InsertPosition::Last => None,
        }
    }
}

/// A whole-collection create or replace split into primitive writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionWrite {
    /// Anchor of the shell merge (first segment of the collection path)
    pub shell_path: DataPath,
    /// Empty structure down to the collection
    pub shell: DataNode,
    /// One write per entry, in entry order
    pub children: Vec<(DataPath, DataNode)>,
}

/// Split a write of a whole list or leaf-list into a shell merge plus one
/// write per entry; `None` for any other node
///
/// # Errors
///
/// Propagates schema failures when the shell cannot be built.
pub fn expand_collection_write(
    schema: &dyn SchemaContext,
    path: &DataPath,
    data: &DataNode,
) -> Result<Option<CollectionWrite>> {
    if !data.is_collection() {
        return Ok(None);
    }
    let shell_path = path
        .head()
        .ok_or_else(|| TxError::invalid_input("collection write at the datastore root"))?;
    let shell = schema.empty_subtree(path)?;
    let children = data
        .children()
        .map(|entries| {
            entries
                .values()
                .map(|child| (path.node(child.identifier()), child.clone()))
                .collect()
        })
        .unwrap_or_default();
    Ok(Some(CollectionWrite {
        shell_path,
        shell,
        children,
    }))
}
