//! Positional insert planning for ordered-by-user collections
//!
//! Backends can only replace, merge or delete whole subtrees, so an insert
//! at a position is rewritten as: remove the collection, merge its empty
//! shell back, then replace every entry in the desired order.

use std::collections::HashSet;

use crate::errors::{Result, TxError};
use crate::model::{DataNode, DataPath, PathArg};
use crate::ops::edit::{EditOperation, InsertPosition};
use crate::schema::SchemaContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertPlan {
    /// Position is satisfied by an ordinary write
    Plain,
    /// Edits rebuilding the collection in the requested order
    Reorder(Vec<EditOperation>),
}

/// Plan the insertion of `inserted` into the collection at
/// `collection_path`, whose current content is `current`
///
/// Inserted entries stay contiguous. An inserted entry that already exists
/// in the collection is moved, not duplicated.
///
/// # Errors
///
/// - `InsertPointMissing` when the BEFORE/AFTER point is not an entry of
///   the collection
/// - `InvalidInput` when the point is one of the inserted entries
pub fn plan_insert(
    schema: &dyn SchemaContext,
    collection_path: &DataPath,
    current: Option<&DataNode>,
    inserted: &[DataNode],
    position: &InsertPosition,
) -> Result<InsertPlan> {
    let inserted_keys: HashSet<PathArg> = inserted.iter().map(DataNode::identifier).collect();
    let siblings: Vec<&DataNode> = current
        .and_then(DataNode::children)
        .map(|entries| {
            entries
                .iter()
                .filter(|(key, _)| !inserted_keys.contains(*key))
                .map(|(_, node)| node)
                .collect()
        })
        .unwrap_or_default();

    if siblings.is_empty() || *position == InsertPosition::Last {
        return Ok(InsertPlan::Plain);
    }

    let index = match position {
        InsertPosition::First => 0,
        InsertPosition::Last => siblings.len(),
        InsertPosition::Before(point) | InsertPosition::After(point) => {
            if inserted_keys.contains(point) {
                return Err(TxError::invalid_input(format!(
                    "point {} refers to the entry being inserted",
                    point
                )));
            }
            let found = siblings
                .iter()
                .position(|node| node.identifier() == *point)
                .ok_or_else(|| TxError::InsertPointMissing {
                    path: collection_path.to_string(),
                    point: point.to_string(),
                })?;
            match position {
                InsertPosition::After(_) => found + 1,
                _ => found,
            }
        }
    };

    let shell_path = collection_path
        .head()
        .ok_or_else(|| TxError::invalid_input("positional insert at the datastore root"))?;
    let shell = schema.empty_subtree(collection_path)?;

    let replace = |node: &DataNode| {
        EditOperation::Replace(collection_path.node(node.identifier()), node.clone())
    };

    let mut edits = Vec::with_capacity(siblings.len() + inserted.len() + 2);
    edits.push(EditOperation::Remove(collection_path.clone()));
    edits.push(EditOperation::Merge(shell_path, shell));
    for (idx, sibling) in siblings.iter().copied().enumerate() {
        if idx == index {
            edits.extend(inserted.iter().map(replace));
        }
        edits.push(replace(sibling));
    }
    if index == siblings.len() {
        edits.extend(inserted.iter().map(replace));
    }

    tracing::debug!(
        path = %collection_path,
        index,
        siblings = siblings.len(),
        "planned positional insert"
    );
    Ok(InsertPlan::Reorder(edits))
}
