//! Replace (PUT) and create (POST) requests, with optional positional insert

use std::time::Instant;

use cfgtx_core::errors::{Result, TxError};
use cfgtx_core::model::{DataNode, DataPath, Datastore};
use cfgtx_core::ops::{check_existence, plan_insert, InsertPlan, InsertPosition};
use cfgtx_core::schema::{CollectionKind, SchemaContext};
use cfgtx_core::transaction::Transaction;
use cfgtx_core::{log_op_start, ListOrdering};

use super::strategy::{abort, apply_edit, commit, log_outcome, DataStrategy};

/// Whether a replace created new data or overwrote existing data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutResult {
    Created,
    Replaced,
}

impl DataStrategy {
    /// Replace the data at `path` and commit
    ///
    /// With `insert`, `path` must address an entry of an ordered-by-user
    /// collection and the entry is placed at the requested position.
    ///
    /// # Errors
    ///
    /// - `UnsupportedOperation` when `insert` is given for anything but an
    ///   ordered-by-user list or leaf-list entry
    /// - `DataMissing` when the insert point is not in the collection
    /// - the decoded commit failure
    pub async fn put(
        &self,
        path: &DataPath,
        data: DataNode,
        insert: Option<&InsertPosition>,
    ) -> Result<PutResult> {
        let start = Instant::now();
        log_op_start!("put", path = %path, backend = self.backend_name(), insert = ?insert);
        let result = self.put_inner(path, data, insert).await;
        log_outcome("put", start, &result);
        result
    }

    async fn put_inner(
        &self,
        path: &DataPath,
        data: DataNode,
        insert: Option<&InsertPosition>,
    ) -> Result<PutResult> {
        let existed = self.exists_inner(Datastore::Configuration, path).await?;
        let mut tx = match insert {
            None => {
                let mut tx = self.prepare_write_execution()?;
                if let Err(err) = tx.replace(path, data).await {
                    return Err(abort(tx.as_mut(), err).await);
                }
                tx
            }
            Some(position) => {
                let parent = path
                    .parent()
                    .ok_or_else(|| TxError::invalid_input("positional insert at the datastore root"))?;
                check_list_and_ordered_type(self.schema()?.as_ref(), &parent)?;
                let mut tx = self.prepare_write_execution()?;
                if let Err(err) = put_at(tx.as_mut(), path, &parent, data, position).await {
                    return Err(abort(tx.as_mut(), err).await);
                }
                tx
            }
        };
        commit(tx.as_mut(), "PUT").await?;
        Ok(if existed {
            PutResult::Replaced
        } else {
            PutResult::Created
        })
    }

    /// Create `data` under `path` and commit, returning the path of the
    /// created resource
    ///
    /// For a list or leaf-list `data` carries the new entries and the first
    /// entry's path is returned. With `insert`, `path` must address an
    /// ordered-by-user collection.
    ///
    /// # Errors
    ///
    /// - `DataExists` when any of the created data is already present
    /// - `UnsupportedOperation` when `insert` is given for anything but an
    ///   ordered-by-user list or leaf-list
    /// - `DataMissing` when the insert point is not in the collection
    /// - the decoded commit failure
    pub async fn create(
        &self,
        path: &DataPath,
        data: DataNode,
        insert: Option<&InsertPosition>,
    ) -> Result<DataPath> {
        let start = Instant::now();
        log_op_start!("create", path = %path, backend = self.backend_name(), insert = ?insert);
        let result = self.create_inner(path, data, insert).await;
        log_outcome("create", start, &result);
        result
    }

    async fn create_inner(
        &self,
        path: &DataPath,
        data: DataNode,
        insert: Option<&InsertPosition>,
    ) -> Result<DataPath> {
        let location = created_location(path, &data);
        if let Some(position) = insert {
            check_list_and_ordered_type(self.schema()?.as_ref(), path)?;
            let mut tx = self.prepare_write_execution()?;
            if let Err(err) = self.create_at(tx.as_mut(), path, data, position).await {
                return Err(abort(tx.as_mut(), err).await);
            }
            commit(tx.as_mut(), "POST").await?;
        } else {
            let mut tx = self.prepare_write_execution()?;
            if let Err(err) = tx.create(path, data).await {
                return Err(abort(tx.as_mut(), err).await);
            }
            commit(tx.as_mut(), "POST").await?;
        }
        Ok(location)
    }

    async fn create_at(
        &self,
        tx: &mut dyn Transaction,
        path: &DataPath,
        data: DataNode,
        position: &InsertPosition,
    ) -> Result<()> {
        if *position == InsertPosition::Last {
            return tx.create(path, data).await;
        }
        let current = tx.read_list(path).await?;
        if !has_entries(current.as_ref()) {
            return tx.replace(path, data).await;
        }

        let inserted = entries_of(&data);
        check_existence(self.reader()?, Datastore::Configuration, path, &inserted, false)
            .await
            .into_result(false)?;
        match plan_insert(tx.schema(), path, current.as_ref(), &inserted, position)? {
            InsertPlan::Plain => tx.replace(path, data).await,
            InsertPlan::Reorder(edits) => apply_all(tx, edits).await,
        }
    }
}

async fn put_at(
    tx: &mut dyn Transaction,
    path: &DataPath,
    parent: &DataPath,
    data: DataNode,
    position: &InsertPosition,
) -> Result<()> {
    if *position == InsertPosition::Last {
        return tx.replace(path, data).await;
    }
    let current = tx.read_list(parent).await?;
    let inserted = [data];
    match plan_insert(tx.schema(), parent, current.as_ref(), &inserted, position)? {
        InsertPlan::Plain => {
            let [data] = inserted;
            tx.replace(path, data).await
        }
        InsertPlan::Reorder(edits) => apply_all(tx, edits).await,
    }
}

async fn apply_all(
    tx: &mut dyn Transaction,
    edits: Vec<cfgtx_core::ops::EditOperation>,
) -> Result<()> {
    for edit in edits {
        apply_edit(tx, edit).await?;
    }
    Ok(())
}

/// Reject positional inserts into anything but an ordered-by-user collection
///
/// # Errors
///
/// `UnsupportedOperation` naming what the insert parameter requires.
pub fn check_list_and_ordered_type(schema: &dyn SchemaContext, path: &DataPath) -> Result<()> {
    match schema.collection_kind(path) {
        Some((_, ListOrdering::User)) => Ok(()),
        Some((CollectionKind::List, ListOrdering::System)) => Err(TxError::unsupported(
            "Insert parameter can be used only with ordered-by user list.",
        )),
        Some((CollectionKind::LeafList, ListOrdering::System)) => Err(TxError::unsupported(
            "Insert parameter can be used only with ordered-by user leaf-list.",
        )),
        None => Err(TxError::unsupported(
            "Insert parameter can be used only with list or leaf-list",
        )),
    }
}

fn has_entries(node: Option<&DataNode>) -> bool {
    node.and_then(DataNode::children)
        .is_some_and(|entries| !entries.is_empty())
}

/// Entries written by a create: the children of a collection, or the node
fn entries_of(data: &DataNode) -> Vec<DataNode> {
    if data.is_collection() {
        data.children()
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default()
    } else {
        vec![data.clone()]
    }
}

fn created_location(path: &DataPath, data: &DataNode) -> DataPath {
    if !data.is_collection() {
        return path.clone();
    }
    data.children()
        .and_then(|entries| entries.values().next())
        .map(|first| path.node(first.identifier()))
        .unwrap_or_else(|| path.clone())
}
