//! `Transaction` implementation over a device session
//!
//! Construction queues a `lock` of the candidate datastore. Edits are queued
//! behind it and dispatched in order; their replies are only inspected when
//! the transaction commits. A commit with any error reply, or any transport
//! failure, discards the candidate and releases the lock instead.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cfgtx_core::errors::{Result, TxError};
use cfgtx_core::model::{DataNode, DataPath, PathArg};
use cfgtx_core::ops::{expand_collection_write, EditOperation};
use cfgtx_core::rpc::{RpcError, RpcResult};
use cfgtx_core::schema::SchemaContext;
use cfgtx_core::transaction::{CommitInfo, TxLifecycle, TxState};
use cfgtx_core_types::TxId;

use crate::client::RpcClient;
use crate::queue::RpcQueue;

const BACKEND: &str = "netconf";

pub struct NetconfTransaction {
    lifecycle: TxLifecycle,
    client: Arc<dyn RpcClient>,
    schema: Arc<dyn SchemaContext>,
    queue: RpcQueue,
    locked: Arc<AtomicBool>,
    /// Entries returned by `read_list`, consumed by a later delete/remove
    read_list_cache: HashMap<DataPath, Vec<DataNode>>,
}

impl NetconfTransaction {
    /// Open a transaction and queue the candidate lock
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(client: Arc<dyn RpcClient>, schema: Arc<dyn SchemaContext>) -> Self {
        let lifecycle = TxLifecycle::new(BACKEND);
        let locked = Arc::new(AtomicBool::new(false));
        let mut queue = RpcQueue::new();

        let lock_client = Arc::clone(&client);
        let lock_flag = Arc::clone(&locked);
        queue.enqueue(move || async move {
            let reply = lock_client.lock().await;
            if matches!(&reply, Ok(result) if result.is_success()) {
                lock_flag.store(true, Ordering::Release);
            }
            reply
        });
        tracing::debug!(tx_id = %lifecycle.id(), "netconf transaction opened, lock queued");

        Self {
            lifecycle,
            client,
            schema,
            queue,
            locked,
            read_list_cache: HashMap::new(),
        }
    }

    /// Whether the candidate lock was granted
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    fn enqueue_edit(&mut self, edit: EditOperation) {
        tracing::debug!(
            tx_id = %self.lifecycle.id(),
            op = edit.name(),
            path = %edit.path(),
            "queued edit"
        );
        let client = Arc::clone(&self.client);
        self.queue
            .enqueue(move || async move { client.edit_config(edit).await });
    }

    fn enqueue_write(
        &mut self,
        path: &DataPath,
        data: DataNode,
        write: fn(DataPath, DataNode) -> EditOperation,
    ) -> Result<()> {
        match expand_collection_write(self.schema.as_ref(), path, &data)? {
            Some(collection) => {
                self.enqueue_edit(EditOperation::Merge(collection.shell_path, collection.shell));
                for (child_path, child) in collection.children {
                    self.enqueue_edit(write(child_path, child));
                }
            }
            None => self.enqueue_edit(write(path.clone(), data)),
        }
        Ok(())
    }

    /// Queue a delete or remove; whole collections become one edit per
    /// current entry
    async fn enqueue_removal(
        &mut self,
        path: &DataPath,
        op: &str,
        removal: fn(DataPath) -> EditOperation,
    ) -> Result<()> {
        if self.schema.collection_kind(path).is_none() {
            self.enqueue_edit(removal(path.clone()));
            return Ok(());
        }

        let entries = self.entries_for_removal(path).await?;
        if entries.is_empty() {
            tracing::debug!(
                tx_id = %self.lifecycle.id(),
                path = %path,
                op,
                "collection has no entries, edit omitted"
            );
        }
        for entry in entries {
            self.enqueue_edit(removal(path.node(entry.identifier())));
        }
        Ok(())
    }

    async fn entries_for_removal(&mut self, path: &DataPath) -> Result<Vec<DataNode>> {
        if let Some(cached) = self.read_list_cache.remove(path) {
            return Ok(cached);
        }
        // Key leaves are enough to address each entry
        let key_fields: Vec<DataPath> = self
            .schema
            .list_keys(path)
            .into_iter()
            .map(|key| DataPath::from_args([PathArg::Node(key)]))
            .collect();
        let selection = if key_fields.is_empty() {
            None
        } else {
            Some(key_fields.as_slice())
        };
        let data = self.client.get_config(path, selection).await?;
        Ok(entries_of(data.as_ref()))
    }

    /// Discard the candidate and release the lock, if it was granted
    async fn discard_and_unlock(&mut self) {
        self.read_list_cache.clear();
        if !self.is_locked() {
            tracing::debug!(
                tx_id = %self.lifecycle.id(),
                "lock was not granted, skipping discard-changes and unlock"
            );
            return;
        }
        let discard = self.client.discard_changes().await;
        log_outcome(self.lifecycle.id(), "discard-changes", &discard);
        let unlock = self.client.unlock().await;
        log_outcome(self.lifecycle.id(), "unlock", &unlock);
    }

    async fn fail(&mut self, err: TxError) -> Result<CommitInfo> {
        tracing::warn!(
            tx_id = %self.lifecycle.id(),
            error = %err,
            code = err.code(),
            "netconf commit failed, compensating"
        );
        self.discard_and_unlock().await;
        Err(err)
    }
}

fn entries_of(data: Option<&DataNode>) -> Vec<DataNode> {
    data.and_then(DataNode::children)
        .map(|entries| entries.values().cloned().collect())
        .unwrap_or_default()
}

fn rpc_failure(stage: &str, errors: Vec<RpcError>) -> TxError {
    let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
    TxError::CommitFailed {
        message: format!("RPC during {} failed: {}", stage, details.join("; ")),
        errors,
    }
}

fn log_outcome(tx_id: &TxId, op: &str, outcome: &Result<RpcResult>) {
    match outcome {
        Ok(reply) if reply.errors.is_empty() => {}
        Ok(reply) => {
            let details: Vec<String> = reply.errors.iter().map(ToString::to_string).collect();
            tracing::warn!(tx_id = %tx_id, op, errors = %details.join(", "), "rpc reported errors");
        }
        Err(err) => tracing::warn!(tx_id = %tx_id, op, error = %err, "rpc failed"),
    }
}

#[async_trait]
impl cfgtx_core::Transaction for NetconfTransaction {
    fn id(&self) -> &TxId {
        self.lifecycle.id()
    }

    fn state(&self) -> TxState {
        self.lifecycle.state()
    }

    fn schema(&self) -> &dyn SchemaContext {
        self.schema.as_ref()
    }

    async fn delete(&mut self, path: &DataPath) -> Result<()> {
        self.lifecycle.ensure_open("delete")?;
        self.enqueue_removal(path, "delete", EditOperation::Delete)
            .await
    }

    async fn remove(&mut self, path: &DataPath) -> Result<()> {
        self.lifecycle.ensure_open("remove")?;
        self.enqueue_removal(path, "remove", EditOperation::Remove)
            .await
    }

    async fn merge(&mut self, path: &DataPath, data: DataNode) -> Result<()> {
        self.lifecycle.ensure_open("merge")?;
        self.enqueue_edit(EditOperation::Merge(path.clone(), data));
        Ok(())
    }

    async fn create(&mut self, path: &DataPath, data: DataNode) -> Result<()> {
        self.lifecycle.ensure_open("create")?;
        self.enqueue_write(path, data, EditOperation::Create)
    }

    async fn replace(&mut self, path: &DataPath, data: DataNode) -> Result<()> {
        self.lifecycle.ensure_open("replace")?;
        self.enqueue_write(path, data, EditOperation::Replace)
    }

    async fn read_list(&mut self, path: &DataPath) -> Result<Option<DataNode>> {
        self.lifecycle.ensure_open("read_list")?;
        let data = self.client.get_config(path, None).await?;
        self.read_list_cache
            .insert(path.clone(), entries_of(data.as_ref()));
        Ok(data)
    }

    async fn commit(&mut self) -> Result<CommitInfo> {
        self.lifecycle.finish("commit", TxState::Committed)?;

        let mut warnings = Vec::new();
        let mut failures = Vec::new();
        for outcome in self.queue.drain().await {
            match outcome {
                Ok(reply) => {
                    let (warned, failed): (Vec<_>, Vec<_>) =
                        reply.errors.into_iter().partition(RpcError::is_warning);
                    warnings.extend(warned);
                    failures.extend(failed);
                }
                Err(err) => return self.fail(err).await,
            }
        }
        if !failures.is_empty() {
            return self.fail(rpc_failure("edit-config", failures)).await;
        }

        match self.client.commit().await {
            Ok(reply) if reply.is_success() => {
                warnings.extend(reply.errors);
                if !warnings.is_empty() {
                    tracing::warn!(
                        tx_id = %self.lifecycle.id(),
                        warnings = warnings.len(),
                        "commit succeeded with warnings"
                    );
                }
                let unlock = self.client.unlock().await;
                log_outcome(self.lifecycle.id(), "unlock", &unlock);
                self.read_list_cache.clear();
                Ok(CommitInfo {
                    tx_id: self.lifecycle.id().clone(),
                    warnings,
                })
            }
            Ok(reply) => {
                let failed = reply.errors.into_iter().filter(|e| !e.is_warning()).collect();
                self.fail(rpc_failure("commit", failed)).await
            }
            Err(err) => self.fail(err).await,
        }
    }

    async fn cancel(&mut self) -> Result<()> {
        self.lifecycle.finish("cancel", TxState::Cancelled)?;
        self.read_list_cache.clear();
        // Only the lock is awaited, so the unlock cannot overtake it. Edits
        // still in flight are abandoned and their replies ignored.
        let lock = self.queue.head();
        let abandoned = self.queue.len().saturating_sub(1);
        self.queue.clear();
        if let Some(lock) = lock {
            let outcome = lock.await;
            log_outcome(self.lifecycle.id(), "lock", &outcome);
        }
        tracing::debug!(
            tx_id = %self.lifecycle.id(),
            abandoned,
            "netconf transaction cancelled"
        );
        let discard = self.client.discard_changes().await;
        log_outcome(self.lifecycle.id(), "discard-changes", &discard);
        let unlock = self.client.unlock().await;
        log_outcome(self.lifecycle.id(), "unlock", &unlock);
        Ok(())
    }
}
