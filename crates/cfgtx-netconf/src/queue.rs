//! FIFO queue of device RPCs
//!
//! Every entry is spawned immediately but its body waits for the entry in
//! front of it, so RPCs reach the device strictly in enqueue order. The head
//! entry (the lock) gates the queue: the entry right behind a failed head
//! resolves to `LockDenied` without touching the device. A transport failure
//! of any entry is handed down the chain unchanged.

use std::future::Future;

use cfgtx_core::errors::{Result, TxError};
use cfgtx_core::rpc::RpcResult;
use futures::future::{join_all, BoxFuture, Shared};
use futures::FutureExt;

pub type RpcOutcome = Result<RpcResult>;

/// Queue entry that any number of successors can await
pub type QueuedRpc = Shared<BoxFuture<'static, RpcOutcome>>;

#[derive(Default)]
pub struct RpcQueue {
    entries: Vec<QueuedRpc>,
}

impl RpcQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry, the one gating every other
    pub fn head(&self) -> Option<QueuedRpc> {
        self.entries.first().cloned()
    }

    /// Append `operation`, to be started once every earlier entry resolved
    ///
    /// Must be called from within a tokio runtime.
    pub fn enqueue<F, Fut>(&mut self, operation: F) -> QueuedRpc
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = RpcOutcome> + Send + 'static,
    {
        let previous = self.entries.last().cloned();
        let behind_head = self.entries.len() == 1;
        let handle = tokio::spawn(async move {
            if let Some(previous) = previous {
                match previous.await {
                    Ok(result) if behind_head && !result.is_success() => {
                        return Err(lock_denied());
                    }
                    Err(_) if behind_head => return Err(lock_denied()),
                    Err(err) => return Err(err),
                    Ok(_) => {}
                }
            }
            operation().await
        });

        let entry = async move {
            handle.await.unwrap_or_else(|err| {
                Err(TxError::internal(format!("queued rpc task failed: {}", err)))
            })
        }
        .boxed()
        .shared();
        self.entries.push(entry.clone());
        entry
    }

    /// Drop every entry; RPCs already dispatched still run to completion
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Wait for every entry and return the outcomes in queue order
    pub async fn drain(&mut self) -> Vec<RpcOutcome> {
        join_all(std::mem::take(&mut self.entries)).await
    }
}

fn lock_denied() -> TxError {
    TxError::LockDenied {
        message: "Lock operation failed".to_string(),
    }
}
