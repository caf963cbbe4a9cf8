//! In-process device
//!
//! Holds a running and a candidate configuration plus operational data.
//! Edits go to the candidate, `commit` copies it to running and
//! `discard-changes` copies running back. Every call is journaled, and
//! faults can be queued per operation name to make the next call of that
//! operation return an error, a warning or a transport failure.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use cfgtx_core::errors::{Result, TxError};
use cfgtx_core::model::{DataNode, DataPath, DataTree};
use cfgtx_core::ops::{merge_config_and_state, EditOperation};
use cfgtx_core::rpc::{ErrorTag, RpcError, RpcResult};

use crate::client::RpcClient;

/// One call received by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcCall {
    Lock,
    Unlock,
    DiscardChanges,
    Get(DataPath),
    GetConfig(DataPath),
    Edit {
        operation: &'static str,
        path: DataPath,
    },
    Commit,
}

impl RpcCall {
    /// Protocol name of the call; edits report their operation
    pub fn name(&self) -> &'static str {
        match self {
            RpcCall::Lock => "lock",
            RpcCall::Unlock => "unlock",
            RpcCall::DiscardChanges => "discard-changes",
            RpcCall::Get(_) => "get",
            RpcCall::GetConfig(_) => "get-config",
            RpcCall::Edit { operation, .. } => *operation,
            RpcCall::Commit => "commit",
        }
    }
}

/// Injected misbehavior for a single call
#[derive(Debug, Clone)]
pub enum Fault {
    /// Reply carries this error and the call has no effect
    Error(RpcError),
    /// Call takes effect and the reply carries this warning
    Warning(RpcError),
    /// Call never reaches the device
    Transport(String),
}

#[derive(Default)]
struct DeviceState {
    running: DataTree,
    candidate: DataTree,
    operational: DataTree,
    locked: bool,
    journal: Vec<RpcCall>,
    faults: HashMap<&'static str, VecDeque<Fault>>,
}

#[derive(Default)]
pub struct LoopbackDevice {
    state: Mutex<DeviceState>,
}

impl LoopbackDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write committed configuration directly
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the node does not fit the path.
    pub fn seed_running(&self, path: &DataPath, data: DataNode) -> Result<()> {
        let mut state = self.state();
        state.running.put(path, data.clone())?;
        state.candidate.put(path, data)
    }

    /// # Errors
    ///
    /// `InvalidInput` when the node does not fit the path.
    pub fn seed_operational(&self, path: &DataPath, data: DataNode) -> Result<()> {
        self.state().operational.put(path, data)
    }

    /// Make the next call of `operation` misbehave
    ///
    /// Faults for the same operation are consumed in injection order.
    pub fn inject(&self, operation: &'static str, fault: Fault) {
        self.state()
            .faults
            .entry(operation)
            .or_default()
            .push_back(fault);
    }

    pub fn running(&self) -> DataTree {
        self.state().running.clone()
    }

    pub fn candidate(&self) -> DataTree {
        self.state().candidate.clone()
    }

    pub fn is_locked(&self) -> bool {
        self.state().locked
    }

    pub fn journal(&self) -> Vec<RpcCall> {
        self.state().journal.clone()
    }

    /// Names of the calls received so far, in arrival order
    pub fn call_names(&self) -> Vec<&'static str> {
        self.state().journal.iter().map(RpcCall::name).collect()
    }

    /// Journal the call, then run `body` unless a fault preempts it
    fn call<F>(&self, call: RpcCall, body: F) -> Result<RpcResult>
    where
        F: FnOnce(&mut DeviceState) -> RpcResult,
    {
        let mut state = self.state();
        let name = call.name();
        state.journal.push(call);
        let fault = state.faults.get_mut(name).and_then(VecDeque::pop_front);
        match fault {
            None => Ok(body(&mut *state)),
            Some(Fault::Error(error)) => Ok(RpcResult::with_errors(vec![error])),
            Some(Fault::Warning(warning)) => {
                let mut result = body(&mut *state);
                result.errors.push(warning);
                Ok(result)
            }
            Some(Fault::Transport(message)) => Err(TxError::Transport {
                op: name.to_string(),
                message,
            }),
        }
    }

    fn read<F>(&self, call: RpcCall, body: F) -> Result<Option<DataNode>>
    where
        F: FnOnce(&DeviceState) -> Result<Option<DataNode>>,
    {
        let mut state = self.state();
        let name = call.name();
        let path = match &call {
            RpcCall::Get(path) | RpcCall::GetConfig(path) => path.to_string(),
            _ => String::new(),
        };
        state.journal.push(call);
        match state.faults.get_mut(name).and_then(VecDeque::pop_front) {
            None | Some(Fault::Warning(_)) => body(&*state),
            Some(Fault::Error(error)) => Err(TxError::ReadFailed {
                path,
                message: error.message,
            }),
            Some(Fault::Transport(message)) => Err(TxError::Transport {
                op: name.to_string(),
                message,
            }),
        }
    }
}

fn reply_for(result: Result<()>) -> RpcResult {
    match result {
        Ok(()) => RpcResult::ok(),
        Err(err) => RpcResult::with_errors(err.rpc_errors()),
    }
}

/// Keep only the subtrees of `node` selected by `fields`
///
/// Fields are relative paths of node segments. Collections apply the
/// selection to each entry; list entries keep their key leaves.
pub fn select_fields(node: &DataNode, fields: &[DataPath]) -> DataNode {
    if node.is_collection() {
        let mut selected = node.empty_like();
        for entry in node.children().into_iter().flat_map(|c| c.values()) {
            selected.insert_child(select_fields(entry, fields));
        }
        return selected;
    }
    let Some(children) = node.children() else {
        return node.clone();
    };

    let mut selected = node.empty_like();
    for child in children.values() {
        let mut nested = Vec::new();
        let mut whole = false;
        for field in fields {
            let Some((first, rest)) = field.args().split_first() else {
                continue;
            };
            if first.name() != child.name() {
                continue;
            }
            if rest.is_empty() {
                whole = true;
            } else {
                nested.push(DataPath::from_args(rest.iter().cloned()));
            }
        }
        if whole {
            selected.insert_child(child.clone());
        } else if !nested.is_empty() {
            selected.insert_child(select_fields(child, &nested));
        }
    }
    selected
}

fn project(node: Option<&DataNode>, fields: Option<&[DataPath]>) -> Option<DataNode> {
    let node = node?;
    Some(match fields {
        Some(fields) => select_fields(node, fields),
        None => node.clone(),
    })
}

#[async_trait]
impl RpcClient for LoopbackDevice {
    async fn lock(&self) -> Result<RpcResult> {
        self.call(RpcCall::Lock, |state| {
            if state.locked {
                return RpcResult::with_errors(vec![RpcError::error(
                    ErrorTag::LockDenied,
                    "Lock is already held",
                )]);
            }
            state.locked = true;
            RpcResult::ok()
        })
    }

    async fn unlock(&self) -> Result<RpcResult> {
        self.call(RpcCall::Unlock, |state| {
            if !state.locked {
                return RpcResult::with_errors(vec![RpcError::error(
                    ErrorTag::OperationFailed,
                    "Lock is not held",
                )]);
            }
            state.locked = false;
            RpcResult::ok()
        })
    }

    async fn discard_changes(&self) -> Result<RpcResult> {
        self.call(RpcCall::DiscardChanges, |state| {
            state.candidate = state.running.clone();
            RpcResult::ok()
        })
    }

    async fn get(&self, path: &DataPath, fields: Option<&[DataPath]>) -> Result<Option<DataNode>> {
        self.read(RpcCall::Get(path.clone()), |state| {
            let merged = merge_config_and_state(
                state.operational.get(path).cloned(),
                state.running.get(path).cloned(),
            )?;
            Ok(project(merged.as_ref(), fields))
        })
    }

    async fn get_config(
        &self,
        path: &DataPath,
        fields: Option<&[DataPath]>,
    ) -> Result<Option<DataNode>> {
        self.read(RpcCall::GetConfig(path.clone()), |state| {
            Ok(project(state.running.get(path), fields))
        })
    }

    async fn edit_config(&self, edit: EditOperation) -> Result<RpcResult> {
        let call = RpcCall::Edit {
            operation: edit.name(),
            path: edit.path().clone(),
        };
        self.call(call, |state| reply_for(edit.apply(&mut state.candidate)))
    }

    async fn commit(&self) -> Result<RpcResult> {
        self.call(RpcCall::Commit, |state| {
            state.running = state.candidate.clone();
            RpcResult::ok()
        })
    }
}
