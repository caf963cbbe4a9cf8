//! Patch requests and their status report

use serde::{Deserialize, Serialize};

use crate::model::{DataNode, DataPath};
use crate::rpc::RpcError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOperation {
    Create,
    Delete,
    Insert,
    Merge,
    Move,
    Replace,
    Remove,
}

/// One edit of a patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchEdit {
    pub edit_id: String,
    pub operation: PatchOperation,
    pub target: DataPath,
    /// Required by create, merge and replace
    pub value: Option<DataNode>,
}

impl PatchEdit {
    pub fn new(
        edit_id: impl Into<String>,
        operation: PatchOperation,
        target: DataPath,
        value: Option<DataNode>,
    ) -> Self {
        Self {
            edit_id: edit_id.into(),
            operation,
            target,
            value,
        }
    }
}

/// Ordered list of edits applied in a single transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchContext {
    pub patch_id: String,
    pub edits: Vec<PatchEdit>,
}

impl PatchContext {
    pub fn new(patch_id: impl Into<String>) -> Self {
        Self {
            patch_id: patch_id.into(),
            edits: Vec::new(),
        }
    }

    pub fn with_edit(mut self, edit: PatchEdit) -> Self {
        self.edits.push(edit);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditStatus {
    pub edit_id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RpcError>,
}

impl EditStatus {
    pub fn success(edit_id: impl Into<String>) -> Self {
        Self {
            edit_id: edit_id.into(),
            ok: true,
            errors: Vec::new(),
        }
    }

    pub fn failure(edit_id: impl Into<String>, errors: Vec<RpcError>) -> Self {
        Self {
            edit_id: edit_id.into(),
            ok: false,
            errors,
        }
    }
}

/// Outcome of a patch
///
/// Edits after the first failing one are not attempted and have no entry.
/// Commit failures are reported in `global_errors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchStatus {
    pub patch_id: String,
    pub ok: bool,
    pub edits: Vec<EditStatus>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub global_errors: Vec<RpcError>,
}
