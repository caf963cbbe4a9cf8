//! Multi-edit patch requests
//!
//! Edits run in order inside one transaction. The first failing edit stops
//! the patch and cancels the transaction; later edits get no status entry.

use std::time::Instant;

use cfgtx_core::errors::{Result, TxError};
use cfgtx_core::{log_op_start, DataNode};
use cfgtx_core::ops::{EditStatus, PatchContext, PatchEdit, PatchOperation, PatchStatus};
use cfgtx_core::rpc::RpcError;
use cfgtx_core::transaction::Transaction;

use super::strategy::{cancel_quietly, commit, log_outcome, DataStrategy};

impl DataStrategy {
    /// Apply every edit of `patch` in one transaction
    ///
    /// Edit and commit failures are reported in the returned status.
    ///
    /// # Errors
    ///
    /// Only when no transaction can be opened (`UnsupportedOperation` for
    /// `NoData`).
    pub async fn patch(&self, patch: &PatchContext) -> Result<PatchStatus> {
        let start = Instant::now();
        log_op_start!(
            "patch",
            patch_id = %patch.patch_id,
            edits = patch.edits.len(),
            backend = self.backend_name()
        );
        let result = self.patch_inner(patch).await;
        log_outcome("patch", start, &result);
        result
    }

    async fn patch_inner(&self, patch: &PatchContext) -> Result<PatchStatus> {
        let mut tx = self.prepare_write_execution()?;
        let mut edits = Vec::with_capacity(patch.edits.len());

        for edit in &patch.edits {
            match apply_patch_edit(tx.as_mut(), edit).await {
                Ok(()) => edits.push(EditStatus::success(&edit.edit_id)),
                Err(errors) => {
                    tracing::debug!(
                        patch_id = %patch.patch_id,
                        edit_id = %edit.edit_id,
                        target = %edit.target,
                        "patch edit failed, cancelling"
                    );
                    edits.push(EditStatus::failure(&edit.edit_id, errors));
                    cancel_quietly(tx.as_mut()).await;
                    return Ok(PatchStatus {
                        patch_id: patch.patch_id.clone(),
                        ok: false,
                        edits,
                        global_errors: Vec::new(),
                    });
                }
            }
        }

        let global_errors = match commit(tx.as_mut(), "PATCH").await {
            Ok(()) => Vec::new(),
            Err(err) => err.rpc_errors(),
        };
        Ok(PatchStatus {
            patch_id: patch.patch_id.clone(),
            ok: global_errors.is_empty(),
            edits,
            global_errors,
        })
    }
}

/// Run one edit; failures come back as the errors of its status entry
async fn apply_patch_edit(
    tx: &mut dyn Transaction,
    edit: &PatchEdit,
) -> std::result::Result<(), Vec<RpcError>> {
    let target = &edit.target;
    let outcome: Result<()> = async {
        match edit.operation {
            PatchOperation::Create => tx.create(target, value_of(edit)?).await,
            PatchOperation::Delete => tx.delete(target).await,
            PatchOperation::Remove => tx.remove(target).await,
            PatchOperation::Merge => {
                let value = value_of(edit)?;
                tx.ensure_parents_by_merge(target).await?;
                tx.merge(target, value).await
            }
            PatchOperation::Replace => tx.replace(target, value_of(edit)?).await,
            PatchOperation::Insert | PatchOperation::Move => Err(TxError::unsupported(
                "Not supported Yang Patch operation",
            )),
        }
    }
    .await;
    outcome.map_err(|err| err.rpc_errors())
}

fn value_of(edit: &PatchEdit) -> Result<DataNode> {
    edit.value.clone().ok_or_else(|| {
        TxError::invalid_input(format!(
            "edit {} ({:?}) requires a value",
            edit.edit_id, edit.operation
        ))
    })
}
