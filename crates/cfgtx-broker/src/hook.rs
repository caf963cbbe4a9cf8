//! Commit hooks consulted by the in-memory broker
//!
//! A hook sees the full edit journal of a transaction before any of it is
//! applied and may veto the commit with a documented error.

use cfgtx_core::model::Datastore;
use cfgtx_core::ops::EditOperation;

use crate::errors::DocumentedError;

pub trait BrokerCommitHook: Send + Sync {
    /// Check whether the commit is allowed.
    ///
    /// # Errors
    ///
    /// Returns the documented error the commit fails with.
    fn check(
        &self,
        tx_id: &str,
        edits: &[(Datastore, EditOperation)],
    ) -> std::result::Result<(), DocumentedError>;
}

/// Always allows
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCommitHook;

impl BrokerCommitHook for NoopCommitHook {
    fn check(
        &self,
        _: &str,
        _: &[(Datastore, EditOperation)],
    ) -> std::result::Result<(), DocumentedError> {
        Ok(())
    }
}

/// Rejects every commit that carries at least one edit
#[derive(Debug, Clone)]
pub struct RejectingCommitHook {
    error: DocumentedError,
}

impl RejectingCommitHook {
    pub fn new(error: DocumentedError) -> Self {
        Self { error }
    }
}

impl BrokerCommitHook for RejectingCommitHook {
    fn check(
        &self,
        _: &str,
        edits: &[(Datastore, EditOperation)],
    ) -> std::result::Result<(), DocumentedError> {
        if edits.is_empty() {
            return Ok(());
        }
        Err(self.error.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgtx_core::model::DataPath;
    use cfgtx_core::rpc::ErrorTag;

    #[test]
    fn test_noop_hook_allows() {
        let edits = vec![(
            Datastore::Configuration,
            EditOperation::Remove(DataPath::parse("/top").unwrap()),
        )];
        assert!(NoopCommitHook.check("1", &edits).is_ok());
    }

    #[test]
    fn test_rejecting_hook_only_rejects_writes() {
        let hook = RejectingCommitHook::new(DocumentedError::new(ErrorTag::InUse, "busy"));
        assert!(hook.check("1", &[]).is_ok());

        let edits = vec![(
            Datastore::Configuration,
            EditOperation::Remove(DataPath::parse("/top").unwrap()),
        )];
        assert_eq!(hook.check("1", &edits).unwrap_err().tag, ErrorTag::InUse);
    }
}
