//! Batched existence checking
//!
//! One probe is spawned per child. Each probe that disagrees with the
//! expectation publishes `Conflict` into a first-writer-wins cell and only
//! then decrements the shared counter; the probe that brings the counter to
//! zero publishes `Success`, which is a no-op when a conflict got there
//! first. A read failure, or a probe task that panics, publishes `Failure`
//! without decrementing. Only the first published outcome is ever observed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::Notify;

use crate::errors::{Result, TxError};
use crate::model::{DataNode, DataPath, Datastore};
use crate::transaction::DataReader;

#[derive(Debug, Clone, PartialEq)]
pub enum ExistenceOutcome {
    Success,
    /// First child whose existence differed from the expectation
    Conflict(DataPath),
    Failure(TxError),
}

impl ExistenceOutcome {
    /// Translate into the error a write reports
    ///
    /// # Errors
    ///
    /// `DataExists` for a conflict while expecting absence, `DataMissing` for
    /// a conflict while expecting presence, the read error for a failure.
    pub fn into_result(self, expected: bool) -> Result<()> {
        match self {
            ExistenceOutcome::Success => Ok(()),
            ExistenceOutcome::Conflict(path) if expected => Err(TxError::data_missing(path)),
            ExistenceOutcome::Conflict(path) => Err(TxError::data_exists(path)),
            ExistenceOutcome::Failure(err) => Err(err),
        }
    }
}

struct CheckState {
    remaining: AtomicUsize,
    outcome: OnceLock<ExistenceOutcome>,
    resolved: Notify,
}

impl CheckState {
    fn resolve(&self, outcome: ExistenceOutcome) {
        if self.outcome.set(outcome).is_ok() {
            self.resolved.notify_one();
        }
    }

    fn complete_probe(&self) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.resolve(ExistenceOutcome::Success);
        }
    }
}

/// Check that every child of `parent` exists (`expected = true`) or that
/// none does (`expected = false`)
pub async fn check_existence<R>(
    reader: Arc<R>,
    store: Datastore,
    parent: &DataPath,
    children: &[DataNode],
    expected: bool,
) -> ExistenceOutcome
where
    R: DataReader + ?Sized + 'static,
{
    if children.is_empty() {
        return ExistenceOutcome::Success;
    }

    let state = Arc::new(CheckState {
        remaining: AtomicUsize::new(children.len()),
        outcome: OnceLock::new(),
        resolved: Notify::new(),
    });
    tracing::debug!(
        parent = %parent,
        probes = children.len(),
        expected,
        "starting existence check"
    );

    for child in children {
        let path = parent.node(child.identifier());
        let watched = path.clone();
        let reader = Arc::clone(&reader);
        let probe_state = Arc::clone(&state);
        let probe = tokio::spawn(async move {
            match reader.exists(store, &path).await {
                Ok(found) if found != expected => {
                    probe_state.resolve(ExistenceOutcome::Conflict(path));
                    probe_state.complete_probe();
                }
                Ok(_) => probe_state.complete_probe(),
                Err(err) => probe_state.resolve(ExistenceOutcome::Failure(err)),
            }
        });

        // A probe that panicked or was cancelled never completes
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(err) = probe.await {
                state.resolve(ExistenceOutcome::Failure(TxError::internal(format!(
                    "existence probe for {} did not finish: {}",
                    watched, err
                ))));
            }
        });
    }

    loop {
        if let Some(outcome) = state.outcome.get() {
            return outcome.clone();
        }
        state.resolved.notified().await;
    }
}
