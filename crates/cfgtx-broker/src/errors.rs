//! Error handling for cfgtx-broker
//!
//! Broker failures are reported as a `CommitFailure` wrapping a chain of
//! causes. Somewhere in that chain a `DocumentedError` may carry the protocol
//! error tag that decides how the failure surfaces to transaction callers.

use cfgtx_core::errors::TxError;
use cfgtx_core::rpc::{ErrorTag, RpcError};
use thiserror::Error;

/// Result type alias for broker-level calls
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Protocol-level error raised by the broker itself
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DocumentedError {
    pub tag: ErrorTag,
    pub message: String,
    pub path: Option<String>,
}

impl DocumentedError {
    pub fn new(tag: ErrorTag, message: impl Into<String>) -> Self {
        Self {
            tag,
            message: message.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn to_rpc_error(&self) -> RpcError {
        let error = RpcError::error(self.tag, self.message.clone());
        match &self.path {
            Some(path) => error.with_path(path.clone()),
            None => error,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    #[error("Broker rejected the request: {0}")]
    Documented(#[from] DocumentedError),

    #[error("Broker transaction {tx_id} is closed")]
    Closed { tx_id: String },

    #[error("Invalid write: {0}")]
    InvalidWrite(String),
}

/// Commit of a broker transaction did not complete
#[derive(Error, Debug, Clone)]
#[error("Commit of broker transaction {tx_id} failed")]
pub struct CommitFailure {
    pub tx_id: String,
    #[source]
    pub cause: BrokerError,
}

/// Translate a commit failure by walking its `source()` chain
///
/// The first `DocumentedError` found decides the result: DATA_EXISTS and
/// DATA_MISSING keep their meaning, any other tag becomes `CommitFailed`
/// carrying the documented error.
pub fn decode_commit_failure(err: &(dyn std::error::Error + 'static)) -> TxError {
    let mut current = Some(err);
    while let Some(cause) = current {
        if let Some(documented) = cause.downcast_ref::<DocumentedError>() {
            let path = documented.path.clone().unwrap_or_default();
            return match documented.tag {
                ErrorTag::DataExists => TxError::DataExists { path },
                ErrorTag::DataMissing => TxError::DataMissing { path },
                _ => TxError::CommitFailed {
                    message: err.to_string(),
                    errors: vec![documented.to_rpc_error()],
                },
            };
        }
        current = cause.source();
    }
    TxError::CommitFailed {
        message: err.to_string(),
        errors: Vec::new(),
    }
}

/// Errors from individual broker calls (not commit)
impl From<BrokerError> for TxError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::Documented(documented) => match documented.tag {
                ErrorTag::DataExists => TxError::data_exists(documented.path.unwrap_or_default()),
                ErrorTag::DataMissing => {
                    TxError::data_missing(documented.path.unwrap_or_default())
                }
                _ => TxError::Internal {
                    message: documented.message,
                },
            },
            BrokerError::Closed { tx_id } => TxError::Internal {
                message: format!("broker transaction {} is closed", tx_id),
            },
            BrokerError::InvalidWrite(reason) => TxError::InvalidInput { reason },
        }
    }
}
