use cfgtx_core_types::TxId;
use thiserror::Error;

use crate::rpc::{ErrorTag, RpcError};
use crate::transaction::TxState;

/// Result type alias using TxError
pub type Result<T> = std::result::Result<T, TxError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure surfaced by a transaction, a strategy or the configuration
/// loader is classified into exactly one kind. Each kind maps to a stable
/// error code usable by callers and by log assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    // Datastore state
    DataExists,
    DataMissing,

    // Remote device / broker
    LockDenied,
    CommitFailed,
    TransportFailure,

    // Request shape
    UnsupportedOperation,
    InvalidInput,

    // Lifecycle
    IllegalState,

    // Wiring
    Configuration,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::DataExists => "ERR_DATA_EXISTS",
            ExErrorKind::DataMissing => "ERR_DATA_MISSING",
            ExErrorKind::LockDenied => "ERR_LOCK_DENIED",
            ExErrorKind::CommitFailed => "ERR_COMMIT_FAILED",
            ExErrorKind::TransportFailure => "ERR_TRANSPORT_FAILURE",
            ExErrorKind::UnsupportedOperation => "ERR_UNSUPPORTED_OPERATION",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::IllegalState => "ERR_ILLEGAL_STATE",
            ExErrorKind::Configuration => "ERR_CONFIGURATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Protocol error tag reported for this kind
    pub fn error_tag(&self) -> ErrorTag {
        match self {
            ExErrorKind::DataExists => ErrorTag::DataExists,
            ExErrorKind::DataMissing => ErrorTag::DataMissing,
            ExErrorKind::LockDenied => ErrorTag::LockDenied,
            ExErrorKind::CommitFailed => ErrorTag::OperationFailed,
            ExErrorKind::TransportFailure => ErrorTag::OperationFailed,
            ExErrorKind::UnsupportedOperation => ErrorTag::OperationNotSupported,
            ExErrorKind::InvalidInput => ErrorTag::InvalidValue,
            ExErrorKind::IllegalState => ErrorTag::OperationFailed,
            ExErrorKind::Configuration => ErrorTag::OperationFailed,
            ExErrorKind::Internal => ErrorTag::OperationFailed,
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification plus whatever context was known where the
/// failure was observed: the operation, the data path, the transaction and
/// the device errors that caused it.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    path: Option<String>,
    tx_id: Option<TxId>,
    message: String,
    source: Option<Box<ExError>>,
    rpc_errors: Vec<RpcError>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            path: None,
            tx_id: None,
            message: String::new(),
            source: None,
            rpc_errors: Vec::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add data path context
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add transaction context
    pub fn with_tx_id(mut self, tx_id: TxId) -> Self {
        self.tx_id = Some(tx_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Attach the device errors that caused this failure
    pub fn with_rpc_errors(mut self, errors: Vec<RpcError>) -> Self {
        self.rpc_errors = errors;
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the data path context, if any
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Get the transaction context, if any
    pub fn tx_id(&self) -> Option<&TxId> {
        self.tx_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }

    /// Device errors attached to this failure
    pub fn rpc_errors(&self) -> &[RpcError] {
        &self.rpc_errors
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path)?;
        }
        if let Some(tx_id) = &self.tx_id {
            write!(f, " (tx_id: {})", tx_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Error taxonomy for transactional datastore access
///
/// `Clone` and `PartialEq` are required: results travel through shared
/// futures in the remote-device queue and every waiter receives a copy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TxError {
    // ===== Datastore state =====
    /// Data already exists at the path
    #[error("Data already exists: {path}")]
    DataExists { path: String },

    /// Data does not exist at the path
    #[error("Data does not exist: {path}")]
    DataMissing { path: String },

    /// Positional insert references an entry that is not there
    #[error("Point parameter {point} was not found under {path}")]
    InsertPointMissing { path: String, point: String },

    // ===== Backend =====
    /// The device refused the datastore lock
    #[error("Lock operation failed: {message}")]
    LockDenied { message: String },

    /// Commit (or a queued edit) reported errors
    #[error("{message}")]
    CommitFailed {
        message: String,
        errors: Vec<RpcError>,
    },

    /// An RPC or broker call could not be completed
    #[error("Transport failure during {op}: {message}")]
    Transport { op: String, message: String },

    /// A read against the backend failed
    #[error("Failed to read {path}: {message}")]
    ReadFailed { path: String, message: String },

    // ===== Request shape =====
    /// Operation not supported by the backend or the target
    #[error("{reason}")]
    Unsupported { reason: String },

    /// Malformed request
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    // ===== Lifecycle =====
    /// Call on a transaction that is already terminal
    #[error("Transaction {tx_id} is already {state}, {op} rejected")]
    TransactionClosed {
        tx_id: String,
        op: String,
        state: TxState,
    },

    // ===== Generic =====
    /// Config and state subtrees cannot be combined
    #[error("Unable to merge config and state data: {reason}")]
    InconsistentMerge { reason: String },

    /// Configuration could not be loaded
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl TxError {
    /// Canonical kind of this error
    pub fn kind(&self) -> ExErrorKind {
        match self {
            TxError::DataExists { .. } => ExErrorKind::DataExists,
            TxError::DataMissing { .. } | TxError::InsertPointMissing { .. } => {
                ExErrorKind::DataMissing
            }
            TxError::LockDenied { .. } => ExErrorKind::LockDenied,
            TxError::CommitFailed { .. } => ExErrorKind::CommitFailed,
            TxError::Transport { .. } | TxError::ReadFailed { .. } => {
                ExErrorKind::TransportFailure
            }
            TxError::Unsupported { .. } => ExErrorKind::UnsupportedOperation,
            TxError::InvalidInput { .. } => ExErrorKind::InvalidInput,
            TxError::TransactionClosed { .. } => ExErrorKind::IllegalState,
            TxError::InconsistentMerge { .. } | TxError::Internal { .. } => ExErrorKind::Internal,
            TxError::Configuration { .. } => ExErrorKind::Configuration,
        }
    }

    /// Stable error code of this error
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    pub fn data_exists(path: impl std::fmt::Display) -> Self {
        TxError::DataExists {
            path: path.to_string(),
        }
    }

    pub fn data_missing(path: impl std::fmt::Display) -> Self {
        TxError::DataMissing {
            path: path.to_string(),
        }
    }

    pub fn unsupported(reason: impl Into<String>) -> Self {
        TxError::Unsupported {
            reason: reason.into(),
        }
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        TxError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        TxError::Internal {
            message: message.into(),
        }
    }

    /// Protocol errors describing this failure
    ///
    /// Device-reported failures are passed through; anything else becomes a
    /// single error tagged after its kind.
    pub fn rpc_errors(&self) -> Vec<RpcError> {
        if let TxError::CommitFailed { errors, .. } = self {
            let failures: Vec<RpcError> = errors.iter().filter(|e| !e.is_warning()).cloned().collect();
            if !failures.is_empty() {
                return failures;
            }
        }
        let error = RpcError::error(self.kind().error_tag(), self.to_string());
        match self {
            TxError::DataExists { path }
            | TxError::DataMissing { path }
            | TxError::InsertPointMissing { path, .. }
            | TxError::ReadFailed { path, .. } => vec![error.with_path(path.clone())],
            _ => vec![error],
        }
    }
}

/// Conversion from TxError to ExError
impl From<TxError> for ExError {
    fn from(err: TxError) -> Self {
        let kind = err.kind();
        let message = err.to_string();
        match err {
            TxError::DataExists { path } | TxError::DataMissing { path } => {
                ExError::new(kind).with_path(path).with_message(message)
            }

            TxError::InsertPointMissing { path, .. } => {
                ExError::new(kind).with_path(path).with_message(message)
            }

            TxError::ReadFailed { path, .. } => ExError::new(kind)
                .with_op("read")
                .with_path(path)
                .with_message(message),

            TxError::Transport { op, .. } => ExError::new(kind).with_op(op).with_message(message),

            TxError::CommitFailed { errors, .. } => ExError::new(kind)
                .with_op("commit")
                .with_message(message)
                .with_rpc_errors(errors),

            TxError::TransactionClosed { tx_id, op, .. } => ExError::new(kind)
                .with_op(op)
                .with_tx_id(TxId::from_string(tx_id))
                .with_message(message),

            TxError::LockDenied { .. } => ExError::new(kind)
                .with_op("lock")
                .with_message(message),

            TxError::Unsupported { .. }
            | TxError::InvalidInput { .. }
            | TxError::InconsistentMerge { .. }
            | TxError::Configuration { .. }
            | TxError::Internal { .. } => ExError::new(kind).with_message(message),
        }
    }
}
