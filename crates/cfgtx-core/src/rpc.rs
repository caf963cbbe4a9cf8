//! RPC result model shared by the backends
//!
//! A device reply carries zero or more errors. Warnings are informational:
//! a reply made only of warnings counts as success when sequencing edits,
//! and the warnings are still handed back to the caller.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Error,
    Warning,
}

/// Protocol error tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorTag {
    InUse,
    InvalidValue,
    MissingElement,
    UnknownElement,
    AccessDenied,
    LockDenied,
    ResourceDenied,
    DataExists,
    DataMissing,
    OperationNotSupported,
    OperationFailed,
    MalformedMessage,
}

impl ErrorTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorTag::InUse => "in-use",
            ErrorTag::InvalidValue => "invalid-value",
            ErrorTag::MissingElement => "missing-element",
            ErrorTag::UnknownElement => "unknown-element",
            ErrorTag::AccessDenied => "access-denied",
            ErrorTag::LockDenied => "lock-denied",
            ErrorTag::ResourceDenied => "resource-denied",
            ErrorTag::DataExists => "data-exists",
            ErrorTag::DataMissing => "data-missing",
            ErrorTag::OperationNotSupported => "operation-not-supported",
            ErrorTag::OperationFailed => "operation-failed",
            ErrorTag::MalformedMessage => "malformed-message",
        }
    }
}

impl std::fmt::Display for ErrorTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One error or warning reported by a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpcError {
    pub severity: ErrorSeverity,
    pub tag: ErrorTag,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

impl RpcError {
    pub fn new(severity: ErrorSeverity, tag: ErrorTag, message: impl Into<String>) -> Self {
        Self {
            severity,
            tag,
            message: message.into(),
            path: None,
            info: None,
        }
    }

    pub fn error(tag: ErrorTag, message: impl Into<String>) -> Self {
        Self::new(ErrorSeverity::Error, tag, message)
    }

    pub fn warning(tag: ErrorTag, message: impl Into<String>) -> Self {
        Self::new(ErrorSeverity::Warning, tag, message)
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    pub fn is_warning(&self) -> bool {
        self.severity == ErrorSeverity::Warning
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.tag)?;
        if let Some(path) = &self.path {
            write!(f, " at {}", path)?;
        }
        Ok(())
    }
}

/// Reply to a single RPC
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcResult {
    pub errors: Vec<RpcError>,
}

impl RpcResult {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn with_errors(errors: Vec<RpcError>) -> Self {
        Self { errors }
    }

    /// No entry has error severity
    pub fn is_success(&self) -> bool {
        self.errors.iter().all(RpcError::is_warning)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &RpcError> {
        self.errors.iter().filter(|e| e.is_warning())
    }

    pub fn failures(&self) -> impl Iterator<Item = &RpcError> {
        self.errors.iter().filter(|e| !e.is_warning())
    }

    /// Whether any entry carries `tag`, regardless of severity
    pub fn has_tag(&self, tag: ErrorTag) -> bool {
        self.errors.iter().any(|e| e.tag == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_only_is_success() {
        let result = RpcResult::with_errors(vec![RpcError::warning(
            ErrorTag::OperationFailed,
            "interface flapping",
        )]);
        assert!(result.is_success());
        assert_eq!(result.warnings().count(), 1);
        assert_eq!(result.failures().count(), 0);
    }

    #[test]
    fn test_single_error_is_failure() {
        let result = RpcResult::with_errors(vec![
            RpcError::warning(ErrorTag::OperationFailed, "w"),
            RpcError::error(ErrorTag::DataExists, "e"),
        ]);
        assert!(!result.is_success());
        assert!(result.has_tag(ErrorTag::DataExists));
    }

    #[test]
    fn test_error_serializes_with_protocol_names() {
        let err = RpcError::error(ErrorTag::DataMissing, "gone").with_path("/top/a");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["tag"], "data-missing");
        assert_eq!(json["severity"], "error");
        assert_eq!(json["path"], "/top/a");
        assert!(json.get("info").is_none());
    }
}
