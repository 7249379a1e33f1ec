//! Error types for Tether.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, etc.)
//! - Retryability flags for callers that want to self-correct
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Tether operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    InitializationFailed,
    StoreClosed,
    TransactionFailed,
    DatabaseError,

    // Not Found (exit 3)
    SessionNotFound,
    RepositoryNotFound,
    BranchNotFound,

    // Validation (exit 4)
    InvalidPattern,
    InvalidArgument,

    // Data integrity (exit 6)
    CorruptData,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::InitializationFailed => "INITIALIZATION_FAILED",
            Self::StoreClosed => "STORE_CLOSED",
            Self::TransactionFailed => "TRANSACTION_FAILED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::RepositoryNotFound => "REPOSITORY_NOT_FOUND",
            Self::BranchNotFound => "BRANCH_NOT_FOUND",
            Self::InvalidPattern => "INVALID_PATTERN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::CorruptData => "CORRUPT_DATA",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::InitializationFailed
            | Self::StoreClosed
            | Self::TransactionFailed
            | Self::DatabaseError => 2,
            Self::SessionNotFound | Self::RepositoryNotFound | Self::BranchNotFound => 3,
            Self::InvalidPattern | Self::InvalidArgument => 4,
            Self::CorruptData => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether the caller should retry with corrected input.
    ///
    /// True for malformed input and for transactions that were rolled back
    /// (the store is untouched, so the same write can be issued again).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidPattern | Self::InvalidArgument | Self::TransactionFailed
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in Tether operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to initialize store at {path} ({stage}): {source}")]
    Initialization {
        path: PathBuf,
        /// Which step of `open` failed (directory, connect, pragmas, schema).
        stage: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Store is closed")]
    StoreClosed,

    #[error("Transaction `{op}` rolled back: {source}")]
    Transaction {
        op: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Query `{op}` failed for {key}: {source}")]
    Query {
        op: String,
        /// Session id, scope or pattern the read was for
        key: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Session not found: {id}")]
    SessionNotFound { id: String },

    #[error("Repository not found: {id}")]
    RepositoryNotFound { id: String },

    #[error("Branch not found: {id}")]
    BranchNotFound { id: String },

    #[error("Invalid search pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Corrupt message {sequence} in session {session_id}: {reason}")]
    CorruptData {
        session_id: String,
        sequence: i64,
        reason: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Initialization { .. } => ErrorCode::InitializationFailed,
            Self::StoreClosed => ErrorCode::StoreClosed,
            Self::Transaction { .. } => ErrorCode::TransactionFailed,
            Self::Query { .. } | Self::Database(_) => ErrorCode::DatabaseError,
            Self::SessionNotFound { .. } => ErrorCode::SessionNotFound,
            Self::RepositoryNotFound { .. } => ErrorCode::RepositoryNotFound,
            Self::BranchNotFound { .. } => ErrorCode::BranchNotFound,
            Self::InvalidPattern { .. } => ErrorCode::InvalidPattern,
            Self::CorruptData { .. } => ErrorCode::CorruptData,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// True for the "lookup target absent" family.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound { .. } | Self::RepositoryNotFound { .. } | Self::BranchNotFound { .. }
        )
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Initialization { path, .. } => Some(format!(
                "Check that {} is writable, or point `--db` / TETHER_DB at another location.",
                path.display()
            )),

            Self::SessionNotFound { id } => Some(format!(
                "No session with ID '{id}'. Use `tether session list --all` to see stored sessions."
            )),

            Self::RepositoryNotFound { id } => Some(format!(
                "No repository with ID '{id}'. Use `tether repo list` to see known repositories."
            )),

            Self::BranchNotFound { id } => Some(format!(
                "No branch with ID '{id}'. Use `tether repo branches <repository-id>` to list branches."
            )),

            Self::InvalidPattern { .. } => Some(
                "Patterns use Rust regex syntax; escape metacharacters such as `(`, `[` or `*` \
                 to match them literally."
                    .to_string(),
            ),

            Self::CorruptData { session_id, .. } => Some(format!(
                "Stored transcript for '{session_id}' cannot be decoded. \
                 Delete it with `tether session delete {session_id}` if it is not recoverable."
            )),

            Self::Transaction { .. } => {
                Some("No changes were written; the operation can be retried.".to_string())
            }

            Self::StoreClosed
            | Self::Query { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_family_shares_exit_code() {
        let errors = [
            Error::SessionNotFound { id: "s".into() },
            Error::RepositoryNotFound { id: "1".into() },
            Error::BranchNotFound { id: "2".into() },
        ];
        for err in &errors {
            assert!(err.is_not_found());
            assert_eq!(err.exit_code(), 3);
        }
    }

    #[test]
    fn test_structured_json_includes_hint() {
        let err = Error::SessionNotFound { id: "abc".into() };
        let json = err.to_structured_json();
        assert_eq!(json["error"]["code"], "SESSION_NOT_FOUND");
        assert_eq!(json["error"]["retryable"], false);
        assert!(json["error"]["hint"].as_str().unwrap().contains("abc"));
    }

    #[test]
    fn test_query_error_names_operation_and_key() {
        let err = Error::Query {
            op: "load_session".into(),
            key: "s1".into(),
            source: rusqlite::Error::QueryReturnedNoRows,
        };
        let message = err.to_string();
        assert!(message.contains("load_session"));
        assert!(message.contains("s1"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_invalid_pattern_is_retryable() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = Error::InvalidPattern {
            pattern: "(".into(),
            source,
        };
        assert!(err.error_code().is_retryable());
        assert_eq!(err.exit_code(), 4);
    }
}
