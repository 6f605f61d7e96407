//! Rename engine error types.
//!
//! All errors are typed and provide root cause information.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for rename-location operations.
#[derive(Error, Debug)]
pub enum RenameError {
    /// The shared cancellation signal fired before the result was available.
    #[error("Rename search was canceled")]
    Canceled,

    /// The promise belonged to an option set that a later refinement replaced.
    #[error("Rename result was superseded by a refined search")]
    Superseded,

    /// A reference search, resolver or text scan failed.
    #[error("Search for '{symbol}' failed: {message}")]
    SearchFault {
        /// Name of the symbol whose search failed.
        symbol: String,
        /// Failure description.
        message: String,
    },

    /// Symbol not found in the workspace.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// Symbol name is ambiguous without an explicit id.
    #[error("Ambiguous symbol '{name}': candidates {candidates:?}")]
    AmbiguousSymbol {
        /// The ambiguous symbol name.
        name: String,
        /// Ids and containers of the matching symbols.
        candidates: Vec<String>,
    },

    /// Workspace snapshot failed validation.
    #[error("Invalid workspace: {message}")]
    InvalidWorkspace {
        /// The validation error message.
        message: String,
    },

    /// Search configuration failed to parse.
    #[error("Invalid config: {message}")]
    InvalidConfig {
        /// The parse error message.
        message: String,
    },

    /// I/O error while reading a snapshot or config file.
    #[error("I/O error for path {path}: {source}")]
    Io {
        /// The file path that caused the I/O error.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The follow-up worker pool could not be built.
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// Generic error with context.
    #[error("{0}")]
    Other(String),
}

impl RenameError {
    /// Stable identifier used in CLI error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            RenameError::Canceled => "Canceled",
            RenameError::Superseded => "Superseded",
            RenameError::SearchFault { .. } => "SearchFault",
            RenameError::SymbolNotFound(_) => "SymbolNotFound",
            RenameError::AmbiguousSymbol { .. } => "AmbiguousSymbol",
            RenameError::InvalidWorkspace { .. } => "InvalidWorkspace",
            RenameError::InvalidConfig { .. } => "InvalidConfig",
            RenameError::Io { .. } => "Io",
            RenameError::ThreadPool(_) => "ThreadPool",
            RenameError::Other(_) => "Other",
        }
    }

    /// Optional remediation hint.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            RenameError::AmbiguousSymbol { .. } => Some("Pass --id to pick one candidate"),
            RenameError::SymbolNotFound(_) => {
                Some("Check the symbol name against the workspace 'symbols' table")
            }
            RenameError::InvalidConfig { .. } => {
                Some("Config files are JSON objects, e.g. {\"follow_up_threads\": 4}")
            }
            _ => None,
        }
    }

    /// Whether this error came from cancellation rather than a failure.
    pub fn is_canceled(&self) -> bool {
        matches!(self, RenameError::Canceled)
    }
}

/// A collaborator failure recorded against a result set.
///
/// Faults never stall completion; the affected locations are simply absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchFault {
    /// Name of the symbol being searched or scanned.
    pub symbol: String,
    /// Failure description.
    pub message: String,
}

impl SearchFault {
    /// Create a fault for `symbol`.
    pub fn new(symbol: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SearchFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.symbol, self.message)
    }
}

impl From<SearchFault> for RenameError {
    fn from(fault: SearchFault) -> Self {
        RenameError::SearchFault {
            symbol: fault.symbol,
            message: fault.message,
        }
    }
}

/// Result type alias for rename-location operations.
pub type Result<T> = std::result::Result<T, RenameError>;
