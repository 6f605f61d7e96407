//! Option flags and engine configuration.

use crate::error::{RenameError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const FOLLOW_UP_THREADS_ENV: &str = "RENAME_FOLLOW_UP_THREADS";

/// User-selected rename options, supplied per invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameOptions {
    /// Also rename same-named overloads in the containing type.
    pub rename_overloads: bool,

    /// Also rename occurrences of the name inside string literals.
    pub rename_in_strings: bool,

    /// Also rename occurrences of the name inside comments.
    pub rename_in_comments: bool,
}

impl RenameOptions {
    /// Options with every flag disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the overloads flag.
    pub fn with_overloads(mut self, enabled: bool) -> Self {
        self.rename_overloads = enabled;
        self
    }

    /// Set the strings flag.
    pub fn with_strings(mut self, enabled: bool) -> Self {
        self.rename_in_strings = enabled;
        self
    }

    /// Set the comments flag.
    pub fn with_comments(mut self, enabled: bool) -> Self {
        self.rename_in_comments = enabled;
        self
    }

    /// Whether any text scan is enabled.
    pub fn scans_text(&self) -> bool {
        self.rename_in_strings || self.rename_in_comments
    }
}

/// Engine tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Worker threads for follow-up location resolution (0 = one per core).
    pub follow_up_threads: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            follow_up_threads: std::env::var(FOLLOW_UP_THREADS_ENV)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        }
    }
}

impl SearchConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| RenameError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Parse a config from JSON text.
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| RenameError::InvalidConfig {
            message: format!("JSON parse error: {}", e),
        })
    }

    /// Override the follow-up thread count.
    pub fn with_follow_up_threads(mut self, threads: usize) -> Self {
        self.follow_up_threads = threads;
        self
    }
}
