//! Command-line interface for rename-locations.
//!
//! This module handles argument parsing and output payloads only.
//! Searches are run by the binary through the library API.

use crate::config::RenameOptions;
use crate::error::RenameError;
use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

/// rename-locations: find every place a rename must edit.
#[derive(Parser, Debug)]
#[command(name = "rename-locations")]
#[command(author, version, about, long_about = None)]
#[command(subcommand_required = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands.
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Find rename locations for a symbol in an indexed workspace.
    Find {
        /// Path to the workspace snapshot (JSON).
        #[arg(short, long)]
        workspace: PathBuf,

        /// Name of the symbol to rename.
        #[arg(short, long)]
        symbol: String,

        /// Symbol id, required when the name is ambiguous.
        #[arg(long)]
        id: Option<u64>,

        /// Also rename overloads in the containing type.
        #[arg(long)]
        overloads: bool,

        /// Also rename occurrences inside string literals.
        #[arg(long)]
        strings: bool,

        /// Also rename occurrences inside comments.
        #[arg(long)]
        comments: bool,

        /// Restrict the result to one document.
        #[arg(short, long, value_name = "DOCUMENT")]
        document: Option<String>,

        /// Search configuration file (JSON).
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

impl Commands {
    /// Rename options selected by the flags.
    pub fn rename_options(&self) -> RenameOptions {
        match self {
            Commands::Find {
                overloads,
                strings,
                comments,
                ..
            } => RenameOptions::new()
                .with_overloads(*overloads)
                .with_strings(*strings)
                .with_comments(*comments),
        }
    }
}

/// Parse command-line arguments.
///
/// Returns the parsed Cli struct or exits on error.
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// JSON success payload for CLI responses.
#[derive(Serialize)]
pub struct CliSuccessPayload {
    /// Status indicator ("ok").
    pub status: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Structured data.
    pub data: Value,
}

impl CliSuccessPayload {
    /// Construct a payload with structured data.
    pub fn with_data(message: String, data: Value) -> Self {
        Self {
            status: "ok",
            message,
            data,
        }
    }
}

/// JSON error payload for CLI responses.
#[derive(Serialize)]
pub struct CliErrorPayload {
    /// Status indicator ("error").
    pub status: &'static str,
    /// Structured error details.
    pub error: ErrorDetails,
}

/// Details for a CLI error payload.
#[derive(Serialize)]
pub struct ErrorDetails {
    /// Error kind identifier (SymbolNotFound, etc.).
    pub kind: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Optional symbol context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Optional file context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Optional hint for remediation steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl CliErrorPayload {
    /// Build payload from a RenameError instance.
    pub fn from_error(error: &RenameError) -> Self {
        let symbol = match error {
            RenameError::SearchFault { symbol, .. } => Some(symbol.clone()),
            RenameError::SymbolNotFound(name) => Some(name.clone()),
            RenameError::AmbiguousSymbol { name, .. } => Some(name.clone()),
            _ => None,
        };
        let file = match error {
            RenameError::Io { path, .. } => Some(path.to_string_lossy().to_string()),
            _ => None,
        };

        CliErrorPayload {
            status: "error",
            error: ErrorDetails {
                kind: error.kind(),
                message: error.to_string(),
                symbol,
                file,
                hint: error.hint().map(|h| h.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_find_flags_map_to_options() {
        let cli = Cli::try_parse_from([
            "rename-locations",
            "find",
            "--workspace",
            "ws.json",
            "--symbol",
            "Foo",
            "--overloads",
            "--comments",
        ])
        .unwrap();

        let options = cli.command.rename_options();
        assert!(options.rename_overloads);
        assert!(options.rename_in_comments);
        assert!(!options.rename_in_strings);
    }

    #[test]
    fn test_error_payload_carries_kind_and_hint() {
        let error = RenameError::AmbiguousSymbol {
            name: "Foo".to_string(),
            candidates: vec!["#1 (method)".to_string(), "#2 (method)".to_string()],
        };
        let payload = CliErrorPayload::from_error(&error);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"]["kind"], "AmbiguousSymbol");
        assert_eq!(json["error"]["symbol"], "Foo");
        assert!(json["error"]["hint"].as_str().unwrap().contains("--id"));
        assert!(json["error"].get("file").is_none());
    }
}
