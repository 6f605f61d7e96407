//! rename-locations CLI binary
//!
//! The CLI is a thin adapter over the library API: it loads a workspace,
//! runs one search and prints the result as JSON.

use rename_locations::cli::{CliErrorPayload, CliSuccessPayload, Commands};
use rename_locations::{
    CancellationToken, DocumentId, IndexedWorkspace, RenameError, RenameLocationFinder,
    RenameOptions, RenameServices, SearchConfig,
};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let cli = rename_locations::cli::parse_args();

    if cli.verbose {
        env_logger::init();
    }

    let options = cli.command.rename_options();
    let result = match &cli.command {
        Commands::Find {
            workspace,
            symbol,
            id,
            document,
            config,
            ..
        } => execute_find(
            workspace,
            symbol,
            *id,
            document.as_deref(),
            config.as_deref(),
            options,
        ),
    };

    match result.and_then(|payload| to_json(&payload)) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            let payload = CliErrorPayload::from_error(&e);
            match serde_json::to_string_pretty(&payload) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("Error: {}", e),
            }
            ExitCode::from(1)
        }
    }
}

/// Execute the find command.
///
/// Loads the workspace, resolves the symbol and waits for the whole-codebase
/// result (or one document's result when `document` is given).
fn execute_find(
    workspace_path: &Path,
    symbol_name: &str,
    symbol_id: Option<u64>,
    document: Option<&str>,
    config_path: Option<&Path>,
    options: RenameOptions,
) -> Result<CliSuccessPayload, RenameError> {
    let workspace = Arc::new(IndexedWorkspace::from_file(workspace_path)?);
    let symbol = workspace.resolve_symbol(symbol_name, symbol_id)?;

    let config = match config_path {
        Some(path) => SearchConfig::from_file(path)?,
        None => SearchConfig::default(),
    };

    let finder = RenameLocationFinder::new(RenameServices::from_shared(Arc::clone(&workspace)), config)?;
    let search = finder.find_all(symbol, options, CancellationToken::new());

    let result = match document {
        Some(document) => search.document_locations(&DocumentId::new(document)).wait()?,
        None => search.wait()?,
    };

    let report = result.report();
    let message = format!(
        "Found {} rename locations for '{}' ({} faults)",
        report.locations.len(),
        symbol_name,
        report.faults.len()
    );
    let data = serde_json::to_value(&report)
        .map_err(|e| RenameError::Other(format!("Failed to serialize result: {}", e)))?;

    Ok(CliSuccessPayload::with_data(message, data))
}

fn to_json(payload: &CliSuccessPayload) -> Result<String, RenameError> {
    serde_json::to_string_pretty(payload)
        .map_err(|e| RenameError::Other(format!("Failed to serialize output: {}", e)))
}
