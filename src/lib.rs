//! rename-locations: concurrent rename-location aggregation.
//!
//! Given a symbol and rename options, this library finds every place a
//! rename must edit. Reference searches run concurrently, results merge
//! into per-document sets, and a refined search with different options
//! reuses the work of the previous one.

#![warn(missing_docs)]
// env_logger is used by src/main.rs (binary), not this library
#![expect(unused_crate_dependencies)]

pub mod cancel;
pub mod cli;
pub mod config;
pub mod error;
pub mod location;
pub mod promise;
pub mod search;
pub mod symbol;
pub mod workspace;

/// Re-export common error types for convenience.
pub use error::{RenameError, Result, SearchFault};

pub use cancel::{CancellationRegistration, CancellationToken};
pub use config::{RenameOptions, SearchConfig};
pub use location::{DocumentId, LocationRecord, ReferenceLocation, TextContext, TextSpan};
pub use promise::{Promise, Rejection};
pub use search::{
    LocationResolver, ReferenceFinder, ReferenceSink, RenameLocationFinder, RenameSearch,
    RenameServices, ResultSet, SearchProgress, SymbolTable, TextScanner,
};
pub use symbol::{Symbol, SymbolId, SymbolKind};
pub use workspace::IndexedWorkspace;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
