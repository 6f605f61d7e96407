//! Contracts with the external collaborators.
//!
//! The engine never parses source or resolves symbols itself. It drives a
//! [`ReferenceFinder`], turns what it reports into edit locations through a
//! [`LocationResolver`], asks a [`TextScanner`] for comment and string
//! occurrences, and looks up overloads through a [`SymbolTable`].

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::location::{DocumentId, LocationRecord, ReferenceLocation};
use crate::symbol::Symbol;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Receiver for reference-search callbacks.
///
/// Implementations accept calls from any thread, in any order.
pub trait ReferenceSink: Sync {
    /// A definition of (or cascaded from) the searched symbol was found.
    fn on_definition_found(&self, definition: &Symbol);

    /// A reference to `definition` was found.
    fn on_reference_found(&self, definition: &Symbol, reference: ReferenceLocation);
}

/// Symbolic reference search.
pub trait ReferenceFinder: Send + Sync {
    /// Search for definitions and references of `symbol`, reporting each to `sink`.
    ///
    /// Returning (with success or error) signals search completion; the
    /// engine counts an error as completed and records it as a fault.
    fn find_references(
        &self,
        symbol: &Symbol,
        sink: &dyn ReferenceSink,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

/// Decides which source positions must be edited.
pub trait LocationResolver: Send + Sync {
    /// Renamable locations of a definition.
    fn resolve_definition_locations(
        &self,
        definition: &Symbol,
        rename_symbol: &Symbol,
    ) -> Result<HashSet<LocationRecord>>;

    /// Renamable locations implied by one reference (zero, one or several).
    fn resolve_reference_locations(
        &self,
        definition: &Symbol,
        rename_symbol: &Symbol,
        reference: &ReferenceLocation,
    ) -> Result<HashSet<LocationRecord>>;
}

/// Finds the symbol's name inside comments and string literals.
pub trait TextScanner: Send + Sync {
    /// Scan the codebase for textual occurrences of `symbol`'s name.
    fn scan_for_text_occurrences(
        &self,
        symbol: &Symbol,
        scan_strings: bool,
        scan_comments: bool,
    ) -> Result<HashMap<DocumentId, HashSet<LocationRecord>>>;
}

/// Member enumeration used for overload discovery.
pub trait SymbolTable: Send + Sync {
    /// All members of the type containing `symbol` (including `symbol`
    /// itself). Empty when `symbol` has no containing type.
    fn containing_type_members(&self, symbol: &Symbol) -> Vec<Symbol>;
}

/// The collaborators one rename search runs against.
#[derive(Clone)]
pub struct RenameServices {
    /// Reference search.
    pub finder: Arc<dyn ReferenceFinder>,
    /// Renamable-location resolver.
    pub resolver: Arc<dyn LocationResolver>,
    /// Comment and string scanner.
    pub text_scanner: Arc<dyn TextScanner>,
    /// Member lookup for overloads.
    pub symbols: Arc<dyn SymbolTable>,
}

impl RenameServices {
    /// Bundle collaborators.
    pub fn new(
        finder: Arc<dyn ReferenceFinder>,
        resolver: Arc<dyn LocationResolver>,
        text_scanner: Arc<dyn TextScanner>,
        symbols: Arc<dyn SymbolTable>,
    ) -> Self {
        Self {
            finder,
            resolver,
            text_scanner,
            symbols,
        }
    }

    /// Use one value for every collaborator role.
    pub fn from_shared<T>(backend: Arc<T>) -> Self
    where
        T: ReferenceFinder + LocationResolver + TextScanner + SymbolTable + 'static,
    {
        Self {
            finder: backend.clone(),
            resolver: backend.clone(),
            text_scanner: backend.clone(),
            symbols: backend,
        }
    }

    /// Overloads of `symbol` in its containing type.
    pub fn overloads_of(&self, symbol: &Symbol) -> Vec<Symbol> {
        let mut overloads: Vec<Symbol> = self
            .symbols
            .containing_type_members(symbol)
            .into_iter()
            .filter(|member| member.is_overload_of(symbol))
            .collect();
        overloads.sort_by_key(|member| member.id);
        overloads.dedup();
        overloads
    }
}

impl std::fmt::Debug for RenameServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenameServices").finish_non_exhaustive()
    }
}
