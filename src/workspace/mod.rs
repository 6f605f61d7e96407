//! In-memory indexed workspace.
//!
//! A workspace is a JSON snapshot of documents, symbols, definitions and
//! references produced by an external indexer. It implements every
//! collaborator role the search engine needs, so the CLI and the
//! integration tests can drive real searches without a compiler.
//!
//! # Snapshot format
//!
//! ```json
//! {
//!   "documents":   [{"id": "DocA", "text": "..."}],
//!   "symbols":     [{"id": 1, "name": "Foo", "kind": "method", "containing_type": 10}],
//!   "definitions": [{"symbol": 1, "document": "DocA", "start": 10, "end": 13}],
//!   "references":  [{"symbol": 1, "document": "DocB", "start": 5, "end": 8, "implicit": false}]
//! }
//! ```

pub mod lexer;

use crate::cancel::CancellationToken;
use crate::error::{RenameError, Result};
use crate::location::{DocumentId, LocationRecord, ReferenceLocation, TextContext, TextSpan};
use crate::search::{LocationResolver, ReferenceFinder, ReferenceSink, SymbolTable, TextScanner};
use crate::symbol::{Symbol, SymbolId, SymbolKind};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Deserialize)]
struct WorkspaceSnapshot {
    #[serde(default)]
    documents: Vec<DocumentEntry>,
    symbols: Vec<SymbolEntry>,
    #[serde(default)]
    definitions: Vec<SpanEntry>,
    #[serde(default)]
    references: Vec<ReferenceEntry>,
}

#[derive(Debug, Deserialize)]
struct DocumentEntry {
    id: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct SymbolEntry {
    id: u64,
    name: String,
    #[serde(default)]
    metadata_name: Option<String>,
    kind: SymbolKind,
    #[serde(default)]
    containing_type: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SpanEntry {
    symbol: u64,
    document: String,
    start: usize,
    end: usize,
}

#[derive(Debug, Deserialize)]
struct ReferenceEntry {
    symbol: u64,
    document: String,
    start: usize,
    end: usize,
    #[serde(default)]
    implicit: bool,
}

/// Documents and symbol index loaded from a snapshot.
#[derive(Debug)]
pub struct IndexedWorkspace {
    /// Document text by id. Empty text means the document is index-only.
    documents: BTreeMap<DocumentId, String>,
    symbols: BTreeMap<SymbolId, Symbol>,
    definitions: HashMap<SymbolId, Vec<LocationRecord>>,
    references: HashMap<SymbolId, Vec<ReferenceLocation>>,
    search_calls: AtomicUsize,
}

impl IndexedWorkspace {
    /// Parse and validate a JSON snapshot.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let snapshot: WorkspaceSnapshot =
            serde_json::from_str(content).map_err(|e| RenameError::InvalidWorkspace {
                message: format!("Failed to parse workspace JSON: {}", e),
            })?;
        Self::from_snapshot(snapshot)
    }

    /// Load a snapshot file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RenameError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let workspace = Self::from_json_str(&content)?;
        log::debug!(
            "Loaded workspace {} ({} documents, {} symbols)",
            path.display(),
            workspace.documents.len(),
            workspace.symbols.len()
        );
        Ok(workspace)
    }

    fn from_snapshot(snapshot: WorkspaceSnapshot) -> Result<Self> {
        let mut documents = BTreeMap::new();
        for entry in snapshot.documents {
            let id = DocumentId::new(entry.id);
            if documents.insert(id.clone(), entry.text).is_some() {
                return Err(invalid(format!("duplicate document '{}'", id)));
            }
        }

        let mut symbols = BTreeMap::new();
        for entry in &snapshot.symbols {
            let symbol = Symbol {
                id: SymbolId(entry.id),
                metadata_name: entry.metadata_name.clone().unwrap_or_else(|| entry.name.clone()),
                name: entry.name.clone(),
                kind: entry.kind,
                containing_type: entry.containing_type.map(SymbolId),
            };
            if symbols.insert(symbol.id, symbol).is_some() {
                return Err(invalid(format!("duplicate symbol id {}", entry.id)));
            }
        }
        for symbol in symbols.values() {
            if let Some(container) = symbol.containing_type {
                if !symbols.contains_key(&container) {
                    return Err(invalid(format!(
                        "symbol {} '{}' is contained in unknown type {}",
                        symbol.id, symbol.name, container
                    )));
                }
            }
        }

        let mut workspace = Self {
            documents,
            symbols,
            definitions: HashMap::new(),
            references: HashMap::new(),
            search_calls: AtomicUsize::new(0),
        };

        for entry in snapshot.definitions {
            let (symbol, document, span) =
                workspace.validate_span(entry.symbol, entry.document, entry.start, entry.end)?;
            workspace
                .definitions
                .entry(symbol)
                .or_default()
                .push(LocationRecord::new(document, span).from_definition(symbol));
        }

        for entry in snapshot.references {
            let (symbol, document, span) =
                workspace.validate_span(entry.symbol, entry.document, entry.start, entry.end)?;
            let mut reference = ReferenceLocation::new(document, span);
            if entry.implicit {
                reference = reference.implicit();
            }
            workspace.references.entry(symbol).or_default().push(reference);
        }

        Ok(workspace)
    }

    fn validate_span(
        &self,
        symbol: u64,
        document: String,
        start: usize,
        end: usize,
    ) -> Result<(SymbolId, DocumentId, TextSpan)> {
        let symbol = SymbolId(symbol);
        if !self.symbols.contains_key(&symbol) {
            return Err(invalid(format!("location refers to unknown symbol {}", symbol)));
        }

        let document = DocumentId::new(document);
        let text = self
            .documents
            .get(&document)
            .ok_or_else(|| invalid(format!("location refers to unknown document '{}'", document)))?;

        if start > end || (!text.is_empty() && end > text.len()) {
            return Err(invalid(format!(
                "span {}-{} is out of bounds for document '{}'",
                start, end, document
            )));
        }

        Ok((symbol, document, TextSpan::new(start, end)))
    }

    /// Look up a symbol by id.
    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(&id)
    }

    /// All symbols named `name`, ordered by id.
    pub fn find_symbols(&self, name: &str) -> Vec<&Symbol> {
        self.symbols.values().filter(|s| s.name == name).collect()
    }

    /// Pick the symbol to rename from a name and an optional id.
    ///
    /// Without an id the name must match exactly one symbol.
    pub fn resolve_symbol(&self, name: &str, id: Option<u64>) -> Result<Symbol> {
        if let Some(id) = id {
            return self
                .symbol(SymbolId(id))
                .filter(|symbol| symbol.name == name)
                .cloned()
                .ok_or_else(|| RenameError::SymbolNotFound(format!("{} {}", name, SymbolId(id))));
        }

        match self.find_symbols(name).as_slice() {
            [] => Err(RenameError::SymbolNotFound(name.to_string())),
            [symbol] => Ok((*symbol).clone()),
            candidates => Err(RenameError::AmbiguousSymbol {
                name: name.to_string(),
                candidates: candidates
                    .iter()
                    .map(|s| format!("{} ({})", s.id, s.kind.as_str()))
                    .collect(),
            }),
        }
    }

    /// Document ids, sorted.
    pub fn documents(&self) -> impl Iterator<Item = &DocumentId> {
        self.documents.keys()
    }

    /// Number of reference searches run against this workspace.
    pub fn search_count(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

fn invalid(message: String) -> RenameError {
    RenameError::InvalidWorkspace { message }
}

impl ReferenceFinder for IndexedWorkspace {
    fn find_references(
        &self,
        symbol: &Symbol,
        sink: &dyn ReferenceSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        cancel.check()?;

        let definition = self
            .symbols
            .get(&symbol.id)
            .ok_or_else(|| RenameError::SymbolNotFound(symbol.id.to_string()))?;
        sink.on_definition_found(definition);

        for reference in self.references.get(&symbol.id).into_iter().flatten() {
            cancel.check()?;
            sink.on_reference_found(definition, reference.clone());
        }
        Ok(())
    }
}

impl LocationResolver for IndexedWorkspace {
    fn resolve_definition_locations(
        &self,
        definition: &Symbol,
        _rename_symbol: &Symbol,
    ) -> Result<HashSet<LocationRecord>> {
        Ok(self
            .definitions
            .get(&definition.id)
            .into_iter()
            .flatten()
            .cloned()
            .collect())
    }

    fn resolve_reference_locations(
        &self,
        definition: &Symbol,
        _rename_symbol: &Symbol,
        reference: &ReferenceLocation,
    ) -> Result<HashSet<LocationRecord>> {
        // Implicit references have no text to edit.
        if reference.is_implicit {
            return Ok(HashSet::new());
        }
        let record =
            LocationRecord::new(reference.document.clone(), reference.span).from_definition(definition.id);
        Ok(HashSet::from([record]))
    }
}

impl TextScanner for IndexedWorkspace {
    fn scan_for_text_occurrences(
        &self,
        symbol: &Symbol,
        scan_strings: bool,
        scan_comments: bool,
    ) -> Result<HashMap<DocumentId, HashSet<LocationRecord>>> {
        let mut found: HashMap<DocumentId, HashSet<LocationRecord>> = HashMap::new();

        for (document, text) in &self.documents {
            for region in lexer::text_regions(text) {
                let wanted = match region.context {
                    TextContext::Comment => scan_comments,
                    TextContext::StringLiteral => scan_strings,
                };
                if !wanted {
                    continue;
                }
                for span in lexer::word_occurrences(text, region.span, &symbol.name) {
                    found.entry(document.clone()).or_default().insert(
                        LocationRecord::new(document.clone(), span)
                            .from_definition(symbol.id)
                            .in_text(region.context),
                    );
                }
            }
        }

        Ok(found)
    }
}

impl SymbolTable for IndexedWorkspace {
    fn containing_type_members(&self, symbol: &Symbol) -> Vec<Symbol> {
        let Some(container) = symbol.containing_type else {
            return Vec::new();
        };
        self.symbols
            .values()
            .filter(|member| member.containing_type == Some(container))
            .cloned()
            .collect()
    }
}
