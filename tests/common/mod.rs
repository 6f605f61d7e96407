//! Shared test collaborators.
//!
//! `ScriptedBackend` plays every collaborator role from a fixed script and
//! counts how often each reference search and text scan runs.

#![allow(dead_code)]

use rename_locations::{
    CancellationToken, DocumentId, LocationRecord, LocationResolver, ReferenceFinder,
    ReferenceLocation, ReferenceSink, RenameError, RenameLocationFinder, RenameServices, Result,
    SearchConfig, Symbol, SymbolId, SymbolKind, SymbolTable, TextContext, TextScanner, TextSpan,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Holds reference searches until opened (or until cancellation fires).
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    changed: Condvar,
}

impl Gate {
    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.changed.notify_all();
    }

    fn pass(&self, cancel: &CancellationToken) -> Result<()> {
        let mut open = self.open.lock().unwrap();
        while !*open {
            cancel.check()?;
            open = self.changed.wait_timeout(open, Duration::from_millis(5)).unwrap().0;
        }
        Ok(())
    }
}

/// Scripted definitions, references and text occurrences.
#[derive(Default)]
pub struct ScriptedBackend {
    symbols: Vec<Symbol>,
    definitions: HashMap<SymbolId, Vec<LocationRecord>>,
    references: HashMap<SymbolId, Vec<ReferenceLocation>>,
    strings: HashMap<DocumentId, HashSet<LocationRecord>>,
    comments: HashMap<DocumentId, HashSet<LocationRecord>>,
    failing_searches: HashSet<SymbolId>,
    panicking_searches: HashSet<SymbolId>,
    failing_reference_resolution: bool,
    failing_text_scan: bool,
    gates: HashMap<SymbolId, Arc<Gate>>,
    search_calls: Mutex<HashMap<SymbolId, usize>>,
    scan_calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbol(mut self, symbol: Symbol) -> Self {
        self.symbols.push(symbol);
        self
    }

    pub fn definition(mut self, symbol: u64, document: &str, start: usize, end: usize) -> Self {
        self.definitions
            .entry(SymbolId(symbol))
            .or_default()
            .push(LocationRecord::new(document, TextSpan::new(start, end)).from_definition(SymbolId(symbol)));
        self
    }

    pub fn reference(mut self, symbol: u64, document: &str, start: usize, end: usize) -> Self {
        self.references
            .entry(SymbolId(symbol))
            .or_default()
            .push(ReferenceLocation::new(document, TextSpan::new(start, end)));
        self
    }

    pub fn implicit_reference(mut self, symbol: u64, document: &str, start: usize, end: usize) -> Self {
        self.references
            .entry(SymbolId(symbol))
            .or_default()
            .push(ReferenceLocation::new(document, TextSpan::new(start, end)).implicit());
        self
    }

    pub fn comment(mut self, document: &str, start: usize, end: usize) -> Self {
        self.comments
            .entry(DocumentId::new(document))
            .or_default()
            .insert(LocationRecord::new(document, TextSpan::new(start, end)).in_text(TextContext::Comment));
        self
    }

    pub fn string(mut self, document: &str, start: usize, end: usize) -> Self {
        self.strings
            .entry(DocumentId::new(document))
            .or_default()
            .insert(
                LocationRecord::new(document, TextSpan::new(start, end)).in_text(TextContext::StringLiteral),
            );
        self
    }

    pub fn failing_search(mut self, symbol: u64) -> Self {
        self.failing_searches.insert(SymbolId(symbol));
        self
    }

    pub fn panicking_search(mut self, symbol: u64) -> Self {
        self.panicking_searches.insert(SymbolId(symbol));
        self
    }

    pub fn failing_reference_resolution(mut self) -> Self {
        self.failing_reference_resolution = true;
        self
    }

    pub fn failing_text_scan(mut self) -> Self {
        self.failing_text_scan = true;
        self
    }

    /// Hold the search for `symbol` until the returned gate opens.
    pub fn gated(mut self, symbol: u64) -> (Self, Arc<Gate>) {
        let gate = Arc::new(Gate::default());
        self.gates.insert(SymbolId(symbol), Arc::clone(&gate));
        (self, gate)
    }

    pub fn search_calls(&self, symbol: u64) -> usize {
        self.search_calls
            .lock()
            .unwrap()
            .get(&SymbolId(symbol))
            .copied()
            .unwrap_or(0)
    }

    pub fn scan_calls(&self) -> usize {
        self.scan_calls.load(Ordering::SeqCst)
    }

    pub fn lookup(&self, id: u64) -> Symbol {
        self.symbols
            .iter()
            .find(|s| s.id == SymbolId(id))
            .cloned()
            .unwrap()
    }
}

impl ReferenceFinder for ScriptedBackend {
    fn find_references(
        &self,
        symbol: &Symbol,
        sink: &dyn ReferenceSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        *self.search_calls.lock().unwrap().entry(symbol.id).or_default() += 1;

        if let Some(gate) = self.gates.get(&symbol.id) {
            gate.pass(cancel)?;
        }
        if self.panicking_searches.contains(&symbol.id) {
            panic!("index corrupted for {}", symbol.name);
        }
        if self.failing_searches.contains(&symbol.id) {
            return Err(RenameError::Other(format!("index unavailable for {}", symbol.name)));
        }

        sink.on_definition_found(symbol);
        for reference in self.references.get(&symbol.id).into_iter().flatten() {
            cancel.check()?;
            sink.on_reference_found(symbol, reference.clone());
        }
        Ok(())
    }
}

impl LocationResolver for ScriptedBackend {
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
        if self.failing_reference_resolution {
            return Err(RenameError::Other("resolver offline".to_string()));
        }
        if reference.is_implicit {
            return Ok(HashSet::new());
        }
        Ok(HashSet::from([LocationRecord::new(reference.document.clone(), reference.span)
            .from_definition(definition.id)]))
    }
}

impl TextScanner for ScriptedBackend {
    fn scan_for_text_occurrences(
        &self,
        _symbol: &Symbol,
        scan_strings: bool,
        scan_comments: bool,
    ) -> Result<HashMap<DocumentId, HashSet<LocationRecord>>> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_text_scan {
            return Err(RenameError::Other("scanner offline".to_string()));
        }

        let mut found: HashMap<DocumentId, HashSet<LocationRecord>> = HashMap::new();
        let sources = [(scan_strings, &self.strings), (scan_comments, &self.comments)];
        for (enabled, source) in sources {
            if !enabled {
                continue;
            }
            for (document, records) in source {
                found.entry(document.clone()).or_default().extend(records.iter().cloned());
            }
        }
        Ok(found)
    }
}

impl SymbolTable for ScriptedBackend {
    fn containing_type_members(&self, symbol: &Symbol) -> Vec<Symbol> {
        match symbol.containing_type {
            Some(container) => self
                .symbols
                .iter()
                .filter(|s| s.containing_type == Some(container))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }
}

/// `Foo()` (#1) and its overload `Foo(int)` (#2) in type `C` (#10).
pub fn foo_backend() -> ScriptedBackend {
    ScriptedBackend::new()
        .symbol(Symbol::new(10, "C", SymbolKind::Type))
        .symbol(Symbol::new(1, "Foo", SymbolKind::Method).in_type(SymbolId(10)))
        .symbol(Symbol::new(2, "Foo", SymbolKind::Method).in_type(SymbolId(10)))
        .definition(1, "DocA", 10, 13)
        .reference(1, "DocB", 5, 8)
        .definition(2, "DocA", 20, 23)
}

pub fn finder(backend: &Arc<ScriptedBackend>) -> RenameLocationFinder {
    let config = SearchConfig::default().with_follow_up_threads(2);
    RenameLocationFinder::new(RenameServices::from_shared(Arc::clone(backend)), config).unwrap()
}

/// Render result locations as `Doc:start-end`, sorted.
pub fn rendered(locations: &[LocationRecord]) -> Vec<String> {
    locations.iter().map(|l| l.to_string()).collect()
}
