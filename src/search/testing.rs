//! Collaborators for the search unit tests.
//!
//! `TestBackend` models a type `T` (#100) declaring `Foo` (#1) and a chosen
//! number of overloads (#2, #3, ...). Every symbol has one definition at
//! `DocA:{id * 10}-{id * 10 + 3}`; comment and string scans report
//! `DocC:0-3` and `DocS:0-3`.

use super::collaborators::{
    LocationResolver, ReferenceFinder, ReferenceSink, RenameServices, SymbolTable, TextScanner,
};
use super::reuse::RenameLocationFinder;
use crate::cancel::CancellationToken;
use crate::config::SearchConfig;
use crate::error::Result;
use crate::location::{DocumentId, LocationRecord, ReferenceLocation, TextContext, TextSpan};
use crate::symbol::{Symbol, SymbolId, SymbolKind};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

const TYPE_ID: u64 = 100;

/// Blocks callers until opened or until their cancellation fires.
#[derive(Default)]
pub(crate) struct Latch {
    open: Mutex<bool>,
    changed: Condvar,
}

impl Latch {
    pub(crate) fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.changed.notify_all();
    }

    pub(crate) fn wait(&self, cancel: &CancellationToken) -> Result<()> {
        let mut open = self.open.lock().unwrap();
        while !*open {
            cancel.check()?;
            open = self.changed.wait_timeout(open, Duration::from_millis(5)).unwrap().0;
        }
        Ok(())
    }
}

/// The first text scan signals `entered`, then blocks until `release`.
struct HeldScan {
    entered: Arc<Latch>,
    release: Arc<Latch>,
}

pub(crate) struct TestBackend {
    members: Vec<Symbol>,
    gates: HashMap<SymbolId, Arc<Latch>>,
    held_scan: Option<HeldScan>,
    search_calls: Mutex<HashMap<SymbolId, usize>>,
    scan_calls: AtomicUsize,
}

impl TestBackend {
    pub(crate) fn with_overloads(count: u64) -> Self {
        let members = (1..=count + 1)
            .map(|id| Symbol::new(id, "Foo", SymbolKind::Method).in_type(SymbolId(TYPE_ID)))
            .collect();
        Self {
            members,
            gates: HashMap::new(),
            held_scan: None,
            search_calls: Mutex::new(HashMap::new()),
            scan_calls: AtomicUsize::new(0),
        }
    }

    /// Hold every member's reference search behind its own latch.
    pub(crate) fn gate_all(mut self) -> (Self, Vec<Arc<Latch>>) {
        let latches: Vec<_> = self.members.iter().map(|_| Arc::new(Latch::default())).collect();
        for (member, latch) in self.members.iter().zip(&latches) {
            self.gates.insert(member.id, Arc::clone(latch));
        }
        (self, latches)
    }

    /// Hold the first text scan; returns `(entered, release)`.
    pub(crate) fn hold_first_scan(mut self) -> (Self, Arc<Latch>, Arc<Latch>) {
        let entered = Arc::new(Latch::default());
        let release = Arc::new(Latch::default());
        self.held_scan = Some(HeldScan {
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
        });
        (self, entered, release)
    }

    pub(crate) fn base(&self) -> Symbol {
        self.members[0].clone()
    }

    pub(crate) fn member_ids(&self) -> Vec<SymbolId> {
        self.members.iter().map(|member| member.id).collect()
    }

    pub(crate) fn search_calls(&self, id: SymbolId) -> usize {
        self.search_calls.lock().unwrap().get(&id).copied().unwrap_or(0)
    }

    pub(crate) fn scan_calls(&self) -> usize {
        self.scan_calls.load(Ordering::SeqCst)
    }
}

pub(crate) fn definition_of(id: SymbolId) -> LocationRecord {
    let start = id.0 as usize * 10;
    LocationRecord::new("DocA", TextSpan::new(start, start + 3)).from_definition(id)
}

impl ReferenceFinder for TestBackend {
    fn find_references(
        &self,
        symbol: &Symbol,
        sink: &dyn ReferenceSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        *self.search_calls.lock().unwrap().entry(symbol.id).or_default() += 1;
        if let Some(gate) = self.gates.get(&symbol.id) {
            gate.wait(cancel)?;
        }
        sink.on_definition_found(symbol);
        Ok(())
    }
}

impl LocationResolver for TestBackend {
    fn resolve_definition_locations(
        &self,
        definition: &Symbol,
        _rename_symbol: &Symbol,
    ) -> Result<HashSet<LocationRecord>> {
        Ok(HashSet::from([definition_of(definition.id)]))
    }

    fn resolve_reference_locations(
        &self,
        _definition: &Symbol,
        _rename_symbol: &Symbol,
        _reference: &ReferenceLocation,
    ) -> Result<HashSet<LocationRecord>> {
        Ok(HashSet::new())
    }
}

impl TextScanner for TestBackend {
    fn scan_for_text_occurrences(
        &self,
        _symbol: &Symbol,
        scan_strings: bool,
        scan_comments: bool,
    ) -> Result<HashMap<DocumentId, HashSet<LocationRecord>>> {
        let call = self.scan_calls.fetch_add(1, Ordering::SeqCst);
        if let (0, Some(held)) = (call, &self.held_scan) {
            held.entered.open();
            held.release.wait(&CancellationToken::new())?;
        }

        let mut found: HashMap<DocumentId, HashSet<LocationRecord>> = HashMap::new();
        let occurrences = [
            (scan_strings, "DocS", TextContext::StringLiteral),
            (scan_comments, "DocC", TextContext::Comment),
        ];
        for (enabled, document, context) in occurrences {
            if enabled {
                let record = LocationRecord::new(document, TextSpan::new(0, 3)).in_text(context);
                found.entry(record.document.clone()).or_default().insert(record);
            }
        }
        Ok(found)
    }
}

impl SymbolTable for TestBackend {
    fn containing_type_members(&self, symbol: &Symbol) -> Vec<Symbol> {
        if symbol.containing_type == Some(SymbolId(TYPE_ID)) {
            self.members.clone()
        } else {
            Vec::new()
        }
    }
}

pub(crate) fn services(backend: &Arc<TestBackend>) -> RenameServices {
    RenameServices::from_shared(Arc::clone(backend))
}

pub(crate) fn pool() -> Arc<ThreadPool> {
    Arc::new(ThreadPoolBuilder::new().num_threads(2).build().unwrap())
}

pub(crate) fn finder(backend: &Arc<TestBackend>) -> RenameLocationFinder {
    let config = SearchConfig::default().with_follow_up_threads(2);
    RenameLocationFinder::new(services(backend), config).unwrap()
}

/// Rendered `Doc:start-end` strings of a result, sorted.
pub(crate) fn rendered(locations: &[LocationRecord]) -> Vec<String> {
    locations.iter().map(|l| l.to_string()).collect()
}
