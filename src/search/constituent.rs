//! Constituent searchers.
//!
//! A constituent wraps the reference search for one symbol group: the base
//! symbol, or every overload of it. Each underlying search runs on its own
//! thread; every callback spawns its follow-up resolution onto the shared
//! worker pool inside a scope, so a search counts as completed only after
//! all of its follow-up writes have landed.

use super::accumulator::DocumentAccumulator;
use super::collaborators::{ReferenceSink, RenameServices};
use super::container::AggregationContainer;
use super::result::MergedLocations;
use crate::cancel::CancellationToken;
use crate::error::SearchFault;
use crate::location::{LocationRecord, ReferenceLocation};
use crate::symbol::{Symbol, SymbolId};
use dashmap::DashMap;
use rayon::{Scope, ThreadPool};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;

/// Which symbol group a constituent searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstituentKind {
    /// The symbol being renamed.
    BaseSymbol,
    /// Same-named overloads of the symbol in its containing type.
    OverloadedSymbols,
}

impl ConstituentKind {
    /// Convert kind to string identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstituentKind::BaseSymbol => "base",
            ConstituentKind::OverloadedSymbols => "overloads",
        }
    }
}

/// Lifecycle of a constituent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstituentPhase {
    /// Not started yet.
    Created,
    /// Searches launched, some still running.
    Started,
    /// Every search finished and every follow-up drained.
    Completed,
}

struct ConstituentState {
    phase: ConstituentPhase,
    total_candidates: usize,
    completed: usize,
    parent: Weak<AggregationContainer>,
}

/// Drives the reference search(es) for one symbol group and accumulates
/// what they report.
pub struct ConstituentSearcher {
    kind: ConstituentKind,
    symbol: Symbol,
    services: RenameServices,
    cancel: CancellationToken,
    pool: Arc<ThreadPool>,
    state: Mutex<ConstituentState>,
    locations: DocumentAccumulator,
    implicit_locations: DocumentAccumulator,
    definitions: DashMap<SymbolId, Symbol>,
    faults: Mutex<Vec<SearchFault>>,
}

impl ConstituentSearcher {
    pub(crate) fn new(
        kind: ConstituentKind,
        symbol: Symbol,
        services: RenameServices,
        cancel: CancellationToken,
        pool: Arc<ThreadPool>,
        parent: &Arc<AggregationContainer>,
    ) -> Arc<Self> {
        Arc::new(Self {
            kind,
            symbol,
            services,
            cancel,
            pool,
            state: Mutex::new(ConstituentState {
                phase: ConstituentPhase::Created,
                total_candidates: 0,
                completed: 0,
                parent: Arc::downgrade(parent),
            }),
            locations: DocumentAccumulator::new(),
            implicit_locations: DocumentAccumulator::new(),
            definitions: DashMap::new(),
            faults: Mutex::new(Vec::new()),
        })
    }

    /// Which symbol group this constituent searches.
    pub fn kind(&self) -> ConstituentKind {
        self.kind
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> ConstituentPhase {
        self.lock_state().phase
    }

    /// `(completed, total)` underlying searches.
    pub fn progress(&self) -> (usize, usize) {
        let state = self.lock_state();
        (state.completed, state.total_candidates)
    }

    fn lock_state(&self) -> MutexGuard<'_, ConstituentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_bound_to(&self, container: &Arc<AggregationContainer>) -> bool {
        std::ptr::eq(self.lock_state().parent.as_ptr(), Arc::as_ptr(container))
    }

    /// The container currently receiving this constituent's progress.
    pub(crate) fn parent(&self) -> Option<Arc<AggregationContainer>> {
        self.lock_state().parent.upgrade()
    }

    /// Launch the underlying searches.
    ///
    /// # Panics
    /// If the constituent was already started.
    pub(crate) fn start(self: &Arc<Self>) {
        let mut state = self.lock_state();
        assert_eq!(
            state.phase,
            ConstituentPhase::Created,
            "{} constituent for '{}' started twice",
            self.kind.as_str(),
            self.symbol.name
        );

        let symbols = self.candidate_symbols();
        state.phase = ConstituentPhase::Started;
        state.total_candidates = symbols.len();
        let parent = state.parent.upgrade();
        if let Some(parent) = &parent {
            parent.report_started(self.kind, symbols.len());
        }

        log::debug!(
            "Starting {} constituent for '{}' with {} candidate(s)",
            self.kind.as_str(),
            self.symbol.name,
            symbols.len()
        );

        if symbols.is_empty() {
            state.phase = ConstituentPhase::Completed;
            if let Some(parent) = &parent {
                parent.report_completed(self.kind, 0);
            }
            drop(state);
            if let Some(parent) = parent {
                parent.try_finalize();
            }
            return;
        }
        drop(state);

        for symbol in symbols {
            self.launch(symbol);
        }
    }

    /// Push current totals into `container`, which must already be the parent.
    pub(crate) fn fold_into(&self, container: &AggregationContainer) {
        let state = self.lock_state();
        self.report_progress(&state, container);
    }

    /// Re-parent onto `container`, carrying over progress; starts the
    /// constituent if it never ran.
    pub(crate) fn rebind(self: &Arc<Self>, container: &Arc<AggregationContainer>) {
        let mut state = self.lock_state();
        state.parent = Arc::downgrade(container);
        log::debug!(
            "Rebinding {} constituent for '{}' ({:?}, {}/{})",
            self.kind.as_str(),
            self.symbol.name,
            state.phase,
            state.completed,
            state.total_candidates
        );

        if state.phase == ConstituentPhase::Created {
            drop(state);
            self.start();
            return;
        }
        self.report_progress(&state, container);
    }

    fn report_progress(&self, state: &ConstituentState, container: &AggregationContainer) {
        if state.phase == ConstituentPhase::Created {
            return;
        }
        container.report_started(self.kind, state.total_candidates);
        if state.phase == ConstituentPhase::Completed {
            container.report_completed(self.kind, state.total_candidates);
        }
    }

    fn candidate_symbols(&self) -> Vec<Symbol> {
        match self.kind {
            ConstituentKind::BaseSymbol => vec![self.symbol.clone()],
            ConstituentKind::OverloadedSymbols => self.services.overloads_of(&self.symbol),
        }
    }

    fn launch(self: &Arc<Self>, symbol: Symbol) {
        let searcher = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("rename-search-{}", symbol.name))
            .spawn(move || searcher.run_search(symbol));

        if let Err(e) = spawned {
            self.record_fault(SearchFault::new(
                &self.symbol.name,
                format!("failed to spawn search thread: {}", e),
            ));
            self.on_search_completed();
        }
    }

    fn run_search(self: Arc<Self>, symbol: Symbol) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.pool.in_place_scope(|scope| {
                let sink = FollowUpSink {
                    scope,
                    searcher: &self,
                };
                self.services
                    .finder
                    .find_references(&symbol, &sink, &self.cancel)
            })
        }));

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.is_canceled() => {
                log::debug!("Reference search for '{}' canceled", symbol.name);
            }
            Ok(Err(e)) => self.record_fault(SearchFault::new(&symbol.name, e.to_string())),
            Err(payload) => {
                self.record_fault(SearchFault::new(&symbol.name, panic_message(payload.as_ref())))
            }
        }

        self.on_search_completed();
    }

    fn on_search_completed(&self) {
        let (parent, done) = {
            let mut state = self.lock_state();
            debug_assert!(state.completed < state.total_candidates);
            state.completed = (state.completed + 1).min(state.total_candidates);
            let done = state.completed == state.total_candidates;
            let parent = state.parent.upgrade();
            if done {
                state.phase = ConstituentPhase::Completed;
                if let Some(parent) = &parent {
                    parent.report_completed(self.kind, state.total_candidates);
                }
            }
            (parent, done)
        };

        if done {
            log::debug!(
                "{} constituent for '{}' complete ({} locations)",
                self.kind.as_str(),
                self.symbol.name,
                self.locations.len()
            );
            if let Some(parent) = parent {
                parent.try_finalize();
            }
        }
    }

    fn resolve_definition(&self, definition: &Symbol, rename_symbol: &Symbol) {
        if self.cancel.is_cancelled() {
            return;
        }
        match self
            .services
            .resolver
            .resolve_definition_locations(definition, rename_symbol)
        {
            Ok(records) => self.locations.extend(records),
            Err(e) if e.is_canceled() => {}
            Err(e) => self.record_fault(SearchFault::new(&definition.name, e.to_string())),
        }
    }

    fn resolve_reference(
        &self,
        definition: &Symbol,
        rename_symbol: &Symbol,
        reference: &ReferenceLocation,
    ) {
        if self.cancel.is_cancelled() {
            return;
        }
        match self
            .services
            .resolver
            .resolve_reference_locations(definition, rename_symbol, reference)
        {
            Ok(records) => self.locations.extend(records),
            Err(e) if e.is_canceled() => {}
            Err(e) => self.record_fault(SearchFault::new(&definition.name, e.to_string())),
        }
    }

    fn record_fault(&self, fault: SearchFault) {
        log::warn!("Rename search fault: {}", fault);
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(fault);
    }

    /// Union this constituent's partial results into `merged`.
    pub(crate) fn contribute(&self, merged: &mut MergedLocations) {
        let mut locations = HashMap::new();
        self.locations.union_into(&mut locations);
        merged.add_locations(locations);

        let mut implicit = HashMap::new();
        self.implicit_locations.union_into(&mut implicit);
        merged.add_implicit_locations(implicit);

        merged
            .referenced_symbols
            .extend(self.definitions.iter().map(|entry| entry.value().clone()));

        let faults = self
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        merged.add_faults(faults);
    }
}

impl std::fmt::Debug for ConstituentSearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (completed, total) = self.progress();
        f.debug_struct("ConstituentSearcher")
            .field("kind", &self.kind)
            .field("symbol", &self.symbol.name)
            .field("completed", &completed)
            .field("total", &total)
            .finish()
    }
}

/// Callback receiver for one underlying search.
///
/// Resolution always runs against the symbol being renamed, even when the
/// search is for one of its overloads.
struct FollowUpSink<'a, 'scope> {
    scope: &'a Scope<'scope>,
    searcher: &'a Arc<ConstituentSearcher>,
}

impl ReferenceSink for FollowUpSink<'_, '_> {
    fn on_definition_found(&self, definition: &Symbol) {
        if self
            .searcher
            .definitions
            .insert(definition.id, definition.clone())
            .is_some()
        {
            return;
        }

        let searcher = Arc::clone(self.searcher);
        let definition = definition.clone();
        let rename_symbol = self.searcher.symbol.clone();
        self.scope
            .spawn(move |_| searcher.resolve_definition(&definition, &rename_symbol));
    }

    fn on_reference_found(&self, definition: &Symbol, reference: ReferenceLocation) {
        if reference.is_implicit {
            self.searcher
                .implicit_locations
                .insert(LocationRecord::implicit_reference(&reference, definition.id));
        }

        let searcher = Arc::clone(self.searcher);
        let definition = definition.clone();
        let rename_symbol = self.searcher.symbol.clone();
        self.scope.spawn(move |_| {
            searcher.resolve_reference(&definition, &rename_symbol, &reference)
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("search panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("search panicked: {}", message)
    } else {
        "search panicked".to_string()
    }
}
