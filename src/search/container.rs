//! Aggregation container.
//!
//! Owns the constituents and text-scan results of one rename search and
//! publishes their merged result through promises.
//!
//! # Locking
//! - Constituents call into the container while holding their own lock;
//!   the container never takes a constituent lock.
//! - Counters, phase, option flags and promises live under one coarse
//!   container lock. Finalization plans under the lock, merges outside it,
//!   and commits only if the option generation it planned for is still
//!   current, so an option reset can never interleave with a commit.

use super::collaborators::RenameServices;
use super::constituent::{ConstituentKind, ConstituentPhase, ConstituentSearcher};
use super::result::{MergedLocations, ResultSet};
use crate::cancel::{CancellationRegistration, CancellationToken};
use crate::config::RenameOptions;
use crate::error::SearchFault;
use crate::location::{DocumentId, LocationRecord};
use crate::promise::{Promise, Rejection};
use crate::symbol::Symbol;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use uuid::Uuid;

type TextScanOutcome = std::result::Result<HashMap<DocumentId, HashSet<LocationRecord>>, SearchFault>;

/// Lifecycle of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerPhase {
    /// Constituents are still being attached.
    Building,
    /// All constituents attached; waiting for them to complete.
    Ready,
    /// Result published for the current option generation.
    Finalized,
    /// Cancellation fired before finalization.
    Canceled,
    /// Replaced by a refined container before finalization.
    Superseded,
}

/// Aggregate progress of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchProgress {
    /// Underlying searches whose results are complete.
    pub completed: usize,
    /// Underlying searches launched.
    pub total: usize,
    /// Whether the current option generation has been published.
    pub finalized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextScanKind {
    Strings,
    Comments,
}

impl TextScanKind {
    fn as_str(&self) -> &'static str {
        match self {
            TextScanKind::Strings => "string",
            TextScanKind::Comments => "comment",
        }
    }
}

struct ConstituentSlot {
    searcher: Arc<ConstituentSearcher>,
    started: bool,
    total: usize,
    completed: usize,
}

struct ContainerState {
    phase: ContainerPhase,
    generation: u64,
    rename_in_strings: bool,
    rename_in_comments: bool,
    slots: Vec<ConstituentSlot>,
    whole: Promise<Arc<ResultSet>>,
    documents: HashMap<DocumentId, Promise<Arc<ResultSet>>>,
    merged: Option<Arc<MergedLocations>>,
}

impl ContainerState {
    fn slot_mut(&mut self, kind: ConstituentKind) -> Option<&mut ConstituentSlot> {
        self.slots
            .iter_mut()
            .find(|slot| slot.searcher.kind() == kind)
    }

    fn totals(&self) -> (usize, usize) {
        self.slots.iter().fold((0, 0), |(completed, total), slot| {
            (completed + slot.completed, total + slot.total)
        })
    }

    fn finalize_plan(&self, has_overloads: bool) -> Option<FinalizePlan> {
        if self.phase != ContainerPhase::Ready || self.slots.is_empty() {
            return None;
        }
        if self.slots.iter().any(|slot| !slot.started) {
            return None;
        }
        let (completed, total) = self.totals();
        if completed != total {
            return None;
        }

        Some(FinalizePlan {
            generation: self.generation,
            options: RenameOptions {
                rename_overloads: has_overloads,
                rename_in_strings: self.rename_in_strings,
                rename_in_comments: self.rename_in_comments,
            },
            searchers: self.slots.iter().map(|slot| Arc::clone(&slot.searcher)).collect(),
        })
    }
}

struct FinalizePlan {
    generation: u64,
    options: RenameOptions,
    searchers: Vec<Arc<ConstituentSearcher>>,
}

/// Merges constituents and text scans for one logical rename search.
pub struct AggregationContainer {
    id: Uuid,
    symbol: Symbol,
    services: RenameServices,
    cancel: CancellationToken,
    has_overloads: bool,
    state: Mutex<ContainerState>,
    string_scan: OnceLock<TextScanOutcome>,
    comment_scan: OnceLock<TextScanOutcome>,
    registration: Mutex<Option<CancellationRegistration>>,
}

impl AggregationContainer {
    pub(crate) fn new(
        symbol: Symbol,
        services: RenameServices,
        cancel: CancellationToken,
        options: RenameOptions,
    ) -> Arc<Self> {
        let container = Arc::new(Self {
            id: Uuid::new_v4(),
            symbol,
            services,
            cancel: cancel.clone(),
            has_overloads: options.rename_overloads,
            state: Mutex::new(ContainerState {
                phase: ContainerPhase::Building,
                generation: 0,
                rename_in_strings: options.rename_in_strings,
                rename_in_comments: options.rename_in_comments,
                slots: Vec::new(),
                whole: Promise::new(),
                documents: HashMap::new(),
                merged: None,
            }),
            string_scan: OnceLock::new(),
            comment_scan: OnceLock::new(),
            registration: Mutex::new(None),
        });

        let weak = Arc::downgrade(&container);
        let registration = cancel.on_cancel(move || {
            if let Some(container) = weak.upgrade() {
                container.cancel();
            }
        });
        *container
            .registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(registration);

        log::debug!(
            "[{}] Created container for '{}' ({:?})",
            container.id,
            container.symbol.name,
            options
        );
        container
    }

    fn lock_state(&self) -> MutexGuard<'_, ContainerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Search session id used in log lines.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The symbol being renamed.
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Shared cancellation signal.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether this container searches overloads.
    pub fn has_overloads(&self) -> bool {
        self.has_overloads
    }

    /// Options the current generation merges under.
    pub fn options(&self) -> RenameOptions {
        let state = self.lock_state();
        RenameOptions {
            rename_overloads: self.has_overloads,
            rename_in_strings: state.rename_in_strings,
            rename_in_comments: state.rename_in_comments,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> ContainerPhase {
        self.lock_state().phase
    }

    /// Summed constituent progress.
    pub fn progress(&self) -> SearchProgress {
        let state = self.lock_state();
        let (completed, total) = state.totals();
        SearchProgress {
            completed,
            total,
            finalized: state.phase == ContainerPhase::Finalized,
        }
    }

    /// The attached constituent of `kind`, if any.
    pub fn constituent(&self, kind: ConstituentKind) -> Option<Arc<ConstituentSearcher>> {
        self.lock_state()
            .slots
            .iter()
            .find(|slot| slot.searcher.kind() == kind)
            .map(|slot| Arc::clone(&slot.searcher))
    }

    /// Attach a constituent, starting it, folding in its progress, or
    /// rebinding it from a previous container.
    ///
    /// # Panics
    /// If called after [`mark_ready`](Self::mark_ready), if a constituent of
    /// the same kind is already attached, or if an overloads constituent is
    /// attached to a container created without overloads.
    pub(crate) fn attach(self: &Arc<Self>, constituent: Arc<ConstituentSearcher>) {
        {
            let mut state = self.lock_state();
            assert!(
                matches!(state.phase, ContainerPhase::Building | ContainerPhase::Canceled),
                "constituent attached after mark_ready"
            );
            assert!(
                state.slot_mut(constituent.kind()).is_none(),
                "{} constituent attached twice",
                constituent.kind().as_str()
            );
            assert!(
                constituent.kind() != ConstituentKind::OverloadedSymbols || self.has_overloads,
                "overloads constituent attached to a container without overloads"
            );
            state.slots.push(ConstituentSlot {
                searcher: Arc::clone(&constituent),
                started: false,
                total: 0,
                completed: 0,
            });
        }

        if constituent.is_bound_to(self) {
            if constituent.phase() == ConstituentPhase::Created {
                constituent.start();
            } else {
                constituent.fold_into(self);
            }
        } else {
            constituent.rebind(self);
        }
    }

    /// Declare that no further constituents will be attached.
    ///
    /// # Panics
    /// If called twice.
    pub(crate) fn mark_ready(&self) {
        {
            let mut state = self.lock_state();
            match state.phase {
                ContainerPhase::Building => state.phase = ContainerPhase::Ready,
                ContainerPhase::Canceled => return,
                phase => panic!("mark_ready called on a container in phase {:?}", phase),
            }
        }
        self.try_finalize();
    }

    pub(crate) fn report_started(&self, kind: ConstituentKind, total: usize) {
        let mut state = self.lock_state();
        if let Some(slot) = state.slot_mut(kind) {
            slot.started = true;
            slot.total = total;
            slot.completed = slot.completed.min(total);
        }
    }

    pub(crate) fn report_completed(&self, kind: ConstituentKind, completed: usize) {
        let mut state = self.lock_state();
        if let Some(slot) = state.slot_mut(kind) {
            debug_assert!(slot.started, "completion reported before start");
            slot.completed = slot.completed.max(completed).min(slot.total);
        }
    }

    /// Publish the merged result if every constituent and enabled scan is
    /// done. Calling it again after success is a no-op.
    pub fn try_finalize(&self) {
        loop {
            let plan = match self.lock_state().finalize_plan(self.has_overloads) {
                Some(plan) => plan,
                None => return,
            };

            let merged = Arc::new(self.merge(&plan));

            let mut state = self.lock_state();
            if state.phase != ContainerPhase::Ready {
                return;
            }
            if state.generation != plan.generation {
                // Options were reset while merging; plan again for the new flags.
                continue;
            }

            let options = plan.options;
            let whole = Arc::new(merged.whole(options));
            log::info!(
                "[{}] Finalized rename of '{}': {} locations, {} implicit, {} faults",
                self.id,
                self.symbol.name,
                whole.locations.len(),
                whole.implicit_locations.len(),
                whole.faults.len()
            );

            state.whole.resolve(whole);
            for (document, promise) in &state.documents {
                promise.resolve(Arc::new(merged.for_document(document, options)));
            }
            state.merged = Some(merged);
            state.phase = ContainerPhase::Finalized;
            return;
        }
    }

    fn merge(&self, plan: &FinalizePlan) -> MergedLocations {
        let mut merged = MergedLocations::default();
        for searcher in &plan.searchers {
            searcher.contribute(&mut merged);
        }

        if !plan.options.scans_text() {
            return merged;
        }

        let scans = [
            (plan.options.rename_in_strings, TextScanKind::Strings),
            (plan.options.rename_in_comments, TextScanKind::Comments),
        ];
        for (enabled, kind) in scans {
            if !enabled {
                continue;
            }
            match self.text_scan(kind) {
                Ok(found) => merged.add_locations(found.clone()),
                Err(fault) => merged.add_faults([fault.clone()]),
            }
        }
        merged
    }

    fn text_scan(&self, kind: TextScanKind) -> &TextScanOutcome {
        let cell = match kind {
            TextScanKind::Strings => &self.string_scan,
            TextScanKind::Comments => &self.comment_scan,
        };
        cell.get_or_init(|| {
            let scan_strings = kind == TextScanKind::Strings;
            let scan_comments = kind == TextScanKind::Comments;
            log::debug!("[{}] Scanning {} occurrences of '{}'", self.id, kind.as_str(), self.symbol.name);
            self.services
                .text_scanner
                .scan_for_text_occurrences(&self.symbol, scan_strings, scan_comments)
                .map_err(|e| {
                    let fault = SearchFault::new(
                        &self.symbol.name,
                        format!("{} scan failed: {}", kind.as_str(), e),
                    );
                    log::warn!("[{}] {}", self.id, fault);
                    fault
                })
        })
    }

    /// Promise for the locations of one document.
    ///
    /// Resolves immediately once the container is finalized; a document the
    /// search never visited resolves to an empty result set.
    pub fn document_locations(&self, document: &DocumentId) -> Promise<Arc<ResultSet>> {
        let mut state = self.lock_state();
        if let Some(promise) = state.documents.get(document) {
            return promise.clone();
        }

        let promise = match (state.phase, &state.merged) {
            (ContainerPhase::Canceled, _) => Promise::rejected(Rejection::Canceled),
            (ContainerPhase::Superseded, _) => Promise::rejected(Rejection::Superseded),
            (ContainerPhase::Finalized, Some(merged)) => {
                let options = RenameOptions {
                    rename_overloads: self.has_overloads,
                    rename_in_strings: state.rename_in_strings,
                    rename_in_comments: state.rename_in_comments,
                };
                Promise::resolved(Arc::new(merged.for_document(document, options)))
            }
            _ => Promise::new(),
        };
        state.documents.insert(document.clone(), promise.clone());
        promise
    }

    /// Promise for the whole-codebase result of the current generation.
    pub fn all_locations(&self) -> Promise<Arc<ResultSet>> {
        self.lock_state().whole.clone()
    }

    /// Reject every outstanding promise as canceled.
    pub fn cancel(&self) {
        let mut state = self.lock_state();
        if matches!(
            state.phase,
            ContainerPhase::Finalized | ContainerPhase::Canceled | ContainerPhase::Superseded
        ) {
            return;
        }
        state.phase = ContainerPhase::Canceled;
        state.whole.reject(Rejection::Canceled);
        for promise in state.documents.values() {
            promise.reject(Rejection::Canceled);
        }
        log::debug!(
            "[{}] Canceled rename of '{}' ({} document promises)",
            self.id,
            self.symbol.name,
            state.documents.len()
        );
    }

    /// Reuse the text scans `previous` already ran for the same symbol.
    pub(crate) fn inherit_text_scans(&self, previous: &AggregationContainer) {
        let cells = [
            (&self.string_scan, &previous.string_scan),
            (&self.comment_scan, &previous.comment_scan),
        ];
        for (cell, prior) in cells {
            if let Some(outcome) = prior.get() {
                // Already set means a scan ran here first; keep it.
                let _ = cell.set(outcome.clone());
            }
        }
    }

    /// Retire this container in favor of a refined one.
    ///
    /// Pending promises are rejected as superseded. A finalized container
    /// keeps its result.
    pub(crate) fn supersede(&self) {
        let mut state = self.lock_state();
        if !matches!(state.phase, ContainerPhase::Building | ContainerPhase::Ready) {
            return;
        }
        state.phase = ContainerPhase::Superseded;
        state.whole.reject(Rejection::Superseded);
        for promise in state.documents.values() {
            promise.reject(Rejection::Superseded);
        }
        log::debug!("[{}] Superseded before finalization", self.id);
    }

    /// Switch text-scan flags, re-arming fresh promises.
    ///
    /// Pending promises of the replaced generation are rejected as
    /// superseded; resolved ones keep their value.
    pub(crate) fn reset_text_scans(&self, rename_in_strings: bool, rename_in_comments: bool) {
        {
            let mut state = self.lock_state();
            if state.rename_in_strings == rename_in_strings
                && state.rename_in_comments == rename_in_comments
            {
                return;
            }
            state.rename_in_strings = rename_in_strings;
            state.rename_in_comments = rename_in_comments;
            if matches!(state.phase, ContainerPhase::Canceled | ContainerPhase::Superseded) {
                return;
            }

            state.generation += 1;
            let previous_whole = std::mem::replace(&mut state.whole, Promise::new());
            let previous_documents = std::mem::take(&mut state.documents);
            state.merged = None;
            if state.phase == ContainerPhase::Finalized {
                state.phase = ContainerPhase::Ready;
            }

            previous_whole.reject(Rejection::Superseded);
            for promise in previous_documents.values() {
                promise.reject(Rejection::Superseded);
            }
            log::debug!(
                "[{}] Reset text scans (strings={}, comments={}), generation {}",
                self.id,
                rename_in_strings,
                rename_in_comments,
                state.generation
            );
        }
        self.try_finalize();
    }
}

impl std::fmt::Debug for AggregationContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregationContainer")
            .field("id", &self.id)
            .field("symbol", &self.symbol.name)
            .field("progress", &self.progress())
            .finish()
    }
}
