//! Caller-facing entry points and container reuse.
//!
//! `find_all` builds a container from scratch. `refine` decides, from the
//! previous container and the new options, whether to keep that container
//! (only text-scan flags changed) or to build a new one that rebinds the
//! previous constituents and text scans. A superseded container is never
//! reused. Either way the base-symbol reference search never runs twice.

use super::collaborators::RenameServices;
use super::constituent::{ConstituentKind, ConstituentSearcher};
use super::container::{AggregationContainer, ContainerPhase, SearchProgress};
use super::result::ResultSet;
use crate::cancel::CancellationToken;
use crate::config::{RenameOptions, SearchConfig};
use crate::error::{RenameError, Result};
use crate::location::DocumentId;
use crate::promise::Promise;
use crate::symbol::Symbol;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use uuid::Uuid;

/// Launches and refines rename-location searches.
pub struct RenameLocationFinder {
    services: RenameServices,
    pool: Arc<ThreadPool>,
}

impl RenameLocationFinder {
    /// Create a finder, building the follow-up worker pool.
    pub fn new(services: RenameServices, config: SearchConfig) -> Result<Self> {
        let mut builder =
            ThreadPoolBuilder::new().thread_name(|index| format!("rename-follow-up-{}", index));
        if config.follow_up_threads > 0 {
            builder = builder.num_threads(config.follow_up_threads);
        }
        let pool = builder
            .build()
            .map_err(|e| RenameError::ThreadPool(e.to_string()))?;

        log::debug!(
            "Rename finder ready with {} follow-up threads",
            pool.current_num_threads()
        );
        Ok(Self {
            services,
            pool: Arc::new(pool),
        })
    }

    /// Start a fresh search for `symbol`.
    pub fn find_all(
        &self,
        symbol: Symbol,
        options: RenameOptions,
        cancel: CancellationToken,
    ) -> RenameSearch {
        let container =
            AggregationContainer::new(symbol.clone(), self.services.clone(), cancel.clone(), options);

        container.attach(self.constituent(ConstituentKind::BaseSymbol, &symbol, &cancel, &container));
        if options.rename_overloads {
            container.attach(self.constituent(
                ConstituentKind::OverloadedSymbols,
                &symbol,
                &cancel,
                &container,
            ));
        }
        container.mark_ready();

        RenameSearch { container }
    }

    /// Re-run `prior` under new options, reusing every search already done.
    pub fn refine(&self, prior: &RenameSearch, options: RenameOptions) -> RenameSearch {
        let previous = &prior.container;

        let reusable = previous.has_overloads() == options.rename_overloads
            && previous.phase() != ContainerPhase::Superseded;
        if reusable {
            log::debug!("[{}] Reusing container for {:?}", previous.id(), options);
            previous.reset_text_scans(options.rename_in_strings, options.rename_in_comments);
            return RenameSearch {
                container: Arc::clone(previous),
            };
        }

        let symbol = previous.symbol().clone();
        let cancel = previous.cancel_token().clone();
        let container =
            AggregationContainer::new(symbol.clone(), self.services.clone(), cancel.clone(), options);
        log::debug!(
            "[{}] Replacing container {} ({:?}, overloads {} -> {})",
            container.id(),
            previous.id(),
            previous.phase(),
            previous.has_overloads(),
            options.rename_overloads
        );

        previous.supersede();
        container.inherit_text_scans(previous);
        let base = take_constituent(previous, ConstituentKind::BaseSymbol)
            .unwrap_or_else(|| self.constituent(ConstituentKind::BaseSymbol, &symbol, &cancel, &container));
        container.attach(base);
        if options.rename_overloads {
            let overloads = take_constituent(previous, ConstituentKind::OverloadedSymbols)
                .unwrap_or_else(|| {
                    self.constituent(ConstituentKind::OverloadedSymbols, &symbol, &cancel, &container)
                });
            container.attach(overloads);
        }
        container.mark_ready();

        RenameSearch { container }
    }

    fn constituent(
        &self,
        kind: ConstituentKind,
        symbol: &Symbol,
        cancel: &CancellationToken,
        container: &Arc<AggregationContainer>,
    ) -> Arc<ConstituentSearcher> {
        ConstituentSearcher::new(
            kind,
            symbol.clone(),
            self.services.clone(),
            cancel.clone(),
            Arc::clone(&self.pool),
            container,
        )
    }
}

/// Take `kind` from `previous` for rebinding.
///
/// The constituent may already report to a later container; that holder
/// is superseded.
fn take_constituent(
    previous: &AggregationContainer,
    kind: ConstituentKind,
) -> Option<Arc<ConstituentSearcher>> {
    let constituent = previous.constituent(kind)?;
    if let Some(owner) = constituent.parent() {
        owner.supersede();
    }
    Some(constituent)
}

/// Handle to one `find_all` / `refine` invocation.
#[derive(Debug, Clone)]
pub struct RenameSearch {
    container: Arc<AggregationContainer>,
}

impl RenameSearch {
    /// Search session id.
    pub fn id(&self) -> Uuid {
        self.container.id()
    }

    /// The symbol being renamed.
    pub fn symbol(&self) -> &Symbol {
        self.container.symbol()
    }

    /// Options of the current generation.
    pub fn options(&self) -> RenameOptions {
        self.container.options()
    }

    /// Aggregate progress.
    pub fn progress(&self) -> SearchProgress {
        self.container.progress()
    }

    /// Container lifecycle phase.
    pub fn phase(&self) -> ContainerPhase {
        self.container.phase()
    }

    /// Promise for the whole-codebase result.
    pub fn all_locations(&self) -> Promise<Arc<ResultSet>> {
        self.container.all_locations()
    }

    /// Promise for the locations of one document.
    pub fn document_locations(&self, document: &DocumentId) -> Promise<Arc<ResultSet>> {
        self.container.document_locations(document)
    }

    /// Block until the whole-codebase result is available.
    pub fn wait(&self) -> Result<Arc<ResultSet>> {
        self.all_locations().wait()
    }

    /// The shared cancellation signal.
    pub fn cancel_token(&self) -> &CancellationToken {
        self.container.cancel_token()
    }

    /// Cancel this search and every search sharing its signal.
    pub fn cancel(&self) {
        self.container.cancel_token().cancel();
    }

    /// Whether both handles share one container.
    pub fn shares_container_with(&self, other: &RenameSearch) -> bool {
        Arc::ptr_eq(&self.container, &other.container)
    }
}
