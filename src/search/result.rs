//! Merged, immutable search outcomes.

use crate::config::RenameOptions;
use crate::error::{Result, SearchFault};
use crate::location::{DocumentId, LocationRecord};
use crate::symbol::Symbol;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Locations of one document after merging.
#[derive(Debug, Default, Clone)]
pub(crate) struct DocumentLocations {
    pub(crate) locations: HashSet<LocationRecord>,
    pub(crate) implicit_locations: HashSet<LocationRecord>,
}

/// Union of every partial result selected by one option generation.
#[derive(Debug, Default)]
pub(crate) struct MergedLocations {
    pub(crate) documents: HashMap<DocumentId, DocumentLocations>,
    pub(crate) referenced_symbols: HashSet<Symbol>,
    pub(crate) faults: Vec<SearchFault>,
}

impl MergedLocations {
    pub(crate) fn add_locations(&mut self, partial: HashMap<DocumentId, HashSet<LocationRecord>>) {
        for (document, records) in partial {
            self.documents
                .entry(document)
                .or_default()
                .locations
                .extend(records);
        }
    }

    pub(crate) fn add_implicit_locations(
        &mut self,
        partial: HashMap<DocumentId, HashSet<LocationRecord>>,
    ) {
        for (document, records) in partial {
            self.documents
                .entry(document)
                .or_default()
                .implicit_locations
                .extend(records);
        }
    }

    pub(crate) fn add_faults(&mut self, faults: impl IntoIterator<Item = SearchFault>) {
        for fault in faults {
            if !self.faults.contains(&fault) {
                self.faults.push(fault);
            }
        }
    }

    /// Result set covering every document.
    pub(crate) fn whole(&self, options: RenameOptions) -> ResultSet {
        let mut result = ResultSet::empty(options);
        for slice in self.documents.values() {
            result.locations.extend(slice.locations.iter().cloned());
            result
                .implicit_locations
                .extend(slice.implicit_locations.iter().cloned());
        }
        result.referenced_symbols = self.referenced_symbols.clone();
        result.faults = self.faults.clone();
        result
    }

    /// Result set scoped to one document; empty if the search never visited it.
    pub(crate) fn for_document(&self, document: &DocumentId, options: RenameOptions) -> ResultSet {
        let mut result = ResultSet::empty(options);
        if let Some(slice) = self.documents.get(document) {
            result.locations = slice.locations.clone();
            result.implicit_locations = slice.implicit_locations.clone();
        }
        result.referenced_symbols = self.referenced_symbols.clone();
        result.faults = self.faults.clone();
        result
    }
}

/// The outcome of a rename search for one option combination.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    /// Every location to edit.
    pub locations: HashSet<LocationRecord>,

    /// Definitions the searches reported.
    pub referenced_symbols: HashSet<Symbol>,

    /// Implicit references that need consideration but have no text.
    pub implicit_locations: HashSet<LocationRecord>,

    /// Collaborator failures; their locations are missing from the sets above.
    pub faults: Vec<SearchFault>,

    /// Options the set was merged under.
    pub options: RenameOptions,
}

impl ResultSet {
    /// Empty result set.
    pub fn empty(options: RenameOptions) -> Self {
        Self {
            locations: HashSet::new(),
            referenced_symbols: HashSet::new(),
            implicit_locations: HashSet::new(),
            faults: Vec::new(),
            options,
        }
    }

    /// Whether every search and scan succeeded.
    pub fn is_complete(&self) -> bool {
        self.faults.is_empty()
    }

    /// Fail with the first fault, if any.
    pub fn into_strict(self) -> Result<Self> {
        match self.faults.first() {
            Some(fault) => Err(fault.clone().into()),
            None => Ok(self),
        }
    }

    /// Locations ordered by document, then span.
    pub fn sorted_locations(&self) -> Vec<LocationRecord> {
        let mut locations: Vec<_> = self.locations.iter().cloned().collect();
        locations.sort();
        locations
    }

    /// Implicit locations ordered by document, then span.
    pub fn sorted_implicit_locations(&self) -> Vec<LocationRecord> {
        let mut locations: Vec<_> = self.implicit_locations.iter().cloned().collect();
        locations.sort();
        locations
    }

    /// Whether `document` has any location to edit.
    pub fn touches(&self, document: &DocumentId) -> bool {
        self.locations.iter().any(|record| &record.document == document)
    }

    /// Deterministic, serializable view.
    pub fn report(&self) -> ResultReport {
        let mut referenced_symbols: Vec<Symbol> = self.referenced_symbols.iter().cloned().collect();
        referenced_symbols.sort_by_key(|symbol| symbol.id);

        ResultReport {
            options: self.options,
            locations: self.sorted_locations(),
            implicit_locations: self.sorted_implicit_locations(),
            referenced_symbols,
            faults: self.faults.clone(),
        }
    }
}

/// Serializable form of a [`ResultSet`].
#[derive(Debug, Clone, Serialize)]
pub struct ResultReport {
    /// Options the set was merged under.
    pub options: RenameOptions,
    /// Sorted locations.
    pub locations: Vec<LocationRecord>,
    /// Sorted implicit locations.
    pub implicit_locations: Vec<LocationRecord>,
    /// Referenced symbols ordered by id.
    pub referenced_symbols: Vec<Symbol>,
    /// Collaborator failures.
    pub faults: Vec<SearchFault>,
}
