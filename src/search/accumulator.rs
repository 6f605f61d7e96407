//! Per-document location accumulators.

use crate::location::{DocumentId, LocationRecord};
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};

/// Insert-only map from document to the locations found in it.
///
/// Writers on different documents do not contend; duplicates are absorbed
/// by set semantics.
#[derive(Debug, Default)]
pub struct DocumentAccumulator {
    documents: DashMap<DocumentId, HashSet<LocationRecord>>,
}

impl DocumentAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one location. Returns `false` if it was already present.
    pub fn insert(&self, record: LocationRecord) -> bool {
        self.documents
            .entry(record.document.clone())
            .or_default()
            .insert(record)
    }

    /// Add every location from `records`.
    pub fn extend<I>(&self, records: I)
    where
        I: IntoIterator<Item = LocationRecord>,
    {
        for record in records {
            self.insert(record);
        }
    }

    /// Total number of distinct locations.
    pub fn len(&self) -> usize {
        self.documents.iter().map(|entry| entry.value().len()).sum()
    }

    /// Union every document's locations into `target`.
    pub fn union_into(&self, target: &mut HashMap<DocumentId, HashSet<LocationRecord>>) {
        for entry in self.documents.iter() {
            target
                .entry(entry.key().clone())
                .or_default()
                .extend(entry.value().iter().cloned());
        }
    }
}
