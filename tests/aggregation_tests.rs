//! Integration tests for result aggregation.
//!
//! These tests drive full searches against scripted collaborators and
//! check the merged result sets.

mod common;

#[cfg(test)]
mod tests {
    use super::common::{finder, foo_backend, rendered, ScriptedBackend};
    use rename_locations::{
        CancellationToken, DocumentId, RenameOptions, Symbol, SymbolId, SymbolKind,
    };
    use std::sync::Arc;
    use std::time::Duration;

    /// Foo with overload Foo(int), overloads enabled, no text scans.
    #[test]
    fn test_overload_scenario_merges_both_constituents() {
        let backend = Arc::new(foo_backend());
        let finder = finder(&backend);
        let foo = backend.lookup(1);

        let search = finder.find_all(
            foo,
            RenameOptions::new().with_overloads(true),
            CancellationToken::new(),
        );
        let result = search.wait().unwrap();

        assert_eq!(
            rendered(&result.sorted_locations()),
            vec!["DocA:10-13", "DocA:20-23", "DocB:5-8"]
        );
        assert!(result.referenced_symbols.contains(&backend.lookup(2)));
        assert!(result.referenced_symbols.contains(&backend.lookup(1)));
        assert!(result.is_complete());
        assert_eq!(backend.search_calls(1), 1);
        assert_eq!(backend.search_calls(2), 1);
    }

    /// Without the overloads flag, the overload is never searched.
    #[test]
    fn test_base_only_search_skips_overloads() {
        let backend = Arc::new(foo_backend());
        let finder = finder(&backend);

        let search = finder.find_all(backend.lookup(1), RenameOptions::new(), CancellationToken::new());
        let result = search.wait().unwrap();

        assert_eq!(rendered(&result.sorted_locations()), vec!["DocA:10-13", "DocB:5-8"]);
        assert_eq!(result.referenced_symbols.len(), 1);
        assert_eq!(backend.search_calls(2), 0);
    }

    /// Duplicate references and overlapping text hits collapse to one record.
    #[test]
    fn test_duplicate_locations_are_deduplicated() {
        let backend = Arc::new(
            foo_backend()
                .reference(1, "DocB", 5, 8)
                .reference(1, "DocB", 5, 8)
                .comment("DocB", 5, 8),
        );
        let finder = finder(&backend);

        let search = finder.find_all(
            backend.lookup(1),
            RenameOptions::new().with_comments(true),
            CancellationToken::new(),
        );
        let result = search.wait().unwrap();

        let in_doc_b = result
            .locations
            .iter()
            .filter(|l| l.document == DocumentId::new("DocB"))
            .count();
        assert_eq!(in_doc_b, 1);
    }

    /// Repeated waits observe the one published result.
    #[test]
    fn test_finalization_publishes_once() {
        let backend = Arc::new(foo_backend());
        let finder = finder(&backend);
        let search = finder.find_all(backend.lookup(1), RenameOptions::new(), CancellationToken::new());

        let first = search.wait().unwrap();
        let second = search.wait().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(search.progress().finalized);
    }

    /// After the whole result resolves, document queries resolve immediately.
    #[test]
    fn test_document_locations_resolve_immediately_after_finalization() {
        let backend = Arc::new(foo_backend());
        let finder = finder(&backend);
        let search = finder.find_all(
            backend.lookup(1),
            RenameOptions::new().with_overloads(true),
            CancellationToken::new(),
        );
        search.wait().unwrap();

        let doc_a = search
            .document_locations(&DocumentId::new("DocA"))
            .try_get()
            .expect("document promise should already be resolved")
            .unwrap();
        assert_eq!(rendered(&doc_a.sorted_locations()), vec!["DocA:10-13", "DocA:20-23"]);
        assert!(doc_a.referenced_symbols.contains(&backend.lookup(2)));
    }

    /// A document the search never visited yields an empty result.
    #[test]
    fn test_unvisited_document_is_empty() {
        let backend = Arc::new(foo_backend());
        let finder = finder(&backend);
        let search = finder.find_all(backend.lookup(1), RenameOptions::new(), CancellationToken::new());

        let missing = search
            .document_locations(&DocumentId::new("DocZ"))
            .wait()
            .unwrap();
        assert!(missing.locations.is_empty());
        assert!(missing.implicit_locations.is_empty());
    }

    /// A document promise taken before completion resolves on finalization.
    #[test]
    fn test_document_promise_requested_early_resolves_later() {
        let (backend, gate) = foo_backend().gated(1);
        let backend = Arc::new(backend);
        let finder = finder(&backend);
        let search = finder.find_all(backend.lookup(1), RenameOptions::new(), CancellationToken::new());

        let doc_b = search.document_locations(&DocumentId::new("DocB"));
        assert!(doc_b.wait_timeout(Duration::from_millis(20)).is_none());

        gate.open();
        let doc_b = doc_b.wait().unwrap();
        assert_eq!(rendered(&doc_b.sorted_locations()), vec!["DocB:5-8"]);
    }

    /// Implicit references are tracked apart from editable locations.
    #[test]
    fn test_implicit_references_are_separate() {
        let backend = Arc::new(foo_backend().implicit_reference(1, "DocC", 40, 40));
        let finder = finder(&backend);
        let search = finder.find_all(backend.lookup(1), RenameOptions::new(), CancellationToken::new());
        let result = search.wait().unwrap();

        assert_eq!(rendered(&result.sorted_implicit_locations()), vec!["DocC:40-40"]);
        assert!(!result.touches(&DocumentId::new("DocC")));
    }

    /// A symbol outside any type has no overloads to search.
    #[test]
    fn test_overloads_of_free_symbol_complete_empty() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .symbol(Symbol::new(5, "count", SymbolKind::Local))
                .definition(5, "DocA", 1, 6)
                .reference(5, "DocA", 30, 35),
        );
        let finder = finder(&backend);
        let search = finder.find_all(
            backend.lookup(5),
            RenameOptions::new().with_overloads(true),
            CancellationToken::new(),
        );
        let result = search.wait().unwrap();

        assert_eq!(rendered(&result.sorted_locations()), vec!["DocA:1-6", "DocA:30-35"]);
        assert_eq!(search.progress().total, 1);
        assert!(result.referenced_symbols.iter().all(|s| s.id == SymbolId(5)));
    }

    /// The serializable report is ordered.
    #[test]
    fn test_report_is_sorted() {
        let backend = Arc::new(foo_backend());
        let finder = finder(&backend);
        let search = finder.find_all(
            backend.lookup(1),
            RenameOptions::new().with_overloads(true),
            CancellationToken::new(),
        );
        let report = search.wait().unwrap().report();

        let ids: Vec<u64> = report.referenced_symbols.iter().map(|s| s.id.0).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(rendered(&report.locations), vec!["DocA:10-13", "DocA:20-23", "DocB:5-8"]);
        assert!(report.options.rename_overloads);
    }
}
