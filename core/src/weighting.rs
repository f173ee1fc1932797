//! Term weights and corpus statistics.
//!
//! Both passes are pure functions of the tables: running them twice without
//! an intervening mutation yields bit-identical results.

use crate::index::IndexTables;

/// Log-scaled term frequency times Laplace-smoothed inverse document frequency.
///
/// `tf = ln(1 + total_freq)`, `idf = ln((n + 1) / (df + 1)) + 1`. Finite for
/// every `n` and `df`, including an empty corpus, and never negative.
pub fn term_weight(total_freq: usize, document_freq: usize, total_documents: usize) -> f64 {
    let tf = (1.0 + total_freq as f64).ln();
    let idf = ((total_documents as f64 + 1.0) / (document_freq as f64 + 1.0)).ln() + 1.0;
    let weight = tf * idf;
    if weight.is_finite() {
        weight.max(0.0)
    } else {
        0.0
    }
}

impl IndexTables {
    /// Recount the summary from the tables alone. `index_size` is left as is;
    /// it tracks the snapshot on disk and is set on save and load.
    pub fn update_global_stats(&mut self) {
        let stats = &mut self.global_stats;
        stats.total_documents = self.doc_to_terms.len();
        stats.unique_terms = self.term_to_docs.len();
        stats.total_terms = self.doc_to_terms.values().map(|d| d.total_terms).sum();

        let total_size: u64 = self.doc_to_terms.values().map(|d| d.size).sum();
        stats.avg_doc_length = if stats.total_documents > 0 {
            total_size as f64 / stats.total_documents as f64
        } else {
            0.0
        };

        stats.last_updated = self.metadata.last_update;
    }

    /// Recompute every term weight against the current document count.
    pub fn calculate_weights(&mut self) {
        let total_documents = self.doc_to_terms.len();
        for info in self.term_to_docs.values_mut() {
            info.weight = term_weight(info.total_freq, info.document_freq, total_documents);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::tests::{doc, tables_with};

    #[test]
    fn weight_is_finite_for_degenerate_inputs() {
        for &(tf, df, n) in &[(0, 0, 0), (1, 0, 0), (0, 5, 0), (1, 1, 1), (10, 20, 3)] {
            let w = term_weight(tf, df, n);
            assert!(w.is_finite(), "tf={tf} df={df} n={n} gave {w}");
            assert!(w >= 0.0);
        }
        assert!(term_weight(usize::MAX, 1, usize::MAX).is_finite());
    }

    #[test]
    fn rarer_terms_weigh_more() {
        assert!(term_weight(3, 1, 10) > term_weight(3, 9, 10));
    }

    #[test]
    fn single_document_scenario_has_positive_weights() {
        let mut tables = tables_with(vec![doc("doc1", &[("a", &[0, 2]), ("b", &[1])])]);
        tables.update_global_stats();
        tables.calculate_weights();

        assert_eq!(tables.global_stats.total_documents, 1);
        assert_eq!(tables.global_stats.unique_terms, 2);
        for (term, info) in &tables.term_to_docs {
            assert!(info.weight.is_finite(), "{term} weight {}", info.weight);
            assert!(info.weight > 0.0, "{term} weight {}", info.weight);
        }
        assert!(tables.term_to_docs["a"].weight > tables.term_to_docs["b"].weight);
    }

    #[test]
    fn recomputation_is_idempotent() {
        let mut tables = tables_with(vec![
            doc("x", &[("alpha", &[0, 3]), ("beta", &[1])]),
            doc("y", &[("alpha", &[0]), ("gamma", &[1, 2])]),
        ]);
        tables.update_global_stats();
        tables.calculate_weights();
        let stats = tables.global_stats.clone();
        let weights: Vec<u64> = tables.term_to_docs.values().map(|t| t.weight.to_bits()).collect();

        tables.update_global_stats();
        tables.calculate_weights();
        assert_eq!(tables.global_stats, stats);
        let again: Vec<u64> = tables.term_to_docs.values().map(|t| t.weight.to_bits()).collect();
        assert_eq!(weights, again);
    }

    #[test]
    fn empty_tables_have_zeroed_stats() {
        let mut tables = IndexTables::new();
        tables.update_global_stats();
        tables.calculate_weights();
        assert_eq!(tables.global_stats.total_documents, 0);
        assert_eq!(tables.global_stats.avg_doc_length, 0.0);
    }

    #[test]
    fn stats_ignore_the_filesystem() {
        let mut tables = tables_with(vec![doc("x", &[("alpha", &[0])])]);
        tables.global_stats.index_size = 4096;
        tables.update_global_stats();
        assert_eq!(tables.global_stats.index_size, 4096);
        assert_eq!(tables.global_stats.total_documents, 1);
    }
}
