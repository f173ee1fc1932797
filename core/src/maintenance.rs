use crate::index::IndexTables;
use time::OffsetDateTime;

/// Terms found in more than this many documents survive age-based pruning.
pub const PRUNE_MAX_DOCUMENT_FREQ: usize = 2;

impl IndexTables {
    /// Remove rarely used terms last seen before `cutoff`, cascading into every
    /// document that referenced them. Returns the number of terms removed.
    pub fn prune_terms_older_than(&mut self, cutoff: OffsetDateTime) -> usize {
        let stale: Vec<String> = self
            .term_to_docs
            .values()
            .filter(|t| t.last_seen < cutoff && t.document_freq <= PRUNE_MAX_DOCUMENT_FREQ)
            .map(|t| t.term.clone())
            .collect();

        for term in &stale {
            let Some(info) = self.term_to_docs.remove(term) else {
                continue;
            };
            for path in info.documents.keys() {
                self.forget_term_in_document(path, term);
            }
        }
        stale.len()
    }

    /// Cap positions per term/document at `max_positions` and documents per term at
    /// `max_docs_per_term`, keeping the documents with the highest frequency.
    /// Returns true if anything was dropped.
    pub fn bound_growth(&mut self, max_positions: usize, max_docs_per_term: usize) -> bool {
        let mut changed = false;
        let mut dropped: Vec<(String, String)> = Vec::new();

        for info in self.term_to_docs.values_mut() {
            for positions in info.positions.values_mut() {
                if positions.len() > max_positions {
                    positions.truncate(max_positions);
                    changed = true;
                }
            }

            if info.documents.len() > max_docs_per_term {
                let mut ranked: Vec<(String, usize)> =
                    info.documents.iter().map(|(d, &f)| (d.clone(), f)).collect();
                ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                for (path, _) in ranked.split_off(max_docs_per_term) {
                    info.documents.remove(&path);
                    info.positions.remove(&path);
                    dropped.push((path, info.term.clone()));
                }
                info.document_freq = info.documents.len();
                info.total_freq = info.documents.values().sum();
                changed = true;
            }
        }

        for (path, term) in &dropped {
            self.forget_term_in_document(path, term);
        }

        for doc in self.doc_to_terms.values_mut() {
            for positions in doc.term_positions.values_mut() {
                if positions.len() > max_positions {
                    positions.truncate(max_positions);
                    changed = true;
                }
            }
        }
        changed
    }

    fn forget_term_in_document(&mut self, path: &str, term: &str) {
        if let Some(doc) = self.doc_to_terms.get_mut(path) {
            doc.term_freqs.remove(term);
            doc.term_positions.remove(term);
            doc.unique_terms = doc.term_freqs.len();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::tests::{doc, tables_with};
    use time::Duration;

    #[test]
    fn prunes_only_old_and_rare_terms() {
        let mut tables = tables_with(vec![
            doc("a", &[("common", &[0]), ("rare", &[1])]),
            doc("b", &[("common", &[0])]),
            doc("c", &[("common", &[0])]),
        ]);
        let old = OffsetDateTime::now_utc() - Duration::days(30);
        for info in tables.term_to_docs.values_mut() {
            info.last_seen = old;
        }

        let removed = tables.prune_terms_older_than(OffsetDateTime::now_utc() - Duration::days(1));
        assert_eq!(removed, 1);
        assert!(tables.term_to_docs.contains_key("common"));
        assert!(!tables.term_to_docs.contains_key("rare"));
        let a = &tables.doc_to_terms["a"];
        assert!(!a.term_freqs.contains_key("rare"));
        assert!(!a.term_positions.contains_key("rare"));
        assert_eq!(a.unique_terms, 1);
    }

    #[test]
    fn recent_terms_survive() {
        let mut tables = tables_with(vec![doc("a", &[("fresh", &[0])])]);
        let removed = tables.prune_terms_older_than(OffsetDateTime::now_utc() - Duration::days(1));
        assert_eq!(removed, 0);
    }

    #[test]
    fn bounds_documents_and_positions() {
        let mut tables = tables_with(vec![
            doc("a", &[("hot", &[0, 1, 2, 3])]),
            doc("b", &[("hot", &[0, 1])]),
            doc("c", &[("hot", &[0]), ("cold", &[1])]),
        ]);
        assert!(tables.bound_growth(3, 2));

        let hot = &tables.term_to_docs["hot"];
        assert_eq!(hot.documents.len(), 2);
        assert_eq!(hot.document_freq, 2);
        assert_eq!(hot.total_freq, 6);
        assert!(hot.documents.contains_key("a") && hot.documents.contains_key("b"));
        assert!(hot.positions.values().all(|p| p.len() <= 3));
        assert!(!tables.doc_to_terms["c"].term_freqs.contains_key("hot"));
        assert!(tables.doc_to_terms["a"].term_positions["hot"].len() <= 3);

        assert!(!tables.bound_growth(3, 2));
    }
}
