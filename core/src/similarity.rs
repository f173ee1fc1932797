//! Term-to-term similarity and query expansion over the tables.

use crate::index::{IndexTables, QueryExpansionResult, TermCategory, TermInfo, WeightedTerm};
use crate::tokenizer::Tokenizer;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Similar terms fetched per query term during expansion.
pub const SIMILAR_PER_TERM: usize = 5;
/// Sample terms kept per non-general category in `QueryExpansionResult::category_terms`.
pub const CATEGORY_SAMPLE: usize = 10;
pub const DEFAULT_MAX_EXPANSIONS: usize = 20;

fn by_score_desc(a: &(String, f64), b: &(String, f64)) -> std::cmp::Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

impl IndexTables {
    /// Jaccard similarity of document sets, highest first.
    ///
    /// Only terms sharing at least one document with `term` are visited, found
    /// through the forward index of the documents `term` occurs in.
    pub fn similar_terms(&self, term: &str, limit: usize) -> Vec<(String, f64)> {
        let Some(info) = self.term_to_docs.get(term) else {
            return Vec::new();
        };

        let mut shared: HashMap<&str, usize> = HashMap::new();
        for path in info.documents.keys() {
            let Some(doc) = self.doc_to_terms.get(path) else {
                continue;
            };
            for other in doc.term_freqs.keys() {
                if other == term {
                    continue;
                }
                let co_occurs = self
                    .term_to_docs
                    .get(other)
                    .is_some_and(|o| o.documents.contains_key(path));
                if co_occurs {
                    *shared.entry(other.as_str()).or_insert(0) += 1;
                }
            }
        }

        let mut scored: Vec<(String, f64)> = shared
            .into_iter()
            .filter_map(|(other, intersection)| {
                let other_docs = self.term_to_docs.get(other)?.documents.len();
                let union = info.documents.len() + other_docs - intersection;
                (union > 0).then(|| (other.to_string(), intersection as f64 / union as f64))
            })
            .collect();
        scored.sort_by(by_score_desc);
        scored.truncate(limit);
        scored
    }

    pub fn expand_query(
        &self,
        tokenizer: &Tokenizer,
        query: &str,
        max_expansions: usize,
    ) -> QueryExpansionResult {
        let mut result = QueryExpansionResult {
            original_terms: tokenizer.terms(query),
            ..Default::default()
        };

        let mut seen: BTreeSet<String> = result.original_terms.iter().cloned().collect();
        for term in &result.original_terms {
            let similar: Vec<String> = self
                .similar_terms(term, SIMILAR_PER_TERM)
                .into_iter()
                .map(|(t, _)| t)
                .collect();
            if similar.is_empty() {
                continue;
            }
            for candidate in &similar {
                if seen.insert(candidate.clone()) {
                    result.expanded_terms.push(candidate.clone());
                }
            }
            result.similar_terms.insert(term.clone(), similar);
        }

        let mut buckets: BTreeMap<TermCategory, Vec<String>> = BTreeMap::new();
        for (term, info) in &self.term_to_docs {
            if info.category == TermCategory::General {
                continue;
            }
            let bucket = buckets.entry(info.category).or_default();
            if bucket.len() < CATEGORY_SAMPLE {
                bucket.push(term.clone());
            }
        }
        result.category_terms = buckets;

        let mut weighted: Vec<(String, f64)> = seen
            .into_iter()
            .filter_map(|t| {
                let weight = self.term_to_docs.get(&t)?.weight;
                Some((t, weight))
            })
            .collect();
        weighted.sort_by(by_score_desc);
        let limit = if max_expansions == 0 { DEFAULT_MAX_EXPANSIONS } else { max_expansions };
        result.weighted_terms = weighted
            .into_iter()
            .take(limit)
            .map(|(term, weight)| WeightedTerm { term, weight })
            .collect();
        result
    }

    /// Exact and prefix matches for each query term, by weight.
    pub fn search_terms(&self, tokenizer: &Tokenizer, query: &str, limit: usize) -> Vec<TermInfo> {
        let mut found: BTreeMap<&str, &TermInfo> = BTreeMap::new();
        for prefix in tokenizer.terms(query) {
            let matches = self
                .term_to_docs
                .range(prefix.clone()..)
                .take_while(|(term, _)| term.starts_with(prefix.as_str()));
            for (term, info) in matches {
                found.insert(term.as_str(), info);
            }
        }
        let mut terms: Vec<TermInfo> = found.into_values().cloned().collect();
        terms.sort_by(|a, b| b.weight.total_cmp(&a.weight).then_with(|| a.term.cmp(&b.term)));
        terms.truncate(limit);
        terms
    }

    /// Jaccard similarity of two documents' term sets; 0 if either is unknown.
    pub fn document_similarity(&self, a: &str, b: &str) -> f64 {
        let (Some(a), Some(b)) = (self.doc_to_terms.get(a), self.doc_to_terms.get(b)) else {
            return 0.0;
        };
        let intersection = a.term_freqs.keys().filter(|t| b.term_freqs.contains_key(*t)).count();
        let union = a.term_freqs.len() + b.term_freqs.len() - intersection;
        if union == 0 {
            return 0.0;
        }
        intersection as f64 / union as f64
    }
}
