use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;

pub const INDEX_VERSION: &str = "1.0.0";
pub const INDEXER_VERSION: &str = concat!("vocab-core/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermCategory {
    Keyword,
    Identifier,
    Concept,
    General,
}

impl TermCategory {
    pub const ALL: [TermCategory; 4] =
        [Self::Keyword, Self::Identifier, Self::Concept, Self::General];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Identifier => "identifier",
            Self::Concept => "concept",
            Self::General => "general",
        }
    }
}

impl fmt::Display for TermCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TermCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown term category: {s}"))
    }
}

/// Inverted-index entry for one term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermInfo {
    pub term: String,
    /// Number of documents containing the term; always `documents.len()`.
    pub document_freq: usize,
    pub total_freq: usize,
    /// Document path -> occurrences in that document.
    pub documents: BTreeMap<String, usize>,
    pub positions: BTreeMap<String, Vec<usize>>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_seen: OffsetDateTime,
    /// Derived; recomputed after every batch and on load.
    pub weight: f64,
    pub category: TermCategory,
}

/// Forward-index entry for one ingested file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub path: String,
    pub file_hash: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified: OffsetDateTime,
    pub total_terms: usize,
    pub unique_terms: usize,
    pub term_freqs: BTreeMap<String, usize>,
    pub term_positions: BTreeMap<String, Vec<usize>>,
    pub language: String,
    pub file_type: String,
    pub size: u64,
}

/// Corpus summary. Recomputed from the tables, never edited by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_documents: usize,
    pub total_terms: usize,
    pub unique_terms: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
    pub index_size: u64,
    pub avg_doc_length: f64,
}

impl Default for GlobalStats {
    fn default() -> Self {
        Self {
            total_documents: 0,
            total_terms: 0,
            unique_terms: 0,
            last_updated: OffsetDateTime::UNIX_EPOCH,
            index_size: 0,
            avg_doc_length: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub version: String,
    pub indexer_version: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Time of the last mutating batch. `GlobalStats::last_updated` mirrors it.
    #[serde(with = "time::serde::rfc3339")]
    pub last_update: OffsetDateTime,
    pub total_updates: u64,
    pub build_duration: Duration,
    pub last_build_files: usize,
}

impl IndexMetadata {
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            version: INDEX_VERSION.to_string(),
            indexer_version: INDEXER_VERSION.to_string(),
            created_at: now,
            last_update: OffsetDateTime::UNIX_EPOCH,
            total_updates: 0,
            build_duration: Duration::ZERO,
            last_build_files: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateResult {
    pub added_files: usize,
    pub updated_files: usize,
    pub deleted_files: usize,
    pub new_terms: usize,
    pub removed_terms: usize,
    pub errors: Vec<String>,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedTerm {
    pub term: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryExpansionResult {
    pub original_terms: Vec<String>,
    pub expanded_terms: Vec<String>,
    pub similar_terms: BTreeMap<String, Vec<String>>,
    pub category_terms: BTreeMap<TermCategory, Vec<String>>,
    /// Sorted by weight, highest first.
    pub weighted_terms: Vec<WeightedTerm>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VocabularyReport {
    pub global_stats: GlobalStats,
    pub metadata: IndexMetadata,
    pub category_counts: BTreeMap<TermCategory, usize>,
    pub language_counts: BTreeMap<String, usize>,
}

/// The serializable part of the index: both directions of the inverted index
/// plus the derived summary and bookkeeping metadata.
///
/// Methods here never lock; `VocabularyIndex` owns the lock and calls them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexTables {
    pub doc_to_terms: BTreeMap<String, DocumentInfo>,
    pub term_to_docs: BTreeMap<String, TermInfo>,
    pub global_stats: GlobalStats,
    pub metadata: IndexMetadata,
}

impl IndexTables {
    pub fn new() -> Self {
        Self {
            doc_to_terms: BTreeMap::new(),
            term_to_docs: BTreeMap::new(),
            global_stats: GlobalStats::default(),
            metadata: IndexMetadata::new(OffsetDateTime::now_utc()),
        }
    }

    /// Drop both tables, keeping metadata.
    pub fn clear(&mut self) {
        self.doc_to_terms.clear();
        self.term_to_docs.clear();
        self.global_stats = GlobalStats::default();
    }

    /// Register a freshly built document and fold its terms into the inverted index.
    /// Any previous entry for the same path must already have been removed.
    pub fn insert_document(
        &mut self,
        doc: DocumentInfo,
        categories: &HashMap<String, TermCategory>,
        now: OffsetDateTime,
    ) {
        for (term, &freq) in &doc.term_freqs {
            let positions = doc.term_positions.get(term).cloned().unwrap_or_default();
            match self.term_to_docs.entry(term.clone()) {
                Entry::Occupied(slot) => {
                    let info = slot.into_mut();
                    info.documents.insert(doc.path.clone(), freq);
                    info.positions.insert(doc.path.clone(), positions);
                    info.document_freq = info.documents.len();
                    info.total_freq += freq;
                    info.last_seen = now;
                }
                Entry::Vacant(slot) => {
                    slot.insert(TermInfo {
                        term: term.clone(),
                        document_freq: 1,
                        total_freq: freq,
                        documents: BTreeMap::from([(doc.path.clone(), freq)]),
                        positions: BTreeMap::from([(doc.path.clone(), positions)]),
                        last_seen: now,
                        weight: 0.0,
                        category: categories.get(term).copied().unwrap_or(TermCategory::General),
                    });
                }
            }
        }
        self.doc_to_terms.insert(doc.path.clone(), doc);
    }

    /// Remove a document and its contributions. Terms left without documents disappear.
    pub fn remove_document(&mut self, path: &str) -> Option<DocumentInfo> {
        let doc = self.doc_to_terms.remove(path)?;
        for term in doc.term_freqs.keys() {
            let Some(info) = self.term_to_docs.get_mut(term) else {
                continue;
            };
            if let Some(freq) = info.documents.remove(path) {
                info.total_freq = info.total_freq.saturating_sub(freq);
            }
            info.positions.remove(path);
            info.document_freq = info.documents.len();
            if info.documents.is_empty() {
                self.term_to_docs.remove(term);
            }
        }
        Some(doc)
    }
}

impl Default for IndexTables {
    fn default() -> Self {
        Self::new()
    }
}
