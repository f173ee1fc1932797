//! The shared, lock-guarded vocabulary index.
//!
//! One non-reentrant `RwLock` covers all state. Public methods take the lock
//! exactly once and then work through the unlocked helpers on
//! [`IndexTables`], so composite operations never re-enter it.

use crate::config::VocabConfig;
use crate::error::Result;
use crate::index::{
    DocumentInfo, GlobalStats, IndexMetadata, IndexTables, QueryExpansionResult, TermCategory,
    TermInfo, UpdateResult, VocabularyReport,
};
use crate::ingest::{FileOutcome, Ingestor};
use crate::persist::{load_snapshot, save_snapshot, IndexPaths};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};
use time::OffsetDateTime;

struct Inner {
    tables: IndexTables,
    config: VocabConfig,
    ingestor: Ingestor,
    paths: IndexPaths,
}

impl Inner {
    fn new(tables: IndexTables, config: VocabConfig) -> Self {
        Self {
            ingestor: Ingestor::new(&config),
            paths: IndexPaths::new(&config.index_file),
            tables,
            config,
        }
    }

    fn recompute(&mut self) {
        self.tables.update_global_stats();
        self.tables.calculate_weights();
    }

    fn refresh_index_size(&mut self) {
        self.tables.global_stats.index_size =
            fs::metadata(self.paths.index()).map(|m| m.len()).unwrap_or(0);
    }

    fn save(&mut self) -> Result<()> {
        save_snapshot(&self.paths, &self.tables)?;
        self.refresh_index_size();
        Ok(())
    }

    /// Ingest each path, collecting per-file failures instead of aborting.
    /// Returns the paths that were processed successfully.
    fn ingest_all<P: AsRef<Path>>(&mut self, paths: &[P], result: &mut UpdateResult) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        for path in paths {
            let Some(key) = path_key(path.as_ref()) else {
                tracing::debug!(path = %path.as_ref().display(), "skipping non-UTF-8 path");
                continue;
            };
            match self.ingestor.process_file(&mut self.tables, &key) {
                Ok(outcome) => {
                    match outcome {
                        FileOutcome::Added => result.added_files += 1,
                        FileOutcome::Updated => result.updated_files += 1,
                        FileOutcome::Unchanged | FileOutcome::Skipped => {}
                    }
                    seen.insert(key);
                }
                Err(err) => {
                    tracing::debug!(path = %key, %err, "failed to process file");
                    result.errors.push(format!("error processing {key}: {err}"));
                }
            }
        }
        seen
    }

    fn vocabulary(&self) -> BTreeSet<String> {
        self.tables.term_to_docs.keys().cloned().collect()
    }
}

/// Documents are keyed by their path as UTF-8; other paths are not indexed.
fn path_key(path: &Path) -> Option<String> {
    path.to_str().map(str::to_owned)
}

fn count_term_changes(before: &BTreeSet<String>, after: &BTreeSet<String>, result: &mut UpdateResult) {
    result.new_terms = after.difference(before).count();
    result.removed_terms = before.difference(after).count();
}

pub struct VocabularyIndex {
    inner: RwLock<Inner>,
}

impl VocabularyIndex {
    /// An empty index that will persist to `config.index_file`.
    pub fn new(config: VocabConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { inner: RwLock::new(Inner::new(IndexTables::new(), config)) })
    }

    /// Load the index at `config.index_file`, or start empty if there is none.
    ///
    /// The supplied config replaces whatever was in effect when the snapshot was
    /// written, and weights and statistics are recomputed rather than trusted.
    pub fn load(config: VocabConfig) -> Result<Self> {
        config.validate()?;
        let paths = IndexPaths::new(&config.index_file);
        let Some(tables) = load_snapshot(&paths)? else {
            tracing::debug!(path = %config.index_file.display(), "no index on disk, starting empty");
            return Self::new(config);
        };
        let mut inner = Inner::new(tables, config);
        inner.recompute();
        inner.refresh_index_size();
        tracing::info!(
            documents = inner.tables.global_stats.total_documents,
            terms = inner.tables.global_stats.unique_terms,
            "loaded vocabulary index"
        );
        Ok(Self { inner: RwLock::new(inner) })
    }

    pub fn config(&self) -> VocabConfig {
        self.inner.read().config.clone()
    }

    pub fn save(&self) -> Result<()> {
        self.inner.write().save()
    }

    /// Rebuild from scratch over `paths`, then save.
    pub fn build_index<P: AsRef<Path>>(&self, paths: &[P]) -> Result<UpdateResult> {
        let start = Instant::now();
        let mut result = UpdateResult::default();
        let mut inner = self.inner.write();
        tracing::info!(files = paths.len(), "building vocabulary index");

        let before = inner.vocabulary();
        inner.tables.clear();
        inner.ingest_all(paths, &mut result);
        count_term_changes(&before, &inner.vocabulary(), &mut result);

        let now = OffsetDateTime::now_utc();
        let meta = &mut inner.tables.metadata;
        meta.last_update = now;
        meta.total_updates += 1;
        meta.last_build_files = paths.len();
        meta.build_duration = start.elapsed();
        inner.recompute();
        result.duration = start.elapsed();

        inner.save()?;
        log_result("build", &result);
        Ok(result)
    }

    /// Reconcile the index with `paths`: add new files, re-ingest changed ones,
    /// and drop known documents whose files no longer exist. Weights are
    /// recomputed once for the whole batch, then the index is saved.
    pub fn incremental_update<P: AsRef<Path>>(&self, paths: &[P]) -> Result<UpdateResult> {
        let start = Instant::now();
        let mut result = UpdateResult::default();
        let mut inner = self.inner.write();
        tracing::info!(files = paths.len(), "starting incremental update");

        let before = inner.vocabulary();
        let known: BTreeSet<String> = inner.tables.doc_to_terms.keys().cloned().collect();
        let seen = inner.ingest_all(paths, &mut result);

        for path in known.difference(&seen) {
            let gone = matches!(fs::metadata(path), Err(e) if e.kind() == io::ErrorKind::NotFound);
            if gone && inner.tables.remove_document(path).is_some() {
                tracing::debug!(path = %path, "removed deleted document");
                result.deleted_files += 1;
            }
        }
        count_term_changes(&before, &inner.vocabulary(), &mut result);

        let meta = &mut inner.tables.metadata;
        meta.last_update = OffsetDateTime::now_utc();
        meta.total_updates += 1;
        inner.recompute();
        result.duration = start.elapsed();

        inner.save()?;
        log_result("incremental update", &result);
        Ok(result)
    }

    /// Ingest a single file without recomputing weights or saving.
    pub fn process_file<P: AsRef<Path>>(&self, path: P) -> Result<FileOutcome> {
        let Some(key) = path_key(path.as_ref()) else {
            tracing::debug!(path = %path.as_ref().display(), "skipping non-UTF-8 path");
            return Ok(FileOutcome::Skipped);
        };
        let mut inner = self.inner.write();
        let inner = &mut *inner;
        inner.ingestor.process_file(&mut inner.tables, &key)
    }

    /// Drop a document without recomputing weights or saving.
    pub fn remove_document<P: AsRef<Path>>(&self, path: P) -> bool {
        let Some(key) = path_key(path.as_ref()) else {
            return false;
        };
        self.inner.write().tables.remove_document(&key).is_some()
    }

    /// Recompute statistics and weights after `process_file`/`remove_document` calls.
    pub fn refresh_statistics(&self) {
        self.inner.write().recompute();
    }

    /// Prune terms not seen within `max_age` that occur in at most two documents.
    ///
    /// When something was removed the index is saved; a save failure is
    /// returned even though the in-memory pruning has already happened.
    pub fn cleanup_old_terms(&self, max_age: Duration) -> Result<usize> {
        let mut inner = self.inner.write();
        let Some(cutoff) = time::Duration::try_from(max_age)
            .ok()
            .and_then(|age| OffsetDateTime::now_utc().checked_sub(age))
        else {
            return Ok(0);
        };

        let removed = inner.tables.prune_terms_older_than(cutoff);
        if removed > 0 {
            inner.recompute();
            inner.save()?;
        }
        tracing::info!(removed, "cleaned up old terms");
        Ok(removed)
    }

    /// Recompute weights and cap per-term growth, then save.
    pub fn optimize_index(&self) -> Result<()> {
        let mut inner = self.inner.write();
        tracing::info!("optimizing vocabulary index");
        inner.recompute();
        let (max_positions, max_docs) = (inner.config.max_positions, inner.config.max_docs_per_term);
        if inner.tables.bound_growth(max_positions, max_docs) {
            tracing::debug!(max_positions, max_docs, "trimmed oversized postings");
        }
        inner.tables.metadata.last_update = OffsetDateTime::now_utc();
        inner.recompute();
        inner.save()
    }

    pub fn get_stats(&self) -> GlobalStats {
        self.inner.read().tables.global_stats.clone()
    }

    pub fn metadata(&self) -> IndexMetadata {
        self.inner.read().tables.metadata.clone()
    }

    /// Highest-weighted terms, optionally restricted to one category.
    pub fn get_top_terms(&self, limit: usize, category: Option<TermCategory>) -> Vec<TermInfo> {
        let inner = self.inner.read();
        let mut terms: Vec<&TermInfo> = inner
            .tables
            .term_to_docs
            .values()
            .filter(|t| category.map_or(true, |c| t.category == c))
            .collect();
        terms.sort_by(|a, b| b.weight.total_cmp(&a.weight).then_with(|| a.term.cmp(&b.term)));
        terms.into_iter().take(limit).cloned().collect()
    }

    pub fn get_document_terms(&self, path: &str) -> Option<DocumentInfo> {
        self.inner.read().tables.doc_to_terms.get(path).cloned()
    }

    pub fn get_term_info(&self, term: &str) -> Option<TermInfo> {
        self.inner.read().tables.term_to_docs.get(term).cloned()
    }

    pub fn get_documents_containing_term(&self, term: &str) -> Vec<String> {
        self.inner
            .read()
            .tables
            .term_to_docs
            .get(term)
            .map(|t| t.documents.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Paths of every indexed document.
    pub fn document_paths(&self) -> Vec<String> {
        self.inner.read().tables.doc_to_terms.keys().cloned().collect()
    }

    pub fn find_similar_terms(&self, term: &str, limit: usize) -> Vec<String> {
        self.find_similar_terms_with_scores(term, limit).into_iter().map(|(t, _)| t).collect()
    }

    pub fn find_similar_terms_with_scores(&self, term: &str, limit: usize) -> Vec<(String, f64)> {
        self.inner.read().tables.similar_terms(term, limit)
    }

    /// Expand `query` with co-occurring terms; `max_expansions == 0` means 20.
    pub fn expand_query(&self, query: &str, max_expansions: usize) -> QueryExpansionResult {
        let inner = self.inner.read();
        inner.tables.expand_query(inner.ingestor.tokenizer(), query, max_expansions)
    }

    pub fn search_terms(&self, query: &str, limit: usize) -> Vec<TermInfo> {
        let inner = self.inner.read();
        inner.tables.search_terms(inner.ingestor.tokenizer(), query, limit)
    }

    pub fn document_similarity(&self, a: &str, b: &str) -> f64 {
        self.inner.read().tables.document_similarity(a, b)
    }

    /// `(total_freq, document_freq, weight)` for a known term.
    pub fn term_frequency(&self, term: &str) -> Option<(usize, usize, f64)> {
        self.inner
            .read()
            .tables
            .term_to_docs
            .get(term)
            .map(|t| (t.total_freq, t.document_freq, t.weight))
    }

    pub fn should_process_file<P: AsRef<Path>>(&self, path: P) -> bool {
        self.inner.read().ingestor.should_process_file(path.as_ref())
    }

    pub fn vocabulary_report(&self) -> VocabularyReport {
        let inner = self.inner.read();
        let mut category_counts: BTreeMap<TermCategory, usize> = BTreeMap::new();
        for info in inner.tables.term_to_docs.values() {
            *category_counts.entry(info.category).or_insert(0) += 1;
        }
        let mut language_counts: BTreeMap<String, usize> = BTreeMap::new();
        for doc in inner.tables.doc_to_terms.values() {
            *language_counts.entry(doc.language.clone()).or_insert(0) += 1;
        }
        VocabularyReport {
            global_stats: inner.tables.global_stats.clone(),
            metadata: inner.tables.metadata.clone(),
            category_counts,
            language_counts,
        }
    }
}

fn log_result(action: &str, result: &UpdateResult) {
    tracing::info!(
        action,
        added = result.added_files,
        updated = result.updated_files,
        deleted = result.deleted_files,
        new_terms = result.new_terms,
        removed_terms = result.removed_terms,
        errors = result.errors.len(),
        took_ms = result.duration.as_millis() as u64,
        "vocabulary batch complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_config() {
        let mut config = VocabConfig::in_dir("/tmp/vocab-invalid");
        config.max_positions = 0;
        assert!(VocabularyIndex::new(config.clone()).is_err());
        assert!(VocabularyIndex::load(config).is_err());
    }

    #[test]
    fn reads_do_not_deadlock_inside_expansion() {
        let dir = tempfile::tempdir().unwrap();
        let index = VocabularyIndex::new(VocabConfig::in_dir(dir.path())).unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "socket listener socket").unwrap();
        index.process_file(&file).unwrap();
        index.refresh_statistics();

        let result = index.expand_query("socket", 5);
        assert_eq!(result.expanded_terms, vec!["listener"]);
        assert_eq!(index.find_similar_terms("socket", 5), vec!["listener"]);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_paths_are_skipped_not_reported() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let index = VocabularyIndex::new(VocabConfig::in_dir(dir.path().join("data"))).unwrap();
        let odd = dir.path().join(OsStr::from_bytes(b"caf\xe9.txt"));
        let plain = dir.path().join("plain.txt");
        fs::write(&plain, "socket listener").unwrap();

        let result = index.build_index(&[odd.clone(), plain]).unwrap();
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.added_files, 1);
        assert_eq!(index.process_file(&odd).unwrap(), FileOutcome::Skipped);
        assert!(!index.remove_document(&odd));
    }

    #[test]
    fn cleanup_with_unrepresentable_age_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let index = VocabularyIndex::new(VocabConfig::in_dir(dir.path())).unwrap();
        assert_eq!(index.cleanup_old_terms(Duration::MAX).unwrap(), 0);
    }
}
