//! Decides when the vocabulary needs a full build or an incremental update,
//! and which files under a project root feed it.

use crate::builder::VocabularyBuilder;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::OffsetDateTime;
use vocab_core::{UpdateResult, VocabConfig};
use walkdir::{DirEntry, WalkDir};

/// Build-artifact and dependency directories never worth indexing.
pub const SKIPPED_DIRS: &[&str] = &["node_modules", "vendor", "target", "dist", "build"];

pub const ALLOWED_EXTENSIONS: &[&str] = &[
    // code
    "go", "rs", "js", "ts", "py", "java", "cpp", "c", "h", "hpp", "cs", "php", "rb", "swift",
    "kt", "scala", "jsx", "tsx",
    // config and docs
    "md", "txt", "json", "yaml", "yml", "toml", "xml", "env", "ini", "cfg", "conf", "dockerfile",
];

#[derive(Debug, Clone, Copy)]
pub struct FreshnessPolicy {
    pub auto_build: bool,
    pub auto_update: bool,
    /// An index whose last update is older than this is refreshed.
    pub max_age: Option<Duration>,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self { auto_build: true, auto_update: true, max_age: Some(Duration::from_secs(24 * 3600)) }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FreshnessAction {
    Built(UpdateResult),
    Updated(UpdateResult),
    Unchanged,
}

pub struct VocabularyManager {
    config: VocabConfig,
    root: PathBuf,
    builder: Option<VocabularyBuilder>,
}

impl VocabularyManager {
    pub fn new<P: AsRef<Path>>(config: VocabConfig, root: P) -> Self {
        Self { config, root: root.as_ref().to_path_buf(), builder: None }
    }

    pub fn builder(&self) -> Option<&VocabularyBuilder> {
        self.builder.as_ref()
    }

    /// Make sure a usable vocabulary is loaded, building or updating it as the
    /// policy allows.
    pub fn ensure_vocabulary(&mut self, policy: FreshnessPolicy) -> Result<FreshnessAction> {
        let mut should_build = false;
        let mut should_update = false;

        match VocabularyBuilder::load(self.config.clone()) {
            Ok(builder) => {
                let stats = builder.index().get_stats();
                if let Some(max_age) = policy.max_age {
                    if is_stale(stats.last_updated, max_age) {
                        tracing::info!(last_updated = %stats.last_updated, "vocabulary is stale");
                        should_update = true;
                    }
                }
                if stats.total_documents == 0 {
                    tracing::info!("vocabulary is empty");
                    should_build = true;
                }
                self.builder = Some(builder);
            }
            Err(err) => {
                tracing::warn!(%err, "could not load vocabulary");
                should_build = true;
            }
        }

        if should_build && policy.auto_build {
            return self.build();
        }
        if should_update && policy.auto_update {
            return self.update();
        }
        if self.builder.is_none() {
            self.builder = Some(VocabularyBuilder::new(self.config.clone())?);
        }
        Ok(FreshnessAction::Unchanged)
    }

    fn build(&mut self) -> Result<FreshnessAction> {
        let builder = VocabularyBuilder::new(self.config.clone())?;
        let files = discover_files(&self.root)?;
        if files.is_empty() {
            tracing::info!(root = %self.root.display(), "no files to build vocabulary from");
            self.builder = Some(builder);
            return Ok(FreshnessAction::Unchanged);
        }
        tracing::info!(files = files.len(), "building vocabulary");
        let result = builder.build_from_files(&files).context("vocabulary build failed")?;
        self.builder = Some(builder);
        Ok(FreshnessAction::Built(result))
    }

    fn update(&mut self) -> Result<FreshnessAction> {
        let files = discover_files(&self.root)?;
        let builder = self.builder.as_ref().context("vocabulary builder not initialized")?;
        tracing::info!(files = files.len(), "updating vocabulary");
        let result = builder.update_from_files(&files).context("vocabulary update failed")?;
        Ok(FreshnessAction::Updated(result))
    }

    /// Original query terms followed by their expansions, without duplicates.
    pub fn expand_query(&self, query: &str, max_expansions: usize) -> Result<Vec<String>> {
        let builder = self.builder.as_ref().context("vocabulary not initialized")?;
        let result = builder.index().expand_query(query, max_expansions);
        let mut seen = BTreeSet::new();
        Ok(result
            .original_terms
            .into_iter()
            .chain(result.expanded_terms)
            .filter(|t| seen.insert(t.clone()))
            .collect())
    }
}

fn is_stale(last_updated: OffsetDateTime, max_age: Duration) -> bool {
    let age = OffsetDateTime::now_utc() - last_updated;
    time::Duration::try_from(max_age).map(|max| age > max).unwrap_or(false)
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.iter().any(|d| *d == name)
}

fn has_allowed_extension(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// Candidate files under `root`, skipping hidden and build directories.
pub fn discover_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root).sort_by_file_name().into_iter().filter_entry(|e| !is_skipped_dir(e));
    for entry in walker {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if entry.file_type().is_file() && has_allowed_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staleness_compares_against_max_age() {
        let hour = Duration::from_secs(3600);
        assert!(is_stale(OffsetDateTime::now_utc() - time::Duration::hours(2), hour));
        assert!(!is_stale(OffsetDateTime::now_utc(), hour));
        assert!(!is_stale(OffsetDateTime::UNIX_EPOCH, Duration::MAX));
    }

    #[test]
    fn extension_allow_list() {
        assert!(has_allowed_extension(Path::new("src/lib.RS")));
        assert!(has_allowed_extension(Path::new("Cargo.toml")));
        assert!(!has_allowed_extension(Path::new("logo.png")));
        assert!(!has_allowed_extension(Path::new("Makefile")));
    }
}
