use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use vocab_core::{UpdateResult, VocabConfig, VocabularyIndex};
use walkdir::WalkDir;

/// Drives the vocabulary index from directories or explicit file lists.
pub struct VocabularyBuilder {
    index: VocabularyIndex,
}

impl VocabularyBuilder {
    pub fn new(config: VocabConfig) -> Result<Self> {
        Ok(Self { index: VocabularyIndex::new(config)? })
    }

    /// Open the index persisted at `config.index_file`, or an empty one.
    pub fn load(config: VocabConfig) -> Result<Self> {
        let index = VocabularyIndex::load(config).context("failed to load vocabulary index")?;
        Ok(Self { index })
    }

    pub fn index(&self) -> &VocabularyIndex {
        &self.index
    }

    pub fn build_from_directory(&self, root: &Path, recursive: bool) -> Result<UpdateResult> {
        let files = self.collect_files(root, recursive)?;
        tracing::info!(files = files.len(), root = %root.display(), "building vocabulary from directory");
        Ok(self.index.build_index(&files)?)
    }

    pub fn build_from_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<UpdateResult> {
        Ok(self.index.build_index(paths)?)
    }

    pub fn update_from_directory(&self, root: &Path, recursive: bool) -> Result<UpdateResult> {
        let files = self.collect_files(root, recursive)?;
        tracing::info!(files = files.len(), root = %root.display(), "updating vocabulary from directory");
        Ok(self.index.incremental_update(&files)?)
    }

    pub fn update_from_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<UpdateResult> {
        Ok(self.index.incremental_update(paths)?)
    }

    /// Re-check every indexed document that still exists; vanished ones are dropped.
    pub fn refresh_known_documents(&self) -> Result<UpdateResult> {
        let existing: Vec<PathBuf> = self
            .index
            .document_paths()
            .into_iter()
            .map(PathBuf::from)
            .filter(|p| p.exists())
            .collect();
        Ok(self.index.incremental_update(&existing)?)
    }

    /// Files under `root` accepted by the index's include/exclude patterns.
    pub fn collect_files(&self, root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
        let mut walker = WalkDir::new(root).sort_by_file_name();
        if !recursive {
            walker = walker.max_depth(1);
        }
        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
            if entry.file_type().is_file() && self.index.should_process_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn builder(dir: &Path) -> VocabularyBuilder {
        VocabularyBuilder::new(VocabConfig::in_dir(dir.join("data"))).unwrap()
    }

    #[test]
    fn collects_only_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("tree");
        fs::create_dir_all(tree.join("nested")).unwrap();
        fs::write(tree.join("main.rs"), "fn main() {}").unwrap();
        fs::write(tree.join("debug.log"), "noise").unwrap();
        fs::write(tree.join("nested/lib.go"), "package lib").unwrap();

        let b = builder(dir.path());
        let flat = b.collect_files(&tree, false).unwrap();
        assert_eq!(flat, vec![tree.join("main.rs")]);
        let deep = b.collect_files(&tree, true).unwrap();
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn refresh_drops_vanished_documents() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("tree");
        fs::create_dir_all(&tree).unwrap();
        fs::write(tree.join("keep.md"), "keep this paragraph").unwrap();
        fs::write(tree.join("drop.md"), "drop this paragraph").unwrap();

        let b = builder(dir.path());
        b.build_from_directory(&tree, true).unwrap();
        fs::remove_file(tree.join("drop.md")).unwrap();

        let result = b.refresh_known_documents().unwrap();
        assert_eq!(result.deleted_files, 1);
        assert_eq!(b.index().get_stats().total_documents, 1);
    }
}
