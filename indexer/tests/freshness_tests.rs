use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use vocab_core::VocabConfig;
use vocab_indexer::{discover_files, FreshnessAction, FreshnessPolicy, VocabularyManager};

fn project() -> (TempDir, VocabConfig) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("project");
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join(".git")).unwrap();
    fs::create_dir_all(root.join("target/debug")).unwrap();
    fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
    fs::write(root.join("src/main.rs"), "fn main() { let server = start_server(); }").unwrap();
    fs::write(root.join("src/config.go"), "package config\nfunc LoadServer() {}").unwrap();
    fs::write(root.join("README.md"), "Server documentation").unwrap();
    fs::write(root.join("logo.png"), "binary").unwrap();
    fs::write(root.join(".git/HEAD"), "ref: refs/heads/main").unwrap();
    fs::write(root.join("target/debug/out.rs"), "generated server").unwrap();
    fs::write(root.join("node_modules/pkg/index.js"), "module.exports = server").unwrap();
    let config = VocabConfig::in_dir(dir.path().join("data"));
    (dir, config)
}

fn root(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("project")
}

fn names(files: &[std::path::PathBuf], base: &Path) -> Vec<String> {
    files
        .iter()
        .map(|f| f.strip_prefix(base).unwrap().to_string_lossy().replace('\\', "/"))
        .collect()
}

#[test]
fn discovery_skips_hidden_and_build_dirs() {
    let (dir, _config) = project();
    let files = discover_files(&root(&dir)).unwrap();
    assert_eq!(names(&files, &root(&dir)), vec!["README.md", "src/config.go", "src/main.rs"]);
}

#[test]
fn empty_index_is_built() {
    let (dir, config) = project();
    let mut manager = VocabularyManager::new(config.clone(), root(&dir));

    let action = manager.ensure_vocabulary(FreshnessPolicy::default()).unwrap();
    match action {
        FreshnessAction::Built(result) => assert_eq!(result.added_files, 3),
        other => panic!("expected a build, got {other:?}"),
    }
    assert!(config.index_file.exists());
    let terms = manager.expand_query("server", 10).unwrap();
    assert_eq!(terms[0], "server");
}

#[test]
fn fresh_index_is_left_alone() {
    let (dir, config) = project();
    let mut manager = VocabularyManager::new(config.clone(), root(&dir));
    manager.ensure_vocabulary(FreshnessPolicy::default()).unwrap();

    let mut again = VocabularyManager::new(config, root(&dir));
    let action = again.ensure_vocabulary(FreshnessPolicy::default()).unwrap();
    assert_eq!(action, FreshnessAction::Unchanged);
    assert_eq!(again.builder().unwrap().index().get_stats().total_documents, 3);
}

#[test]
fn stale_index_is_updated() {
    let (dir, config) = project();
    let mut manager = VocabularyManager::new(config.clone(), root(&dir));
    manager.ensure_vocabulary(FreshnessPolicy::default()).unwrap();
    fs::remove_file(root(&dir).join("README.md")).unwrap();
    std::thread::sleep(Duration::from_millis(20));

    let policy = FreshnessPolicy { max_age: Some(Duration::from_millis(1)), ..Default::default() };
    let mut again = VocabularyManager::new(config, root(&dir));
    match again.ensure_vocabulary(policy).unwrap() {
        FreshnessAction::Updated(result) => assert_eq!(result.deleted_files, 1),
        other => panic!("expected an update, got {other:?}"),
    }
}

#[test]
fn disabled_policy_leaves_empty_index() {
    let (dir, config) = project();
    let policy = FreshnessPolicy { auto_build: false, auto_update: false, max_age: None };
    let mut manager = VocabularyManager::new(config.clone(), root(&dir));
    assert_eq!(manager.ensure_vocabulary(policy).unwrap(), FreshnessAction::Unchanged);
    assert_eq!(manager.builder().unwrap().index().get_stats().total_documents, 0);
    assert!(!config.index_file.exists());
}
