use crate::config::VocabConfig;
use crate::error::{Result, VocabError};
use crate::index::{DocumentInfo, IndexTables, TermCategory};
use crate::tokenizer::Tokenizer;
use regex::Regex;
use sha1::{Digest, Sha1};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::Path;
use time::OffsetDateTime;

/// What `process_file` did with a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Filtered out by include/exclude patterns.
    Skipped,
    Unchanged,
    Added,
    Updated,
}

/// One include/exclude pattern, compiled once.
#[derive(Debug, Clone)]
struct PathPattern {
    /// Set for `dir/*` patterns: matches any path containing `dir/`.
    dir: Option<String>,
    /// Set for patterns without a slash: matched against the file name.
    basename: Option<Regex>,
    full: Regex,
}

impl PathPattern {
    fn compile(pattern: &str) -> Option<Self> {
        if pattern.is_empty() {
            return None;
        }
        let pat = pattern.replace('\\', "/");
        let dir = pat.strip_suffix("/*").map(|d| format!("{d}/"));
        let full = glob_regex(&pat)?;
        let basename = if pat.contains('/') { None } else { Some(full.clone()) };
        Some(Self { dir, basename, full })
    }

    fn matches(&self, path: &str) -> bool {
        if let Some(dir) = &self.dir {
            if path.contains(dir.as_str()) {
                return true;
            }
        }
        if let Some(re) = &self.basename {
            let name = path.rsplit('/').next().unwrap_or(path);
            if re.is_match(name) {
                return true;
            }
        }
        self.full.is_match(path)
    }
}

fn glob_regex(pattern: &str) -> Option<Regex> {
    let rx = regex::escape(pattern)
        .replace(r"\*\*", ".*")
        .replace(r"\*", "[^/]*")
        .replace(r"\?", ".");
    match Regex::new(&format!("^{rx}$")) {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::warn!(pattern, %err, "ignoring unusable path pattern");
            None
        }
    }
}

/// Include/exclude filter over slash-normalized paths.
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: Vec<PathPattern>,
    exclude: Vec<PathPattern>,
}

impl PathFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Self {
        Self {
            include: include.iter().filter_map(|p| PathPattern::compile(p)).collect(),
            exclude: exclude.iter().filter_map(|p| PathPattern::compile(p)).collect(),
        }
    }

    pub fn allows(&self, path: &Path) -> bool {
        let p = path.to_string_lossy().replace('\\', "/");
        if !self.include.is_empty() && !self.include.iter().any(|pat| pat.matches(&p)) {
            return false;
        }
        !self.exclude.iter().any(|pat| pat.matches(&p))
    }
}

/// Reads files and folds them into the tables.
#[derive(Debug, Clone)]
pub struct Ingestor {
    tokenizer: Tokenizer,
    filter: PathFilter,
    max_positions: usize,
}

impl Ingestor {
    pub fn new(config: &VocabConfig) -> Self {
        Self {
            tokenizer: Tokenizer::new(config),
            filter: PathFilter::new(&config.include_patterns, &config.exclude_patterns),
            max_positions: config.max_positions,
        }
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn should_process_file(&self, path: &Path) -> bool {
        self.filter.allows(path)
    }

    /// Ingest one file. Unchanged content is a no-op; changed content replaces the
    /// previous entry wholesale. Never recomputes weights and never saves.
    pub fn process_file(&self, tables: &mut IndexTables, path: &str) -> Result<FileOutcome> {
        let fs_path = Path::new(path);
        if !self.should_process_file(fs_path) {
            tracing::debug!(path, "skipped by path filter");
            return Ok(FileOutcome::Skipped);
        }

        let meta = fs::metadata(fs_path).map_err(|e| VocabError::io(path, e))?;
        if !meta.is_file() {
            return Err(VocabError::io(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        let modified = meta.modified().map(OffsetDateTime::from).unwrap_or(OffsetDateTime::UNIX_EPOCH);
        let size = meta.len();

        if let Some(existing) = tables.doc_to_terms.get(path) {
            if existing.last_modified == modified && existing.size == size {
                return Ok(FileOutcome::Unchanged);
            }
        }

        let bytes = fs::read(fs_path).map_err(|e| VocabError::io(path, e))?;
        let file_hash = format!("{:x}", Sha1::digest(&bytes));

        let previous_hash = tables.doc_to_terms.get(path).map(|d| d.file_hash.clone());
        let outcome = match previous_hash {
            Some(hash) if hash == file_hash => {
                if let Some(existing) = tables.doc_to_terms.get_mut(path) {
                    existing.last_modified = modified;
                }
                return Ok(FileOutcome::Unchanged);
            }
            Some(_) => {
                tables.remove_document(path);
                FileOutcome::Updated
            }
            None => FileOutcome::Added,
        };

        let text = String::from_utf8_lossy(&bytes);
        let tokens = self.tokenizer.tokenize(&text);

        let mut term_freqs: BTreeMap<String, usize> = BTreeMap::new();
        let mut term_positions: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut categories: HashMap<String, TermCategory> = HashMap::new();
        for token in &tokens {
            *term_freqs.entry(token.term.clone()).or_insert(0) += 1;
            let positions = term_positions.entry(token.term.clone()).or_default();
            if positions.len() < self.max_positions {
                positions.push(token.position);
            }
            categories.entry(token.term.clone()).or_insert(token.category);
        }

        let doc = DocumentInfo {
            path: path.to_string(),
            file_hash,
            last_modified: modified,
            total_terms: tokens.len(),
            unique_terms: term_freqs.len(),
            term_freqs,
            term_positions,
            language: detect_language(fs_path).to_string(),
            file_type: fs_path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default(),
            size,
        };
        tracing::debug!(path, terms = doc.total_terms, unique = doc.unique_terms, ?outcome, "ingested");
        tables.insert_document(doc, &categories, OffsetDateTime::now_utc());
        Ok(outcome)
    }
}

pub fn detect_language(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "go" => "go",
        "rs" => "rust",
        "js" => "javascript",
        "ts" => "typescript",
        "py" => "python",
        "java" => "java",
        "cpp" | "hpp" => "cpp",
        "c" | "h" => "c",
        "cs" => "csharp",
        "php" => "php",
        "rb" => "ruby",
        "swift" => "swift",
        "kt" => "kotlin",
        "md" => "markdown",
        "txt" => "text",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(include: &[&str], exclude: &[&str]) -> PathFilter {
        let inc: Vec<String> = include.iter().map(|s| s.to_string()).collect();
        let exc: Vec<String> = exclude.iter().map(|s| s.to_string()).collect();
        PathFilter::new(&inc, &exc)
    }

    #[test]
    fn basename_recursive_and_dir_patterns() {
        assert!(filter(&["*.go"], &[]).allows(Path::new("/a/b/c.go")));
        assert!(filter(&["**/*.go"], &[]).allows(Path::new("/a/b/c.go")));
        assert!(!filter(&[], &["node_modules/*"]).allows(Path::new("/a/node_modules/x.js")));
    }

    #[test]
    fn include_then_exclude() {
        let f = filter(&["*.go"], &["**/vendor/**"]);
        assert!(f.allows(Path::new("/p/q/main.go")));
        assert!(!f.allows(Path::new("/p/q/main.js")));
        assert!(!f.allows(Path::new("/p/vendor/x.go")));
    }

    #[test]
    fn languages_by_extension() {
        assert_eq!(detect_language(Path::new("lib.RS")), "rust");
        assert_eq!(detect_language(Path::new("notes.md")), "markdown");
        assert_eq!(detect_language(Path::new("Makefile")), "unknown");
    }

    #[test]
    fn unchanged_file_is_noop_and_edit_replaces_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = VocabConfig::in_dir(dir.path());
        config.max_positions = 2;
        let ingestor = Ingestor::new(&config);
        let file = dir.path().join("notes.txt");
        fs::write(&file, "buffer parser buffer buffer").unwrap();
        let key = file.to_string_lossy().into_owned();

        let mut tables = IndexTables::new();
        assert_eq!(ingestor.process_file(&mut tables, &key).unwrap(), FileOutcome::Added);
        let doc = &tables.doc_to_terms[&key];
        assert_eq!(doc.term_freqs["buffer"], 3);
        assert_eq!(doc.term_positions["buffer"], vec![0, 2]);
        assert_eq!(ingestor.process_file(&mut tables, &key).unwrap(), FileOutcome::Unchanged);

        fs::write(&file, "lexer lexer tokens").unwrap();
        assert_eq!(ingestor.process_file(&mut tables, &key).unwrap(), FileOutcome::Updated);
        assert!(!tables.term_to_docs.contains_key("buffer"));
        assert_eq!(tables.term_to_docs["lexer"].total_freq, 2);
    }

    #[test]
    fn filtered_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let ingestor = Ingestor::new(&VocabConfig::in_dir(dir.path()));
        let mut tables = IndexTables::new();

        let log = dir.path().join("run.log");
        fs::write(&log, "noise").unwrap();
        let outcome = ingestor.process_file(&mut tables, &log.to_string_lossy()).unwrap();
        assert_eq!(outcome, FileOutcome::Skipped);

        let missing = dir.path().join("gone.txt");
        let err = ingestor.process_file(&mut tables, &missing.to_string_lossy()).unwrap_err();
        assert!(matches!(err, VocabError::Io { .. }));
        assert!(tables.doc_to_terms.is_empty());
    }
}
