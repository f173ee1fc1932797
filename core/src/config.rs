use crate::error::{Result, VocabError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the default data directory.
pub const DATA_DIR_ENV: &str = "VOCAB_DATA_DIR";

const INDEX_FILE_NAME: &str = "vocabulary.idx";

const DEFAULT_STOP_WORDS: &[&str] = &[
    "the", "and", "are", "was", "were", "been", "being", "has", "had", "have", "that", "this",
    "these", "those", "with", "from", "into", "than", "then", "there", "their", "they", "them",
    "which", "who", "whom", "what", "when", "where", "why", "how", "its", "our", "your", "you",
    "but", "nor", "not", "any", "all", "can", "could", "would", "should", "will", "shall",
];

/// Settings consumed by the vocabulary engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabConfig {
    pub data_dir: PathBuf,
    pub index_file: PathBuf,

    pub min_term_length: usize,
    pub max_term_length: usize,
    pub stop_words: Vec<String>,

    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,

    /// Per-term cap on the number of documents kept by `optimize_index`.
    pub max_docs_per_term: usize,
    /// Per term/document cap on recorded token offsets.
    pub max_positions: usize,
}

impl Default for VocabConfig {
    fn default() -> Self {
        Self::in_dir(default_data_dir())
    }
}

impl VocabConfig {
    /// Default settings with storage rooted at `dir`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let data_dir = dir.as_ref().to_path_buf();
        Self {
            index_file: data_dir.join(INDEX_FILE_NAME),
            data_dir,
            min_term_length: 2,
            max_term_length: 50,
            stop_words: DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            include_patterns: [
                "*.go", "*.rs", "*.js", "*.ts", "*.py", "*.java", "*.cpp", "*.c", "*.h", "*.hpp",
                "*.cs", "*.php", "*.md", "*.txt", "*.json", "*.yaml", "*.yml",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            exclude_patterns: [
                "*.log", "*.tmp", "*.lock", "*.bak", ".git/*", "node_modules/*", "vendor/*",
                "target/*",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            max_docs_per_term: 10_000,
            max_positions: 100,
        }
    }

    /// Read a JSON config file; missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| VocabError::io(path, e))?;
        let config: VocabConfig = serde_json::from_str(&raw)
            .map_err(|e| VocabError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.index_file.as_os_str().is_empty() {
            return Err(VocabError::Config("index_file must not be empty".into()));
        }
        if self.min_term_length == 0 {
            return Err(VocabError::Config("min_term_length must be at least 1".into()));
        }
        if self.max_term_length < self.min_term_length {
            return Err(VocabError::Config(format!(
                "max_term_length ({}) is smaller than min_term_length ({})",
                self.max_term_length, self.min_term_length
            )));
        }
        if self.max_positions == 0 {
            return Err(VocabError::Config("max_positions must be positive".into()));
        }
        if self.max_docs_per_term == 0 {
            return Err(VocabError::Config("max_docs_per_term must be positive".into()));
        }
        Ok(())
    }
}

fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".vocab-index")
}
