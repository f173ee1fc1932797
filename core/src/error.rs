use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, VocabError>;

#[derive(Debug, thiserror::Error)]
pub enum VocabError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode index: {0}")]
    Encode(String),

    #[error("index at {} is corrupt (binary: {binary}; json: {json})", path.display())]
    IndexCorrupt {
        path: PathBuf,
        binary: String,
        json: String,
    },

    #[error("unsupported export format: {0} (supported: txt, csv, json)")]
    UnsupportedFormat(String),
}

impl VocabError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
