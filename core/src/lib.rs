//! File-backed term/document vocabulary index used to expand and rank
//! search queries over a source tree.

pub mod config;
pub mod error;
pub mod export;
pub mod index;
pub mod ingest;
pub mod maintenance;
pub mod persist;
pub mod similarity;
pub mod tokenizer;
pub mod vocabulary;
pub mod weighting;

pub use config::VocabConfig;
pub use error::{Result, VocabError};
pub use index::{
    DocumentInfo, GlobalStats, IndexMetadata, IndexTables, QueryExpansionResult, TermCategory,
    TermInfo, UpdateResult, VocabularyReport, WeightedTerm,
};
pub use ingest::FileOutcome;
pub use vocabulary::VocabularyIndex;
