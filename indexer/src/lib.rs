pub mod builder;
pub mod freshness;

pub use builder::VocabularyBuilder;
pub use freshness::{discover_files, FreshnessAction, FreshnessPolicy, VocabularyManager};
