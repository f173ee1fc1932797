use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::{fmt, EnvFilter};
use vocab_core::export::{export_vocabulary, ExportFormat};
use vocab_core::{TermCategory, UpdateResult, VocabConfig, VocabularyReport};
use vocab_indexer::{FreshnessAction, FreshnessPolicy, VocabularyBuilder, VocabularyManager};

#[derive(Parser)]
#[command(name = "vocab")]
#[command(about = "Build, maintain and query a vocabulary index over a source tree", long_about = None)]
struct Cli {
    /// Directory holding the index files
    #[arg(long, global = true, env = "VOCAB_DATA_DIR")]
    data_dir: Option<PathBuf>,
    /// JSON config file; overrides --data-dir
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from scratch from a directory or explicit files
    Build {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Only index the top level of a directory
        #[arg(long)]
        no_recursive: bool,
    },
    /// Incrementally update the index; with no paths, re-checks indexed files
    Update {
        paths: Vec<PathBuf>,
        #[arg(long)]
        no_recursive: bool,
    },
    /// Show index statistics
    Stats,
    /// Expand a query with co-occurring terms
    Expand {
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Terms sharing documents with a term
    Similar {
        term: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Highest-weighted terms
    Top {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        category: Option<TermCategory>,
    },
    /// Exact and prefix term lookup
    Search {
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Export the vocabulary as txt, csv or json
    Export {
        output: PathBuf,
        #[arg(long, default_value = "txt")]
        format: String,
        /// 0 exports every term
        #[arg(long, default_value_t = 1000)]
        limit: usize,
    },
    /// Remove rare terms not seen recently
    Cleanup {
        #[arg(long, default_value_t = 24 * 30)]
        max_age_hours: u64,
    },
    /// Recompute weights and cap per-term growth
    Optimize,
    /// Build or refresh the index for a project root when needed
    Ensure {
        #[arg(long, default_value = ".")]
        root: PathBuf,
        #[arg(long, default_value_t = 24)]
        max_age_hours: u64,
        #[arg(long)]
        no_build: bool,
        #[arg(long)]
        no_update: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref(), cli.data_dir.as_deref())?;

    match cli.command {
        Commands::Build { paths, no_recursive } => {
            let builder = VocabularyBuilder::new(config)?;
            let result = match single_dir(&paths) {
                Some(dir) => builder.build_from_directory(dir, !no_recursive)?,
                None => builder.build_from_files(&paths)?,
            };
            print_update_result(&result);
            print_report(&builder.index().vocabulary_report());
        }
        Commands::Update { paths, no_recursive } => {
            let builder = VocabularyBuilder::load(config)?;
            let result = match single_dir(&paths) {
                Some(dir) => builder.update_from_directory(dir, !no_recursive)?,
                None if paths.is_empty() => builder.refresh_known_documents()?,
                None => builder.update_from_files(&paths)?,
            };
            print_update_result(&result);
        }
        Commands::Stats => {
            let builder = VocabularyBuilder::load(config)?;
            print_report(&builder.index().vocabulary_report());
        }
        Commands::Expand { query, limit, json } => {
            let builder = VocabularyBuilder::load(config)?;
            let result = builder.index().expand_query(&query, limit);
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("original: {}", result.original_terms.join(" "));
                println!("expanded: {}", result.expanded_terms.join(" "));
                for (term, similar) in &result.similar_terms {
                    println!("  {term} -> {}", similar.join(", "));
                }
                for w in &result.weighted_terms {
                    println!("{:<32} {:.4}", w.term, w.weight);
                }
            }
        }
        Commands::Similar { term, limit } => {
            let builder = VocabularyBuilder::load(config)?;
            for (other, score) in builder.index().find_similar_terms_with_scores(&term, limit) {
                println!("{other:<32} {score:.4}");
            }
        }
        Commands::Top { limit, category } => {
            let builder = VocabularyBuilder::load(config)?;
            for t in builder.index().get_top_terms(limit, category) {
                println!("{:<32} {:.4} docs={} freq={} {}", t.term, t.weight, t.document_freq, t.total_freq, t.category);
            }
        }
        Commands::Search { query, limit } => {
            let builder = VocabularyBuilder::load(config)?;
            for t in builder.index().search_terms(&query, limit) {
                println!("{:<32} {:.4} docs={}", t.term, t.weight, t.document_freq);
            }
        }
        Commands::Export { output, format, limit } => {
            let format: ExportFormat = format.parse()?;
            let builder = VocabularyBuilder::load(config)?;
            let written = export_vocabulary(builder.index(), &output, format, limit)?;
            println!("exported {written} terms to {}", output.display());
        }
        Commands::Cleanup { max_age_hours } => {
            let builder = VocabularyBuilder::load(config)?;
            let removed = builder.index().cleanup_old_terms(hours(max_age_hours))?;
            println!("removed {removed} terms");
        }
        Commands::Optimize => {
            let builder = VocabularyBuilder::load(config)?;
            builder.index().optimize_index()?;
            print_report(&builder.index().vocabulary_report());
        }
        Commands::Ensure { root, max_age_hours, no_build, no_update } => {
            let mut manager = VocabularyManager::new(config, root);
            let policy = FreshnessPolicy {
                auto_build: !no_build,
                auto_update: !no_update,
                max_age: (max_age_hours > 0).then(|| hours(max_age_hours)),
            };
            match manager.ensure_vocabulary(policy)? {
                FreshnessAction::Built(result) => {
                    println!("built vocabulary");
                    print_update_result(&result);
                }
                FreshnessAction::Updated(result) => {
                    println!("updated vocabulary");
                    print_update_result(&result);
                }
                FreshnessAction::Unchanged => println!("vocabulary is up to date"),
            }
        }
    }
    Ok(())
}

fn resolve_config(config: Option<&Path>, data_dir: Option<&Path>) -> Result<VocabConfig> {
    let config = match (config, data_dir) {
        (Some(file), _) => VocabConfig::from_json_file(file)?,
        (None, Some(dir)) => VocabConfig::in_dir(dir),
        (None, None) => VocabConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn single_dir(paths: &[PathBuf]) -> Option<&Path> {
    match paths {
        [only] if only.is_dir() => Some(only.as_path()),
        _ => None,
    }
}

fn hours(h: u64) -> Duration {
    Duration::from_secs(h.saturating_mul(3600))
}

fn print_update_result(result: &UpdateResult) {
    println!("took {:?}", result.duration);
    println!(
        "files: {} added, {} updated, {} deleted",
        result.added_files, result.updated_files, result.deleted_files
    );
    println!("terms: {} new, {} removed", result.new_terms, result.removed_terms);
    if !result.errors.is_empty() {
        println!("{} errors:", result.errors.len());
        for err in &result.errors {
            println!("  - {err}");
        }
    }
}

fn print_report(report: &VocabularyReport) {
    let stats = &report.global_stats;
    println!("documents:      {}", stats.total_documents);
    println!("unique terms:   {}", stats.unique_terms);
    println!("total terms:    {}", stats.total_terms);
    println!("index size:     {:.2} MB", stats.index_size as f64 / 1024.0 / 1024.0);
    println!("avg doc length: {:.1} bytes", stats.avg_doc_length);
    println!(
        "last updated:   {}",
        stats.last_updated.format(&Rfc3339).unwrap_or_else(|_| "-".into())
    );
    if !report.category_counts.is_empty() {
        println!("categories:");
        for (category, count) in &report.category_counts {
            println!("  {category:<12} {count}");
        }
    }
    if !report.language_counts.is_empty() {
        println!("languages:");
        for (language, count) in &report.language_counts {
            println!("  {language:<12} {count}");
        }
    }
}
