use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docsearch_core::persist::{load_index, save_index, IndexPaths};
use docsearch_core::source::load_documents;
use docsearch_core::{build_index, search, QueryMode, SiteConfig};
use tracing_subscriber::{EnvFilter, fmt};

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query the static search index of a documentation site", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build searchindex.js from a directory of Markdown/reStructuredText sources
    Build {
        /// Source root directory
        #[arg(long)]
        source: PathBuf,
        /// Output directory for searchindex.js, searchindex.bin and meta.json
        #[arg(long)]
        output: PathBuf,
        /// Site config file (defaults to <source>/docsearch.json when present)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Index words as written instead of by their stem
        #[arg(long, default_value_t = false)]
        no_stem: bool,
        /// Keep common connector words ("the", "and", ...) in the index
        #[arg(long, default_value_t = false)]
        keep_stopwords: bool,
    },
    /// Query a built index and print hits as JSON lines
    Search {
        /// Index directory written by `build`
        #[arg(long, default_value = "./_build/search")]
        index: PathBuf,
        #[arg(long)]
        query: String,
        /// "and" requires every term, "or" any term
        #[arg(long, default_value = "and")]
        mode: QueryMode,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { source, output, config, no_stem, keep_stopwords } => {
            let mut site = match config {
                Some(path) => SiteConfig::load(&path).with_context(|| format!("loading config {}", path.display()))?,
                None => SiteConfig::discover(&source)?,
            };
            if no_stem { site.tokenizer.stem = false; }
            if keep_stopwords { site.tokenizer.stopwords = false; }
            build(&source, &output, &site)
        }
        Commands::Search { index, query, mode, limit } => run_search(&index, &query, mode, limit),
    }
}

fn build(source: &Path, output: &Path, site: &SiteConfig) -> Result<()> {
    let docs = load_documents(source, site).with_context(|| format!("reading sources under {}", source.display()))?;
    let index = build_index(docs, site.tokenizer);
    let paths = IndexPaths::new(output);
    let meta = save_index(&paths, &index, &site.project).with_context(|| format!("writing index to {}", output.display()))?;
    tracing::info!(output = %output.display(), num_docs = meta.num_docs, num_terms = meta.num_terms, "index build complete");
    Ok(())
}

fn run_search(index_dir: &Path, query: &str, mode: QueryMode, limit: usize) -> Result<()> {
    let index = load_index(&IndexPaths::new(index_dir)).with_context(|| format!("loading index from {}", index_dir.display()))?;
    let hits = search(&index, query, mode, limit.max(1));
    tracing::debug!(query, total_hits = hits.len(), "search finished");
    for hit in hits {
        println!("{}", serde_json::to_string(&hit)?);
    }
    Ok(())
}
