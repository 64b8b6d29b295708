//! CLI entry point exercising the indexing and search core.
//!
//! Argument parsing and config-file plumbing are an ambient convenience,
//! not part of the indexing/search contract itself: everything this
//! binary does is reachable through [`codevault::Indexer`] and
//! [`codevault::Searcher`] directly.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use tokio_util::sync::CancellationToken;

use codevault::Config;
use codevault::Indexer;
use codevault::OllamaEmbedder;
use codevault::SearchRequest;
use codevault::Searcher;
use codevault::SqliteVecStore;
use codevault::VectorStore;

#[derive(Parser)]
#[command(name = "codevault")]
#[command(about = "Local semantic code search: index a repo, then query it")]
#[command(version)]
struct Cli {
    /// SQLite database path.
    #[arg(long, default_value = "codevault.db")]
    db: PathBuf,

    /// Path to a TOML config file overriding the built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbosity: repeat for more (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index a workspace directory (expects `<path>/repos/<repo-name>/...`).
    Index {
        /// Workspace root containing a `repos/` subdirectory.
        path: PathBuf,
        /// Codebase name stored alongside every indexed file.
        #[arg(long)]
        codebase: String,
    },
    /// Run a natural-language query against an already-indexed codebase.
    Search {
        query: String,
        /// Restrict to one codebase; omit to search everything.
        #[arg(long)]
        codebase: Option<String>,
        #[arg(short, long, default_value = "10")]
        limit: usize,
        #[arg(long)]
        show_content: bool,
    },
    /// Print per-codebase file/chunk counts.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let mut logging = codevault::logging::LoggingConfig::from_env();
    logging.level = level;
    logging.init()?;

    let config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            Config::from_toml_str(&raw)?
        }
        None => Config::default(),
    };

    let store: Arc<dyn VectorStore> = Arc::new(SqliteVecStore::open(&cli.db, codevault::storage::DEFAULT_DIMENSION)?);
    let embedder = Arc::new(OllamaEmbedder::new(config.embedder.base_url.clone(), config.embedder.model.clone()));

    match cli.command {
        Command::Index { path, codebase } => cmd_index(store, embedder, config, path, codebase).await,
        Command::Search {
            query,
            codebase,
            limit,
            show_content,
        } => cmd_search(store, embedder, query, codebase, limit, show_content).await,
        Command::Stats => cmd_stats(store).await,
    }
}

async fn cmd_index(
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn codevault::Embedder>,
    config: Config,
    path: PathBuf,
    codebase: String,
) -> anyhow::Result<()> {
    let indexer = Arc::new(Indexer::new(store, embedder, config.chunker, config.indexer));
    let mut progress = indexer.index_codebase(codebase, path, CancellationToken::new());

    while let Some(event) = progress.recv().await {
        match event.error {
            Some(err) => eprintln!("[{}] {} ({err})", event.phase.as_str(), event.codebase),
            None => println!(
                "[{}] {}/{} files, {}/{} chunks",
                event.phase.as_str(),
                event.files_processed,
                event.files_total,
                event.chunks_embedded,
                event.chunks_total,
            ),
        }
    }

    Ok(())
}

async fn cmd_search(
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn codevault::Embedder>,
    query: String,
    codebase: Option<String>,
    limit: usize,
    show_content: bool,
) -> anyhow::Result<()> {
    let searcher = Searcher::new(store, embedder);
    let request = SearchRequest {
        limit,
        codebase,
        min_score: 0.0,
        include_content: show_content,
    };

    let results = searcher.search(&query, &request).await?;
    for hit in results {
        println!(
            "{:.4}  {}:{}-{} [{}{}]",
            hit.score,
            hit.path,
            hit.start_line,
            hit.end_line,
            hit.chunk_kind,
            hit.symbol.map(|s| format!(" {s}")).unwrap_or_default(),
        );
        if let Some(content) = hit.content {
            println!("{content}\n");
        }
    }

    Ok(())
}

async fn cmd_stats(store: Arc<dyn VectorStore>) -> anyhow::Result<()> {
    let stats = store.stats().await?;
    println!("{} files, {} chunks", stats.total_files, stats.total_chunks);
    for cb in stats.per_codebase {
        println!("  {}: {} files, {} chunks", cb.codebase, cb.files, cb.chunks);
    }

    Ok(())
}
