//! Command-line front end for both search pipelines.
//!
//! Usage:
//!     vvsearch local "你好" --min-ratio 60 --page 2
//!     vvsearch remote "你好" --api http://127.0.0.1:8000 --reveal-all
//!
//! Logs go to stderr (`RUST_LOG`, default `vvsearch=info`); results go to stdout.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vvsearch::{
    EpisodeLinkMap, HttpSearchEndpoint, LinkResolver, LinkStyle, LocalOutcome, LocalSearch, Paginator, ProgressEvent,
    RemoteBatch, RemoteOutcome, RemoteQuery, RemoteSearch, ReplayEndpoint, ResultFormatter, SearchConfig,
    SearchEndpoint, SnapshotCache, SnapshotSource, SubtitleDatabase,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Search a subtitle corpus", long_about = None)]
struct Cli {
    /// JSON config file; flags override its values
    #[arg(long, global = true, env = "VVSEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Link map (JSON object of video URL -> episode)
    #[arg(long, global = true, env = "VVSEARCH_LINKS")]
    links: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Plain)]
    format: OutputFormat,

    /// Results per page
    #[arg(long, global = true)]
    page_size: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a local snapshot (downloaded and cached on first use)
    Local(LocalArgs),
    /// Stream pre-scored results from a search endpoint
    Remote(RemoteArgs),
}

#[derive(Args, Debug)]
struct LocalArgs {
    query: String,

    /// Minimum partial ratio, 0-100
    #[arg(short = 'r', long)]
    min_ratio: Option<u8>,

    #[arg(short, long, default_value_t = 1)]
    page: usize,

    /// Use this snapshot file instead of the cached download
    #[arg(long, env = "VVSEARCH_DB")]
    db: Option<PathBuf>,

    #[arg(long, env = "VVSEARCH_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    #[arg(long)]
    dataset_url: Option<String>,

    #[arg(long)]
    dataset_version: Option<String>,
}

#[derive(Args, Debug)]
struct RemoteArgs {
    query: String,

    /// Minimum partial ratio, 0-100
    #[arg(short = 'r', long)]
    min_ratio: Option<u8>,

    /// Minimum similarity, 0.0-1.0
    #[arg(short = 's', long)]
    min_similarity: Option<f64>,

    /// Endpoint base URL; `/search` is appended
    #[arg(long, env = "VVSEARCH_API")]
    api: Option<String>,

    /// Read the NDJSON body from a file instead of the endpoint
    #[arg(long, conflicts_with = "api")]
    replay: Option<PathBuf>,

    /// Number of pages to reveal
    #[arg(long, default_value_t = 1, conflicts_with = "reveal_all")]
    pages: usize,

    /// Reveal every buffered result
    #[arg(long)]
    reveal_all: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Plain,
    Json,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vvsearch=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<SearchConfig> {
    let mut config = match &cli.config {
        Some(path) => SearchConfig::load(path).with_context(|| format!("Failed to read config {}", path.display()))?,
        None => SearchConfig::default(),
    };
    if let Some(links) = &cli.links {
        config.links_path = Some(links.clone());
    }
    if let Some(page_size) = cli.page_size {
        config.page_size = page_size;
    }
    Ok(config)
}

fn link_formatter(config: &SearchConfig, style: LinkStyle) -> ResultFormatter {
    let links = match &config.links_path {
        Some(path) => EpisodeLinkMap::load_or_empty(path),
        None => EpisodeLinkMap::default(),
    };
    ResultFormatter::new(LinkResolver::new(Arc::new(links), style), config.frames_dir.clone())
}

fn progress_bar(message: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}%")?
            .progress_chars("#>-"),
    );
    pb.set_message(message);
    Ok(pb)
}

/// Progress callback driving `pb`; clears the bar on completion.
fn track(pb: ProgressBar) -> impl FnMut(ProgressEvent) + Send {
    move |event| match event {
        ProgressEvent::Advanced { percent, .. } => pb.set_position(percent.round() as u64),
        ProgressEvent::Completed => pb.finish_and_clear(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    tracing::debug!(?config, "configuration loaded");

    match &cli.command {
        Command::Local(args) => run_local(&config, args, cli.format).await,
        Command::Remote(args) => run_remote(&config, args, cli.format).await,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LOCAL
// ─────────────────────────────────────────────────────────────────────────────

async fn open_snapshot(config: &SearchConfig, args: &LocalArgs) -> Result<SubtitleDatabase> {
    if let Some(path) = &args.db {
        return SubtitleDatabase::open_snapshot(path)
            .with_context(|| format!("Failed to open snapshot {}", path.display()));
    }

    let dir = args
        .cache_dir
        .clone()
        .or_else(|| config.cache_dir.clone())
        .or_else(SnapshotCache::default_dir)
        .context("No cache directory available; pass --cache-dir or --db")?;
    let cache = SnapshotCache::new(
        dir,
        args.dataset_url.clone().unwrap_or_else(|| config.dataset_url.clone()),
        args.dataset_version.clone().unwrap_or_else(|| config.dataset_version.clone()),
    );

    let (path, source) = cache
        .ensure(track(progress_bar("Downloading subtitles")?))
        .await
        .context("Failed to fetch subtitle snapshot")?;
    if source == SnapshotSource::Download {
        eprintln!("Snapshot saved to {}", path.display());
    }
    SubtitleDatabase::open_snapshot(&path).context("Failed to open cached snapshot")
}

async fn run_local(config: &SearchConfig, args: &LocalArgs, format: OutputFormat) -> Result<()> {
    let db = open_snapshot(config, args).await?;
    let search = LocalSearch::new(
        Arc::new(db),
        link_formatter(config, config.local_link_style()),
        Paginator::new(config.page_size),
    );

    let min_ratio = args.min_ratio.unwrap_or(config.min_ratio);
    let mut outcome = search.search(&args.query, min_ratio).await?;
    if args.page > 1 && matches!(outcome, LocalOutcome::Page(_)) {
        outcome = search.go_to_page(args.page).await?;
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Plain => print_local(&outcome),
    }
    Ok(())
}

fn print_local(outcome: &LocalOutcome) {
    match outcome {
        LocalOutcome::NoResults { query, min_ratio } => {
            println!("No results for \"{query}\" at match ratio >= {min_ratio}%. Try lowering --min-ratio.");
        }
        LocalOutcome::Page(page) => {
            for card in &page.results {
                let exact = if card.exact_match { " (exact)" } else { "" };
                println!("{}  {}  {}{}", card.episode_title, card.timestamp, card.match_label, exact);
                println!("    {}", card.text);
                if let Some(link) = &card.link {
                    println!("    {link}");
                }
            }
            println!();
            println!("Page {}/{} ({} results)", page.page, page.total_pages, page.total_results);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// REMOTE
// ─────────────────────────────────────────────────────────────────────────────

async fn run_remote(config: &SearchConfig, args: &RemoteArgs, format: OutputFormat) -> Result<()> {
    let formatter = link_formatter(config, config.remote_link_style());
    let query = RemoteQuery {
        query: args.query.clone(),
        min_ratio: args.min_ratio.unwrap_or(config.min_ratio),
        min_similarity: args.min_similarity.unwrap_or(config.min_similarity),
    };

    match &args.replay {
        Some(path) => {
            let body = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            let endpoint = ReplayEndpoint::from_body(&body, 64 * 1024);
            stream_and_print(RemoteSearch::new(endpoint, formatter, config.page_size), query, args, format).await
        }
        None => {
            let base = args.api.clone().unwrap_or_else(|| config.api_base_url.clone());
            let endpoint = HttpSearchEndpoint::new(base).context("Failed to build HTTP client")?;
            stream_and_print(RemoteSearch::new(endpoint, formatter, config.page_size), query, args, format).await
        }
    }
}

async fn stream_and_print<E: SearchEndpoint>(
    search: RemoteSearch<E>,
    query: RemoteQuery,
    args: &RemoteArgs,
    format: OutputFormat,
) -> Result<()> {
    let outcome = search
        .search(query, track(progress_bar("Searching")?))
        .await
        .context("Remote search failed")?;

    let first = match outcome {
        RemoteOutcome::Results(batch) => batch,
        no_results => {
            match (&no_results, format) {
                (_, OutputFormat::Json) => println!("{}", serde_json::to_string_pretty(&no_results)?),
                (RemoteOutcome::NoResults { query, min_ratio, min_similarity }, OutputFormat::Plain) => println!(
                    "No results for \"{query}\" at match ratio >= {min_ratio}% and similarity >= {min_similarity}."
                ),
                (RemoteOutcome::Results(_), OutputFormat::Plain) => {}
            }
            return Ok(());
        }
    };

    let mut batches = vec![first];
    while args.reveal_all || batches.len() < args.pages {
        let last = &batches[batches.len() - 1];
        if !last.has_more {
            break;
        }
        match search.reveal(&last.trigger) {
            Some(batch) => batches.push(batch),
            None => break,
        }
    }

    match format {
        OutputFormat::Json => {
            let cards: Vec<_> = batches.iter().flat_map(|b| b.results.iter()).collect();
            println!("{}", serde_json::to_string_pretty(&cards)?);
        }
        OutputFormat::Plain => print_remote(&batches),
    }
    Ok(())
}

fn print_remote(batches: &[RemoteBatch]) {
    for card in batches.iter().flat_map(|b| b.results.iter()) {
        let tag = card.episode_tag.as_deref().unwrap_or("-");
        println!(
            "{tag}  {}  {}  match {}  similarity {}",
            card.title, card.timestamp, card.match_label, card.similarity_label
        );
        println!("    {}", card.text);
        if let Some(link) = &card.link {
            println!("    {link}");
        }
        if let Some(frame) = &card.preview_frame {
            println!("    frame: {frame}");
        }
    }
    if let Some(last) = batches.last() {
        println!();
        let more = if last.has_more { ", more available" } else { "" };
        println!("Showing {}/{} results{more}", last.displayed, last.buffered);
    }
}
