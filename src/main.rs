//! Tidings main entry point
//!
//! This is the command-line interface for the Tidings news crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tidings::config::{load_config_with_hash, Config};
use tidings::crawler::crawl;
use tidings::output::{print_summary, JsonLinesSink};
use tracing_subscriber::EnvFilter;

/// Tidings: a resilient news crawl-and-extraction pipeline
///
/// Tidings pages through a news site's article listings, extracts the
/// recent articles, keeps the relevant ones and writes them as JSON lines.
/// Articles accepted in earlier runs are skipped.
#[derive(Parser, Debug)]
#[command(name = "tidings")]
#[command(version)]
#[command(about = "A resilient news crawl-and-extraction pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the effective settings without crawling
    #[arg(long)]
    dry_run: bool,

    /// Write accepted records to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Ignore the existing crawl history (it is overwritten on first acceptance)
    #[arg(long)]
    fresh: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(&config, cli.output, cli.fresh).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so records written to stdout stay parseable.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tidings=info,warn"),
            1 => EnvFilter::new("tidings=debug,info"),
            2 => EnvFilter::new("tidings=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Tidings Dry Run ===\n");

    println!("Site:");
    println!("  Name: {}", config.site.name);
    println!("  Base URL: {}", config.site.base_url);
    println!("  Listing URL: {}", config.site.listing_url);
    if let Some(first) = &config.site.first_page_url {
        println!("  First page URL: {}", first);
    }
    println!("  UTC offset: {}", config.site.utc_offset);

    println!("\nCrawler:");
    println!("  Recency window: {} days", config.crawler.recency_days);
    println!(
        "  Empty page threshold: {}",
        config.crawler.empty_page_threshold
    );
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Batch size: {}", config.crawler.batch_size);

    println!("\nFetching:");
    println!("  Strategy: {:?}", config.fetch.strategy);
    println!("  User agent: {}", config.fetch.user_agent);
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!(
        "  Retry: {} attempts, {}ms base delay, {}ms max delay",
        config.retry.max_attempts, config.retry.base_delay_ms, config.retry.max_delay_ms
    );
    if let Some(dir) = &config.fetch.snapshot_dir {
        println!("  Snapshots: {}", dir);
    }

    println!("\nDetail selectors:");
    println!("  Content: {}", config.site.detail.content.join(" | "));
    println!("  Title: {}", config.site.detail.title.join(" | "));
    println!("  Header date: {}", config.site.detail.header_date.join(" | "));

    println!("\nFilter:");
    println!("  Keywords ({}): {}", config.filter.keywords.len(), config.filter.keywords.join(", "));
    match &config.filter.model_path {
        Some(path) => println!("  Model: {}", path),
        None => println!("  Model: (none)"),
    }

    println!("\nHistory: {}", config.history.path);

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, output: Option<PathBuf>, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring crawl history)");
    }

    match output {
        Some(path) => {
            let mut sink = JsonLinesSink::create(&path)
                .with_context(|| format!("failed to create output file {}", path.display()))?;
            let summary = crawl(config, fresh, &mut sink)
                .await
                .with_context(|| format!("crawl of {} failed", config.site.name))?;
            tracing::info!(records = sink.written(), path = %path.display(), "Wrote records");
            print_summary(&summary);
        }
        None => {
            // Records own stdout; the summary is only logged
            let mut sink = JsonLinesSink::stdout();
            crawl(config, fresh, &mut sink)
                .await
                .with_context(|| format!("crawl of {} failed", config.site.name))?;
        }
    }

    Ok(())
}
