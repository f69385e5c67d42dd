//! Parcrawl main entry point
//!
//! This is the command-line interface for the Parcrawl recursive web crawler.

use anyhow::Context;
use clap::Parser;
use parcrawl::config::{load_config_with_hash, validate, Config};
use parcrawl::output::{print_statistics, write_report, CrawlStatistics, OutputFormat};
use parcrawl::{host_of, WebCrawler};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Parcrawl: a recursive web crawler
///
/// Downloads every page reachable from URL within DEPTH levels of links,
/// limiting concurrent downloads globally and per host, then prints the
/// downloaded URLs and the URLs that failed.
#[derive(Parser, Debug)]
#[command(name = "parcrawl")]
#[command(version)]
#[command(about = "A recursive web crawler with bounded concurrency", long_about = None)]
struct Cli {
    /// Seed URL
    #[arg(value_name = "URL")]
    url: String,

    /// Levels of links to follow; 1 downloads only the seed
    #[arg(value_name = "DEPTH", default_value_t = 1)]
    depth: u32,

    /// Number of concurrent downloads
    #[arg(value_name = "DOWNLOADERS")]
    downloaders: Option<usize>,

    /// Number of concurrent link extractions
    #[arg(value_name = "EXTRACTORS")]
    extractors: Option<usize>,

    /// Maximum concurrent downloads from one host
    #[arg(value_name = "PER_HOST")]
    per_host: Option<usize>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Milliseconds to let queued work finish when shutting down
    #[arg(long, value_name = "MS")]
    shutdown_timeout_ms: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;
    host_of(&cli.url).with_context(|| format!("Invalid seed URL {}", cli.url))?;

    let crawler = WebCrawler::from_config(&config).context("Failed to start crawler")?;

    let start_time = Instant::now();
    let download = crawler.download(&cli.url, cli.depth);
    tokio::pin!(download);

    let result = tokio::select! {
        result = &mut download => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, stopping workers");
            let (result, ()) = tokio::join!(&mut download, crawler.close());
            result
        }
    };
    let elapsed = start_time.elapsed();

    crawler.close().await;

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    let mut stdout = std::io::stdout().lock();
    write_report(&mut stdout, &result, format).context("Failed to write report")?;

    if !cli.quiet {
        print_statistics(&CrawlStatistics::from_result(&result, elapsed));
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("parcrawl=info,warn"),
            1 => EnvFilter::new("parcrawl=debug,info"),
            2 => EnvFilter::new("parcrawl=trace,debug"),
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

/// Loads the configuration file, if any, and applies command-line overrides
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(downloaders) = cli.downloaders {
        config.crawler.downloaders = downloaders;
    }
    if let Some(extractors) = cli.extractors {
        config.crawler.extractors = extractors;
    }
    if let Some(per_host) = cli.per_host {
        config.crawler.per_host = per_host;
    }
    if let Some(timeout) = cli.shutdown_timeout_ms {
        config.crawler.shutdown_timeout_ms = timeout;
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}
