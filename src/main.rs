//! web-crawler main entry point
//!
//! Crawls one URL and prints what was downloaded and what failed.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use web_crawler::config::{load_config, validate, Config};
use web_crawler::crawler::crawl;

/// web-crawler: a depth-bounded concurrent web crawler
///
/// Fetches URL and the pages it links to, with separate download and link
/// extraction worker pools and a cap on concurrent requests per host.
#[derive(Parser, Debug)]
#[command(name = "web-crawler")]
#[command(version)]
#[command(about = "A depth-bounded concurrent web crawler", long_about = None)]
struct Cli {
    /// URL to start crawling from
    #[arg(value_name = "URL")]
    url: String,

    /// Number of download workers
    #[arg(value_name = "DOWNLOADERS")]
    downloaders: Option<usize>,

    /// Number of link extraction workers
    #[arg(value_name = "EXTRACTORS")]
    extractors: Option<usize>,

    /// Maximum concurrent requests per host
    #[arg(value_name = "PER_HOST")]
    per_host: Option<usize>,

    /// Crawl depth; 1 fetches only URL
    #[arg(short, long)]
    depth: Option<u32>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

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

    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;
    let depth = config.crawler.max_depth;

    tracing::info!(
        "Crawling {} with {} downloaders, {} extractors, {} per host",
        cli.url,
        config.crawler.downloaders,
        config.crawler.extractors,
        config.crawler.per_host
    );

    let result = crawl(&config, &cli.url, depth)
        .await
        .context("Failed to start crawler")?;

    let mut downloaded: Vec<_> = result.downloaded.into_iter().collect();
    downloaded.sort();
    println!("Downloaded ({}):", downloaded.len());
    for url in &downloaded {
        println!("  {}", url);
    }

    let mut errors: Vec<_> = result.errors.into_iter().collect();
    errors.sort_by(|a, b| a.0.cmp(&b.0));
    println!("Errors ({}):", errors.len());
    for (url, error) in &errors {
        println!("  {}: {}", url, error);
    }

    Ok(())
}

/// Loads the config file if given, then applies command-line overrides
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
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
    if let Some(depth) = cli.depth {
        config.crawler.max_depth = depth;
    }

    validate(&config).context("Invalid command-line arguments")?;
    Ok(config)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("web_crawler=info,warn"),
            1 => EnvFilter::new("web_crawler=debug,info"),
            2 => EnvFilter::new("web_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}
