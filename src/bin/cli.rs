//! Requirements crawler CLI
//!
//! Crawls every result page of a job search and collects the requirements of
//! each posting.

use std::path::PathBuf;

use chrono::Local;
use clap::{Parser, Subcommand};
use requirements_crawler::{
    error::Result,
    models::Config,
    pipeline,
    services::SelectorExtractor,
    utils::logger,
};

/// Job requirements crawler
#[derive(Parser, Debug)]
#[command(
    name = "requirements-crawler",
    version,
    about = "Collects the requirements of every job in a search"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write logs to a file under the configured log directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the search and collect requirements (default)
    Crawl {
        /// Search listing URL (default: `query_url` from the config)
        #[arg(short, long)]
        query: Option<String>,

        /// Worker pool size for each fan-out stage
        #[arg(long)]
        concurrency: Option<usize>,

        /// Print every collected requirement to stdout
        #[arg(long)]
        print: bool,
    },

    /// Validate the configuration file
    Validate,
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let start_time = Local::now();
    let cli = Cli::parse();

    let (mut config, load_error) = match Config::load(&cli.config) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    if cli.log_file {
        config.logging.file = true;
    }
    logger::init(&config.logging, cli.verbose)?;

    match load_error {
        Some(e) => log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        ),
        None => log::info!("Loaded configuration from {}", cli.config.display()),
    }

    let command = cli.command.unwrap_or(Command::Crawl {
        query: None,
        concurrency: None,
        print: false,
    });

    match command {
        Command::Crawl {
            query,
            concurrency,
            print,
        } => {
            if let Some(query) = query {
                config.query_url = query;
            }
            if let Some(concurrency) = concurrency {
                config.crawler.max_concurrent = concurrency;
            }
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }

            let report = match pipeline::run_pipeline(&config).await {
                Ok(report) => report,
                Err(e) => {
                    log::error!("Crawl aborted: {}", e);
                    return Err(e);
                }
            };

            log::info!(
                "Crawled {} pages and {} jobs in {:.3}s: {} requirements",
                report.stats.page_count,
                report.stats.job_count,
                report.stats.elapsed_secs(),
                report.requirements.len()
            );

            if print {
                for requirement in &report.requirements {
                    println!("{requirement}");
                }
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            if let Err(e) = SelectorExtractor::new(&config.extractor) {
                log::error!("Extractor selectors are invalid: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK (query URL, crawler limits and selectors)");
        }
    }

    let elapsed = (Local::now() - start_time)
        .num_microseconds()
        .map(|n| n as f64 / 1_000_000.0)
        .unwrap_or(0.0);
    println!("Elapsed: {elapsed:.5}");

    Ok(())
}
