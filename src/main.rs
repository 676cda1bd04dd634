use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storefront_scraper::{
    export, web, AppConfig, BrowserLauncher, ChromeLauncher, LatestSnapshot, MemoryBrowser,
    PriceSummary, ProfileRegistry, ScrapeSession, SessionOutcome,
};

#[derive(Parser)]
#[command(name = "storefront-scraper", version, about = "Scrape product listings from e-commerce storefronts")]
struct Cli {
    /// Directory holding default.toml and friends
    #[arg(long, global = true, default_value = "config")]
    config_dir: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the dashboard and control API
    Serve,
    /// Scrape one storefront from the command line and write a CSV
    Scrape {
        #[arg(long)]
        url: String,
        #[arg(long)]
        keywords: Option<String>,
        #[arg(long, default_value = export::CSV_FILE_NAME)]
        output: PathBuf,
        /// Replay saved .html pages from this directory instead of launching Chrome
        #[arg(long)]
        replay: Option<PathBuf>,
    },
}

fn init_tracing(config: &AppConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::from_default_env().add_directive("storefront_scraper=debug".parse()?);

    let (file_layer, guard) = match config.logging.directory.as_deref() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "storefront-scraper.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::from_dir(&cli.config_dir)
        .with_context(|| format!("Failed to load configuration from {}", cli.config_dir))?;
    let _guard = init_tracing(&config)?;

    let registry = Arc::new(ProfileRegistry::with_defaults().context("Invalid built-in site profiles")?);
    info!(profiles = ?registry.profile_names(), "Starting Storefront Scraper");

    match cli.command {
        Command::Serve => {
            let launcher: Arc<dyn BrowserLauncher> = Arc::new(ChromeLauncher::new(config.scraper.clone()));
            let session = Arc::new(ScrapeSession::new(launcher, registry, config.scraper.clone()));
            let state = web::AppState::new(session, config.clone());
            web::serve(config, state).await?;
        }
        Command::Scrape {
            url,
            keywords,
            output,
            replay,
        } => {
            let launcher: Arc<dyn BrowserLauncher> = match replay {
                Some(dir) => Arc::new(
                    MemoryBrowser::from_dir(&dir)
                        .with_context(|| format!("Failed to load pages from {}", dir.display()))?,
                ),
                None => Arc::new(ChromeLauncher::new(config.scraper.clone())),
            };
            scrape_once(launcher, registry, &config, &url, keywords.as_deref(), &output).await?;
        }
    }

    info!("Shutting down...");
    Ok(())
}

async fn scrape_once(
    launcher: Arc<dyn BrowserLauncher>,
    registry: Arc<ProfileRegistry>,
    config: &AppConfig,
    url: &str,
    keywords: Option<&str>,
    output: &Path,
) -> Result<()> {
    let session = ScrapeSession::new(launcher, registry, config.scraper.clone());
    let sink = LatestSnapshot::new();
    session.start(url, keywords, Arc::new(sink.clone()))?;

    let status = tokio::select! {
        status = session.wait_until_stopped() => status,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping after the current item");
            session.stop();
            session.wait_until_stopped().await
        }
    };

    let snapshot = sink.read_latest();
    export::write_csv_file(&snapshot, output)?;

    if let Some(summary) = PriceSummary::from_items(&snapshot) {
        info!(
            priced = summary.count,
            lowest = %summary.lowest,
            highest = %summary.highest,
            average = %summary.average,
            median = %summary.median,
            "Price summary"
        );
    }

    match status.outcome {
        Some(SessionOutcome::Failed { reason }) => {
            anyhow::bail!("Scrape failed after {} attempts: {}", status.attempts, reason)
        }
        outcome => {
            info!(items = snapshot.len(), ?outcome, output = %output.display(), "Scrape finished");
            Ok(())
        }
    }
}
