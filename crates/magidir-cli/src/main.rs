mod crawl;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use magidir_core::{AppConfig, SourceConfig, SourceKind, SourcesFile};
use magidir_store::DatasetStore;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "magidir")]
#[command(about = "Magician directory scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Crawl the enabled sources and merge the results into the dataset.
    Crawl {
        /// Only crawl this source (repeatable).
        #[arg(long = "source", value_name = "TAG")]
        sources: Vec<SourceKind>,
        /// Dataset file, overriding `MAGIDIR_DATA_PATH`.
        #[arg(long)]
        data: Option<PathBuf>,
    },
    /// Print the records located in a city as JSON.
    City {
        city: String,
        state: String,
        #[arg(long)]
        data: Option<PathBuf>,
    },
    /// List the configured sources.
    Sources,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = magidir_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Commands::Crawl { sources, data } => run_crawl(&config, &sources, data).await,
        Commands::City { city, state, data } => run_city(&config, &city, &state, data),
        Commands::Sources => run_sources(&config),
    }
}

/// Enabled sources, narrowed to `only` when it is non-empty.
fn select_sources(
    configured: &SourcesFile,
    only: &[SourceKind],
) -> anyhow::Result<Vec<SourceConfig>> {
    if let Some(missing) = only
        .iter()
        .find(|kind| !configured.enabled().any(|s| s.tag == **kind))
    {
        anyhow::bail!("source '{missing}' is not configured or is disabled");
    }

    Ok(configured
        .enabled()
        .filter(|s| only.is_empty() || only.contains(&s.tag))
        .cloned()
        .collect())
}

async fn run_crawl(
    config: &AppConfig,
    only: &[SourceKind],
    data: Option<PathBuf>,
) -> anyhow::Result<()> {
    let sources_file = magidir_core::load_sources(&config.sources_path)
        .with_context(|| format!("loading {}", config.sources_path.display()))?;
    let sources = select_sources(&sources_file, only)?;
    if sources.is_empty() {
        tracing::warn!("no enabled sources, nothing to crawl");
        return Ok(());
    }

    let client = crawl::build_page_client(config, &sources)?;
    let store = DatasetStore::load(data.unwrap_or_else(|| config.data_path.clone()))?;

    crawl::crawl(
        &client,
        &sources,
        store,
        crawl::CrawlLimits::from_app_config(config),
    )
    .await?;
    Ok(())
}

fn run_city(
    config: &AppConfig,
    city: &str,
    state: &str,
    data: Option<PathBuf>,
) -> anyhow::Result<()> {
    let store = DatasetStore::load(data.unwrap_or_else(|| config.data_path.clone()))?;
    let records = magidir_store::records_in_city(store.dataset(), city, state);
    tracing::info!(city, state, count = records.len(), "city query");
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn run_sources(config: &AppConfig) -> anyhow::Result<()> {
    let sources_file = magidir_core::load_sources(&config.sources_path)
        .with_context(|| format!("loading {}", config.sources_path.display()))?;
    for source in &sources_file.sources {
        println!(
            "{:<10} {:<8} {:>6} ms  {}",
            source.tag.tag(),
            if source.enabled { "enabled" } else { "disabled" },
            source.effective_delay_ms(),
            source.start_url
        );
    }
    Ok(())
}
