use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dc_gallery_archiver::config::Config;
use dc_gallery_archiver::crawler::HttpListingSource;
use dc_gallery_archiver::pipeline;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        gallery = %config.gallery_id,
        name = %config.gallery_name,
        days = config.days_limit,
        data_dir = %config.data_dir.display(),
        "Starting gallery archiver"
    );

    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create data directory: {}",
                config.data_dir.display()
            )
        })?;

    let source = HttpListingSource::new(&config).context("Failed to build HTTP client")?;
    let summary = pipeline::run(&config, &source).await?;

    for week in &summary.weeks {
        info!(
            week = %week.week,
            existing = week.existing,
            added = week.added,
            total = week.total,
            created = week.created,
            "Week summary"
        );
    }
    info!(
        pages = summary.pages_fetched,
        collected = summary.collected,
        added = summary.added(),
        reason = %summary.stop,
        "Run complete"
    );

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,dc_gallery_archiver=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}
