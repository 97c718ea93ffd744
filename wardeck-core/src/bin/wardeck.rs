//! `wardeck`: sync the scan cache and print the dashboard summary.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wardeck_core::{
    cache::ScanDataCache,
    config::{ConfigSource, SyncConfig},
    fetch::HttpScanFetcher,
    infra::store::{DiskStore, StoreRoot},
    scoring::MAX_SCORE,
    summary::{
        DashboardSummary, compute_optimizer, failed_checks,
        single_az_databases, trails_not_logging,
    },
    sync::{SyncController, SyncPhase},
    time::{Clock, SystemClock},
};
use wardeck_model::ComputeOptimizerStatus;

#[derive(Parser)]
#[command(name = "wardeck", about = "Cloud audit dashboard data tool")]
struct Cli {
    /// Config file, overriding WARDECK_CONFIG_PATH
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print pillar scores, serving from cache while it is fresh
    Summary {
        /// Drop the cached scan and fetch a new one
        #[arg(long)]
        force: bool,
    },
    /// Show what is cached and how old it is
    Status,
    /// Remove the cached scan
    Invalidate,
}

fn load_config(path: Option<&PathBuf>) -> Result<SyncConfig> {
    let (config, source) = match path {
        Some(path) => (
            SyncConfig::load_from_file(path)?,
            ConfigSource::File(path.clone()),
        ),
        None => SyncConfig::load_from_env()?,
    };
    info!("configuration loaded from {:?}", source);
    Ok(config)
}

fn open_cache(config: &SyncConfig, clock: Arc<dyn Clock>) -> ScanDataCache {
    let store = DiskStore::new(StoreRoot::new(config.cache_dir.clone()));
    ScanDataCache::new(Arc::new(store), clock)
}

async fn run_summary(config: SyncConfig, force: bool) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = open_cache(&config, Arc::clone(&clock));
    let fetcher = HttpScanFetcher::new(
        config.endpoint_url()?,
        config.request_timeout,
    )
    .context("failed to build HTTP client")?;

    let controller = SyncController::new(
        cache,
        Arc::new(fetcher),
        clock,
        config.sync_options(),
    );

    if force {
        controller.refresh(true).await;
    } else {
        controller.initialize().await;
    }

    let state = controller.state();
    if let Some(suppressed) = controller.last_suppressed_error() {
        eprintln!("warning: refresh failed, showing cached scan ({suppressed})");
    }

    let data = match (state.phase(), state.data) {
        (SyncPhase::Ready, Some(data)) => data,
        _ => match state.error {
            Some(error) => bail!("Error fetching data: {error}"),
            None => bail!("no scan data available"),
        },
    };

    if let Some(captured_at) = state.captured_at {
        println!("Scan captured at {captured_at}");
    }

    let summary = DashboardSummary::from_dataset(&data);
    println!();
    println!("{:<26} {:>8} {:>6}", "Pillar", "Findings", "Score");
    for pillar in &summary.pillars {
        println!(
            "{:<26} {:>8} {:>4}/{}",
            pillar.pillar.label(),
            pillar.findings,
            pillar.score,
            MAX_SCORE
        );
    }

    println!();
    println!("Security breakdown");
    for (label, count) in summary.security.slices() {
        println!("  {label:<24} {count}");
    }

    if let Some(health) = &summary.health {
        println!();
        println!(
            "Scan {} in {}s, {} throttled request(s)",
            health.status, health.duration_secs, health.throttled_requests
        );
        println!("{}", health.advisory());
    }

    let trails = trails_not_logging(&data);
    let databases = single_az_databases(&data);
    if !trails.is_empty() || !databases.is_empty() {
        println!();
        println!("Needs attention");
        for trail in trails {
            println!("  CloudTrail {} is not logging", trail.name);
        }
        for db in databases {
            println!("  RDS {} ({}) is single-AZ", db.identifier, db.engine);
        }
    }

    if let ComputeOptimizerStatus::NotEnabled { reason } =
        compute_optimizer(&data)
    {
        println!("Compute Optimizer is not enabled ({reason})");
    }

    for (pillar, check, message) in failed_checks(&data) {
        println!("Check {pillar}/{check} failed: {message}");
    }

    Ok(())
}

async fn run_status(config: SyncConfig) -> Result<()> {
    let cache = open_cache(&config, Arc::new(SystemClock));
    match cache.read().await {
        Some(entry) => {
            let fresh = cache.is_fresh(&entry, config.cache_ttl);
            println!(
                "cached scan from {} (age {}s, {})",
                entry.captured_at(),
                cache.age(&entry).num_seconds(),
                if fresh { "fresh" } else { "stale" }
            );
        }
        None => println!("no cached scan in {}", config.cache_dir.display()),
    }
    Ok(())
}

async fn run_invalidate(config: SyncConfig) -> Result<()> {
    open_cache(&config, Arc::new(SystemClock))
        .invalidate()
        .await
        .context("failed to invalidate scan cache")?;
    println!("scan cache cleared");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Summary { force } => run_summary(config, force).await,
        Command::Status => run_status(config).await,
        Command::Invalidate => run_invalidate(config).await,
    }
}
