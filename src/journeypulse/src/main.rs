//! JourneyPulse — customer journey tracking and analysis engine.
//!
//! Main entry point that wires configuration, the journey engine, and the
//! periodic analyzers, then serves until interrupted.

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use journeypulse_analytics::AnalysisScheduler;
use journeypulse_core::config::AppConfig;
use journeypulse_core::event_bus::LogSink;
use journeypulse_tracking::seed::seed_demo_touchpoints;
use journeypulse_tracking::JourneyEngine;

#[derive(Parser, Debug)]
#[command(name = "journeypulse")]
#[command(about = "Customer journey tracking and analysis engine")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "JOURNEYPULSE__NODE_ID")]
    node_id: Option<String>,

    /// Session window in minutes (overrides config)
    #[arg(long, env = "JOURNEYPULSE__TRACKING__SESSION_WINDOW_MINUTES")]
    session_window: Option<u64>,

    /// Drop-off analysis interval in seconds (overrides config)
    #[arg(long, env = "JOURNEYPULSE__ANALYSIS__DROPOFF_INTERVAL_SECS")]
    dropoff_interval: Option<u64>,

    /// Conversion-path mining interval in seconds (overrides config)
    #[arg(long, env = "JOURNEYPULSE__ANALYSIS__PATH_MINING_INTERVAL_SECS")]
    path_mining_interval: Option<u64>,

    /// Optimization generation interval in seconds (overrides config)
    #[arg(long, env = "JOURNEYPULSE__ANALYSIS__OPTIMIZATION_INTERVAL_SECS")]
    optimization_interval: Option<u64>,

    /// Seed demo identities and touchpoints on startup
    #[arg(long, default_value_t = false)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "journeypulse=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("JourneyPulse starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(minutes) = cli.session_window {
        config.tracking.session_window_minutes = minutes;
    }
    if let Some(secs) = cli.dropoff_interval {
        config.analysis.dropoff_interval_secs = secs;
    }
    if let Some(secs) = cli.path_mining_interval {
        config.analysis.path_mining_interval_secs = secs;
    }
    if let Some(secs) = cli.optimization_interval {
        config.analysis.optimization_interval_secs = secs;
    }

    info!(
        node_id = %config.node_id,
        session_window_minutes = config.tracking.session_window_minutes,
        dropoff_interval_secs = config.analysis.dropoff_interval_secs,
        path_mining_interval_secs = config.analysis.path_mining_interval_secs,
        optimization_interval_secs = config.analysis.optimization_interval_secs,
        "Configuration loaded"
    );

    // Construct the engine with the in-memory store; outbound events are
    // forwarded to the tracing pipeline.
    let engine = Arc::new(JourneyEngine::in_memory(config.clone(), Arc::new(LogSink)));

    if cli.seed_demo {
        seed_demo_touchpoints(&engine);
    }

    // Start the periodic analyzers
    let scheduler = AnalysisScheduler::new(
        engine.store(),
        engine.events(),
        engine.status(),
        config.analysis.clone(),
    );
    let handles = scheduler.spawn();

    info!(jobs = handles.len(), "Analysis scheduler started");

    let health = engine.health_check();
    info!(status = ?health.status, journeys = health.journey_count, "Engine ready");

    // Serve until interrupted. Shutdown stops scheduling further ticks and
    // discards in-memory state; there is no drain contract.
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping schedulers");
    for handle in handles {
        handle.abort();
    }

    Ok(())
}
