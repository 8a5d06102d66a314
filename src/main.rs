use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use sensor_health_agent::alerter::AlertDispatcher;
use sensor_health_agent::analyzer;
use sensor_health_agent::clock::{Clock, SystemClock};
use sensor_health_agent::config::Config;
use sensor_health_agent::scheduler::{self, AnomalyCycle, PredictiveCycle};
use sensor_health_agent::store::supabase::SupabaseStore;
use sensor_health_agent::store::MetricStore;

#[derive(Parser, Debug)]
#[command(name = "sensor-health-agent", about = "Sensor health anomaly detection and predictive maintenance agent")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "sensor-health.toml")]
    config: String,

    /// Validate config and exit
    #[arg(long)]
    check: bool,

    /// Run only one of the loops
    #[arg(long, value_enum)]
    only: Option<LoopKind>,

    /// Print version and exit
    #[arg(short, long)]
    version: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LoopKind {
    Anomaly,
    Predictive,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("sensor-health-agent {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration
    let config = Config::load(&cli.config)?;
    config.validate().context("Invalid configuration")?;

    if cli.check {
        println!("Configuration is valid.");
        return Ok(());
    }

    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        store = %config.store.url,
        device_id = config.predictive.device_id,
        "Starting sensor health agent"
    );

    if let Err(e) = run(config, cli.only).await {
        error!(error = %format!("{:#}", e), "Agent terminated with error");
        return Err(e);
    }

    Ok(())
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(&config.agent.log_level)
        });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();
}

async fn run(config: Config, only: Option<LoopKind>) -> Result<()> {
    let store: Arc<dyn MetricStore> =
        Arc::new(SupabaseStore::new(&config.store).context("Failed to build store client")?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cancel = CancellationToken::new();
    let mut handles = Vec::new();

    if only != Some(LoopKind::Predictive) {
        let dispatcher = AlertDispatcher::new(
            store.clone(),
            clock.clone(),
            config.anomaly.cooldown(),
        );
        let cycle = AnomalyCycle::new(
            store.clone(),
            clock.clone(),
            analyzer::create_detectors(&config),
            dispatcher,
            config.anomaly.window(),
        );
        let period = Duration::from_secs(config.anomaly.interval_secs);
        handles.push(tokio::spawn(scheduler::run_loop(cycle, period, cancel.clone())));
    }

    if only != Some(LoopKind::Anomaly) {
        let cycle = PredictiveCycle::new(store.clone(), clock.clone(), &config.predictive);
        let period = Duration::from_secs(config.predictive.interval_secs);
        handles.push(tokio::spawn(scheduler::run_loop(cycle, period, cancel.clone())));
    }

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal, finishing in-flight cycles");
    cancel.cancel();

    for handle in handles {
        if let Err(e) = handle.await {
            error!(error = %e, "Loop task panicked");
        }
    }

    Ok(())
}
