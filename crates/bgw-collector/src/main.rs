//! BGW Collector - gateway statistics to InfluxDB

use anyhow::{Context, Result};
use bgw_collector::{
    config::CollectorConfig,
    influx::{InfluxClient, InfluxConfig},
    pipeline::GatewayCollector,
    scheduler::Scheduler,
};
use bgw_common::logging::{init_logging, LogConfig, LogLevel, WorkerGuard};
use bgw_common::BgwError;
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};

/// How long the startup health check may take
const HEALTH_CHECK_TIMEOUT_SECS: u64 = 60;

#[derive(Parser, Debug)]
#[command(name = "bgw-collector")]
#[command(author, version, about = "Collects gateway Ethernet statistics into InfluxDB")]
struct Cli {
    #[command(flatten)]
    config: CollectorConfig,

    /// Run a single collection cycle and exit
    #[arg(long)]
    once: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Held until main returns so buffered file output is flushed on exit.
    let _log_guard = match init(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            // No subscriber yet, so stderr is the only place this can go.
            eprintln!("bgw-collector: {:#}", e);
            return ExitCode::FAILURE;
        },
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let startup = e.downcast_ref::<BgwError>().is_some_and(BgwError::is_fatal);
            if startup {
                error!(error = %format!("{:#}", e), "Could not start collector, exiting");
            } else {
                error!(error = %format!("{:#}", e), "Collection failed, exiting");
            }
            ExitCode::FAILURE
        },
    }
}

fn init(cli: &Cli) -> Result<Option<WorkerGuard>> {
    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flag
    let log_config = LogConfig {
        level,
        filter_directives: Some("hyper=warn,reqwest=warn,html5ever=warn".to_string()),
        ..LogConfig::default()
    }
    .merge_env()?;

    init_logging(&log_config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.config;
    info!(config = ?config, "Starting BGW collector");

    config.validate().context("Invalid configuration")?;

    let influx = InfluxClient::new(InfluxConfig {
        url: config.influx_url(),
        token: config.influx_token(),
        bucket: config.influx_bucket.clone(),
    })?;
    influx
        .ensure_healthy(Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS))
        .await
        .context("Could not work with InfluxDB")?;

    let collector = GatewayCollector::from_config(&config, influx)?;
    let scheduler = Scheduler::new(config.interval());

    if cli.once {
        scheduler
            .run_once(&collector)
            .await
            .context("Collection cycle failed")?;
        return Ok(());
    }

    scheduler
        .run(&collector)
        .await
        .context("Initial collection cycle failed")?;

    Ok(())
}
