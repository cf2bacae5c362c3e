//! Collection cycle
//!
//! One cycle is fetch → extract → build → publish under a single deadline.
//! [`Collector`] holds everything a cycle needs and is built once at startup.

use async_trait::async_trait;
use bgw_common::{BgwError, Result};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, instrument};

use crate::config::CollectorConfig;
use crate::gateway::{DocumentSource, Fetcher, GatewayClient, ParseFailure, RetryPolicy, StatisticsParser};
use crate::influx::{InfluxClient, PointBuilder, PointWriter, Publisher};

/// Outcome of a successful cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Instant stamped on every point of the cycle
    pub timestamp: DateTime<Utc>,
    pub fetch_attempts: u32,
    pub points_built: usize,
    pub points_written: usize,
    pub parse_failures: Vec<ParseFailure>,
}

/// A unit of work the scheduler can run repeatedly
#[async_trait]
pub trait Cycle: Send + Sync {
    async fn run_cycle(&self) -> Result<CycleReport>;
}

/// Runs collection cycles against one gateway and one storage backend
pub struct Collector<S, W> {
    fetcher: Fetcher<S>,
    parser: StatisticsParser,
    builder: PointBuilder,
    publisher: Publisher<W>,
    cycle_timeout: Duration,
}

/// The production collector
pub type GatewayCollector = Collector<GatewayClient, InfluxClient>;

impl GatewayCollector {
    /// Wire up the gateway client around an already health-checked backend
    pub fn from_config(config: &CollectorConfig, influx: InfluxClient) -> Result<Self> {
        let gateway = GatewayClient::new(&config.router_ip)?;
        Ok(Collector::new(
            Fetcher::new(gateway, RetryPolicy::with_max_elapsed(config.cycle_timeout())),
            StatisticsParser::new(config.parse_sentinel),
            PointBuilder::for_router(&config.router_ip),
            Publisher::new(influx),
            config.cycle_timeout(),
        ))
    }
}

impl<S: DocumentSource, W: PointWriter> Collector<S, W> {
    pub fn new(
        fetcher: Fetcher<S>,
        parser: StatisticsParser,
        builder: PointBuilder,
        publisher: Publisher<W>,
        cycle_timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            parser,
            builder,
            publisher,
            cycle_timeout,
        }
    }

    pub fn publisher(&self) -> &Publisher<W> {
        &self.publisher
    }

    /// Run one cycle to completion or failure
    #[instrument(name = "cycle", skip_all)]
    pub async fn collect(&self) -> Result<CycleReport> {
        let timestamp = Utc::now();
        let deadline = Instant::now().checked_add(self.cycle_timeout).ok_or_else(|| {
            BgwError::Config(format!(
                "cycle timeout of {}s is out of range",
                self.cycle_timeout.as_secs()
            ))
        })?;

        let fetched = self.fetcher.fetch(deadline).await?;

        // The parsed tree isn't Send; it lives and dies inside this call.
        let extraction = self
            .parser
            .extract_points(&fetched.document, &self.builder, timestamp)?;

        let points_written = self.publisher.publish(&extraction.points, deadline).await?;

        let report = CycleReport {
            timestamp,
            fetch_attempts: fetched.attempts,
            points_built: extraction.points.len(),
            points_written,
            parse_failures: extraction.failures,
        };

        info!(
            attempts = report.fetch_attempts,
            points = report.points_built,
            written = report.points_written,
            parse_failures = report.parse_failures.len(),
            "Cycle complete"
        );

        Ok(report)
    }
}

#[async_trait]
impl<S: DocumentSource, W: PointWriter> Cycle for Collector<S, W> {
    async fn run_cycle(&self) -> Result<CycleReport> {
        self.collect().await
    }
}
