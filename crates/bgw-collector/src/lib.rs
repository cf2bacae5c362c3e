//! BGW Collector Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Polls a residential gateway's broadband statistics page and stores the
//! Ethernet IPv4 counters in InfluxDB.
//!
//! # Pipeline
//!
//! ```text
//! Scheduler ──tick──▶ Fetcher ──page──▶ StatisticsParser ──points──▶ Publisher
//!                    (retry until          (summary-matched        (one write,
//!                     cycle deadline)       table rows)             no retry)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use bgw_collector::influx::{InfluxClient, InfluxConfig};
//! use bgw_collector::pipeline::GatewayCollector;
//! use bgw_collector::scheduler::Scheduler;
//! use bgw_collector::config::CollectorConfig;
//! use std::time::Duration;
//!
//! async fn start(config: CollectorConfig) -> bgw_common::Result<()> {
//!     let influx = InfluxClient::new(InfluxConfig {
//!         url: config.influx_url(),
//!         token: config.influx_token(),
//!         bucket: config.influx_bucket.clone(),
//!     })?;
//!     influx.ensure_healthy(Duration::from_secs(60)).await?;
//!
//!     let collector = GatewayCollector::from_config(&config, influx)?;
//!     Scheduler::new(config.interval()).run(&collector).await
//! }
//! ```

pub mod config;
pub mod gateway;
pub mod influx;
pub mod pipeline;
pub mod scheduler;
