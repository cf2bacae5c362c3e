//! Configuration management
//!
//! Every setting can be given as a flag or through its `BGW320_*` environment
//! variable; `main` loads an optional `.env` file before parsing.

use bgw_common::{BgwError, Result};
use clap::Args;
use std::time::Duration;

// ============================================================================
// Collector Configuration Constants
// ============================================================================

/// Default InfluxDB bucket (the 1.x compatibility `db/rp` mapping).
pub const DEFAULT_INFLUX_BUCKET: &str = "db0";

/// Default interval between collection cycles in seconds.
pub const DEFAULT_INTERVAL_SECS: u64 = 5;

/// Default per-cycle deadline in seconds, shared by fetch retries and publish.
pub const DEFAULT_CYCLE_TIMEOUT_SECS: u64 = 60;

/// Default value recorded for a counter whose text isn't an integer.
pub const DEFAULT_PARSE_SENTINEL: i64 = 0;

/// Upper bound for the interval and the cycle deadline
pub const MAX_DURATION_SECS: u64 = 86_400;

/// Collector configuration
#[derive(Args, Clone)]
pub struct CollectorConfig {
    /// Address of the gateway to poll (host or host:port)
    #[arg(long, env = "BGW320_ROUTERIP")]
    pub router_ip: String,

    /// InfluxDB host
    #[arg(long, env = "BGW320_INFLUXHOST")]
    pub influx_host: String,

    /// InfluxDB port
    #[arg(long, env = "BGW320_INFLUXPORT")]
    pub influx_port: u16,

    /// InfluxDB user
    #[arg(long, env = "BGW320_INFLUXUSER")]
    pub influx_user: String,

    /// InfluxDB password
    #[arg(long, env = "BGW320_INFLUXPASS", hide_env_values = true)]
    pub influx_pass: String,

    /// InfluxDB bucket to write into
    #[arg(long, env = "BGW320_INFLUXBUCKET", default_value = DEFAULT_INFLUX_BUCKET)]
    pub influx_bucket: String,

    /// Seconds between collection cycles
    #[arg(long, env = "BGW320_INTERVAL_SECS", default_value_t = DEFAULT_INTERVAL_SECS)]
    pub interval_secs: u64,

    /// Deadline for a whole cycle in seconds
    #[arg(long, env = "BGW320_CYCLE_TIMEOUT_SECS", default_value_t = DEFAULT_CYCLE_TIMEOUT_SECS)]
    pub cycle_timeout_secs: u64,

    /// Value stored for counters that fail to parse
    #[arg(
        long,
        env = "BGW320_PARSE_SENTINEL",
        default_value_t = DEFAULT_PARSE_SENTINEL,
        allow_negative_numbers = true
    )]
    pub parse_sentinel: i64,
}

impl std::fmt::Debug for CollectorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorConfig")
            .field("router_ip", &self.router_ip)
            .field("influx_host", &self.influx_host)
            .field("influx_port", &self.influx_port)
            .field("influx_user", &self.influx_user)
            .field("influx_pass", &"<redacted>")
            .field("influx_bucket", &self.influx_bucket)
            .field("interval_secs", &self.interval_secs)
            .field("cycle_timeout_secs", &self.cycle_timeout_secs)
            .field("parse_sentinel", &self.parse_sentinel)
            .finish()
    }
}

impl CollectorConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.router_ip.trim().is_empty() {
            return Err(BgwError::Config("BGW320_ROUTERIP cannot be empty".to_string()));
        }

        if self.influx_host.trim().is_empty() {
            return Err(BgwError::Config("BGW320_INFLUXHOST cannot be empty".to_string()));
        }

        if self.influx_port == 0 {
            return Err(BgwError::Config(
                "BGW320_INFLUXPORT must be greater than 0".to_string(),
            ));
        }

        if self.influx_bucket.trim().is_empty() {
            return Err(BgwError::Config("BGW320_INFLUXBUCKET cannot be empty".to_string()));
        }

        if self.interval_secs == 0 || self.interval_secs > MAX_DURATION_SECS {
            return Err(BgwError::Config(format!(
                "BGW320_INTERVAL_SECS must be between 1 and {}",
                MAX_DURATION_SECS
            )));
        }

        if self.cycle_timeout_secs == 0 || self.cycle_timeout_secs > MAX_DURATION_SECS {
            return Err(BgwError::Config(format!(
                "BGW320_CYCLE_TIMEOUT_SECS must be between 1 and {}",
                MAX_DURATION_SECS
            )));
        }

        Ok(())
    }

    /// Base URL of the InfluxDB HTTP API
    pub fn influx_url(&self) -> String {
        format!("http://{}:{}", self.influx_host, self.influx_port)
    }

    /// Token in the `user:password` form InfluxDB accepts for 1.x credentials
    pub fn influx_token(&self) -> String {
        format!("{}:{}", self.influx_user, self.influx_pass)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_secs)
    }
}
