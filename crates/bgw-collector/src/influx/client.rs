//! InfluxDB HTTP client
//!
//! Talks to the v2 HTTP API (`/health`, `/api/v2/write`). Credentials are sent
//! as a `user:password` token, which InfluxDB 1.8+ and 2.x accept for 1.x
//! style users.

use async_trait::async_trait;
use bgw_common::{BgwError, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::publisher::PointWriter;

/// Connection timeout for InfluxDB requests in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// InfluxDB connection settings
#[derive(Clone)]
pub struct InfluxConfig {
    /// Base URL, e.g. `http://influx.local:8086`
    pub url: String,
    /// `user:password`
    pub token: String,
    pub bucket: String,
}

impl std::fmt::Debug for InfluxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("bucket", &self.bucket)
            .finish()
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl HealthStatus {
    pub fn is_pass(&self) -> bool {
        self.status == "pass"
    }
}

/// Error body InfluxDB returns with a rejected request
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// InfluxDB client, built once and reused for every cycle
#[derive(Debug, Clone)]
pub struct InfluxClient {
    client: Client,
    config: InfluxConfig,
}

impl InfluxClient {
    pub fn new(config: InfluxConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| BgwError::Config(format!("Failed to build InfluxDB client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &InfluxConfig {
        &self.config
    }

    fn write_url(&self) -> String {
        format!("{}/api/v2/write", self.config.url.trim_end_matches('/'))
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.config.url.trim_end_matches('/'))
    }

    /// Query the readiness endpoint
    ///
    /// InfluxDB answers 503 with a `fail` body when unhealthy, so the body is
    /// read regardless of status.
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = self.health_url();
        debug!(url = %url, "Checking InfluxDB health");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BgwError::BackendUnavailable(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BgwError::BackendUnavailable(format!("Failed to read health body: {}", e)))?;

        serde_json::from_str::<HealthStatus>(&body).map_err(|e| {
            BgwError::BackendUnavailable(format!(
                "Unexpected health response ({}): {} ({})",
                status,
                body.trim(),
                e
            ))
        })
    }

    /// Fail unless the backend reports `pass` within `timeout`
    pub async fn ensure_healthy(&self, timeout: Duration) -> Result<HealthStatus> {
        let health = tokio::time::timeout(timeout, self.health())
            .await
            .map_err(|_| {
                BgwError::BackendUnavailable(format!(
                    "health check did not answer within {}s",
                    timeout.as_secs()
                ))
            })??;

        if !health.is_pass() {
            return Err(BgwError::BackendUnavailable(format!(
                "InfluxDB reported status '{}': {}",
                health.status,
                health.message.as_deref().unwrap_or("no message")
            )));
        }

        info!(
            version = health.version.as_deref().unwrap_or("unknown"),
            "InfluxDB is healthy"
        );

        Ok(health)
    }
}

#[async_trait]
impl PointWriter for InfluxClient {
    async fn write_lines(&self, lines: &[String]) -> Result<()> {
        let response = self
            .client
            .post(self.write_url())
            .query(&[
                ("org", ""),
                ("bucket", self.config.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header(reqwest::header::AUTHORIZATION, format!("Token {}", self.config.token))
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(lines.join("\n"))
            .send()
            .await
            .map_err(|e| BgwError::Publish(format!("POST {} failed: {}", self.write_url(), e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(BgwError::Publish(describe_rejection(status, &body)))
    }
}

fn describe_rejection(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            code,
            message: Some(message),
        }) => format!(
            "InfluxDB rejected write ({}, {}): {}",
            status,
            code.as_deref().unwrap_or("unknown"),
            message
        ),
        _ => format!("InfluxDB rejected write ({}): {}", status, body.trim()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn client(url: &str) -> InfluxClient {
        InfluxClient::new(InfluxConfig {
            url: url.to_string(),
            token: "user:secret".to_string(),
            bucket: "db0".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_urls_tolerate_trailing_slash() {
        let influx = client("http://influx:8086/");
        assert_eq!(influx.write_url(), "http://influx:8086/api/v2/write");
        assert_eq!(influx.health_url(), "http://influx:8086/health");
    }

    #[test]
    fn test_config_debug_redacts_token() {
        let rendered = format!("{:?}", client("http://influx:8086").config());
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn test_health_status_parsing() {
        let health: HealthStatus = serde_json::from_str(
            r#"{"name":"influxdb","message":"ready for queries and writes","status":"pass","checks":[],"version":"2.7.1"}"#,
        )
        .unwrap();
        assert!(health.is_pass());
        assert_eq!(health.version.as_deref(), Some("2.7.1"));

        let failing: HealthStatus = serde_json::from_str(r#"{"status":"fail"}"#).unwrap();
        assert!(!failing.is_pass());
    }

    #[test]
    fn test_describe_rejection() {
        let message = describe_rejection(
            StatusCode::BAD_REQUEST,
            r#"{"code":"invalid","message":"unable to parse 'x'"}"#,
        );
        assert!(message.contains("invalid"));
        assert!(message.contains("unable to parse"));

        let plain = describe_rejection(StatusCode::UNAUTHORIZED, "nope\n");
        assert_eq!(plain, "InfluxDB rejected write (401 Unauthorized): nope");
    }
}
