//! Gateway page fetcher with deadline-bounded retry

use async_trait::async_trait;
use bgw_common::{BgwError, Result};
use reqwest::Client;
use std::time::Duration;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, info, warn};

/// Path of the broadband statistics page on the gateway
pub const STATISTICS_PATH: &str = "/cgi-bin/broadbandstatistics.ha";

/// Upper bound on a single HTTP attempt, so one hung connection can't eat
/// the whole cycle deadline.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// An unparsed HTML page as returned by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    body: String,
}

impl RawDocument {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Something that can produce the statistics page in a single attempt
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn retrieve(&self) -> Result<RawDocument>;
}

/// HTTP client for the gateway's diagnostic pages
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    url: String,
}

impl GatewayClient {
    /// Create a client for the gateway at `router_ip` (host or host:port)
    pub fn new(router_ip: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("bgw-collector/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BgwError::Config(format!("Failed to build gateway client: {}", e)))?;

        Ok(Self {
            client,
            url: format!("http://{}{}", router_ip, STATISTICS_PATH),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DocumentSource for GatewayClient {
    async fn retrieve(&self) -> Result<RawDocument> {
        debug!(url = %self.url, "Fetching statistics page");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| BgwError::Fetch(format!("GET {} failed: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(BgwError::Fetch(format!("HTTP error: {}", response.status())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| BgwError::Fetch(format!("Failed to read body from {}: {}", self.url, e)))?;

        Ok(RawDocument::new(body))
    }
}

/// How long to keep retrying and how long to wait between attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Give up once this much time has passed since the first attempt
    pub max_elapsed: Duration,
    /// Wait after the first failure
    pub initial_backoff: Duration,
    /// Ceiling on any single wait
    pub max_backoff: Duration,
    /// Growth factor applied per failed attempt
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_elapsed: Duration::from_secs(60),
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Default backoff bounded by `max_elapsed`
    pub fn with_max_elapsed(max_elapsed: Duration) -> Self {
        Self {
            max_elapsed,
            ..Self::default()
        }
    }

    /// Wait before the attempt following failed attempt number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// A document together with the number of attempts it took
#[derive(Debug, Clone)]
pub struct Fetched {
    pub document: RawDocument,
    pub attempts: u32,
}

/// Retrieves the statistics page, retrying until the deadline
pub struct Fetcher<S> {
    source: S,
    policy: RetryPolicy,
}

impl<S: DocumentSource> Fetcher<S> {
    pub fn new(source: S, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    /// Fetch the page, retrying with backoff.
    ///
    /// Stops at whichever comes first: `deadline`, or `max_elapsed` after the
    /// first attempt. An attempt still in flight at that point is cancelled.
    ///
    /// Near the deadline the wait is shortened to half the remaining time so
    /// the final attempt still has room to complete. Retrying ends once less
    /// than `initial_backoff` remains.
    pub async fn fetch(&self, deadline: Instant) -> Result<Fetched> {
        let deadline = Instant::now()
            .checked_add(self.policy.max_elapsed)
            .map_or(deadline, |cap| deadline.min(cap));
        let mut attempts = 0u32;
        let mut last_error = String::from("deadline reached before the first attempt");

        while Instant::now() < deadline {
            attempts += 1;

            match timeout_at(deadline, self.source.retrieve()).await {
                Ok(Ok(document)) => {
                    if attempts > 1 {
                        info!(attempts, "Fetched statistics page after retrying");
                    }
                    return Ok(Fetched { document, attempts });
                },
                Ok(Err(e)) => {
                    last_error = e.to_string();
                },
                Err(_) => {
                    last_error = format!("attempt {} cancelled at the cycle deadline", attempts);
                    break;
                },
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining < self.policy.initial_backoff {
                break;
            }
            let delay = self.policy.backoff(attempts).min(remaining / 2);

            warn!(
                error = %last_error,
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                "Fetch failed, retrying"
            );
            sleep(delay).await;
        }

        Err(BgwError::FetchTimeout {
            attempts,
            last_error,
        })
    }
}
