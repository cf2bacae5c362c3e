//! Error types for the BGW collector

use thiserror::Error;

/// Result type alias for collector operations
pub type Result<T> = std::result::Result<T, BgwError>;

/// Main error type for the collector
///
/// Only [`BgwError::Config`] and [`BgwError::BackendUnavailable`] are fatal by
/// nature; every other variant is scoped to a single collection cycle.
#[derive(Error, Debug)]
pub enum BgwError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Fetch timed out after {attempts} attempt(s): {last_error}")]
    FetchTimeout { attempts: u32, last_error: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Publish timed out before the cycle deadline")]
    PublishTimeout,
}

impl BgwError {
    /// Whether this error should stop the process when raised at startup.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BgwError::Config(_) | BgwError::BackendUnavailable(_))
    }

    /// Whether this error was produced by the publish stage of a cycle.
    pub fn is_publish(&self) -> bool {
        matches!(self, BgwError::Publish(_) | BgwError::PublishTimeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(BgwError::Config("missing".into()).is_fatal());
        assert!(BgwError::BackendUnavailable("down".into()).is_fatal());
        assert!(!BgwError::Publish("rejected".into()).is_fatal());
        assert!(!BgwError::FetchTimeout {
            attempts: 3,
            last_error: "refused".into()
        }
        .is_fatal());
    }

    #[test]
    fn test_stage_classification() {
        assert!(BgwError::PublishTimeout.is_publish());
        assert!(BgwError::Publish("rejected".into()).is_publish());
        assert!(!BgwError::Fetch("reset".into()).is_publish());
    }

    #[test]
    fn test_fetch_timeout_message() {
        let err = BgwError::FetchTimeout {
            attempts: 4,
            last_error: "connection refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "Fetch timed out after 4 attempt(s): connection refused"
        );
    }
}
