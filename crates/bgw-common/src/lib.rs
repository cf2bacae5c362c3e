//! BGW Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging for the BGW collector workspace.
//!
//! - **Error Handling**: [`BgwError`] and the [`Result`] alias
//! - **Logging**: `tracing` subscriber setup driven by environment variables
//!
//! # Example
//!
//! ```no_run
//! use bgw_common::{BgwError, Result};
//!
//! fn require(value: Option<&str>) -> Result<&str> {
//!     value.ok_or_else(|| BgwError::Config("BGW320_ROUTERIP is required".into()))
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{BgwError, Result};
