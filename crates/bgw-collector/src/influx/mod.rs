//! Storage side of the pipeline
//!
//! - **point**: metric points and line-protocol encoding
//! - **publisher**: one deadline-bounded write per cycle
//! - **client**: InfluxDB HTTP client (health check and writes)

pub mod client;
pub mod point;
pub mod publisher;

pub use client::{HealthStatus, InfluxClient, InfluxConfig};
pub use point::{MetricPoint, PointBuilder, MEASUREMENT, ROUTER_TAG};
pub use publisher::{PointWriter, Publisher};
