//! Metric points and their line-protocol encoding

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Measurement every gateway point is stored under
pub const MEASUREMENT: &str = "ethernet_ipv4";

/// Tag identifying the polled gateway
pub const ROUTER_TAG: &str = "router";

/// One timestamped, tagged record ready for a storage write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricPoint {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, i64>,
    pub timestamp: DateTime<Utc>,
}

impl MetricPoint {
    /// Encode as one line of InfluxDB line protocol.
    ///
    /// Returns `None` for a point without fields, which the protocol can't
    /// express.
    pub fn to_line_protocol(&self) -> Option<String> {
        if self.fields.is_empty() {
            return None;
        }

        let mut line = escape(&self.measurement, &[',', ' ']);

        for (key, value) in &self.tags {
            let _ = write!(
                line,
                ",{}={}",
                escape(key, &[',', '=', ' ']),
                escape(value, &[',', '=', ' '])
            );
        }

        let fields = self
            .fields
            .iter()
            .map(|(key, value)| format!("{}={}i", escape(key, &[',', '=', ' ']), value))
            .collect::<Vec<_>>()
            .join(",");
        line.push(' ');
        line.push_str(&fields);

        if let Some(nanos) = self.timestamp.timestamp_nanos_opt() {
            let _ = write!(line, " {}", nanos);
        }

        Some(line)
    }
}

fn escape(raw: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Builds points with a fixed measurement and tag set
#[derive(Debug, Clone)]
pub struct PointBuilder {
    measurement: String,
    tags: BTreeMap<String, String>,
}

impl PointBuilder {
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
        }
    }

    /// `ethernet_ipv4` points tagged with `router=<router_ip>`
    pub fn for_router(router_ip: &str) -> Self {
        Self::new(MEASUREMENT).tag(ROUTER_TAG, router_ip)
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn build(&self, fields: BTreeMap<String, i64>, timestamp: DateTime<Utc>) -> MetricPoint {
        MetricPoint {
            measurement: self.measurement.clone(),
            tags: self.tags.clone(),
            fields,
            timestamp,
        }
    }
}
