//! Publishing a cycle's points to storage

use async_trait::async_trait;
use bgw_common::{BgwError, Result};
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

use super::point::MetricPoint;

/// Storage backend that accepts a batch of line-protocol lines
#[async_trait]
pub trait PointWriter: Send + Sync {
    async fn write_lines(&self, lines: &[String]) -> Result<()>;
}

/// Writes points once per cycle; never retries
pub struct Publisher<W> {
    writer: W,
}

impl<W: PointWriter> Publisher<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Write `points` before `deadline`, returning how many were written.
    ///
    /// InfluxDB rejects empty writes, so a batch with nothing to encode
    /// succeeds without a request.
    pub async fn publish(&self, points: &[MetricPoint], deadline: Instant) -> Result<usize> {
        let lines: Vec<String> = points
            .iter()
            .filter_map(|point| {
                let line = point.to_line_protocol();
                if line.is_none() {
                    warn!(
                        measurement = %point.measurement,
                        "Point has no fields, leaving it out of the write"
                    );
                }
                line
            })
            .collect();

        if lines.is_empty() {
            info!(points = points.len(), "Nothing to write this cycle");
            return Ok(0);
        }

        match timeout_at(deadline, self.writer.write_lines(&lines)).await {
            Ok(Ok(())) => Ok(lines.len()),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(BgwError::PublishTimeout),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::influx::point::PointBuilder;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingWriter {
        batches: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl PointWriter for RecordingWriter {
        async fn write_lines(&self, lines: &[String]) -> Result<()> {
            self.batches.lock().unwrap().push(lines.to_vec());
            Ok(())
        }
    }

    struct RejectingWriter;

    #[async_trait]
    impl PointWriter for RejectingWriter {
        async fn write_lines(&self, _lines: &[String]) -> Result<()> {
            Err(BgwError::Publish("401 Unauthorized".to_string()))
        }
    }

    struct StalledWriter;

    #[async_trait]
    impl PointWriter for StalledWriter {
        async fn write_lines(&self, _lines: &[String]) -> Result<()> {
            std::future::pending().await
        }
    }

    fn point(fields: &[(&str, i64)]) -> MetricPoint {
        let fields: BTreeMap<String, i64> =
            fields.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        PointBuilder::for_router("gw").build(fields, Utc::now())
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    #[tokio::test]
    async fn test_publish_writes_one_batch() {
        let publisher = Publisher::new(RecordingWriter::default());
        let written = publisher
            .publish(&[point(&[("rx", 1)]), point(&[("rx", 2)])], deadline())
            .await
            .unwrap();

        assert_eq!(written, 2);
        let batches = publisher.writer().batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_write() {
        let publisher = Publisher::new(RecordingWriter::default());
        assert_eq!(publisher.publish(&[], deadline()).await.unwrap(), 0);
        assert!(publisher.writer().batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fieldless_points_are_left_out() {
        let publisher = Publisher::new(RecordingWriter::default());
        let written = publisher
            .publish(&[point(&[]), point(&[("rx", 1)])], deadline())
            .await
            .unwrap();
        assert_eq!(written, 1);

        let only_empty = publisher.publish(&[point(&[])], deadline()).await.unwrap();
        assert_eq!(only_empty, 0);
        assert_eq!(publisher.writer().batches.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejection_surfaces_unmodified() {
        let publisher = Publisher::new(RejectingWriter);
        let err = publisher
            .publish(&[point(&[("rx", 1)])], deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, BgwError::Publish(ref msg) if msg == "401 Unauthorized"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_write_times_out_at_deadline() {
        let publisher = Publisher::new(StalledWriter);
        let err = publisher
            .publish(&[point(&[("rx", 1)])], Instant::now() + Duration::from_secs(3))
            .await
            .unwrap_err();
        assert!(matches!(err, BgwError::PublishTimeout));
    }
}
