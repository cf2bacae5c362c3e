//! Statistics table parser
//!
//! Turns the gateway's broadband statistics page into metric points. Only
//! tables whose `summary` attribute is exactly [`TARGET_TABLE_SUMMARY`] are
//! read; each `tr` contributes one field named after its first `th`, valued
//! from its first `td`.

use bgw_common::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::document::{Document, Element, HtmlDocument};
use super::fetcher::RawDocument;
use crate::influx::point::{MetricPoint, PointBuilder};

/// `summary` attribute of the one table we collect
pub const TARGET_TABLE_SUMMARY: &str = "Ethernet IPv4 Statistics Table";

/// A counter whose text didn't parse as an integer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// Normalized field name
    pub field: String,
    /// Trimmed cell text
    pub raw: String,
}

/// Fields read from one matching table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFields {
    pub fields: BTreeMap<String, i64>,
    pub failures: Vec<ParseFailure>,
}

/// Points extracted from one document
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub points: Vec<MetricPoint>,
    pub failures: Vec<ParseFailure>,
}

/// Lowercase, trim, and replace every space with `_`.
///
/// `" RX Packets "` becomes `"rx_packets"`.
pub fn normalize_field_name(label: &str) -> String {
    label.trim().replace(' ', "_").to_lowercase()
}

/// Statistics table parser
#[derive(Debug, Clone)]
pub struct StatisticsParser {
    sentinel: i64,
}

impl Default for StatisticsParser {
    fn default() -> Self {
        Self::new(0)
    }
}

impl StatisticsParser {
    /// `sentinel` is recorded for values that fail integer parsing
    pub fn new(sentinel: i64) -> Self {
        Self { sentinel }
    }

    /// Parse a fetched page and build one point per matching table.
    ///
    /// Every point carries `timestamp`, so points from one cycle share it.
    pub fn extract_points(
        &self,
        raw: &RawDocument,
        builder: &PointBuilder,
        timestamp: DateTime<Utc>,
    ) -> Result<Extraction> {
        let document = HtmlDocument::parse(raw.body());
        let tables = self.parse_tables(&document)?;

        let mut extraction = Extraction::default();
        for table in tables {
            extraction.points.push(builder.build(table.fields, timestamp));
            extraction.failures.extend(table.failures);
        }

        Ok(extraction)
    }

    /// Read every table whose summary matches, in document order
    pub fn parse_tables<D: Document>(&self, document: &D) -> Result<Vec<TableFields>> {
        let mut tables = Vec::new();

        for table in document.find("table")? {
            match table.attribute("summary") {
                Some(summary) if summary == TARGET_TABLE_SUMMARY => {
                    tables.push(self.parse_table(&table)?);
                },
                other => {
                    debug!(summary = ?other, "Skipping table");
                },
            }
        }

        Ok(tables)
    }

    fn parse_table<E: Element>(&self, table: &E) -> Result<TableFields> {
        let mut parsed = TableFields::default();

        for row in table.find("tr")? {
            let label = first_text(&row, "th")?;
            let raw = first_text(&row, "td")?;

            let name = normalize_field_name(label.as_deref().unwrap_or_default());
            if name.is_empty() {
                debug!(raw = ?raw, "Skipping row without a label");
                continue;
            }

            // A repeated label overwrites the earlier row, failure record included.
            parsed.failures.retain(|failure| failure.field != name);

            let raw = raw.as_deref().unwrap_or_default().trim().to_string();
            let value = match raw.parse::<i64>() {
                Ok(value) => value,
                Err(_) => {
                    warn!(field = %name, raw = %raw, "Couldn't parse '{}' for '{}'", raw, name);
                    parsed.failures.push(ParseFailure {
                        field: name.clone(),
                        raw,
                    });
                    self.sentinel
                },
            };

            parsed.fields.insert(name, value);
        }

        info!(fields = ?parsed.fields, "Extracted statistics table");

        Ok(parsed)
    }
}

fn first_text<E: Element>(row: &E, selector: &str) -> Result<Option<String>> {
    Ok(row.find(selector)?.first().map(Element::text_content))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn table(summary: &str, rows: &[(&str, &str)]) -> String {
        let rows: String = rows
            .iter()
            .map(|(label, value)| format!("<tr><th>{}</th><td>{}</td></tr>", label, value))
            .collect();
        format!(r#"<table summary="{}">{}</table>"#, summary, rows)
    }

    fn parse(html: &str) -> Vec<TableFields> {
        StatisticsParser::default()
            .parse_tables(&HtmlDocument::parse(html))
            .unwrap()
    }

    #[test]
    fn test_normalize_field_name() {
        assert_eq!(normalize_field_name("  RX Packets "), "rx_packets");
        assert_eq!(normalize_field_name("Collisions"), "collisions");
        assert_eq!(normalize_field_name("TX  Bytes"), "tx__bytes");
        assert_eq!(normalize_field_name("\n\t"), "");
    }

    #[test]
    fn test_matching_table_yields_all_rows() {
        let html = table(
            TARGET_TABLE_SUMMARY,
            &[("Receive Packets", "10"), ("Transmit Packets", " 20 "), ("Errors", "0")],
        );
        let tables = parse(&html);

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].fields.len(), 3);
        assert_eq!(tables[0].fields["receive_packets"], 10);
        assert_eq!(tables[0].fields["transmit_packets"], 20);
        assert_eq!(tables[0].fields["errors"], 0);
        assert!(tables[0].failures.is_empty());
    }

    #[test]
    fn test_non_matching_tables_ignored() {
        let html = format!(
            "{}{}",
            table("Ethernet IPv6 Statistics Table", &[("RX Packets", "1")]),
            table("ethernet ipv4 statistics table", &[("RX Packets", "1")]),
        );
        assert!(parse(&html).is_empty());
    }

    #[test]
    fn test_table_without_summary_ignored() {
        assert!(parse("<table><tr><th>RX</th><td>1</td></tr></table>").is_empty());
    }

    #[test]
    fn test_unparseable_value_uses_sentinel() {
        let html = table(TARGET_TABLE_SUMMARY, &[("RX Packets", "1234"), ("TX Packets", "bad")]);
        let tables = parse(&html);

        assert_eq!(tables[0].fields["rx_packets"], 1234);
        assert_eq!(tables[0].fields["tx_packets"], 0);
        assert_eq!(
            tables[0].failures,
            vec![ParseFailure {
                field: "tx_packets".to_string(),
                raw: "bad".to_string()
            }]
        );
    }

    #[test]
    fn test_custom_sentinel() {
        let html = table(TARGET_TABLE_SUMMARY, &[("Drops", "n/a")]);
        let tables = StatisticsParser::new(-1)
            .parse_tables(&HtmlDocument::parse(&html))
            .unwrap();
        assert_eq!(tables[0].fields["drops"], -1);
    }

    #[test]
    fn test_failure_does_not_stop_later_rows() {
        let html = table(
            TARGET_TABLE_SUMMARY,
            &[("A", "x"), ("B", "2"), ("C", "3.5"), ("D", "4")],
        );
        let tables = parse(&html);
        assert_eq!(tables[0].fields["b"], 2);
        assert_eq!(tables[0].fields["d"], 4);
        assert_eq!(tables[0].failures.len(), 2);
    }

    #[test]
    fn test_empty_matching_table_still_yields_entry() {
        let html = format!(r#"<table summary="{}"></table>"#, TARGET_TABLE_SUMMARY);
        let tables = parse(&html);
        assert_eq!(tables.len(), 1);
        assert!(tables[0].fields.is_empty());
    }

    #[test]
    fn test_multiple_matching_tables() {
        let html = format!(
            "{}{}",
            table(TARGET_TABLE_SUMMARY, &[("RX Packets", "1")]),
            table(TARGET_TABLE_SUMMARY, &[("RX Packets", "2")]),
        );
        let tables = parse(&html);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].fields["rx_packets"], 2);
    }

    #[test]
    fn test_duplicate_label_last_write_wins() {
        let html = table(TARGET_TABLE_SUMMARY, &[("Errors", "1"), ("errors", "7")]);
        let tables = parse(&html);
        assert_eq!(tables[0].fields.len(), 1);
        assert_eq!(tables[0].fields["errors"], 7);
    }

    #[test]
    fn test_duplicate_label_good_value_clears_failure() {
        let html = table(
            TARGET_TABLE_SUMMARY,
            &[("Errors", "n/a"), ("Drops", "oops"), ("errors", "7")],
        );
        let tables = parse(&html);
        assert_eq!(tables[0].fields["errors"], 7);
        assert_eq!(
            tables[0].failures,
            vec![ParseFailure {
                field: "drops".to_string(),
                raw: "oops".to_string(),
            }]
        );
    }

    #[test]
    fn test_duplicate_label_bad_value_replaces_good_one() {
        let html = table(TARGET_TABLE_SUMMARY, &[("Errors", "3"), ("errors", "x")]);
        let tables = parse(&html);
        assert_eq!(tables[0].fields["errors"], 0);
        assert_eq!(tables[0].failures.len(), 1);
        assert_eq!(tables[0].failures[0].raw, "x");
    }

    #[test]
    fn test_row_without_header_skipped() {
        let html = format!(
            r#"<table summary="{}"><tr><td>99</td></tr><tr><th>RX</th><td>1</td></tr></table>"#,
            TARGET_TABLE_SUMMARY
        );
        let tables = parse(&html);
        assert_eq!(tables[0].fields.len(), 1);
        assert_eq!(tables[0].fields["rx"], 1);
    }

    #[test]
    fn test_row_without_value_is_a_failure() {
        let html = format!(
            r#"<table summary="{}"><tr><th>Link State</th></tr></table>"#,
            TARGET_TABLE_SUMMARY
        );
        let tables = parse(&html);
        assert_eq!(tables[0].fields["link_state"], 0);
        assert_eq!(tables[0].failures[0].raw, "");
    }

    #[test]
    fn test_first_cells_only() {
        let html = format!(
            r#"<table summary="{}"><tr><th>RX</th><th>ignored</th><td>5</td><td>6</td></tr></table>"#,
            TARGET_TABLE_SUMMARY
        );
        let tables = parse(&html);
        assert_eq!(tables[0].fields["rx"], 5);
    }

    #[test]
    fn test_extract_points_share_timestamp() {
        let html = format!(
            "{}{}",
            table(TARGET_TABLE_SUMMARY, &[("RX Packets", "1")]),
            table(TARGET_TABLE_SUMMARY, &[("TX Packets", "2")]),
        );
        let builder = PointBuilder::for_router("192.168.1.254");
        let timestamp = Utc::now();

        let extraction = StatisticsParser::default()
            .extract_points(&RawDocument::new(html), &builder, timestamp)
            .unwrap();

        assert_eq!(extraction.points.len(), 2);
        assert!(extraction.points.iter().all(|p| p.timestamp == timestamp));
    }
}
