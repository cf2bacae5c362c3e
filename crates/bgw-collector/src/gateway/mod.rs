//! Gateway side of the pipeline
//!
//! - **fetcher**: HTTP retrieval of the statistics page with deadline-bounded retry
//! - **document**: selector/attribute/text traversal over parsed HTML
//! - **parser**: extraction of the Ethernet IPv4 statistics table

pub mod document;
pub mod fetcher;
pub mod parser;

pub use document::{Document, Element, HtmlDocument};
pub use fetcher::{DocumentSource, Fetched, Fetcher, GatewayClient, RawDocument, RetryPolicy};
pub use parser::{
    normalize_field_name, Extraction, ParseFailure, StatisticsParser, TableFields,
    TARGET_TABLE_SUMMARY,
};
