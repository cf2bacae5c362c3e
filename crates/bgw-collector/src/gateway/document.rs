//! Minimal markup traversal over `scraper`
//!
//! The statistics parser only needs three things from a document: find
//! elements by CSS selector, read an attribute, and read text content.

use bgw_common::{BgwError, Result};
use scraper::{ElementRef, Html, Selector};

/// A searchable element with attributes and text
pub trait Element: Sized {
    /// Descendants matching `selector`, in document order
    fn find(&self, selector: &str) -> Result<Vec<Self>>;

    fn attribute(&self, name: &str) -> Option<&str>;

    /// Concatenated text of all descendant text nodes
    fn text_content(&self) -> String;
}

/// A parsed document that can be searched by CSS selector
pub trait Document {
    type Element<'a>: Element
    where
        Self: 'a;

    /// Elements matching `selector`, in document order
    fn find<'a>(&'a self, selector: &str) -> Result<Vec<Self::Element<'a>>>;
}

/// An HTML document parsed with html5ever
///
/// Not `Send`: keep it out of any future that crosses an await point.
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| BgwError::Parse(format!("invalid selector '{}': {:?}", selector, e)))
}

impl Document for HtmlDocument {
    type Element<'a> = ElementRef<'a>;

    fn find<'a>(&'a self, selector: &str) -> Result<Vec<ElementRef<'a>>> {
        let selector = parse_selector(selector)?;
        Ok(self.html.select(&selector).collect())
    }
}

impl<'a> Element for ElementRef<'a> {
    fn find(&self, selector: &str) -> Result<Vec<Self>> {
        let selector = parse_selector(selector)?;
        Ok(self.select(&selector).collect())
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.value().attr(name)
    }

    fn text_content(&self) -> String {
        self.text().collect()
    }
}
