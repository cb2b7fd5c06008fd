//! The fetched-document abstraction shared by every extractor.
//!
//! A [`Document`] owns the raw body and the URL it came from. Structural
//! queries parse the body on demand with `scraper`, so a `Document` stays
//! `Send` and can be held across `.await` points while the parsed tree
//! never is.

use crate::error::StageError;
use scraper::{Html, Selector};

/// A fetched page: originating URL plus raw body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    url: String,
    body: String,
}

impl Document {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Parse the body into a DOM tree.
    pub fn parse(&self) -> Html {
        Html::parse_document(&self.body)
    }

    /// Outer HTML of every element matching `selector`, in document order.
    pub fn select_html(&self, selector: &str) -> Result<Vec<String>, StageError> {
        let selector = parse_selector(selector)?;
        let html = self.parse();
        Ok(html.select(&selector).map(|el| el.html()).collect())
    }

    /// Values of `attr` on every element matching `selector`, in document order.
    /// Elements lacking the attribute are skipped.
    pub fn select_attr(&self, selector: &str, attr: &str) -> Result<Vec<String>, StageError> {
        let selector = parse_selector(selector)?;
        let html = self.parse();
        Ok(html
            .select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .map(str::to_string)
            .collect())
    }

    pub fn into_body(self) -> String {
        self.body
    }

    /// Absolute http(s) target of `<link rel="canonical">`, if the page declares one.
    pub fn canonical_url(&self) -> Option<String> {
        let html = self.parse();
        html.select(&CANONICAL_SELECTOR)
            .filter_map(|el| el.value().attr("href"))
            .filter_map(|href| url::Url::parse(href.trim()).ok())
            .find(|u| matches!(u.scheme(), "http" | "https"))
            .map(|u| u.to_string())
    }

    /// Raw payloads of all `<script type="application/ld+json">` blocks.
    pub fn json_ld_blocks(&self) -> Vec<String> {
        let html = self.parse();
        html.select(&JSON_LD_SELECTOR)
            .map(|el| el.text().collect::<String>())
            .collect()
    }
}

static JSON_LD_SELECTOR: once_cell::sync::Lazy<Selector> = once_cell::sync::Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).unwrap()
});

static CANONICAL_SELECTOR: once_cell::sync::Lazy<Selector> =
    once_cell::sync::Lazy::new(|| Selector::parse(r#"link[rel="canonical"]"#).unwrap());

/// Parse a CSS selector, mapping the borrowed scraper error into an owned one.
pub(crate) fn parse_selector(selector: &str) -> Result<Selector, StageError> {
    Selector::parse(selector).map_err(|e| StageError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}
