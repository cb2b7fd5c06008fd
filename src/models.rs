//! Data models for article records flowing through the pipeline.
//!
//! - [`ArticleRecord`]: one fetched page's structured fields, mutated stage by stage
//! - [`Author`]: a single byline string or an ordered list of names
//!
//! Serialization produces the canonical output mapping with the fixed keys
//! `url, source_domain, article_title, article_author, article_text,
//! article_publish_date, modified_date, count_comment, entities`. The raw
//! document is never serialized.

use crate::document::Document;
use serde::{Deserialize, Serialize};

/// Byline as the baseline extractor found it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Author {
    One(String),
    Many(Vec<String>),
}

impl Author {
    /// Case-insensitive check whether any author name contains `marker`.
    pub fn mentions(&self, marker: &str) -> bool {
        let marker = marker.trim().to_lowercase();
        if marker.is_empty() {
            return false;
        }
        match self {
            Author::One(name) => name.trim().to_lowercase().contains(&marker),
            Author::Many(names) => names
                .iter()
                .any(|name| name.trim().to_lowercase().contains(&marker)),
        }
    }
}

/// The unit of work: one article, enriched in place by each stage.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ArticleRecord {
    /// Source URL of the fetched document.
    pub url: String,
    /// Host of the source, without a leading `www.`.
    pub source_domain: String,
    pub article_title: Option<String>,
    pub article_author: Option<Author>,
    /// Body text; may be absent or empty when the baseline extractor failed.
    pub article_text: Option<String>,
    /// `YYYY-MM-DD HH:MM:SS` once known.
    pub article_publish_date: Option<String>,
    /// `YYYY-MM-DD HH:MM:SS`; defaults to the publish date.
    pub modified_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_comment: Option<u64>,
    /// Named-entity objects, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<serde_json::Value>>,
    /// The fetched page. Dropped before the record leaves the pipeline.
    #[serde(skip)]
    pub raw_document: Option<Document>,
}

impl ArticleRecord {
    /// A record for `url` with `source_domain` derived from the URL host.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let source_domain = source_domain(&url).unwrap_or_default();
        Self {
            url,
            source_domain,
            ..Default::default()
        }
    }

    /// Attach the fetched document.
    pub fn with_document(mut self, document: Document) -> Self {
        self.raw_document = Some(document);
        self
    }

    /// True when the body is missing or whitespace only.
    pub fn text_is_empty(&self) -> bool {
        self.article_text
            .as_deref()
            .is_none_or(|t| t.trim().is_empty())
    }

    /// Release the fetched document; called at pipeline exit.
    pub fn take_document(&mut self) -> Option<Document> {
        self.raw_document.take()
    }
}

/// Host of `url` with a leading `www.` removed.
/// For example: "https://www.kompas.com/read/x" -> "kompas.com"
pub fn source_domain(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_new_derives_domain() {
        let record = ArticleRecord::new("https://www.kompas.com/read/2024/01/01/x");
        assert_eq!(record.source_domain, "kompas.com");
        assert!(record.text_is_empty());
    }

    #[test]
    fn test_source_domain_subdomain_kept() {
        assert_eq!(
            source_domain("https://nasional.kompas.com/read/x"),
            Some("nasional.kompas.com".to_string())
        );
        assert_eq!(source_domain("not a url"), None);
    }

    #[test]
    fn test_author_mentions() {
        let one = Author::One(" Kompas Cyber Media ".to_string());
        assert!(one.mentions("kompas"));
        let many = Author::Many(vec!["Rina".to_string(), "KOMPAS.com".to_string()]);
        assert!(many.mentions("Kompas"));
        assert!(!many.mentions("detik"));
        assert!(!many.mentions(""));
    }

    #[test]
    fn test_author_deserializes_both_shapes() {
        let one: Author = serde_json::from_str(r#""Rina""#).unwrap();
        assert_eq!(one, Author::One("Rina".to_string()));
        let many: Author = serde_json::from_str(r#"["Rina", "Budi"]"#).unwrap();
        assert_eq!(many, Author::Many(vec!["Rina".into(), "Budi".into()]));
    }

    #[test]
    fn test_record_serialization_keys() {
        let mut record = ArticleRecord::new("https://example.com/a")
            .with_document(Document::new("https://example.com/a", "<html></html>"));
        record.article_publish_date = Some("2024-01-01 10:00:00".to_string());
        record.modified_date = record.article_publish_date.clone();

        let json = serde_json::to_value(&record).unwrap();
        let obj = json.as_object().unwrap();
        for key in [
            "url",
            "source_domain",
            "article_title",
            "article_author",
            "article_text",
            "article_publish_date",
            "modified_date",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert!(!obj.contains_key("count_comment"));
        assert!(!obj.contains_key("entities"));
        assert!(!obj.contains_key("raw_document"));
    }

    #[test]
    fn test_record_serializes_count_as_integer() {
        let mut record = ArticleRecord::new("https://example.com/a");
        record.count_comment = Some(1234);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["count_comment"], serde_json::json!(1234));
    }
}
