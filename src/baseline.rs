//! Baseline record construction for the command-line runner.
//!
//! Mirrors what the crawl layer hands the pipeline: a record whose fields
//! are filled from generic page metadata and a site-agnostic readability
//! pass, with the fetched document attached.

use crate::dates::{format_timestamp, normalize_timestamp};
use crate::document::Document;
use crate::models::{ArticleRecord, Author};
use crate::readability;
use crate::text::TextCleaner;
use chrono::Utc;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;

static TITLE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [r#"meta[property="og:title"]"#, r#"meta[name="twitter:title"]"#]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

static TITLE_TAG: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());

static AUTHOR_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"meta[name="author"]"#,
        r#"meta[name="content_author"]"#,
        r#"meta[property="article:author"]"#,
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});

static PUBLISH_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"meta[property="article:published_time"]"#,
        r#"meta[name="content_PublishedDate"]"#,
        r#"meta[name="pubdate"]"#,
        r#"meta[name="publishdate"]"#,
        r#"meta[itemprop="datePublished"]"#,
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});

/// Kompas serves long articles split over pages unless asked for all of them.
pub fn request_url(url: &str) -> String {
    if url.starts_with("http") && url.contains("kompas.com/read/") && !url.contains("page=all") {
        let sep = if url.contains('?') { '&' } else { '?' };
        format!("{url}{sep}page=all")
    } else {
        url.to_string()
    }
}

/// Build the baseline record for a fetched document.
pub fn build_record(document: Document, cleaner: &TextCleaner) -> ArticleRecord {
    let (title, author, publish, text) = {
        let html = document.parse();
        (
            title(&html, cleaner),
            author(&html),
            publish_date(&html, &document),
            readability::extract_text(&html, cleaner),
        )
    };

    let mut record = ArticleRecord::new(document.url());
    record.article_title = title;
    record.article_author = author;
    record.article_text = Some(text).filter(|t| !t.is_empty());
    record.modified_date =
        Some(publish.clone().unwrap_or_else(|| format_timestamp(&Utc::now().naive_utc())));
    record.article_publish_date = publish;
    record.with_document(document)
}

fn meta_content(html: &Html, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|sel| {
        html.select(sel)
            .filter_map(|el| el.value().attr("content"))
            .map(str::trim)
            .find(|c| !c.is_empty())
            .map(str::to_string)
    })
}

fn title(html: &Html, cleaner: &TextCleaner) -> Option<String> {
    meta_content(html, &TITLE_SELECTORS)
        .or_else(|| {
            html.select(&TITLE_TAG)
                .next()
                .map(|el| el.text().collect::<String>())
        })
        .map(|t| cleaner.collapse_whitespace(&t))
        .filter(|t| !t.is_empty())
}

fn author(html: &Html) -> Option<Author> {
    let raw = meta_content(html, &AUTHOR_SELECTORS)?;
    let names: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect();
    match names.len() {
        0 => None,
        1 => names.into_iter().next().map(Author::One),
        _ => Some(Author::Many(names)),
    }
}

fn publish_date(html: &Html, document: &Document) -> Option<String> {
    meta_content(html, &PUBLISH_SELECTORS)
        .and_then(|raw| normalize_timestamp(&raw))
        .or_else(|| json_ld_date_published(document))
}

fn json_ld_date_published(document: &Document) -> Option<String> {
    document.json_ld_blocks().iter().find_map(|raw| {
        let value: Value = serde_json::from_str(raw.trim()).ok()?;
        let candidates = match &value {
            Value::Array(items) => items.iter().collect::<Vec<_>>(),
            Value::Object(map) => match map.get("@graph") {
                Some(Value::Array(items)) => items.iter().chain([&value]).collect(),
                _ => vec![&value],
            },
            _ => Vec::new(),
        };
        candidates
            .into_iter()
            .filter_map(|v| v.get("datePublished").and_then(Value::as_str))
            .find_map(normalize_timestamp)
    })
}
