//! Modified-date reconciliation from embedded JSON-LD.
//!
//! By default `modified_date` equals the publish date (or the download time).
//! This stage looks for the site's own `dateModified` in the page's
//! `application/ld+json` blocks. Some sites emit nonsense there, so a
//! candidate that precedes the publish date by more than the plausibility
//! window is discarded in favor of the publish date.
//!
//! When the record arrives without its document, the URL is fetched again
//! through the same [`FetchDocument`] collaborator, bounded by
//! `fetch_timeout`.

use super::{StageContext, StageOutcome};
use crate::dates::{self, format_timestamp, parse_timestamp};
use crate::document::Document;
use crate::error::{FetchError, StageError};
use crate::fetch::FetchDocument;
use crate::models::ArticleRecord;
use chrono::NaiveDateTime;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, warn};

/// How deep into nested JSON-LD (`@graph`, arrays, wrapper objects) to look.
const MAX_DEPTH: usize = 4;

pub(super) async fn apply<F>(
    record: &mut ArticleRecord,
    ctx: &StageContext<'_, F>,
) -> Result<StageOutcome, StageError>
where
    F: FetchDocument,
{
    let refetched;
    let document = match record.raw_document.as_ref() {
        Some(doc) => doc,
        None => {
            debug!(url = %record.url, "No document attached; fetching again");
            let fetch = ctx.fetcher.fetch(&record.url);
            refetched = match timeout(ctx.options.fetch_timeout, fetch).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(FetchError::Timeout {
                        url: record.url.clone(),
                        timeout: ctx.options.fetch_timeout,
                    }
                    .into());
                }
            };
            &refetched
        }
    };

    let scan = scan_json_ld(document);
    let Some(candidate) = scan.found else {
        if scan.malformed > 0 {
            return Err(StageError::MalformedMetadata(format!(
                "{} of {} JSON-LD blocks unparseable",
                scan.malformed, scan.blocks
            )));
        }
        return Ok(StageOutcome::Skipped("no dateModified in structured data".into()));
    };

    let publish = record
        .article_publish_date
        .as_deref()
        .and_then(parse_timestamp)
        .ok_or_else(|| StageError::MissingPublishDate(record.article_publish_date.clone()))?;

    let modified = if dates::is_plausible(&publish, &candidate, ctx.options.plausibility_years) {
        candidate
    } else {
        warn!(
            url = %record.url,
            candidate = %format_timestamp(&candidate),
            publish = %format_timestamp(&publish),
            "dateModified outside plausibility window; using publish date"
        );
        publish
    };
    record.modified_date = Some(format_timestamp(&modified));
    Ok(StageOutcome::Applied)
}

/// First parseable `dateModified` across the document's JSON-LD blocks, in
/// document order. Blocks that are not valid JSON, lack the field, or carry
/// an unparseable date are skipped.
pub fn find_date_modified(document: &Document) -> Option<NaiveDateTime> {
    scan_json_ld(document).found
}

struct Scan {
    found: Option<NaiveDateTime>,
    blocks: usize,
    malformed: usize,
}

fn scan_json_ld(document: &Document) -> Scan {
    let blocks = document.json_ld_blocks();
    let mut scan = Scan {
        found: None,
        blocks: blocks.len(),
        malformed: 0,
    };
    for (i, raw) in blocks.iter().enumerate() {
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(value) => {
                if let Some(ts) = date_modified_in(&value, 0) {
                    scan.found = Some(ts);
                    break;
                }
                debug!(block = i, "JSON-LD block has no usable dateModified");
            }
            Err(e) => {
                scan.malformed += 1;
                debug!(block = i, error = %e, "Skipping malformed JSON-LD block");
            }
        }
    }
    scan
}

/// Depth-first over objects and arrays; object members are visited in the
/// order they appear in the source.
fn date_modified_in(value: &Value, depth: usize) -> Option<NaiveDateTime> {
    if depth > MAX_DEPTH {
        return None;
    }
    match value {
        Value::Object(map) => {
            if let Some(ts) = map
                .get("dateModified")
                .and_then(Value::as_str)
                .and_then(parse_timestamp)
            {
                return Some(ts);
            }
            map.values()
                .filter(|v| v.is_object() || v.is_array())
                .find_map(|v| date_modified_in(v, depth + 1))
        }
        Value::Array(items) => items.iter().find_map(|v| date_modified_in(v, depth + 1)),
        _ => None,
    }
}
