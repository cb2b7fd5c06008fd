//! Multi-page article assembly.
//!
//! Profiles with a `pagination_selector` point at links to the remaining
//! pages of an article. Each continuation page is fetched in link order,
//! reduced to readable text and appended to the text already extracted for
//! the first page. A failed fetch ends the assembly: pages gathered so far
//! are kept and later pages are not attempted, so the body never has holes.

use super::{StageContext, StageOutcome};
use crate::error::{FetchError, StageError};
use crate::fetch::FetchDocument;
use crate::models::ArticleRecord;
use crate::readability;
use itertools::Itertools;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use url::Url;

pub(super) async fn apply<F>(
    record: &mut ArticleRecord,
    ctx: &StageContext<'_, F>,
) -> Result<StageOutcome, StageError>
where
    F: FetchDocument,
{
    let Some(selector) = ctx.profile.and_then(|p| p.pagination_selector.as_deref()) else {
        return Ok(StageOutcome::Skipped("no pagination selector".into()));
    };
    let Some(document) = record.raw_document.as_ref() else {
        return Ok(StageOutcome::Skipped("no document".into()));
    };

    let links = continuation_links(document.url(), &document.select_attr(selector, "href")?);
    if links.is_empty() {
        return Err(StageError::ExtractionMiss {
            selector: selector.to_string(),
        });
    }
    debug!(pages = links.len(), "Found continuation pages");

    let mut assembled = record.article_text.clone().unwrap_or_default();
    let mut appended = 0usize;
    let mut failure = None;

    for link in &links {
        let page = match timeout(ctx.options.fetch_timeout, ctx.fetcher.fetch(link)).await {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                failure = Some(e);
                break;
            }
            Err(_) => {
                failure = Some(FetchError::Timeout {
                    url: link.clone(),
                    timeout: ctx.options.fetch_timeout,
                });
                break;
            }
        };
        let text = readability::extract_text(&page.parse(), ctx.cleaner);
        if text.is_empty() {
            debug!(%link, "Continuation page had no readable text");
            continue;
        }
        if !assembled.is_empty() {
            assembled.push(' ');
        }
        assembled.push_str(&text);
        appended += 1;
    }

    match failure {
        Some(e) if appended == 0 => Err(e.into()),
        Some(e) => {
            warn!(
                appended,
                total = links.len(),
                error = %e,
                "Continuation fetch failed; keeping partial body"
            );
            record.article_text = Some(assembled);
            Ok(StageOutcome::Applied)
        }
        None if appended == 0 => Ok(StageOutcome::Skipped("continuation pages empty".into())),
        None => {
            info!(appended, "Assembled multi-page article");
            record.article_text = Some(assembled);
            Ok(StageOutcome::Applied)
        }
    }
}

/// Absolute, de-duplicated continuation URLs in document order, excluding
/// the page itself and non-HTTP targets.
fn continuation_links(page_url: &str, hrefs: &[String]) -> Vec<String> {
    let base = Url::parse(page_url).ok();
    let this_page = base.as_ref().map(|u| strip_fragment(u.clone()));

    hrefs
        .iter()
        .filter_map(|href| match &base {
            Some(base) => base.join(href.trim()).ok(),
            None => Url::parse(href.trim()).ok(),
        })
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .map(strip_fragment)
        .filter(|u| Some(u) != this_page.as_ref())
        .map(|u| u.to_string())
        .unique()
        .collect()
}

fn strip_fragment(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}
