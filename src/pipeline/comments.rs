//! Comment-count normalization.
//!
//! Comment counters are free text ("1,234 Comments", "Komentar (12)"). The
//! selectors are tried in priority order; the first one whose match has any
//! text wins, even if that text turns out to hold no number. Digits are
//! taken from the first number in the text, thousands separators included.

use super::{StageContext, StageOutcome};
use crate::error::StageError;
use crate::models::ArticleRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Global comment-count selectors, highest priority first.
pub const DEFAULT_COMMENT_SELECTORS: &[&str] = &[
    ".total-comment",
    ".total_comment",
    "#total_comment",
    ".comment-count",
    ".comments-count",
    ".share-box",
];

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,3}(?:[.,]\d{3})+|\d+").unwrap());

pub(super) fn apply<F>(
    record: &mut ArticleRecord,
    ctx: &StageContext<'_, F>,
) -> Result<StageOutcome, StageError> {
    if record.count_comment.is_some() {
        return Ok(StageOutcome::Skipped("count_comment already set".into()));
    }
    let Some(document) = record.raw_document.as_ref() else {
        return Ok(StageOutcome::Skipped("no document".into()));
    };

    let profile_selectors = ctx
        .profile
        .map(|p| p.comment_selectors.as_slice())
        .unwrap_or_default();
    let selectors = profile_selectors
        .iter()
        .chain(ctx.options.comment_selectors.iter());

    let mut last = None;
    for selector in selectors {
        last = Some(selector);
        let Some(text) = document
            .select_html(selector)?
            .iter()
            .map(|fragment| ctx.cleaner.clean(fragment))
            .find(|text| !text.is_empty())
        else {
            continue;
        };

        let count = parse_count(&text).ok_or(StageError::FieldCoercion { fragment: text })?;
        debug!(%selector, count, "Normalized comment count");
        record.count_comment = Some(count);
        return Ok(StageOutcome::Applied);
    }

    Err(StageError::ExtractionMiss {
        selector: last.cloned().unwrap_or_default(),
    })
}

/// Integer value of a comment-count fragment.
///
/// Plain integers are taken as they are; otherwise the first number in the
/// text is used, with `,`/`.` thousands separators removed.
pub fn parse_count(text: &str) -> Option<u64> {
    let text = text.trim();
    if let Ok(n) = text.parse::<u64>() {
        return Some(n);
    }
    let digits: String = NUMBER_RE
        .find(text)?
        .as_str()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::fetch::StaticFetcher;
    use crate::pipeline::PipelineOptions;
    use crate::sites::SiteProfile;
    use crate::text::TextCleaner;

    fn run(
        record: &mut ArticleRecord,
        profile: Option<&SiteProfile>,
    ) -> Result<StageOutcome, StageError> {
        let fetcher = StaticFetcher::new();
        let cleaner = TextCleaner::new();
        let options = PipelineOptions::default();
        let ctx = StageContext {
            profile,
            fetcher: &fetcher,
            cleaner: &cleaner,
            options: &options,
        };
        apply(record, &ctx)
    }

    fn record(body: &str) -> ArticleRecord {
        let url = "https://example.com/a";
        ArticleRecord::new(url).with_document(Document::new(url, body))
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("1,234 Comments"), Some(1234));
        assert_eq!(parse_count("42"), Some(42));
        assert_eq!(parse_count(" 7 "), Some(7));
        assert_eq!(parse_count("Komentar (12)"), Some(12));
        assert_eq!(parse_count("1.234.567 komentar"), Some(1_234_567));
        assert_eq!(parse_count("No comments yet"), None);
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("99999999999999999999999"), None);
    }

    #[test]
    fn test_first_selector_hit_wins() {
        let mut rec = record(
            r#"<div class="share-box">Bagikan 99</div><span class="total-comment"><b>1,234</b> Comments</span>"#,
        );
        assert_eq!(run(&mut rec, None).unwrap(), StageOutcome::Applied);
        assert_eq!(rec.count_comment, Some(1234));
    }

    #[test]
    fn test_hit_without_digits_stops_search() {
        let mut rec = record(
            r#"<span class="total-comment">Belum ada komentar</span><div class="share-box">5</div>"#,
        );
        let err = run(&mut rec, None).unwrap_err();
        assert!(matches!(err, StageError::FieldCoercion { .. }));
        assert_eq!(rec.count_comment, None);
    }

    #[test]
    fn test_empty_match_falls_through() {
        let mut rec = record(
            r#"<span class="total-comment"> </span><div class="share-box">5 shares</div>"#,
        );
        run(&mut rec, None).unwrap();
        assert_eq!(rec.count_comment, Some(5));
    }

    #[test]
    fn test_profile_selectors_first() {
        let mut profile = SiteProfile::new("example.com", "article");
        profile.comment_selectors = vec![".komentar-jumlah".to_string()];
        let mut rec = record(
            r#"<span class="total-comment">3</span><em class="komentar-jumlah">8 komentar</em>"#,
        );
        run(&mut rec, Some(&profile)).unwrap();
        assert_eq!(rec.count_comment, Some(8));
    }

    #[test]
    fn test_no_selector_matches_is_miss() {
        let mut rec = record("<p>tanpa komentar</p>");
        assert!(run(&mut rec, None).unwrap_err().is_miss());
        assert_eq!(rec.count_comment, None);
    }

    #[test]
    fn test_idempotent_on_normalized_record() {
        let mut rec = record(r#"<span class="total-comment">1,234 Comments</span>"#);
        run(&mut rec, None).unwrap();
        let first = rec.count_comment;
        let outcome = run(&mut rec, None).unwrap();
        assert!(matches!(outcome, StageOutcome::Skipped(_)));
        assert_eq!(rec.count_comment, first);
        assert_eq!(first, Some(1234));
    }
}
