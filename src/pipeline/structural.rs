//! Structural fallback extraction of the article body.
//!
//! When the baseline extractor left `article_text` empty, the matched site
//! profile's selectors are applied to the raw document: every match of the
//! primary selector is joined with a single space and cleaned; if that comes
//! out empty the fallback selector gets the same treatment.
//!
//! In [`OverrideMode::AuthorMatch`] the body is also recomputed for records
//! whose byline carries the profile's author marker, even when the baseline
//! text is present.

use super::{OverrideMode, StageContext, StageOutcome};
use crate::document::Document;
use crate::error::StageError;
use crate::models::ArticleRecord;
use crate::sites::SiteProfile;
use crate::text::TextCleaner;
use tracing::debug;

pub(super) fn apply<F>(
    record: &mut ArticleRecord,
    ctx: &StageContext<'_, F>,
) -> Result<StageOutcome, StageError> {
    let Some(profile) = ctx.profile else {
        return Ok(StageOutcome::Skipped("no site profile".into()));
    };

    let author_override = ctx.options.override_mode == OverrideMode::AuthorMatch
        && matches!(
            (&record.article_author, &profile.author_marker),
            (Some(author), Some(marker)) if author.mentions(marker)
        );
    if !record.text_is_empty() && !author_override {
        return Ok(StageOutcome::Skipped("baseline text present".into()));
    }

    let Some(document) = record.raw_document.as_ref() else {
        return Ok(StageOutcome::Skipped("no document".into()));
    };

    let text = extract_body(document, profile, ctx.cleaner)?;
    debug!(
        profile = %profile.token,
        chars = text.len(),
        author_override,
        "Recovered body from site selectors"
    );
    record.article_text = Some(text);
    Ok(StageOutcome::Applied)
}

/// Body text from the first of the profile's selectors that yields any.
pub fn extract_body(
    document: &Document,
    profile: &SiteProfile,
    cleaner: &TextCleaner,
) -> Result<String, StageError> {
    let mut last = profile.primary_selector.as_str();
    for selector in profile.body_selectors() {
        last = selector;
        let joined = document.select_html(selector)?.join(" ");
        let text = match profile.cleanup_literal.as_deref() {
            Some(literal) => cleaner.clean_without(&joined, literal),
            None => cleaner.clean(&joined),
        };
        if !text.is_empty() {
            return Ok(text);
        }
        debug!(%selector, "Selector yielded no text");
    }
    Err(StageError::ExtractionMiss {
        selector: last.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;
    use crate::models::Author;
    use crate::pipeline::PipelineOptions;
    use crate::sites::SiteRegistry;

    fn run(
        record: &mut ArticleRecord,
        registry: &SiteRegistry,
        options: &PipelineOptions,
    ) -> Result<StageOutcome, StageError> {
        let fetcher = StaticFetcher::new();
        let cleaner = TextCleaner::new();
        let ctx = StageContext {
            profile: registry.match_url(&record.url),
            fetcher: &fetcher,
            cleaner: &cleaner,
            options,
        };
        apply(record, &ctx)
    }

    fn record(url: &str, body: &str) -> ArticleRecord {
        ArticleRecord::new(url).with_document(Document::new(url, body))
    }

    #[test]
    fn test_fallback_selector_used_when_primary_empty() {
        let registry = SiteRegistry::new(vec![
            SiteProfile::new("kompas.com", ".read__content").fallback(".isi__berita"),
        ])
        .unwrap();
        let mut rec = record(
            "https://www.kompas.com/article/x",
            r#"<html><body><div class="read__content">  </div><p class="isi__berita">Berita lengkap</p></body></html>"#,
        );
        let outcome = run(&mut rec, &registry, &PipelineOptions::default()).unwrap();
        assert_eq!(outcome, StageOutcome::Applied);
        assert_eq!(rec.article_text.as_deref(), Some("Berita lengkap"));
    }

    #[test]
    fn test_primary_matches_joined_with_space() {
        let registry = SiteRegistry::builtin();
        let mut rec = record(
            "https://nasional.kompas.com/read/x",
            r#"<div class="read__content"><p>Satu</p></div><div class="read__content"><b>Dua</b></div>"#,
        );
        run(&mut rec, &registry, &PipelineOptions::default()).unwrap();
        assert_eq!(rec.article_text.as_deref(), Some("Satu Dua"));
    }

    #[test]
    fn test_no_match_leaves_text_untouched() {
        let registry = SiteRegistry::builtin();
        let mut rec = record("https://www.kompas.com/read/x", "<html><body><p>x</p></body></html>");
        rec.article_text = Some(String::new());
        let err = run(&mut rec, &registry, &PipelineOptions::default()).unwrap_err();
        assert!(err.is_miss());
        assert_eq!(rec.article_text.as_deref(), Some(""));
    }

    #[test]
    fn test_cleanup_literal_stripped() {
        let registry = SiteRegistry::builtin();
        let mut rec = record(
            "https://news.detik.com/berita/d-1/x",
            r#"<div class="detail__body-text"><p>Jakarta -</p><div class="parallaxindetail">ADVERTISEMENT</div>
               <p class="para_caption">SCROLL TO RESUME CONTENT</p><p>Isi berita.</p></div>"#,
        );
        run(&mut rec, &registry, &PipelineOptions::default()).unwrap();
        assert_eq!(rec.article_text.as_deref(), Some("Jakarta - Isi berita."));
    }

    #[test]
    fn test_baseline_text_kept_by_default() {
        let registry = SiteRegistry::builtin();
        let mut rec = record(
            "https://www.kompas.com/read/x",
            r#"<div class="read__content"><p>Versi situs</p></div>"#,
        );
        rec.article_text = Some("Versi baseline".to_string());
        rec.article_author = Some(Author::One("Kompas Cyber Media".to_string()));
        let outcome = run(&mut rec, &registry, &PipelineOptions::default()).unwrap();
        assert!(matches!(outcome, StageOutcome::Skipped(_)));
        assert_eq!(rec.article_text.as_deref(), Some("Versi baseline"));
    }

    #[test]
    fn test_author_match_mode_overrides() {
        let registry = SiteRegistry::builtin();
        let options = PipelineOptions {
            override_mode: OverrideMode::AuthorMatch,
            ..Default::default()
        };
        let mut rec = record(
            "https://www.kompas.com/read/x",
            r#"<div class="read__content"><p>Versi situs</p></div>"#,
        );
        rec.article_text = Some("Versi baseline".to_string());
        rec.article_author = Some(Author::Many(vec!["Rina".into(), "KOMPAS.com".into()]));
        run(&mut rec, &registry, &options).unwrap();
        assert_eq!(rec.article_text.as_deref(), Some("Versi situs"));

        // byline without the marker keeps the baseline
        let mut rec = record(
            "https://www.kompas.com/read/x",
            r#"<div class="read__content"><p>Versi situs</p></div>"#,
        );
        rec.article_text = Some("Versi baseline".to_string());
        rec.article_author = Some(Author::One("Reuters".into()));
        run(&mut rec, &registry, &options).unwrap();
        assert_eq!(rec.article_text.as_deref(), Some("Versi baseline"));
    }

    #[test]
    fn test_empty_baseline_with_profile_never_panics() {
        let registry = SiteRegistry::builtin();
        let bodies = [
            "",
            "<html>",
            "<div class=\"read__content\"><script>x</script></div>",
            "<<<>>>",
            "<div class=\"read__content\">ok</div>",
        ];
        for body in bodies {
            let mut rec = record("https://www.kompas.com/read/x", body);
            let _ = run(&mut rec, &registry, &PipelineOptions::default());
            match rec.article_text.as_deref() {
                None => {}
                Some(text) => assert!(!text.is_empty() && !text.contains('<')),
            }
        }
    }
}
