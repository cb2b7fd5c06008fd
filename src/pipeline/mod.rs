//! The record reconciliation pipeline.
//!
//! A [`Pipeline`] takes an [`ArticleRecord`] produced by the crawl layer and
//! runs it through an ordered list of [`Stage`]s:
//!
//! ```text
//! Matched -> BodyResolved -> DateResolved -> FieldsResolved -> Done
//! ```
//!
//! | Stage | Module | Owns |
//! |-------|--------|------|
//! | Structural fallback | [`structural`] | `article_text` |
//! | Multi-page assembly | [`pagination`] | `article_text` |
//! | Date reconciliation | [`modified`] | `modified_date` |
//! | Comment count | [`comments`] | `count_comment` |
//!
//! Every stage computes its new value first and writes it in a single
//! assignment, so a record is always either before or after a stage for the
//! fields that stage owns. A stage error is logged and absorbed; the record
//! moves on to the next stage unchanged. [`Pipeline::run`] always returns a
//! record.

pub mod comments;
pub mod modified;
pub mod pagination;
pub mod structural;

use crate::dates::{self, PLAUSIBILITY_YEARS};
use crate::error::StageError;
use crate::fetch::FetchDocument;
use crate::models::ArticleRecord;
use crate::sites::{SiteProfile, SiteRegistry};
use crate::text::TextCleaner;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// When the structural fallback may replace the baseline body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverrideMode {
    /// Only when the baseline extractor left `article_text` empty.
    #[default]
    WhenEmpty,
    /// Also whenever the byline mentions the profile's author marker.
    AuthorMatch,
}

/// Tunables shared by all stages.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub override_mode: OverrideMode,
    /// Upper bound for any single fetch issued by a stage.
    pub fetch_timeout: Duration,
    pub plausibility_years: i64,
    /// Comment-count selectors, highest priority first.
    pub comment_selectors: Vec<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            override_mode: OverrideMode::WhenEmpty,
            fetch_timeout: Duration::from_secs(10),
            plausibility_years: PLAUSIBILITY_YEARS,
            comment_selectors: comments::DEFAULT_COMMENT_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Progress of a record through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    Matched,
    BodyResolved,
    DateResolved,
    FieldsResolved,
    Done,
}

/// One step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    StructuralFallback,
    MultiPage,
    DateReconcile,
    CommentCount,
    /// Fails on every record. For verifying stage isolation.
    AlwaysFail,
}

impl Stage {
    /// The standard order.
    pub const STANDARD: [Stage; 4] = [
        Stage::StructuralFallback,
        Stage::MultiPage,
        Stage::DateReconcile,
        Stage::CommentCount,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::StructuralFallback => "structural_fallback",
            Stage::MultiPage => "multi_page",
            Stage::DateReconcile => "date_reconcile",
            Stage::CommentCount => "comment_count",
            Stage::AlwaysFail => "always_fail",
        }
    }

    pub fn from_name(name: &str) -> Option<Stage> {
        [
            Stage::StructuralFallback,
            Stage::MultiPage,
            Stage::DateReconcile,
            Stage::CommentCount,
            Stage::AlwaysFail,
        ]
        .into_iter()
        .find(|s| s.name() == name)
    }

    /// State a record is in once this stage has been attempted.
    fn reaches(&self, current: PipelineState) -> PipelineState {
        let next = match self {
            Stage::StructuralFallback | Stage::MultiPage => PipelineState::BodyResolved,
            Stage::DateReconcile => PipelineState::DateResolved,
            Stage::CommentCount => PipelineState::FieldsResolved,
            Stage::AlwaysFail => current,
        };
        next.max(current)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a stage did to the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Applied,
    /// The stage did not apply; the record is unchanged.
    Skipped(String),
    /// The stage failed; the record is unchanged for the fields it owns.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub outcome: StageOutcome,
}

/// Per-record account of every stage attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub profile: Option<String>,
    pub state: PipelineState,
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.outcome)
    }

    pub fn failures(&self) -> usize {
        self.stages
            .iter()
            .filter(|r| matches!(r.outcome, StageOutcome::Failed(_)))
            .count()
    }
}

/// Borrowed view of the pipeline handed to each stage.
pub struct StageContext<'a, F> {
    pub profile: Option<&'a SiteProfile>,
    pub fetcher: &'a F,
    pub cleaner: &'a TextCleaner,
    pub options: &'a PipelineOptions,
}

/// Ordered chain of stages over a fixed site registry and fetcher.
#[derive(Debug)]
pub struct Pipeline<F> {
    registry: SiteRegistry,
    fetcher: F,
    cleaner: TextCleaner,
    options: PipelineOptions,
    stages: Vec<Stage>,
}

impl<F> Pipeline<F>
where
    F: FetchDocument,
{
    /// A pipeline running [`Stage::STANDARD`].
    pub fn new(registry: SiteRegistry, fetcher: F, options: PipelineOptions) -> Self {
        Self {
            registry,
            fetcher,
            cleaner: TextCleaner::new(),
            options,
            stages: Stage::STANDARD.to_vec(),
        }
    }

    /// Replace the stage list.
    pub fn with_stages(mut self, stages: Vec<Stage>) -> Self {
        self.stages = stages;
        self
    }

    /// Insert a failing stage before `before`, or at the end if `before`
    /// is not part of the chain.
    pub fn inject_fault(mut self, before: Option<Stage>) -> Self {
        let at = before
            .and_then(|b| self.stages.iter().position(|s| *s == b))
            .unwrap_or(self.stages.len());
        self.stages.insert(at, Stage::AlwaysFail);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn registry(&self) -> &SiteRegistry {
        &self.registry
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn cleaner(&self) -> &TextCleaner {
        &self.cleaner
    }

    /// Run all stages and return the finished record. Never fails.
    pub async fn run(&self, record: ArticleRecord) -> ArticleRecord {
        self.run_with_report(record).await.0
    }

    /// Run all stages, returning the finished record and what each stage did.
    #[instrument(level = "info", skip_all, fields(url = %record.url))]
    pub async fn run_with_report(
        &self,
        mut record: ArticleRecord,
    ) -> (ArticleRecord, PipelineReport) {
        let profile = self.registry.match_url(&record.url);
        let ctx = StageContext {
            profile,
            fetcher: &self.fetcher,
            cleaner: &self.cleaner,
            options: &self.options,
        };

        if record.modified_date.is_none() {
            record.modified_date = record
                .article_publish_date
                .as_deref()
                .and_then(dates::normalize_timestamp);
        }

        let mut report = PipelineReport {
            profile: profile.map(|p| p.token.clone()),
            state: PipelineState::Matched,
            stages: Vec::with_capacity(self.stages.len()),
        };

        for stage in &self.stages {
            let outcome = match self.run_stage(*stage, &mut record, &ctx).await {
                Ok(outcome) => {
                    debug!(stage = %stage, ?outcome, "Stage finished");
                    outcome
                }
                Err(e) if e.is_miss() => {
                    debug!(stage = %stage, reason = %e, "Stage found nothing");
                    StageOutcome::Skipped(e.to_string())
                }
                Err(e) => {
                    warn!(
                        stage = %stage,
                        url = %record.url,
                        error = %e,
                        "Stage failed; record passed through"
                    );
                    StageOutcome::Failed(e.to_string())
                }
            };
            report.state = stage.reaches(report.state);
            report.stages.push(StageReport {
                stage: *stage,
                outcome,
            });
        }

        self.enforce_plausible_modified(&mut record);
        record.take_document();
        report.state = PipelineState::Done;

        info!(
            profile = report.profile.as_deref(),
            failures = report.failures(),
            has_text = !record.text_is_empty(),
            count_comment = record.count_comment,
            "Record reconciled"
        );
        (record, report)
    }

    async fn run_stage(
        &self,
        stage: Stage,
        record: &mut ArticleRecord,
        ctx: &StageContext<'_, F>,
    ) -> Result<StageOutcome, StageError> {
        match stage {
            Stage::StructuralFallback => structural::apply(record, ctx),
            Stage::MultiPage => pagination::apply(record, ctx).await,
            Stage::DateReconcile => modified::apply(record, ctx).await,
            Stage::CommentCount => comments::apply(record, ctx),
            Stage::AlwaysFail => Err(StageError::InjectedFault(stage.name())),
        }
    }

    /// A caller-assigned `modified_date` older than the plausibility window
    /// is replaced by the publish date.
    fn enforce_plausible_modified(&self, record: &mut ArticleRecord) {
        let publish = record
            .article_publish_date
            .as_deref()
            .and_then(dates::parse_timestamp);
        let modified = record.modified_date.as_deref().and_then(dates::parse_timestamp);
        if let (Some(publish), Some(modified)) = (publish, modified) {
            if !dates::is_plausible(&publish, &modified, self.options.plausibility_years) {
                debug!(url = %record.url, "Implausible modified_date replaced by publish date");
                record.modified_date = Some(dates::format_timestamp(&publish));
            }
        }
    }
}
