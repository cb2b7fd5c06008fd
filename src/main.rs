//! # news_reconcile
//!
//! Fetches news articles, builds a baseline record for each page and runs
//! it through the reconciliation pipeline, appending the results as JSON
//! lines.
//!
//! ## Usage
//!
//! ```sh
//! news_reconcile -o ./records https://www.kompas.com/read/2024/02/01/x
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetching**: Download each URL (bounded retries, hard timeout)
//! 2. **Baseline**: Fill title/author/dates/body from generic page metadata
//! 3. **Reconciliation**: Site fallbacks, multi-page assembly, date and comment normalization
//! 4. **Output**: Append records to `{output_dir}/{date}.jsonl`

use clap::Parser;
use futures::stream::{self, StreamExt};
use news_reconcile::baseline::{build_record, request_url};
use news_reconcile::fetch::DEFAULT_USER_AGENT;
use news_reconcile::outputs::json;
use news_reconcile::{
    ArticleRecord, FetchDocument, HttpFetcher, OverrideMode, Pipeline, PipelineOptions,
    LocalFileFetch, RetryFetch, SiteRegistry, Stage,
};
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod utils;

use cli::Cli;
use utils::{ensure_writable_dir, expand_local_sources, parse_url_list, truncate_for_log};

/// Articles processed at once.
const CONCURRENCY: usize = 8;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_reconcile starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut urls = args.urls.clone();
    if let Some(ref path) = args.url_file {
        let contents = tokio::fs::read_to_string(path).await?;
        urls.extend(parse_url_list(&contents));
    }
    let urls = expand_local_sources(urls)?;
    if urls.is_empty() {
        warn!("No URLs given; nothing to do");
        return Ok(());
    }

    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Site registry & pipeline ----
    let registry = match args.sites {
        Some(ref path) => SiteRegistry::from_yaml_file(path)?,
        None => SiteRegistry::builtin(),
    };
    info!(profiles = registry.len(), "Site registry ready");

    let timeout = Duration::from_secs(args.timeout_secs);
    let user_agent = args.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
    let fetcher = LocalFileFetch::new(RetryFetch::new(
        HttpFetcher::new(timeout, user_agent)?,
        args.retries,
        Duration::from_millis(500),
    ));

    let options = PipelineOptions {
        override_mode: if args.strict_author_override {
            OverrideMode::AuthorMatch
        } else {
            OverrideMode::WhenEmpty
        },
        fetch_timeout: timeout,
        ..Default::default()
    };

    let mut pipeline = Pipeline::new(registry, fetcher, options);
    for name in &args.inject_fault {
        if name == "end" {
            pipeline = pipeline.inject_fault(None);
        } else if let Some(stage) = Stage::from_name(name) {
            pipeline = pipeline.inject_fault(Some(stage));
        } else {
            warn!(stage = %name, "Unknown stage for --inject-fault; ignoring");
        }
    }
    info!(stages = ?pipeline.stages(), "Pipeline configured");

    // ---- Fetch & reconcile ----
    let total = urls.len();
    let pipeline = &pipeline;
    let records: Vec<ArticleRecord> = stream::iter(urls)
        .map(move |url| async move { process_url(pipeline, &url).await })
        .buffer_unordered(CONCURRENCY)
        .filter_map(|opt| std::future::ready(opt))
        .collect()
        .await;

    info!(
        total,
        reconciled = records.len(),
        failed = total - records.len(),
        "Completed reconciliation"
    );

    // ---- Output ----
    if !records.is_empty() {
        if let Err(e) = json::append_records(&records, &args.output_dir).await {
            error!(error = %e, "Failed to write records");
            return Err(e);
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// Fetch one article and run it through the pipeline.
///
/// Returns `None` only when the page itself could not be fetched.
#[instrument(level = "info", skip_all, fields(%url))]
async fn process_url<F>(pipeline: &Pipeline<F>, url: &str) -> Option<ArticleRecord>
where
    F: FetchDocument,
{
    let document = match pipeline.fetcher().fetch(&request_url(url)).await {
        Ok(document) => document,
        Err(e) => {
            error!(error = %e, "Article fetch failed; skipping");
            return None;
        }
    };

    let record = build_record(document, pipeline.cleaner());
    debug!(
        title = record.article_title.as_deref(),
        baseline_text = %truncate_for_log(record.article_text.as_deref().unwrap_or(""), 120),
        "Baseline record built"
    );

    let (record, report) = pipeline.run_with_report(record).await;
    for stage in &report.stages {
        debug!(stage = %stage.stage, outcome = ?stage.outcome, "Stage outcome");
    }
    Some(record)
}
