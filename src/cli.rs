//! Command-line interface definitions.
//!
//! All options can be given as flags or environment variables.

use clap::Parser;
use std::path::PathBuf;

/// Fetch news articles and reconcile their extracted records.
///
/// # Examples
///
/// ```sh
/// # Reconcile two articles into ./records
/// news_reconcile -o ./records https://www.kompas.com/read/2024/02/01/x https://news.detik.com/berita/d-1/y
///
/// # Read URLs from a file, use a custom site registry
/// news_reconcile -o ./records --url-file urls.txt --sites sites.yaml
///
/// # Reconcile pages saved under ./pages without network access
/// news_reconcile -o ./records root://./pages
///
/// # Verify stage isolation with a failing stage before date reconciliation
/// news_reconcile -o ./records --inject-fault date_reconcile https://www.kompas.com/read/x
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Article URLs to process; `file://<page>` and `root://<dir>` read saved HTML
    pub urls: Vec<String>,

    /// File with one article URL per line
    #[arg(long, env = "NEWS_RECONCILE_URL_FILE")]
    pub url_file: Option<PathBuf>,

    /// Output directory for JSON-lines records
    #[arg(short, long, env = "NEWS_RECONCILE_OUTPUT_DIR")]
    pub output_dir: String,

    /// YAML site registry replacing the built-in profiles
    #[arg(short, long, env = "NEWS_RECONCILE_SITES")]
    pub sites: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, env = "NEWS_RECONCILE_TIMEOUT_SECS", default_value_t = 15)]
    pub timeout_secs: u64,

    /// Retries for transient fetch failures
    #[arg(long, env = "NEWS_RECONCILE_RETRIES", default_value_t = 2)]
    pub retries: usize,

    /// Recompute the body whenever the byline names the site, not only when it is empty
    #[arg(long)]
    pub strict_author_override: bool,

    /// Insert an always-failing stage before the named stage (or "end")
    #[arg(long, value_name = "STAGE")]
    pub inject_fault: Vec<String>,

    /// User-Agent header for requests
    #[arg(long, env = "NEWS_RECONCILE_USER_AGENT")]
    pub user_agent: Option<String>,
}
