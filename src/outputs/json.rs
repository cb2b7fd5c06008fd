//! JSON-lines output of reconciled records.
//!
//! Every record is serialized with its canonical keys and appended as one
//! line to a file named after the local date of the run:
//!
//! ```text
//! output_dir/
//! └── 2025-05-06.jsonl
//! ```

use crate::models::ArticleRecord;
use chrono::Local;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, instrument};

/// Serialize `records` as JSON lines.
pub fn to_json_lines(records: &[ArticleRecord]) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}

/// Append `records` to `{output_dir}/{date}.jsonl`, creating directory and
/// file as needed. Returns the path written.
#[instrument(level = "info", skip_all, fields(%output_dir, count = records.len()))]
pub async fn append_records(
    records: &[ArticleRecord],
    output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let lines = to_json_lines(records)?;

    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(%output_dir, error = %e, "Failed to create output dir");
        return Err(e.into());
    }

    let path = PathBuf::from(output_dir).join(format!("{}.jsonl", Local::now().date_naive()));
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await?;
    file.write_all(lines.as_bytes()).await?;
    file.flush().await?;
    info!(path = %path.display(), "Wrote records");

    Ok(path)
}
