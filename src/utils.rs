//! Helpers for the command-line runner: log truncation, URL list reading,
//! local source expansion and output directory validation.

use std::error::Error;
use std::fs as stdfs;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Strings longer than `max` bytes are cut at the nearest character boundary
/// at or below `max` and get `"…(+N bytes)"` appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// URLs from a text file, one per line. Blank lines and `#` comments are skipped.
pub fn parse_url_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Replace every `root://<dir>` entry with `file://` URLs for the `.html`
/// files below `<dir>`, sorted by path. Other entries pass through as given.
pub fn expand_local_sources(sources: Vec<String>) -> std::io::Result<Vec<String>> {
    let mut out = Vec::with_capacity(sources.len());
    for source in sources {
        match source.strip_prefix("root://") {
            Some(root) => {
                let mut files = Vec::new();
                collect_html_files(Path::new(root), &mut files)?;
                files.sort();
                info!(root, count = files.len(), "Expanded local page directory");
                out.extend(files.iter().map(|f| format!("file://{}", f.display())));
            }
            None => out.push(source),
        }
    }
    Ok(out)
}

fn collect_html_files(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in stdfs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_html_files(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "html") {
            files.push(path);
        }
    }
    Ok(())
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
