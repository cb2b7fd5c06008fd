//! Output sinks for reconciled records.
//!
//! # Submodules
//!
//! - [`json`]: Appends records as JSON lines, one file per day
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── 2025-05-06.jsonl
//! └── 2025-05-07.jsonl
//! ```

pub mod json;
