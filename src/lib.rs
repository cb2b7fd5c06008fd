//! # news_reconcile
//!
//! Repairs article records produced by a news crawler's generic extractor.
//!
//! A crawl layer fetches a page and fills an [`ArticleRecord`] as best it
//! can. Many sites defeat generic extraction: the body comes back empty,
//! the article is split over several pages, the structured `dateModified`
//! is nonsense, the comment counter is buried in free text. The
//! [`Pipeline`] runs the record through per-site fallbacks and
//! normalizers and always hands back a record, with whatever fields could
//! be recovered.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use news_reconcile::{
//!     ArticleRecord, Document, Pipeline, PipelineOptions, SiteRegistry, StaticFetcher,
//! };
//!
//! # async fn demo() {
//! let url = "https://www.kompas.com/read/2024/02/01/x";
//! let record = ArticleRecord::new(url)
//!     .with_document(Document::new(url, "<div class=\"read__content\"><p>Isi</p></div>"));
//! let pipeline = Pipeline::new(
//!     SiteRegistry::builtin(),
//!     StaticFetcher::new(),
//!     PipelineOptions::default(),
//! );
//! let record = pipeline.run(record).await;
//! assert_eq!(record.article_text.as_deref(), Some("Isi"));
//! # }
//! ```

pub mod baseline;
pub mod dates;
pub mod document;
pub mod error;
pub mod fetch;
pub mod models;
pub mod outputs;
pub mod pipeline;
pub mod readability;
pub mod sites;
pub mod text;

pub use document::Document;
pub use error::{ConfigError, FetchError, StageError};
pub use fetch::{FetchDocument, HttpFetcher, LocalFileFetch, RetryFetch, StaticFetcher};
pub use models::{ArticleRecord, Author};
pub use pipeline::{
    OverrideMode, Pipeline, PipelineOptions, PipelineReport, PipelineState, Stage, StageOutcome,
};
pub use sites::{SiteProfile, SiteRegistry};
pub use text::TextCleaner;
