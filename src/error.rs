//! Error types for fetching, pipeline stages and configuration loading.
//!
//! Stage errors never escape [`Pipeline::run`](crate::pipeline::Pipeline::run):
//! the orchestrator logs them and moves on to the next stage. They exist so
//! each stage can say precisely *why* it left a field untouched.

use std::time::Duration;

/// Failure of the document-fetch collaborator.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, TLS, connection reset, body decode).
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The fetch did not complete within the allotted time.
    #[error("fetching {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// A local `file://` document could not be read.
    #[error("cannot read {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// No document is known for this URL (fixture fetchers).
    #[error("no document available for {url}")]
    NotFound { url: String },
}

/// Why a pipeline stage left the record unchanged.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// A selector matched nothing. Not a fault; the stage is a no-op.
    #[error("no content matched {selector:?}")]
    ExtractionMiss { selector: String },

    /// Structured metadata was present but unusable.
    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),

    /// A fetch needed by the stage failed or timed out.
    #[error(transparent)]
    ExternalFetch(#[from] FetchError),

    /// A fragment that should hold a number held no digits.
    #[error("no integer found in {fragment:?}")]
    FieldCoercion { fragment: String },

    /// A selector in a site profile or option list could not be parsed.
    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// The record has no parseable publish date to validate against.
    #[error("article_publish_date missing or unparseable: {0:?}")]
    MissingPublishDate(Option<String>),

    /// Raised by a stage configured to always fail.
    #[error("injected fault in stage {0}")]
    InjectedFault(&'static str),
}

impl StageError {
    /// True for conditions that are expected on ordinary pages and should
    /// not be reported louder than `debug`.
    pub fn is_miss(&self) -> bool {
        matches!(self, StageError::ExtractionMiss { .. })
    }
}

/// Failure loading the site registry or other configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid site registry: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("site {token:?}: {source}")]
    Profile {
        token: String,
        #[source]
        source: StageError,
    },

    #[error("site token must not be empty")]
    EmptyToken,

    #[error("duplicate site token {0:?}")]
    DuplicateToken(String),
}
