//! Site profiles and the URL-to-profile matcher.
//!
//! Per-site behavior is data: each [`SiteProfile`] names a domain token and
//! the selectors that recover that site's article body. A new site is a new
//! registry entry, never new code.
//!
//! # Built-in Profiles
//!
//! | Token | Body selectors | Pagination | Notes |
//! |-------|----------------|------------|-------|
//! | `kompas.com` | `.read__content` | `.paging__link` | byline marker `kompas` |
//! | `detik.com` | `.detail__body-text` → `.itp_bodycontent` | `.detail__long-nav a` | ad marker stripped |
//! | `tempo.co` | `#isi` → `.detail-konten` | | |
//! | `liputan6.com` | `.article-content-body__item-content` → `.read-page--content` | `.paging__link` | |
//!
//! A fallback only helps when it can match outside the primary selector, so
//! it is never a descendant selector of the primary.
//!
//! A YAML file with the same fields can replace the built-in list:
//!
//! ```yaml
//! - token: detik.com
//!   primary_selector: .detail__body-text
//!   fallback_selector: .itp_bodycontent
//!   pagination_selector: .detail__long-nav a
//!   cleanup_literal: ADVERTISEMENT SCROLL TO RESUME CONTENT
//!   author_marker: detik
//! ```

use crate::document::parse_selector;
use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Declarative extraction rules for one site.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteProfile {
    /// Substring of the URL that identifies the site.
    pub token: String,
    pub primary_selector: String,
    #[serde(default)]
    pub fallback_selector: Option<String>,
    /// Links to continuation pages of the same article.
    #[serde(default)]
    pub pagination_selector: Option<String>,
    /// Literal noise string removed from recovered body text.
    #[serde(default)]
    pub cleanup_literal: Option<String>,
    /// Byline substring that marks the site's own articles.
    #[serde(default)]
    pub author_marker: Option<String>,
    /// Comment-count selectors tried before the global defaults.
    #[serde(default)]
    pub comment_selectors: Vec<String>,
}

impl SiteProfile {
    pub fn new(token: &str, primary_selector: &str) -> Self {
        Self {
            token: token.to_string(),
            primary_selector: primary_selector.to_string(),
            fallback_selector: None,
            pagination_selector: None,
            cleanup_literal: None,
            author_marker: None,
            comment_selectors: Vec::new(),
        }
    }

    pub fn fallback(mut self, selector: &str) -> Self {
        self.fallback_selector = Some(selector.to_string());
        self
    }

    pub fn pagination(mut self, selector: &str) -> Self {
        self.pagination_selector = Some(selector.to_string());
        self
    }

    pub fn cleanup(mut self, literal: &str) -> Self {
        self.cleanup_literal = Some(literal.to_string());
        self
    }

    pub fn author_marker(mut self, marker: &str) -> Self {
        self.author_marker = Some(marker.to_string());
        self
    }

    /// Body selectors in the order they are tried.
    pub fn body_selectors(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_selector.as_str()).chain(self.fallback_selector.as_deref())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::EmptyToken);
        }
        let selectors = self
            .body_selectors()
            .chain(self.pagination_selector.as_deref())
            .chain(self.comment_selectors.iter().map(String::as_str));
        for selector in selectors {
            parse_selector(selector).map_err(|source| ConfigError::Profile {
                token: self.token.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Ordered, immutable set of site profiles.
#[derive(Debug, Clone)]
pub struct SiteRegistry {
    profiles: Vec<SiteProfile>,
}

impl SiteRegistry {
    /// Build a registry, validating every selector and rejecting duplicate tokens.
    /// Insertion order is the tie-break when several tokens match one URL.
    pub fn new(profiles: Vec<SiteProfile>) -> Result<Self, ConfigError> {
        for (i, profile) in profiles.iter().enumerate() {
            profile.validate()?;
            if profiles[..i].iter().any(|p| p.token == profile.token) {
                return Err(ConfigError::DuplicateToken(profile.token.clone()));
            }
        }
        Ok(Self { profiles })
    }

    /// The compiled-in profiles.
    pub fn builtin() -> Self {
        Self {
            profiles: builtin_profiles(),
        }
    }

    /// Load profiles from a YAML list.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let registry = Self::from_yaml_str(&raw)?;
        info!(count = registry.len(), "Loaded site registry");
        Ok(registry)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let profiles: Vec<SiteProfile> = serde_yaml::from_str(raw)?;
        Self::new(profiles)
    }

    /// First profile whose token occurs in `url`.
    pub fn match_url(&self, url: &str) -> Option<&SiteProfile> {
        let found = self.profiles.iter().find(|p| url.contains(&p.token));
        debug!(%url, profile = found.map(|p| p.token.as_str()), "Site match");
        found
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SiteProfile> {
        self.profiles.iter()
    }
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_profiles() -> Vec<SiteProfile> {
    vec![
        SiteProfile::new("kompas.com", ".read__content")
            .pagination(".paging__link")
            .author_marker("kompas"),
        SiteProfile::new("detik.com", ".detail__body-text")
            .fallback(".itp_bodycontent")
            .pagination(".detail__long-nav a")
            .cleanup("ADVERTISEMENT SCROLL TO RESUME CONTENT")
            .author_marker("detik"),
        SiteProfile::new("tempo.co", "#isi").fallback(".detail-konten"),
        SiteProfile::new("liputan6.com", ".article-content-body__item-content")
            .fallback(".read-page--content")
            .pagination(".paging__link"),
    ]
}
