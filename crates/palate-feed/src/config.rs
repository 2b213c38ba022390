//! Engine configuration
//!
//! Loaded from TOML; every key is optional.
//!
//! ```toml
//! page_size = 18
//! roster_ttl_secs = 1800
//! page_ttl_secs = 300
//! search_debounce_ms = 500
//! include_photos = false
//! ```

use crate::error::FeedError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Feed engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Items per page
    pub page_size: usize,
    /// Friend roster cache lifetime
    pub roster_ttl_secs: u64,
    /// Fetched-page cache lifetime
    pub page_ttl_secs: u64,
    /// Corpus count cache lifetime
    pub metadata_ttl_secs: u64,
    /// Quiet period before typed search text is applied
    pub search_debounce_ms: u64,
    /// Upper bound for every remote call
    pub remote_timeout_ms: u64,
    /// Maximum cached pages
    pub page_cache_capacity: u64,
    /// Whether page queries project photo references
    pub include_photos: bool,
}

impl FeedConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML
    ///
    /// # Errors
    /// Returns `FeedError::Config` on malformed TOML or invalid values
    pub fn from_toml_str(raw: &str) -> Result<Self, FeedError> {
        let config: Self = toml::from_str(raw).map_err(|e| FeedError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// Returns `FeedError::Config` if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| FeedError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Reject values the engine cannot run with
    ///
    /// # Errors
    /// Returns `FeedError::Config` naming the first offending key
    pub fn validate(&self) -> Result<(), FeedError> {
        let zero = [
            ("page_size", self.page_size as u64),
            ("roster_ttl_secs", self.roster_ttl_secs),
            ("page_ttl_secs", self.page_ttl_secs),
            ("metadata_ttl_secs", self.metadata_ttl_secs),
            ("search_debounce_ms", self.search_debounce_ms),
            ("remote_timeout_ms", self.remote_timeout_ms),
            ("page_cache_capacity", self.page_cache_capacity),
        ]
        .into_iter()
        .find(|(_, v)| *v == 0);

        match zero {
            Some((key, _)) => Err(FeedError::Config(format!("{key} must be greater than zero"))),
            None => Ok(()),
        }
    }

    /// With page size
    #[inline]
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// With search debounce
    #[inline]
    #[must_use]
    pub fn with_search_debounce(mut self, quiet: Duration) -> Self {
        self.search_debounce_ms = quiet.as_millis() as u64;
        self
    }

    /// With remote timeout
    #[inline]
    #[must_use]
    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// With photo projection
    #[inline]
    #[must_use]
    pub fn with_photos(mut self, include_photos: bool) -> Self {
        self.include_photos = include_photos;
        self
    }

    /// Roster TTL
    #[must_use]
    pub fn roster_ttl(&self) -> Duration {
        Duration::from_secs(self.roster_ttl_secs)
    }

    /// Page TTL
    #[must_use]
    pub fn page_ttl(&self) -> Duration {
        Duration::from_secs(self.page_ttl_secs)
    }

    /// Metadata TTL
    #[must_use]
    pub fn metadata_ttl(&self) -> Duration {
        Duration::from_secs(self.metadata_ttl_secs)
    }

    /// Debounce quiet period
    #[must_use]
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// Remote call timeout
    #[must_use]
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: 18,
            roster_ttl_secs: 30 * 60,
            page_ttl_secs: 5 * 60,
            metadata_ttl_secs: 10 * 60,
            search_debounce_ms: 500,
            remote_timeout_ms: 10_000,
            page_cache_capacity: 512,
            include_photos: true,
        }
    }
}
