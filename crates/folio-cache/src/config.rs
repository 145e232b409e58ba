//! Cache and revalidation configuration.

use std::time::Duration;

use folio_core::{defaults, Error, Result};

/// Configuration for [`crate::EntityCache`] and [`crate::RevalidationScheduler`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Entries younger than this are served without fetching.
    pub hard_ttl: Duration,
    /// Entries older than this trigger a background refresh when served.
    pub soft_ttl: Duration,
    /// Period of the passive revalidation timer.
    pub revalidate_interval: Duration,
    /// Page size requested when caching the documents list.
    pub documents_page_limit: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            hard_ttl: Duration::from_secs(defaults::CACHE_HARD_TTL_SECS),
            soft_ttl: Duration::from_secs(defaults::CACHE_SOFT_TTL_SECS),
            revalidate_interval: Duration::from_secs(defaults::REVALIDATE_INTERVAL_SECS),
            documents_page_limit: defaults::DOCUMENTS_PAGE_LIMIT,
        }
    }
}

impl CacheConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `FOLIO_CACHE_HARD_TTL_SECS` | `30` | Serve-without-fetch window |
    /// | `FOLIO_CACHE_SOFT_TTL_SECS` | `10` | Age that triggers background refresh |
    /// | `FOLIO_REVALIDATE_INTERVAL_SECS` | `60` | Passive revalidation period |
    /// | `FOLIO_DOCUMENTS_PAGE_LIMIT` | `100` | Documents requested per fetch |
    pub fn from_env() -> Self {
        fn secs(var: &str, default: u64) -> Duration {
            Duration::from_secs(
                std::env::var(var)
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(default),
            )
        }

        Self {
            hard_ttl: secs("FOLIO_CACHE_HARD_TTL_SECS", defaults::CACHE_HARD_TTL_SECS),
            soft_ttl: secs("FOLIO_CACHE_SOFT_TTL_SECS", defaults::CACHE_SOFT_TTL_SECS),
            revalidate_interval: secs(
                "FOLIO_REVALIDATE_INTERVAL_SECS",
                defaults::REVALIDATE_INTERVAL_SECS,
            ),
            documents_page_limit: std::env::var("FOLIO_DOCUMENTS_PAGE_LIMIT")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(defaults::DOCUMENTS_PAGE_LIMIT)
                .max(1),
        }
    }

    pub fn with_ttls(mut self, soft: Duration, hard: Duration) -> Self {
        self.soft_ttl = soft;
        self.hard_ttl = hard;
        self
    }

    pub fn with_revalidate_interval(mut self, interval: Duration) -> Self {
        self.revalidate_interval = interval;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.soft_ttl > self.hard_ttl {
            return Err(Error::Config(format!(
                "soft TTL ({:?}) must not exceed hard TTL ({:?})",
                self.soft_ttl, self.hard_ttl
            )));
        }
        if self.revalidate_interval.is_zero() {
            return Err(Error::Config(
                "revalidate interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
