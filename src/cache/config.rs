//! Page cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

pub(crate) const DEFAULT_HOME_TTL_SECS: u64 = 20;
pub(crate) const DEFAULT_KEY_PREFIX: &str = "index_page";
pub(crate) const DEFAULT_MAX_ENTRIES: usize = 256;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PageCacheConfig {
    /// Serve the home feed from cache.
    pub enabled: bool,
    /// Lifetime of a cached home feed page.
    pub home_ttl_seconds: u64,
    /// Fixed prefix shared by every home feed entry.
    pub key_prefix: String,
    /// Upper bound on stored pages; least recently used entries are evicted.
    pub max_entries: usize,
}

impl Default for PageCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            home_ttl_seconds: DEFAULT_HOME_TTL_SECS,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl From<&crate::config::CacheSettings> for PageCacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            home_ttl_seconds: settings.home_ttl.as_secs(),
            key_prefix: settings.key_prefix.clone(),
            max_entries: settings.max_entries.get(),
        }
    }
}

impl PageCacheConfig {
    pub fn home_ttl(&self) -> Duration {
        Duration::from_secs(self.home_ttl_seconds)
    }

    /// Returns the entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_home_feed_policy() {
        let config = PageCacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.home_ttl(), Duration::from_secs(20));
        assert_eq!(config.key_prefix, "index_page");
    }

    #[test]
    fn zero_entry_limit_is_clamped() {
        let config = PageCacheConfig {
            max_entries: 0,
            ..Default::default()
        };
        assert_eq!(config.max_entries_non_zero().get(), 1);
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let config: PageCacheConfig =
            serde_json::from_str(r#"{"home_ttl_seconds": 5}"#).expect("valid config");
        assert_eq!(config.home_ttl_seconds, 5);
        assert_eq!(config.max_entries, DEFAULT_MAX_ENTRIES);
        assert!(config.enabled);
    }
}
