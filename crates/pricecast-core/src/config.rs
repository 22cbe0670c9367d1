//! Loader configuration and its environment overrides.
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `PRICECAST_FETCH_TIMEOUT_MS` | [`LoaderConfig::fetch_timeout`] | `10000` |
//! | `PRICECAST_MAX_RETRIES` | [`RetryPolicy::max_retries`] | `2` |
//! | `PRICECAST_CACHE_TTL_SECS` | [`CachePolicy::ttl`] | unset (never expires) |
//! | `PRICECAST_CACHE_MAX_ENTRIES` | [`CachePolicy::max_entries`] | unset (unbounded) |
//! | `PRICECAST_REQUESTS_PER_MINUTE` | [`LoaderConfig::requests_per_minute`] | `60` |

use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;

use crate::{CachePolicy, RetryPolicy};

pub const ENV_FETCH_TIMEOUT_MS: &str = "PRICECAST_FETCH_TIMEOUT_MS";
pub const ENV_MAX_RETRIES: &str = "PRICECAST_MAX_RETRIES";
pub const ENV_CACHE_TTL_SECS: &str = "PRICECAST_CACHE_TTL_SECS";
pub const ENV_CACHE_MAX_ENTRIES: &str = "PRICECAST_CACHE_MAX_ENTRIES";
pub const ENV_REQUESTS_PER_MINUTE: &str = "PRICECAST_REQUESTS_PER_MINUTE";

const DEFAULT_REQUESTS_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(60) {
    Some(value) => value,
    None => NonZeroU32::MIN,
};

#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    /// Upper bound for one upstream fetch attempt.
    pub fetch_timeout: Duration,
    pub retry: RetryPolicy,
    pub cache: CachePolicy,
    /// Client-side request budget for the upstream source.
    pub requests_per_minute: NonZeroU32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            cache: CachePolicy::unbounded(),
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
        }
    }
}

impl LoaderConfig {
    /// Defaults overridden by `PRICECAST_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns. Unparseable values
    /// are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_FETCH_TIMEOUT_MS) {
            config.fetch_timeout = Duration::from_millis(ms.max(1));
        }
        if let Some(retries) = parse_var::<u32, _>(&lookup, ENV_MAX_RETRIES) {
            config.retry.max_retries = retries;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_CACHE_TTL_SECS) {
            config.cache.ttl = Some(Duration::from_secs(secs));
        }
        if let Some(max) = parse_var::<usize, _>(&lookup, ENV_CACHE_MAX_ENTRIES) {
            config.cache.max_entries = Some(max.max(1));
        }
        if let Some(rpm) = parse_var::<NonZeroU32, _>(&lookup, ENV_REQUESTS_PER_MINUTE) {
            config.requests_per_minute = rpm;
        }

        config
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "ignoring unparseable setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_keep_cache_unbounded() {
        let config = LoaderConfig::default();
        assert_eq!(config.cache, CachePolicy::unbounded());
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.requests_per_minute.get(), 60);
    }

    #[test]
    fn environment_overrides_apply() {
        let config = LoaderConfig::from_lookup(lookup(&[
            (ENV_FETCH_TIMEOUT_MS, "2500"),
            (ENV_MAX_RETRIES, "0"),
            (ENV_CACHE_TTL_SECS, "600"),
            (ENV_CACHE_MAX_ENTRIES, "32"),
            (ENV_REQUESTS_PER_MINUTE, "5"),
        ]));

        assert_eq!(config.fetch_timeout, Duration::from_millis(2500));
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.cache.ttl, Some(Duration::from_secs(600)));
        assert_eq!(config.cache.max_entries, Some(32));
        assert_eq!(config.requests_per_minute.get(), 5);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = LoaderConfig::from_lookup(lookup(&[
            (ENV_FETCH_TIMEOUT_MS, "soon"),
            (ENV_REQUESTS_PER_MINUTE, "0"),
        ]));
        assert_eq!(config, LoaderConfig::default());
    }
}
