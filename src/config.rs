// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Engine Configuration
 * Session-level tunables with environment variable overrides
 *
 * @copyright 2025 Bountyy Oy
 * @license Proprietary
 */

use crate::cache::ResourceCache;
use crate::rate_limiter::{ProviderRateLimiter, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,

    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_max_entries() -> usize {
    500
}

fn default_cache_ttl_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_cache_max_entries(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
    /// Management-plane ceiling shared by every scanner in the session
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Wait after a throttle response without a retry-after hint
    #[serde(default = "default_retry_after_ms")]
    pub default_retry_after_ms: u64,
}

fn default_requests_per_second() -> u32 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_retry_after_ms() -> u64 {
    1_000
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            default_retry_after_ms: default_retry_after_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorConfig {
    /// Scanner tasks allowed to run at once
    #[serde(default = "default_max_concurrent_scanners")]
    pub max_concurrent_scanners: usize,

    /// Whole-session deadline; unset means no deadline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_timeout_secs: Option<u64>,
}

fn default_max_concurrent_scanners() -> usize {
    5
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_scanners: default_max_concurrent_scanners(),
            session_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl EngineConfig {
    /// Defaults overridden by `VARTIJA_*` environment variables. Unparsable
    /// values fall back to the default with a warning rather than failing
    /// the scan.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.cache.max_entries =
            env_or("VARTIJA_CACHE_MAX_ENTRIES", config.cache.max_entries);
        config.cache.ttl_secs = env_or("VARTIJA_CACHE_TTL_SECS", config.cache.ttl_secs);

        config.rate_limit.requests_per_second =
            env_or("VARTIJA_REQUESTS_PER_SECOND", config.rate_limit.requests_per_second);
        config.rate_limit.request_timeout_secs = env_or(
            "VARTIJA_REQUEST_TIMEOUT_SECS",
            config.rate_limit.request_timeout_secs,
        );
        config.rate_limit.max_retries =
            env_or("VARTIJA_MAX_RETRIES", config.rate_limit.max_retries);

        config.orchestrator.max_concurrent_scanners = env_or(
            "VARTIJA_MAX_CONCURRENT_SCANNERS",
            config.orchestrator.max_concurrent_scanners,
        );
        if let Ok(value) = std::env::var("VARTIJA_SESSION_TIMEOUT_SECS") {
            match value.parse() {
                Ok(secs) => config.orchestrator.session_timeout_secs = Some(secs),
                Err(_) => warn!(
                    "[Config] Ignoring unparsable VARTIJA_SESSION_TIMEOUT_SECS='{}'",
                    value
                ),
            }
        }

        config
    }

    /// Fresh per-session cache sized from this config
    pub fn build_cache(&self) -> ResourceCache {
        ResourceCache::new(
            Duration::from_secs(self.cache.ttl_secs),
            self.cache.max_entries,
        )
    }

    /// Fresh per-session rate limiter from this config
    pub fn build_rate_limiter(&self) -> ProviderRateLimiter {
        let policy = RetryPolicy {
            max_retries: self.rate_limit.max_retries,
            base_delay: Duration::from_millis(self.rate_limit.base_delay_ms),
            max_delay: Duration::from_millis(self.rate_limit.max_delay_ms),
            default_retry_after: Duration::from_millis(self.rate_limit.default_retry_after_ms),
            ..RetryPolicy::default()
        };
        ProviderRateLimiter::with_policy(self.rate_limit.requests_per_second, policy)
            .with_request_timeout(Duration::from_secs(self.rate_limit.request_timeout_secs))
    }

    pub fn session_timeout(&self) -> Option<Duration> {
        self.orchestrator.session_timeout_secs.map(Duration::from_secs)
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(value) => match value.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("[Config] Ignoring unparsable {}='{}'", name, value);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.cache.max_entries, 500);
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.rate_limit.requests_per_second, 10);
        assert_eq!(config.rate_limit.max_retries, 3);
        assert_eq!(config.orchestrator.max_concurrent_scanners, 5);
        assert!(config.orchestrator.session_timeout_secs.is_none());
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("VARTIJA_CACHE_MAX_ENTRIES", "42");
        let config = EngineConfig::from_env();
        std::env::remove_var("VARTIJA_CACHE_MAX_ENTRIES");

        assert_eq!(config.cache.max_entries, 42);
        assert_eq!(config.cache.ttl_secs, 300);
    }

    #[test]
    fn test_camel_case_serialization() {
        let json = serde_json::to_value(EngineConfig::default()).unwrap();
        assert!(json["rateLimit"]["requestsPerSecond"].is_number());
        assert!(json["orchestrator"]["maxConcurrentScanners"].is_number());
    }
}
