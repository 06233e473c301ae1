// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scan Session Context
 * Per-invocation state shared by every scanner in a session
 *
 * @copyright 2025 Bountyy Oy
 * @license Proprietary
 */

use crate::cache::ResourceCache;
use crate::config::EngineConfig;
use crate::provider::{AwsApi, AzureApi};
use crate::rate_limiter::ProviderRateLimiter;
use crate::types::CloudProvider;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Short-lived credentials resolved by the caller before the scan starts.
/// The engine never performs STS or OAuth flows itself.
#[derive(Clone)]
pub struct ResolvedCredentials {
    /// Access key id (AWS) or OAuth access token (Azure)
    pub access_key_id: String,
    pub secret: String,
    pub session_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ResolvedCredentials {
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= Utc::now())
    }
}

// Secrets stay out of logs
impl std::fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret", &"***")
            .field("session_token", &self.session_token.as_deref().map(|_| "***"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Everything a scanner needs for one session: identity of the target
/// account, the shared cache and rate limiter, and the provider API handle.
///
/// One context is built per orchestrator invocation and passed by reference
/// to every scanner; the cache and limiter instances are session-scoped so
/// the rate ceiling and memoization apply account-wide.
pub struct ScanContext {
    pub scan_id: String,
    pub provider: CloudProvider,
    /// AWS account id or Azure subscription id
    pub account_id: String,
    /// Azure tenant id; None for AWS sessions
    pub tenant_id: Option<String>,
    pub regions: Vec<String>,
    pub credentials: ResolvedCredentials,
    pub cache: Arc<ResourceCache>,
    pub rate_limiter: Arc<ProviderRateLimiter>,
    aws: Option<Arc<dyn AwsApi>>,
    azure: Option<Arc<dyn AzureApi>>,
}

impl ScanContext {
    pub fn aws(
        account_id: &str,
        regions: Vec<String>,
        credentials: ResolvedCredentials,
        api: Arc<dyn AwsApi>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            scan_id: Uuid::new_v4().to_string(),
            provider: CloudProvider::Aws,
            account_id: account_id.to_string(),
            tenant_id: None,
            regions,
            credentials,
            cache: Arc::new(config.build_cache()),
            rate_limiter: Arc::new(config.build_rate_limiter()),
            aws: Some(api),
            azure: None,
        }
    }

    pub fn azure(
        subscription_id: &str,
        tenant_id: &str,
        regions: Vec<String>,
        credentials: ResolvedCredentials,
        api: Arc<dyn AzureApi>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            scan_id: Uuid::new_v4().to_string(),
            provider: CloudProvider::Azure,
            account_id: subscription_id.to_string(),
            tenant_id: Some(tenant_id.to_string()),
            regions,
            credentials,
            cache: Arc::new(config.build_cache()),
            rate_limiter: Arc::new(config.build_rate_limiter()),
            aws: None,
            azure: Some(api),
        }
    }

    pub fn aws_api(&self) -> Result<Arc<dyn AwsApi>> {
        self.aws
            .clone()
            .ok_or_else(|| anyhow!("No AWS API client attached to this scan context"))
    }

    pub fn azure_api(&self) -> Result<Arc<dyn AzureApi>> {
        self.azure
            .clone()
            .ok_or_else(|| anyhow!("No Azure API client attached to this scan context"))
    }

    /// Cache keys are namespaced by provider and account so no two scanners
    /// can collide across scopes
    pub fn cache_key(&self, suffix: &str) -> String {
        format!("{}:{}:{}", self.provider, self.account_id, suffix)
    }

    /// Tear down session state. Execution environments are reused between
    /// invocations, so the cache is cleared explicitly instead of relying
    /// on drop timing.
    pub fn finish(&self) {
        let cache_stats = self.cache.stats();
        let limiter_stats = self.rate_limiter.stats();
        debug!(
            scan_id = %self.scan_id,
            cache_hits = cache_stats.hits,
            cache_misses = cache_stats.misses,
            api_requests = limiter_stats.total_requests,
            throttle_events = limiter_stats.throttle_events,
            "[ScanContext] Session finished"
        );
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_credentials() -> ResolvedCredentials {
        ResolvedCredentials {
            access_key_id: "AKIAEXAMPLE".to_string(),
            secret: "super-secret".to_string(),
            session_token: Some("token".to_string()),
            expires_at: None,
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", test_credentials());
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("token\""));
        assert!(rendered.contains("AKIAEXAMPLE"));
    }

    #[test]
    fn test_expiry() {
        let mut credentials = test_credentials();
        assert!(!credentials.is_expired());

        credentials.expires_at = Some(Utc::now() - chrono::Duration::minutes(5));
        assert!(credentials.is_expired());
    }
}
