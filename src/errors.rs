// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Engine Error Types
 * Provider-call and orchestration error handling with thiserror
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by cloud provider API calls.
///
/// Every outbound call made through the rate limiter resolves to one of
/// these variants; the limiter consults the classification helpers below
/// instead of string-matching at call sites.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Provider rejected the call with a rate-limit response (HTTP 429 or
    /// SDK equivalent such as AWS `Throttling`/`TooManyRequestsException`).
    #[error("Throttled by {service}: retry after {retry_after:?}")]
    Throttled {
        service: String,
        retry_after: Option<Duration>,
    },

    /// The call did not complete within the per-request deadline.
    #[error("Provider call timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Credentials were rejected outright (expired session, bad signature).
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    /// Credentials are valid but lack permission for this operation.
    #[error("Authorization denied for {service}: {reason}")]
    AuthorizationDenied { service: String, reason: String },

    /// The requested resource does not exist (deleted between list and
    /// describe, or the service is not provisioned in this region).
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// Generic API failure carrying the provider's status code when known.
    #[error("API error from {service} (status {status_code:?}): {message}")]
    Api {
        service: String,
        status_code: Option<u16>,
        message: String,
    },

    /// Transport-level failure before any HTTP status was received.
    #[error("Network error: {reason}")]
    Network { reason: String },

    /// A response was received but could not be decoded into the typed
    /// resource struct.
    #[error("Failed to parse {resource} response: {reason}")]
    Parse { resource: String, reason: String },

    #[error("Provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Check if the error is worth retrying at all.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Throttled { .. } => true,
            ProviderError::Timeout { .. } => true,
            ProviderError::Network { .. } => true,
            ProviderError::Api { status_code, .. } => {
                // Retry on 500, 502, 503, 504 and the retryable client codes
                matches!(status_code, Some(500 | 502 | 503 | 504 | 408 | 429))
            }
            ProviderError::AuthenticationFailed { .. } => false,
            ProviderError::AuthorizationDenied { .. } => false,
            ProviderError::NotFound { .. } => false,
            ProviderError::Parse { .. } => false,
            ProviderError::Other(_) => false,
        }
    }

    /// Check if the error is a rate-limit rejection (retried with the
    /// provider's hint rather than exponential backoff).
    pub fn is_throttle(&self) -> bool {
        matches!(
            self,
            ProviderError::Throttled { .. }
                | ProviderError::Api {
                    status_code: Some(429),
                    ..
                }
        )
    }

    /// Check if the error indicates a credential problem.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthenticationFailed { .. }
                | ProviderError::AuthorizationDenied { .. }
        )
    }

    /// Suggested wait before the next attempt, where the provider gave one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::Throttled { retry_after, .. } => *retry_after,
            ProviderError::Api {
                status_code: Some(503),
                ..
            } => Some(Duration::from_secs(30)),
            _ => None,
        }
    }
}

/// Pre-flight failures, the only errors that abort a scan outright.
///
/// Once the orchestrator passes pre-flight, every downstream failure is
/// recorded per scanner and the scan still returns a report.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No credentials resolved for account {account_id}")]
    MissingCredentials { account_id: String },

    #[error("Credentials for account {account_id} expired at {expired_at}")]
    ExpiredCredentials {
        account_id: String,
        expired_at: String,
    },

    #[error("No target regions supplied")]
    EmptyRegionSet,

    #[error("Unknown scanner requested: {name}")]
    UnknownScanner { name: String },

    #[error("Scanner '{name}' targets {expected} but the scan context is {actual}")]
    ProviderMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid engine configuration: {0}")]
    Configuration(String),
}

/// Result type for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Result type for orchestrator entry points.
pub type EngineResult<T> = Result<T, EngineError>;
