// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Vartija Engine
 * Multi-cloud security posture scanning core
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

pub mod cache;
pub mod compliance;
pub mod config;
pub mod context;
pub mod errors;
pub mod rate_limiter;
pub mod types;

// Provider API surfaces (injected per session, mocked in tests)
pub mod provider;

// Scanner contract and shared helpers
pub mod scanner;

// Concrete posture scanners
pub mod scanners;

// Scanner registry with metadata and factories
pub mod registry;

// Scan session orchestration
pub mod orchestrator;

#[cfg(test)]
mod testkit;

pub use config::EngineConfig;
pub use context::{ResolvedCredentials, ScanContext};
pub use errors::{EngineError, ProviderError};
pub use orchestrator::{ScanOrchestrator, ScanSelection};
pub use registry::SCANNER_REGISTRY;
pub use types::{CloudProvider, Finding, ScanReport, ScanStatus, Severity};
