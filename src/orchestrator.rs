// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scan Orchestrator
 * Runs the selected scanner set for one account and aggregates the results
 *
 * State machine per invocation: pending -> running -> completed or
 * completed_with_errors. Only pre-flight rejection aborts a scan; once
 * scanners start, every failure is recorded per scanner and the report is
 * still returned.
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use crate::config::EngineConfig;
use crate::context::ScanContext;
use crate::errors::{EngineError, EngineResult, ProviderError};
use crate::registry::{ScannerRegistration, ScannerRegistry, SCANNER_REGISTRY};
use crate::types::{Finding, ScanReport, ScanStatus, ScannerFailure};
use anyhow::anyhow;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant as TokioInstant;
use tracing::{debug, info, warn};

/// Which scanners a scan invocation runs.
#[derive(Debug, Clone, Default)]
pub enum ScanSelection {
    /// Every default-enabled scanner registered for the context's provider
    #[default]
    Default,
    /// An explicit scanner list; unknown or cross-provider names are
    /// rejected in pre-flight
    Named(Vec<String>),
}

pub struct ScanOrchestrator<'r> {
    registry: &'r ScannerRegistry,
    config: EngineConfig,
}

impl ScanOrchestrator<'static> {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            registry: &SCANNER_REGISTRY,
            config,
        }
    }
}

impl Default for ScanOrchestrator<'static> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<'r> ScanOrchestrator<'r> {
    pub fn with_registry(registry: &'r ScannerRegistry, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    /// Run one scan session and return the aggregated report.
    ///
    /// `Err` is returned only for pre-flight rejection: expired or missing
    /// credentials, an empty region set, an invalid selection, or broken
    /// configuration. After pre-flight the call always produces a report;
    /// scanner failures are carried in `report.errors`.
    pub async fn run_scan(
        &self,
        ctx: ScanContext,
        selection: ScanSelection,
    ) -> EngineResult<ScanReport> {
        let started_at = Utc::now();
        let started = Instant::now();

        self.preflight(&ctx)?;
        let selected = self.resolve_selection(&ctx, &selection)?;

        debug!(
            scan_id = %ctx.scan_id,
            "[Orchestrator] {} -> {}",
            ScanStatus::Pending,
            ScanStatus::Running
        );
        info!(
            "[Orchestrator] Scan {} running {} scanner(s) against {} account {}",
            ctx.scan_id,
            selected.len(),
            ctx.provider,
            ctx.account_id
        );

        let ctx = Arc::new(ctx);
        let semaphore = Arc::new(Semaphore::new(
            self.config.orchestrator.max_concurrent_scanners,
        ));
        let deadline = self.config.session_timeout().map(|d| TokioInstant::now() + d);

        let mut spawned: Vec<SpawnedScanner> = Vec::with_capacity(selected.len());
        for registration in &selected {
            let scanner = registration.instantiate();
            let name = registration.metadata.name.clone();
            let resource_type = registration.metadata.category.as_str().to_string();
            let permits = Arc::clone(&semaphore);
            let task_ctx = Arc::clone(&ctx);
            let handle = tokio::spawn(async move {
                let _permit = permits
                    .acquire()
                    .await
                    .map_err(|_| anyhow!("scanner pool closed before the scanner started"))?;
                scanner.scan(task_ctx.as_ref()).await
            });
            spawned.push(SpawnedScanner {
                name,
                resource_type,
                handle,
            });
        }

        let mut collector = ScanCollector::default();
        let mut deadline_hit = false;

        for entry in &mut spawned {
            if deadline_hit {
                // Tasks that beat the deadline on their own still count
                if entry.handle.is_finished() {
                    let joined = (&mut entry.handle).await;
                    collector.record(&entry.name, &entry.resource_type, joined);
                } else {
                    entry.handle.abort();
                    collector.record_timeout(&entry.name, &entry.resource_type);
                }
                continue;
            }

            let joined = match deadline {
                Some(at) => match tokio::time::timeout_at(at, &mut entry.handle).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        warn!(
                            "[Orchestrator] Session deadline reached, aborting remaining scanners"
                        );
                        entry.handle.abort();
                        collector.record_timeout(&entry.name, &entry.resource_type);
                        deadline_hit = true;
                        continue;
                    }
                },
                None => (&mut entry.handle).await,
            };
            collector.record(&entry.name, &entry.resource_type, joined);
        }

        let ScanCollector {
            findings,
            errors,
            findings_by_service,
            checks_executed,
        } = collector;

        let findings = dedup_findings(findings);
        let resources_scanned = findings
            .iter()
            .map(|f| f.resource_id.as_str())
            .collect::<HashSet<_>>()
            .len() as u64;

        let status = if errors.is_empty() {
            ScanStatus::Completed
        } else {
            ScanStatus::CompletedWithErrors
        };

        ctx.finish();

        let report = ScanReport {
            scan_id: ctx.scan_id.clone(),
            provider: ctx.provider,
            account_id: ctx.account_id.clone(),
            regions: ctx.regions.clone(),
            status,
            findings,
            errors,
            resources_scanned,
            checks_executed,
            findings_by_service,
            started_at: started_at.to_rfc3339(),
            completed_at: Utc::now().to_rfc3339(),
            duration_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            "[Orchestrator] Scan {} {}: {} findings, {} errors, {} checks in {}ms",
            report.scan_id,
            report.status,
            report.findings.len(),
            report.errors.len(),
            report.checks_executed,
            report.duration_ms
        );
        Ok(report)
    }

    fn preflight(&self, ctx: &ScanContext) -> EngineResult<()> {
        if ctx.credentials.access_key_id.is_empty() {
            return Err(EngineError::MissingCredentials {
                account_id: ctx.account_id.clone(),
            });
        }
        if ctx.credentials.is_expired() {
            let expired_at = ctx
                .credentials
                .expires_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_default();
            return Err(EngineError::ExpiredCredentials {
                account_id: ctx.account_id.clone(),
                expired_at,
            });
        }
        if ctx.regions.is_empty() {
            return Err(EngineError::EmptyRegionSet);
        }
        if self.config.orchestrator.max_concurrent_scanners == 0 {
            return Err(EngineError::Configuration(
                "maxConcurrentScanners must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn resolve_selection(
        &self,
        ctx: &ScanContext,
        selection: &ScanSelection,
    ) -> EngineResult<Vec<&'r ScannerRegistration>> {
        match selection {
            ScanSelection::Default => Ok(self
                .registry
                .get_by_provider(ctx.provider)
                .into_iter()
                .filter(|r| r.metadata.default_enabled)
                .collect()),
            ScanSelection::Named(names) => {
                let mut selected = Vec::with_capacity(names.len());
                for name in names {
                    let registration =
                        self.registry
                            .get(name)
                            .ok_or_else(|| EngineError::UnknownScanner {
                                name: name.clone(),
                            })?;
                    if registration.metadata.provider != ctx.provider {
                        return Err(EngineError::ProviderMismatch {
                            name: name.clone(),
                            expected: registration.metadata.provider.to_string(),
                            actual: ctx.provider.to_string(),
                        });
                    }
                    selected.push(registration);
                }
                Ok(selected)
            }
        }
    }
}

struct SpawnedScanner {
    name: String,
    resource_type: String,
    handle: JoinHandle<anyhow::Result<(Vec<Finding>, usize)>>,
}

/// Accumulates per-scanner outcomes during result collection
#[derive(Default)]
struct ScanCollector {
    findings: Vec<Finding>,
    errors: Vec<ScannerFailure>,
    findings_by_service: BTreeMap<String, u64>,
    checks_executed: u64,
}

impl ScanCollector {
    fn record(
        &mut self,
        name: &str,
        resource_type: &str,
        joined: Result<anyhow::Result<(Vec<Finding>, usize)>, JoinError>,
    ) {
        match joined {
            Ok(Ok((findings, checks))) => {
                self.checks_executed += checks as u64;
                if !findings.is_empty() {
                    *self
                        .findings_by_service
                        .entry(name.to_string())
                        .or_insert(0) += findings.len() as u64;
                }
                self.findings.extend(findings);
            }
            Ok(Err(e)) => {
                warn!("[Orchestrator] Scanner {} failed: {:#}", name, e);
                let recoverable = e
                    .downcast_ref::<ProviderError>()
                    .map(|pe| pe.is_retryable())
                    .unwrap_or(false);
                self.errors.push(ScannerFailure {
                    scanner: name.to_string(),
                    message: format!("{:#}", e),
                    recoverable,
                    resource_type: resource_type.to_string(),
                    timed_out: false,
                });
            }
            Err(join_error) => {
                warn!(
                    "[Orchestrator] Scanner {} task died: {}",
                    name, join_error
                );
                self.errors.push(ScannerFailure {
                    scanner: name.to_string(),
                    message: format!("Scanner task failed: {}", join_error),
                    recoverable: false,
                    resource_type: resource_type.to_string(),
                    timed_out: false,
                });
            }
        }
    }

    fn record_timeout(&mut self, name: &str, resource_type: &str) {
        self.errors.push(ScannerFailure {
            scanner: name.to_string(),
            message: "Session deadline reached before scanner completed".to_string(),
            recoverable: true,
            resource_type: resource_type.to_string(),
            timed_out: true,
        });
    }
}

/// Well-formed checks never emit two findings with the same identity; this
/// is the keep-first backstop for the ones that do.
fn dedup_findings(findings: Vec<Finding>) -> Vec<Finding> {
    let mut seen: HashSet<(String, String)> = HashSet::with_capacity(findings.len());
    let mut unique: Vec<Finding> = Vec::with_capacity(findings.len());
    for finding in findings {
        let key = (finding.resource_id.clone(), finding.scan_type.clone());
        if seen.insert(key) {
            unique.push(finding);
        } else {
            warn!(
                "[Orchestrator] Dropping duplicate finding {}/{}",
                finding.resource_id, finding.scan_type
            );
        }
    }
    unique
}
