// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scanner Contract
 * Trait, category taxonomy, and finding construction helpers
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use crate::compliance::{self, ComplianceRef};
use crate::context::ScanContext;
use crate::types::{Finding, Remediation, RiskVector, Severity};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Resource category a scanner covers, used for grouping and reporting
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScannerCategory {
    ObjectStorage,
    ContainerRegistry,
    ThreatDetection,
    ManagedSearch,
    BackupRecovery,
    Governance,
    ContentDelivery,
    ApiManagement,
    ContainerOrchestration,
    Compute,
    SecretsManagement,
    Identity,
    AppHosting,
}

impl ScannerCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScannerCategory::ObjectStorage => "object_storage",
            ScannerCategory::ContainerRegistry => "container_registry",
            ScannerCategory::ThreatDetection => "threat_detection",
            ScannerCategory::ManagedSearch => "managed_search",
            ScannerCategory::BackupRecovery => "backup_recovery",
            ScannerCategory::Governance => "governance",
            ScannerCategory::ContentDelivery => "content_delivery",
            ScannerCategory::ApiManagement => "api_management",
            ScannerCategory::ContainerOrchestration => "container_orchestration",
            ScannerCategory::Compute => "compute",
            ScannerCategory::SecretsManagement => "secrets_management",
            ScannerCategory::Identity => "identity",
            ScannerCategory::AppHosting => "app_hosting",
        }
    }
}

impl std::fmt::Display for ScannerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Contract every concrete scanner implements.
///
/// `scan` inventories one resource category through the context's cache and
/// rate limiter and evaluates its fixed check list, returning the findings
/// plus the number of checks executed. Scanners are read-only against the
/// provider and hold no mutable state of their own, so the orchestrator can
/// run them concurrently against one context.
#[async_trait]
pub trait Scanner: Send + Sync {
    fn service_name(&self) -> &'static str;

    fn category(&self) -> ScannerCategory;

    async fn scan(&self, ctx: &ScanContext) -> Result<(Vec<Finding>, usize)>;
}

/// Run one check's result through the isolation policy: a failed check is
/// logged and dropped, never aborting the scanner that ran it.
///
/// Checks return `Result<Option<Finding>>`; call sites flatten, so a broken
/// rule (unexpected shape in a provider response, bad date arithmetic)
/// degrades to "no finding from this check" while the remaining checks keep
/// producing.
pub fn isolate<T>(label: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("[{}] Check failed, continuing: {:#}", label, e);
            None
        }
    }
}

/// Assembles an immutable `Finding`, filling scope fields from the session
/// context and compliance references from the catalog.
pub struct FindingBuilder {
    scan_type: String,
    region: String,
    account_id: String,
    resource_id: String,
    resource_arn: String,
    severity: Severity,
    risk_vector: RiskVector,
    title: String,
    description: String,
    analysis: String,
    remediation: Option<Remediation>,
    extra_compliance: Vec<ComplianceRef>,
    evidence: BTreeMap<String, serde_json::Value>,
}

impl FindingBuilder {
    pub fn new(ctx: &ScanContext, region: &str, scan_type: &str) -> Self {
        Self {
            scan_type: scan_type.to_string(),
            region: region.to_string(),
            account_id: ctx.account_id.clone(),
            resource_id: String::new(),
            resource_arn: String::new(),
            severity: Severity::Medium,
            risk_vector: RiskVector::ComplianceGap,
            title: String::new(),
            description: String::new(),
            analysis: String::new(),
            remediation: None,
            extra_compliance: Vec::new(),
            evidence: BTreeMap::new(),
        }
    }

    pub fn resource(mut self, resource_id: &str, resource_arn: &str) -> Self {
        self.resource_id = resource_id.to_string();
        self.resource_arn = resource_arn.to_string();
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn risk_vector(mut self, risk_vector: RiskVector) -> Self {
        self.risk_vector = risk_vector;
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn analysis(mut self, analysis: &str) -> Self {
        self.analysis = analysis.to_string();
        self
    }

    pub fn remediation(mut self, remediation: Remediation) -> Self {
        self.remediation = Some(remediation);
        self
    }

    /// Clause reference beyond what the catalog maps for this scan type
    pub fn compliance_ref(mut self, reference: ComplianceRef) -> Self {
        self.extra_compliance.push(reference);
        self
    }

    pub fn evidence(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
        self.evidence.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> Finding {
        let mut compliance = compliance::for_scan_type(&self.scan_type);
        for reference in self.extra_compliance {
            if !compliance.contains(&reference) {
                compliance.push(reference);
            }
        }

        Finding {
            resource_id: self.resource_id,
            resource_arn: self.resource_arn,
            scan_type: self.scan_type,
            severity: self.severity,
            risk_vector: self.risk_vector,
            title: self.title,
            description: self.description,
            analysis: self.analysis,
            remediation: self.remediation,
            compliance,
            evidence: self.evidence,
            region: self.region,
            account_id: self.account_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit;

    fn test_context() -> ScanContext {
        testkit::aws_context(testkit::StaticAwsApi::default(), &["eu-west-1"])
    }

    #[test]
    fn test_builder_fills_scope_and_compliance() {
        let ctx = test_context();
        let finding = FindingBuilder::new(&ctx, "eu-west-1", "s3_no_encryption")
            .resource("data-bucket", "arn:aws:s3:::data-bucket")
            .severity(Severity::High)
            .risk_vector(RiskVector::DataExposure)
            .title("Bucket without server-side encryption")
            .evidence("encryptionConfigured", false)
            .build();

        assert_eq!(finding.account_id, "123456789012");
        assert_eq!(finding.region, "eu-west-1");
        assert_eq!(finding.identity(), ("data-bucket", "s3_no_encryption"));
        assert!(!finding.compliance.is_empty());
        assert_eq!(finding.evidence["encryptionConfigured"], false);
    }

    #[test]
    fn test_builder_deduplicates_extra_compliance() {
        let ctx = test_context();
        let duplicate = crate::compliance::cis("2.1.1", "Ensure all S3 buckets employ encryption-at-rest");
        let finding = FindingBuilder::new(&ctx, "eu-west-1", "s3_no_encryption")
            .resource("data-bucket", "arn:aws:s3:::data-bucket")
            .compliance_ref(duplicate.clone())
            .build();

        let occurrences = finding
            .compliance
            .iter()
            .filter(|r| **r == duplicate)
            .count();
        assert_eq!(occurrences, 1);
    }

    #[test]
    fn test_isolate_swallows_errors() {
        let ok: Result<Option<u32>> = Ok(Some(5));
        let err: Result<Option<u32>> = Err(anyhow::anyhow!("boom"));

        assert_eq!(isolate("test.check", ok).flatten(), Some(5));
        assert_eq!(isolate("test.check", err).flatten(), None);
    }
}
