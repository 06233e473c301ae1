// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use crate::compliance::ComplianceRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cloud provider targeted by a scan session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Azure,
}

impl CloudProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "aws",
            CloudProvider::Azure => "azure",
        }
    }
}

impl std::fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Info => "INFO",
        }
    }

    /// Numeric rank for sorting, 0 = most severe
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
            Severity::Info => 4,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Risk category tag attached to every finding
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RiskVector {
    DataExposure,
    ExcessivePermissions,
    NoAuditTrail,
    PublicExposure,
    CredentialExposure,
    Availability,
    ComplianceGap,
}

impl RiskVector {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskVector::DataExposure => "data_exposure",
            RiskVector::ExcessivePermissions => "excessive_permissions",
            RiskVector::NoAuditTrail => "no_audit_trail",
            RiskVector::PublicExposure => "public_exposure",
            RiskVector::CredentialExposure => "credential_exposure",
            RiskVector::Availability => "availability",
            RiskVector::ComplianceGap => "compliance_gap",
        }
    }
}

impl std::fmt::Display for RiskVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RemediationEffort {
    Low,
    Medium,
    High,
}

/// Remediation guidance attached to a finding. The engine never applies
/// remediation itself; this is advisory output only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Remediation {
    pub description: String,
    pub steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli_command: Option<String>,
    pub effort: RemediationEffort,
    pub automatable: bool,
}

/// One normalized security/compliance observation about a cloud resource
/// (or an aggregate scope such as a whole region).
///
/// Immutable once built. Carries no per-instance id or timestamp: two scans
/// of an unchanged environment produce equal Finding values, which is what
/// lets the persistence layer upsert by `(resource_id, scan_type)` instead
/// of appending duplicates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Provider-neutral identifier (bucket name, instance id, region for
    /// aggregate findings)
    pub resource_id: String,
    /// Provider-native identifier: ARN for AWS, resource URI for Azure
    pub resource_arn: String,
    /// Check identifier, unique per rule (e.g. "s3_no_encryption")
    pub scan_type: String,
    pub severity: Severity,
    pub risk_vector: RiskVector,
    pub title: String,
    pub description: String,
    /// Why this matters, beyond the bare misconfiguration statement
    pub analysis: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<Remediation>,
    #[serde(default)]
    pub compliance: Vec<ComplianceRef>,
    /// Attributes captured at evaluation time, enough to reproduce the
    /// decision without re-calling the provider
    #[serde(default)]
    pub evidence: BTreeMap<String, serde_json::Value>,
    /// AWS region, or Azure location/resource-group scope
    pub region: String,
    /// AWS account id or Azure subscription id
    pub account_id: String,
}

impl Finding {
    /// Dedup/upsert key within one scan
    pub fn identity(&self) -> (&str, &str) {
        (&self.resource_id, &self.scan_type)
    }
}

/// Scanner-level failure recorded in the scan report. One entry per scanner
/// whose `scan()` returned an error; the rest of the scan is unaffected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerFailure {
    pub scanner: String,
    pub message: String,
    /// Whether a re-run could plausibly succeed (throttle, timeout, transient
    /// network) as opposed to a hard failure (missing permission)
    pub recoverable: bool,
    pub resource_type: String,
    /// Set when the failure was the session deadline cutting the scanner off
    #[serde(default)]
    pub timed_out: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    CompletedWithErrors,
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanStatus::Pending => write!(f, "pending"),
            ScanStatus::Running => write!(f, "running"),
            ScanStatus::Completed => write!(f, "completed"),
            ScanStatus::CompletedWithErrors => write!(f, "completed_with_errors"),
        }
    }
}

/// Aggregated output of one scan session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub scan_id: String,
    pub provider: CloudProvider,
    pub account_id: String,
    pub regions: Vec<String>,
    pub status: ScanStatus,
    pub findings: Vec<Finding>,
    pub errors: Vec<ScannerFailure>,
    /// Distinct resources referenced by findings. Scanners report check
    /// counts, not inventory sizes, so clean resources are not counted here.
    pub resources_scanned: u64,
    /// Individual checks evaluated across all scanners
    pub checks_executed: u64,
    /// Finding counts keyed by scanner service name
    #[serde(default)]
    pub findings_by_service: BTreeMap<String, u64>,
    pub started_at: String,
    pub completed_at: String,
    pub duration_ms: u64,
}

impl ScanReport {
    /// Finding counts keyed by severity label
    pub fn severity_summary(&self) -> BTreeMap<String, u64> {
        let mut summary = BTreeMap::new();
        for finding in &self.findings {
            *summary
                .entry(finding.severity.as_str().to_string())
                .or_insert(0) += 1;
        }
        summary
    }

    /// Finding counts keyed by risk vector
    pub fn risk_vector_summary(&self) -> BTreeMap<String, u64> {
        let mut summary = BTreeMap::new();
        for finding in &self.findings {
            *summary
                .entry(finding.risk_vector.as_str().to_string())
                .or_insert(0) += 1;
        }
        summary
    }

    /// Finding counts keyed by compliance framework, for the compliance
    /// dashboard. A finding referencing two clauses of one framework counts
    /// once per framework.
    pub fn compliance_summary(&self) -> BTreeMap<String, u64> {
        let mut summary = BTreeMap::new();
        for finding in &self.findings {
            let mut seen: Vec<&str> = Vec::new();
            for reference in &finding.compliance {
                let framework = reference.framework.as_str();
                if !seen.contains(&framework) {
                    seen.push(framework);
                    *summary.entry(framework.to_string()).or_insert(0) += 1;
                }
            }
        }
        summary
    }

    /// Findings at or above the given severity, most severe first
    pub fn findings_at_or_above(&self, severity: Severity) -> Vec<&Finding> {
        let mut matched: Vec<&Finding> = self
            .findings
            .iter()
            .filter(|f| f.severity.rank() <= severity.rank())
            .collect();
        matched.sort_by_key(|f| f.severity.rank());
        matched
    }

    pub fn has_critical_findings(&self) -> bool {
        self.findings
            .iter()
            .any(|f| f.severity == Severity::Critical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::{cis, nist};

    fn sample_finding(resource_id: &str, severity: Severity) -> Finding {
        Finding {
            resource_id: resource_id.to_string(),
            resource_arn: format!("arn:aws:s3:::{resource_id}"),
            scan_type: "s3_no_encryption".to_string(),
            severity,
            risk_vector: RiskVector::DataExposure,
            title: "Bucket without encryption-at-rest".to_string(),
            description: "No default SSE configuration".to_string(),
            analysis: "Objects land unencrypted on shared storage".to_string(),
            remediation: None,
            compliance: vec![
                cis("2.1.1", "Ensure all S3 buckets employ encryption-at-rest"),
                cis("2.1.2", "Ensure the default SSE algorithm is AES-256 or KMS"),
                nist("SC-28", "Protection of information at rest"),
            ],
            evidence: BTreeMap::new(),
            region: "eu-west-1".to_string(),
            account_id: "123456789012".to_string(),
        }
    }

    fn sample_report(findings: Vec<Finding>) -> ScanReport {
        ScanReport {
            scan_id: "scan-1".to_string(),
            provider: CloudProvider::Aws,
            account_id: "123456789012".to_string(),
            regions: vec!["eu-west-1".to_string()],
            status: ScanStatus::Completed,
            findings,
            errors: Vec::new(),
            resources_scanned: 0,
            checks_executed: 0,
            findings_by_service: BTreeMap::new(),
            started_at: "2026-01-01T00:00:00Z".to_string(),
            completed_at: "2026-01-01T00:00:05Z".to_string(),
            duration_ms: 5_000,
        }
    }

    #[test]
    fn test_severity_rank_ordering() {
        assert!(Severity::Critical.rank() < Severity::High.rank());
        assert!(Severity::High.rank() < Severity::Medium.rank());
        assert!(Severity::Medium.rank() < Severity::Low.rank());
        assert!(Severity::Low.rank() < Severity::Info.rank());
    }

    #[test]
    fn test_severity_summary_counts_by_label() {
        let report = sample_report(vec![
            sample_finding("a", Severity::Critical),
            sample_finding("b", Severity::High),
            sample_finding("c", Severity::High),
        ]);

        let summary = report.severity_summary();
        assert_eq!(summary.get("CRITICAL"), Some(&1));
        assert_eq!(summary.get("HIGH"), Some(&2));
        assert_eq!(summary.get("LOW"), None);
    }

    #[test]
    fn test_risk_vector_summary_counts_by_vector() {
        let mut flagged = sample_finding("b", Severity::Medium);
        flagged.risk_vector = RiskVector::PublicExposure;

        let report = sample_report(vec![sample_finding("a", Severity::High), flagged]);
        let summary = report.risk_vector_summary();
        assert_eq!(summary.get("data_exposure"), Some(&1));
        assert_eq!(summary.get("public_exposure"), Some(&1));
    }

    #[test]
    fn test_compliance_summary_counts_frameworks_once_per_finding() {
        let report = sample_report(vec![sample_finding("a", Severity::High)]);

        // Two CIS clauses on one finding still count the framework once
        let summary = report.compliance_summary();
        assert_eq!(summary.get("CIS"), Some(&1));
        assert_eq!(summary.get("NIST-800-53"), Some(&1));
    }

    #[test]
    fn test_findings_at_or_above_sorts_most_severe_first() {
        let report = sample_report(vec![
            sample_finding("low", Severity::Low),
            sample_finding("crit", Severity::Critical),
            sample_finding("med", Severity::Medium),
        ]);

        let filtered = report.findings_at_or_above(Severity::Medium);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].resource_id, "crit");
        assert_eq!(filtered[1].resource_id, "med");
    }

    #[test]
    fn test_has_critical_findings() {
        let clean = sample_report(vec![sample_finding("a", Severity::High)]);
        assert!(!clean.has_critical_findings());

        let hot = sample_report(vec![sample_finding("a", Severity::Critical)]);
        assert!(hot.has_critical_findings());
    }
}
