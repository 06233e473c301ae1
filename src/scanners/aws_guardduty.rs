// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - AWS GuardDuty Posture Scanner
 * Threat detection coverage checks
 *
 * Detects:
 * - Regions with no GuardDuty detector at all (one aggregate finding per region)
 * - Detectors that exist but are suspended
 * - Detectors without a findings export destination
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use crate::context::ScanContext;
use crate::provider::aws::{AwsApi, GuardDutyStatus};
use crate::scanner::{isolate, FindingBuilder, Scanner, ScannerCategory};
use crate::types::{Finding, Remediation, RemediationEffort, RiskVector, Severity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct AwsGuardDutyScanner;

impl AwsGuardDutyScanner {
    pub fn new() -> Self {
        Self
    }

    async fn fetch_status(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AwsApi>,
        region: &str,
    ) -> Result<GuardDutyStatus> {
        let key = ctx.cache_key(&format!("guardduty:status:{}", region));
        let status = ctx
            .cache
            .get_or_fetch(&key, || async {
                ctx.rate_limiter
                    .execute("guardduty.get_status", || api.get_guardduty_status(region))
                    .await
            })
            .await
            .context("Failed to read GuardDuty status")?;
        Ok(status)
    }

    async fn scan_region(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AwsApi>,
        region: &str,
    ) -> Result<(Vec<Finding>, usize)> {
        let status = self.fetch_status(ctx, api, region).await?;
        debug!(
            "[GuardDuty] {} detector(s) in {}",
            status.detectors.len(),
            region
        );

        let mut findings = Vec::new();
        let mut checks_run = 0;

        // Region-level coverage check. A region with zero detectors collapses
        // into a single aggregate finding keyed by the region itself.
        checks_run += 1;
        if status.detectors.is_empty() {
            findings.push(self.region_not_covered(ctx, region));
            return Ok((findings, checks_run));
        }

        for detector in &status.detectors {
            // Check detector state
            checks_run += 1;
            if let Some(f) = isolate("guardduty.detector_state", {
                if detector.enabled {
                    Ok(None)
                } else {
                    Ok(Some(
                        FindingBuilder::new(ctx, region, "guardduty_detector_disabled")
                            .resource(&detector.detector_id, "")
                            .severity(Severity::High)
                            .risk_vector(RiskVector::NoAuditTrail)
                            .title("GuardDuty detector suspended")
                            .description(format!(
                                "Detector '{}' in {} exists but is disabled",
                                detector.detector_id, region
                            ))
                            .analysis(
                                "A suspended detector stops analyzing CloudTrail, VPC flow \
                                 and DNS logs. Active intrusions in this region go unnoticed \
                                 while the console still shows GuardDuty as provisioned.",
                            )
                            .remediation(remediation("guardduty_detector_disabled"))
                            .evidence("enabled", detector.enabled)
                            .build(),
                    ))
                }
            })
            .flatten()
            {
                findings.push(f);
            }

            // Check findings export
            checks_run += 1;
            if let Some(f) = isolate("guardduty.findings_export", {
                if !detector.enabled || !detector.export_destinations.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(
                        FindingBuilder::new(ctx, region, "guardduty_no_findings_export")
                            .resource(&detector.detector_id, "")
                            .severity(Severity::Medium)
                            .risk_vector(RiskVector::NoAuditTrail)
                            .title("GuardDuty findings not exported")
                            .description(format!(
                                "Detector '{}' has no S3 or EventBridge export destination",
                                detector.detector_id
                            ))
                            .analysis(
                                "Findings remain only in the GuardDuty console with its 90-day \
                                 retention, outside the SIEM and incident response tooling.",
                            )
                            .remediation(remediation("guardduty_no_findings_export"))
                            .evidence("exportDestinations", &detector.export_destinations)
                            .evidence(
                                "publishingFrequency",
                                detector.finding_publishing_frequency.clone(),
                            )
                            .build(),
                    ))
                }
            })
            .flatten()
            {
                findings.push(f);
            }
        }

        Ok((findings, checks_run))
    }

    fn region_not_covered(&self, ctx: &ScanContext, region: &str) -> Finding {
        FindingBuilder::new(ctx, region, "guardduty_not_enabled")
            .resource(region, "")
            .severity(Severity::High)
            .risk_vector(RiskVector::NoAuditTrail)
            .title("GuardDuty not enabled in region")
            .description(format!(
                "Region {} has no GuardDuty detector configured",
                region
            ))
            .analysis(
                "Nothing is watching this region for credential abuse, crypto mining or \
                 data exfiltration patterns. Attackers deliberately pick uncovered regions \
                 to operate in.",
            )
            .remediation(remediation("guardduty_not_enabled"))
            .evidence("detectorCount", 0)
            .build()
    }
}

impl Default for AwsGuardDutyScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for AwsGuardDutyScanner {
    fn service_name(&self) -> &'static str {
        "aws_guardduty"
    }

    fn category(&self) -> ScannerCategory {
        ScannerCategory::ThreatDetection
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<(Vec<Finding>, usize)> {
        let api = ctx.aws_api()?;
        info!(
            "[GuardDuty] Starting scan across {} region(s)",
            ctx.regions.len()
        );

        let mut findings = Vec::new();
        let mut checks_run = 0;
        let mut failed_regions = 0;
        let mut last_error = None;

        for region in &ctx.regions {
            match self.scan_region(ctx, &api, region).await {
                Ok((mut region_findings, region_checks)) => {
                    findings.append(&mut region_findings);
                    checks_run += region_checks;
                }
                Err(e) => {
                    warn!("[GuardDuty] Region {} failed, continuing: {:#}", region, e);
                    failed_regions += 1;
                    last_error = Some(e);
                }
            }
        }

        if failed_regions == ctx.regions.len() {
            if let Some(e) = last_error {
                return Err(e.context("GuardDuty scan failed in every region"));
            }
        }

        info!(
            "[GuardDuty] Scan complete: {} findings from {} checks",
            findings.len(),
            checks_run
        );
        Ok((findings, checks_run))
    }
}

fn remediation(scan_type: &str) -> Remediation {
    match scan_type {
        "guardduty_not_enabled" => Remediation {
            description: "Enable GuardDuty in the region".to_string(),
            steps: vec![
                "Create a detector in the region".to_string(),
                "Delegate administration to the security account via Organizations".to_string(),
                "Enable GuardDuty in every active region, not only the primary one".to_string(),
            ],
            cli_command: Some(
                "aws guardduty create-detector --enable --region <region>".to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "guardduty_detector_disabled" => Remediation {
            description: "Re-enable the suspended detector".to_string(),
            steps: vec![
                "Re-enable the detector".to_string(),
                "Add an AWS Config rule alerting on detector suspension".to_string(),
            ],
            cli_command: Some(
                "aws guardduty update-detector --detector-id <id> --enable".to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "guardduty_no_findings_export" => Remediation {
            description: "Export findings to S3 or EventBridge".to_string(),
            steps: vec![
                "Configure a findings publishing destination (S3 bucket with KMS key)".to_string(),
                "Route findings to the SIEM through EventBridge".to_string(),
            ],
            cli_command: Some(
                "aws guardduty create-publishing-destination --detector-id <id> --destination-type S3 --destination-properties DestinationArn=<bucket-arn>,KmsKeyArn=<key-arn>"
                    .to_string(),
            ),
            effort: RemediationEffort::Medium,
            automatable: true,
        },
        _ => Remediation {
            description: "Review GuardDuty coverage for the account".to_string(),
            steps: vec!["Audit detector state in every region".to_string()],
            cli_command: None,
            effort: RemediationEffort::Medium,
            automatable: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::aws::GuardDutyDetector;
    use crate::testkit;

    #[tokio::test]
    async fn test_uncovered_region_yields_single_aggregate_finding() {
        let ctx = testkit::aws_context(testkit::StaticAwsApi::default(), &["eu-north-1"]);

        let (findings, checks_run) = AwsGuardDutyScanner::new().scan(&ctx).await.unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(checks_run, 1);
        assert_eq!(findings[0].scan_type, "guardduty_not_enabled");
        assert_eq!(findings[0].resource_id, "eu-north-1");
        assert_eq!(findings[0].region, "eu-north-1");
    }

    #[tokio::test]
    async fn test_enabled_exporting_detector_clean() {
        let mut api = testkit::StaticAwsApi::default();
        api.guardduty = GuardDutyStatus {
            detectors: vec![GuardDutyDetector {
                detector_id: "det-1".to_string(),
                enabled: true,
                finding_publishing_frequency: Some("FIFTEEN_MINUTES".to_string()),
                export_destinations: vec!["arn:aws:s3:::gd-findings".to_string()],
            }],
        };
        let ctx = testkit::aws_context(api, &["eu-west-1"]);

        let (findings, checks_run) = AwsGuardDutyScanner::new().scan(&ctx).await.unwrap();
        assert!(findings.is_empty());
        assert_eq!(checks_run, 3);
    }

    #[tokio::test]
    async fn test_suspended_detector_flagged() {
        let mut api = testkit::StaticAwsApi::default();
        api.guardduty = GuardDutyStatus {
            detectors: vec![GuardDutyDetector {
                detector_id: "det-2".to_string(),
                enabled: false,
                finding_publishing_frequency: None,
                export_destinations: Vec::new(),
            }],
        };
        let ctx = testkit::aws_context(api, &["eu-west-1"]);

        let (findings, _) = AwsGuardDutyScanner::new().scan(&ctx).await.unwrap();
        // Suspended detector is reported once; the export check does not
        // additionally flag a detector that is not running at all.
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].scan_type, "guardduty_detector_disabled");
        assert_eq!(findings[0].severity, Severity::High);
    }
}
