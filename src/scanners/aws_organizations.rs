// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - AWS Organizations Posture Scanner
 * Account governance checks (account-global, no region fan-out)
 *
 * Detects:
 * - Accounts not belonging to any organization
 * - Organizations running in consolidated-billing-only mode
 * - Organizations without service control policies
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use crate::context::ScanContext;
use crate::provider::aws::{AwsApi, OrganizationDetail, OrganizationStatus};
use crate::scanner::{isolate, FindingBuilder, Scanner, ScannerCategory};
use crate::types::{Finding, Remediation, RemediationEffort, RiskVector, Severity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub struct AwsOrganizationsScanner;

impl AwsOrganizationsScanner {
    pub fn new() -> Self {
        Self
    }

    async fn fetch_status(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AwsApi>,
    ) -> Result<OrganizationStatus> {
        let key = ctx.cache_key("organizations:status");
        let status = ctx
            .cache
            .get_or_fetch(&key, || async {
                ctx.rate_limiter
                    .execute("organizations.get_status", || {
                        api.get_organization_status()
                    })
                    .await
            })
            .await
            .context("Failed to read organization status")?;
        Ok(status)
    }

    fn check_feature_set(
        &self,
        ctx: &ScanContext,
        organization: &OrganizationDetail,
    ) -> Result<Option<Finding>> {
        if organization.feature_set == "ALL" {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, "global", "organizations_all_features_disabled")
            .resource(&organization.id, "")
            .severity(Severity::Medium)
            .risk_vector(RiskVector::ComplianceGap)
            .title("Organization without all features enabled")
            .description(format!(
                "Organization '{}' runs feature set '{}' instead of ALL",
                organization.id, organization.feature_set
            ))
            .analysis(
                "Consolidated-billing-only organizations cannot attach service control \
                 policies, so no central guardrail can constrain member accounts.",
            )
            .remediation(remediation("organizations_all_features_disabled"))
            .evidence("featureSet", &organization.feature_set)
            .build();
        Ok(Some(finding))
    }

    fn check_scps(
        &self,
        ctx: &ScanContext,
        organization: &OrganizationDetail,
    ) -> Result<Option<Finding>> {
        if !organization.service_control_policies.is_empty() {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, "global", "organizations_no_scps")
            .resource(&organization.id, "")
            .severity(Severity::Medium)
            .risk_vector(RiskVector::ExcessivePermissions)
            .title("Organization has no service control policies")
            .description(format!(
                "Organization '{}' has no SCP constraining member accounts",
                organization.id
            ))
            .analysis(
                "Every member account retains the full action surface of its IAM \
                 policies. One compromised administrator can disable logging, leave \
                 approved regions or delete backups without any organizational backstop.",
            )
            .remediation(remediation("organizations_no_scps"))
            .evidence("scpCount", 0)
            .build();
        Ok(Some(finding))
    }

    fn not_in_organization(&self, ctx: &ScanContext) -> Finding {
        FindingBuilder::new(ctx, "global", "organizations_not_in_use")
            .resource(&ctx.account_id, "")
            .severity(Severity::Medium)
            .risk_vector(RiskVector::ComplianceGap)
            .title("Account not part of an AWS Organization")
            .description(format!(
                "Account {} is a standalone account outside any organization",
                ctx.account_id
            ))
            .analysis(
                "Standalone accounts have no SCP guardrails, no centralized CloudTrail \
                 and no delegated security administration. Every control must be \
                 re-implemented per account by hand.",
            )
            .remediation(remediation("organizations_not_in_use"))
            .evidence("inOrganization", false)
            .build()
    }
}

impl Default for AwsOrganizationsScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for AwsOrganizationsScanner {
    fn service_name(&self) -> &'static str {
        "aws_organizations"
    }

    fn category(&self) -> ScannerCategory {
        ScannerCategory::Governance
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<(Vec<Finding>, usize)> {
        let api = ctx.aws_api()?;
        info!("[Organizations] Starting account-global scan");

        let status = self.fetch_status(ctx, &api).await?;

        let mut findings = Vec::new();
        let mut checks_run = 0;

        // Membership check. A standalone account collapses into one aggregate
        // finding keyed by the account id.
        checks_run += 1;
        let organization = match &status.organization {
            Some(organization) => organization,
            None => {
                findings.push(self.not_in_organization(ctx));
                info!("[Organizations] Scan complete: account is standalone");
                return Ok((findings, checks_run));
            }
        };

        // Check feature set
        checks_run += 1;
        if let Some(f) = isolate(
            "organizations.feature_set",
            self.check_feature_set(ctx, organization),
        )
        .flatten()
        {
            findings.push(f);
        }

        // Check service control policies
        checks_run += 1;
        if let Some(f) = isolate("organizations.scps", self.check_scps(ctx, organization)).flatten()
        {
            findings.push(f);
        }

        info!(
            "[Organizations] Scan complete: {} findings from {} checks",
            findings.len(),
            checks_run
        );
        Ok((findings, checks_run))
    }
}

fn remediation(scan_type: &str) -> Remediation {
    match scan_type {
        "organizations_not_in_use" => Remediation {
            description: "Bring the account into an AWS Organization".to_string(),
            steps: vec![
                "Create or identify the management account for the organization".to_string(),
                "Invite this account and accept the handshake".to_string(),
                "Apply baseline SCPs and centralized CloudTrail from the management account".to_string(),
            ],
            cli_command: Some(
                "aws organizations invite-account-to-organization --target Id=<account-id>,Type=ACCOUNT"
                    .to_string(),
            ),
            effort: RemediationEffort::High,
            automatable: false,
        },
        "organizations_all_features_disabled" => Remediation {
            description: "Enable all features on the organization".to_string(),
            steps: vec![
                "Enable all features from the management account".to_string(),
                "Wait for member account approval where required".to_string(),
            ],
            cli_command: Some("aws organizations enable-all-features".to_string()),
            effort: RemediationEffort::Medium,
            automatable: false,
        },
        "organizations_no_scps" => Remediation {
            description: "Attach baseline service control policies".to_string(),
            steps: vec![
                "Define SCPs denying use of unapproved regions and disabling of audit services".to_string(),
                "Attach them to the root or to organizational units".to_string(),
                "Test with a sandbox OU before broad rollout".to_string(),
            ],
            cli_command: Some(
                "aws organizations create-policy --type SERVICE_CONTROL_POLICY --name baseline --content file://scp.json"
                    .to_string(),
            ),
            effort: RemediationEffort::Medium,
            automatable: false,
        },
        _ => Remediation {
            description: "Review organization governance settings".to_string(),
            steps: vec!["Audit organization structure and attached policies".to_string()],
            cli_command: None,
            effort: RemediationEffort::Medium,
            automatable: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit;

    #[tokio::test]
    async fn test_standalone_account_single_aggregate() {
        let ctx = testkit::aws_context(testkit::StaticAwsApi::default(), &["eu-west-1"]);

        let (findings, checks_run) = AwsOrganizationsScanner::new().scan(&ctx).await.unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(checks_run, 1);
        assert_eq!(findings[0].scan_type, "organizations_not_in_use");
        assert_eq!(findings[0].resource_id, ctx.account_id);
        assert_eq!(findings[0].region, "global");
    }

    #[tokio::test]
    async fn test_full_featured_organization_with_scps_clean() {
        let mut api = testkit::StaticAwsApi::default();
        api.organizations = OrganizationStatus {
            organization: Some(OrganizationDetail {
                id: "o-abc123".to_string(),
                feature_set: "ALL".to_string(),
                service_control_policies: vec!["p-baseline".to_string()],
            }),
        };
        let ctx = testkit::aws_context(api, &["eu-west-1"]);

        let (findings, checks_run) = AwsOrganizationsScanner::new().scan(&ctx).await.unwrap();
        assert!(findings.is_empty());
        assert_eq!(checks_run, 3);
    }

    #[tokio::test]
    async fn test_billing_only_organization_flagged() {
        let mut api = testkit::StaticAwsApi::default();
        api.organizations = OrganizationStatus {
            organization: Some(OrganizationDetail {
                id: "o-xyz789".to_string(),
                feature_set: "CONSOLIDATED_BILLING".to_string(),
                service_control_policies: Vec::new(),
            }),
        };
        let ctx = testkit::aws_context(api, &["eu-west-1"]);

        let (findings, _) = AwsOrganizationsScanner::new().scan(&ctx).await.unwrap();
        let types: Vec<&str> = findings.iter().map(|f| f.scan_type.as_str()).collect();
        assert!(types.contains(&"organizations_all_features_disabled"));
        assert!(types.contains(&"organizations_no_scps"));
    }
}
