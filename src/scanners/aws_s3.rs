// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - AWS S3 Posture Scanner
 * Object storage configuration checks
 *
 * Detects:
 * - Missing default encryption
 * - Absent or incomplete public access block
 * - Public ACL grants (AllUsers / AuthenticatedUsers)
 * - Wildcard principals in bucket policies
 * - Versioning disabled
 * - Server access logging disabled
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use crate::context::ScanContext;
use crate::provider::aws::{AwsApi, S3BucketDetail, S3BucketSummary};
use crate::scanner::{isolate, FindingBuilder, Scanner, ScannerCategory};
use crate::types::{Finding, Remediation, RemediationEffort, RiskVector, Severity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct AwsS3Scanner;

impl AwsS3Scanner {
    pub fn new() -> Self {
        Self
    }

    async fn fetch_buckets(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AwsApi>,
        region: &str,
    ) -> Result<Vec<S3BucketSummary>> {
        let key = ctx.cache_key(&format!("s3:buckets:{}", region));
        let buckets = ctx
            .cache
            .get_or_fetch(&key, || async {
                ctx.rate_limiter
                    .execute("s3.list_buckets", || api.list_buckets(region))
                    .await
            })
            .await
            .context("Failed to list S3 buckets")?;
        Ok(buckets)
    }

    async fn fetch_bucket_detail(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AwsApi>,
        region: &str,
        bucket: &str,
    ) -> Result<S3BucketDetail> {
        let key = ctx.cache_key(&format!("s3:bucket:{}:{}", region, bucket));
        let detail = ctx
            .cache
            .get_or_fetch(&key, || async {
                ctx.rate_limiter
                    .execute("s3.get_bucket_detail", || {
                        api.get_bucket_detail(region, bucket)
                    })
                    .await
            })
            .await
            .with_context(|| format!("Failed to describe bucket {}", bucket))?;
        Ok(detail)
    }

    async fn scan_region(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AwsApi>,
        region: &str,
    ) -> Result<(Vec<Finding>, usize)> {
        let buckets = self.fetch_buckets(ctx, api, region).await?;
        debug!("[S3] Found {} buckets in {}", buckets.len(), region);

        let mut findings = Vec::new();
        let mut checks_run = 0;

        for summary in &buckets {
            let detail = match self
                .fetch_bucket_detail(ctx, api, region, &summary.name)
                .await
            {
                Ok(detail) => detail,
                Err(e) => {
                    warn!("[S3] Skipping bucket {}: {:#}", summary.name, e);
                    continue;
                }
            };

            // Check default encryption
            checks_run += 1;
            if let Some(f) =
                isolate("s3.encryption", self.check_encryption(ctx, region, &detail)).flatten()
            {
                findings.push(f);
            }

            // Check public access block
            checks_run += 1;
            if let Some(f) = isolate(
                "s3.public_access_block",
                self.check_public_access_block(ctx, region, &detail),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check ACL grants
            checks_run += 1;
            if let Some(f) = isolate("s3.acl", self.check_public_acl(ctx, region, &detail)).flatten()
            {
                findings.push(f);
            }

            // Check bucket policy principals
            checks_run += 1;
            if let Some(f) = isolate(
                "s3.bucket_policy",
                self.check_wildcard_policy(ctx, region, &detail),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check versioning
            checks_run += 1;
            if let Some(f) =
                isolate("s3.versioning", self.check_versioning(ctx, region, &detail)).flatten()
            {
                findings.push(f);
            }

            // Check server access logging
            checks_run += 1;
            if let Some(f) = isolate(
                "s3.access_logging",
                self.check_access_logging(ctx, region, &detail),
            )
            .flatten()
            {
                findings.push(f);
            }
        }

        Ok((findings, checks_run))
    }

    fn check_encryption(
        &self,
        ctx: &ScanContext,
        region: &str,
        detail: &S3BucketDetail,
    ) -> Result<Option<Finding>> {
        if detail.encryption.is_some() {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "s3_no_encryption")
            .resource(&detail.name, &detail.arn)
            .severity(Severity::High)
            .risk_vector(RiskVector::DataExposure)
            .title("S3 bucket without default encryption")
            .description(format!(
                "Bucket '{}' has no default server-side encryption configuration",
                detail.name
            ))
            .analysis(
                "Objects uploaded without an explicit encryption header are stored in \
                 plaintext. Anyone who obtains the underlying storage or a misconfigured \
                 replica reads customer data directly.",
            )
            .remediation(remediation("s3_no_encryption"))
            .evidence("encryptionConfigured", false)
            .build();
        Ok(Some(finding))
    }

    fn check_public_access_block(
        &self,
        ctx: &ScanContext,
        region: &str,
        detail: &S3BucketDetail,
    ) -> Result<Option<Finding>> {
        let fully_blocking = detail
            .public_access_block
            .as_ref()
            .map(|pab| pab.fully_blocking())
            .unwrap_or(false);
        if fully_blocking {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "s3_no_public_access_block")
            .resource(&detail.name, &detail.arn)
            .severity(Severity::Critical)
            .risk_vector(RiskVector::PublicExposure)
            .title("S3 public access block missing or incomplete")
            .description(format!(
                "Bucket '{}' does not enforce all four public access block settings",
                detail.name
            ))
            .analysis(
                "Without the public access block, a single permissive ACL or policy \
                 statement is enough to expose every object in the bucket to the internet.",
            )
            .remediation(remediation("s3_no_public_access_block"))
            .evidence("publicAccessBlock", detail.public_access_block.clone())
            .build();
        Ok(Some(finding))
    }

    fn check_public_acl(
        &self,
        ctx: &ScanContext,
        region: &str,
        detail: &S3BucketDetail,
    ) -> Result<Option<Finding>> {
        let public_grants: Vec<String> = detail
            .acl_grants
            .iter()
            .filter(|grant| {
                grant
                    .grantee_uri
                    .as_deref()
                    .map(|uri| uri.contains("AllUsers") || uri.contains("AuthenticatedUsers"))
                    .unwrap_or(false)
            })
            .map(|grant| grant.permission.clone())
            .collect();
        if public_grants.is_empty() {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "s3_public_acl")
            .resource(&detail.name, &detail.arn)
            .severity(Severity::Critical)
            .risk_vector(RiskVector::PublicExposure)
            .title("S3 bucket ACL grants public access")
            .description(format!(
                "Bucket '{}' grants {} permission(s) to AllUsers or AuthenticatedUsers",
                detail.name,
                public_grants.len()
            ))
            .analysis(
                "Public ACL grants bypass IAM entirely. Unauthenticated clients can list \
                 or read bucket contents without any credential trail.",
            )
            .remediation(remediation("s3_public_acl"))
            .evidence("publicGrants", public_grants)
            .build();
        Ok(Some(finding))
    }

    fn check_wildcard_policy(
        &self,
        ctx: &ScanContext,
        region: &str,
        detail: &S3BucketDetail,
    ) -> Result<Option<Finding>> {
        let policy_json = match detail.policy_json.as_deref() {
            Some(json) => json,
            None => return Ok(None),
        };
        let wildcard_sids = wildcard_allow_statements(policy_json)
            .with_context(|| format!("Unparseable bucket policy on {}", detail.name))?;
        if wildcard_sids.is_empty() {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "s3_wildcard_bucket_policy")
            .resource(&detail.name, &detail.arn)
            .severity(Severity::Critical)
            .risk_vector(RiskVector::PublicExposure)
            .title("S3 bucket policy allows wildcard principal")
            .description(format!(
                "Bucket '{}' has {} Allow statement(s) with Principal \"*\"",
                detail.name,
                wildcard_sids.len()
            ))
            .analysis(
                "An Allow statement with a wildcard principal grants the listed actions to \
                 every AWS account and to anonymous callers, regardless of ACL settings.",
            )
            .remediation(remediation("s3_wildcard_bucket_policy"))
            .evidence("statements", wildcard_sids)
            .build();
        Ok(Some(finding))
    }

    fn check_versioning(
        &self,
        ctx: &ScanContext,
        region: &str,
        detail: &S3BucketDetail,
    ) -> Result<Option<Finding>> {
        if detail.versioning_enabled == Some(true) {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "s3_no_versioning")
            .resource(&detail.name, &detail.arn)
            .severity(Severity::Medium)
            .risk_vector(RiskVector::Availability)
            .title("S3 bucket versioning disabled")
            .description(format!(
                "Bucket '{}' does not retain previous object versions",
                detail.name
            ))
            .analysis(
                "Without versioning, an accidental overwrite or a ransomware-style delete \
                 is unrecoverable from the bucket itself.",
            )
            .remediation(remediation("s3_no_versioning"))
            .evidence("versioningEnabled", detail.versioning_enabled)
            .build();
        Ok(Some(finding))
    }

    fn check_access_logging(
        &self,
        ctx: &ScanContext,
        region: &str,
        detail: &S3BucketDetail,
    ) -> Result<Option<Finding>> {
        if detail.logging_target.is_some() {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "s3_no_access_logging")
            .resource(&detail.name, &detail.arn)
            .severity(Severity::Medium)
            .risk_vector(RiskVector::NoAuditTrail)
            .title("S3 server access logging disabled")
            .description(format!(
                "Bucket '{}' has no server access logging target",
                detail.name
            ))
            .analysis(
                "Without access logs there is no record of who read or wrote objects, so \
                 exfiltration from this bucket cannot be reconstructed after the fact.",
            )
            .remediation(remediation("s3_no_access_logging"))
            .evidence("loggingTarget", detail.logging_target.clone())
            .build();
        Ok(Some(finding))
    }
}

impl Default for AwsS3Scanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for AwsS3Scanner {
    fn service_name(&self) -> &'static str {
        "aws_s3"
    }

    fn category(&self) -> ScannerCategory {
        ScannerCategory::ObjectStorage
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<(Vec<Finding>, usize)> {
        let api = ctx.aws_api()?;
        info!("[S3] Starting scan across {} region(s)", ctx.regions.len());

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
                    warn!("[S3] Region {} failed, continuing: {:#}", region, e);
                    failed_regions += 1;
                    last_error = Some(e);
                }
            }
        }

        if failed_regions == ctx.regions.len() {
            if let Some(e) = last_error {
                return Err(e.context("S3 scan failed in every region"));
            }
        }

        info!(
            "[S3] Scan complete: {} findings from {} checks",
            findings.len(),
            checks_run
        );
        Ok((findings, checks_run))
    }
}

/// Sids (or indexes) of Allow statements whose principal is a wildcard
fn wildcard_allow_statements(policy_json: &str) -> Result<Vec<String>> {
    let policy: serde_json::Value =
        serde_json::from_str(policy_json).context("Bucket policy is not valid JSON")?;

    let statements = match &policy["Statement"] {
        serde_json::Value::Array(list) => list.clone(),
        obj @ serde_json::Value::Object(_) => vec![obj.clone()],
        _ => return Ok(Vec::new()),
    };

    let mut matched = Vec::new();
    for (index, statement) in statements.iter().enumerate() {
        if statement["Effect"].as_str() != Some("Allow") {
            continue;
        }
        if !principal_is_wildcard(&statement["Principal"]) {
            continue;
        }
        let label = statement["Sid"]
            .as_str()
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("statement[{}]", index));
        matched.push(label);
    }
    Ok(matched)
}

fn principal_is_wildcard(principal: &serde_json::Value) -> bool {
    match principal {
        serde_json::Value::String(s) => s == "*",
        serde_json::Value::Object(map) => map.get("AWS").map(value_contains_wildcard).unwrap_or(false),
        _ => false,
    }
}

fn value_contains_wildcard(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::String(s) => s == "*",
        serde_json::Value::Array(list) => list.iter().any(|v| v.as_str() == Some("*")),
        _ => false,
    }
}

fn remediation(scan_type: &str) -> Remediation {
    match scan_type {
        "s3_no_encryption" => Remediation {
            description: "Enable default server-side encryption on the bucket".to_string(),
            steps: vec![
                "Enable default encryption with SSE-KMS or SSE-S3".to_string(),
                "Prefer a customer-managed KMS key for audit control".to_string(),
                "Add a bucket policy statement denying unencrypted uploads".to_string(),
            ],
            cli_command: Some(
                "aws s3api put-bucket-encryption --bucket <name> --server-side-encryption-configuration '{\"Rules\":[{\"ApplyServerSideEncryptionByDefault\":{\"SSEAlgorithm\":\"aws:kms\"}}]}'"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "s3_no_public_access_block" => Remediation {
            description: "Enable all four public access block settings".to_string(),
            steps: vec![
                "Enable BlockPublicAcls, IgnorePublicAcls, BlockPublicPolicy and RestrictPublicBuckets".to_string(),
                "Apply the same settings at the account level".to_string(),
                "Audit existing ACLs and policies for already-public grants".to_string(),
            ],
            cli_command: Some(
                "aws s3api put-public-access-block --bucket <name> --public-access-block-configuration BlockPublicAcls=true,IgnorePublicAcls=true,BlockPublicPolicy=true,RestrictPublicBuckets=true"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "s3_public_acl" => Remediation {
            description: "Remove public grants from the bucket ACL".to_string(),
            steps: vec![
                "Reset the bucket ACL to private".to_string(),
                "Serve public content through CloudFront with origin access control instead".to_string(),
                "Enable the public access block to prevent recurrence".to_string(),
            ],
            cli_command: Some("aws s3api put-bucket-acl --bucket <name> --acl private".to_string()),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "s3_wildcard_bucket_policy" => Remediation {
            description: "Restrict bucket policy statements to named principals".to_string(),
            steps: vec![
                "Replace Principal \"*\" with specific account or role ARNs".to_string(),
                "Add Condition blocks (aws:SourceArn, aws:SourceVpce) where cross-account access is required".to_string(),
                "Validate the revised policy with IAM Access Analyzer".to_string(),
            ],
            cli_command: Some("aws s3api get-bucket-policy --bucket <name>".to_string()),
            effort: RemediationEffort::Medium,
            automatable: false,
        },
        "s3_no_versioning" => Remediation {
            description: "Enable object versioning".to_string(),
            steps: vec![
                "Enable versioning on the bucket".to_string(),
                "Add a lifecycle rule to expire noncurrent versions".to_string(),
            ],
            cli_command: Some(
                "aws s3api put-bucket-versioning --bucket <name> --versioning-configuration Status=Enabled"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "s3_no_access_logging" => Remediation {
            description: "Enable server access logging to a dedicated log bucket".to_string(),
            steps: vec![
                "Create or choose a restricted log bucket in the same region".to_string(),
                "Enable server access logging with a per-bucket prefix".to_string(),
                "Set a lifecycle rule on the log bucket for retention".to_string(),
            ],
            cli_command: Some(
                "aws s3api put-bucket-logging --bucket <name> --bucket-logging-status file://logging.json"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        _ => Remediation {
            description: "Review the bucket configuration against the AWS S3 security baseline"
                .to_string(),
            steps: vec![
                "Compare the bucket settings with CIS AWS Foundations section 2.1".to_string(),
                "Enable AWS Config rules for continuous S3 posture monitoring".to_string(),
            ],
            cli_command: None,
            effort: RemediationEffort::Medium,
            automatable: false,
        },
    }
}
