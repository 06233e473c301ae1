// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - AWS CloudFront Posture Scanner
 * CDN distribution configuration checks (account-global, no region fan-out)
 *
 * Detects:
 * - Viewer policies allowing plain HTTP
 * - Minimum protocol versions below TLS 1.2
 * - Access logging disabled
 * - Distributions without a WAF web ACL
 * - Certificates expiring inside 30 days (graduated severity)
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use crate::context::ScanContext;
use crate::provider::aws::{AwsApi, CloudFrontDistribution};
use crate::scanner::{isolate, FindingBuilder, Scanner, ScannerCategory};
use crate::types::{Finding, Remediation, RemediationEffort, RiskVector, Severity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Certificates inside this window are reported, graduated by urgency
const EXPIRY_WARNING_DAYS: i64 = 30;
const EXPIRY_CRITICAL_DAYS: i64 = 7;

pub struct AwsCloudFrontScanner;

impl AwsCloudFrontScanner {
    pub fn new() -> Self {
        Self
    }

    async fn fetch_distributions(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AwsApi>,
    ) -> Result<Vec<CloudFrontDistribution>> {
        let key = ctx.cache_key("cloudfront:distributions");
        let distributions = ctx
            .cache
            .get_or_fetch(&key, || async {
                ctx.rate_limiter
                    .execute("cloudfront.list_distributions", || {
                        api.list_cloudfront_distributions()
                    })
                    .await
            })
            .await
            .context("Failed to list CloudFront distributions")?;
        Ok(distributions)
    }

    fn check_http_allowed(
        &self,
        ctx: &ScanContext,
        distribution: &CloudFrontDistribution,
    ) -> Result<Option<Finding>> {
        if distribution.viewer_protocol_policy != "allow-all" {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, "global", "cloudfront_http_allowed")
            .resource(&distribution.id, &distribution.arn)
            .severity(Severity::High)
            .risk_vector(RiskVector::DataExposure)
            .title("CloudFront distribution serves plain HTTP")
            .description(format!(
                "Distribution '{}' ({}) accepts unencrypted viewer connections",
                distribution.id, distribution.domain_name
            ))
            .analysis(
                "Session cookies and page content travel in cleartext between viewers \
                 and the edge. Any on-path network position can read or rewrite them.",
            )
            .remediation(remediation("cloudfront_http_allowed"))
            .evidence("viewerProtocolPolicy", &distribution.viewer_protocol_policy)
            .build();
        Ok(Some(finding))
    }

    fn check_minimum_tls(
        &self,
        ctx: &ScanContext,
        distribution: &CloudFrontDistribution,
    ) -> Result<Option<Finding>> {
        let version = match distribution.minimum_protocol_version.as_deref() {
            Some(version) => version,
            None => return Ok(None),
        };
        let strong = version.starts_with("TLSv1.2") || version.starts_with("TLSv1.3");
        if strong {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, "global", "cloudfront_weak_tls")
            .resource(&distribution.id, &distribution.arn)
            .severity(Severity::Medium)
            .risk_vector(RiskVector::DataExposure)
            .title("CloudFront minimum protocol below TLS 1.2")
            .description(format!(
                "Distribution '{}' negotiates down to {}",
                distribution.id, version
            ))
            .analysis(
                "Clients can be downgraded to protocol versions with known cryptographic \
                 weaknesses, undermining the HTTPS guarantee for every viewer.",
            )
            .remediation(remediation("cloudfront_weak_tls"))
            .evidence("minimumProtocolVersion", version)
            .build();
        Ok(Some(finding))
    }

    fn check_access_logging(
        &self,
        ctx: &ScanContext,
        distribution: &CloudFrontDistribution,
    ) -> Result<Option<Finding>> {
        if distribution.logging_enabled {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, "global", "cloudfront_no_access_logging")
            .resource(&distribution.id, &distribution.arn)
            .severity(Severity::Medium)
            .risk_vector(RiskVector::NoAuditTrail)
            .title("CloudFront access logging disabled")
            .description(format!(
                "Distribution '{}' does not write standard access logs",
                distribution.id
            ))
            .analysis(
                "Edge requests leave no record, so scraping, credential stuffing or \
                 abuse through this distribution cannot be reconstructed.",
            )
            .remediation(remediation("cloudfront_no_access_logging"))
            .evidence("loggingEnabled", distribution.logging_enabled)
            .build();
        Ok(Some(finding))
    }

    fn check_waf(
        &self,
        ctx: &ScanContext,
        distribution: &CloudFrontDistribution,
    ) -> Result<Option<Finding>> {
        if distribution.web_acl_id.is_some() {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, "global", "cloudfront_no_waf")
            .resource(&distribution.id, &distribution.arn)
            .severity(Severity::Medium)
            .risk_vector(RiskVector::ComplianceGap)
            .title("CloudFront distribution without WAF")
            .description(format!(
                "Distribution '{}' has no web ACL associated",
                distribution.id
            ))
            .analysis(
                "Requests reach the origin unfiltered. Common exploit traffic and \
                 volumetric abuse hit the application directly instead of being \
                 dropped at the edge.",
            )
            .remediation(remediation("cloudfront_no_waf"))
            .evidence("webAclId", serde_json::Value::Null)
            .build();
        Ok(Some(finding))
    }

    fn check_certificate_expiry(
        &self,
        ctx: &ScanContext,
        distribution: &CloudFrontDistribution,
    ) -> Result<Option<Finding>> {
        let expiry = match distribution.certificate_expiry {
            Some(expiry) => expiry,
            None => return Ok(None),
        };
        let days_left = (expiry - Utc::now()).num_days();
        if days_left > EXPIRY_WARNING_DAYS {
            return Ok(None);
        }

        let severity = if days_left <= EXPIRY_CRITICAL_DAYS {
            Severity::Critical
        } else {
            Severity::High
        };
        let finding = FindingBuilder::new(ctx, "global", "cloudfront_certificate_expiring")
            .resource(&distribution.id, &distribution.arn)
            .severity(severity)
            .risk_vector(RiskVector::Availability)
            .title("CloudFront certificate expiring")
            .description(format!(
                "Distribution '{}' certificate expires in {} day(s)",
                distribution.id,
                days_left.max(0)
            ))
            .analysis(
                "When the certificate lapses every HTTPS viewer receives a hard \
                 browser error and the distribution is effectively down.",
            )
            .remediation(remediation("cloudfront_certificate_expiring"))
            .evidence("certificateExpiry", expiry.to_rfc3339())
            .evidence("daysRemaining", days_left)
            .build();
        Ok(Some(finding))
    }
}

impl Default for AwsCloudFrontScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for AwsCloudFrontScanner {
    fn service_name(&self) -> &'static str {
        "aws_cloudfront"
    }

    fn category(&self) -> ScannerCategory {
        ScannerCategory::ContentDelivery
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<(Vec<Finding>, usize)> {
        let api = ctx.aws_api()?;
        info!("[CloudFront] Starting account-global scan");

        let distributions = self.fetch_distributions(ctx, &api).await?;
        let mut findings = Vec::new();
        let mut checks_run = 0;

        for distribution in &distributions {
            if !distribution.enabled {
                debug!(
                    "[CloudFront] Skipping disabled distribution {}",
                    distribution.id
                );
                continue;
            }

            // Check viewer protocol
            checks_run += 1;
            if let Some(f) = isolate(
                "cloudfront.viewer_protocol",
                self.check_http_allowed(ctx, distribution),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check minimum TLS version
            checks_run += 1;
            if let Some(f) = isolate(
                "cloudfront.minimum_tls",
                self.check_minimum_tls(ctx, distribution),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check access logging
            checks_run += 1;
            if let Some(f) = isolate(
                "cloudfront.access_logging",
                self.check_access_logging(ctx, distribution),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check WAF association
            checks_run += 1;
            if let Some(f) = isolate("cloudfront.waf", self.check_waf(ctx, distribution)).flatten()
            {
                findings.push(f);
            }

            // Check certificate expiry
            checks_run += 1;
            if let Some(f) = isolate(
                "cloudfront.certificate",
                self.check_certificate_expiry(ctx, distribution),
            )
            .flatten()
            {
                findings.push(f);
            }
        }

        info!(
            "[CloudFront] Scan complete: {} findings from {} checks",
            findings.len(),
            checks_run
        );
        Ok((findings, checks_run))
    }
}

fn remediation(scan_type: &str) -> Remediation {
    match scan_type {
        "cloudfront_http_allowed" => Remediation {
            description: "Redirect or refuse plain HTTP at the edge".to_string(),
            steps: vec![
                "Set the viewer protocol policy to redirect-to-https".to_string(),
                "Enable HSTS through a response headers policy".to_string(),
            ],
            cli_command: Some(
                "aws cloudfront get-distribution-config --id <id>".to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "cloudfront_weak_tls" => Remediation {
            description: "Raise the minimum protocol version".to_string(),
            steps: vec![
                "Set the security policy to TLSv1.2_2021 or newer".to_string(),
                "Check viewer analytics for legacy clients before the cutover".to_string(),
            ],
            cli_command: Some(
                "aws cloudfront update-distribution --id <id> --distribution-config file://config.json"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "cloudfront_no_access_logging" => Remediation {
            description: "Enable standard access logs".to_string(),
            steps: vec![
                "Enable logging to a dedicated, restricted S3 bucket".to_string(),
                "Set a lifecycle rule on the log bucket".to_string(),
            ],
            cli_command: Some(
                "aws cloudfront update-distribution --id <id> --distribution-config file://config.json"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "cloudfront_no_waf" => Remediation {
            description: "Associate a WAF web ACL".to_string(),
            steps: vec![
                "Create a web ACL with the AWS managed core rule set".to_string(),
                "Associate it with the distribution and monitor in count mode first".to_string(),
            ],
            cli_command: Some(
                "aws wafv2 associate-web-acl --web-acl-arn <acl-arn> --resource-arn <distribution-arn>"
                    .to_string(),
            ),
            effort: RemediationEffort::Medium,
            automatable: true,
        },
        "cloudfront_certificate_expiring" => Remediation {
            description: "Renew or replace the certificate before expiry".to_string(),
            steps: vec![
                "Renew the ACM certificate or re-validate the domain".to_string(),
                "Switch to DNS validation so ACM renews automatically".to_string(),
            ],
            cli_command: Some(
                "aws acm describe-certificate --certificate-arn <arn>".to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        _ => Remediation {
            description: "Review the distribution against the CloudFront security baseline"
                .to_string(),
            steps: vec!["Compare settings with the CDN hardening checklist".to_string()],
            cli_command: None,
            effort: RemediationEffort::Medium,
            automatable: false,
        },
    }
}
