// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - AWS EKS Posture Scanner
 * Kubernetes control plane configuration checks
 *
 * Detects:
 * - Public API server endpoints
 * - Control plane logging disabled
 * - Clusters on Kubernetes versions past end of support
 * - Secrets stored without envelope encryption
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use crate::context::ScanContext;
use crate::provider::aws::{AwsApi, EksCluster};
use crate::scanner::{isolate, FindingBuilder, Scanner, ScannerCategory};
use crate::types::{Finding, Remediation, RemediationEffort, RiskVector, Severity};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Oldest Kubernetes minor version still in AWS standard support
const MIN_SUPPORTED_MINOR: u32 = 29;

pub struct AwsEksScanner;

impl AwsEksScanner {
    pub fn new() -> Self {
        Self
    }

    async fn fetch_clusters(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AwsApi>,
        region: &str,
    ) -> Result<Vec<EksCluster>> {
        let key = ctx.cache_key(&format!("eks:clusters:{}", region));
        let clusters = ctx
            .cache
            .get_or_fetch(&key, || async {
                ctx.rate_limiter
                    .execute("eks.list_clusters", || api.list_eks_clusters(region))
                    .await
            })
            .await
            .context("Failed to list EKS clusters")?;
        Ok(clusters)
    }

    async fn scan_region(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AwsApi>,
        region: &str,
    ) -> Result<(Vec<Finding>, usize)> {
        let clusters = self.fetch_clusters(ctx, api, region).await?;
        debug!("[EKS] Found {} clusters in {}", clusters.len(), region);

        let mut findings = Vec::new();
        let mut checks_run = 0;

        for cluster in &clusters {
            // Check endpoint exposure
            checks_run += 1;
            if let Some(f) = isolate(
                "eks.endpoint",
                self.check_public_endpoint(ctx, region, cluster),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check control plane logging
            checks_run += 1;
            if let Some(f) = isolate(
                "eks.control_plane_logging",
                self.check_control_plane_logging(ctx, region, cluster),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check Kubernetes version
            checks_run += 1;
            if let Some(f) =
                isolate("eks.version", self.check_version(ctx, region, cluster)).flatten()
            {
                findings.push(f);
            }

            // Check secrets encryption
            checks_run += 1;
            if let Some(f) = isolate(
                "eks.secrets_encryption",
                self.check_secrets_encryption(ctx, region, cluster),
            )
            .flatten()
            {
                findings.push(f);
            }
        }

        Ok((findings, checks_run))
    }

    fn check_public_endpoint(
        &self,
        ctx: &ScanContext,
        region: &str,
        cluster: &EksCluster,
    ) -> Result<Option<Finding>> {
        if !cluster.endpoint_public_access {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "eks_public_endpoint")
            .resource(&cluster.name, &cluster.arn)
            .severity(Severity::High)
            .risk_vector(RiskVector::PublicExposure)
            .title("EKS API server publicly reachable")
            .description(format!(
                "Cluster '{}' exposes its Kubernetes API endpoint to the internet",
                cluster.name
            ))
            .analysis(
                "The API server is one credential or token leak away from full cluster \
                 takeover. Internet exposure also invites constant authentication \
                 probing and exploit attempts against the control plane.",
            )
            .remediation(remediation("eks_public_endpoint"))
            .evidence("endpointPublicAccess", cluster.endpoint_public_access)
            .evidence("endpointPrivateAccess", cluster.endpoint_private_access)
            .build();
        Ok(Some(finding))
    }

    fn check_control_plane_logging(
        &self,
        ctx: &ScanContext,
        region: &str,
        cluster: &EksCluster,
    ) -> Result<Option<Finding>> {
        if !cluster.enabled_log_types.is_empty() {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "eks_control_plane_logging_disabled")
            .resource(&cluster.name, &cluster.arn)
            .severity(Severity::Medium)
            .risk_vector(RiskVector::NoAuditTrail)
            .title("EKS control plane logging disabled")
            .description(format!(
                "Cluster '{}' ships no control plane log types to CloudWatch",
                cluster.name
            ))
            .analysis(
                "API audit events, authenticator decisions and scheduler activity are \
                 discarded, so privilege escalation inside the cluster leaves no trace.",
            )
            .remediation(remediation("eks_control_plane_logging_disabled"))
            .evidence("enabledLogTypes", &cluster.enabled_log_types)
            .build();
        Ok(Some(finding))
    }

    fn check_version(
        &self,
        ctx: &ScanContext,
        region: &str,
        cluster: &EksCluster,
    ) -> Result<Option<Finding>> {
        let minor = parse_minor_version(&cluster.version)
            .with_context(|| format!("Unparseable Kubernetes version on {}", cluster.name))?;
        if minor >= MIN_SUPPORTED_MINOR {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "eks_outdated_version")
            .resource(&cluster.name, &cluster.arn)
            .severity(Severity::Medium)
            .risk_vector(RiskVector::ComplianceGap)
            .title("EKS cluster past end of standard support")
            .description(format!(
                "Cluster '{}' runs Kubernetes {} (standard support floor is 1.{})",
                cluster.name, cluster.version, MIN_SUPPORTED_MINOR
            ))
            .analysis(
                "Out-of-support control planes stop receiving security patches on the \
                 regular channel and eventually force-upgrade at AWS's schedule, not \
                 the team's.",
            )
            .remediation(remediation("eks_outdated_version"))
            .evidence("version", &cluster.version)
            .build();
        Ok(Some(finding))
    }

    fn check_secrets_encryption(
        &self,
        ctx: &ScanContext,
        region: &str,
        cluster: &EksCluster,
    ) -> Result<Option<Finding>> {
        if cluster.secrets_encryption_key_arn.is_some() {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "eks_secrets_not_encrypted")
            .resource(&cluster.name, &cluster.arn)
            .severity(Severity::High)
            .risk_vector(RiskVector::CredentialExposure)
            .title("EKS secrets without envelope encryption")
            .description(format!(
                "Cluster '{}' has no KMS key configured for secrets encryption",
                cluster.name
            ))
            .analysis(
                "Kubernetes Secrets are stored base64-encoded in etcd. Without a KMS \
                 envelope, any etcd snapshot or backup exposes every credential the \
                 cluster holds.",
            )
            .remediation(remediation("eks_secrets_not_encrypted"))
            .evidence("secretsEncryptionKeyArn", serde_json::Value::Null)
            .build();
        Ok(Some(finding))
    }
}

impl Default for AwsEksScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for AwsEksScanner {
    fn service_name(&self) -> &'static str {
        "aws_eks"
    }

    fn category(&self) -> ScannerCategory {
        ScannerCategory::ContainerOrchestration
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<(Vec<Finding>, usize)> {
        let api = ctx.aws_api()?;
        info!("[EKS] Starting scan across {} region(s)", ctx.regions.len());

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
                    warn!("[EKS] Region {} failed, continuing: {:#}", region, e);
                    failed_regions += 1;
                    last_error = Some(e);
                }
            }
        }

        if failed_regions == ctx.regions.len() {
            if let Some(e) = last_error {
                return Err(e.context("EKS scan failed in every region"));
            }
        }

        info!(
            "[EKS] Scan complete: {} findings from {} checks",
            findings.len(),
            checks_run
        );
        Ok((findings, checks_run))
    }
}

/// Minor component of a "major.minor" Kubernetes version string
fn parse_minor_version(version: &str) -> Result<u32> {
    let minor = version
        .split('.')
        .nth(1)
        .ok_or_else(|| anyhow!("version '{}' has no minor component", version))?;
    let minor = minor
        .parse::<u32>()
        .map_err(|_| anyhow!("version '{}' has a non-numeric minor component", version))?;
    Ok(minor)
}

fn remediation(scan_type: &str) -> Remediation {
    match scan_type {
        "eks_public_endpoint" => Remediation {
            description: "Restrict the API server endpoint".to_string(),
            steps: vec![
                "Enable private endpoint access".to_string(),
                "Disable public access, or restrict it to known CIDR blocks during migration".to_string(),
                "Route operator access through a bastion or VPN".to_string(),
            ],
            cli_command: Some(
                "aws eks update-cluster-config --name <cluster> --resources-vpc-config endpointPublicAccess=false,endpointPrivateAccess=true"
                    .to_string(),
            ),
            effort: RemediationEffort::Medium,
            automatable: true,
        },
        "eks_control_plane_logging_disabled" => Remediation {
            description: "Enable control plane log types".to_string(),
            steps: vec![
                "Enable at least the audit and authenticator log types".to_string(),
                "Set retention on the CloudWatch log group".to_string(),
            ],
            cli_command: Some(
                "aws eks update-cluster-config --name <cluster> --logging '{\"clusterLogging\":[{\"types\":[\"api\",\"audit\",\"authenticator\"],\"enabled\":true}]}'"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "eks_outdated_version" => Remediation {
            description: "Upgrade the cluster to a supported version".to_string(),
            steps: vec![
                "Review deprecated API usage with kubent or pluto before upgrading".to_string(),
                "Upgrade the control plane one minor version at a time".to_string(),
                "Upgrade node groups and add-ons to match".to_string(),
            ],
            cli_command: Some(
                "aws eks update-cluster-version --name <cluster> --kubernetes-version <version>"
                    .to_string(),
            ),
            effort: RemediationEffort::High,
            automatable: false,
        },
        "eks_secrets_not_encrypted" => Remediation {
            description: "Enable KMS envelope encryption for secrets".to_string(),
            steps: vec![
                "Associate a KMS key with the cluster's secrets encryption config".to_string(),
                "Re-create existing Secrets so they are rewritten encrypted".to_string(),
            ],
            cli_command: Some(
                "aws eks associate-encryption-config --cluster-name <cluster> --encryption-config '[{\"resources\":[\"secrets\"],\"provider\":{\"keyArn\":\"<key-arn>\"}}]'"
                    .to_string(),
            ),
            effort: RemediationEffort::Medium,
            automatable: true,
        },
        _ => Remediation {
            description: "Review the cluster against the EKS hardening guide".to_string(),
            steps: vec!["Compare cluster settings with the EKS best practices guide".to_string()],
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

    fn hardened_cluster() -> EksCluster {
        EksCluster {
            name: "prod".to_string(),
            arn: "arn:aws:eks:eu-west-1:123456789012:cluster/prod".to_string(),
            version: "1.31".to_string(),
            endpoint_public_access: false,
            endpoint_private_access: true,
            enabled_log_types: vec!["api".to_string(), "audit".to_string()],
            secrets_encryption_key_arn: Some(
                "arn:aws:kms:eu-west-1:123456789012:key/k1".to_string(),
            ),
        }
    }

    #[tokio::test]
    async fn test_hardened_cluster_clean() {
        let mut api = testkit::StaticAwsApi::default();
        api.eks_clusters = vec![hardened_cluster()];
        let ctx = testkit::aws_context(api, &["eu-west-1"]);

        let (findings, checks_run) = AwsEksScanner::new().scan(&ctx).await.unwrap();
        assert!(findings.is_empty());
        assert_eq!(checks_run, 4);
    }

    #[tokio::test]
    async fn test_exposed_outdated_cluster_flagged() {
        let mut api = testkit::StaticAwsApi::default();
        api.eks_clusters = vec![EksCluster {
            name: "legacy".to_string(),
            arn: "arn:aws:eks:eu-west-1:123456789012:cluster/legacy".to_string(),
            version: "1.25".to_string(),
            endpoint_public_access: true,
            endpoint_private_access: false,
            enabled_log_types: Vec::new(),
            secrets_encryption_key_arn: None,
        }];
        let ctx = testkit::aws_context(api, &["eu-west-1"]);

        let (findings, _) = AwsEksScanner::new().scan(&ctx).await.unwrap();
        assert_eq!(findings.len(), 4);
        let types: Vec<&str> = findings.iter().map(|f| f.scan_type.as_str()).collect();
        assert!(types.contains(&"eks_public_endpoint"));
        assert!(types.contains(&"eks_outdated_version"));
        assert!(types.contains(&"eks_secrets_not_encrypted"));
    }

    #[test]
    fn test_version_parsing() {
        assert_eq!(parse_minor_version("1.29").unwrap(), 29);
        assert_eq!(parse_minor_version("1.31").unwrap(), 31);
        assert!(parse_minor_version("garbage").is_err());
    }

    #[test]
    fn test_unparseable_version_is_an_error() {
        let scanner = AwsEksScanner::new();
        let ctx = testkit::aws_context(testkit::StaticAwsApi::default(), &["eu-west-1"]);
        let mut cluster = hardened_cluster();
        cluster.version = "latest".to_string();

        assert!(scanner.check_version(&ctx, "eu-west-1", &cluster).is_err());
    }
}
