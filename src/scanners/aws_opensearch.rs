// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - AWS OpenSearch Posture Scanner
 * Managed search domain configuration checks
 *
 * Detects:
 * - Encryption at rest disabled
 * - Node-to-node encryption disabled
 * - Domains with public (non-VPC) endpoints
 * - TLS policies permitting TLS 1.0/1.1
 * - Audit logging disabled
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use crate::context::ScanContext;
use crate::provider::aws::{AwsApi, OpenSearchDomain};
use crate::scanner::{isolate, FindingBuilder, Scanner, ScannerCategory};
use crate::types::{Finding, Remediation, RemediationEffort, RiskVector, Severity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct AwsOpenSearchScanner;

impl AwsOpenSearchScanner {
    pub fn new() -> Self {
        Self
    }

    async fn fetch_domains(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AwsApi>,
        region: &str,
    ) -> Result<Vec<OpenSearchDomain>> {
        let key = ctx.cache_key(&format!("opensearch:domains:{}", region));
        let domains = ctx
            .cache
            .get_or_fetch(&key, || async {
                ctx.rate_limiter
                    .execute("opensearch.list_domains", || {
                        api.list_opensearch_domains(region)
                    })
                    .await
            })
            .await
            .context("Failed to list OpenSearch domains")?;
        Ok(domains)
    }

    async fn scan_region(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AwsApi>,
        region: &str,
    ) -> Result<(Vec<Finding>, usize)> {
        let domains = self.fetch_domains(ctx, api, region).await?;
        debug!("[OpenSearch] Found {} domains in {}", domains.len(), region);

        let mut findings = Vec::new();
        let mut checks_run = 0;

        for domain in &domains {
            // Check encryption at rest
            checks_run += 1;
            if let Some(f) = isolate(
                "opensearch.encryption_at_rest",
                self.check_encryption_at_rest(ctx, region, domain),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check node-to-node encryption
            checks_run += 1;
            if let Some(f) = isolate(
                "opensearch.node_to_node",
                self.check_node_to_node(ctx, region, domain),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check endpoint exposure
            checks_run += 1;
            if let Some(f) = isolate(
                "opensearch.endpoint",
                self.check_public_endpoint(ctx, region, domain),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check TLS policy
            checks_run += 1;
            if let Some(f) = isolate(
                "opensearch.tls_policy",
                self.check_tls_policy(ctx, region, domain),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check audit logs
            checks_run += 1;
            if let Some(f) = isolate(
                "opensearch.audit_logs",
                self.check_audit_logs(ctx, region, domain),
            )
            .flatten()
            {
                findings.push(f);
            }
        }

        Ok((findings, checks_run))
    }

    fn check_encryption_at_rest(
        &self,
        ctx: &ScanContext,
        region: &str,
        domain: &OpenSearchDomain,
    ) -> Result<Option<Finding>> {
        if domain.encryption_at_rest == Some(true) {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "opensearch_no_encryption_at_rest")
            .resource(&domain.name, &domain.arn)
            .severity(Severity::High)
            .risk_vector(RiskVector::DataExposure)
            .title("OpenSearch domain without encryption at rest")
            .description(format!(
                "Domain '{}' stores indices without encryption at rest",
                domain.name
            ))
            .analysis(
                "Index data, snapshots and automated backups sit unencrypted on disk. \
                 Anything indexed into the cluster is readable from the storage layer.",
            )
            .remediation(remediation("opensearch_no_encryption_at_rest"))
            .evidence("encryptionAtRest", domain.encryption_at_rest)
            .build();
        Ok(Some(finding))
    }

    fn check_node_to_node(
        &self,
        ctx: &ScanContext,
        region: &str,
        domain: &OpenSearchDomain,
    ) -> Result<Option<Finding>> {
        if domain.node_to_node_encryption == Some(true) {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "opensearch_no_node_to_node_encryption")
            .resource(&domain.name, &domain.arn)
            .severity(Severity::Medium)
            .risk_vector(RiskVector::DataExposure)
            .title("OpenSearch node-to-node encryption disabled")
            .description(format!(
                "Domain '{}' replicates shards between nodes in cleartext",
                domain.name
            ))
            .analysis(
                "Intra-cluster traffic carries full document contents. A foothold in the \
                 cluster network segment allows passive capture of indexed data.",
            )
            .remediation(remediation("opensearch_no_node_to_node_encryption"))
            .evidence("nodeToNodeEncryption", domain.node_to_node_encryption)
            .build();
        Ok(Some(finding))
    }

    fn check_public_endpoint(
        &self,
        ctx: &ScanContext,
        region: &str,
        domain: &OpenSearchDomain,
    ) -> Result<Option<Finding>> {
        if domain.vpc_id.is_some() {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "opensearch_public_endpoint")
            .resource(&domain.name, &domain.arn)
            .severity(Severity::Critical)
            .risk_vector(RiskVector::PublicExposure)
            .title("OpenSearch domain publicly reachable")
            .description(format!(
                "Domain '{}' is not VPC-attached; its endpoint is internet-facing",
                domain.name
            ))
            .analysis(
                "The endpoint is reachable from any network and protected only by its \
                 access policy. Exposed search clusters are a recurring source of bulk \
                 data leaks.",
            )
            .remediation(remediation("opensearch_public_endpoint"))
            .evidence("vpcId", domain.vpc_id.clone())
            .build();
        Ok(Some(finding))
    }

    fn check_tls_policy(
        &self,
        ctx: &ScanContext,
        region: &str,
        domain: &OpenSearchDomain,
    ) -> Result<Option<Finding>> {
        let policy = match domain.tls_security_policy.as_deref() {
            Some(policy) => policy,
            None => return Ok(None),
        };
        // Policy names embed the minimum TLS version, e.g. Policy-Min-TLS-1-0-2019-07
        let weak = policy.contains("TLS-1-0") || policy.contains("TLS-1-1");
        if !weak {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "opensearch_weak_tls_policy")
            .resource(&domain.name, &domain.arn)
            .severity(Severity::Medium)
            .risk_vector(RiskVector::DataExposure)
            .title("OpenSearch domain accepts legacy TLS")
            .description(format!(
                "Domain '{}' endpoint policy '{}' permits TLS below 1.2",
                domain.name, policy
            ))
            .analysis(
                "TLS 1.0/1.1 downgrade positions allow interception of queries and \
                 results between clients and the domain endpoint.",
            )
            .remediation(remediation("opensearch_weak_tls_policy"))
            .evidence("tlsSecurityPolicy", policy)
            .build();
        Ok(Some(finding))
    }

    fn check_audit_logs(
        &self,
        ctx: &ScanContext,
        region: &str,
        domain: &OpenSearchDomain,
    ) -> Result<Option<Finding>> {
        if domain.audit_logs_enabled == Some(true) {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "opensearch_no_audit_logs")
            .resource(&domain.name, &domain.arn)
            .severity(Severity::Medium)
            .risk_vector(RiskVector::NoAuditTrail)
            .title("OpenSearch audit logging disabled")
            .description(format!(
                "Domain '{}' does not publish audit logs",
                domain.name
            ))
            .analysis(
                "Authentication events and index-level access are unrecorded, so \
                 unauthorized queries against sensitive indices cannot be traced.",
            )
            .remediation(remediation("opensearch_no_audit_logs"))
            .evidence("auditLogsEnabled", domain.audit_logs_enabled)
            .build();
        Ok(Some(finding))
    }
}

impl Default for AwsOpenSearchScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for AwsOpenSearchScanner {
    fn service_name(&self) -> &'static str {
        "aws_opensearch"
    }

    fn category(&self) -> ScannerCategory {
        ScannerCategory::ManagedSearch
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<(Vec<Finding>, usize)> {
        let api = ctx.aws_api()?;
        info!(
            "[OpenSearch] Starting scan across {} region(s)",
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
                    warn!("[OpenSearch] Region {} failed, continuing: {:#}", region, e);
                    failed_regions += 1;
                    last_error = Some(e);
                }
            }
        }

        if failed_regions == ctx.regions.len() {
            if let Some(e) = last_error {
                return Err(e.context("OpenSearch scan failed in every region"));
            }
        }

        info!(
            "[OpenSearch] Scan complete: {} findings from {} checks",
            findings.len(),
            checks_run
        );
        Ok((findings, checks_run))
    }
}

fn remediation(scan_type: &str) -> Remediation {
    match scan_type {
        "opensearch_no_encryption_at_rest" => Remediation {
            description: "Recreate or migrate the domain with encryption at rest".to_string(),
            steps: vec![
                "Create a replacement domain with encryption at rest and a KMS key".to_string(),
                "Reindex from the old domain, then retire it".to_string(),
            ],
            cli_command: Some(
                "aws opensearch create-domain --domain-name <name> --encryption-at-rest-options Enabled=true"
                    .to_string(),
            ),
            effort: RemediationEffort::High,
            automatable: false,
        },
        "opensearch_no_node_to_node_encryption" => Remediation {
            description: "Enable node-to-node encryption".to_string(),
            steps: vec![
                "Enable node-to-node encryption (requires domain recreation on old engines)".to_string(),
            ],
            cli_command: Some(
                "aws opensearch update-domain-config --domain-name <name> --node-to-node-encryption-options Enabled=true"
                    .to_string(),
            ),
            effort: RemediationEffort::High,
            automatable: false,
        },
        "opensearch_public_endpoint" => Remediation {
            description: "Move the domain behind a VPC endpoint".to_string(),
            steps: vec![
                "Provision the domain inside a VPC with security groups".to_string(),
                "Restrict the access policy to known principals and source conditions".to_string(),
                "Front public search traffic with an application layer, never the domain itself".to_string(),
            ],
            cli_command: Some("aws opensearch describe-domain --domain-name <name>".to_string()),
            effort: RemediationEffort::High,
            automatable: false,
        },
        "opensearch_weak_tls_policy" => Remediation {
            description: "Raise the endpoint TLS policy to a 1.2 minimum".to_string(),
            steps: vec![
                "Set the TLS security policy to Policy-Min-TLS-1-2-2019-07 or newer".to_string(),
            ],
            cli_command: Some(
                "aws opensearch update-domain-config --domain-name <name> --domain-endpoint-options TLSSecurityPolicy=Policy-Min-TLS-1-2-2019-07"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "opensearch_no_audit_logs" => Remediation {
            description: "Publish audit logs to CloudWatch".to_string(),
            steps: vec![
                "Enable audit logs with a CloudWatch Logs destination".to_string(),
                "Alert on authentication failures and index-permission denials".to_string(),
            ],
            cli_command: Some(
                "aws opensearch update-domain-config --domain-name <name> --log-publishing-options 'AUDIT_LOGS={Enabled=true,CloudWatchLogsLogGroupArn=<arn>}'"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        _ => Remediation {
            description: "Review the domain against the OpenSearch security baseline".to_string(),
            steps: vec!["Compare domain options with the AWS OpenSearch security guide".to_string()],
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

    fn hardened_domain() -> OpenSearchDomain {
        OpenSearchDomain {
            name: "search-prod".to_string(),
            arn: "arn:aws:es:eu-west-1:123456789012:domain/search-prod".to_string(),
            encryption_at_rest: Some(true),
            node_to_node_encryption: Some(true),
            vpc_id: Some("vpc-0a1b2c".to_string()),
            tls_security_policy: Some("Policy-Min-TLS-1-2-2019-07".to_string()),
            audit_logs_enabled: Some(true),
        }
    }

    #[tokio::test]
    async fn test_hardened_domain_clean() {
        let mut api = testkit::StaticAwsApi::default();
        api.opensearch_domains = vec![hardened_domain()];
        let ctx = testkit::aws_context(api, &["eu-west-1"]);

        let (findings, checks_run) = AwsOpenSearchScanner::new().scan(&ctx).await.unwrap();
        assert!(findings.is_empty());
        assert_eq!(checks_run, 5);
    }

    #[tokio::test]
    async fn test_public_unencrypted_domain_flagged() {
        let mut api = testkit::StaticAwsApi::default();
        api.opensearch_domains = vec![OpenSearchDomain {
            name: "search-legacy".to_string(),
            arn: "arn:aws:es:eu-west-1:123456789012:domain/search-legacy".to_string(),
            encryption_at_rest: Some(false),
            node_to_node_encryption: None,
            vpc_id: None,
            tls_security_policy: Some("Policy-Min-TLS-1-0-2019-07".to_string()),
            audit_logs_enabled: None,
        }];
        let ctx = testkit::aws_context(api, &["eu-west-1"]);

        let (findings, _) = AwsOpenSearchScanner::new().scan(&ctx).await.unwrap();
        let types: Vec<&str> = findings.iter().map(|f| f.scan_type.as_str()).collect();
        assert_eq!(findings.len(), 5);
        assert!(types.contains(&"opensearch_public_endpoint"));
        assert!(types.contains(&"opensearch_weak_tls_policy"));

        let public = findings
            .iter()
            .find(|f| f.scan_type == "opensearch_public_endpoint")
            .unwrap();
        assert_eq!(public.severity, Severity::Critical);
        assert_eq!(public.risk_vector, RiskVector::PublicExposure);
    }
}
