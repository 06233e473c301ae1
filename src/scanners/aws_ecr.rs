// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - AWS ECR Posture Scanner
 * Container registry configuration checks
 *
 * Detects:
 * - Image scanning on push disabled
 * - Mutable image tags
 * - Missing lifecycle policies
 * - Wildcard principals in repository policies
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use crate::context::ScanContext;
use crate::provider::aws::{AwsApi, EcrRepository};
use crate::scanner::{isolate, FindingBuilder, Scanner, ScannerCategory};
use crate::types::{Finding, Remediation, RemediationEffort, RiskVector, Severity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct AwsEcrScanner;

impl AwsEcrScanner {
    pub fn new() -> Self {
        Self
    }

    async fn fetch_repositories(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AwsApi>,
        region: &str,
    ) -> Result<Vec<EcrRepository>> {
        let key = ctx.cache_key(&format!("ecr:repositories:{}", region));
        let repositories = ctx
            .cache
            .get_or_fetch(&key, || async {
                ctx.rate_limiter
                    .execute("ecr.list_repositories", || {
                        api.list_ecr_repositories(region)
                    })
                    .await
            })
            .await
            .context("Failed to list ECR repositories")?;
        Ok(repositories)
    }

    async fn scan_region(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AwsApi>,
        region: &str,
    ) -> Result<(Vec<Finding>, usize)> {
        let repositories = self.fetch_repositories(ctx, api, region).await?;
        debug!("[ECR] Found {} repositories in {}", repositories.len(), region);

        let mut findings = Vec::new();
        let mut checks_run = 0;

        for repository in &repositories {
            // Check scan-on-push
            checks_run += 1;
            if let Some(f) = isolate(
                "ecr.scan_on_push",
                self.check_scan_on_push(ctx, region, repository),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check tag immutability
            checks_run += 1;
            if let Some(f) = isolate(
                "ecr.tag_mutability",
                self.check_tag_mutability(ctx, region, repository),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check lifecycle policy
            checks_run += 1;
            if let Some(f) = isolate(
                "ecr.lifecycle_policy",
                self.check_lifecycle_policy(ctx, region, repository),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check repository policy principals
            checks_run += 1;
            if let Some(f) = isolate(
                "ecr.repository_policy",
                self.check_repository_policy(ctx, region, repository),
            )
            .flatten()
            {
                findings.push(f);
            }
        }

        Ok((findings, checks_run))
    }

    fn check_scan_on_push(
        &self,
        ctx: &ScanContext,
        region: &str,
        repository: &EcrRepository,
    ) -> Result<Option<Finding>> {
        if repository.scan_on_push {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "ecr_scan_on_push_disabled")
            .resource(&repository.name, &repository.arn)
            .severity(Severity::High)
            .risk_vector(RiskVector::ComplianceGap)
            .title("ECR repository without scan on push")
            .description(format!(
                "Repository '{}' does not scan images on push",
                repository.name
            ))
            .analysis(
                "Images land in the registry without any vulnerability assessment, so \
                 known-exploitable CVEs reach production workloads undetected.",
            )
            .remediation(remediation("ecr_scan_on_push_disabled"))
            .evidence("scanOnPush", repository.scan_on_push)
            .build();
        Ok(Some(finding))
    }

    fn check_tag_mutability(
        &self,
        ctx: &ScanContext,
        region: &str,
        repository: &EcrRepository,
    ) -> Result<Option<Finding>> {
        if repository.tag_mutability == "IMMUTABLE" {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "ecr_mutable_tags")
            .resource(&repository.name, &repository.arn)
            .severity(Severity::Medium)
            .risk_vector(RiskVector::ComplianceGap)
            .title("ECR repository allows mutable tags")
            .description(format!(
                "Repository '{}' permits overwriting existing image tags",
                repository.name
            ))
            .analysis(
                "A tag such as 'v1.2.0' can be silently repointed at a different image. \
                 Deployments pinned by tag then pull content that was never reviewed.",
            )
            .remediation(remediation("ecr_mutable_tags"))
            .evidence("tagMutability", &repository.tag_mutability)
            .build();
        Ok(Some(finding))
    }

    fn check_lifecycle_policy(
        &self,
        ctx: &ScanContext,
        region: &str,
        repository: &EcrRepository,
    ) -> Result<Option<Finding>> {
        if repository.lifecycle_policy.is_some() {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "ecr_no_lifecycle_policy")
            .resource(&repository.name, &repository.arn)
            .severity(Severity::Low)
            .risk_vector(RiskVector::ComplianceGap)
            .title("ECR repository without lifecycle policy")
            .description(format!(
                "Repository '{}' retains every pushed image indefinitely",
                repository.name
            ))
            .analysis(
                "Old images with outdated, vulnerable layers accumulate and stay pullable \
                 long after they should have been retired.",
            )
            .remediation(remediation("ecr_no_lifecycle_policy"))
            .evidence("lifecyclePolicy", serde_json::Value::Null)
            .build();
        Ok(Some(finding))
    }

    fn check_repository_policy(
        &self,
        ctx: &ScanContext,
        region: &str,
        repository: &EcrRepository,
    ) -> Result<Option<Finding>> {
        let policy_json = match repository.repository_policy_json.as_deref() {
            Some(json) => json,
            None => return Ok(None),
        };
        let policy: serde_json::Value = serde_json::from_str(policy_json)
            .with_context(|| format!("Unparseable repository policy on {}", repository.name))?;

        let statements = match &policy["Statement"] {
            serde_json::Value::Array(list) => list.clone(),
            obj @ serde_json::Value::Object(_) => vec![obj.clone()],
            _ => return Ok(None),
        };
        let wildcard = statements.iter().any(|statement| {
            statement["Effect"].as_str() == Some("Allow")
                && (statement["Principal"].as_str() == Some("*")
                    || statement["Principal"]["AWS"].as_str() == Some("*"))
        });
        if !wildcard {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "ecr_wildcard_repository_policy")
            .resource(&repository.name, &repository.arn)
            .severity(Severity::Critical)
            .risk_vector(RiskVector::PublicExposure)
            .title("ECR repository policy allows wildcard principal")
            .description(format!(
                "Repository '{}' grants registry actions to Principal \"*\"",
                repository.name
            ))
            .analysis(
                "Any AWS account can pull these images, including proprietary application \
                 code and any secrets baked into layers.",
            )
            .remediation(remediation("ecr_wildcard_repository_policy"))
            .evidence("policy", policy)
            .build();
        Ok(Some(finding))
    }
}

impl Default for AwsEcrScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for AwsEcrScanner {
    fn service_name(&self) -> &'static str {
        "aws_ecr"
    }

    fn category(&self) -> ScannerCategory {
        ScannerCategory::ContainerRegistry
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<(Vec<Finding>, usize)> {
        let api = ctx.aws_api()?;
        info!("[ECR] Starting scan across {} region(s)", ctx.regions.len());

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
                    warn!("[ECR] Region {} failed, continuing: {:#}", region, e);
                    failed_regions += 1;
                    last_error = Some(e);
                }
            }
        }

        if failed_regions == ctx.regions.len() {
            if let Some(e) = last_error {
                return Err(e.context("ECR scan failed in every region"));
            }
        }

        info!(
            "[ECR] Scan complete: {} findings from {} checks",
            findings.len(),
            checks_run
        );
        Ok((findings, checks_run))
    }
}

fn remediation(scan_type: &str) -> Remediation {
    match scan_type {
        "ecr_scan_on_push_disabled" => Remediation {
            description: "Enable image scanning on push".to_string(),
            steps: vec![
                "Enable scan-on-push for the repository".to_string(),
                "Consider enhanced scanning (Inspector) for continuous rescans".to_string(),
                "Gate deployments on scan results in the release pipeline".to_string(),
            ],
            cli_command: Some(
                "aws ecr put-image-scanning-configuration --repository-name <name> --image-scanning-configuration scanOnPush=true"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "ecr_mutable_tags" => Remediation {
            description: "Make image tags immutable".to_string(),
            steps: vec![
                "Set repository tag mutability to IMMUTABLE".to_string(),
                "Move environments that overwrite tags to digest-pinned deploys first".to_string(),
            ],
            cli_command: Some(
                "aws ecr put-image-tag-mutability --repository-name <name> --image-tag-mutability IMMUTABLE"
                    .to_string(),
            ),
            effort: RemediationEffort::Medium,
            automatable: true,
        },
        "ecr_no_lifecycle_policy" => Remediation {
            description: "Add a lifecycle policy to expire stale images".to_string(),
            steps: vec![
                "Define rules expiring untagged images after a short window".to_string(),
                "Cap the count of retained tagged images per prefix".to_string(),
            ],
            cli_command: Some(
                "aws ecr put-lifecycle-policy --repository-name <name> --lifecycle-policy-text file://lifecycle.json"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "ecr_wildcard_repository_policy" => Remediation {
            description: "Restrict the repository policy to named principals".to_string(),
            steps: vec![
                "Replace Principal \"*\" with the consuming account or role ARNs".to_string(),
                "Use a registry policy for organization-wide pull access instead".to_string(),
            ],
            cli_command: Some(
                "aws ecr get-repository-policy --repository-name <name>".to_string(),
            ),
            effort: RemediationEffort::Medium,
            automatable: false,
        },
        _ => Remediation {
            description: "Review the repository against the ECR security baseline".to_string(),
            steps: vec!["Compare settings with the AWS container security guide".to_string()],
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

    fn hardened_repository() -> EcrRepository {
        EcrRepository {
            name: "api".to_string(),
            arn: "arn:aws:ecr:eu-west-1:123456789012:repository/api".to_string(),
            scan_on_push: true,
            tag_mutability: "IMMUTABLE".to_string(),
            lifecycle_policy: Some("{\"rules\":[]}".to_string()),
            repository_policy_json: None,
        }
    }

    #[tokio::test]
    async fn test_hardened_repository_clean() {
        let mut api = testkit::StaticAwsApi::default();
        api.ecr_repositories = vec![hardened_repository()];
        let ctx = testkit::aws_context(api, &["eu-west-1"]);

        let (findings, checks_run) = AwsEcrScanner::new().scan(&ctx).await.unwrap();
        assert!(findings.is_empty());
        assert_eq!(checks_run, 4);
    }

    #[tokio::test]
    async fn test_default_repository_flags_three_checks() {
        let mut api = testkit::StaticAwsApi::default();
        api.ecr_repositories = vec![EcrRepository {
            name: "legacy".to_string(),
            arn: "arn:aws:ecr:eu-west-1:123456789012:repository/legacy".to_string(),
            scan_on_push: false,
            tag_mutability: "MUTABLE".to_string(),
            lifecycle_policy: None,
            repository_policy_json: None,
        }];
        let ctx = testkit::aws_context(api, &["eu-west-1"]);

        let (findings, _) = AwsEcrScanner::new().scan(&ctx).await.unwrap();
        let types: Vec<&str> = findings.iter().map(|f| f.scan_type.as_str()).collect();
        assert!(types.contains(&"ecr_scan_on_push_disabled"));
        assert!(types.contains(&"ecr_mutable_tags"));
        assert!(types.contains(&"ecr_no_lifecycle_policy"));
        assert_eq!(findings.len(), 3);
    }

    #[test]
    fn test_wildcard_repository_policy_detected() {
        let scanner = AwsEcrScanner::new();
        let ctx = testkit::aws_context(testkit::StaticAwsApi::default(), &["eu-west-1"]);
        let mut repository = hardened_repository();
        repository.repository_policy_json = Some(
            r#"{"Statement":[{"Effect":"Allow","Principal":"*","Action":"ecr:BatchGetImage"}]}"#
                .to_string(),
        );

        let finding = scanner
            .check_repository_policy(&ctx, "eu-west-1", &repository)
            .unwrap()
            .unwrap();
        assert_eq!(finding.scan_type, "ecr_wildcard_repository_policy");
        assert_eq!(finding.severity, Severity::Critical);
    }
}
