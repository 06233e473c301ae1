// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Engine Test Fixtures
 * Static provider implementations and session helpers shared by the
 * orchestrator flow, property and scenario suites
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use vartija_engine::errors::{ProviderError, ProviderResult};
use vartija_engine::provider::aws::{
    AwsApi, BackupInventory, BackupPlan, BackupRule, BackupVault, BucketEncryption,
    CloudFrontDistribution, EbsVolume, Ec2Instance, Ec2Inventory, EcrRepository, EksCluster,
    GuardDutyDetector, GuardDutyStatus, IngressRule, OpenSearchDomain, OrganizationDetail,
    OrganizationStatus, PublicAccessBlock, RestApiStage, S3BucketDetail, S3BucketSummary,
    SecurityGroup,
};
use vartija_engine::provider::azure::{
    AppServiceSite, AzureApi, AzureVirtualMachine, DirectoryPosture, KeyVaultProperties,
    StorageAccountDetail,
};
use vartija_engine::{
    EngineConfig, Finding, ResolvedCredentials, ScanContext, ScanOrchestrator, ScanSelection,
};

/// AWS fixture returning fixed inventories for every region
#[derive(Debug, Clone, Default)]
pub struct FixtureAwsApi {
    pub buckets: Vec<S3BucketSummary>,
    pub bucket_details: HashMap<String, S3BucketDetail>,
    pub ecr_repositories: Vec<EcrRepository>,
    pub guardduty: GuardDutyStatus,
    pub opensearch_domains: Vec<OpenSearchDomain>,
    pub backup: BackupInventory,
    pub organizations: OrganizationStatus,
    pub cloudfront_distributions: Vec<CloudFrontDistribution>,
    pub api_stages: Vec<RestApiStage>,
    pub eks_clusters: Vec<EksCluster>,
    pub ec2: Ec2Inventory,
}

#[async_trait]
impl AwsApi for FixtureAwsApi {
    async fn list_buckets(&self, _region: &str) -> ProviderResult<Vec<S3BucketSummary>> {
        Ok(self.buckets.clone())
    }

    async fn get_bucket_detail(
        &self,
        _region: &str,
        bucket: &str,
    ) -> ProviderResult<S3BucketDetail> {
        self.bucket_details
            .get(bucket)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound {
                resource: format!("bucket {}", bucket),
            })
    }

    async fn list_ecr_repositories(&self, _region: &str) -> ProviderResult<Vec<EcrRepository>> {
        Ok(self.ecr_repositories.clone())
    }

    async fn get_guardduty_status(&self, _region: &str) -> ProviderResult<GuardDutyStatus> {
        Ok(self.guardduty.clone())
    }

    async fn list_opensearch_domains(
        &self,
        _region: &str,
    ) -> ProviderResult<Vec<OpenSearchDomain>> {
        Ok(self.opensearch_domains.clone())
    }

    async fn get_backup_inventory(&self, _region: &str) -> ProviderResult<BackupInventory> {
        Ok(self.backup.clone())
    }

    async fn get_organization_status(&self) -> ProviderResult<OrganizationStatus> {
        Ok(self.organizations.clone())
    }

    async fn list_cloudfront_distributions(&self) -> ProviderResult<Vec<CloudFrontDistribution>> {
        Ok(self.cloudfront_distributions.clone())
    }

    async fn list_api_stages(&self, _region: &str) -> ProviderResult<Vec<RestApiStage>> {
        Ok(self.api_stages.clone())
    }

    async fn list_eks_clusters(&self, _region: &str) -> ProviderResult<Vec<EksCluster>> {
        Ok(self.eks_clusters.clone())
    }

    async fn get_ec2_inventory(&self, _region: &str) -> ProviderResult<Ec2Inventory> {
        Ok(self.ec2.clone())
    }
}

/// AWS fixture whose S3 surface is blocked by policy while the rest of the
/// account stays readable
#[derive(Debug, Clone, Default)]
pub struct DeniedS3Api;

#[async_trait]
impl AwsApi for DeniedS3Api {
    async fn list_buckets(&self, _region: &str) -> ProviderResult<Vec<S3BucketSummary>> {
        Err(ProviderError::AuthorizationDenied {
            service: "s3".to_string(),
            reason: "explicit deny in service control policy".to_string(),
        })
    }

    async fn get_bucket_detail(
        &self,
        _region: &str,
        bucket: &str,
    ) -> ProviderResult<S3BucketDetail> {
        Err(ProviderError::NotFound {
            resource: format!("bucket {}", bucket),
        })
    }

    async fn list_ecr_repositories(&self, _region: &str) -> ProviderResult<Vec<EcrRepository>> {
        Ok(Vec::new())
    }

    async fn get_guardduty_status(&self, _region: &str) -> ProviderResult<GuardDutyStatus> {
        Ok(GuardDutyStatus::default())
    }

    async fn list_opensearch_domains(
        &self,
        _region: &str,
    ) -> ProviderResult<Vec<OpenSearchDomain>> {
        Ok(Vec::new())
    }

    async fn get_backup_inventory(&self, _region: &str) -> ProviderResult<BackupInventory> {
        Ok(BackupInventory::default())
    }

    async fn get_organization_status(&self) -> ProviderResult<OrganizationStatus> {
        Ok(OrganizationStatus::default())
    }

    async fn list_cloudfront_distributions(&self) -> ProviderResult<Vec<CloudFrontDistribution>> {
        Ok(Vec::new())
    }

    async fn list_api_stages(&self, _region: &str) -> ProviderResult<Vec<RestApiStage>> {
        Ok(Vec::new())
    }

    async fn list_eks_clusters(&self, _region: &str) -> ProviderResult<Vec<EksCluster>> {
        Ok(Vec::new())
    }

    async fn get_ec2_inventory(&self, _region: &str) -> ProviderResult<Ec2Inventory> {
        Ok(Ec2Inventory::default())
    }
}

/// Azure fixture returning fixed subscription inventories
#[derive(Debug, Clone, Default)]
pub struct FixtureAzureApi {
    pub key_vaults: Vec<KeyVaultProperties>,
    pub directory: DirectoryPosture,
    pub app_services: Vec<AppServiceSite>,
    pub storage_accounts: Vec<StorageAccountDetail>,
    pub virtual_machines: Vec<AzureVirtualMachine>,
}

#[async_trait]
impl AzureApi for FixtureAzureApi {
    async fn list_key_vaults(
        &self,
        _subscription_id: &str,
    ) -> ProviderResult<Vec<KeyVaultProperties>> {
        Ok(self.key_vaults.clone())
    }

    async fn get_directory_posture(&self, _tenant_id: &str) -> ProviderResult<DirectoryPosture> {
        Ok(self.directory.clone())
    }

    async fn list_app_services(
        &self,
        _subscription_id: &str,
    ) -> ProviderResult<Vec<AppServiceSite>> {
        Ok(self.app_services.clone())
    }

    async fn list_storage_accounts(
        &self,
        _subscription_id: &str,
    ) -> ProviderResult<Vec<StorageAccountDetail>> {
        Ok(self.storage_accounts.clone())
    }

    async fn list_virtual_machines(
        &self,
        _subscription_id: &str,
    ) -> ProviderResult<Vec<AzureVirtualMachine>> {
        Ok(self.virtual_machines.clone())
    }
}

// Engine logs surface under RUST_LOG when a test needs debugging
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// The default admission window is sized for real provider APIs; these tests
// exercise scan semantics, not throttling.
pub fn fast_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.rate_limit.requests_per_second = 1_000;
    config
}

pub fn credentials() -> ResolvedCredentials {
    ResolvedCredentials {
        access_key_id: "AKIAEXAMPLE".to_string(),
        secret: "secret".to_string(),
        session_token: None,
        expires_at: None,
    }
}

pub fn aws_session(
    api: impl AwsApi + 'static,
    regions: &[&str],
) -> (ScanOrchestrator<'static>, ScanContext) {
    init_tracing();
    let config = fast_config();
    let ctx = ScanContext::aws(
        "123456789012",
        regions.iter().map(|r| r.to_string()).collect(),
        credentials(),
        Arc::new(api),
        &config,
    );
    (ScanOrchestrator::new(config), ctx)
}

pub fn azure_session(
    api: FixtureAzureApi,
    regions: &[&str],
) -> (ScanOrchestrator<'static>, ScanContext) {
    init_tracing();
    let config = fast_config();
    let ctx = ScanContext::azure(
        "00000000-0000-0000-0000-000000000001",
        "10000000-0000-0000-0000-000000000001",
        regions.iter().map(|r| r.to_string()).collect(),
        credentials(),
        Arc::new(api),
        &config,
    );
    (ScanOrchestrator::new(config), ctx)
}

pub fn named(scanners: &[&str]) -> ScanSelection {
    ScanSelection::Named(scanners.iter().map(|s| s.to_string()).collect())
}

pub fn finding<'a>(findings: &'a [Finding], scan_type: &str) -> &'a Finding {
    findings
        .iter()
        .find(|f| f.scan_type == scan_type)
        .unwrap_or_else(|| panic!("no {} finding in report", scan_type))
}

/// Bucket with versioning and logging in place but nothing shielding it from
/// public exposure
pub fn exposed_bucket(name: &str) -> (S3BucketSummary, S3BucketDetail) {
    (
        S3BucketSummary {
            name: name.to_string(),
            created_at: None,
        },
        S3BucketDetail {
            name: name.to_string(),
            arn: format!("arn:aws:s3:::{}", name),
            encryption: None,
            versioning_enabled: Some(true),
            public_access_block: None,
            acl_grants: Vec::new(),
            policy_json: None,
            logging_target: Some("central-access-logs".to_string()),
        },
    )
}

pub fn hardened_bucket(name: &str) -> (S3BucketSummary, S3BucketDetail) {
    (
        S3BucketSummary {
            name: name.to_string(),
            created_at: None,
        },
        S3BucketDetail {
            name: name.to_string(),
            arn: format!("arn:aws:s3:::{}", name),
            encryption: Some(BucketEncryption {
                algorithm: "aws:kms".to_string(),
                kms_key_id: Some("arn:aws:kms:eu-west-1:123456789012:key/k1".to_string()),
            }),
            versioning_enabled: Some(true),
            public_access_block: Some(PublicAccessBlock {
                block_public_acls: true,
                ignore_public_acls: true,
                block_public_policy: true,
                restrict_public_buckets: true,
            }),
            acl_grants: Vec::new(),
            policy_json: None,
            logging_target: Some("central-access-logs".to_string()),
        },
    )
}

/// Account where every check the AWS scanners run passes
pub fn hardened_aws_api() -> FixtureAwsApi {
    let (summary, detail) = hardened_bucket("billing-exports");
    FixtureAwsApi {
        buckets: vec![summary],
        bucket_details: HashMap::from([("billing-exports".to_string(), detail)]),
        ecr_repositories: vec![EcrRepository {
            name: "billing-api".to_string(),
            arn: "arn:aws:ecr:eu-west-1:123456789012:repository/billing-api".to_string(),
            scan_on_push: true,
            tag_mutability: "IMMUTABLE".to_string(),
            lifecycle_policy: Some(r#"{"rules":[]}"#.to_string()),
            repository_policy_json: None,
        }],
        guardduty: GuardDutyStatus {
            detectors: vec![GuardDutyDetector {
                detector_id: "d-1".to_string(),
                enabled: true,
                finding_publishing_frequency: Some("FIFTEEN_MINUTES".to_string()),
                export_destinations: vec!["arn:aws:s3:::guardduty-findings".to_string()],
            }],
        },
        opensearch_domains: vec![OpenSearchDomain {
            name: "audit-search".to_string(),
            arn: "arn:aws:es:eu-west-1:123456789012:domain/audit-search".to_string(),
            encryption_at_rest: Some(true),
            node_to_node_encryption: Some(true),
            vpc_id: Some("vpc-0a1b2c".to_string()),
            tls_security_policy: Some("Policy-Min-TLS-1-2-2019-07".to_string()),
            audit_logs_enabled: Some(true),
        }],
        backup: BackupInventory {
            vaults: vec![BackupVault {
                name: "primary".to_string(),
                arn: "arn:aws:backup:eu-west-1:123456789012:backup-vault:primary".to_string(),
                encryption_key_arn: Some("arn:aws:kms:eu-west-1:123456789012:key/k2".to_string()),
                recovery_points: 42,
            }],
            plans: vec![BackupPlan {
                id: "p-1".to_string(),
                name: "daily".to_string(),
                rules: vec![BackupRule {
                    rule_name: "daily-30d".to_string(),
                    retention_days: Some(30),
                }],
            }],
        },
        organizations: OrganizationStatus {
            organization: Some(OrganizationDetail {
                id: "o-exampleorg".to_string(),
                feature_set: "ALL".to_string(),
                service_control_policies: vec!["p-deny-root".to_string()],
            }),
        },
        cloudfront_distributions: vec![CloudFrontDistribution {
            id: "E2EXAMPLE".to_string(),
            arn: "arn:aws:cloudfront::123456789012:distribution/E2EXAMPLE".to_string(),
            domain_name: "cdn.example.com".to_string(),
            viewer_protocol_policy: "redirect-to-https".to_string(),
            minimum_protocol_version: Some("TLSv1.2_2021".to_string()),
            logging_enabled: true,
            web_acl_id: Some("waf-1".to_string()),
            certificate_expiry: Some(Utc::now() + Duration::days(200)),
            enabled: true,
        }],
        api_stages: vec![RestApiStage {
            api_id: "a1b2c3".to_string(),
            api_name: "billing".to_string(),
            stage_name: "prod".to_string(),
            logging_level: Some("INFO".to_string()),
            web_acl_arn: Some(
                "arn:aws:wafv2:eu-west-1:123456789012:regional/webacl/billing".to_string(),
            ),
            authorizer_types: vec!["COGNITO_USER_POOLS".to_string()],
            xray_tracing_enabled: true,
        }],
        eks_clusters: vec![EksCluster {
            name: "workloads".to_string(),
            arn: "arn:aws:eks:eu-west-1:123456789012:cluster/workloads".to_string(),
            version: "1.31".to_string(),
            endpoint_public_access: false,
            endpoint_private_access: true,
            enabled_log_types: vec!["api".to_string(), "audit".to_string()],
            secrets_encryption_key_arn: Some(
                "arn:aws:kms:eu-west-1:123456789012:key/k3".to_string(),
            ),
        }],
        ec2: Ec2Inventory {
            instances: vec![Ec2Instance {
                instance_id: "i-0abc123".to_string(),
                state: "running".to_string(),
                public_ip: None,
                metadata_http_tokens: Some("required".to_string()),
                iam_instance_profile: Some("app-profile".to_string()),
                security_group_ids: vec!["sg-01".to_string()],
            }],
            security_groups: vec![SecurityGroup {
                group_id: "sg-01".to_string(),
                group_name: "app".to_string(),
                ingress_rules: vec![IngressRule {
                    from_port: Some(443),
                    to_port: Some(443),
                    protocol: "tcp".to_string(),
                    cidr_blocks: vec!["10.0.0.0/8".to_string()],
                }],
            }],
            volumes: vec![EbsVolume {
                volume_id: "vol-01".to_string(),
                encrypted: true,
                attached_instance: Some("i-0abc123".to_string()),
            }],
        },
    }
}
