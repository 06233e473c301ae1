// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - AWS Provider Surface
 * Typed inventory responses for the AWS management plane
 *
 * The engine does not speak the AWS wire protocol; an AwsApi implementation
 * is injected per session (SDK-backed in production, mocked in tests) and
 * every call is routed through the session rate limiter.
 *
 * @copyright 2025 Bountyy Oy
 * @license Proprietary
 */

use crate::errors::ProviderResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inventory/list capability for one AWS account.
///
/// Methods take a region where the service is regional; Organizations and
/// CloudFront are account-global. Implementations return provider errors
/// classified per `ProviderError` so the rate limiter can retry correctly.
#[async_trait]
pub trait AwsApi: Send + Sync {
    async fn list_buckets(&self, region: &str) -> ProviderResult<Vec<S3BucketSummary>>;

    async fn get_bucket_detail(&self, region: &str, bucket: &str)
        -> ProviderResult<S3BucketDetail>;

    async fn list_ecr_repositories(&self, region: &str) -> ProviderResult<Vec<EcrRepository>>;

    async fn get_guardduty_status(&self, region: &str) -> ProviderResult<GuardDutyStatus>;

    async fn list_opensearch_domains(&self, region: &str)
        -> ProviderResult<Vec<OpenSearchDomain>>;

    async fn get_backup_inventory(&self, region: &str) -> ProviderResult<BackupInventory>;

    async fn get_organization_status(&self) -> ProviderResult<OrganizationStatus>;

    async fn list_cloudfront_distributions(&self)
        -> ProviderResult<Vec<CloudFrontDistribution>>;

    async fn list_api_stages(&self, region: &str) -> ProviderResult<Vec<RestApiStage>>;

    async fn list_eks_clusters(&self, region: &str) -> ProviderResult<Vec<EksCluster>>;

    async fn get_ec2_inventory(&self, region: &str) -> ProviderResult<Ec2Inventory>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3BucketSummary {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Everything the S3 checks read about one bucket, gathered once
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3BucketDetail {
    pub name: String,
    pub arn: String,
    /// None when the bucket has no server-side encryption configuration
    pub encryption: Option<BucketEncryption>,
    /// None when versioning was never configured on the bucket
    pub versioning_enabled: Option<bool>,
    /// None when no public access block configuration exists
    pub public_access_block: Option<PublicAccessBlock>,
    pub acl_grants: Vec<AclGrant>,
    pub policy_json: Option<String>,
    /// Target bucket for server access logs, when enabled
    pub logging_target: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketEncryption {
    pub algorithm: String,
    pub kms_key_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAccessBlock {
    pub block_public_acls: bool,
    pub ignore_public_acls: bool,
    pub block_public_policy: bool,
    pub restrict_public_buckets: bool,
}

impl PublicAccessBlock {
    pub fn fully_blocking(&self) -> bool {
        self.block_public_acls
            && self.ignore_public_acls
            && self.block_public_policy
            && self.restrict_public_buckets
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AclGrant {
    /// Group URI for group grants (AllUsers, AuthenticatedUsers)
    pub grantee_uri: Option<String>,
    pub grantee_id: Option<String>,
    pub permission: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcrRepository {
    pub name: String,
    pub arn: String,
    pub scan_on_push: bool,
    /// "MUTABLE" or "IMMUTABLE"
    pub tag_mutability: String,
    pub lifecycle_policy: Option<String>,
    pub repository_policy_json: Option<String>,
}

/// Region-level threat detection state. An empty detector list means the
/// service has never been enabled in the region.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardDutyStatus {
    pub detectors: Vec<GuardDutyDetector>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardDutyDetector {
    pub detector_id: String,
    pub enabled: bool,
    pub finding_publishing_frequency: Option<String>,
    /// S3/EventBridge destinations findings are exported to
    pub export_destinations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSearchDomain {
    pub name: String,
    pub arn: String,
    pub encryption_at_rest: Option<bool>,
    pub node_to_node_encryption: Option<bool>,
    /// None when the domain endpoint is public (not VPC-attached)
    pub vpc_id: Option<String>,
    /// e.g. "Policy-Min-TLS-1-0-2019-07"
    pub tls_security_policy: Option<String>,
    pub audit_logs_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupInventory {
    pub vaults: Vec<BackupVault>,
    pub plans: Vec<BackupPlan>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupVault {
    pub name: String,
    pub arn: String,
    pub encryption_key_arn: Option<String>,
    pub recovery_points: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupPlan {
    pub id: String,
    pub name: String,
    pub rules: Vec<BackupRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRule {
    pub rule_name: String,
    pub retention_days: Option<u32>,
}

/// Account-global organization membership. `organization` is None when the
/// account does not belong to an AWS Organization at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationStatus {
    pub organization: Option<OrganizationDetail>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationDetail {
    pub id: String,
    /// "ALL" or "CONSOLIDATED_BILLING"
    pub feature_set: String,
    pub service_control_policies: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudFrontDistribution {
    pub id: String,
    pub arn: String,
    pub domain_name: String,
    /// "allow-all", "redirect-to-https", or "https-only"
    pub viewer_protocol_policy: String,
    /// e.g. "TLSv1", "TLSv1.2_2021"
    pub minimum_protocol_version: Option<String>,
    pub logging_enabled: bool,
    pub web_acl_id: Option<String>,
    pub certificate_expiry: Option<DateTime<Utc>>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestApiStage {
    pub api_id: String,
    pub api_name: String,
    pub stage_name: String,
    /// CloudWatch execution logging level: "OFF", "ERROR", "INFO"
    pub logging_level: Option<String>,
    pub web_acl_arn: Option<String>,
    /// Authorizer types configured on the API (empty = open)
    pub authorizer_types: Vec<String>,
    pub xray_tracing_enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EksCluster {
    pub name: String,
    pub arn: String,
    pub version: String,
    pub endpoint_public_access: bool,
    pub endpoint_private_access: bool,
    /// Enabled control-plane log types (api, audit, authenticator, ...)
    pub enabled_log_types: Vec<String>,
    /// KMS key encrypting Kubernetes secrets; None = not encrypted
    pub secrets_encryption_key_arn: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ec2Inventory {
    pub instances: Vec<Ec2Instance>,
    pub security_groups: Vec<SecurityGroup>,
    pub volumes: Vec<EbsVolume>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ec2Instance {
    pub instance_id: String,
    pub state: String,
    pub public_ip: Option<String>,
    /// IMDS token requirement: "optional" allows IMDSv1, "required" is v2-only
    pub metadata_http_tokens: Option<String>,
    pub iam_instance_profile: Option<String>,
    pub security_group_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroup {
    pub group_id: String,
    pub group_name: String,
    pub ingress_rules: Vec<IngressRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressRule {
    pub from_port: Option<i32>,
    pub to_port: Option<i32>,
    pub protocol: String,
    pub cidr_blocks: Vec<String>,
}

impl IngressRule {
    /// Whether this rule exposes `port` to the whole internet
    pub fn open_to_world(&self, port: i32) -> bool {
        let covers_port = match (self.from_port, self.to_port) {
            (Some(from), Some(to)) => from <= port && port <= to,
            // No port range means all traffic (e.g. protocol "-1")
            (None, None) => true,
            _ => false,
        };
        covers_port
            && self
                .cidr_blocks
                .iter()
                .any(|cidr| cidr == "0.0.0.0/0" || cidr == "::/0")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EbsVolume {
    pub volume_id: String,
    pub encrypted: bool,
    pub attached_instance: Option<String>,
}
