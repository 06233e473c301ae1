// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Static provider doubles shared by the unit tests.

use crate::config::EngineConfig;
use crate::context::{ResolvedCredentials, ScanContext};
use crate::errors::{ProviderError, ProviderResult};
use crate::provider::aws::{
    AwsApi, BackupInventory, CloudFrontDistribution, Ec2Inventory, EcrRepository, EksCluster,
    GuardDutyStatus, OpenSearchDomain, OrganizationStatus, RestApiStage, S3BucketDetail,
    S3BucketSummary,
};
use crate::provider::azure::{
    AppServiceSite, AzureApi, AzureVirtualMachine, DirectoryPosture, KeyVaultProperties,
    StorageAccountDetail,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// AWS provider double returning fixed inventories
#[derive(Debug, Clone, Default)]
pub struct StaticAwsApi {
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
impl AwsApi for StaticAwsApi {
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

/// Azure provider double returning fixed inventories
#[derive(Debug, Clone, Default)]
pub struct StaticAzureApi {
    pub key_vaults: Vec<KeyVaultProperties>,
    pub directory: DirectoryPosture,
    pub app_services: Vec<AppServiceSite>,
    pub storage_accounts: Vec<StorageAccountDetail>,
    pub virtual_machines: Vec<AzureVirtualMachine>,
}

#[async_trait]
impl AzureApi for StaticAzureApi {
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

pub fn credentials() -> ResolvedCredentials {
    ResolvedCredentials {
        access_key_id: "AKIAEXAMPLE".to_string(),
        secret: "secret".to_string(),
        session_token: None,
        expires_at: None,
    }
}

pub fn aws_context(api: StaticAwsApi, regions: &[&str]) -> ScanContext {
    ScanContext::aws(
        "123456789012",
        regions.iter().map(|r| r.to_string()).collect(),
        credentials(),
        Arc::new(api),
        &EngineConfig::default(),
    )
}

pub fn azure_context(api: StaticAzureApi, regions: &[&str]) -> ScanContext {
    ScanContext::azure(
        "00000000-0000-0000-0000-000000000001",
        "10000000-0000-0000-0000-000000000001",
        regions.iter().map(|r| r.to_string()).collect(),
        credentials(),
        Arc::new(api),
        &EngineConfig::default(),
    )
}
