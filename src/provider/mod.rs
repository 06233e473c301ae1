// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Cloud Provider API Boundary
 * Capability traits and typed response structs consumed by the scanners
 *
 * @copyright 2025 Bountyy Oy
 * @license Proprietary
 */

// AWS management-plane surface
pub mod aws;

// Azure Resource Manager / Graph surface
pub mod azure;

pub use aws::{
    AclGrant, AwsApi, BackupInventory, BackupPlan, BackupRule, BackupVault, BucketEncryption,
    CloudFrontDistribution, EbsVolume, Ec2Instance, Ec2Inventory, EcrRepository, EksCluster,
    GuardDutyDetector, GuardDutyStatus, IngressRule, OpenSearchDomain, OrganizationDetail,
    OrganizationStatus, PublicAccessBlock, RestApiStage, S3BucketDetail, S3BucketSummary,
    SecurityGroup,
};

pub use azure::{
    AppServiceSite, AzureApi, AzureVirtualMachine, DirectoryPosture, GuestAccount,
    KeyVaultProperties, StorageAccountDetail,
};
