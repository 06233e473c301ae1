// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Scanner Registry
 * Central registry for all available scanners with metadata and factories
 * © 2026 Bountyy Oy
 */

use crate::scanner::{Scanner, ScannerCategory};
use crate::scanners::{
    AwsApiGatewayScanner, AwsBackupScanner, AwsCloudFrontScanner, AwsEc2Scanner, AwsEcrScanner,
    AwsEksScanner, AwsGuardDutyScanner, AwsOpenSearchScanner, AwsOrganizationsScanner,
    AwsS3Scanner, AzureAppServiceScanner, AzureEntraScanner, AzureKeyVaultScanner,
    AzureStorageScanner, AzureVmScanner,
};
use crate::types::CloudProvider;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Scanner metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerMetadata {
    pub name: String,
    pub display_name: String,
    pub provider: CloudProvider,
    pub category: ScannerCategory,
    pub description: String,
    pub default_enabled: bool,
}

/// A registered scanner: its metadata plus the factory that builds it
pub struct ScannerRegistration {
    pub metadata: ScannerMetadata,
    factory: fn() -> Arc<dyn Scanner>,
}

impl ScannerRegistration {
    /// Registration for a scanner outside the built-in set
    pub fn new(metadata: ScannerMetadata, factory: fn() -> Arc<dyn Scanner>) -> Self {
        Self { metadata, factory }
    }

    pub fn instantiate(&self) -> Arc<dyn Scanner> {
        (self.factory)()
    }
}

/// Scanner Registry
pub struct ScannerRegistry {
    scanners: HashMap<String, ScannerRegistration>,
}

impl ScannerRegistry {
    /// Create new scanner registry with all built-in scanners
    pub fn new() -> Self {
        let mut registry = Self {
            scanners: HashMap::new(),
        };
        registry.register_all_scanners();
        registry
    }

    /// Register a scanner
    pub fn register(&mut self, registration: ScannerRegistration) {
        self.scanners
            .insert(registration.metadata.name.clone(), registration);
    }

    /// Get a registration by scanner name
    pub fn get(&self, name: &str) -> Option<&ScannerRegistration> {
        self.scanners.get(name)
    }

    /// Get all registrations, sorted by name for stable output
    pub fn get_all(&self) -> Vec<&ScannerRegistration> {
        let mut all: Vec<_> = self.scanners.values().collect();
        all.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        all
    }

    /// Get scanners for one provider
    pub fn get_by_provider(&self, provider: CloudProvider) -> Vec<&ScannerRegistration> {
        let mut matched: Vec<_> = self
            .scanners
            .values()
            .filter(|s| s.metadata.provider == provider)
            .collect();
        matched.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        matched
    }

    /// Get scanners by category
    pub fn get_by_category(&self, category: ScannerCategory) -> Vec<&ScannerRegistration> {
        self.scanners
            .values()
            .filter(|s| s.metadata.category == category)
            .collect()
    }

    /// Get scanners enabled by default
    pub fn get_default_enabled(&self) -> Vec<&ScannerRegistration> {
        self.scanners
            .values()
            .filter(|s| s.metadata.default_enabled)
            .collect()
    }

    /// Check if scanner exists
    pub fn exists(&self, name: &str) -> bool {
        self.scanners.contains_key(name)
    }

    /// Get scanner count
    pub fn count(&self) -> usize {
        self.scanners.len()
    }

    /// Get the distinct categories currently registered
    pub fn get_categories(&self) -> Vec<ScannerCategory> {
        let mut categories: Vec<_> = self
            .scanners
            .values()
            .map(|s| s.metadata.category)
            .collect();
        categories.sort_by_key(|c| c.as_str());
        categories.dedup();
        categories
    }

    /// Register all built-in scanners
    fn register_all_scanners(&mut self) {
        // AWS scanners
        self.register(create_aws_s3_scanner());
        self.register(create_aws_ecr_scanner());
        self.register(create_aws_guardduty_scanner());
        self.register(create_aws_opensearch_scanner());
        self.register(create_aws_backup_scanner());
        self.register(create_aws_organizations_scanner());
        self.register(create_aws_cloudfront_scanner());
        self.register(create_aws_apigateway_scanner());
        self.register(create_aws_eks_scanner());
        self.register(create_aws_ec2_scanner());

        // Azure scanners
        self.register(create_azure_keyvault_scanner());
        self.register(create_azure_entra_scanner());
        self.register(create_azure_appservice_scanner());
        self.register(create_azure_storage_scanner());
        self.register(create_azure_vm_scanner());
    }
}

impl Default for ScannerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Global scanner registry instance
pub static SCANNER_REGISTRY: Lazy<ScannerRegistry> = Lazy::new(ScannerRegistry::new);

// Scanner factory functions

fn create_aws_s3_scanner() -> ScannerRegistration {
    ScannerRegistration {
        metadata: ScannerMetadata {
            name: "aws_s3".to_string(),
            display_name: "Amazon S3".to_string(),
            provider: CloudProvider::Aws,
            category: ScannerCategory::ObjectStorage,
            description: "Detects unencrypted, public, unversioned, and unlogged S3 buckets"
                .to_string(),
            default_enabled: true,
        },
        factory: || Arc::new(AwsS3Scanner::new()),
    }
}

fn create_aws_ecr_scanner() -> ScannerRegistration {
    ScannerRegistration {
        metadata: ScannerMetadata {
            name: "aws_ecr".to_string(),
            display_name: "Amazon ECR".to_string(),
            provider: CloudProvider::Aws,
            category: ScannerCategory::ContainerRegistry,
            description: "Detects container registries without image scanning, tag immutability, or lifecycle policies".to_string(),
            default_enabled: true,
        },
        factory: || Arc::new(AwsEcrScanner::new()),
    }
}

fn create_aws_guardduty_scanner() -> ScannerRegistration {
    ScannerRegistration {
        metadata: ScannerMetadata {
            name: "aws_guardduty".to_string(),
            display_name: "Amazon GuardDuty".to_string(),
            provider: CloudProvider::Aws,
            category: ScannerCategory::ThreatDetection,
            description: "Detects regions without threat detection coverage".to_string(),
            default_enabled: true,
        },
        factory: || Arc::new(AwsGuardDutyScanner::new()),
    }
}

fn create_aws_opensearch_scanner() -> ScannerRegistration {
    ScannerRegistration {
        metadata: ScannerMetadata {
            name: "aws_opensearch".to_string(),
            display_name: "Amazon OpenSearch Service".to_string(),
            provider: CloudProvider::Aws,
            category: ScannerCategory::ManagedSearch,
            description: "Detects search domains without encryption, VPC placement, or audit logging".to_string(),
            default_enabled: true,
        },
        factory: || Arc::new(AwsOpenSearchScanner::new()),
    }
}

fn create_aws_backup_scanner() -> ScannerRegistration {
    ScannerRegistration {
        metadata: ScannerMetadata {
            name: "aws_backup".to_string(),
            display_name: "AWS Backup".to_string(),
            provider: CloudProvider::Aws,
            category: ScannerCategory::BackupRecovery,
            description: "Detects missing or weak backup coverage and unencrypted vaults"
                .to_string(),
            default_enabled: true,
        },
        factory: || Arc::new(AwsBackupScanner::new()),
    }
}

fn create_aws_organizations_scanner() -> ScannerRegistration {
    ScannerRegistration {
        metadata: ScannerMetadata {
            name: "aws_organizations".to_string(),
            display_name: "AWS Organizations".to_string(),
            provider: CloudProvider::Aws,
            category: ScannerCategory::Governance,
            description: "Detects accounts outside an organization or without guardrail policies"
                .to_string(),
            default_enabled: true,
        },
        factory: || Arc::new(AwsOrganizationsScanner::new()),
    }
}

fn create_aws_cloudfront_scanner() -> ScannerRegistration {
    ScannerRegistration {
        metadata: ScannerMetadata {
            name: "aws_cloudfront".to_string(),
            display_name: "Amazon CloudFront".to_string(),
            provider: CloudProvider::Aws,
            category: ScannerCategory::ContentDelivery,
            description: "Detects distributions with weak transport settings, missing WAF, or expiring certificates".to_string(),
            default_enabled: true,
        },
        factory: || Arc::new(AwsCloudFrontScanner::new()),
    }
}

fn create_aws_apigateway_scanner() -> ScannerRegistration {
    ScannerRegistration {
        metadata: ScannerMetadata {
            name: "aws_apigateway".to_string(),
            display_name: "Amazon API Gateway".to_string(),
            provider: CloudProvider::Aws,
            category: ScannerCategory::ApiManagement,
            description: "Detects API stages without logging, WAF, authorizers, or tracing"
                .to_string(),
            default_enabled: true,
        },
        factory: || Arc::new(AwsApiGatewayScanner::new()),
    }
}

fn create_aws_eks_scanner() -> ScannerRegistration {
    ScannerRegistration {
        metadata: ScannerMetadata {
            name: "aws_eks".to_string(),
            display_name: "Amazon EKS".to_string(),
            provider: CloudProvider::Aws,
            category: ScannerCategory::ContainerOrchestration,
            description: "Detects exposed or outdated Kubernetes control planes".to_string(),
            default_enabled: true,
        },
        factory: || Arc::new(AwsEksScanner::new()),
    }
}

fn create_aws_ec2_scanner() -> ScannerRegistration {
    ScannerRegistration {
        metadata: ScannerMetadata {
            name: "aws_ec2".to_string(),
            display_name: "Amazon EC2".to_string(),
            provider: CloudProvider::Aws,
            category: ScannerCategory::Compute,
            description: "Detects open security groups, IMDSv1, unencrypted volumes, and exposed instances".to_string(),
            default_enabled: true,
        },
        factory: || Arc::new(AwsEc2Scanner::new()),
    }
}

fn create_azure_keyvault_scanner() -> ScannerRegistration {
    ScannerRegistration {
        metadata: ScannerMetadata {
            name: "azure_keyvault".to_string(),
            display_name: "Azure Key Vault".to_string(),
            provider: CloudProvider::Azure,
            category: ScannerCategory::SecretsManagement,
            description: "Detects vaults without soft delete, purge protection, or network restrictions".to_string(),
            default_enabled: true,
        },
        factory: || Arc::new(AzureKeyVaultScanner::new()),
    }
}

fn create_azure_entra_scanner() -> ScannerRegistration {
    ScannerRegistration {
        metadata: ScannerMetadata {
            name: "azure_entra".to_string(),
            display_name: "Microsoft Entra ID".to_string(),
            provider: CloudProvider::Azure,
            category: ScannerCategory::Identity,
            description: "Detects weak tenant identity posture: MFA gaps, stale guests, excess admins".to_string(),
            default_enabled: true,
        },
        factory: || Arc::new(AzureEntraScanner::new()),
    }
}

fn create_azure_appservice_scanner() -> ScannerRegistration {
    ScannerRegistration {
        metadata: ScannerMetadata {
            name: "azure_appservice".to_string(),
            display_name: "Azure App Service".to_string(),
            provider: CloudProvider::Azure,
            category: ScannerCategory::AppHosting,
            description: "Detects sites allowing HTTP, FTP, weak TLS, or remote debugging"
                .to_string(),
            default_enabled: true,
        },
        factory: || Arc::new(AzureAppServiceScanner::new()),
    }
}

fn create_azure_storage_scanner() -> ScannerRegistration {
    ScannerRegistration {
        metadata: ScannerMetadata {
            name: "azure_storage".to_string(),
            display_name: "Azure Storage Accounts".to_string(),
            provider: CloudProvider::Azure,
            category: ScannerCategory::ObjectStorage,
            description: "Detects storage accounts with public blob access or weak transport settings".to_string(),
            default_enabled: true,
        },
        factory: || Arc::new(AzureStorageScanner::new()),
    }
}

fn create_azure_vm_scanner() -> ScannerRegistration {
    ScannerRegistration {
        metadata: ScannerMetadata {
            name: "azure_vm".to_string(),
            display_name: "Azure Virtual Machines".to_string(),
            provider: CloudProvider::Azure,
            category: ScannerCategory::Compute,
            description: "Detects VMs without disk encryption, NSGs, or managed identities"
                .to_string(),
            default_enabled: true,
        },
        factory: || Arc::new(AzureVmScanner::new()),
    }
}
