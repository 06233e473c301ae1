// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Azure Storage Account Posture Scanner
 * Blob exposure and transport security checks
 *
 * Detects:
 * - Accounts permitting anonymous blob access
 * - Accounts accepting unencrypted transfers
 * - Weak minimum TLS versions
 * - Shared key authorization left enabled
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use crate::context::ScanContext;
use crate::provider::azure::{AzureApi, StorageAccountDetail};
use crate::scanner::{isolate, FindingBuilder, Scanner, ScannerCategory};
use crate::types::{Finding, Remediation, RemediationEffort, RiskVector, Severity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// TLS floors below the required TLS1_2
const WEAK_TLS_VERSIONS: [&str; 2] = ["TLS1_0", "TLS1_1"];

pub struct AzureStorageScanner;

impl AzureStorageScanner {
    pub fn new() -> Self {
        Self
    }

    async fn fetch_accounts(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AzureApi>,
    ) -> Result<Vec<StorageAccountDetail>> {
        let key = ctx.cache_key("storage:accounts");
        let accounts = ctx
            .cache
            .get_or_fetch(&key, || async {
                ctx.rate_limiter
                    .execute("storage.list", || api.list_storage_accounts(&ctx.account_id))
                    .await
            })
            .await
            .context("Failed to list storage accounts")?;
        Ok(accounts)
    }

    fn check_public_blob_access(
        &self,
        ctx: &ScanContext,
        account: &StorageAccountDetail,
    ) -> Result<Option<Finding>> {
        // Unset inherits the legacy default, which allows public containers
        if !account.allow_blob_public_access.unwrap_or(true) {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, &account.location, "storage_public_blob_access")
            .resource(&account.name, &account.id)
            .severity(Severity::Critical)
            .risk_vector(RiskVector::PublicExposure)
            .title("Storage account permits anonymous blob access")
            .description(format!(
                "Account '{}' allows containers to be configured for anonymous reads",
                account.name
            ))
            .analysis(
                "With public access allowed at the account level, one mis-set \
                 container ACL exposes every blob in it to unauthenticated readers. \
                 Public storage buckets are the most scanned-for cloud \
                 misconfiguration on the internet.",
            )
            .remediation(remediation("storage_public_blob_access"))
            .evidence("allowBlobPublicAccess", &account.allow_blob_public_access)
            .build();
        Ok(Some(finding))
    }

    fn check_secure_transfer(
        &self,
        ctx: &ScanContext,
        account: &StorageAccountDetail,
    ) -> Result<Option<Finding>> {
        if account.https_traffic_only.unwrap_or(true) {
            return Ok(None);
        }

        let finding =
            FindingBuilder::new(ctx, &account.location, "storage_secure_transfer_disabled")
                .resource(&account.name, &account.id)
                .severity(Severity::High)
                .risk_vector(RiskVector::DataExposure)
                .title("Storage account accepts unencrypted transfers")
                .description(format!(
                    "Account '{}' serves blob and queue traffic over plain HTTP",
                    account.name
                ))
                .analysis(
                    "Data and SAS tokens move in cleartext between clients and the \
                     account endpoint, where any on-path observer can capture them.",
                )
                .remediation(remediation("storage_secure_transfer_disabled"))
                .evidence("httpsTrafficOnly", &account.https_traffic_only)
                .build();
        Ok(Some(finding))
    }

    fn check_min_tls(
        &self,
        ctx: &ScanContext,
        account: &StorageAccountDetail,
    ) -> Result<Option<Finding>> {
        let version = match account.min_tls_version.as_deref() {
            Some(v) if WEAK_TLS_VERSIONS.contains(&v) => v,
            _ => return Ok(None),
        };

        let finding = FindingBuilder::new(ctx, &account.location, "storage_weak_tls")
            .resource(&account.name, &account.id)
            .severity(Severity::Medium)
            .risk_vector(RiskVector::ComplianceGap)
            .title("Storage account allows legacy TLS")
            .description(format!(
                "Account '{}' accepts {} connections",
                account.name, version
            ))
            .analysis(
                "Legacy TLS versions fail current compliance baselines and keep \
                 deprecated cipher suites reachable on the account endpoint.",
            )
            .remediation(remediation("storage_weak_tls"))
            .evidence("minTlsVersion", version)
            .build();
        Ok(Some(finding))
    }

    fn check_shared_key_access(
        &self,
        ctx: &ScanContext,
        account: &StorageAccountDetail,
    ) -> Result<Option<Finding>> {
        if !account.shared_key_access_allowed.unwrap_or(true) {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, &account.location, "storage_shared_key_access")
            .resource(&account.name, &account.id)
            .severity(Severity::Medium)
            .risk_vector(RiskVector::CredentialExposure)
            .title("Shared key authorization enabled")
            .description(format!(
                "Account '{}' accepts requests signed with the account keys",
                account.name
            ))
            .analysis(
                "Account keys grant full data plane access, never expire on their \
                 own and bypass Azure AD conditional access. A single leaked key \
                 compromises the whole account until it is manually rotated.",
            )
            .remediation(remediation("storage_shared_key_access"))
            .evidence("sharedKeyAccessAllowed", &account.shared_key_access_allowed)
            .build();
        Ok(Some(finding))
    }
}

impl Default for AzureStorageScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for AzureStorageScanner {
    fn service_name(&self) -> &'static str {
        "azure_storage"
    }

    fn category(&self) -> ScannerCategory {
        ScannerCategory::ObjectStorage
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<(Vec<Finding>, usize)> {
        let api = ctx.azure_api()?;
        info!(
            "[Storage] Starting scan for subscription {}",
            ctx.account_id
        );

        let accounts = self.fetch_accounts(ctx, &api).await?;
        debug!("[Storage] Found {} accounts", accounts.len());

        let mut findings = Vec::new();
        let mut checks_run = 0;

        for account in &accounts {
            // Check anonymous blob exposure
            checks_run += 1;
            if let Some(f) = isolate(
                "storage.public_blob_access",
                self.check_public_blob_access(ctx, account),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check transport encryption
            checks_run += 1;
            if let Some(f) = isolate(
                "storage.secure_transfer",
                self.check_secure_transfer(ctx, account),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check TLS floor
            checks_run += 1;
            if let Some(f) =
                isolate("storage.min_tls", self.check_min_tls(ctx, account)).flatten()
            {
                findings.push(f);
            }

            // Check authorization mode
            checks_run += 1;
            if let Some(f) = isolate(
                "storage.shared_key",
                self.check_shared_key_access(ctx, account),
            )
            .flatten()
            {
                findings.push(f);
            }
        }

        info!(
            "[Storage] Scan complete: {} findings from {} checks",
            findings.len(),
            checks_run
        );
        Ok((findings, checks_run))
    }
}

fn remediation(scan_type: &str) -> Remediation {
    match scan_type {
        "storage_public_blob_access" => Remediation {
            description: "Disallow public blob access account-wide".to_string(),
            steps: vec![
                "Set allowBlobPublicAccess to false on the account".to_string(),
                "Serve genuinely public content through a CDN with SAS instead".to_string(),
            ],
            cli_command: Some(
                "az storage account update --name <account> --allow-blob-public-access false"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "storage_secure_transfer_disabled" => Remediation {
            description: "Require HTTPS for all transfers".to_string(),
            steps: vec![
                "Enable the secure transfer required setting".to_string(),
                "Update any SMB 2.x or plain HTTP clients first".to_string(),
            ],
            cli_command: Some(
                "az storage account update --name <account> --https-only true".to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "storage_weak_tls" => Remediation {
            description: "Raise the minimum TLS version".to_string(),
            steps: vec![
                "Set the minimum TLS version to TLS1_2".to_string(),
            ],
            cli_command: Some(
                "az storage account update --name <account> --min-tls-version TLS1_2".to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "storage_shared_key_access" => Remediation {
            description: "Disable shared key authorization".to_string(),
            steps: vec![
                "Migrate clients to Azure AD authorization or user delegation SAS".to_string(),
                "Set allowSharedKeyAccess to false".to_string(),
                "Rotate the account keys after disabling".to_string(),
            ],
            cli_command: Some(
                "az storage account update --name <account> --allow-shared-key-access false"
                    .to_string(),
            ),
            effort: RemediationEffort::Medium,
            automatable: true,
        },
        _ => Remediation {
            description: "Review the account against the storage security baseline".to_string(),
            steps: vec![
                "Compare settings with the Azure Storage security baseline".to_string(),
            ],
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

    fn hardened_account() -> StorageAccountDetail {
        StorageAccountDetail {
            name: "stprod".to_string(),
            id: "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/stprod"
                .to_string(),
            location: "westeurope".to_string(),
            resource_group: "rg".to_string(),
            allow_blob_public_access: Some(false),
            https_traffic_only: Some(true),
            min_tls_version: Some("TLS1_2".to_string()),
            shared_key_access_allowed: Some(false),
        }
    }

    #[tokio::test]
    async fn test_hardened_account_clean() {
        let mut api = testkit::StaticAzureApi::default();
        api.storage_accounts = vec![hardened_account()];
        let ctx = testkit::azure_context(api, &["westeurope"]);

        let (findings, checks_run) = AzureStorageScanner::new().scan(&ctx).await.unwrap();
        assert!(findings.is_empty());
        assert_eq!(checks_run, 4);
    }

    #[tokio::test]
    async fn test_unset_account_inherits_permissive_defaults() {
        let mut api = testkit::StaticAzureApi::default();
        api.storage_accounts = vec![StorageAccountDetail {
            name: "stlegacy".to_string(),
            id: "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/stlegacy"
                .to_string(),
            location: "northeurope".to_string(),
            resource_group: "rg".to_string(),
            allow_blob_public_access: None,
            https_traffic_only: Some(true),
            min_tls_version: None,
            shared_key_access_allowed: None,
        }];
        let ctx = testkit::azure_context(api, &["northeurope"]);

        let (findings, _) = AzureStorageScanner::new().scan(&ctx).await.unwrap();
        let types: Vec<&str> = findings.iter().map(|f| f.scan_type.as_str()).collect();
        // Unset public access and shared key flags resolve to the permissive default
        assert!(types.contains(&"storage_public_blob_access"));
        assert!(types.contains(&"storage_shared_key_access"));
        assert!(!types.contains(&"storage_weak_tls"));
    }

    #[tokio::test]
    async fn test_plain_http_account_flagged() {
        let mut api = testkit::StaticAzureApi::default();
        let mut account = hardened_account();
        account.https_traffic_only = Some(false);
        account.min_tls_version = Some("TLS1_0".to_string());
        api.storage_accounts = vec![account];
        let ctx = testkit::azure_context(api, &["westeurope"]);

        let (findings, _) = AzureStorageScanner::new().scan(&ctx).await.unwrap();
        let types: Vec<&str> = findings.iter().map(|f| f.scan_type.as_str()).collect();
        assert!(types.contains(&"storage_secure_transfer_disabled"));
        assert!(types.contains(&"storage_weak_tls"));
    }

    #[tokio::test]
    async fn test_public_access_is_critical() {
        let mut api = testkit::StaticAzureApi::default();
        let mut account = hardened_account();
        account.allow_blob_public_access = Some(true);
        api.storage_accounts = vec![account];
        let ctx = testkit::azure_context(api, &["westeurope"]);

        let (findings, _) = AzureStorageScanner::new().scan(&ctx).await.unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].risk_vector, RiskVector::PublicExposure);
    }
}
