// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Azure Key Vault Posture Scanner
 * Secrets vault protection and access model checks
 *
 * Detects:
 * - Vaults without soft delete
 * - Vaults without purge protection
 * - Vaults reachable from public networks
 * - Vaults still on the legacy access policy model
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use crate::context::ScanContext;
use crate::provider::azure::{AzureApi, KeyVaultProperties};
use crate::scanner::{isolate, FindingBuilder, Scanner, ScannerCategory};
use crate::types::{Finding, Remediation, RemediationEffort, RiskVector, Severity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

pub struct AzureKeyVaultScanner;

impl AzureKeyVaultScanner {
    pub fn new() -> Self {
        Self
    }

    async fn fetch_vaults(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AzureApi>,
    ) -> Result<Vec<KeyVaultProperties>> {
        let key = ctx.cache_key("keyvault:vaults");
        let vaults = ctx
            .cache
            .get_or_fetch(&key, || async {
                ctx.rate_limiter
                    .execute("keyvault.list", || api.list_key_vaults(&ctx.account_id))
                    .await
            })
            .await
            .context("Failed to list Key Vaults")?;
        Ok(vaults)
    }

    fn check_soft_delete(
        &self,
        ctx: &ScanContext,
        vault: &KeyVaultProperties,
    ) -> Result<Option<Finding>> {
        if vault.soft_delete_enabled == Some(true) {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, &vault.location, "keyvault_soft_delete_disabled")
            .resource(&vault.name, &vault.id)
            .severity(Severity::High)
            .risk_vector(RiskVector::Availability)
            .title("Key Vault without soft delete")
            .description(format!(
                "Vault '{}' deletes secrets permanently and immediately",
                vault.name
            ))
            .analysis(
                "Without soft delete, one mistaken or malicious delete call destroys \
                 keys and secrets with no recovery window. Workloads depending on \
                 those secrets fail until they are manually re-provisioned.",
            )
            .remediation(remediation("keyvault_soft_delete_disabled"))
            .evidence("softDeleteEnabled", &vault.soft_delete_enabled)
            .build();
        Ok(Some(finding))
    }

    fn check_purge_protection(
        &self,
        ctx: &ScanContext,
        vault: &KeyVaultProperties,
    ) -> Result<Option<Finding>> {
        if vault.purge_protection_enabled == Some(true) {
            return Ok(None);
        }

        let finding =
            FindingBuilder::new(ctx, &vault.location, "keyvault_purge_protection_disabled")
                .resource(&vault.name, &vault.id)
                .severity(Severity::Medium)
                .risk_vector(RiskVector::Availability)
                .title("Key Vault without purge protection")
                .description(format!(
                    "Vault '{}' allows soft-deleted items to be purged before the \
                     retention window ends",
                    vault.name
                ))
                .analysis(
                    "An attacker with delete rights can soft-delete a secret and then \
                     purge it in the same session, defeating the soft delete safety \
                     net entirely.",
                )
                .remediation(remediation("keyvault_purge_protection_disabled"))
                .evidence("purgeProtectionEnabled", &vault.purge_protection_enabled)
                .build();
        Ok(Some(finding))
    }

    fn check_public_network_access(
        &self,
        ctx: &ScanContext,
        vault: &KeyVaultProperties,
    ) -> Result<Option<Finding>> {
        // Unset inherits the platform default, which permits public access
        let publicly_reachable = vault
            .public_network_access
            .as_deref()
            .map_or(true, |mode| mode.eq_ignore_ascii_case("enabled"));
        if !publicly_reachable {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, &vault.location, "keyvault_public_network_access")
            .resource(&vault.name, &vault.id)
            .severity(Severity::High)
            .risk_vector(RiskVector::PublicExposure)
            .title("Key Vault reachable from public networks")
            .description(format!(
                "Vault '{}' accepts data plane requests from any network",
                vault.name
            ))
            .analysis(
                "A vault holding production credentials should not be addressable \
                 from the internet. Public reachability means a single leaked access \
                 token can be used from anywhere.",
            )
            .remediation(remediation("keyvault_public_network_access"))
            .evidence("publicNetworkAccess", &vault.public_network_access)
            .build();
        Ok(Some(finding))
    }

    fn check_rbac_authorization(
        &self,
        ctx: &ScanContext,
        vault: &KeyVaultProperties,
    ) -> Result<Option<Finding>> {
        if vault.rbac_authorization_enabled == Some(true) {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, &vault.location, "keyvault_rbac_disabled")
            .resource(&vault.name, &vault.id)
            .severity(Severity::Medium)
            .risk_vector(RiskVector::ExcessivePermissions)
            .title("Key Vault on the legacy access policy model")
            .description(format!(
                "Vault '{}' uses vault access policies instead of Azure RBAC",
                vault.name
            ))
            .analysis(
                "Access policies grant whole permission categories per principal and \
                 sit outside the subscription's role assignment review process, so \
                 stale grants accumulate unnoticed.",
            )
            .remediation(remediation("keyvault_rbac_disabled"))
            .evidence(
                "rbacAuthorizationEnabled",
                &vault.rbac_authorization_enabled,
            )
            .build();
        Ok(Some(finding))
    }
}

impl Default for AzureKeyVaultScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for AzureKeyVaultScanner {
    fn service_name(&self) -> &'static str {
        "azure_keyvault"
    }

    fn category(&self) -> ScannerCategory {
        ScannerCategory::SecretsManagement
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<(Vec<Finding>, usize)> {
        let api = ctx.azure_api()?;
        info!(
            "[KeyVault] Starting scan for subscription {}",
            ctx.account_id
        );

        let vaults = self.fetch_vaults(ctx, &api).await?;
        debug!("[KeyVault] Found {} vaults", vaults.len());

        let mut findings = Vec::new();
        let mut checks_run = 0;

        for vault in &vaults {
            // Check soft delete
            checks_run += 1;
            if let Some(f) =
                isolate("keyvault.soft_delete", self.check_soft_delete(ctx, vault)).flatten()
            {
                findings.push(f);
            }

            // Check purge protection
            checks_run += 1;
            if let Some(f) = isolate(
                "keyvault.purge_protection",
                self.check_purge_protection(ctx, vault),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check network exposure
            checks_run += 1;
            if let Some(f) = isolate(
                "keyvault.network_access",
                self.check_public_network_access(ctx, vault),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check authorization model
            checks_run += 1;
            if let Some(f) =
                isolate("keyvault.rbac", self.check_rbac_authorization(ctx, vault)).flatten()
            {
                findings.push(f);
            }
        }

        info!(
            "[KeyVault] Scan complete: {} findings from {} checks",
            findings.len(),
            checks_run
        );
        Ok((findings, checks_run))
    }
}

fn remediation(scan_type: &str) -> Remediation {
    match scan_type {
        "keyvault_soft_delete_disabled" => Remediation {
            description: "Enable soft delete on the vault".to_string(),
            steps: vec![
                "Enable soft delete with at least a 7 day retention period".to_string(),
                "Enable purge protection alongside it".to_string(),
            ],
            cli_command: Some(
                "az keyvault update --name <vault> --enable-soft-delete true".to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "keyvault_purge_protection_disabled" => Remediation {
            description: "Enable purge protection".to_string(),
            steps: vec![
                "Enable purge protection on the vault (this cannot be reverted)".to_string(),
            ],
            cli_command: Some(
                "az keyvault update --name <vault> --enable-purge-protection true".to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "keyvault_public_network_access" => Remediation {
            description: "Restrict vault network access".to_string(),
            steps: vec![
                "Set public network access to Disabled".to_string(),
                "Add a private endpoint in the workload VNet".to_string(),
                "Allow-list trusted Azure services if platform integrations need access"
                    .to_string(),
            ],
            cli_command: Some(
                "az keyvault update --name <vault> --public-network-access Disabled".to_string(),
            ),
            effort: RemediationEffort::Medium,
            automatable: true,
        },
        "keyvault_rbac_disabled" => Remediation {
            description: "Migrate to Azure RBAC authorization".to_string(),
            steps: vec![
                "Map each access policy to an equivalent Key Vault RBAC role assignment"
                    .to_string(),
                "Enable RBAC authorization on the vault".to_string(),
                "Remove the old access policies once clients are verified".to_string(),
            ],
            cli_command: Some(
                "az keyvault update --name <vault> --enable-rbac-authorization true".to_string(),
            ),
            effort: RemediationEffort::Medium,
            automatable: false,
        },
        _ => Remediation {
            description: "Review the vault against the Key Vault security baseline".to_string(),
            steps: vec!["Compare settings with the Azure Key Vault security baseline".to_string()],
            cli_command: None,
            effort: RemediationEffort::Medium,
            automatable: false,
        },
    }
}
