// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Azure Provider Surface
 * Typed inventory responses for Azure Resource Manager and Microsoft Graph
 *
 * @copyright 2025 Bountyy Oy
 * @license Proprietary
 */

use crate::errors::ProviderResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inventory/list capability for one Azure subscription and tenant.
///
/// Resources are listed subscription-wide; each carries its own location,
/// which findings report as their region scope.
#[async_trait]
pub trait AzureApi: Send + Sync {
    async fn list_key_vaults(&self, subscription_id: &str)
        -> ProviderResult<Vec<KeyVaultProperties>>;

    async fn get_directory_posture(&self, tenant_id: &str) -> ProviderResult<DirectoryPosture>;

    async fn list_app_services(&self, subscription_id: &str)
        -> ProviderResult<Vec<AppServiceSite>>;

    async fn list_storage_accounts(
        &self,
        subscription_id: &str,
    ) -> ProviderResult<Vec<StorageAccountDetail>>;

    async fn list_virtual_machines(
        &self,
        subscription_id: &str,
    ) -> ProviderResult<Vec<AzureVirtualMachine>>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyVaultProperties {
    pub name: String,
    /// Full ARM resource id
    pub id: String,
    pub location: String,
    pub resource_group: String,
    pub soft_delete_enabled: Option<bool>,
    pub purge_protection_enabled: Option<bool>,
    /// "Enabled" or "Disabled"
    pub public_network_access: Option<String>,
    pub rbac_authorization_enabled: Option<bool>,
}

/// Tenant-wide identity posture from Microsoft Graph. Aggregated counts
/// rather than per-user records; the directory itself is the resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryPosture {
    pub tenant_id: String,
    pub total_users: u32,
    pub users_without_mfa: u32,
    pub security_defaults_enabled: Option<bool>,
    pub conditional_access_policy_count: u32,
    pub guest_accounts: Vec<GuestAccount>,
    pub global_admin_count: u32,
    pub legacy_auth_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestAccount {
    pub user_principal_name: String,
    pub last_sign_in: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppServiceSite {
    pub name: String,
    pub id: String,
    pub location: String,
    pub resource_group: String,
    pub https_only: Option<bool>,
    /// e.g. "1.0", "1.2", "1.3"
    pub min_tls_version: Option<String>,
    /// "AllAllowed", "FtpsOnly", or "Disabled"
    pub ftps_state: Option<String>,
    /// Managed identity type when assigned ("SystemAssigned", "UserAssigned")
    pub managed_identity: Option<String>,
    pub remote_debugging_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountDetail {
    pub name: String,
    pub id: String,
    pub location: String,
    pub resource_group: String,
    pub allow_blob_public_access: Option<bool>,
    pub https_traffic_only: Option<bool>,
    /// "TLS1_0", "TLS1_1", "TLS1_2"
    pub min_tls_version: Option<String>,
    pub shared_key_access_allowed: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureVirtualMachine {
    pub name: String,
    pub id: String,
    pub location: String,
    pub resource_group: String,
    pub os_disk_encrypted: Option<bool>,
    /// NSG attached to the primary NIC, when any
    pub network_security_group: Option<String>,
    pub public_ip: Option<String>,
    pub managed_identity: Option<String>,
}
