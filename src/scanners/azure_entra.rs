// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Azure Entra ID Posture Scanner
 * Tenant-wide identity directory checks via Microsoft Graph
 *
 * Detects:
 * - Users without any MFA enforcement path
 * - Guest accounts that never sign in
 * - Oversized Global Administrator groups
 * - Legacy authentication protocols left enabled
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use crate::context::ScanContext;
use crate::provider::azure::{AzureApi, DirectoryPosture, GuestAccount};
use crate::scanner::{isolate, FindingBuilder, Scanner, ScannerCategory};
use crate::types::{Finding, Remediation, RemediationEffort, RiskVector, Severity};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::info;

/// Guests with no sign-in inside this window count as stale
const STALE_GUEST_DAYS: i64 = 90;
/// Microsoft's own guidance caps Global Administrators at five
const MAX_GLOBAL_ADMINS: u32 = 5;

pub struct AzureEntraScanner;

impl AzureEntraScanner {
    pub fn new() -> Self {
        Self
    }

    async fn fetch_posture(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AzureApi>,
        tenant_id: &str,
    ) -> Result<DirectoryPosture> {
        let key = ctx.cache_key("entra:directory");
        let posture = ctx
            .cache
            .get_or_fetch(&key, || async {
                ctx.rate_limiter
                    .execute("entra.get_directory", || api.get_directory_posture(tenant_id))
                    .await
            })
            .await
            .context("Failed to read directory posture")?;
        Ok(posture)
    }

    fn check_mfa_enforcement(
        &self,
        ctx: &ScanContext,
        tenant_id: &str,
        posture: &DirectoryPosture,
    ) -> Result<Option<Finding>> {
        let enforcement_exists = posture.security_defaults_enabled == Some(true)
            || posture.conditional_access_policy_count > 0;
        if posture.users_without_mfa == 0 || enforcement_exists {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, "global", "entra_mfa_not_enforced")
            .resource(tenant_id, &directory_uri(tenant_id))
            .severity(Severity::Critical)
            .risk_vector(RiskVector::CredentialExposure)
            .title("No MFA enforcement path in the tenant")
            .description(format!(
                "{} of {} users lack MFA and neither security defaults nor \
                 conditional access enforce it",
                posture.users_without_mfa, posture.total_users
            ))
            .analysis(
                "With no enforcement mechanism, every one of these accounts falls to \
                 a single phished or reused password. Password-only tenants are the \
                 primary target of credential stuffing campaigns.",
            )
            .remediation(remediation("entra_mfa_not_enforced"))
            .evidence("usersWithoutMfa", posture.users_without_mfa)
            .evidence("totalUsers", posture.total_users)
            .evidence("securityDefaultsEnabled", &posture.security_defaults_enabled)
            .evidence(
                "conditionalAccessPolicyCount",
                posture.conditional_access_policy_count,
            )
            .build();
        Ok(Some(finding))
    }

    fn check_stale_guests(
        &self,
        ctx: &ScanContext,
        tenant_id: &str,
        posture: &DirectoryPosture,
    ) -> Result<Option<Finding>> {
        let cutoff = Utc::now() - Duration::days(STALE_GUEST_DAYS);
        let stale: Vec<&GuestAccount> = posture
            .guest_accounts
            .iter()
            .filter(|guest| guest.last_sign_in.map_or(true, |seen| seen < cutoff))
            .collect();
        if stale.is_empty() {
            return Ok(None);
        }

        let stale_names: Vec<&str> = stale
            .iter()
            .map(|guest| guest.user_principal_name.as_str())
            .collect();
        let finding = FindingBuilder::new(ctx, "global", "entra_stale_guest_accounts")
            .resource(tenant_id, &directory_uri(tenant_id))
            .severity(Severity::Medium)
            .risk_vector(RiskVector::ExcessivePermissions)
            .title("Stale guest accounts in the directory")
            .description(format!(
                "{} guest account(s) have not signed in for {} days",
                stale.len(),
                STALE_GUEST_DAYS
            ))
            .analysis(
                "Dormant guest identities keep whatever access they were invited \
                 with, but nobody watches them. They are attractive takeover targets \
                 because their home tenant's hygiene is outside this tenant's control.",
            )
            .remediation(remediation("entra_stale_guest_accounts"))
            .evidence("staleGuestCount", stale.len())
            .evidence("staleGuests", &stale_names)
            .build();
        Ok(Some(finding))
    }

    fn check_global_admins(
        &self,
        ctx: &ScanContext,
        tenant_id: &str,
        posture: &DirectoryPosture,
    ) -> Result<Option<Finding>> {
        if posture.global_admin_count <= MAX_GLOBAL_ADMINS {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, "global", "entra_excessive_global_admins")
            .resource(tenant_id, &directory_uri(tenant_id))
            .severity(Severity::High)
            .risk_vector(RiskVector::ExcessivePermissions)
            .title("Too many Global Administrators")
            .description(format!(
                "Tenant has {} Global Administrators (recommended maximum is {})",
                posture.global_admin_count, MAX_GLOBAL_ADMINS
            ))
            .analysis(
                "Each Global Administrator account is a full-tenant compromise \
                 waiting on one phishing success. Most holders need a scoped role \
                 like User Administrator or a PIM-activated assignment instead.",
            )
            .remediation(remediation("entra_excessive_global_admins"))
            .evidence("globalAdminCount", posture.global_admin_count)
            .build();
        Ok(Some(finding))
    }

    fn check_legacy_auth(
        &self,
        ctx: &ScanContext,
        tenant_id: &str,
        posture: &DirectoryPosture,
    ) -> Result<Option<Finding>> {
        if posture.legacy_auth_enabled != Some(true) {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, "global", "entra_legacy_auth_enabled")
            .resource(tenant_id, &directory_uri(tenant_id))
            .severity(Severity::High)
            .risk_vector(RiskVector::CredentialExposure)
            .title("Legacy authentication protocols enabled")
            .description(
                "The tenant accepts basic authentication protocols that cannot \
                 perform MFA",
            )
            .analysis(
                "IMAP, POP and SMTP basic auth bypass every conditional access and \
                 MFA control, so password spraying against them succeeds even in \
                 tenants that enforce MFA everywhere else.",
            )
            .remediation(remediation("entra_legacy_auth_enabled"))
            .evidence("legacyAuthEnabled", &posture.legacy_auth_enabled)
            .build();
        Ok(Some(finding))
    }
}

impl Default for AzureEntraScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for AzureEntraScanner {
    fn service_name(&self) -> &'static str {
        "azure_entra"
    }

    fn category(&self) -> ScannerCategory {
        ScannerCategory::Identity
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<(Vec<Finding>, usize)> {
        let api = ctx.azure_api()?;
        let tenant_id = ctx
            .tenant_id
            .clone()
            .ok_or_else(|| anyhow!("Azure scan context has no tenant id"))?;
        info!("[Entra] Starting scan for tenant {}", tenant_id);

        let posture = self.fetch_posture(ctx, &api, &tenant_id).await?;

        let mut findings = Vec::new();
        let mut checks_run = 0;

        // Check MFA enforcement
        checks_run += 1;
        if let Some(f) = isolate(
            "entra.mfa",
            self.check_mfa_enforcement(ctx, &tenant_id, &posture),
        )
        .flatten()
        {
            findings.push(f);
        }

        // Check guest account hygiene
        checks_run += 1;
        if let Some(f) = isolate(
            "entra.guests",
            self.check_stale_guests(ctx, &tenant_id, &posture),
        )
        .flatten()
        {
            findings.push(f);
        }

        // Check privileged role sprawl
        checks_run += 1;
        if let Some(f) = isolate(
            "entra.global_admins",
            self.check_global_admins(ctx, &tenant_id, &posture),
        )
        .flatten()
        {
            findings.push(f);
        }

        // Check legacy protocol exposure
        checks_run += 1;
        if let Some(f) = isolate(
            "entra.legacy_auth",
            self.check_legacy_auth(ctx, &tenant_id, &posture),
        )
        .flatten()
        {
            findings.push(f);
        }

        info!(
            "[Entra] Scan complete: {} findings from {} checks",
            findings.len(),
            checks_run
        );
        Ok((findings, checks_run))
    }
}

fn directory_uri(tenant_id: &str) -> String {
    format!("https://graph.microsoft.com/v1.0/directory/{}", tenant_id)
}

fn remediation(scan_type: &str) -> Remediation {
    match scan_type {
        "entra_mfa_not_enforced" => Remediation {
            description: "Enforce MFA tenant-wide".to_string(),
            steps: vec![
                "Enable security defaults, or author conditional access policies requiring MFA"
                    .to_string(),
                "Start with administrators, then roll out to all users".to_string(),
                "Register authentication methods for affected users before enforcement"
                    .to_string(),
            ],
            cli_command: None,
            effort: RemediationEffort::Medium,
            automatable: false,
        },
        "entra_stale_guest_accounts" => Remediation {
            description: "Review and remove dormant guests".to_string(),
            steps: vec![
                "Run an access review over all guest accounts".to_string(),
                "Delete guests with no sign-in in the last 90 days".to_string(),
                "Enable recurring guest access reviews".to_string(),
            ],
            cli_command: Some(
                "az ad user list --filter \"userType eq 'Guest'\" --query '[].userPrincipalName'"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "entra_excessive_global_admins" => Remediation {
            description: "Reduce Global Administrator assignments".to_string(),
            steps: vec![
                "Map each holder to the least privileged role covering their duties".to_string(),
                "Move remaining assignments to PIM eligible activation".to_string(),
                "Keep at most two break-glass accounts with standing access".to_string(),
            ],
            cli_command: None,
            effort: RemediationEffort::Medium,
            automatable: false,
        },
        "entra_legacy_auth_enabled" => Remediation {
            description: "Block legacy authentication".to_string(),
            steps: vec![
                "Create a conditional access policy blocking legacy auth clients".to_string(),
                "Check sign-in logs for legacy protocol usage before enforcing".to_string(),
            ],
            cli_command: None,
            effort: RemediationEffort::Medium,
            automatable: false,
        },
        _ => Remediation {
            description: "Review the tenant against the Entra ID security baseline".to_string(),
            steps: vec!["Compare settings with Microsoft's identity secure score".to_string()],
            cli_command: None,
            effort: RemediationEffort::Medium,
            automatable: false,
        },
    }
}
