// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Azure App Service Posture Scanner
 * Web app hosting configuration checks
 *
 * Detects:
 * - Sites accepting plain HTTP
 * - Weak minimum TLS versions
 * - Plain FTP deployment endpoints
 * - Sites without a managed identity
 * - Remote debugging left enabled
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use crate::context::ScanContext;
use crate::provider::azure::{AppServiceSite, AzureApi};
use crate::scanner::{isolate, FindingBuilder, Scanner, ScannerCategory};
use crate::types::{Finding, Remediation, RemediationEffort, RiskVector, Severity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// TLS floors below 1.2 that App Service still accepts
const WEAK_TLS_VERSIONS: [&str; 2] = ["1.0", "1.1"];

pub struct AzureAppServiceScanner;

impl AzureAppServiceScanner {
    pub fn new() -> Self {
        Self
    }

    async fn fetch_sites(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AzureApi>,
    ) -> Result<Vec<AppServiceSite>> {
        let key = ctx.cache_key("appservice:sites");
        let sites = ctx
            .cache
            .get_or_fetch(&key, || async {
                ctx.rate_limiter
                    .execute("appservice.list", || api.list_app_services(&ctx.account_id))
                    .await
            })
            .await
            .context("Failed to list App Service sites")?;
        Ok(sites)
    }

    fn check_https_only(
        &self,
        ctx: &ScanContext,
        site: &AppServiceSite,
    ) -> Result<Option<Finding>> {
        if site.https_only == Some(true) {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, &site.location, "appservice_https_only_disabled")
            .resource(&site.name, &site.id)
            .severity(Severity::High)
            .risk_vector(RiskVector::DataExposure)
            .title("App Service accepts plain HTTP")
            .description(format!(
                "Site '{}' serves traffic over HTTP without redirecting to HTTPS",
                site.name
            ))
            .analysis(
                "Session cookies and form submissions travel in cleartext on any \
                 network path between the client and the site, where they can be \
                 read or rewritten in transit.",
            )
            .remediation(remediation("appservice_https_only_disabled"))
            .evidence("httpsOnly", &site.https_only)
            .build();
        Ok(Some(finding))
    }

    fn check_min_tls(&self, ctx: &ScanContext, site: &AppServiceSite) -> Result<Option<Finding>> {
        let version = match site.min_tls_version.as_deref() {
            Some(v) if WEAK_TLS_VERSIONS.contains(&v) => v,
            // Unset means the platform default of 1.2
            _ => return Ok(None),
        };

        let finding = FindingBuilder::new(ctx, &site.location, "appservice_weak_tls")
            .resource(&site.name, &site.id)
            .severity(Severity::Medium)
            .risk_vector(RiskVector::ComplianceGap)
            .title("App Service allows legacy TLS")
            .description(format!(
                "Site '{}' accepts TLS {} connections",
                site.name, version
            ))
            .analysis(
                "TLS 1.0 and 1.1 carry known protocol weaknesses and fail PCI-DSS \
                 requirements outright. Raising the floor to 1.2 drops only clients \
                 that are themselves long out of support.",
            )
            .remediation(remediation("appservice_weak_tls"))
            .evidence("minTlsVersion", version)
            .build();
        Ok(Some(finding))
    }

    fn check_ftp_state(&self, ctx: &ScanContext, site: &AppServiceSite) -> Result<Option<Finding>> {
        if site.ftps_state.as_deref() != Some("AllAllowed") {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, &site.location, "appservice_ftp_enabled")
            .resource(&site.name, &site.id)
            .severity(Severity::Medium)
            .risk_vector(RiskVector::CredentialExposure)
            .title("Plain FTP deployment endpoint enabled")
            .description(format!(
                "Site '{}' accepts unencrypted FTP deployments",
                site.name
            ))
            .analysis(
                "FTP sends deployment credentials in cleartext. Anyone who captures \
                 them can push arbitrary code into the site.",
            )
            .remediation(remediation("appservice_ftp_enabled"))
            .evidence("ftpsState", &site.ftps_state)
            .build();
        Ok(Some(finding))
    }

    fn check_managed_identity(
        &self,
        ctx: &ScanContext,
        site: &AppServiceSite,
    ) -> Result<Option<Finding>> {
        if site.managed_identity.is_some() {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, &site.location, "appservice_no_managed_identity")
            .resource(&site.name, &site.id)
            .severity(Severity::Medium)
            .risk_vector(RiskVector::CredentialExposure)
            .title("App Service without a managed identity")
            .description(format!(
                "Site '{}' has no system or user assigned identity",
                site.name
            ))
            .analysis(
                "Without a managed identity the app must hold connection strings and \
                 API keys in configuration, each one a long-lived secret that leaks \
                 through backups, logs and repository history.",
            )
            .remediation(remediation("appservice_no_managed_identity"))
            .evidence("managedIdentity", serde_json::Value::Null)
            .build();
        Ok(Some(finding))
    }

    fn check_remote_debugging(
        &self,
        ctx: &ScanContext,
        site: &AppServiceSite,
    ) -> Result<Option<Finding>> {
        if site.remote_debugging_enabled != Some(true) {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, &site.location, "appservice_remote_debugging")
            .resource(&site.name, &site.id)
            .severity(Severity::High)
            .risk_vector(RiskVector::PublicExposure)
            .title("Remote debugging enabled on a live site")
            .description(format!(
                "Site '{}' exposes a remote debugger endpoint",
                site.name
            ))
            .analysis(
                "A debugger session grants code execution inside the app process. \
                 Debug endpoints are meant for short-lived troubleshooting and are \
                 routinely forgotten after the incident ends.",
            )
            .remediation(remediation("appservice_remote_debugging"))
            .evidence("remoteDebuggingEnabled", &site.remote_debugging_enabled)
            .build();
        Ok(Some(finding))
    }
}

impl Default for AzureAppServiceScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for AzureAppServiceScanner {
    fn service_name(&self) -> &'static str {
        "azure_appservice"
    }

    fn category(&self) -> ScannerCategory {
        ScannerCategory::AppHosting
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<(Vec<Finding>, usize)> {
        let api = ctx.azure_api()?;
        info!(
            "[AppService] Starting scan for subscription {}",
            ctx.account_id
        );

        let sites = self.fetch_sites(ctx, &api).await?;
        debug!("[AppService] Found {} sites", sites.len());

        let mut findings = Vec::new();
        let mut checks_run = 0;

        for site in &sites {
            // Check HTTPS enforcement
            checks_run += 1;
            if let Some(f) =
                isolate("appservice.https_only", self.check_https_only(ctx, site)).flatten()
            {
                findings.push(f);
            }

            // Check TLS floor
            checks_run += 1;
            if let Some(f) = isolate("appservice.min_tls", self.check_min_tls(ctx, site)).flatten()
            {
                findings.push(f);
            }

            // Check FTP deployment state
            checks_run += 1;
            if let Some(f) = isolate("appservice.ftp", self.check_ftp_state(ctx, site)).flatten() {
                findings.push(f);
            }

            // Check identity assignment
            checks_run += 1;
            if let Some(f) = isolate(
                "appservice.managed_identity",
                self.check_managed_identity(ctx, site),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check debugging exposure
            checks_run += 1;
            if let Some(f) = isolate(
                "appservice.remote_debugging",
                self.check_remote_debugging(ctx, site),
            )
            .flatten()
            {
                findings.push(f);
            }
        }

        info!(
            "[AppService] Scan complete: {} findings from {} checks",
            findings.len(),
            checks_run
        );
        Ok((findings, checks_run))
    }
}

fn remediation(scan_type: &str) -> Remediation {
    match scan_type {
        "appservice_https_only_disabled" => Remediation {
            description: "Enforce HTTPS on the site".to_string(),
            steps: vec![
                "Enable the HTTPS Only setting so HTTP requests redirect".to_string(),
                "Add HSTS headers in the application".to_string(),
            ],
            cli_command: Some(
                "az webapp update --name <site> --resource-group <rg> --https-only true"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "appservice_weak_tls" => Remediation {
            description: "Raise the minimum TLS version".to_string(),
            steps: vec![
                "Set the minimum TLS version to 1.2 or higher".to_string(),
                "Check client telemetry for legacy TLS usage first".to_string(),
            ],
            cli_command: Some(
                "az webapp config set --name <site> --resource-group <rg> --min-tls-version 1.2"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "appservice_ftp_enabled" => Remediation {
            description: "Disable plain FTP deployments".to_string(),
            steps: vec![
                "Set the FTP state to FtpsOnly, or Disabled if FTP is unused".to_string(),
                "Prefer deployment via CI with OIDC or deployment slots".to_string(),
            ],
            cli_command: Some(
                "az webapp config set --name <site> --resource-group <rg> --ftps-state FtpsOnly"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "appservice_no_managed_identity" => Remediation {
            description: "Assign a managed identity".to_string(),
            steps: vec![
                "Enable a system assigned identity on the site".to_string(),
                "Grant it roles on the resources the app consumes".to_string(),
                "Replace connection string secrets with identity based access".to_string(),
            ],
            cli_command: Some(
                "az webapp identity assign --name <site> --resource-group <rg>".to_string(),
            ),
            effort: RemediationEffort::Medium,
            automatable: true,
        },
        "appservice_remote_debugging" => Remediation {
            description: "Turn off remote debugging".to_string(),
            steps: vec![
                "Disable remote debugging on the site configuration".to_string(),
                "Use log streaming and snapshot debugging for production diagnosis".to_string(),
            ],
            cli_command: Some(
                "az webapp config set --name <site> --resource-group <rg> --remote-debugging-enabled false"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        _ => Remediation {
            description: "Review the site against the App Service security baseline".to_string(),
            steps: vec![
                "Compare settings with the Azure App Service security baseline".to_string(),
            ],
            cli_command: None,
            effort: RemediationEffort::Medium,
            automatable: false,
        },
    }
}
