// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - AWS Backup Posture Scanner
 * Backup coverage and retention checks
 *
 * Detects:
 * - Regions with no backup vault (one aggregate finding per region)
 * - Vaults without a KMS encryption key
 * - Regions with no backup plan (one aggregate finding per region)
 * - Plan rules with retention under the policy floor
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use crate::context::ScanContext;
use crate::provider::aws::{AwsApi, BackupInventory, BackupPlan, BackupVault};
use crate::scanner::{isolate, FindingBuilder, Scanner, ScannerCategory};
use crate::types::{Finding, Remediation, RemediationEffort, RiskVector, Severity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Rules retaining recovery points for fewer days than this are flagged
const MIN_RETENTION_DAYS: u32 = 7;

pub struct AwsBackupScanner;

impl AwsBackupScanner {
    pub fn new() -> Self {
        Self
    }

    async fn fetch_inventory(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AwsApi>,
        region: &str,
    ) -> Result<BackupInventory> {
        let key = ctx.cache_key(&format!("backup:inventory:{}", region));
        let inventory = ctx
            .cache
            .get_or_fetch(&key, || async {
                ctx.rate_limiter
                    .execute("backup.get_inventory", || api.get_backup_inventory(region))
                    .await
            })
            .await
            .context("Failed to read AWS Backup inventory")?;
        Ok(inventory)
    }

    async fn scan_region(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AwsApi>,
        region: &str,
    ) -> Result<(Vec<Finding>, usize)> {
        let inventory = self.fetch_inventory(ctx, api, region).await?;
        debug!(
            "[Backup] {} vault(s), {} plan(s) in {}",
            inventory.vaults.len(),
            inventory.plans.len(),
            region
        );

        let mut findings = Vec::new();
        let mut checks_run = 0;

        // Vault coverage for the region
        checks_run += 1;
        if inventory.vaults.is_empty() {
            findings.push(self.no_vaults(ctx, region));
        } else {
            for vault in &inventory.vaults {
                // Check vault encryption
                checks_run += 1;
                if let Some(f) = isolate(
                    "backup.vault_encryption",
                    self.check_vault_encryption(ctx, region, vault),
                )
                .flatten()
                {
                    findings.push(f);
                }
            }
        }

        // Plan coverage for the region
        checks_run += 1;
        if inventory.plans.is_empty() {
            findings.push(self.no_plans(ctx, region));
        } else {
            for plan in &inventory.plans {
                // Check rule retention
                checks_run += 1;
                if let Some(f) = isolate(
                    "backup.retention",
                    self.check_retention(ctx, region, plan),
                )
                .flatten()
                {
                    findings.push(f);
                }
            }
        }

        Ok((findings, checks_run))
    }

    fn no_vaults(&self, ctx: &ScanContext, region: &str) -> Finding {
        FindingBuilder::new(ctx, region, "backup_no_vaults")
            .resource(region, "")
            .severity(Severity::High)
            .risk_vector(RiskVector::Availability)
            .title("No backup vaults in region")
            .description(format!("Region {} has no AWS Backup vault", region))
            .analysis(
                "Workloads in this region have no centralized recovery points. A \
                 destructive incident, malicious or accidental, has nothing to restore from.",
            )
            .remediation(remediation("backup_no_vaults"))
            .evidence("vaultCount", 0)
            .build()
    }

    fn no_plans(&self, ctx: &ScanContext, region: &str) -> Finding {
        FindingBuilder::new(ctx, region, "backup_no_plans")
            .resource(region, "")
            .severity(Severity::High)
            .risk_vector(RiskVector::Availability)
            .title("No backup plans in region")
            .description(format!(
                "Region {} has no AWS Backup plan scheduling recovery points",
                region
            ))
            .analysis(
                "Even where vaults exist, nothing is scheduled to populate them. Recovery \
                 point age grows unbounded from the last manual snapshot.",
            )
            .remediation(remediation("backup_no_plans"))
            .evidence("planCount", 0)
            .build()
    }

    fn check_vault_encryption(
        &self,
        ctx: &ScanContext,
        region: &str,
        vault: &BackupVault,
    ) -> Result<Option<Finding>> {
        if vault.encryption_key_arn.is_some() {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "backup_vault_not_encrypted")
            .resource(&vault.name, &vault.arn)
            .severity(Severity::High)
            .risk_vector(RiskVector::DataExposure)
            .title("Backup vault without KMS encryption")
            .description(format!(
                "Vault '{}' has no customer-managed encryption key",
                vault.name
            ))
            .analysis(
                "Recovery points concentrate full copies of production data. Without a \
                 dedicated KMS key the vault cannot be isolated from compromised \
                 account-level access.",
            )
            .remediation(remediation("backup_vault_not_encrypted"))
            .evidence("recoveryPoints", vault.recovery_points)
            .build();
        Ok(Some(finding))
    }

    fn check_retention(
        &self,
        ctx: &ScanContext,
        region: &str,
        plan: &BackupPlan,
    ) -> Result<Option<Finding>> {
        let short_rules: Vec<serde_json::Value> = plan
            .rules
            .iter()
            .filter(|rule| {
                rule.retention_days
                    .map(|days| days < MIN_RETENTION_DAYS)
                    .unwrap_or(false)
            })
            .map(|rule| {
                serde_json::json!({
                    "rule": rule.rule_name,
                    "retentionDays": rule.retention_days,
                })
            })
            .collect();
        if short_rules.is_empty() {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "backup_short_retention")
            .resource(&plan.name, "")
            .severity(Severity::Medium)
            .risk_vector(RiskVector::Availability)
            .title("Backup plan retention below policy floor")
            .description(format!(
                "Plan '{}' has {} rule(s) retaining recovery points for under {} days",
                plan.name,
                short_rules.len(),
                MIN_RETENTION_DAYS
            ))
            .analysis(
                "Short retention windows mean a slow-burning incident (discovered weeks \
                 later) outlives every clean recovery point.",
            )
            .remediation(remediation("backup_short_retention"))
            .evidence("shortRules", short_rules)
            .evidence("minimumDays", MIN_RETENTION_DAYS)
            .build();
        Ok(Some(finding))
    }
}

impl Default for AwsBackupScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for AwsBackupScanner {
    fn service_name(&self) -> &'static str {
        "aws_backup"
    }

    fn category(&self) -> ScannerCategory {
        ScannerCategory::BackupRecovery
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<(Vec<Finding>, usize)> {
        let api = ctx.aws_api()?;
        info!(
            "[Backup] Starting scan across {} region(s)",
            ctx.regions.len()
        );

        let mut findings = Vec::new();
        let mut checks_run = 0;
        let mut failed_regions = 0;
        let mut last_error = None;

        for region in &ctx.regions {
            match self.scan_region(ctx, &api, region).await {
                Ok((mut region_findings, region_checks)) => {
                    findings.append(&mut region_findings);
                    checks_run += region_checks;
                }
                Err(e) => {
                    warn!("[Backup] Region {} failed, continuing: {:#}", region, e);
                    failed_regions += 1;
                    last_error = Some(e);
                }
            }
        }

        if failed_regions == ctx.regions.len() {
            if let Some(e) = last_error {
                return Err(e.context("Backup scan failed in every region"));
            }
        }

        info!(
            "[Backup] Scan complete: {} findings from {} checks",
            findings.len(),
            checks_run
        );
        Ok((findings, checks_run))
    }
}

fn remediation(scan_type: &str) -> Remediation {
    match scan_type {
        "backup_no_vaults" => Remediation {
            description: "Create an encrypted backup vault in the region".to_string(),
            steps: vec![
                "Create a vault with a customer-managed KMS key".to_string(),
                "Apply a vault access policy denying recovery point deletion".to_string(),
            ],
            cli_command: Some(
                "aws backup create-backup-vault --backup-vault-name <name> --encryption-key-arn <key-arn>"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "backup_no_plans" => Remediation {
            description: "Create a backup plan covering regional workloads".to_string(),
            steps: vec![
                "Define a plan with daily and weekly rules".to_string(),
                "Assign resources by tag so new workloads are covered automatically".to_string(),
            ],
            cli_command: Some(
                "aws backup create-backup-plan --backup-plan file://plan.json".to_string(),
            ),
            effort: RemediationEffort::Medium,
            automatable: true,
        },
        "backup_vault_not_encrypted" => Remediation {
            description: "Move recovery points to a KMS-encrypted vault".to_string(),
            steps: vec![
                "Create a new vault with a customer-managed key".to_string(),
                "Repoint plan rules at the new vault and copy existing recovery points".to_string(),
            ],
            cli_command: Some(
                "aws backup describe-backup-vault --backup-vault-name <name>".to_string(),
            ),
            effort: RemediationEffort::Medium,
            automatable: false,
        },
        "backup_short_retention" => Remediation {
            description: "Raise rule retention to the policy floor".to_string(),
            steps: vec![
                "Update plan rules to retain recovery points at least 7 days".to_string(),
                "Add a monthly rule with longer retention for compliance data".to_string(),
            ],
            cli_command: Some(
                "aws backup update-backup-plan --backup-plan-id <id> --backup-plan file://plan.json"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        _ => Remediation {
            description: "Review backup coverage for the region".to_string(),
            steps: vec!["Audit vaults, plans and restore testing cadence".to_string()],
            cli_command: None,
            effort: RemediationEffort::Medium,
            automatable: false,
        },
    }
}
