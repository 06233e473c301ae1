// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Azure Virtual Machine Posture Scanner
 * VM disk, network and identity checks
 *
 * Detects:
 * - OS disks without encryption
 * - NICs without a network security group
 * - VMs with public IP addresses
 * - VMs without a managed identity
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use crate::context::ScanContext;
use crate::provider::azure::{AzureApi, AzureVirtualMachine};
use crate::scanner::{isolate, FindingBuilder, Scanner, ScannerCategory};
use crate::types::{Finding, Remediation, RemediationEffort, RiskVector, Severity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

pub struct AzureVmScanner;

impl AzureVmScanner {
    pub fn new() -> Self {
        Self
    }

    async fn fetch_machines(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AzureApi>,
    ) -> Result<Vec<AzureVirtualMachine>> {
        let key = ctx.cache_key("vm:machines");
        let machines = ctx
            .cache
            .get_or_fetch(&key, || async {
                ctx.rate_limiter
                    .execute("vm.list", || api.list_virtual_machines(&ctx.account_id))
                    .await
            })
            .await
            .context("Failed to list virtual machines")?;
        Ok(machines)
    }

    fn check_disk_encryption(
        &self,
        ctx: &ScanContext,
        vm: &AzureVirtualMachine,
    ) -> Result<Option<Finding>> {
        if vm.os_disk_encrypted == Some(true) {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, &vm.location, "vm_no_disk_encryption")
            .resource(&vm.name, &vm.id)
            .severity(Severity::High)
            .risk_vector(RiskVector::DataExposure)
            .title("VM OS disk without encryption")
            .description(format!(
                "Virtual machine '{}' runs on an unencrypted OS disk",
                vm.name
            ))
            .analysis(
                "Managed disk snapshots and exported VHDs carry the full disk \
                 contents. Without encryption, anyone who obtains a snapshot reads \
                 the filesystem directly, including cached credentials.",
            )
            .remediation(remediation("vm_no_disk_encryption"))
            .evidence("osDiskEncrypted", &vm.os_disk_encrypted)
            .build();
        Ok(Some(finding))
    }

    fn check_network_security_group(
        &self,
        ctx: &ScanContext,
        vm: &AzureVirtualMachine,
    ) -> Result<Option<Finding>> {
        if vm.network_security_group.is_some() {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, &vm.location, "vm_no_nsg")
            .resource(&vm.name, &vm.id)
            .severity(Severity::High)
            .risk_vector(RiskVector::PublicExposure)
            .title("VM network interface without an NSG")
            .description(format!(
                "Virtual machine '{}' has no network security group on its NIC",
                vm.name
            ))
            .analysis(
                "With no NSG, nothing filters traffic at the interface. Unless a \
                 subnet level group exists, every port the OS listens on is reachable \
                 from wherever routing allows.",
            )
            .remediation(remediation("vm_no_nsg"))
            .evidence("networkSecurityGroup", serde_json::Value::Null)
            .build();
        Ok(Some(finding))
    }

    fn check_public_ip(
        &self,
        ctx: &ScanContext,
        vm: &AzureVirtualMachine,
    ) -> Result<Option<Finding>> {
        let public_ip = match &vm.public_ip {
            Some(ip) => ip,
            None => return Ok(None),
        };

        let finding = FindingBuilder::new(ctx, &vm.location, "vm_public_ip")
            .resource(&vm.name, &vm.id)
            .severity(Severity::Medium)
            .risk_vector(RiskVector::PublicExposure)
            .title("VM holds a public IP address")
            .description(format!(
                "Virtual machine '{}' is directly addressable at {}",
                vm.name, public_ip
            ))
            .analysis(
                "Directly addressable VMs collect constant scanning and brute-force \
                 traffic. Inbound access belongs behind a load balancer, Bastion or \
                 VPN rather than on the machine itself.",
            )
            .remediation(remediation("vm_public_ip"))
            .evidence("publicIp", public_ip)
            .build();
        Ok(Some(finding))
    }

    fn check_managed_identity(
        &self,
        ctx: &ScanContext,
        vm: &AzureVirtualMachine,
    ) -> Result<Option<Finding>> {
        if vm.managed_identity.is_some() {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, &vm.location, "vm_no_managed_identity")
            .resource(&vm.name, &vm.id)
            .severity(Severity::Medium)
            .risk_vector(RiskVector::CredentialExposure)
            .title("VM without a managed identity")
            .description(format!(
                "Virtual machine '{}' has no system or user assigned identity",
                vm.name
            ))
            .analysis(
                "Workloads on the VM must authenticate to Azure services with \
                 service principal secrets stored on disk, which outlive the VM and \
                 leak through images and backups.",
            )
            .remediation(remediation("vm_no_managed_identity"))
            .evidence("managedIdentity", serde_json::Value::Null)
            .build();
        Ok(Some(finding))
    }
}

impl Default for AzureVmScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for AzureVmScanner {
    fn service_name(&self) -> &'static str {
        "azure_vm"
    }

    fn category(&self) -> ScannerCategory {
        ScannerCategory::Compute
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<(Vec<Finding>, usize)> {
        let api = ctx.azure_api()?;
        info!("[VM] Starting scan for subscription {}", ctx.account_id);

        let machines = self.fetch_machines(ctx, &api).await?;
        debug!("[VM] Found {} virtual machines", machines.len());

        let mut findings = Vec::new();
        let mut checks_run = 0;

        for vm in &machines {
            // Check disk encryption
            checks_run += 1;
            if let Some(f) =
                isolate("vm.disk_encryption", self.check_disk_encryption(ctx, vm)).flatten()
            {
                findings.push(f);
            }

            // Check NSG attachment
            checks_run += 1;
            if let Some(f) =
                isolate("vm.nsg", self.check_network_security_group(ctx, vm)).flatten()
            {
                findings.push(f);
            }

            // Check public addressing
            checks_run += 1;
            if let Some(f) = isolate("vm.public_ip", self.check_public_ip(ctx, vm)).flatten() {
                findings.push(f);
            }

            // Check identity assignment
            checks_run += 1;
            if let Some(f) =
                isolate("vm.managed_identity", self.check_managed_identity(ctx, vm)).flatten()
            {
                findings.push(f);
            }
        }

        info!(
            "[VM] Scan complete: {} findings from {} checks",
            findings.len(),
            checks_run
        );
        Ok((findings, checks_run))
    }
}

fn remediation(scan_type: &str) -> Remediation {
    match scan_type {
        "vm_no_disk_encryption" => Remediation {
            description: "Encrypt the OS disk".to_string(),
            steps: vec![
                "Enable encryption at host, or Azure Disk Encryption for in-guest coverage"
                    .to_string(),
                "Snapshot the disk before converting".to_string(),
            ],
            cli_command: Some(
                "az vm encryption enable --name <vm> --resource-group <rg> --disk-encryption-keyvault <vault>"
                    .to_string(),
            ),
            effort: RemediationEffort::Medium,
            automatable: true,
        },
        "vm_no_nsg" => Remediation {
            description: "Attach a network security group".to_string(),
            steps: vec![
                "Create an NSG with deny-by-default inbound rules".to_string(),
                "Associate it with the VM's NIC or subnet".to_string(),
                "Open only the ports the workload serves".to_string(),
            ],
            cli_command: Some(
                "az network nic update --name <nic> --resource-group <rg> --network-security-group <nsg>"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "vm_public_ip" => Remediation {
            description: "Remove the public IP".to_string(),
            steps: vec![
                "Dissociate the public IP from the NIC".to_string(),
                "Use Azure Bastion or VPN for operator access".to_string(),
                "Front inbound service traffic with a load balancer".to_string(),
            ],
            cli_command: Some(
                "az network nic ip-config update --name <ipconfig> --nic-name <nic> --resource-group <rg> --remove publicIpAddress"
                    .to_string(),
            ),
            effort: RemediationEffort::Medium,
            automatable: true,
        },
        "vm_no_managed_identity" => Remediation {
            description: "Assign a managed identity".to_string(),
            steps: vec![
                "Enable a system assigned identity on the VM".to_string(),
                "Grant it roles on the resources the workload consumes".to_string(),
                "Remove service principal secrets from the machine".to_string(),
            ],
            cli_command: Some(
                "az vm identity assign --name <vm> --resource-group <rg>".to_string(),
            ),
            effort: RemediationEffort::Medium,
            automatable: true,
        },
        _ => Remediation {
            description: "Review the VM against the compute security baseline".to_string(),
            steps: vec![
                "Compare settings with the Azure compute security baseline".to_string(),
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

    fn hardened_vm() -> AzureVirtualMachine {
        AzureVirtualMachine {
            name: "vm-prod".to_string(),
            id: "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm-prod"
                .to_string(),
            location: "westeurope".to_string(),
            resource_group: "rg".to_string(),
            os_disk_encrypted: Some(true),
            network_security_group: Some("nsg-prod".to_string()),
            public_ip: None,
            managed_identity: Some("SystemAssigned".to_string()),
        }
    }

    #[tokio::test]
    async fn test_hardened_vm_clean() {
        let mut api = testkit::StaticAzureApi::default();
        api.virtual_machines = vec![hardened_vm()];
        let ctx = testkit::azure_context(api, &["westeurope"]);

        let (findings, checks_run) = AzureVmScanner::new().scan(&ctx).await.unwrap();
        assert!(findings.is_empty());
        assert_eq!(checks_run, 4);
    }

    #[tokio::test]
    async fn test_exposed_vm_flagged_four_ways() {
        let mut api = testkit::StaticAzureApi::default();
        api.virtual_machines = vec![AzureVirtualMachine {
            name: "vm-legacy".to_string(),
            id: "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm-legacy"
                .to_string(),
            location: "northeurope".to_string(),
            resource_group: "rg".to_string(),
            os_disk_encrypted: None,
            network_security_group: None,
            public_ip: Some("203.0.113.50".to_string()),
            managed_identity: None,
        }];
        let ctx = testkit::azure_context(api, &["northeurope"]);

        let (findings, _) = AzureVmScanner::new().scan(&ctx).await.unwrap();
        assert_eq!(findings.len(), 4);
        assert!(findings.iter().all(|f| f.region == "northeurope"));
    }

    #[tokio::test]
    async fn test_public_ip_recorded_in_evidence() {
        let mut api = testkit::StaticAzureApi::default();
        let mut vm = hardened_vm();
        vm.public_ip = Some("203.0.113.51".to_string());
        api.virtual_machines = vec![vm];
        let ctx = testkit::azure_context(api, &["westeurope"]);

        let (findings, _) = AzureVmScanner::new().scan(&ctx).await.unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].evidence["publicIp"], "203.0.113.51");
    }
}
