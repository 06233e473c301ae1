// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - AWS EC2 Posture Scanner
 * Instance, security group and EBS volume checks
 *
 * Detects:
 * - Security groups exposing admin ports to the internet
 * - Instances still accepting IMDSv1 metadata requests
 * - Unencrypted EBS volumes
 * - Instances without an IAM instance profile
 * - Instances with public IP addresses
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use crate::context::ScanContext;
use crate::provider::aws::{AwsApi, EbsVolume, Ec2Instance, Ec2Inventory, SecurityGroup};
use crate::scanner::{isolate, FindingBuilder, Scanner, ScannerCategory};
use crate::types::{Finding, Remediation, RemediationEffort, RiskVector, Severity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Ports treated as administrative when exposed to 0.0.0.0/0
const ADMIN_PORTS: [i32; 2] = [22, 3389];

pub struct AwsEc2Scanner;

impl AwsEc2Scanner {
    pub fn new() -> Self {
        Self
    }

    async fn fetch_inventory(
        &self,
        ctx: &ScanContext,
        api: &Arc<dyn AwsApi>,
        region: &str,
    ) -> Result<Ec2Inventory> {
        let key = ctx.cache_key(&format!("ec2:inventory:{}", region));
        let inventory = ctx
            .cache
            .get_or_fetch(&key, || async {
                ctx.rate_limiter
                    .execute("ec2.get_inventory", || api.get_ec2_inventory(region))
                    .await
            })
            .await
            .context("Failed to describe EC2 inventory")?;
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
            "[EC2] {}: {} instances, {} security groups, {} volumes",
            region,
            inventory.instances.len(),
            inventory.security_groups.len(),
            inventory.volumes.len()
        );

        let mut findings = Vec::new();
        let mut checks_run = 0;

        for group in &inventory.security_groups {
            // Check admin port exposure
            checks_run += 1;
            if let Some(f) = isolate(
                "ec2.security_group",
                self.check_open_security_group(ctx, region, group),
            )
            .flatten()
            {
                findings.push(f);
            }
        }

        for instance in &inventory.instances {
            if instance.state == "terminated" {
                debug!("[EC2] Skipping terminated instance {}", instance.instance_id);
                continue;
            }

            // Check IMDS token enforcement
            checks_run += 1;
            if let Some(f) =
                isolate("ec2.imds", self.check_imdsv1(ctx, region, instance)).flatten()
            {
                findings.push(f);
            }

            // Check instance profile attachment
            checks_run += 1;
            if let Some(f) = isolate(
                "ec2.instance_profile",
                self.check_instance_profile(ctx, region, instance),
            )
            .flatten()
            {
                findings.push(f);
            }

            // Check public IP assignment
            checks_run += 1;
            if let Some(f) =
                isolate("ec2.public_ip", self.check_public_ip(ctx, region, instance)).flatten()
            {
                findings.push(f);
            }
        }

        for volume in &inventory.volumes {
            // Check volume encryption
            checks_run += 1;
            if let Some(f) = isolate(
                "ec2.ebs_encryption",
                self.check_volume_encryption(ctx, region, volume),
            )
            .flatten()
            {
                findings.push(f);
            }
        }

        Ok((findings, checks_run))
    }

    fn check_open_security_group(
        &self,
        ctx: &ScanContext,
        region: &str,
        group: &SecurityGroup,
    ) -> Result<Option<Finding>> {
        let open_ports: Vec<i32> = ADMIN_PORTS
            .iter()
            .copied()
            .filter(|port| group.ingress_rules.iter().any(|rule| rule.open_to_world(*port)))
            .collect();
        if open_ports.is_empty() {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "ec2_open_security_group")
            .resource(
                &group.group_id,
                &security_group_arn(ctx, region, &group.group_id),
            )
            .severity(Severity::Critical)
            .risk_vector(RiskVector::PublicExposure)
            .title("Security group exposes admin ports to the internet")
            .description(format!(
                "Security group '{}' ({}) allows 0.0.0.0/0 ingress on port(s) {:?}",
                group.group_name, group.group_id, open_ports
            ))
            .analysis(
                "SSH and RDP open to the whole internet are the single most common \
                 entry point for brute-force and credential-stuffing attacks. Every \
                 instance attached to this group inherits the exposure.",
            )
            .remediation(remediation("ec2_open_security_group"))
            .evidence("groupName", &group.group_name)
            .evidence("openPorts", &open_ports)
            .build();
        Ok(Some(finding))
    }

    fn check_imdsv1(
        &self,
        ctx: &ScanContext,
        region: &str,
        instance: &Ec2Instance,
    ) -> Result<Option<Finding>> {
        if instance.metadata_http_tokens.as_deref() == Some("required") {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "ec2_imdsv1_enabled")
            .resource(
                &instance.instance_id,
                &instance_arn(ctx, region, &instance.instance_id),
            )
            .severity(Severity::High)
            .risk_vector(RiskVector::CredentialExposure)
            .title("Instance metadata service accepts IMDSv1")
            .description(format!(
                "Instance {} does not require session tokens for metadata requests",
                instance.instance_id
            ))
            .analysis(
                "IMDSv1 responds to plain GET requests, so any SSRF or request-forgery \
                 bug in software on the instance can be turned into stolen IAM role \
                 credentials. IMDSv2 session tokens close that path.",
            )
            .remediation(remediation("ec2_imdsv1_enabled"))
            .evidence("httpTokens", &instance.metadata_http_tokens)
            .evidence("state", &instance.state)
            .build();
        Ok(Some(finding))
    }

    fn check_instance_profile(
        &self,
        ctx: &ScanContext,
        region: &str,
        instance: &Ec2Instance,
    ) -> Result<Option<Finding>> {
        if instance.iam_instance_profile.is_some() {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "ec2_no_instance_profile")
            .resource(
                &instance.instance_id,
                &instance_arn(ctx, region, &instance.instance_id),
            )
            .severity(Severity::Medium)
            .risk_vector(RiskVector::CredentialExposure)
            .title("Instance has no IAM instance profile")
            .description(format!(
                "Instance {} runs without an attached instance profile",
                instance.instance_id
            ))
            .analysis(
                "Workloads on this instance cannot obtain temporary credentials from \
                 the instance role, which in practice means long-lived access keys end \
                 up on disk or in environment variables.",
            )
            .remediation(remediation("ec2_no_instance_profile"))
            .evidence("state", &instance.state)
            .build();
        Ok(Some(finding))
    }

    fn check_public_ip(
        &self,
        ctx: &ScanContext,
        region: &str,
        instance: &Ec2Instance,
    ) -> Result<Option<Finding>> {
        let public_ip = match &instance.public_ip {
            Some(ip) => ip,
            None => return Ok(None),
        };

        let finding = FindingBuilder::new(ctx, region, "ec2_public_ip")
            .resource(
                &instance.instance_id,
                &instance_arn(ctx, region, &instance.instance_id),
            )
            .severity(Severity::Medium)
            .risk_vector(RiskVector::PublicExposure)
            .title("Instance holds a public IP address")
            .description(format!(
                "Instance {} is directly addressable at {}",
                instance.instance_id, public_ip
            ))
            .analysis(
                "A public address puts the instance's attack surface on the open \
                 internet instead of behind a load balancer or NAT gateway. Combined \
                 with a permissive security group this becomes a direct entry point.",
            )
            .remediation(remediation("ec2_public_ip"))
            .evidence("publicIp", public_ip)
            .evidence("securityGroupIds", &instance.security_group_ids)
            .build();
        Ok(Some(finding))
    }

    fn check_volume_encryption(
        &self,
        ctx: &ScanContext,
        region: &str,
        volume: &EbsVolume,
    ) -> Result<Option<Finding>> {
        if volume.encrypted {
            return Ok(None);
        }

        let finding = FindingBuilder::new(ctx, region, "ec2_unencrypted_ebs")
            .resource(&volume.volume_id, &volume_arn(ctx, region, &volume.volume_id))
            .severity(Severity::High)
            .risk_vector(RiskVector::DataExposure)
            .title("EBS volume is not encrypted")
            .description(format!(
                "Volume {} stores data without encryption at rest",
                volume.volume_id
            ))
            .analysis(
                "Snapshots of unencrypted volumes are themselves unencrypted and can \
                 be shared or copied across accounts, so a single misconfigured \
                 snapshot permission leaks the full disk contents.",
            )
            .remediation(remediation("ec2_unencrypted_ebs"))
            .evidence("attachedInstance", &volume.attached_instance)
            .build();
        Ok(Some(finding))
    }
}

impl Default for AwsEc2Scanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for AwsEc2Scanner {
    fn service_name(&self) -> &'static str {
        "aws_ec2"
    }

    fn category(&self) -> ScannerCategory {
        ScannerCategory::Compute
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<(Vec<Finding>, usize)> {
        let api = ctx.aws_api()?;
        info!("[EC2] Starting scan across {} region(s)", ctx.regions.len());

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
                    warn!("[EC2] Region {} failed, continuing: {:#}", region, e);
                    failed_regions += 1;
                    last_error = Some(e);
                }
            }
        }

        if failed_regions == ctx.regions.len() {
            if let Some(e) = last_error {
                return Err(e.context("EC2 scan failed in every region"));
            }
        }

        info!(
            "[EC2] Scan complete: {} findings from {} checks",
            findings.len(),
            checks_run
        );
        Ok((findings, checks_run))
    }
}

fn security_group_arn(ctx: &ScanContext, region: &str, group_id: &str) -> String {
    format!(
        "arn:aws:ec2:{}:{}:security-group/{}",
        region, ctx.account_id, group_id
    )
}

fn instance_arn(ctx: &ScanContext, region: &str, instance_id: &str) -> String {
    format!(
        "arn:aws:ec2:{}:{}:instance/{}",
        region, ctx.account_id, instance_id
    )
}

fn volume_arn(ctx: &ScanContext, region: &str, volume_id: &str) -> String {
    format!(
        "arn:aws:ec2:{}:{}:volume/{}",
        region, ctx.account_id, volume_id
    )
}

fn remediation(scan_type: &str) -> Remediation {
    match scan_type {
        "ec2_open_security_group" => Remediation {
            description: "Close admin ports to the internet".to_string(),
            steps: vec![
                "Remove the 0.0.0.0/0 and ::/0 ingress rules for ports 22 and 3389".to_string(),
                "Use SSM Session Manager or a bastion with allow-listed CIDRs instead".to_string(),
            ],
            cli_command: Some(
                "aws ec2 revoke-security-group-ingress --group-id <group-id> --protocol tcp --port 22 --cidr 0.0.0.0/0"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "ec2_imdsv1_enabled" => Remediation {
            description: "Require IMDSv2 session tokens".to_string(),
            steps: vec![
                "Set HttpTokens to required on the instance metadata options".to_string(),
                "Verify workloads use SDK versions that speak IMDSv2".to_string(),
            ],
            cli_command: Some(
                "aws ec2 modify-instance-metadata-options --instance-id <instance-id> --http-tokens required"
                    .to_string(),
            ),
            effort: RemediationEffort::Low,
            automatable: true,
        },
        "ec2_unencrypted_ebs" => Remediation {
            description: "Encrypt the volume".to_string(),
            steps: vec![
                "Snapshot the volume and copy the snapshot with encryption enabled".to_string(),
                "Create an encrypted volume from the copy and swap the attachment".to_string(),
                "Enable EBS encryption by default for the region".to_string(),
            ],
            cli_command: Some("aws ec2 enable-ebs-encryption-by-default".to_string()),
            effort: RemediationEffort::Medium,
            automatable: true,
        },
        "ec2_no_instance_profile" => Remediation {
            description: "Attach an IAM instance profile".to_string(),
            steps: vec![
                "Create a role scoped to what the workload needs".to_string(),
                "Associate the instance profile with the instance".to_string(),
                "Remove any static access keys from the instance".to_string(),
            ],
            cli_command: Some(
                "aws ec2 associate-iam-instance-profile --instance-id <instance-id> --iam-instance-profile Name=<profile>"
                    .to_string(),
            ),
            effort: RemediationEffort::Medium,
            automatable: true,
        },
        "ec2_public_ip" => Remediation {
            description: "Move the instance behind private networking".to_string(),
            steps: vec![
                "Place the instance in a private subnet".to_string(),
                "Front inbound traffic with a load balancer, outbound with a NAT gateway".to_string(),
            ],
            cli_command: None,
            effort: RemediationEffort::Medium,
            automatable: false,
        },
        _ => Remediation {
            description: "Review the instance against the EC2 hardening guide".to_string(),
            steps: vec!["Compare settings with CIS AWS Foundations section 5".to_string()],
            cli_command: None,
            effort: RemediationEffort::Medium,
            automatable: false,
        },
    }
}
