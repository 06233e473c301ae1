// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Orchestrator Flow Tests
 * Full scan sessions: selection, error isolation, report envelope
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use super::fixtures::{
    aws_session, azure_session, finding, hardened_aws_api, named, DeniedS3Api, FixtureAzureApi,
};
use chrono::DateTime;
use vartija_engine::provider::azure::{
    AppServiceSite, AzureVirtualMachine, DirectoryPosture, KeyVaultProperties,
    StorageAccountDetail,
};
use vartija_engine::{CloudProvider, ScanSelection, ScanStatus, Severity};

#[tokio::test]
async fn test_denied_service_does_not_sink_the_session() {
    let (orchestrator, ctx) = aws_session(DeniedS3Api, &["eu-west-1"]);

    let report = orchestrator
        .run_scan(ctx, named(&["aws_s3", "aws_guardduty"]))
        .await
        .unwrap();

    assert_eq!(report.status, ScanStatus::CompletedWithErrors);

    assert_eq!(report.errors.len(), 1);
    let failure = &report.errors[0];
    assert_eq!(failure.scanner, "aws_s3");
    assert!(!failure.recoverable);
    assert!(!failure.timed_out);

    // The blocked scanner did not take GuardDuty down with it
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].scan_type, "guardduty_not_enabled");
}

#[tokio::test]
async fn test_hardened_account_produces_clean_report() {
    let (orchestrator, ctx) = aws_session(hardened_aws_api(), &["eu-west-1"]);

    let report = orchestrator
        .run_scan(ctx, ScanSelection::Default)
        .await
        .unwrap();

    assert_eq!(report.status, ScanStatus::Completed);
    assert!(
        report.findings.is_empty(),
        "unexpected: {:?}",
        report.findings
    );
    assert!(report.errors.is_empty());
    assert_eq!(report.resources_scanned, 0);
    assert!(report.checks_executed >= 40);
    assert!(report.findings_by_service.is_empty());

    assert_eq!(report.provider, CloudProvider::Aws);
    assert_eq!(report.account_id, "123456789012");
    assert_eq!(report.regions, vec!["eu-west-1".to_string()]);
    assert!(DateTime::parse_from_rfc3339(&report.started_at).is_ok());
    assert!(DateTime::parse_from_rfc3339(&report.completed_at).is_ok());
}

#[tokio::test]
async fn test_default_azure_surface_is_flagged() {
    let api = FixtureAzureApi {
        key_vaults: vec![KeyVaultProperties {
            name: "kv-vartija-prod".to_string(),
            id: "/subscriptions/s1/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/kv-vartija-prod".to_string(),
            location: "westeurope".to_string(),
            resource_group: "rg".to_string(),
            ..Default::default()
        }],
        storage_accounts: vec![StorageAccountDetail {
            name: "stvartijaprod001".to_string(),
            id: "/subscriptions/s1/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/stvartijaprod001".to_string(),
            location: "westeurope".to_string(),
            resource_group: "rg".to_string(),
            ..Default::default()
        }],
        virtual_machines: vec![AzureVirtualMachine {
            name: "vm-worker-01".to_string(),
            id: "/subscriptions/s1/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm-worker-01".to_string(),
            location: "northeurope".to_string(),
            resource_group: "rg".to_string(),
            ..Default::default()
        }],
        app_services: vec![AppServiceSite {
            name: "app-portal-prod".to_string(),
            id: "/subscriptions/s1/resourceGroups/rg/providers/Microsoft.Web/sites/app-portal-prod".to_string(),
            location: "westeurope".to_string(),
            resource_group: "rg".to_string(),
            ..Default::default()
        }],
        directory: DirectoryPosture::default(),
    };
    let (orchestrator, ctx) = azure_session(api, &["westeurope", "northeurope"]);

    let report = orchestrator
        .run_scan(ctx, ScanSelection::Default)
        .await
        .unwrap();

    assert_eq!(report.status, ScanStatus::Completed);
    assert_eq!(report.provider, CloudProvider::Azure);

    // Freshly created resources with no explicit settings inherit the
    // permissive platform defaults; most of those settings are findings.
    assert_eq!(report.findings_by_service.get("azure_keyvault"), Some(&4));
    assert_eq!(report.findings_by_service.get("azure_storage"), Some(&2));
    assert_eq!(report.findings_by_service.get("azure_vm"), Some(&3));
    assert_eq!(report.findings_by_service.get("azure_appservice"), Some(&2));
    assert_eq!(report.findings_by_service.get("azure_entra"), None);
    assert_eq!(report.findings.len(), 11);
    assert_eq!(report.resources_scanned, 4);

    // Region scope comes from each resource's own location
    let vault = finding(&report.findings, "keyvault_soft_delete_disabled");
    assert_eq!(vault.region, "westeurope");
    let vm = finding(&report.findings, "vm_no_disk_encryption");
    assert_eq!(vm.region, "northeurope");

    let blob = finding(&report.findings, "storage_public_blob_access");
    assert_eq!(blob.severity, Severity::Critical);
    assert_eq!(blob.resource_id, "stvartijaprod001");
}
