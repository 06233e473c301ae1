// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scan Scenario Tests
 * Representative account states driven end to end through the orchestrator
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use super::fixtures::{aws_session, exposed_bucket, finding, named, FixtureAwsApi};
use std::collections::{HashMap, HashSet};
use vartija_engine::provider::aws::{Ec2Inventory, IngressRule, SecurityGroup};
use vartija_engine::{ScanStatus, Severity};

#[tokio::test]
async fn test_exposed_bucket_reports_encryption_and_access_block() {
    let (summary, detail) = exposed_bucket("raw-telemetry");
    let api = FixtureAwsApi {
        buckets: vec![summary],
        bucket_details: HashMap::from([("raw-telemetry".to_string(), detail)]),
        ..Default::default()
    };
    let (orchestrator, ctx) = aws_session(api, &["eu-west-1"]);

    let report = orchestrator.run_scan(ctx, named(&["aws_s3"])).await.unwrap();

    assert_eq!(report.status, ScanStatus::Completed);
    assert_eq!(report.findings.len(), 2);

    let encryption = finding(&report.findings, "s3_no_encryption");
    assert_eq!(encryption.severity, Severity::High);
    assert_eq!(encryption.resource_id, "raw-telemetry");
    assert!(!encryption.compliance.is_empty());

    let access_block = finding(&report.findings, "s3_no_public_access_block");
    assert_eq!(access_block.severity, Severity::Critical);
    assert_eq!(access_block.resource_id, "raw-telemetry");

    // Same resource, distinct identities, no duplicates
    let identities: HashSet<_> = report.findings.iter().map(|f| f.identity()).collect();
    assert_eq!(identities.len(), report.findings.len());
    assert_eq!(report.resources_scanned, 1);
}

#[tokio::test]
async fn test_region_without_guardduty_yields_one_aggregate_finding() {
    let (orchestrator, ctx) = aws_session(FixtureAwsApi::default(), &["eu-north-1"]);

    let report = orchestrator
        .run_scan(ctx, named(&["aws_guardduty"]))
        .await
        .unwrap();

    assert_eq!(report.status, ScanStatus::Completed);
    assert_eq!(report.findings.len(), 1);

    let coverage = &report.findings[0];
    assert_eq!(coverage.scan_type, "guardduty_not_enabled");
    assert_eq!(coverage.resource_id, "eu-north-1");
    assert_eq!(coverage.severity, Severity::High);
    assert_eq!(coverage.evidence["detectorCount"], 0);

    assert_eq!(report.checks_executed, 1);
    assert_eq!(report.findings_by_service.get("aws_guardduty"), Some(&1));
}

#[tokio::test]
async fn test_rescan_reports_identical_finding_identities() {
    let (summary, detail) = exposed_bucket("raw-telemetry");
    let api = FixtureAwsApi {
        buckets: vec![summary],
        bucket_details: HashMap::from([("raw-telemetry".to_string(), detail)]),
        ec2: Ec2Inventory {
            security_groups: vec![SecurityGroup {
                group_id: "sg-02".to_string(),
                group_name: "legacy-admin".to_string(),
                ingress_rules: vec![IngressRule {
                    from_port: Some(22),
                    to_port: Some(22),
                    protocol: "tcp".to_string(),
                    cidr_blocks: vec!["0.0.0.0/0".to_string()],
                }],
            }],
            ..Default::default()
        },
        ..Default::default()
    };
    let selection = named(&["aws_s3", "aws_guardduty", "aws_ec2"]);

    let mut identity_sets = Vec::new();
    for _ in 0..2 {
        let (orchestrator, ctx) = aws_session(api.clone(), &["eu-west-1"]);
        let report = orchestrator.run_scan(ctx, selection.clone()).await.unwrap();
        assert_eq!(report.status, ScanStatus::Completed);

        let mut identities: Vec<(String, String)> = report
            .findings
            .iter()
            .map(|f| (f.resource_id.clone(), f.scan_type.clone()))
            .collect();
        identities.sort();
        identity_sets.push(identities);
    }

    assert_eq!(identity_sets[0], identity_sets[1]);
    assert!(identity_sets[0]
        .iter()
        .any(|(_, scan_type)| scan_type == "ec2_open_security_group"));
    assert!(identity_sets[0]
        .iter()
        .any(|(_, scan_type)| scan_type == "guardduty_not_enabled"));
}
