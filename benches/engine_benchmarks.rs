// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Vartija Engine - Performance Benchmarks
//! © 2026 Bountyy Oy
//!
//! Benchmarks for the per-session hot paths: cache admission, rate limiter
//! bookkeeping, compliance catalog lookups and report serialization

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeMap;
use std::convert::Infallible;
use tokio::runtime::Runtime;
use vartija_engine::compliance;
use vartija_engine::errors::ProviderError;
use vartija_engine::types::{RiskVector, ScanStatus};
use vartija_engine::{CloudProvider, EngineConfig, Finding, ScanReport, Severity};

// Benchmark the warm-cache read path every scanner takes after the first
// fetch of a shared inventory
fn benchmark_cache_hit(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let cache = EngineConfig::default().build_cache();

    rt.block_on(async {
        cache
            .get_or_fetch("bench:warm", || async {
                Ok::<_, Infallible>(vec![0u8; 4096])
            })
            .await
            .unwrap();
    });

    c.bench_function("cache_hit", |b| {
        b.to_async(&rt).iter(|| async {
            let value = cache
                .get_or_fetch("bench:warm", || async { Ok::<_, Infallible>(Vec::<u8>::new()) })
                .await
                .unwrap();
            black_box(value);
        })
    });
}

// Benchmark sliding-window admission with a window wide enough that no
// iteration ever waits
fn benchmark_rate_limiter_admission(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut config = EngineConfig::default();
    config.rate_limit.requests_per_second = 1_000_000;
    let limiter = config.build_rate_limiter();

    c.bench_function("rate_limiter_admission", |b| {
        b.to_async(&rt).iter(|| async {
            let value = limiter
                .execute("bench.noop", || async { Ok::<_, ProviderError>(42u64) })
                .await
                .unwrap();
            black_box(value);
        })
    });
}

// Benchmark compliance catalog lookups across frameworks
fn benchmark_compliance_lookup(c: &mut Criterion) {
    let scan_types = [
        "s3_no_encryption",
        "ec2_open_security_group",
        "entra_mfa_not_enforced",
        "keyvault_soft_delete_disabled",
    ];

    let mut group = c.benchmark_group("compliance_lookup");
    for scan_type in scan_types {
        group.bench_with_input(
            BenchmarkId::from_parameter(scan_type),
            &scan_type,
            |b, scan_type| {
                b.iter(|| {
                    let refs = compliance::for_scan_type(black_box(scan_type));
                    black_box(refs);
                })
            },
        );
    }
    group.finish();
}

fn sample_report(finding_count: usize) -> ScanReport {
    let findings = (0..finding_count)
        .map(|i| Finding {
            resource_id: format!("bucket-{}", i),
            resource_arn: format!("arn:aws:s3:::bucket-{}", i),
            scan_type: "s3_no_encryption".to_string(),
            severity: Severity::High,
            risk_vector: RiskVector::DataExposure,
            title: "S3 bucket without default encryption".to_string(),
            description: format!("Bucket 'bucket-{}' has no default encryption", i),
            analysis: "Objects land in plaintext storage.".to_string(),
            remediation: None,
            compliance: compliance::for_scan_type("s3_no_encryption"),
            evidence: BTreeMap::from([(
                "encryptionConfigured".to_string(),
                serde_json::Value::Bool(false),
            )]),
            region: "eu-west-1".to_string(),
            account_id: "123456789012".to_string(),
        })
        .collect();

    ScanReport {
        scan_id: "bench".to_string(),
        provider: CloudProvider::Aws,
        account_id: "123456789012".to_string(),
        regions: vec!["eu-west-1".to_string()],
        status: ScanStatus::Completed,
        findings,
        errors: Vec::new(),
        resources_scanned: finding_count as u64,
        checks_executed: (finding_count * 6) as u64,
        findings_by_service: BTreeMap::from([("aws_s3".to_string(), finding_count as u64)]),
        started_at: "2026-01-01T00:00:00Z".to_string(),
        completed_at: "2026-01-01T00:01:00Z".to_string(),
        duration_ms: 60_000,
    }
}

// Benchmark full report serialization at typical finding volumes
fn benchmark_report_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("report_serialization");
    for count in [10usize, 100, 500] {
        let report = sample_report(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &report, |b, report| {
            b.iter(|| {
                let json = serde_json::to_string(black_box(report)).unwrap();
                black_box(json);
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_cache_hit,
    benchmark_rate_limiter_admission,
    benchmark_compliance_lookup,
    benchmark_report_serialization
);
criterion_main!(benches);
