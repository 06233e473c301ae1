// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Engine Property Tests
 * Cache memoization, eviction, limiter pacing and check isolation exercised
 * through the public crate surface
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use super::fixtures::{aws_session, named, FixtureAwsApi};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use vartija_engine::cache::ResourceCache;
use vartija_engine::errors::ProviderResult;
use vartija_engine::provider::aws::{PublicAccessBlock, S3BucketDetail, S3BucketSummary};
use vartija_engine::rate_limiter::ProviderRateLimiter;
use vartija_engine::ScanStatus;

#[tokio::test]
async fn test_cache_serves_repeat_lookups_from_one_fetch() {
    let cache = ResourceCache::new(Duration::from_secs(300), 100);
    let fetches = Arc::new(AtomicU32::new(0));

    for _ in 0..10 {
        let fetches = Arc::clone(&fetches);
        let inventory: Result<Vec<String>, Infallible> = cache
            .get_or_fetch("ec2:inventory:eu-west-1", || async move {
                fetches.fetch_add(1, Ordering::SeqCst);
                Ok(vec!["i-0abc".to_string()])
            })
            .await;
        assert_eq!(inventory.unwrap(), vec!["i-0abc".to_string()]);
    }

    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats().hits, 9);
}

#[test]
fn test_cache_eviction_holds_the_ceiling() {
    let cache = ResourceCache::new(Duration::from_secs(300), 8);

    for i in 0..9 {
        cache.set(&format!("key-{}", i), serde_json::json!(i));
    }

    assert_eq!(cache.len(), 8);
    assert!(!cache.has("key-0"));
    assert!(cache.has("key-8"));
    assert_eq!(cache.stats().evictions, 1);
}

#[tokio::test]
async fn test_limiter_paces_calls_across_windows() {
    let limiter = ProviderRateLimiter::new(5);
    let started = Instant::now();

    for _ in 0..12 {
        let result: ProviderResult<()> = limiter.execute("noop", || async { Ok(()) }).await;
        result.unwrap();
    }

    // 12 admissions at 5 per second span at least two full windows
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1900), "{:?}", elapsed);
    assert!(elapsed < Duration::from_secs(8), "{:?}", elapsed);
}

#[tokio::test]
async fn test_failing_check_leaves_sibling_checks_intact() {
    let detail = S3BucketDetail {
        name: "mixed-posture".to_string(),
        arn: "arn:aws:s3:::mixed-posture".to_string(),
        encryption: None,
        versioning_enabled: Some(true),
        public_access_block: Some(PublicAccessBlock {
            block_public_acls: true,
            ignore_public_acls: true,
            block_public_policy: true,
            restrict_public_buckets: true,
        }),
        acl_grants: Vec::new(),
        policy_json: Some("{not valid json".to_string()),
        logging_target: Some("central-access-logs".to_string()),
    };
    let api = FixtureAwsApi {
        buckets: vec![S3BucketSummary {
            name: "mixed-posture".to_string(),
            created_at: None,
        }],
        bucket_details: HashMap::from([("mixed-posture".to_string(), detail)]),
        ..Default::default()
    };
    let (orchestrator, ctx) = aws_session(api, &["eu-west-1"]);

    let report = orchestrator.run_scan(ctx, named(&["aws_s3"])).await.unwrap();

    // The unparseable policy kills its own check and nothing else
    assert_eq!(report.status, ScanStatus::Completed);
    assert!(report.errors.is_empty());
    assert_eq!(report.checks_executed, 6);
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].scan_type, "s3_no_encryption");
}
