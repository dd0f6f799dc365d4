//! Rate limiter integration tests: window roll-over, blocking behavior,
//! and concurrent access.

use firin_core::ratelimit::{MemoryCounterStore, RateLimitPolicy, RateLimiter};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

fn limiter_with(policies: HashMap<String, RateLimitPolicy>) -> RateLimiter {
    RateLimiter::new(
        Arc::new(MemoryCounterStore::new()),
        policies,
        RateLimitPolicy::new(100, 60, 300),
    )
}

#[tokio::test]
async fn test_check_never_increments() {
    let limiter = limiter_with(HashMap::new());

    for _ in 0..20 {
        let status = limiter.check("api", "1.1.1.1").await.unwrap();
        assert!(status.allowed);
        assert_eq!(status.remaining, 100, "check must be read-only");
    }
}

#[tokio::test]
async fn test_configured_action_thresholds() {
    let mut policies = HashMap::new();
    policies.insert("login".to_string(), RateLimitPolicy::new(5, 60, 300));
    policies.insert("contact".to_string(), RateLimitPolicy::new(3, 60, 300));
    let limiter = limiter_with(policies);

    for i in 0..5 {
        assert!(
            limiter.hit("login", "2.2.2.2").await.unwrap().allowed,
            "login hit {i} within threshold"
        );
    }
    assert!(!limiter.hit("login", "2.2.2.2").await.unwrap().allowed);

    for i in 0..3 {
        assert!(
            limiter.hit("contact", "2.2.2.2").await.unwrap().allowed,
            "contact hit {i} within threshold"
        );
    }
    assert!(!limiter.hit("contact", "2.2.2.2").await.unwrap().allowed);
}

#[tokio::test]
async fn test_block_outlasts_window() {
    // 2 hits per 1s window, 3s block: after tripping the block, waiting out
    // the window is not enough.
    let mut policies = HashMap::new();
    policies.insert("login".to_string(), RateLimitPolicy::new(2, 1, 3));
    let limiter = limiter_with(policies);

    assert!(limiter.hit("login", "3.3.3.3").await.unwrap().allowed);
    assert!(limiter.hit("login", "3.3.3.3").await.unwrap().allowed);
    let tripped = limiter.hit("login", "3.3.3.3").await.unwrap();
    assert!(!tripped.allowed);

    // Window (1s) has passed, block (3s) has not.
    sleep(Duration::from_millis(1300)).await;
    let still_blocked = limiter.check("login", "3.3.3.3").await.unwrap();
    assert!(!still_blocked.allowed, "block must outlive the window");
    assert!(still_blocked.retry_after.is_some_and(|s| s >= 1));

    // After the block expires the client starts fresh.
    sleep(Duration::from_millis(2000)).await;
    assert!(limiter.hit("login", "3.3.3.3").await.unwrap().allowed);
}

#[tokio::test]
async fn test_retry_after_counts_down_to_reset() {
    let mut policies = HashMap::new();
    policies.insert("login".to_string(), RateLimitPolicy::new(1, 60, 120));
    let limiter = limiter_with(policies);

    let _ = limiter.hit("login", "4.4.4.4").await.unwrap();
    let denied = limiter.hit("login", "4.4.4.4").await.unwrap();

    assert!(!denied.allowed);
    let retry_after = denied.retry_after.unwrap();
    assert!(retry_after >= 115 && retry_after <= 120, "retry_after {retry_after} tracks the block");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_hits_single_atomic_slot() {
    // 1 allowed hit, 8 concurrent attempts: exactly one may win.
    let mut policies = HashMap::new();
    policies.insert("login".to_string(), RateLimitPolicy::new(1, 60, 300));
    let limiter = Arc::new(limiter_with(policies));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let limiter = Arc::clone(&limiter);
        handles.push(tokio::spawn(async move {
            limiter.hit("login", "5.5.5.5").await.unwrap().allowed
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.expect("task should not panic") {
            winners += 1;
        }
    }

    assert_eq!(winners, 1, "exactly one concurrent hit may take the last slot");
}

#[tokio::test]
async fn test_unconfigured_action_uses_default_policy() {
    let limiter = limiter_with(HashMap::new());

    let status = limiter.hit("yeni-aksiyon", "6.6.6.6").await.unwrap();
    assert_eq!(status.limit, 100);
    assert_eq!(status.remaining, 99);
}
