//! Token service integration tests: lifecycle across service instances and
//! blacklist stores.

use firin_core::token::{MemoryTokenBlacklist, TokenBlacklist, TokenError, TokenService};
use std::sync::Arc;

fn service_with(blacklist: Arc<dyn TokenBlacklist>) -> TokenService {
    TokenService::new("integration-secret", 3600, blacklist).unwrap()
}

#[tokio::test]
async fn test_shared_blacklist_across_service_instances() {
    // Two workers sharing one blacklist store: logout on one invalidates
    // the token for the other.
    let blacklist: Arc<dyn TokenBlacklist> = Arc::new(MemoryTokenBlacklist::new());
    let worker_a = service_with(blacklist.clone());
    let worker_b = service_with(blacklist);

    let issued = worker_a.issue(1, "ayse", "admin", vec![]);
    assert!(worker_b.verify(&issued.token).await.is_ok());

    worker_a.invalidate(&issued.token).await.unwrap();

    assert!(matches!(
        worker_b.verify(&issued.token).await,
        Err(TokenError::Revoked)
    ));
}

#[tokio::test]
async fn test_invalidation_is_per_token_not_per_user() {
    let service = service_with(Arc::new(MemoryTokenBlacklist::new()));

    let first = service.issue(1, "ayse", "admin", vec![]);
    let second = service.issue(1, "ayse", "admin", vec![]);

    service.invalidate(&first.token).await.unwrap();

    assert!(matches!(service.verify(&first.token).await, Err(TokenError::Revoked)));
    assert!(service.verify(&second.token).await.is_ok(), "other sessions stay live");
}

#[tokio::test]
async fn test_purge_does_not_resurrect_live_tokens() {
    let blacklist = Arc::new(MemoryTokenBlacklist::new());
    let service = service_with(blacklist.clone());

    let issued = service.issue(1, "ayse", "admin", vec![]);
    service.invalidate(&issued.token).await.unwrap();

    // The token has an hour to live; purging expired entries must not drop
    // its blacklist record.
    let removed = blacklist.purge_expired().await.unwrap();
    assert_eq!(removed, 0);
    assert!(matches!(service.verify(&issued.token).await, Err(TokenError::Revoked)));
}

#[tokio::test]
async fn test_scopes_travel_with_the_token() {
    let service = service_with(Arc::new(MemoryTokenBlacklist::new()));

    let issued = service.issue(
        2,
        "mehmet",
        "editor",
        vec!["orders:read".to_string(), "products:write".to_string()],
    );

    let claims = service.verify(&issued.token).await.unwrap();
    assert!(claims.has_scope("orders:read"));
    assert!(claims.has_scope("products:write"));
    assert!(!claims.has_scope("orders:write"));
}

#[tokio::test]
async fn test_double_invalidate_is_harmless() {
    let service = service_with(Arc::new(MemoryTokenBlacklist::new()));
    let issued = service.issue(1, "ayse", "admin", vec![]);

    service.invalidate(&issued.token).await.unwrap();
    service.invalidate(&issued.token).await.unwrap();

    assert!(matches!(service.verify(&issued.token).await, Err(TokenError::Revoked)));
}
