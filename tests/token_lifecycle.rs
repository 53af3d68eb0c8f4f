//! Token lifecycle properties, exercised against the in-memory store

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use library_catalog::auth::{
    Access, MemoryTokenStore, OwnerId, RotationCoordinator, TokenCodec, TokenError, TokenStatus,
    TokenStore,
};
use library_catalog::configuration::TokenSettings;
use library_catalog::error::{AppError, DatabaseError};

fn settings() -> TokenSettings {
    TokenSettings {
        secret: "lifecycle-test-secret-lifecycle-test".to_string(),
        issuer: "http://library.org".to_string(),
        audience: "http://library.com".to_string(),
        ttl_seconds: 9999,
    }
}

fn setup() -> (MemoryTokenStore, RotationCoordinator) {
    let store = MemoryTokenStore::new();
    let codec = TokenCodec::new(&settings()).expect("valid settings");
    let coordinator = RotationCoordinator::new(codec, Arc::new(store.clone()));
    (store, coordinator)
}

#[tokio::test]
async fn issued_token_validates_to_its_owner() {
    let (_, coordinator) = setup();

    let token = coordinator.issuer().issue(&OwnerId::new("u7")).await.unwrap();
    let owner = coordinator.validator().validate(&token).await.unwrap();

    assert_eq!(owner, OwnerId::new("u7"));
}

#[tokio::test]
async fn rotation_consumes_old_token_and_issues_working_replacement() {
    let (_, coordinator) = setup();
    let t1 = coordinator.issuer().issue(&OwnerId::new("u7")).await.unwrap();

    let rotated = coordinator
        .rotate(&t1, Access::Authenticated, async { Ok::<_, AppError>(()) })
        .await
        .unwrap();
    let t2 = rotated.token;

    assert!(matches!(
        coordinator.validator().validate(&t1).await,
        Err(TokenError::Invalid)
    ));
    assert_eq!(
        coordinator.validator().validate(&t2).await.unwrap(),
        OwnerId::new("u7")
    );
}

#[tokio::test]
async fn consumed_token_stays_invalid_forever() {
    let (_, coordinator) = setup();
    let t1 = coordinator.issuer().issue(&OwnerId::new("u7")).await.unwrap();

    coordinator
        .rotate(&t1, Access::Authenticated, async { Ok::<_, AppError>(()) })
        .await
        .unwrap();

    for _ in 0..3 {
        let replay = coordinator
            .rotate(&t1, Access::Authenticated, async { Ok::<_, AppError>(()) })
            .await;
        assert!(matches!(replay, Err(AppError::Token(TokenError::Invalid))));
    }
}

#[tokio::test]
async fn expired_token_is_invalid_even_with_active_record() {
    let (store, coordinator) = setup();
    let codec = TokenCodec::new(&settings()).unwrap();
    let issued_at = chrono::Utc::now().timestamp() - codec.ttl_seconds() - 1;
    let token = codec.sign_at(&OwnerId::new("u7"), issued_at).unwrap();
    store.insert(&token, &OwnerId::new("u7")).await.unwrap();

    assert_eq!(store.status_of(&token), Some(TokenStatus::Active));
    assert!(matches!(
        coordinator.validator().validate(&token).await,
        Err(TokenError::Invalid)
    ));
}

#[tokio::test]
async fn garbage_token_is_invalid_without_panicking() {
    let (_, coordinator) = setup();

    assert!(matches!(
        coordinator.validator().validate("not-a-real-token").await,
        Err(TokenError::Invalid)
    ));
}

#[tokio::test]
async fn never_issued_and_revoked_tokens_are_indistinguishable() {
    let (store, coordinator) = setup();
    let codec = TokenCodec::new(&settings()).unwrap();

    let never_stored = codec.sign(&OwnerId::new("u7")).unwrap();
    let revoked = coordinator.issuer().issue(&OwnerId::new("u7")).await.unwrap();
    store.revoke(&revoked).await.unwrap();

    let a = coordinator.validator().validate(&never_stored).await.unwrap_err();
    let b = coordinator.validator().validate(&revoked).await.unwrap_err();
    assert_eq!(a.to_string(), b.to_string());
}

#[tokio::test]
async fn issuance_fails_loudly_when_store_is_unreachable() {
    let (store, coordinator) = setup();
    store.set_reachable(false);

    let result = coordinator.issuer().issue(&OwnerId::new("u7")).await;

    assert!(matches!(result, Err(TokenError::Persistence(_))));
    store.set_reachable(true);
    assert!(store.is_empty());
}

#[tokio::test]
async fn failed_effect_does_not_consume_token() {
    let (_, coordinator) = setup();
    let token = coordinator.issuer().issue(&OwnerId::new("u7")).await.unwrap();

    let result = coordinator
        .rotate(&token, Access::Authenticated, async {
            Err::<(), _>(AppError::Database(DatabaseError::UniqueConstraintViolation(
                "authors_name_key".to_string(),
            )))
        })
        .await;
    assert!(result.is_err());

    // The same token still works for the retry
    let retry = coordinator
        .rotate(&token, Access::Authenticated, async { Ok::<_, AppError>(()) })
        .await;
    assert!(retry.is_ok());
}

#[tokio::test]
async fn owner_mismatch_is_forbidden_and_token_survives() {
    let (_, coordinator) = setup();
    let token = coordinator.issuer().issue(&OwnerId::from(1)).await.unwrap();

    let victim = OwnerId::from(2);
    let result = coordinator
        .rotate(&token, Access::Owner(&victim), async { Ok::<_, AppError>(()) })
        .await;

    assert!(matches!(result, Err(AppError::Token(TokenError::Forbidden))));
    assert!(coordinator.validator().validate(&token).await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_rotations_of_one_token_spend_it_once() {
    let (_, coordinator) = setup();
    let coordinator = Arc::new(coordinator);
    let token = coordinator.issuer().issue(&OwnerId::new("u7")).await.unwrap();
    let effects = Arc::new(AtomicUsize::new(0));

    let attempts: Vec<_> = (0..2)
        .map(|_| {
            let coordinator = coordinator.clone();
            let token = token.clone();
            let effects = effects.clone();
            tokio::spawn(async move {
                coordinator
                    .rotate(&token, Access::Authenticated, async move {
                        effects.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, AppError>(())
                    })
                    .await
            })
        })
        .collect();

    let mut successes = 0;
    let mut invalid = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(_) => successes += 1,
            Err(AppError::Token(TokenError::Invalid)) => invalid += 1,
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(invalid, 1);
    assert_eq!(effects.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rotations_of_different_tokens_run_in_parallel() {
    let (_, coordinator) = setup();
    let coordinator = Arc::new(coordinator);
    let a = coordinator.issuer().issue(&OwnerId::new("u7")).await.unwrap();
    let b = coordinator.issuer().issue(&OwnerId::new("u8")).await.unwrap();

    let slow = |token: String, coordinator: Arc<RotationCoordinator>| {
        tokio::spawn(async move {
            coordinator
                .rotate(&token, Access::Authenticated, async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok::<_, AppError>(())
                })
                .await
        })
    };

    let started = std::time::Instant::now();
    let (ra, rb) = tokio::join!(slow(a, coordinator.clone()), slow(b, coordinator.clone()));
    assert!(ra.unwrap().is_ok());
    assert!(rb.unwrap().is_ok());
    assert!(started.elapsed() < Duration::from_millis(390));
}
