//! Engine-level tests: read accounting under concurrency, role-gated
//! deletion, expiry, and the zero-knowledge byte-scan.

use std::sync::Arc;

use hr_api::context::{Clock, Context};
use hr_api::email::DryRunMailer;
use hr_api::secret;
use hr_api::ServerConfig;
use hr_crypto::identity;
use hr_proto::api::{CreateSecretRequest, SecretRole};
use hr_proto::ApiError;
use hr_store::Store;

const MASTER: [u8; 32] = [0x21; 32];
const ALICE: &str = "alice@example.com";
const BOB: &str = "bob@example.com";
const SECRET_TEXT: &str = "rendezvous at dawn";

async fn test_context() -> Arc<Context> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let store = Store::open_in_memory().await.expect("open store");
    Arc::new(Context::with_store(
        ServerConfig::for_tests(MASTER),
        store,
        Arc::new(DryRunMailer::new()),
        Clock::fixed(1_700_000_000),
    ))
}

fn create_request(max_reads: i64, require_otp: bool) -> CreateSecretRequest {
    CreateSecretRequest {
        sender_email: ALICE.into(),
        receiver_email: BOB.into(),
        secret_text: SECRET_TEXT.into(),
        expires_hours: Some(1),
        max_reads: Some(max_reads),
        require_otp,
        send_copy_to_sender: false,
        receiver_language: "en".into(),
        sender_language: "en".into(),
        ui_host: "app.test".into(),
    }
}

fn url_hash_of(url: &str) -> &str {
    url.rsplit('/').next().unwrap()
}

async fn created(
    ctx: &Context,
    max_reads: i64,
    require_otp: bool,
) -> (String, String, [u8; 16], [u8; 16], Option<String>) {
    let alice_id = identity::user_id(&MASTER, ALICE);
    let bob_id = identity::user_id(&MASTER, BOB);
    let resp = secret::create(ctx, &alice_id, &create_request(max_reads, require_otp))
        .await
        .expect("create secret");
    (
        url_hash_of(&resp.url_sender).to_string(),
        url_hash_of(&resp.url_receiver).to_string(),
        alice_id,
        bob_id,
        resp.otp,
    )
}

// ── Read accounting ──────────────────────────────────────────────────────────

#[tokio::test]
async fn receiver_views_decrement_to_zero_then_gone() {
    let ctx = test_context().await;
    let (_, receiver_hash, _, bob_id, _) = created(&ctx, 2, false).await;

    let first = secret::view(&ctx, &bob_id, &receiver_hash, None).await.unwrap();
    assert_eq!(first.pending_reads, 1);
    assert_eq!(first.secret_text, SECRET_TEXT);
    assert_eq!(first.role, SecretRole::Receiver);

    let second = secret::view(&ctx, &bob_id, &receiver_hash, None).await.unwrap();
    assert_eq!(second.pending_reads, 0);

    assert_eq!(
        secret::view(&ctx, &bob_id, &receiver_hash, None).await.unwrap_err(),
        ApiError::Gone
    );
}

#[tokio::test]
async fn sender_views_never_decrement() {
    let ctx = test_context().await;
    let (sender_hash, receiver_hash, alice_id, bob_id, _) = created(&ctx, 1, false).await;

    for _ in 0..5 {
        let view = secret::view(&ctx, &alice_id, &sender_hash, None).await.unwrap();
        assert_eq!(view.pending_reads, secret::UNLIMITED_READS);
        assert_eq!(view.role, SecretRole::Sender);
    }

    // The receiver's single read is still available.
    let view = secret::view(&ctx, &bob_id, &receiver_hash, None).await.unwrap();
    assert_eq!(view.pending_reads, 0);
}

#[tokio::test]
async fn concurrent_receiver_views_never_overdraw() {
    let ctx = test_context().await;
    let max_reads = 3;
    let (_, receiver_hash, _, bob_id, _) = created(&ctx, max_reads, false).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ctx = Arc::clone(&ctx);
        let hash = receiver_hash.clone();
        handles.push(tokio::spawn(async move {
            secret::view(&ctx, &bob_id, &hash, None).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(ApiError::Gone) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(successes, max_reads);

    let reference = hr_api::fingerprint::decode(&MASTER, &receiver_hash, &bob_id)
        .unwrap()
        .0;
    let tracking = ctx.store.tracking_get(&reference).await.unwrap().unwrap();
    assert_eq!(tracking.pending_reads, 0);
    assert!(tracking.read_at.is_some());
}

// ── Role-gated deletion ──────────────────────────────────────────────────────

#[tokio::test]
async fn sender_delete_cascades_and_receiver_view_cleans_up() {
    let ctx = test_context().await;
    let (sender_hash, receiver_hash, alice_id, bob_id, _) = created(&ctx, 3, false).await;

    let deleted = secret::delete(&ctx, &alice_id, &sender_hash).await.unwrap();
    assert_eq!(deleted.role, SecretRole::Sender);

    // Receiver's next view reaps the orphan and reports Gone.
    assert_eq!(
        secret::view(&ctx, &bob_id, &receiver_hash, None).await.unwrap_err(),
        ApiError::Gone
    );

    // Nothing remains in either table.
    let secrets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shared_secrets")
        .fetch_one(&ctx.store.pool)
        .await
        .unwrap();
    let tracking: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shared_secrets_tracking")
        .fetch_one(&ctx.store.pool)
        .await
        .unwrap();
    assert_eq!((secrets, tracking), (0, 0));
}

#[tokio::test]
async fn receiver_delete_removes_only_its_view() {
    let ctx = test_context().await;
    let (sender_hash, receiver_hash, alice_id, bob_id, _) = created(&ctx, 3, false).await;

    let deleted = secret::delete(&ctx, &bob_id, &receiver_hash).await.unwrap();
    assert_eq!(deleted.role, SecretRole::Receiver);

    // The sender still has full access.
    let view = secret::view(&ctx, &alice_id, &sender_hash, None).await.unwrap();
    assert_eq!(view.secret_text, SECRET_TEXT);

    // The receiver's own view is gone.
    assert_eq!(
        secret::view(&ctx, &bob_id, &receiver_hash, None).await.unwrap_err(),
        ApiError::NotFound
    );
}

#[tokio::test]
async fn exhausted_receiver_cannot_delete() {
    let ctx = test_context().await;
    let (_, receiver_hash, _, bob_id, _) = created(&ctx, 1, false).await;

    secret::view(&ctx, &bob_id, &receiver_hash, None).await.unwrap();

    assert_eq!(
        secret::delete(&ctx, &bob_id, &receiver_hash).await.unwrap_err(),
        ApiError::Forbidden { key: "forbidden" }
    );
}

#[tokio::test]
async fn cross_user_url_is_rejected() {
    let ctx = test_context().await;
    let (sender_hash, _, _, bob_id, _) = created(&ctx, 3, false).await;

    // Bob presenting Alice's URL fails the fingerprint checksum and is
    // turned away like any other forbidden access.
    assert_eq!(
        secret::view(&ctx, &bob_id, &sender_hash, None).await.unwrap_err(),
        ApiError::Forbidden { key: "forbidden" }
    );
    assert_eq!(
        secret::delete(&ctx, &bob_id, &sender_hash).await.unwrap_err(),
        ApiError::Forbidden { key: "forbidden" }
    );
}

// ── OTP gate ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn otp_gate_blocks_without_decrementing() {
    let ctx = test_context().await;
    let (_, receiver_hash, _, bob_id, otp) = created(&ctx, 2, true).await;
    let otp = otp.expect("otp minted");
    assert_eq!(otp.len(), 9);
    assert!(otp.chars().all(|c| c.is_ascii_digit()));

    assert_eq!(
        secret::view(&ctx, &bob_id, &receiver_hash, None).await.unwrap_err(),
        ApiError::Forbidden { key: "otp_required" }
    );

    let wrong = if otp.ends_with('1') { "999999990" } else { "999999991" };
    assert_eq!(
        secret::view(&ctx, &bob_id, &receiver_hash, Some(wrong)).await.unwrap_err(),
        ApiError::Forbidden { key: "invalid_otp" }
    );

    // Neither gate failure consumed a read.
    let view = secret::view(&ctx, &bob_id, &receiver_hash, Some(&otp)).await.unwrap();
    assert_eq!(view.pending_reads, 1);
}

// ── Expiry ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn expired_secret_is_gone_and_removed_on_access() {
    let ctx = test_context().await;
    let (_, receiver_hash, _, bob_id, _) = created(&ctx, 3, false).await;

    ctx.clock().advance(3601);

    assert_eq!(
        secret::view(&ctx, &bob_id, &receiver_hash, None).await.unwrap_err(),
        ApiError::Gone
    );

    let reference = hr_api::fingerprint::decode(&MASTER, &receiver_hash, &bob_id)
        .unwrap()
        .0;
    assert!(ctx.store.tracking_get(&reference).await.unwrap().is_none());
}

#[tokio::test]
async fn sweep_removes_expired_rows() {
    let ctx = test_context().await;
    let _ = created(&ctx, 3, false).await;

    ctx.clock().advance(3601);
    let report = secret::sweep_expired(&ctx).await.unwrap();
    assert_eq!(report.secrets, 2);
    assert_eq!(report.tracking, 1);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shared_secrets")
        .fetch_one(&ctx.store.pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

// ── Creation guards ──────────────────────────────────────────────────────────

#[tokio::test]
async fn creation_enforces_caller_and_bounds() {
    let ctx = test_context().await;
    let bob_id = identity::user_id(&MASTER, BOB);

    // Bob cannot create a secret in Alice's name.
    assert!(matches!(
        secret::create(&ctx, &bob_id, &create_request(3, false)).await,
        Err(ApiError::Forbidden { .. })
    ));

    let alice_id = identity::user_id(&MASTER, ALICE);
    let mut req = create_request(3, false);
    req.expires_hours = Some(73);
    assert!(matches!(
        secret::create(&ctx, &alice_id, &req).await,
        Err(ApiError::Validation { .. })
    ));

    let mut req = create_request(11, false);
    req.max_reads = Some(11);
    assert!(matches!(
        secret::create(&ctx, &alice_id, &req).await,
        Err(ApiError::Validation { .. })
    ));

    let mut req = create_request(3, false);
    req.secret_text = "x".repeat(513);
    assert!(matches!(
        secret::create(&ctx, &alice_id, &req).await,
        Err(ApiError::Validation { .. })
    ));
}

// ── Zero knowledge ───────────────────────────────────────────────────────────

/// Byte-scan every server table for plaintext leakage, both while the
/// secret is alive and after both views are deleted.
#[tokio::test]
async fn no_table_ever_contains_plaintext() {
    let ctx = test_context().await;
    let (sender_hash, receiver_hash, alice_id, bob_id, _) = created(&ctx, 3, false).await;

    scan_for_plaintext(&ctx).await;

    secret::view(&ctx, &bob_id, &receiver_hash, None).await.unwrap();
    secret::delete(&ctx, &bob_id, &receiver_hash).await.unwrap();
    secret::delete(&ctx, &alice_id, &sender_hash).await.unwrap();

    scan_for_plaintext(&ctx).await;

    let rows: i64 = sqlx::query_scalar(
        "SELECT (SELECT COUNT(*) FROM shared_secrets) + \
                (SELECT COUNT(*) FROM shared_secrets_tracking)",
    )
    .fetch_one(&ctx.store.pool)
    .await
    .unwrap();
    assert_eq!(rows, 0);
}

async fn scan_for_plaintext(ctx: &Context) {
    use sqlx::Column;
    use sqlx::Row;
    use sqlx::TypeInfo;

    let needles: [&[u8]; 3] = [ALICE.as_bytes(), BOB.as_bytes(), SECRET_TEXT.as_bytes()];
    for table in [
        "magic_links",
        "refresh_records",
        "user_keys",
        "shared_secrets",
        "shared_secrets_tracking",
    ] {
        let rows = sqlx::query(&format!("SELECT * FROM {table}"))
            .fetch_all(&ctx.store.pool)
            .await
            .unwrap();
        for row in rows {
            for (i, column) in row.columns().iter().enumerate() {
                let bytes: Vec<u8> = match column.type_info().name() {
                    "BLOB" => row.get::<Vec<u8>, _>(i),
                    "TEXT" => row.get::<Option<String>, _>(i).unwrap_or_default().into_bytes(),
                    _ => continue,
                };
                for needle in needles {
                    assert!(
                        !bytes.windows(needle.len()).any(|w| w == needle),
                        "plaintext {:?} leaked into {table}.{}",
                        String::from_utf8_lossy(needle),
                        column.name(),
                    );
                }
            }
        }
    }
}
