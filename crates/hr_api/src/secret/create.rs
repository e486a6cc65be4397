//! Secret creation (sender side).

use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use tracing::info;

use hr_crypto::codec::{b58_encode, b64url_encode};
use hr_crypto::ct::ct_eq;
use hr_crypto::identity;
use hr_crypto::kdf::kdf_array;
use hr_proto::api::{CreateSecretRequest, CreateSecretResponse, SecretRole};
use hr_proto::canonical::to_canonical_json;
use hr_proto::ApiError;
use hr_store::models::{SharedSecretRow, TrackingRow};

use crate::context::Context;
use crate::email::{dispatch, OutboundEmail};
use crate::fingerprint;
use crate::handlers::storage;

use super::payload::{self, SecretPayload};
use super::{
    db_index, DEFAULT_EXPIRES_HOURS, DEFAULT_READS, MAX_EXPIRES_HOURS, MAX_READS,
    MAX_SECRET_TEXT_BYTES, MIN_EXPIRES_HOURS, MIN_READS, REFERENCE_HASH_LEN,
};

fn validate_email(field: &'static str, email: &str) -> Result<(), ApiError> {
    if email.trim().is_empty() || !email.contains('@') || email.len() > 254 {
        return Err(ApiError::validation(field, "must be a valid address"));
    }
    Ok(())
}

fn validate(req: &CreateSecretRequest) -> Result<(i64, i64), ApiError> {
    validate_email("sender_email", &req.sender_email)?;
    validate_email("receiver_email", &req.receiver_email)?;

    if req.secret_text.is_empty() {
        return Err(ApiError::validation("secret_text", "must not be empty"));
    }
    if req.secret_text.len() > MAX_SECRET_TEXT_BYTES {
        return Err(ApiError::validation("secret_text", "at most 512 bytes"));
    }
    if req.ui_host.trim().is_empty() || req.ui_host.contains('/') {
        return Err(ApiError::validation("ui_host", "must be a bare host name"));
    }

    let expires_hours = req.expires_hours.unwrap_or(DEFAULT_EXPIRES_HOURS);
    if !(MIN_EXPIRES_HOURS..=MAX_EXPIRES_HOURS).contains(&expires_hours) {
        return Err(ApiError::validation("expires_hours", "must be between 1 and 72"));
    }

    let max_reads = req.max_reads.unwrap_or(DEFAULT_READS);
    if !(MIN_READS..=MAX_READS).contains(&max_reads) {
        return Err(ApiError::validation("max_reads", "must be between 1 and 10"));
    }

    Ok((expires_hours, max_reads))
}

/// Fresh 9-digit numeric OTP (never with a leading zero).
fn generate_otp() -> String {
    OsRng.gen_range(100_000_000u32..=999_999_999).to_string()
}

/// Create the secret pair. `caller` is the authenticated user id; it must
/// match the claimed sender address, otherwise anyone could plant secrets
/// in someone else's name.
pub async fn create(
    ctx: &Context,
    caller: &[u8; 16],
    req: &CreateSecretRequest,
) -> Result<CreateSecretResponse, ApiError> {
    let (expires_hours, max_reads) = validate(req)?;

    let sender_id = identity::user_id(ctx.master(), &req.sender_email);
    if !ct_eq(&sender_id, caller) {
        return Err(ApiError::forbidden());
    }
    let receiver_id = identity::user_id(ctx.master(), &req.receiver_email);

    let now = ctx.now();
    let expires_at = now + expires_hours * 3600;
    let otp = req.require_otp.then(generate_otp);

    let mut reference_hash = [0u8; REFERENCE_HASH_LEN];
    OsRng.fill_bytes(&mut reference_hash);

    let encrypted_payload = payload::seal(
        ctx.master(),
        &reference_hash,
        &SecretPayload {
            sender_email: req.sender_email.clone(),
            receiver_email: req.receiver_email.clone(),
            secret_text: req.secret_text.clone(),
            otp: otp.clone(),
            created_at: now,
        },
    )?;

    let row = |user_id: &[u8; 16], role: SecretRole| SharedSecretRow {
        db_index: db_index(ctx.master(), &reference_hash, user_id).to_vec(),
        encrypted_payload: encrypted_payload.clone(),
        expires_at,
        role: role.as_str().into(),
    };

    ctx.store
        .secret_insert_pair(
            &row(&sender_id, SecretRole::Sender),
            &row(&receiver_id, SecretRole::Receiver),
            &TrackingRow {
                reference_hash: reference_hash.to_vec(),
                pending_reads: max_reads,
                max_reads,
                read_at: None,
                expires_at,
                created_at: now,
            },
        )
        .await
        .map_err(storage)?;

    let url = |user_id: &[u8; 16], role| {
        format!(
            "https://{}/shared-secret/{}",
            req.ui_host,
            fingerprint::encode(ctx.master(), &reference_hash, user_id, role)
        )
    };
    let url_sender = url(&sender_id, SecretRole::Sender);
    let url_receiver = url(&receiver_id, SecretRole::Receiver);

    if req.send_copy_to_sender {
        send_sender_copy(ctx, req, &reference_hash, &sender_id, &url_sender, otp.as_deref()).await?;
    }

    info!(max_reads, expires_hours, "shared secret created");
    Ok(CreateSecretResponse {
        url_sender,
        url_receiver,
        reference: b58_encode(&reference_hash),
        otp,
    })
}

/// The sender-copy email body is sealed under a sender-specific derived
/// key; the delivery adapter relays opaque bytes. The copy reuses the
/// secret's single OTP rather than minting a second one.
async fn send_sender_copy(
    ctx: &Context,
    req: &CreateSecretRequest,
    reference_hash: &[u8; REFERENCE_HASH_LEN],
    sender_id: &[u8; 16],
    url_sender: &str,
    otp: Option<&str>,
) -> Result<(), ApiError> {
    let mut input = [0u8; REFERENCE_HASH_LEN + 16];
    input[..REFERENCE_HASH_LEN].copy_from_slice(reference_hash);
    input[REFERENCE_HASH_LEN..].copy_from_slice(sender_id);
    let material = kdf_array::<44>("sender_copy_key", ctx.master(), &input);
    let mut key = [0u8; 32];
    let mut nonce = [0u8; 12];
    key.copy_from_slice(&material[..32]);
    nonce.copy_from_slice(&material[32..]);

    let body_plain = to_canonical_json(&serde_json::json!({
        "reference": b58_encode(reference_hash),
        "url": url_sender,
        "otp": otp,
    }))?;
    let sealed = hr_crypto::aead::seal(&key, &nonce, b"sender_copy_v1", body_plain.as_bytes())?;

    dispatch(
        ctx,
        OutboundEmail {
            to: req.sender_email.clone(),
            subject: "email.sender_copy.subject".into(),
            body: b64url_encode(&sealed),
            lang: req.sender_language.clone(),
        },
    )
    .await
}
