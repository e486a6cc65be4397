//! Secret viewing.
//!
//! Effect order matters and is fixed: fingerprint → tracking existence →
//! expiry → OTP gate → decrement → decrypt-and-respond. The OTP gate sits
//! before the decrement so a missing or wrong OTP never costs a read.

use tracing::{debug, info};

use hr_crypto::codec::b58_encode;
use hr_crypto::ct::ct_eq;
use hr_proto::api::{SecretRole, ViewSecretResponse};
use hr_proto::ApiError;

use crate::context::Context;
use crate::fingerprint;
use crate::handlers::storage;

use super::{db_index, payload, UNLIMITED_READS};

pub async fn view(
    ctx: &Context,
    caller: &[u8; 16],
    url_hash: &str,
    otp: Option<&str>,
) -> Result<ViewSecretResponse, ApiError> {
    // A checksum mismatch means tampering or someone else's URL; either
    // way the caller sees the same Forbidden as the other access denials.
    let (reference_hash, role) =
        fingerprint::decode(ctx.master(), url_hash, caller).map_err(|e| match e {
            ApiError::InvalidChecksum => ApiError::forbidden(),
            other => other,
        })?;
    let index = db_index(ctx.master(), &reference_hash, caller);
    let now = ctx.now();

    // Tracking is the liveness authority. A missing tracking row means the
    // sender cascaded: whatever row the viewer still has is garbage — reap
    // it on the way out.
    let Some(tracking) = ctx
        .store
        .tracking_get(&reference_hash)
        .await
        .map_err(storage)?
    else {
        debug!("tracking missing, reaping orphaned view row");
        ctx.store.secret_delete_row(&index).await.map_err(storage)?;
        return Err(ApiError::Gone);
    };

    let Some(row) = ctx.store.secret_get(&index).await.map_err(storage)? else {
        return Err(ApiError::NotFound);
    };

    if row.expires_at <= now {
        ctx.store
            .secret_delete_with_tracking(&index, &reference_hash)
            .await
            .map_err(storage)?;
        info!("expired secret removed on access");
        return Err(ApiError::Gone);
    }

    let secret = payload::open(ctx.master(), &reference_hash, &row.encrypted_payload)?;

    let pending_reads = match role {
        SecretRole::Sender => UNLIMITED_READS,
        SecretRole::Receiver => {
            if tracking.pending_reads <= 0 {
                return Err(ApiError::Gone);
            }

            if let Some(stored_otp) = &secret.otp {
                match otp {
                    None => return Err(ApiError::otp_required()),
                    Some(provided) => {
                        if !ct_eq(provided.as_bytes(), stored_otp.as_bytes()) {
                            return Err(ApiError::invalid_otp());
                        }
                    }
                }
            }

            // Conditional decrement: the WHERE clause keeps racing viewers
            // from pushing the counter below zero.
            if !ctx
                .store
                .tracking_consume_read(&reference_hash, now)
                .await
                .map_err(storage)?
            {
                return Err(ApiError::Gone);
            }

            // Re-read for an accurate count under concurrency.
            ctx.store
                .tracking_get(&reference_hash)
                .await
                .map_err(storage)?
                .map(|t| t.pending_reads)
                .unwrap_or(0)
        }
    };

    Ok(ViewSecretResponse {
        secret_text: secret.secret_text,
        sender_email: secret.sender_email,
        receiver_email: secret.receiver_email,
        pending_reads,
        max_reads: tracking.max_reads,
        expires_at: tracking.expires_at,
        reference: b58_encode(&reference_hash),
        role,
    })
}
