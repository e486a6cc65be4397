//! Sliding-window session refresh.
//!
//! The window arithmetic is entirely server-side. The client always sends
//! fresh candidate keys; the server either ignores them (first third of the
//! record's life) or adopts them and rotates everything (rest of the life).
//! The client learns which happened from one signal only: the presence of
//! `server_pub_key` in the response. Past the full lifetime `R` the record
//! is dead and the user logs in again.

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, info};

use hr_crypto::codec::b58_decode_array;
use hr_crypto::codec::b58_encode;
use hr_crypto::identity::Ed25519KeyPair;
use hr_crypto::kdf::kdf32;
use hr_proto::api::{RefreshRequest, RefreshResponse};
use hr_proto::envelope::{self, SignedEnvelope};
use hr_proto::ApiError;
use hr_store::models::RefreshRecordRow;

use crate::context::Context;
use crate::handlers::storage;
use crate::magic::REFRESH_TOKEN_LEN;
use crate::session_keys;
use crate::token;

pub struct RefreshOutcome {
    pub response: RefreshResponse,
    /// Replacement cookie value; set only when the record rotated.
    pub refresh_cookie: Option<String>,
    /// Signs the response. Derived from the pre-rotation client key — the
    /// one the client has pinned — even when the payload carries its
    /// successor.
    pub signing_key: Ed25519KeyPair,
}

fn hex_key(field: &'static str, value: &str) -> Result<[u8; 32], ApiError> {
    hex::decode(value)
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| ApiError::validation(field, "must be 32 bytes of hex"))
}

pub async fn refresh(
    ctx: &Context,
    cookie: &str,
    request: &SignedEnvelope,
) -> Result<RefreshOutcome, ApiError> {
    let raw_token: [u8; REFRESH_TOKEN_LEN] =
        b58_decode_array(cookie).map_err(|_| ApiError::Unauthenticated)?;
    let token_hash = kdf32("refresh_token", ctx.master(), &raw_token);

    let record = ctx
        .store
        .refresh_get(&token_hash)
        .await
        .map_err(storage)?
        .ok_or(ApiError::Unauthenticated)?;

    // Envelopes during the whole window are signed with the client's
    // *current* ephemeral key — the one on record.
    let current_pub =
        hex_key("pub_key", &record.ephemeral_ed25519_pub).map_err(|_| ApiError::Unauthenticated)?;
    let req: RefreshRequest = envelope::verify_and_open(request, &current_pub)?;

    let user_id: [u8; 16] = record
        .user_id
        .clone()
        .try_into()
        .map_err(|_| ApiError::Unauthenticated)?;

    let now = ctx.now();
    let lifetime = ctx.config.refresh_ttl_secs;
    let age = now - record.issued_at;

    if age >= lifetime || now >= record.refresh_exp {
        ctx.store
            .refresh_delete(&token_hash)
            .await
            .map_err(storage)?;
        info!("refresh record expired");
        return Err(ApiError::RefreshExpired);
    }

    let signing_key =
        session_keys::server_signing_key(ctx.master(), &user_id, &record.ephemeral_ed25519_pub)?;
    let expires_at = now + ctx.config.access_ttl_secs;

    if age < lifetime / 3 {
        // No-rotation window: record untouched, candidate keys discarded,
        // and the response MUST NOT carry server_pub_key.
        debug!(age, "refresh inside no-rotation window");
        let access_token = token::mint(
            ctx.master(),
            &user_id,
            &record.ephemeral_ed25519_pub,
            expires_at,
        )?;
        return Ok(RefreshOutcome {
            response: RefreshResponse {
                access_token,
                expires_at,
                server_pub_key: None,
                server_x25519_pub_key: None,
            },
            refresh_cookie: None,
            signing_key,
        });
    }

    // Rotation window: adopt the candidate keys, restart the record.
    hex_key("new_ed25519_pub_key", &req.new_ed25519_pub_key)?;
    hex_key("new_x25519_pub_key", &req.new_x25519_pub_key)?;

    let mut new_token = [0u8; REFRESH_TOKEN_LEN];
    OsRng.fill_bytes(&mut new_token);

    ctx.store
        .refresh_rotate(
            &token_hash,
            &RefreshRecordRow {
                token_hash: kdf32("refresh_token", ctx.master(), &new_token).to_vec(),
                user_id: user_id.to_vec(),
                ephemeral_ed25519_pub: req.new_ed25519_pub_key.clone(),
                ephemeral_x25519_pub: req.new_x25519_pub_key.clone(),
                issued_at: now,
                refresh_exp: now + lifetime,
            },
        )
        .await
        .map_err(storage)?;

    let new_signing =
        session_keys::server_signing_key(ctx.master(), &user_id, &req.new_ed25519_pub_key)?;
    let new_agreement =
        session_keys::server_agreement_key(ctx.master(), &user_id, &req.new_ed25519_pub_key)?;
    let access_token = token::mint(ctx.master(), &user_id, &req.new_ed25519_pub_key, expires_at)?;

    info!(age, "refresh rotated session keys");
    Ok(RefreshOutcome {
        response: RefreshResponse {
            access_token,
            expires_at,
            server_pub_key: Some(new_signing.public_hex()),
            server_x25519_pub_key: Some(new_agreement.public_hex()),
        },
        refresh_cookie: Some(b58_encode(&new_token)),
        signing_key,
    })
}

/// Revoke the refresh record early. Everything else about logout is
/// client-side cleanup; access tokens simply age out.
pub async fn logout(ctx: &Context, cookie: Option<&str>) -> Result<(), ApiError> {
    if let Some(cookie) = cookie {
        if let Ok(raw) = b58_decode_array::<REFRESH_TOKEN_LEN>(cookie) {
            let token_hash = kdf32("refresh_token", ctx.master(), &raw);
            ctx.store
                .refresh_delete(&token_hash)
                .await
                .map_err(storage)?;
            info!("refresh record revoked");
        }
    }
    Ok(())
}
