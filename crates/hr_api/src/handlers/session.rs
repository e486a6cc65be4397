//! Session maintenance: refresh and permanent-key publication.

use hr_proto::api::{KeysRotateRequest, KeysRotateResponse};
use hr_proto::envelope::{self, SignedEnvelope};
use hr_proto::ApiError;
use hr_store::models::UserKeysRow;

use crate::context::Context;
use crate::refresh;

use super::{authenticate, seal_response, storage};

pub struct RefreshHandlerOutcome {
    pub envelope: SignedEnvelope,
    /// Replacement cookie; `None` inside the no-rotation window.
    pub refresh_cookie: Option<String>,
}

/// `POST /api/refresh` — cookie-authenticated sliding-window refresh.
pub async fn refresh(
    ctx: &Context,
    refresh_cookie: &str,
    request: &SignedEnvelope,
) -> Result<RefreshHandlerOutcome, ApiError> {
    let outcome = refresh::refresh(ctx, refresh_cookie, request).await?;
    let envelope = envelope::seal(outcome.signing_key.secret_bytes(), &outcome.response)?;
    Ok(RefreshHandlerOutcome {
        envelope,
        refresh_cookie: outcome.refresh_cookie,
    })
}

fn require_hex_key(field: &'static str, value: &str) -> Result<(), ApiError> {
    let ok = hex::decode(value).map(|b| b.len() == 32).unwrap_or(false);
    if ok {
        Ok(())
    } else {
        Err(ApiError::validation(field, "must be 32 bytes of hex"))
    }
}

/// `POST /api/keys/rotate` — publish the permanent (derived) public keys.
pub async fn rotate_keys(
    ctx: &Context,
    bearer: &str,
    request: &SignedEnvelope,
) -> Result<SignedEnvelope, ApiError> {
    let auth = authenticate(ctx, bearer)?;
    let req: KeysRotateRequest = envelope::verify_and_open(request, &auth.pub_key)?;

    require_hex_key("ed25519_pub_key", &req.ed25519_pub_key)?;
    require_hex_key("x25519_pub_key", &req.x25519_pub_key)?;

    ctx.store
        .user_keys_upsert(&UserKeysRow {
            user_id: auth.user_id.to_vec(),
            ed25519_pub: req.ed25519_pub_key,
            x25519_pub: req.x25519_pub_key,
            updated_at: ctx.now(),
        })
        .await
        .map_err(storage)?;

    seal_response(
        ctx,
        &auth.user_id,
        &auth.claims.pub_key,
        &KeysRotateResponse {
            status: "rotated".into(),
        },
    )
}
