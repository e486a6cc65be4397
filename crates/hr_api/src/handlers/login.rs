//! Login endpoints: magic-link request, consumption, logout.

use hr_crypto::identity;
use hr_proto::api::{LoginRequest, LogoutRequest, LogoutResponse};
use hr_proto::envelope::{self, SignedEnvelope};
use hr_proto::ApiError;

use crate::context::Context;
use crate::{magic, refresh};

use super::{authenticate, seal_response};

/// Signed session payload plus the refresh cookie the router must set.
pub struct LoginSessionOutcome {
    pub envelope: SignedEnvelope,
    pub refresh_cookie: String,
}

/// `POST /api/login/` — the signing key rides inside the payload
/// (unauthenticated endpoint).
pub async fn request_magic_link(
    ctx: &Context,
    request: &SignedEnvelope,
) -> Result<SignedEnvelope, ApiError> {
    let (req, _client_pub) = envelope::verify_with_embedded_key::<LoginRequest>(request)?;
    let response = magic::issue(ctx, &req).await?;

    let user_id = identity::user_id(ctx.master(), &req.email);
    seal_response(ctx, &user_id, &req.pub_key, &response)
}

/// `POST /api/login/magiclink/` — single-use consumption; `Conflict` on
/// replay.
pub async fn consume_magic_link(
    ctx: &Context,
    request: &SignedEnvelope,
) -> Result<LoginSessionOutcome, ApiError> {
    let outcome = magic::consume(ctx, request).await?;
    let envelope = envelope::seal(outcome.signing_key.secret_bytes(), &outcome.response)?;
    Ok(LoginSessionOutcome {
        envelope,
        refresh_cookie: outcome.refresh_cookie,
    })
}

/// `DELETE /api/login` — revoke the refresh record; the client wipes its
/// own state.
pub async fn logout(
    ctx: &Context,
    bearer: &str,
    refresh_cookie: Option<&str>,
    request: &SignedEnvelope,
) -> Result<SignedEnvelope, ApiError> {
    let auth = authenticate(ctx, bearer)?;
    let _req: LogoutRequest = envelope::verify_and_open(request, &auth.pub_key)?;

    refresh::logout(ctx, refresh_cookie).await?;

    seal_response(
        ctx,
        &auth.user_id,
        &auth.claims.pub_key,
        &LogoutResponse {
            status: "logged_out".into(),
        },
    )
}
