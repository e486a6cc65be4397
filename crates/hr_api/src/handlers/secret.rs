//! Shared-secret endpoints.

use hr_proto::api::{CreateSecretRequest, DeleteSecretRequest};
use hr_proto::envelope::{self, SignedEnvelope};
use hr_proto::ApiError;

use crate::context::Context;
use crate::secret;

use super::{authenticate, seal_response};

/// `POST /api/shared-secret`
pub async fn create(
    ctx: &Context,
    bearer: &str,
    request: &SignedEnvelope,
) -> Result<SignedEnvelope, ApiError> {
    let auth = authenticate(ctx, bearer)?;
    let req: CreateSecretRequest = envelope::verify_and_open(request, &auth.pub_key)?;

    let response = secret::create(ctx, &auth.user_id, &req).await?;
    seal_response(ctx, &auth.user_id, &auth.claims.pub_key, &response)
}

/// `GET /api/shared-secret/{url_hash}?otp=` — a GET carries no body, so
/// authentication and the access token's key binding stand in for the
/// request envelope; the response is signed as everywhere else.
pub async fn view(
    ctx: &Context,
    bearer: &str,
    url_hash: &str,
    otp: Option<&str>,
) -> Result<SignedEnvelope, ApiError> {
    let auth = authenticate(ctx, bearer)?;
    let response = secret::view(ctx, &auth.user_id, url_hash, otp).await?;
    seal_response(ctx, &auth.user_id, &auth.claims.pub_key, &response)
}

/// `DELETE /api/shared-secret/{url_hash}` — the signed payload must name
/// the same hash as the path.
pub async fn delete(
    ctx: &Context,
    bearer: &str,
    url_hash: &str,
    request: &SignedEnvelope,
) -> Result<SignedEnvelope, ApiError> {
    let auth = authenticate(ctx, bearer)?;
    let req: DeleteSecretRequest = envelope::verify_and_open(request, &auth.pub_key)?;
    if req.url_hash != url_hash {
        return Err(ApiError::forbidden());
    }

    let response = secret::delete(ctx, &auth.user_id, url_hash).await?;
    seal_response(ctx, &auth.user_id, &auth.claims.pub_key, &response)
}
