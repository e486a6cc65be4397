//! Endpoint handlers — one async function per API endpoint.
//!
//! The HTTP router is an external collaborator: it parses paths, bodies,
//! headers, and cookies, then calls these functions with typed inputs.
//! Everything protocol-relevant happens here: envelope verification,
//! authentication, engine calls, and response signing. Handlers that set
//! cookies return an outcome struct carrying the cookie value alongside
//! the signed envelope.

pub mod login;
pub mod meta;
pub mod secret;
pub mod session;

use serde::Serialize;
use tracing::error;

use hr_proto::envelope::{self, SignedEnvelope};
use hr_proto::ApiError;
use hr_store::StoreError;

use crate::context::Context;
use crate::session_keys;
use crate::token::{self, AccessClaims};

/// Storage failures are all the client needs to know: retry later.
/// The detail goes to the log, never the response.
pub(crate) fn storage(e: StoreError) -> ApiError {
    error!(error = %e, "storage failure");
    ApiError::TransientStorage
}

/// A validated access token, unpacked for handler use.
pub struct Authenticated {
    pub claims: AccessClaims,
    pub user_id: [u8; 16],
    /// Ephemeral Ed25519 key the session's request envelopes are signed with.
    pub pub_key: [u8; 32],
}

/// Validate the bearer token (with or without the `Bearer ` prefix).
pub fn authenticate(ctx: &Context, bearer: &str) -> Result<Authenticated, ApiError> {
    let raw = bearer.strip_prefix("Bearer ").unwrap_or(bearer);
    let claims = token::validate(ctx.master(), raw, ctx.now())?;
    Ok(Authenticated {
        user_id: claims.user_id()?,
        pub_key: claims.pub_key_bytes()?,
        claims,
    })
}

/// Sign a response payload with the session's derived server key.
pub(crate) fn seal_response<T: Serialize>(
    ctx: &Context,
    user_id: &[u8; 16],
    client_pub_hex: &str,
    payload: &T,
) -> Result<SignedEnvelope, ApiError> {
    let key = session_keys::server_signing_key(ctx.master(), user_id, client_pub_hex)?;
    envelope::seal(key.secret_bytes(), payload)
}
