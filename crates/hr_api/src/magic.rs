//! Magic-link issuance and consumption.
//!
//! The emailed token is the capability: the stored row keeps the login
//! email only as AEAD ciphertext under a key derived from the raw token,
//! which never touches storage (rows are keyed by its keyed hash). A row
//! without its emailed link is therefore inert, and every row dies at
//! `MAGIC_TTL_SECONDS` or on first consumption — whichever comes first.

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, info};

use hr_crypto::aead;
use hr_crypto::codec::{b58_decode_array, b58_encode, b64url_encode};
use hr_crypto::ecdh;
use hr_crypto::identity::{self, Ed25519KeyPair};
use hr_crypto::kdf::{kdf32, kdf_array};
use hr_proto::api::{LoginRequest, MagicLinkConsumeRequest, MagicLinkSentResponse, SessionResponse};
use hr_proto::envelope::{self, SignedEnvelope};
use hr_proto::ApiError;
use hr_store::models::{MagicLinkRow, RefreshRecordRow};

use crate::context::Context;
use crate::email::{dispatch, OutboundEmail};
use crate::handlers::storage;
use crate::session_keys;
use crate::token;

pub const MAGIC_TOKEN_LEN: usize = 32;
pub const REFRESH_TOKEN_LEN: usize = 32;

const EMAIL_AAD: &[u8] = b"magic_link_v1";
const PRIVKEY_CONTEXT_AAD: &[u8] = b"privkey_context_v1";

/// Everything the handler needs after consumption: the signed payload
/// source, the cookie to set, and the session key that signs the response.
pub struct ConsumeOutcome {
    pub response: SessionResponse,
    /// Opaque Base58 refresh cookie value.
    pub refresh_cookie: String,
    pub signing_key: Ed25519KeyPair,
}

fn require_hex_key(field: &'static str, value: &str) -> Result<[u8; 32], ApiError> {
    hex::decode(value)
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| ApiError::validation(field, "must be 32 bytes of hex"))
}

fn validate_login_request(req: &LoginRequest) -> Result<(), ApiError> {
    if req.email.trim().is_empty() || !req.email.contains('@') || req.email.len() > 254 {
        return Err(ApiError::validation("email", "must be a valid address"));
    }
    if req.ui_host.trim().is_empty() || req.ui_host.contains('/') {
        return Err(ApiError::validation("ui_host", "must be a bare host name"));
    }
    require_hex_key("pub_key", &req.pub_key)?;
    require_hex_key("x25519_pub_key", &req.x25519_pub_key)?;
    Ok(())
}

/// Derive the AEAD material protecting the email column from the raw token.
fn email_material(token: &[u8; MAGIC_TOKEN_LEN]) -> ([u8; 32], [u8; 12]) {
    let material = kdf_array::<44>("magic_link_email", token, b"");
    let mut key = [0u8; 32];
    let mut nonce = [0u8; 12];
    key.copy_from_slice(&material[..32]);
    nonce.copy_from_slice(&material[32..]);
    (key, nonce)
}

/// Issue a magic link: persist the pending record and hand the URL to the
/// email adapter. The address in that email is its only plaintext egress.
pub async fn issue(ctx: &Context, req: &LoginRequest) -> Result<MagicLinkSentResponse, ApiError> {
    validate_login_request(req)?;
    let now = ctx.now();

    // Opportunistic hygiene; failures here are not the caller's problem.
    let purged = ctx
        .store
        .magic_links_purge_expired(now)
        .await
        .map_err(storage)?;
    if purged > 0 {
        debug!(purged, "purged expired magic links");
    }

    let mut magic_token = [0u8; MAGIC_TOKEN_LEN];
    OsRng.fill_bytes(&mut magic_token);
    let token_hash = kdf32("magic_token", ctx.master(), &magic_token);

    let (email_key, email_nonce) = email_material(&magic_token);
    let email_enc = aead::seal(&email_key, &email_nonce, EMAIL_AAD, req.email.as_bytes())?;

    ctx.store
        .magic_link_insert(&MagicLinkRow {
            token_hash: token_hash.to_vec(),
            email_enc,
            ui_host: req.ui_host.clone(),
            next: req.next.clone(),
            pub_key: req.pub_key.clone(),
            x25519_pub_key: req.x25519_pub_key.clone(),
            email_lang: req.email_lang.clone(),
            expires_at: now + ctx.config.magic_ttl_secs,
            created_at: now,
        })
        .await
        .map_err(storage)?;

    let mut magic_url = format!(
        "https://{}/?magiclink={}",
        req.ui_host,
        b58_encode(&magic_token)
    );
    if let Some(next) = &req.next {
        magic_url.push_str("&next=");
        magic_url.push_str(&b64url_encode(next.as_bytes()));
    }

    dispatch(
        ctx,
        OutboundEmail {
            to: req.email.clone(),
            subject: "email.magic_link.subject".into(),
            body: format!(
                "Open this link to sign in:\n\n{magic_url}\n\n\
                 It works exactly once and expires shortly."
            ),
            lang: req.email_lang.clone(),
        },
    )
    .await?;

    info!("magic link issued");
    Ok(MagicLinkSentResponse {
        status: "sent".into(),
    })
}

/// Consume a magic link. The envelope signature is checked against the
/// ephemeral key stored with the link *before* the link is burned, and
/// burning is the atomic single-use gate: a concurrent second consumption
/// loses the delete race and gets `Conflict`.
pub async fn consume(ctx: &Context, request: &SignedEnvelope) -> Result<ConsumeOutcome, ApiError> {
    let req: MagicLinkConsumeRequest = envelope::decode_unverified(request)?;
    let now = ctx.now();

    let magic_token: [u8; MAGIC_TOKEN_LEN] = b58_decode_array(&req.magiclink)?;
    let token_hash = kdf32("magic_token", ctx.master(), &magic_token);

    let record = ctx
        .store
        .magic_link_get(&token_hash)
        .await
        .map_err(storage)?
        .ok_or(ApiError::Conflict)?;

    if record.expires_at <= now {
        ctx.store
            .magic_link_delete(&token_hash)
            .await
            .map_err(storage)?;
        return Err(ApiError::Gone);
    }

    // The consume request must come from the same client that asked for the
    // link: verify against the stored ephemeral key, then burn the record.
    let client_pub = require_hex_key("pub_key", &record.pub_key)
        .map_err(|_| ApiError::InvalidSignature)?;
    envelope::verify_and_open::<MagicLinkConsumeRequest>(request, &client_pub)?;

    if !ctx
        .store
        .magic_link_delete(&token_hash)
        .await
        .map_err(storage)?
    {
        return Err(ApiError::Conflict);
    }

    let (email_key, email_nonce) = email_material(&magic_token);
    let email_bytes = aead::open(&email_key, &email_nonce, EMAIL_AAD, &record.email_enc)?;
    let email = String::from_utf8(email_bytes.to_vec()).map_err(|_| ApiError::DecryptionFailed)?;

    let user_id = identity::user_id(ctx.master(), &email);

    // Deterministic per-user context: "minting" and "reuse" are the same
    // derivation, so nothing user-identifying needs to be stored for it.
    let privkey_context = kdf32("privkey_context", ctx.master(), &user_id);

    // Seal the context to the client's ephemeral X25519 key.
    let server_agreement = session_keys::server_agreement_key(ctx.master(), &user_id, &record.pub_key)?;
    let client_x_pub = ecdh::public_from_bytes(
        &hex::decode(&record.x25519_pub_key).map_err(|_| ApiError::InvalidEncoding)?,
    )?;
    let shared = ecdh::dh(&server_agreement.secret(), &client_x_pub)?;
    let seal_key = kdf32("privkey_context_seal", &shared, b"");
    let mut pc_nonce = [0u8; 12];
    OsRng.fill_bytes(&mut pc_nonce);
    let sealed = aead::seal(&seal_key, &pc_nonce, PRIVKEY_CONTEXT_AAD, &privkey_context)?;
    let mut encrypted_privkey_context = pc_nonce.to_vec();
    encrypted_privkey_context.extend_from_slice(&sealed);

    // Fresh refresh session.
    let mut refresh_token = [0u8; REFRESH_TOKEN_LEN];
    OsRng.fill_bytes(&mut refresh_token);
    ctx.store
        .refresh_insert(&RefreshRecordRow {
            token_hash: kdf32("refresh_token", ctx.master(), &refresh_token).to_vec(),
            user_id: user_id.to_vec(),
            ephemeral_ed25519_pub: record.pub_key.clone(),
            ephemeral_x25519_pub: record.x25519_pub_key.clone(),
            issued_at: now,
            refresh_exp: now + ctx.config.refresh_ttl_secs,
        })
        .await
        .map_err(storage)?;

    let expires_at = now + ctx.config.access_ttl_secs;
    let access_token = token::mint(ctx.master(), &user_id, &record.pub_key, expires_at)?;

    let signing_key = session_keys::server_signing_key(ctx.master(), &user_id, &record.pub_key)?;

    info!("magic link consumed, session established");
    Ok(ConsumeOutcome {
        response: SessionResponse {
            access_token,
            user_id: b58_encode(&user_id),
            expires_at,
            server_pub_key: signing_key.public_hex(),
            server_x25519_pub_key: server_agreement.public_hex(),
            encrypted_privkey_context: b64url_encode(&encrypted_privkey_context),
            next: record.next,
        },
        refresh_cookie: b58_encode(&refresh_token),
        signing_key,
    })
}
