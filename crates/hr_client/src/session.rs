//! Client session state machine.
//!
//! `Anonymous → PendingMagicLink → Active` (the server decides when an
//! Active session is in its rotation window; the client only reacts).
//!
//! Three rules from the protocol, all enforced here:
//! - Every refresh sends fresh candidate keys; the client adopts them if
//!   and only if the response carries `server_pub_key`.
//! - At most one refresh is in flight; a request that races it proceeds
//!   and may itself 401, yielding one sequential retry.
//! - No request is retried more than once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use hr_proto::api::{
    CreateSecretRequest, CreateSecretResponse, DeleteSecretRequest, DeleteSecretResponse,
    LoginRequest, LogoutRequest, MagicLinkConsumeRequest, RefreshRequest, SecretRole,
    SessionResponse, ViewSecretResponse,
};
use hr_proto::envelope::{self, SignedEnvelope};
use hr_proto::error::ErrorResponse;
use hr_proto::ApiError;

use crate::cache::ConfirmReadCache;
use crate::error::ClientError;
use crate::keys::{self, EphemeralKeys};
use crate::transport::{ApiRequest, ApiResponse, Method, Transport};

const LOGIN_PATH: &str = "/api/login/";
const MAGICLINK_PATH: &str = "/api/login/magiclink/";
const REFRESH_PATH: &str = "/api/refresh";
const LOGOUT_PATH: &str = "/api/login";
const KEYS_ROTATE_PATH: &str = "/api/keys/rotate";
const SHARED_SECRET_PATH: &str = "/api/shared-secret";

struct PendingLogin {
    email: String,
    ephemeral: EphemeralKeys,
}

struct ActiveSession {
    email: String,
    ephemeral: EphemeralKeys,
    access_token: String,
    user_id: String,
    server_pub_key: [u8; 32],
    server_x25519_pub_key: String,
}

enum State {
    Anonymous,
    PendingMagicLink(PendingLogin),
    Active(ActiveSession),
}

/// What the UI needs after a completed login.
#[derive(Debug, Clone)]
pub struct LoginSummary {
    pub user_id: String,
    pub next: Option<String>,
}

pub struct ClientSession {
    transport: Arc<dyn Transport>,
    cache: ConfirmReadCache,
    state: Mutex<State>,
    refresh_in_flight: AtomicBool,
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn parse_signed(body: &str) -> Result<SignedEnvelope, ClientError> {
    serde_json::from_str(body).map_err(|_| ClientError::Protocol(ApiError::InvalidEncoding))
}

/// Map a non-2xx body to the client error space.
fn server_error(response: &ApiResponse) -> ClientError {
    let key = serde_json::from_str::<ErrorResponse>(&response.body)
        .map(|e| e.error)
        .unwrap_or_else(|_| "error.unknown".into());
    if key == "error.refresh_expired" {
        ClientError::SessionExpired
    } else {
        ClientError::Server {
            status: response.status,
            key,
        }
    }
}

impl ClientSession {
    pub fn new(transport: Arc<dyn Transport>, cache: ConfirmReadCache) -> Self {
        Self {
            transport,
            cache,
            state: Mutex::new(State::Anonymous),
            refresh_in_flight: AtomicBool::new(false),
        }
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        self.transport
            .send(request)
            .await
            .map_err(|e| ClientError::Transport(e.0))
    }

    fn seal<T: Serialize>(ephemeral: &EphemeralKeys, payload: &T) -> Result<String, ClientError> {
        let env = envelope::seal(ephemeral.signing.secret_bytes(), payload)
            .map_err(ClientError::Protocol)?;
        serde_json::to_string(&env).map_err(|_| ClientError::Protocol(ApiError::InvalidEncoding))
    }

    /// `POST /api/login/` — mint ephemeral keys, ask for the magic link.
    pub async fn request_magic_link(
        &self,
        email: &str,
        ui_host: &str,
        next: Option<&str>,
        email_lang: &str,
    ) -> Result<(), ClientError> {
        let ephemeral = EphemeralKeys::mint();
        let body = Self::seal(
            &ephemeral,
            &LoginRequest {
                email: email.to_string(),
                ui_host: ui_host.to_string(),
                next: next.map(str::to_string),
                email_lang: email_lang.to_string(),
                pub_key: ephemeral.signing.public_hex(),
                x25519_pub_key: ephemeral.agreement.public_hex(),
            },
        )?;

        let response = self
            .send(ApiRequest {
                method: Method::Post,
                path: LOGIN_PATH.into(),
                bearer: None,
                body: Some(body),
            })
            .await?;
        if response.status != 200 {
            return Err(server_error(&response));
        }

        // No pinned server key yet — the sent-confirmation cannot be
        // verified and carries nothing we act on.
        *self.state.lock().await = State::PendingMagicLink(PendingLogin {
            email: email.to_string(),
            ephemeral,
        });
        info!("magic link requested");
        Ok(())
    }

    /// `POST /api/login/magiclink/` — establish the session, pin the server
    /// key, recover permanent keys, publish their public halves.
    pub async fn complete_login(&self, magiclink: &str) -> Result<LoginSummary, ClientError> {
        let pending = {
            let mut state = self.state.lock().await;
            match std::mem::replace(&mut *state, State::Anonymous) {
                State::PendingMagicLink(p) => p,
                other => {
                    *state = other;
                    return Err(ClientError::NotLoggedIn);
                }
            }
        };

        let body = Self::seal(
            &pending.ephemeral,
            &MagicLinkConsumeRequest {
                magiclink: magiclink.to_string(),
            },
        )?;
        let response = self
            .send(ApiRequest {
                method: Method::Post,
                path: MAGICLINK_PATH.into(),
                bearer: None,
                body: Some(body),
            })
            .await?;
        if response.status != 200 {
            return Err(server_error(&response));
        }

        // Bootstrap: the first signed response carries the key it is
        // signed with. Read it unverified, then verify the envelope with
        // it before trusting anything else inside.
        let env = parse_signed(&response.body)?;
        let unverified: SessionResponse =
            envelope::decode_unverified(&env).map_err(ClientError::Protocol)?;
        let server_pub: [u8; 32] = hex::decode(&unverified.server_pub_key)
            .ok()
            .and_then(|b| b.try_into().ok())
            .ok_or(ClientError::Protocol(ApiError::InvalidEncoding))?;
        let session: SessionResponse =
            envelope::verify_and_open(&env, &server_pub).map_err(ClientError::Protocol)?;

        let privkey_context = keys::recover_privkey_context(
            &pending.ephemeral,
            &session.server_x25519_pub_key,
            &session.encrypted_privkey_context,
        )
        .map_err(ClientError::Protocol)?;
        let (_permanent, rotate_request) = keys::permanent_keys(&pending.email, &privkey_context);

        let summary = LoginSummary {
            user_id: session.user_id.clone(),
            next: session.next.clone(),
        };

        *self.state.lock().await = State::Active(ActiveSession {
            email: pending.email,
            ephemeral: pending.ephemeral,
            access_token: session.access_token,
            user_id: session.user_id,
            server_pub_key: server_pub,
            server_x25519_pub_key: session.server_x25519_pub_key,
        });
        info!(user_id = %summary.user_id, "session established");

        // Publish the permanent public halves. The private halves are
        // re-derivable at will and never leave this process.
        let body = {
            let state = self.state.lock().await;
            let State::Active(active) = &*state else {
                return Err(ClientError::NotLoggedIn);
            };
            Self::seal(&active.ephemeral, &rotate_request)?
        };
        let response = self
            .send_authed(Method::Post, KEYS_ROTATE_PATH.into(), Some(body))
            .await?;
        if response.status != 200 {
            warn!(status = response.status, "permanent key publication failed");
            return Err(server_error(&response));
        }
        self.open_pinned::<hr_proto::api::KeysRotateResponse>(&response)
            .await?;

        Ok(summary)
    }

    async fn access_token(&self) -> Result<String, ClientError> {
        let state = self.state.lock().await;
        match &*state {
            State::Active(active) => Ok(active.access_token.clone()),
            _ => Err(ClientError::NotLoggedIn),
        }
    }

    /// Verify a 2xx response envelope against the pinned server key.
    async fn open_pinned<T: DeserializeOwned>(
        &self,
        response: &ApiResponse,
    ) -> Result<T, ClientError> {
        let env = parse_signed(&response.body)?;
        let state = self.state.lock().await;
        let State::Active(active) = &*state else {
            return Err(ClientError::NotLoggedIn);
        };
        envelope::verify_and_open(&env, &active.server_pub_key).map_err(ClientError::Protocol)
    }

    /// Authenticated request with the single 401-driven retry.
    async fn send_authed(
        &self,
        method: Method,
        path: String,
        body: Option<String>,
    ) -> Result<ApiResponse, ClientError> {
        let token = self.access_token().await?;
        let response = self
            .send(ApiRequest {
                method,
                path: path.clone(),
                bearer: Some(token),
                body: body.clone(),
            })
            .await?;
        if response.status != 401 {
            return Ok(response);
        }

        debug!("401 received, attempting refresh");
        self.refresh().await?;

        let token = self.access_token().await?;
        self.send(ApiRequest {
            method,
            path,
            bearer: Some(token),
            body,
        })
        .await
    }

    /// `POST /api/refresh` — single flight. If another refresh is already
    /// running this is a no-op; the caller proceeds with whatever token it
    /// has.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        if self
            .refresh_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("refresh already in flight, proceeding without one");
            return Ok(());
        }
        let result = self.refresh_inner().await;
        self.refresh_in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn refresh_inner(&self) -> Result<(), ClientError> {
        // Candidate keys are ALWAYS sent; the server decides their fate.
        let candidate = EphemeralKeys::mint();
        let body = {
            let state = self.state.lock().await;
            let State::Active(active) = &*state else {
                return Err(ClientError::NotLoggedIn);
            };
            Self::seal(
                &active.ephemeral,
                &RefreshRequest {
                    new_ed25519_pub_key: candidate.signing.public_hex(),
                    new_x25519_pub_key: candidate.agreement.public_hex(),
                },
            )?
        };

        let response = self
            .send(ApiRequest {
                method: Method::Post,
                path: REFRESH_PATH.into(),
                bearer: None,
                body: Some(body),
            })
            .await?;
        if response.status != 200 {
            let err = server_error(&response);
            if matches!(err, ClientError::SessionExpired) {
                info!("refresh window exhausted, clearing session");
                self.clear_local_state().await?;
            }
            return Err(err);
        }

        let refreshed: hr_proto::api::RefreshResponse = self.open_pinned(&response).await?;

        let mut state = self.state.lock().await;
        let State::Active(active) = &mut *state else {
            return Err(ClientError::NotLoggedIn);
        };
        active.access_token = refreshed.access_token;

        // Rotate if and only if the server says so.
        match (refreshed.server_pub_key, refreshed.server_x25519_pub_key) {
            (Some(new_pub_hex), Some(new_x_hex)) => {
                let new_pub: [u8; 32] = hex::decode(&new_pub_hex)
                    .ok()
                    .and_then(|b| b.try_into().ok())
                    .ok_or(ClientError::Protocol(ApiError::InvalidEncoding))?;
                active.ephemeral = candidate;
                active.server_pub_key = new_pub;
                active.server_x25519_pub_key = new_x_hex;
                info!("session keys rotated");
            }
            _ => {
                debug!("no-rotation window, candidate keys discarded");
            }
        }
        Ok(())
    }

    /// `POST /api/shared-secret`
    pub async fn create_secret(
        &self,
        request: &CreateSecretRequest,
    ) -> Result<CreateSecretResponse, ClientError> {
        let body = {
            let state = self.state.lock().await;
            let State::Active(active) = &*state else {
                return Err(ClientError::NotLoggedIn);
            };
            Self::seal(&active.ephemeral, request)?
        };
        let response = self
            .send_authed(Method::Post, SHARED_SECRET_PATH.into(), Some(body))
            .await?;
        if response.status != 200 {
            return Err(server_error(&response));
        }
        self.open_pinned(&response).await
    }

    /// `GET /api/shared-secret/{url_hash}` — replays a cached OTP when the
    /// caller supplies none, and records the first successful receiver
    /// view so reloads do not burn another read.
    pub async fn view_secret(
        &self,
        url_hash: &str,
        otp: Option<&str>,
    ) -> Result<ViewSecretResponse, ClientError> {
        let cached = self.cache.lookup(url_hash).await?;
        let effective_otp: Option<String> = otp
            .map(str::to_string)
            .or_else(|| cached.as_ref().and_then(|c| c.cached_otp.clone()));

        let mut path = format!("{SHARED_SECRET_PATH}/{url_hash}");
        if let Some(ref o) = effective_otp {
            path.push_str("?otp=");
            path.push_str(o);
        }

        let response = self.send_authed(Method::Get, path, None).await?;
        if response.status != 200 {
            return Err(server_error(&response));
        }
        let view: ViewSecretResponse = self.open_pinned(&response).await?;

        if view.role == SecretRole::Receiver {
            self.cache
                .record_view(url_hash, unix_now(), effective_otp.as_deref())
                .await?;
        }
        Ok(view)
    }

    /// True when this device already consumed a read for `url_hash`; the
    /// UI checks this before re-issuing a decrement-causing view.
    pub async fn has_viewed(&self, url_hash: &str) -> Result<bool, ClientError> {
        self.cache.has_viewed(url_hash).await
    }

    /// `DELETE /api/shared-secret/{url_hash}`
    pub async fn delete_secret(&self, url_hash: &str) -> Result<DeleteSecretResponse, ClientError> {
        let body = {
            let state = self.state.lock().await;
            let State::Active(active) = &*state else {
                return Err(ClientError::NotLoggedIn);
            };
            Self::seal(
                &active.ephemeral,
                &DeleteSecretRequest {
                    url_hash: url_hash.to_string(),
                },
            )?
        };
        let response = self
            .send_authed(Method::Delete, format!("{SHARED_SECRET_PATH}/{url_hash}"), Some(body))
            .await?;
        if response.status != 200 {
            return Err(server_error(&response));
        }
        self.open_pinned(&response).await
    }

    /// `DELETE /api/login` + local wipe. The server side is best-effort;
    /// local keys, cache, and session state always go.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let body = {
            let state = self.state.lock().await;
            match &*state {
                State::Active(active) => Some(Self::seal(&active.ephemeral, &LogoutRequest {})?),
                _ => None,
            }
        };
        if let Some(body) = body {
            match self
                .send_authed(Method::Delete, LOGOUT_PATH.into(), Some(body))
                .await
            {
                Ok(_) => {}
                Err(e) => warn!(error = %e, "server-side logout failed, wiping locally anyway"),
            }
        }
        self.clear_local_state().await
    }

    async fn clear_local_state(&self) -> Result<(), ClientError> {
        self.cache.clear().await?;
        *self.state.lock().await = State::Anonymous;
        info!("local session state cleared");
        Ok(())
    }

    /// Email of the logged-in user (the UI shows it; the server never
    /// stores it).
    pub async fn email(&self) -> Option<String> {
        let state = self.state.lock().await;
        match &*state {
            State::Active(active) => Some(active.email.clone()),
            _ => None,
        }
    }

    /// Base58 user id, when logged in.
    pub async fn user_id(&self) -> Option<String> {
        let state = self.state.lock().await;
        match &*state {
            State::Active(active) => Some(active.user_id.clone()),
            _ => None,
        }
    }

    /// Server session X25519 public key (hex) — the encryption target for
    /// server-to-client E2E payloads.
    pub async fn server_x25519_pub_key(&self) -> Option<String> {
        let state = self.state.lock().await;
        match &*state {
            State::Active(active) => Some(active.server_x25519_pub_key.clone()),
            _ => None,
        }
    }
}
