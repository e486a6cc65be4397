//! Outbound email port.
//!
//! The SMTP adapter lives outside this crate; the core only knows this
//! trait. The email body is the single place a plaintext address leaves the
//! process, and it is never persisted or logged.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use hr_proto::ApiError;

use crate::context::Context;

#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    /// BCP-47 tag the delivery adapter uses to pick translated templates.
    pub lang: String,
}

#[derive(Debug, Error)]
#[error("email delivery failed: {0}")]
pub struct MailerError(pub String);

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailerError>;
}

/// Recording adapter for tests and `EMAIL_DRY_RUN` deployments: keeps every
/// message in an outbox instead of delivering it.
#[derive(Default)]
pub struct DryRunMailer {
    outbox: Mutex<Vec<OutboundEmail>>,
}

impl DryRunMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn outbox(&self) -> Vec<OutboundEmail> {
        self.outbox.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.outbox.lock().await.clear();
    }
}

#[async_trait]
impl Mailer for DryRunMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailerError> {
        self.outbox.lock().await.push(email);
        Ok(())
    }
}

/// Dispatch through the context's mailer unless dry-run suppression is on.
/// Failures surface as `TransientEmail` (safe to retry).
pub async fn dispatch(ctx: &Context, email: OutboundEmail) -> Result<(), ApiError> {
    if ctx.email_dry_run() {
        tracing::info!(lang = %email.lang, "email suppressed (dry run)");
        return Ok(());
    }
    ctx.mailer
        .send(email)
        .await
        .map_err(|_| ApiError::TransientEmail)
}
