//! Exempt endpoints — the only responses that skip the envelope.

use hr_proto::api::{DryRunToggleResponse, VersionResponse};

use crate::context::Context;

/// `GET /api/version`
pub fn version() -> VersionResponse {
    VersionResponse {
        name: env!("CARGO_PKG_NAME").into(),
        version: env!("CARGO_PKG_VERSION").into(),
    }
}

/// `GET /api/test/dry-run?enabled=` — test deployments only; the router
/// must not expose this in production.
pub fn set_email_dry_run(ctx: &Context, enabled: bool) -> DryRunToggleResponse {
    ctx.set_email_dry_run(enabled);
    DryRunToggleResponse {
        enabled: ctx.email_dry_run(),
    }
}
