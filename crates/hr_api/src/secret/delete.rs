//! Role-gated deletion.
//!
//! Sender: cascade — the sender row and the tracking row go together; the
//! receiver row becomes the documented orphan that the next view reaps.
//! Receiver: self-delete of its own view only, and only while reads
//! remain; an exhausted receiver has nothing left to give up.

use tracing::info;

use hr_proto::api::{DeleteSecretResponse, SecretRole};
use hr_proto::ApiError;

use crate::context::Context;
use crate::fingerprint;
use crate::handlers::storage;

use super::db_index;

pub async fn delete(
    ctx: &Context,
    caller: &[u8; 16],
    url_hash: &str,
) -> Result<DeleteSecretResponse, ApiError> {
    let (reference_hash, role) =
        fingerprint::decode(ctx.master(), url_hash, caller).map_err(|e| match e {
            ApiError::InvalidChecksum => ApiError::forbidden(),
            other => other,
        })?;
    let index = db_index(ctx.master(), &reference_hash, caller);

    let Some(tracking) = ctx
        .store
        .tracking_get(&reference_hash)
        .await
        .map_err(storage)?
    else {
        // Already cascaded; clean up whatever this viewer still had.
        ctx.store.secret_delete_row(&index).await.map_err(storage)?;
        return Err(ApiError::Gone);
    };

    match role {
        SecretRole::Sender => {
            ctx.store
                .secret_delete_cascade(&index, &reference_hash)
                .await
                .map_err(storage)?;
            info!("sender cascade delete");
        }
        SecretRole::Receiver => {
            if tracking.pending_reads <= 0 {
                return Err(ApiError::forbidden());
            }
            ctx.store.secret_delete_row(&index).await.map_err(storage)?;
            info!("receiver view deleted");
        }
    }

    Ok(DeleteSecretResponse {
        status: "deleted".into(),
        role,
    })
}
