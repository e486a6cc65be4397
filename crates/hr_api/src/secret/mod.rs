//! Shared-secret engine.
//!
//! Two storage rows per secret (one per role, unlinkable keys) plus one
//! tracking row holding the receiver's read budget. The sender's view never
//! decrements; the receiver's decrement is a conditional update so racing
//! viewers cannot overdraw; deletes are role-gated.
//!
//! - `create` — validation, payload sealing, pair + tracking insert, URLs
//! - `view`   — orphan cleanup, expiry, OTP gate, conditional decrement
//! - `delete` — sender cascade / receiver self-delete
//! - `payload`— the encrypted payload (the only place emails are stored)

mod create;
mod delete;
pub mod payload;
mod view;

pub use create::create;
pub use delete::delete;
pub use view::view;

use tracing::info;

use hr_crypto::kdf::kdf_array;
use hr_proto::ApiError;

use crate::context::Context;
use crate::handlers::storage;

pub const REFERENCE_HASH_LEN: usize = 32;
pub const MAX_SECRET_TEXT_BYTES: usize = 512;
pub const OTP_LEN: usize = 9;

pub const MIN_EXPIRES_HOURS: i64 = 1;
pub const MAX_EXPIRES_HOURS: i64 = 72;
pub const DEFAULT_EXPIRES_HOURS: i64 = 24;

pub const MIN_READS: i64 = 1;
pub const MAX_READS: i64 = 10;
pub const DEFAULT_READS: i64 = 3;
/// Sentinel for the sender's unlimited view.
pub const UNLIMITED_READS: i64 = -1;

/// Per-role storage key: nobody scanning the table can correlate the two
/// views of one secret, or attribute either to a user id.
pub fn db_index(
    master: &[u8; 32],
    reference_hash: &[u8; REFERENCE_HASH_LEN],
    user_id: &[u8; 16],
) -> [u8; 32] {
    let mut input = [0u8; REFERENCE_HASH_LEN + 16];
    input[..REFERENCE_HASH_LEN].copy_from_slice(reference_hash);
    input[REFERENCE_HASH_LEN..].copy_from_slice(user_id);
    kdf_array::<32>("db_index", master, &input)
}

/// Counts from one expiry sweep, per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub secrets: u64,
    pub tracking: u64,
    pub magic_links: u64,
    pub refresh_records: u64,
}

/// Remove everything past its expiry, across all server tables. Run
/// periodically or opportunistically; never logs row contents.
pub async fn sweep_expired(ctx: &Context) -> Result<SweepReport, ApiError> {
    let now = ctx.now();
    let (secrets, tracking) = ctx
        .store
        .secrets_sweep_expired(now)
        .await
        .map_err(storage)?;
    let magic_links = ctx
        .store
        .magic_links_purge_expired(now)
        .await
        .map_err(storage)?;
    let refresh_records = ctx
        .store
        .refresh_purge_expired(now)
        .await
        .map_err(storage)?;

    let report = SweepReport {
        secrets,
        tracking,
        magic_links,
        refresh_records,
    };
    if secrets + tracking + magic_links + refresh_records > 0 {
        info!(?report, "expiry sweep");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::db_index;

    #[test]
    fn db_index_separates_roles_and_users() {
        let master = [1u8; 32];
        let reference = [2u8; 32];
        let a = db_index(&master, &reference, &[3u8; 16]);
        let b = db_index(&master, &reference, &[4u8; 16]);
        assert_ne!(a, b);
        // Same inputs reproduce the same key.
        assert_eq!(a, db_index(&master, &reference, &[3u8; 16]));
    }
}
