//! Environment configuration.
//!
//! Rotating `SERVER_MASTER_KEY` invalidates every existing URL, token, and
//! identity — it is the root of all derivations.

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

/// Process exit codes for operational tooling.
pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_STORAGE: i32 = 3;

pub const DEFAULT_REFRESH_TTL_SECS: i64 = 3 * 86_400;
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 900;
pub const DEFAULT_MAGIC_TTL_SECS: i64 = 900;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required variable {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 32-byte root key, from hex or standard Base64.
    pub master_key: [u8; 32],
    /// Refresh-record lifetime `R`; the rotation window opens at `R/3`.
    pub refresh_ttl_secs: i64,
    pub access_ttl_secs: i64,
    pub magic_ttl_secs: i64,
    /// Start with outbound email suppressed (also toggleable at runtime in
    /// test deployments).
    pub email_dry_run: bool,
    pub database_path: PathBuf,
}

impl ServerConfig {
    /// Load from process environment, applying defaults for everything but
    /// the master key.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_master =
            std::env::var("SERVER_MASTER_KEY").map_err(|_| ConfigError::Missing("SERVER_MASTER_KEY"))?;

        Ok(Self {
            master_key: parse_master_key(&raw_master)?,
            refresh_ttl_secs: ttl_var("REFRESH_TTL_SECONDS", DEFAULT_REFRESH_TTL_SECS)?,
            access_ttl_secs: ttl_var("ACCESS_TTL_SECONDS", DEFAULT_ACCESS_TTL_SECS)?,
            magic_ttl_secs: ttl_var("MAGIC_TTL_SECONDS", DEFAULT_MAGIC_TTL_SECS)?,
            email_dry_run: bool_var("EMAIL_DRY_RUN")?,
            database_path: std::env::var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("hashrand.db")),
        })
    }

    /// Test/bench configuration with a fixed master key and short windows.
    pub fn for_tests(master_key: [u8; 32]) -> Self {
        Self {
            master_key,
            refresh_ttl_secs: DEFAULT_REFRESH_TTL_SECS,
            access_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
            magic_ttl_secs: DEFAULT_MAGIC_TTL_SECS,
            email_dry_run: false,
            database_path: PathBuf::new(),
        }
    }
}

/// Accept 64 hex chars or standard Base64 of exactly 32 bytes.
fn parse_master_key(raw: &str) -> Result<[u8; 32], ConfigError> {
    let trimmed = raw.trim();
    let bytes = match hex::decode(trimmed) {
        Ok(b) => b,
        Err(_) => STANDARD
            .decode(trimmed)
            .map_err(|_| ConfigError::Invalid("SERVER_MASTER_KEY is neither hex nor base64".into()))?,
    };
    bytes
        .try_into()
        .map_err(|_| ConfigError::Invalid("SERVER_MASTER_KEY must decode to 32 bytes".into()))
}

fn ttl_var(name: &'static str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => {
            let secs: i64 = raw
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("{name} must be an integer")))?;
            if secs <= 0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
            Ok(secs)
        }
    }
}

fn bool_var(name: &'static str) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(false),
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" | "" => Ok(false),
            other => Err(ConfigError::Invalid(format!("{name}: unrecognized value {other:?}"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_key_accepts_hex_and_base64() {
        let key = [0x5Au8; 32];
        assert_eq!(parse_master_key(&hex::encode(key)).unwrap(), key);
        assert_eq!(parse_master_key(&STANDARD.encode(key)).unwrap(), key);
    }

    #[test]
    fn master_key_rejects_wrong_size() {
        assert!(parse_master_key(&hex::encode([1u8; 16])).is_err());
        assert!(parse_master_key("definitely-not-a-key").is_err());
    }
}
