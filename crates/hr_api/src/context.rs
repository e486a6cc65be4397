//! Service context — constructed once at process entry, threaded by
//! reference through every handler. Replaces any temptation toward
//! singletons or ambient globals.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use hr_store::Store;

use crate::config::ServerConfig;
use crate::email::Mailer;

/// Time source. `System` in production; `Fixed` lets window-arithmetic
/// tests step through the refresh lifecycle without sleeping.
#[derive(Clone)]
pub enum Clock {
    System,
    Fixed(Arc<AtomicI64>),
}

impl Clock {
    pub fn system() -> Self {
        Clock::System
    }

    pub fn fixed(start: i64) -> Self {
        Clock::Fixed(Arc::new(AtomicI64::new(start)))
    }

    pub fn now(&self) -> i64 {
        match self {
            Clock::System => chrono::Utc::now().timestamp(),
            Clock::Fixed(t) => t.load(Ordering::SeqCst),
        }
    }

    /// Advance a fixed clock (no-op on the system clock).
    pub fn advance(&self, secs: i64) {
        if let Clock::Fixed(t) = self {
            t.fetch_add(secs, Ordering::SeqCst);
        }
    }
}

pub struct Context {
    pub config: ServerConfig,
    pub store: Store,
    pub mailer: Arc<dyn Mailer>,
    clock: Clock,
    email_dry_run: AtomicBool,
}

impl Context {
    /// Open storage at the configured path and assemble the context.
    pub async fn new(
        config: ServerConfig,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, hr_store::StoreError> {
        let store = Store::open(&config.database_path).await?;
        Ok(Self::with_store(config, store, mailer, Clock::system()))
    }

    /// Assemble from parts (tests use an in-memory store and fixed clock).
    pub fn with_store(
        config: ServerConfig,
        store: Store,
        mailer: Arc<dyn Mailer>,
        clock: Clock,
    ) -> Self {
        let email_dry_run = AtomicBool::new(config.email_dry_run);
        Self {
            config,
            store,
            mailer,
            clock,
            email_dry_run,
        }
    }

    pub fn master(&self) -> &[u8; 32] {
        &self.config.master_key
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn email_dry_run(&self) -> bool {
        self.email_dry_run.load(Ordering::SeqCst)
    }

    pub fn set_email_dry_run(&self, enabled: bool) {
        self.email_dry_run.store(enabled, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::Clock;

    #[test]
    fn fixed_clock_advances() {
        let clock = Clock::fixed(1_000);
        assert_eq!(clock.now(), 1_000);
        clock.advance(90);
        assert_eq!(clock.now(), 1_090);
    }
}
