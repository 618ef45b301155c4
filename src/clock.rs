//! Injectable clock so TTL-gating logic in `lifecycle` and `matching` can be
//! exercised deterministically in tests (SPEC_FULL.md §10.4) instead of
//! calling `chrono::Utc::now()` directly.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock, used everywhere outside tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
