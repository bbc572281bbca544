//! Time source injection.
//!
//! The engine never reads the system clock directly; every component that
//! needs "now" takes a `Arc<dyn Clock>`. Production wiring uses
//! [`SystemClock`]; tests use [`FixedClock`] or [`StepClock`] for
//! deterministic timelines (session resets, candle rolls, AI daily resets).

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now_utc(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant. Useful for candle/session boundary tests.
#[derive(Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A clock whose value can be advanced explicitly between assertions.
#[derive(Debug)]
pub struct StepClock(Mutex<DateTime<Utc>>);

impl StepClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self(Mutex::new(start))
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.0.lock();
        *guard += delta;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.0.lock() = at;
    }
}

impl Clock for StepClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}
