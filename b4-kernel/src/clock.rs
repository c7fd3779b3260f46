use chrono::{DateTime, Utc};

/// Injected time source so the planning pipeline never reads the wall clock
/// directly — replaying the same [`crate::context::PlanningContext`] through
/// the same `Clock` must produce byte-identical `order_intents` (§8 property 1).
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed-instant clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
