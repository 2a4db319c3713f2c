//! Time source abstraction for testability.
//!
//! The trace engine compares producer timestamps against "local now" to
//! estimate clock skew, and the printers measure running durations. Both read
//! the clock only through `TimeSource`, so tests can pin it.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Abstraction over wall-clock reads.
pub trait TimeSource: Send + Sync + std::fmt::Debug {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Elapsed time since an earlier instant, zero if `earlier` is in the future.
    fn elapsed_since(&self, earlier: DateTime<Utc>) -> Duration {
        (self.now() - earlier).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Type alias for shared time source.
pub type SharedTimeSource = Arc<dyn TimeSource>;

/// Production implementation using actual system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealTimeSource;

impl RealTimeSource {
    pub fn new() -> Self {
        Self
    }

    pub fn shared() -> SharedTimeSource {
        Arc::new(Self)
    }
}

impl TimeSource for RealTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test implementation with controllable time.
///
/// `now()` is `base + logical elapsed`; time only moves via `advance()`.
#[derive(Debug)]
pub struct TestTimeSource {
    base: DateTime<Utc>,
    logical_nanos: AtomicU64,
}

impl Default for TestTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTimeSource {
    /// Starts at 2024-01-01T00:00:00Z
    pub fn new() -> Self {
        Self::at(DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(1_704_067_200))
    }

    pub fn at(base: DateTime<Utc>) -> Self {
        Self {
            base,
            logical_nanos: AtomicU64::new(0),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Advance logical time by the given duration.
    pub fn advance(&self, duration: Duration) {
        self.logical_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Jump to an absolute instant. Times before `base` clamp to `base`.
    pub fn set(&self, now: DateTime<Utc>) {
        let nanos = (now - self.base)
            .num_nanoseconds()
            .unwrap_or(0)
            .max(0) as u64;
        self.logical_nanos.store(nanos, Ordering::SeqCst);
    }

    /// Logical time elapsed since `base`.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.logical_nanos.load(Ordering::SeqCst))
    }
}

impl TimeSource for TestTimeSource {
    fn now(&self) -> DateTime<Utc> {
        self.base + TimeDelta::nanoseconds(self.logical_nanos.load(Ordering::SeqCst) as i64)
    }
}
