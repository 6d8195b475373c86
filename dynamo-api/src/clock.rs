//! Injectable clock for JWT expiry/skew checks.
//!
//! Grounded on `caliber-api/src/auth.rs`'s `JwtClock`/`SystemClock`/`FixedClock`
//! pattern: verification never calls `Utc::now()` directly, so tests can exercise
//! expiry/skew edges without sleeping.

use chrono::{DateTime, Utc};

pub trait JwtClock: std::fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl JwtClock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
pub mod test_clocks {
    use super::FixedClock;
    use chrono::{DateTime, TimeZone, Utc};

    pub fn reference_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap()
    }

    pub fn valid() -> FixedClock {
        FixedClock(reference_time())
    }
}
