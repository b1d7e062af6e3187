//! Wall-clock abstraction for stage timestamps.

use chrono::{DateTime, SecondsFormat, Utc};

/// Source of the current time, swappable for deterministic tests.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Current time as an RFC 3339 string with second precision.
    fn rfc3339(&self) -> String {
        self.now().to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    /// Clock frozen at a fixed instant.
    pub(crate) struct FixedClock(pub DateTime<Utc>);

    impl FixedClock {
        pub(crate) fn at(secs: i64) -> Self {
            Self(Utc.timestamp_opt(secs, 0).single().unwrap())
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }
}
