//! TTL presets
//!
//! Conventions shared by callers; the store accepts any duration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// One hour (3600 s)
pub const HOUR: Duration = Duration::from_secs(3_600);

/// One day (86400 s)
pub const DAY: Duration = Duration::from_secs(86_400);

/// One week (604800 s)
pub const WEEK: Duration = Duration::from_secs(604_800);

/// Thirty days (2592000 s)
pub const MONTH: Duration = Duration::from_secs(2_592_000);

/// Named or explicit TTL, as accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// [`HOUR`]
    Hour,
    /// [`DAY`]
    Day,
    /// [`WEEK`]
    Week,
    /// [`MONTH`]
    Month,
    /// Explicit number of seconds
    Seconds(u64),
}

impl Ttl {
    /// Duration this TTL stands for
    pub fn duration(self) -> Duration {
        match self {
            Ttl::Hour => HOUR,
            Ttl::Day => DAY,
            Ttl::Week => WEEK,
            Ttl::Month => MONTH,
            Ttl::Seconds(secs) => Duration::from_secs(secs),
        }
    }
}

impl From<Ttl> for Duration {
    fn from(ttl: Ttl) -> Self {
        ttl.duration()
    }
}

impl FromStr for Ttl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" => Ok(Ttl::Hour),
            "day" => Ok(Ttl::Day),
            "week" => Ok(Ttl::Week),
            "month" => Ok(Ttl::Month),
            other => other
                .parse::<u64>()
                .map(Ttl::Seconds)
                .map_err(|_| format!("invalid ttl '{}': expected hour, day, week, month or seconds", s)),
        }
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ttl::Hour => write!(f, "hour"),
            Ttl::Day => write!(f, "day"),
            Ttl::Week => write!(f, "week"),
            Ttl::Month => write!(f, "month"),
            Ttl::Seconds(secs) => write!(f, "{}s", secs),
        }
    }
}
