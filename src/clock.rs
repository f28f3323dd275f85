//! Wall clock pinned to one civil timezone.
//!
//! Every "today" comparison in the organizer goes through [`Clock::today`], so
//! due dates, habit keys and recurring occurrences all agree on the same
//! calendar day regardless of where the process runs.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::utils;

pub const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";

#[derive(Debug, Error)]
pub enum ClockError {
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

#[derive(Debug, Clone, Copy)]
pub struct Clock {
    tz: Tz,
    pinned: Option<DateTime<Utc>>,
}

impl Clock {
    /// Clock that reads the system time
    pub fn new(tz: Tz) -> Self {
        Self { tz, pinned: None }
    }

    /// Clock stuck at one instant
    pub fn fixed(tz: Tz, instant: DateTime<Utc>) -> Self {
        Self {
            tz,
            pinned: Some(instant),
        }
    }

    /// Build a system clock from an IANA timezone name
    pub fn from_timezone_name(name: &str) -> Result<Self, ClockError> {
        let tz: Tz = name
            .parse()
            .map_err(|_| ClockError::UnknownTimezone(name.to_string()))?;
        Ok(Self::new(tz))
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.pinned.unwrap_or_else(Utc::now)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().with_timezone(&self.tz).date_naive()
    }

    pub fn today_key(&self) -> String {
        utils::date_key(self.today())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn today_follows_configured_timezone() {
        // 02:00 UTC is still the previous evening in São Paulo (UTC-3)
        let instant = Utc.with_ymd_and_hms(2024, 3, 10, 2, 0, 0).unwrap();
        let clock = Clock::fixed(chrono_tz::America::Sao_Paulo, instant);
        assert_eq!(clock.today_key(), "2024-03-09");

        let utc_clock = Clock::fixed(chrono_tz::UTC, instant);
        assert_eq!(utc_clock.today_key(), "2024-03-10");
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        assert!(Clock::from_timezone_name("Mars/Olympus").is_err());
        assert!(Clock::from_timezone_name(DEFAULT_TIMEZONE).is_ok());
    }
}
