//! Everything a `CalendarView` is constructed from.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use parchment_core::CalendarSettings;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stuck at one instant, for tests and previews.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Whether the calendar API client and the identity client finished loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub api_ready: bool,
    pub identity_ready: bool,
}

impl Readiness {
    pub const READY: Self = Self {
        api_ready: true,
        identity_ready: true,
    };

    /// The connect control is offered only once both are ready.
    pub fn can_connect(&self) -> bool {
        self.api_ready && self.identity_ready
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::READY
    }
}

pub struct CalendarContext<S> {
    pub source: S,
    pub readiness: Readiness,
    pub settings: CalendarSettings,
    pub tz: Tz,
    clock: Box<dyn Clock>,
}

impl<S> CalendarContext<S> {
    pub fn new(source: S, settings: CalendarSettings) -> Self {
        let tz = settings.tz();
        Self {
            source,
            readiness: Readiness::default(),
            settings,
            tz,
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Today's date in the display time zone.
    pub fn today(&self) -> NaiveDate {
        self.now().with_timezone(&self.tz).date_naive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_today_uses_display_zone() {
        let settings = CalendarSettings {
            time_zone: "Pacific/Auckland".to_string(),
            ..CalendarSettings::default()
        };
        let ctx = CalendarContext::new((), settings)
            .with_clock(FixedClock("2024-02-29T20:00:00Z".parse().unwrap()));

        assert_eq!(ctx.today(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_readiness_requires_both_clients() {
        assert!(Readiness::READY.can_connect());
        let half = Readiness {
            api_ready: true,
            identity_ready: false,
        };
        assert!(!half.can_connect());
    }
}
