//! Calendar event types and the Google API wire format.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::grid::DateKey;

/// When an event starts or ends: a concrete instant, or a whole date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTiming {
    Timed(DateTime<Utc>),
    AllDay(NaiveDate),
}

impl EventTiming {
    pub fn is_all_day(&self) -> bool {
        matches!(self, EventTiming::AllDay(_))
    }

    /// Calendar date as seen in `tz`. All-day dates are not shifted.
    pub fn local_date(&self, tz: &Tz) -> NaiveDate {
        match self {
            EventTiming::Timed(dt) => dt.with_timezone(tz).date_naive(),
            EventTiming::AllDay(d) => *d,
        }
    }
}

/// Calendar event as received from an EventSource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: EventTiming,
    pub end: Option<EventTiming>,
    pub html_link: Option<String>,
}

impl CalendarEvent {
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    pub fn date_key(&self, tz: &Tz) -> DateKey {
        DateKey::new(self.start.local_date(tz))
    }
}

// API Response Types

/// Google Calendar API event resource (the fields the widget reads).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvent {
    pub id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<ApiEventTime>,
    pub end: Option<ApiEventTime>,
    pub status: Option<String>,
    pub html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEventTime {
    pub date_time: Option<String>,
    pub date: Option<String>,
    pub time_zone: Option<String>,
}

/// API response for event list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListResponse {
    #[serde(default)]
    pub items: Vec<ApiEvent>,
    pub next_page_token: Option<String>,
}

impl CalendarEvent {
    /// Resolve an API record once; records without a usable start are rejected.
    pub fn from_api(api: ApiEvent) -> Result<Self, FetchError> {
        let start = api
            .start
            .as_ref()
            .and_then(parse_event_time)
            .ok_or_else(|| FetchError::InvalidEventData(format!("event {} has no start", api.id)))?;

        let end = api.end.as_ref().and_then(parse_event_time);

        let title = match api.summary {
            Some(s) if !s.trim().is_empty() => s,
            _ => "(No title)".to_string(),
        };

        Ok(Self {
            id: api.id,
            title,
            description: api.description.filter(|d| !d.is_empty()),
            location: api.location.filter(|l| !l.is_empty()),
            start,
            end,
            html_link: api.html_link,
        })
    }
}

fn parse_event_time(api: &ApiEventTime) -> Option<EventTiming> {
    if let Some(dt_str) = &api.date_time {
        if let Ok(dt) = DateTime::parse_from_rfc3339(dt_str) {
            return Some(EventTiming::Timed(dt.with_timezone(&Utc)));
        }
    }
    if let Some(date_str) = &api.date {
        if let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
            return Some(EventTiming::AllDay(date));
        }
    }
    None
}
