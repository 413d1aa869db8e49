//! The calendar backend as seen by `CalendarView`.

use std::future::Future;

use chrono::{DateTime, Utc};
use parchment_core::AuthError;

use crate::error::FetchError;
use crate::types::CalendarEvent;

/// Opaque bearer credential handed out by the identity flow.
pub type Credential = parchment_auth::TokenSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    StartTime,
}

impl OrderBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderBy::StartTime => "startTime",
        }
    }
}

/// An events.list request. `time_min` is inclusive, `time_max` exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub calendar_id: String,
    pub time_min: DateTime<Utc>,
    pub time_max: Option<DateTime<Utc>>,
    pub max_results: Option<u32>,
    pub show_deleted: bool,
    pub single_events: bool,
    pub order_by: OrderBy,
}

impl EventQuery {
    /// Non-deleted, recurrence-expanded events ordered by start time.
    pub fn new(
        calendar_id: impl Into<String>,
        time_min: DateTime<Utc>,
        time_max: Option<DateTime<Utc>>,
        max_results: Option<u32>,
    ) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            time_min,
            time_max,
            max_results,
            show_deleted: false,
            single_events: true,
            order_by: OrderBy::StartTime,
        }
    }
}

/// Supplies events for a time range and manages the credential that unlocks them.
pub trait EventSource {
    /// Run the identity flow and yield a credential.
    fn authenticate(&self) -> impl Future<Output = Result<Credential, AuthError>> + Send;

    /// Events matching `query`, in the order the query asks for.
    fn list_events(
        &self,
        credential: &Credential,
        query: &EventQuery,
    ) -> impl Future<Output = Result<Vec<CalendarEvent>, FetchError>> + Send;

    /// Invalidate `credential`.
    fn revoke(&self, credential: &Credential) -> impl Future<Output = Result<(), AuthError>> + Send;
}
