//! Declarative description of what the calendar region shows.
//!
//! A `Surface` replaces the region's previous content wholesale, controls included.

use chrono::Datelike;
use chrono_tz::Tz;

use crate::format;
use crate::grid::MonthGrid;
use crate::types::CalendarEvent;
use crate::view::{UserAction, ViewMode};

pub const SIGNED_OUT_MESSAGE: &str = "Please sign in to view your calendar events.";
pub const NO_EVENTS_MESSAGE: &str = "No upcoming events found.";

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// A fetch is in flight
    Loading,
    SignedOut,
    Month(MonthGrid),
    List(Vec<ListRow>),
    Upcoming(Vec<UpcomingRow>),
    NoEvents,
    /// Inline, user-legible failure
    Error(String),
}

impl Body {
    /// Rows for the list view, or the "no events" state when there are none.
    pub fn list(events: &[CalendarEvent], tz: &Tz) -> Self {
        if events.is_empty() {
            return Body::NoEvents;
        }
        Body::List(events.iter().map(|e| ListRow::from_event(e, tz)).collect())
    }

    pub fn upcoming(events: &[CalendarEvent], tz: &Tz) -> Self {
        if events.is_empty() {
            return Body::NoEvents;
        }
        Body::Upcoming(
            events
                .iter()
                .map(|e| UpcomingRow::from_event(e, tz))
                .collect(),
        )
    }

    /// Identifiers of events the body lets the user open.
    ///
    /// The upcoming panel is display-only.
    pub fn event_ids(&self) -> Vec<&str> {
        match self {
            Body::Month(grid) => grid
                .cells
                .iter()
                .flat_map(|c| c.events.iter().map(|s| s.event_id.as_str()))
                .collect(),
            Body::List(rows) => rows.iter().map(|r| r.event_id.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

/// One row of the list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    pub event_id: String,
    pub day: u32,
    pub month_abbrev: String,
    pub time_label: String,
    pub title: String,
    /// Already truncated for display
    pub description: Option<String>,
}

impl ListRow {
    pub fn from_event(event: &CalendarEvent, tz: &Tz) -> Self {
        let date = event.start.local_date(tz);
        Self {
            event_id: event.id.clone(),
            day: date.day(),
            month_abbrev: format::month_abbrev(date),
            time_label: format::time_label(&event.start, tz),
            title: event.title.clone(),
            description: event
                .description
                .as_deref()
                .map(format::truncate_description),
        }
    }
}

/// One entry of the dashboard's upcoming-events list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingRow {
    pub event_id: String,
    pub when: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
}

impl UpcomingRow {
    pub fn from_event(event: &CalendarEvent, tz: &Tz) -> Self {
        Self {
            event_id: event.id.clone(),
            when: format::long_date(&event.start, tz),
            title: event.title.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
        }
    }
}

/// Event detail shown over the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailOverlay {
    pub event_id: String,
    pub title: String,
    pub start: String,
    pub end: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub link: Option<String>,
}

impl DetailOverlay {
    pub fn from_event(event: &CalendarEvent, tz: &Tz) -> Self {
        Self {
            event_id: event.id.clone(),
            title: event.title.clone(),
            start: format::long_date(&event.start, tz),
            end: event.end.as_ref().map(|t| format::long_date(t, tz)),
            description: event.description.clone(),
            location: event.location.clone(),
            link: event.html_link.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    /// The single selected view toggle
    pub active_view: ViewMode,
    /// Previous/next month buttons
    pub navigation: bool,
    pub connect: bool,
    pub disconnect: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub body: Body,
    pub controls: Controls,
    pub overlay: Option<DetailOverlay>,
}

impl Surface {
    /// Every action the rendered surface can emit.
    pub fn actions(&self) -> Vec<UserAction> {
        let mut actions = Vec::new();
        let controls = &self.controls;

        if controls.navigation {
            actions.push(UserAction::PreviousMonth);
            actions.push(UserAction::NextMonth);
        }
        actions.push(UserAction::SwitchView(ViewMode::Month));
        actions.push(UserAction::SwitchView(ViewMode::List));
        if controls.connect {
            actions.push(UserAction::Connect);
        }
        if controls.disconnect {
            actions.push(UserAction::Disconnect);
        }

        actions.extend(
            self.body
                .event_ids()
                .into_iter()
                .map(|id| UserAction::OpenEvent(id.to_string())),
        );

        if self.overlay.is_some() {
            actions.push(UserAction::CloseDetail);
            actions.push(UserAction::OverlayBackground);
            actions.push(UserAction::OverlayContent);
        }

        actions
    }

    /// Whether the toggle for `mode` is the selected one.
    pub fn is_selected(&self, mode: ViewMode) -> bool {
        self.controls.active_view == mode
    }
}
