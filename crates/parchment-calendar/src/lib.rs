//! Google Calendar widget for the Parchment site.
//!
//! `CalendarView` owns the month/list view state and renders a declarative
//! [`Surface`]; an [`EventSource`] supplies the events.

pub mod client;
pub mod context;
pub mod error;
pub mod format;
pub mod google;
pub mod grid;
pub mod html;
pub mod source;
pub mod surface;
pub mod types;
pub mod view;

pub use client::CalendarClient;
pub use context::{CalendarContext, Clock, FixedClock, Readiness, SystemClock};
pub use error::FetchError;
pub use google::GoogleEventSource;
pub use grid::{
    attach_events_to_grid, render_month_grid, CellMonth, DateKey, DayCell, DisplayedMonth,
    EventSummary, MonthGrid, GRID_CELLS,
};
pub use html::render_html;
pub use source::{Credential, EventQuery, EventSource, OrderBy};
pub use surface::{Body, Controls, DetailOverlay, ListRow, Surface, UpcomingRow};
pub use types::{CalendarEvent, EventTiming};
pub use view::{Applied, CalendarView, FetchPurpose, FetchTicket, UserAction, ViewMode};
