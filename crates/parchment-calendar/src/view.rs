//! The calendar component: view state, fetch sequencing and rendering.
//!
//! Every fetch is split into a *begin* step, which updates state and issues a
//! [`FetchTicket`], and [`CalendarView::complete`], which applies the result only
//! if no newer ticket has been issued since. The async helpers (`navigate_month`,
//! `switch_view`, ...) chain the two; callers that interleave requests can drive
//! the steps themselves.

use chrono::{DateTime, Utc};
use parchment_core::AuthError;

use crate::context::CalendarContext;
use crate::error::FetchError;
use crate::grid::{attach_events_to_grid, render_month_grid, DisplayedMonth, MonthGrid};
use crate::source::{Credential, EventQuery, EventSource};
use crate::surface::{Body, Controls, DetailOverlay, Surface};
use crate::types::CalendarEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewMode {
    Month,
    List,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Month => "month",
            ViewMode::List => "list",
        }
    }
}

/// A control activated on the rendered surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    PreviousMonth,
    NextMonth,
    SwitchView(ViewMode),
    /// An event summary in the grid or a row in the list
    OpenEvent(String),
    /// The overlay's close buttons
    CloseDetail,
    /// Click on the dimmed region around the overlay content
    OverlayBackground,
    /// Click inside the overlay content
    OverlayContent,
    Connect,
    Disconnect,
}

/// What a fetch was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPurpose {
    Month(DisplayedMonth),
    List,
}

/// An issued fetch. Only the most recently issued ticket may change the view.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    token: u64,
    purpose: FetchPurpose,
    query: EventQuery,
    credential: Credential,
}

impl FetchTicket {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn purpose(&self) -> FetchPurpose {
        self.purpose
    }

    pub fn query(&self) -> &EventQuery {
        &self.query
    }
}

/// Outcome of [`CalendarView::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Rendered,
    /// A newer request superseded this one; the result was dropped
    Stale,
}

/// A month grid together with the events placed on it.
#[derive(Debug, Clone)]
struct CachedMonth {
    grid: MonthGrid,
    events: Vec<CalendarEvent>,
}

pub struct CalendarView<S> {
    ctx: CalendarContext<S>,
    displayed: DisplayedMonth,
    mode: ViewMode,
    credential: Option<Credential>,
    latest_token: u64,
    /// Last populated grid, shown while a fresh month fetch is in flight
    month_cache: Option<CachedMonth>,
    /// Events behind the current body, for opening details
    events: Vec<CalendarEvent>,
    body: Body,
    overlay: Option<DetailOverlay>,
}

impl<S: EventSource> CalendarView<S> {
    /// Month view of the current month, signed out.
    pub fn new(ctx: CalendarContext<S>) -> Self {
        let displayed = DisplayedMonth::containing(ctx.today());
        let grid = render_month_grid(displayed, ctx.today());
        Self {
            ctx,
            displayed,
            mode: ViewMode::Month,
            credential: None,
            latest_token: 0,
            month_cache: None,
            events: Vec::new(),
            body: Body::Month(grid),
            overlay: None,
        }
    }

    pub fn context(&self) -> &CalendarContext<S> {
        &self.ctx
    }

    pub fn displayed_month(&self) -> DisplayedMonth {
        self.displayed
    }

    pub fn view_mode(&self) -> ViewMode {
        self.mode
    }

    pub fn is_signed_in(&self) -> bool {
        self.credential.is_some()
    }

    /// Cached month grid, if any.
    pub fn month_cache(&self) -> Option<&MonthGrid> {
        self.month_cache.as_ref().map(|cached| &cached.grid)
    }

    pub fn surface(&self) -> Surface {
        let signed_in = self.is_signed_in();
        Surface {
            body: self.body.clone(),
            controls: Controls {
                active_view: self.mode,
                navigation: self.mode == ViewMode::Month,
                connect: !signed_in && self.ctx.readiness.can_connect(),
                disconnect: signed_in,
            },
            overlay: self.overlay.clone(),
        }
    }

    /// A bare grid for `month`, with today marked.
    pub fn render_month_grid(&self, month: DisplayedMonth) -> MonthGrid {
        render_month_grid(month, self.ctx.today())
    }

    /// Attach `events` to `grid` using the display time zone.
    pub fn attach_events_to_grid(&self, events: &[CalendarEvent], grid: &mut MonthGrid) -> usize {
        attach_events_to_grid(grid, events, &self.ctx.tz)
    }

    /// One-off fetch outside the view state (no token, nothing rendered).
    pub async fn fetch_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: Option<DateTime<Utc>>,
        max_results: Option<u32>,
    ) -> Result<Vec<CalendarEvent>, FetchError> {
        let credential = self.credential.as_ref().ok_or(FetchError::AuthRequired)?;
        let query = EventQuery::new(
            self.ctx.settings.calendar_id.clone(),
            time_min,
            time_max,
            max_results,
        );
        self.ctx.source.list_events(credential, &query).await
    }

    fn month_query(&self, month: DisplayedMonth) -> EventQuery {
        let (time_min, time_max) = month.time_range(&self.ctx.tz);
        EventQuery::new(
            self.ctx.settings.calendar_id.clone(),
            time_min,
            Some(time_max),
            Some(self.ctx.settings.month_max_results),
        )
    }

    fn upcoming_query(&self, max_results: u32) -> EventQuery {
        EventQuery::new(
            self.ctx.settings.calendar_id.clone(),
            self.ctx.now(),
            None,
            Some(max_results),
        )
    }

    /// Supersede every outstanding ticket.
    fn invalidate(&mut self) -> u64 {
        self.latest_token += 1;
        self.latest_token
    }

    fn issue(&mut self, purpose: FetchPurpose, query: EventQuery) -> Option<FetchTicket> {
        let token = self.invalidate();
        let credential = self.credential.clone()?;
        tracing::debug!(token, ?purpose, "Issuing calendar fetch");
        Some(FetchTicket {
            token,
            purpose,
            query,
            credential,
        })
    }

    /// Render the displayed month, from cache when possible, and request its events.
    fn load_month(&mut self) -> Option<FetchTicket> {
        let month = self.displayed;
        self.overlay = None;

        let cached = match self.month_cache.take() {
            Some(cached) if cached.grid.month == month => cached,
            _ => CachedMonth {
                grid: self.render_month_grid(month),
                events: Vec::new(),
            },
        };
        self.body = Body::Month(cached.grid.clone());
        // Summaries on a cached grid stay clickable during the re-fetch
        self.events = cached.events.clone();
        self.month_cache = Some(cached);

        let query = self.month_query(month);
        self.issue(FetchPurpose::Month(month), query)
    }

    fn load_list(&mut self, max_results: u32) -> Option<FetchTicket> {
        self.overlay = None;
        self.events.clear();

        let query = self.upcoming_query(max_results);
        let ticket = self.issue(FetchPurpose::List, query);
        self.body = if ticket.is_some() {
            Body::Loading
        } else {
            Body::SignedOut
        };
        ticket
    }

    /// The only place the view mode changes.
    fn switch_to(&mut self, mode: ViewMode, list_max_results: u32) -> Option<FetchTicket> {
        if self.mode == ViewMode::Month && mode == ViewMode::List {
            if let Body::Month(grid) = &self.body {
                self.month_cache = Some(CachedMonth {
                    grid: grid.clone(),
                    events: self.events.clone(),
                });
            }
        }
        self.mode = mode;
        match mode {
            ViewMode::Month => self.load_month(),
            ViewMode::List => self.load_list(list_max_results),
        }
    }

    /// Make `month` the displayed month.
    ///
    /// In month view this renders it and, when signed in, requests its events.
    /// In list view it only takes effect on the next switch back to month.
    pub fn begin_show_month(&mut self, month: DisplayedMonth) -> Option<FetchTicket> {
        self.displayed = month;
        if self.mode == ViewMode::List {
            tracing::debug!(month = %month.title(), "Month selected while in list view");
            return None;
        }
        self.load_month()
    }

    /// Move the displayed month by `delta` (normally -1 or +1). Ignored in list view.
    pub fn begin_navigate(&mut self, delta: i32) -> Option<FetchTicket> {
        if self.mode == ViewMode::List {
            tracing::debug!(delta, "Ignoring month navigation in list view");
            return None;
        }
        let target = self.displayed.navigate(delta);
        self.begin_show_month(target)
    }

    /// Switch to the list view and, when signed in, request `max_results` upcoming events.
    pub fn begin_list_view(&mut self, max_results: u32) -> Option<FetchTicket> {
        self.switch_to(ViewMode::List, max_results)
    }

    pub fn begin_switch_view(&mut self, mode: ViewMode) -> Option<FetchTicket> {
        self.switch_to(mode, self.ctx.settings.list_max_results)
    }

    /// Apply a fetch result, unless a newer ticket has been issued.
    pub fn complete(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<CalendarEvent>, FetchError>,
    ) -> Applied {
        if ticket.token != self.latest_token {
            tracing::debug!(
                token = ticket.token,
                latest = self.latest_token,
                "Discarding superseded calendar response"
            );
            return Applied::Stale;
        }

        let events = match result {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!("Calendar fetch failed: {}", e.message());
                if e.should_refresh_token() {
                    self.credential = None;
                }
                self.events.clear();
                self.body = Body::Error(e.user_message());
                return Applied::Rendered;
            }
        };

        match ticket.purpose {
            FetchPurpose::Month(month) => {
                let mut grid = self.render_month_grid(month);
                let attached = self.attach_events_to_grid(&events, &mut grid);
                tracing::info!(month = %month.title(), attached, "Rendered month view");
                self.month_cache = Some(CachedMonth {
                    grid: grid.clone(),
                    events: events.clone(),
                });
                self.body = Body::Month(grid);
            }
            FetchPurpose::List => {
                tracing::info!(rows = events.len(), "Rendered list view");
                self.body = Body::list(&events, &self.ctx.tz);
            }
        }
        self.events = events;
        Applied::Rendered
    }

    /// Fetch on behalf of `ticket` without touching view state.
    pub async fn fetch(&self, ticket: &FetchTicket) -> Result<Vec<CalendarEvent>, FetchError> {
        self.ctx
            .source
            .list_events(&ticket.credential, &ticket.query)
            .await
    }

    async fn run(&mut self, ticket: Option<FetchTicket>) -> Applied {
        match ticket {
            Some(ticket) => {
                let result = self.fetch(&ticket).await;
                self.complete(ticket, result)
            }
            None => Applied::Rendered,
        }
    }

    pub async fn show_month(&mut self, month: DisplayedMonth) -> Applied {
        let ticket = self.begin_show_month(month);
        self.run(ticket).await
    }

    pub async fn navigate_month(&mut self, delta: i32) -> Applied {
        let ticket = self.begin_navigate(delta);
        self.run(ticket).await
    }

    pub async fn render_list_view(&mut self, max_results: u32) -> Applied {
        let ticket = self.begin_list_view(max_results);
        self.run(ticket).await
    }

    pub async fn switch_view(&mut self, mode: ViewMode) -> Applied {
        let ticket = self.begin_switch_view(mode);
        self.run(ticket).await
    }

    /// Dashboard list of the next `max_results` events, rendered on its own.
    ///
    /// Does not touch the calendar region's state.
    pub async fn render_upcoming(&self, max_results: u32) -> Body {
        let Some(credential) = &self.credential else {
            return Body::SignedOut;
        };
        let query = self.upcoming_query(max_results);
        match self.ctx.source.list_events(credential, &query).await {
            Ok(events) => Body::upcoming(&events, &self.ctx.tz),
            Err(e) => {
                tracing::warn!("Upcoming events fetch failed: {}", e.message());
                Body::Error(e.user_message())
            }
        }
    }

    pub fn show_event_detail(&mut self, event: &CalendarEvent) {
        self.overlay = Some(DetailOverlay::from_event(event, &self.ctx.tz));
    }

    /// Open the detail overlay for an event on the current surface.
    pub fn open_event(&mut self, event_id: &str) -> bool {
        let Some(event) = self.events.iter().find(|e| e.id == event_id).cloned() else {
            tracing::debug!(event_id, "Ignoring click on unknown event");
            return false;
        };
        self.show_event_detail(&event);
        true
    }

    pub fn close_detail(&mut self) {
        self.overlay = None;
    }

    /// Sign in, then load the current view.
    pub async fn connect(&mut self) -> Result<(), AuthError> {
        if !self.ctx.readiness.can_connect() {
            tracing::warn!("Connect requested before calendar clients were ready");
            return Err(AuthError::NotConfigured);
        }

        match self.ctx.source.authenticate().await {
            Ok(credential) => {
                tracing::info!("Calendar connected");
                self.credential = Some(credential);
                self.switch_view(self.mode).await;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Calendar sign-in failed: {}", e);
                Err(e)
            }
        }
    }

    /// Revoke the credential and hide all event data.
    ///
    /// The view is signed out even if revocation fails.
    pub async fn disconnect(&mut self) -> Result<(), AuthError> {
        self.invalidate();
        self.month_cache = None;
        self.events.clear();
        self.overlay = None;
        self.body = Body::SignedOut;

        let Some(credential) = self.credential.take() else {
            return Ok(());
        };
        let result = self.ctx.source.revoke(&credential).await;
        if let Err(e) = &result {
            tracing::warn!("Credential revocation failed: {}", e);
        } else {
            tracing::info!("Calendar disconnected");
        }
        result
    }

    /// Route an activated control to its operation.
    pub async fn dispatch(&mut self, action: UserAction) {
        match action {
            UserAction::PreviousMonth => {
                self.navigate_month(-1).await;
            }
            UserAction::NextMonth => {
                self.navigate_month(1).await;
            }
            UserAction::SwitchView(mode) => {
                self.switch_view(mode).await;
            }
            UserAction::OpenEvent(id) => {
                self.open_event(&id);
            }
            UserAction::CloseDetail | UserAction::OverlayBackground => self.close_detail(),
            UserAction::OverlayContent => {}
            UserAction::Connect => {
                // Failure leaves the connect control in place
                let _ = self.connect().await;
            }
            UserAction::Disconnect => {
                let _ = self.disconnect().await;
            }
        }
    }
}
