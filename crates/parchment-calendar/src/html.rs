//! HTML rendering of a [`Surface`] through the `surface.html` template.
//!
//! Controls carry `data-action` attributes naming the [`UserAction`] they emit,
//! so a host page can route clicks back through `CalendarView::dispatch`.
//!
//! [`UserAction`]: crate::view::UserAction

use askama::Template;

use crate::grid::{CellMonth, DayCell, WEEKDAY_LABELS};
use crate::surface::{Body, DetailOverlay, Surface, NO_EVENTS_MESSAGE, SIGNED_OUT_MESSAGE};
use crate::view::ViewMode;

struct Toggle {
    view: &'static str,
    label: &'static str,
    active: bool,
}

#[derive(Template)]
#[template(path = "surface.html")]
struct SurfaceTemplate<'a> {
    toggles: Vec<Toggle>,
    connect: bool,
    disconnect: bool,
    navigation: bool,
    title: Option<String>,
    body: &'a Body,
    overlay: Option<&'a DetailOverlay>,
    weekday_labels: [&'static str; 7],
    signed_out_message: &'static str,
    no_events_message: &'static str,
}

impl DayCell {
    fn css_class(&self) -> String {
        let mut class = String::from("calendar-day");
        if self.month != CellMonth::Current {
            class.push_str(" other-month");
        }
        if self.is_today {
            class.push_str(" today");
        }
        class
    }
}

/// Render `surface` as the calendar region's markup. Text is HTML-escaped.
pub fn render_html(surface: &Surface) -> Result<String, askama::Error> {
    let toggles = [(ViewMode::Month, "Month"), (ViewMode::List, "List")]
        .into_iter()
        .map(|(mode, label)| Toggle {
            view: mode.as_str(),
            label,
            active: surface.is_selected(mode),
        })
        .collect();

    // Arrows stay over an error body
    let title = match &surface.body {
        Body::Month(grid) => Some(grid.title()),
        _ => None,
    };

    SurfaceTemplate {
        toggles,
        connect: surface.controls.connect,
        disconnect: surface.controls.disconnect,
        navigation: surface.controls.navigation,
        title,
        body: &surface.body,
        overlay: surface.overlay.as_ref(),
        weekday_labels: WEEKDAY_LABELS,
        signed_out_message: SIGNED_OUT_MESSAGE,
        no_events_message: NO_EVENTS_MESSAGE,
    }
    .render()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::grid::{render_month_grid, DisplayedMonth};
    use crate::surface::Controls;
    use chrono::NaiveDate;

    fn controls(mode: ViewMode) -> Controls {
        Controls {
            active_view: mode,
            navigation: mode == ViewMode::Month,
            connect: true,
            disconnect: false,
        }
    }

    #[test]
    fn test_list_rows_are_escaped() {
        let surface = Surface {
            body: Body::List(vec![crate::surface::ListRow {
                event_id: "e\"1".into(),
                day: 8,
                month_abbrev: "Feb".into(),
                time_label: "07:30 PM".into(),
                title: "<b>Tom & Jerry</b>".into(),
                description: None,
            }]),
            controls: controls(ViewMode::List),
            overlay: None,
        };
        let html = render_html(&surface).unwrap();

        assert!(html.contains("&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;"));
        assert!(!html.contains("<b>"));
        assert!(!html.contains("data-event-id=\"e\"1\""));
        assert!(!html.contains("event-description"));
    }

    #[test]
    fn test_month_grid_markup() {
        let month = DisplayedMonth::new(2024, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 2, 14).unwrap();
        let surface = Surface {
            body: Body::Month(render_month_grid(month, today)),
            controls: controls(ViewMode::Month),
            overlay: None,
        };
        let html = render_html(&surface).unwrap();

        assert!(html.contains("<h3>February 2024</h3>"));
        assert_eq!(html.matches("class=\"calendar-day").count(), 42);
        assert!(html.contains("class=\"calendar-day today\" data-date=\"2024-02-14\""));
        assert!(html.contains("data-action=\"previous-month\""));
        assert!(html.contains("data-action=\"connect\""));
        assert_eq!(html.matches("calendar-view-btn active").count(), 1);
    }

    #[test]
    fn test_list_view_has_no_navigation() {
        let surface = Surface {
            body: Body::NoEvents,
            controls: controls(ViewMode::List),
            overlay: None,
        };
        let html = render_html(&surface).unwrap();

        assert!(html.contains(NO_EVENTS_MESSAGE));
        assert!(!html.contains("previous-month"));
        assert!(!html.contains("calendar-header"));
        assert!(html.contains("class=\"calendar-view-btn active\" data-action=\"switch-view\" data-view=\"list\""));
    }

    #[test]
    fn test_error_keeps_month_navigation() {
        let surface = Surface {
            body: Body::Error("Too many requests. Please wait 60 seconds.".into()),
            controls: controls(ViewMode::Month),
            overlay: None,
        };
        let html = render_html(&surface).unwrap();

        assert!(html.contains("<p class=\"error\">"));
        assert!(html.contains("data-action=\"previous-month\""));
        assert!(html.contains("data-action=\"next-month\""));
    }

    #[test]
    fn test_overlay_is_escaped() {
        let surface = Surface {
            body: Body::SignedOut,
            controls: controls(ViewMode::List),
            overlay: Some(DetailOverlay {
                event_id: "e1".into(),
                title: "<script>".into(),
                start: "Monday, February 19, 2024".into(),
                end: None,
                description: None,
                location: None,
                link: None,
            }),
        };
        let html = render_html(&surface).unwrap();

        assert!(html.contains("<h3>&lt;script&gt;</h3>"));
        assert!(!html.contains("<strong>End:</strong>"));
        assert!(!html.contains("View in Google Calendar"));
        assert_eq!(html.matches("data-action=\"close-detail\"").count(), 2);
    }
}
