//! Month grid layout and event placement.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::format;
use crate::types::CalendarEvent;

/// Six rows of seven days.
pub const GRID_CELLS: usize = 42;

pub const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// A (year, zero-based month) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayedMonth {
    year: i32,
    month0: u32,
}

impl DisplayedMonth {
    /// `None` when `month0` is not 0..=11 or the month is outside chrono's range.
    pub fn new(year: i32, month0: u32) -> Option<Self> {
        if month0 > 11 {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month0 + 1, 1)?;
        // The next month's first day bounds the range, so it must exist too
        let (next_year, next_month0) = if month0 == 11 {
            (year.checked_add(1)?, 0)
        } else {
            (year, month0 + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month0 + 1, 1)?;
        Some(Self { year, month0 })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month0: date.month0(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month0(&self) -> u32 {
        self.month0
    }

    /// Shift by `delta` months, rolling the year at either end.
    ///
    /// Stays put if the result would leave the representable range.
    pub fn navigate(self, delta: i32) -> Self {
        let total = i64::from(self.year) * 12 + i64::from(self.month0) + i64::from(delta);
        let year = total.div_euclid(12);
        let month0 = total.rem_euclid(12) as u32;
        i32::try_from(year)
            .ok()
            .and_then(|y| Self::new(y, month0))
            .unwrap_or(self)
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month0 + 1, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn days_in_month(&self) -> u32 {
        let next = self.navigate(1).first_day();
        next.signed_duration_since(self.first_day()).num_days() as u32
    }

    pub fn last_day(&self) -> NaiveDate {
        self.first_day() + Duration::days(i64::from(self.days_in_month()) - 1)
    }

    /// Whole month in `tz`: first instant inclusive, next month's first instant exclusive.
    pub fn time_range(&self, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            start_of_day(self.first_day(), tz),
            start_of_day(self.navigate(1).first_day(), tz),
        )
    }

    /// "February 2024"
    pub fn title(&self) -> String {
        format!("{} {}", MONTH_NAMES[self.month0 as usize], self.year)
    }
}

/// First instant of `date` in `tz`, skipping a DST gap at midnight.
pub fn start_of_day(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::default());
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => tz
            .from_local_datetime(&(midnight + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight)),
    }
}

/// Canonical `YYYY-MM-DD` key tying events to day cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            self.0.month(),
            self.0.day()
        )
    }
}

impl FromStr for DateKey {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Self)
    }
}

/// Which month a grid cell belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellMonth {
    Previous,
    Current,
    Next,
}

/// Compact event line inside a day cell, e.g. "07:30 PM - Rank Night".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSummary {
    pub event_id: String,
    pub time_label: String,
    pub title: String,
}

impl EventSummary {
    pub fn label(&self) -> String {
        format!("{} - {}", self.time_label, self.title)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayCell {
    pub day: u32,
    pub month: CellMonth,
    /// Only current-month cells are keyed
    pub key: Option<DateKey>,
    pub is_today: bool,
    pub events: Vec<EventSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthGrid {
    pub month: DisplayedMonth,
    pub cells: Vec<DayCell>,
}

impl MonthGrid {
    pub fn title(&self) -> String {
        self.month.title()
    }

    fn count(&self, which: CellMonth) -> usize {
        self.cells.iter().filter(|c| c.month == which).count()
    }

    pub fn leading_count(&self) -> usize {
        self.count(CellMonth::Previous)
    }

    pub fn current_count(&self) -> usize {
        self.count(CellMonth::Current)
    }

    pub fn trailing_count(&self) -> usize {
        self.count(CellMonth::Next)
    }

    pub fn cell(&self, key: DateKey) -> Option<&DayCell> {
        self.cells.iter().find(|c| c.key == Some(key))
    }

    fn cell_mut(&mut self, key: DateKey) -> Option<&mut DayCell> {
        self.cells.iter_mut().find(|c| c.key == Some(key))
    }

    pub fn summary_count(&self) -> usize {
        self.cells.iter().map(|c| c.events.len()).sum()
    }

    /// Cells in display order, seven per row.
    pub fn weeks(&self) -> impl Iterator<Item = &[DayCell]> {
        self.cells.chunks(7)
    }
}

/// Lay out a 6x7 grid for `month`, marking `today` if it falls inside.
pub fn render_month_grid(month: DisplayedMonth, today: NaiveDate) -> MonthGrid {
    let first = month.first_day();
    let days = month.days_in_month();
    let leading = first.weekday().num_days_from_sunday();
    let trailing = GRID_CELLS as u32 - (leading + days);
    let previous_last = month.navigate(-1).days_in_month();

    let mut cells = Vec::with_capacity(GRID_CELLS);

    for i in 0..leading {
        cells.push(DayCell {
            day: previous_last - leading + i + 1,
            month: CellMonth::Previous,
            key: None,
            is_today: false,
            events: Vec::new(),
        });
    }

    for (offset, date) in first.iter_days().take(days as usize).enumerate() {
        cells.push(DayCell {
            day: offset as u32 + 1,
            month: CellMonth::Current,
            key: Some(DateKey::new(date)),
            is_today: date == today,
            events: Vec::new(),
        });
    }

    for day in 1..=trailing {
        cells.push(DayCell {
            day,
            month: CellMonth::Next,
            key: None,
            is_today: false,
            events: Vec::new(),
        });
    }

    MonthGrid { month, cells }
}

/// Place each event in the cell matching its local start date.
///
/// Events outside the grid are dropped; an event already present in its cell
/// is not added twice. Returns how many summaries were added.
pub fn attach_events_to_grid(grid: &mut MonthGrid, events: &[CalendarEvent], tz: &Tz) -> usize {
    let mut attached = 0;

    for event in events {
        let Some(cell) = grid.cell_mut(event.date_key(tz)) else {
            continue;
        };
        if cell.events.iter().any(|s| s.event_id == event.id) {
            continue;
        }
        cell.events.push(EventSummary {
            event_id: event.id.clone(),
            time_label: format::time_label(&event.start, tz),
            title: event.title.clone(),
        });
        attached += 1;
    }

    attached
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::types::EventTiming;

    fn month(year: i32, month0: u32) -> DisplayedMonth {
        DisplayedMonth::new(year, month0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn all_day(id: &str, day: NaiveDate) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            title: format!("Event {}", id),
            description: None,
            location: None,
            start: EventTiming::AllDay(day),
            end: None,
            html_link: None,
        }
    }

    #[test]
    fn test_every_month_has_42_cells() {
        let today = date(2024, 6, 1);
        for year in [1900, 1999, 2000, 2023, 2024, 2100] {
            for m in 0..12 {
                let grid = render_month_grid(month(year, m), today);
                assert_eq!(grid.cells.len(), GRID_CELLS, "{}-{}", year, m);
                assert_eq!(
                    grid.leading_count() + grid.current_count() + grid.trailing_count(),
                    GRID_CELLS
                );
                assert_eq!(grid.current_count() as u32, grid.month.days_in_month());
            }
        }
    }

    #[test]
    fn test_leap_february_2024() {
        let grid = render_month_grid(month(2024, 1), date(2030, 1, 1));
        assert_eq!(grid.current_count(), 29);
        assert_eq!(grid.leading_count(), 4);
        assert_eq!(grid.trailing_count(), 9);
        // Leading cells count back from January 31
        let leading: Vec<u32> = grid.cells[..4].iter().map(|c| c.day).collect();
        assert_eq!(leading, vec![28, 29, 30, 31]);
        assert_eq!(grid.cells[4].key, Some(DateKey::new(date(2024, 2, 1))));
        assert_eq!(grid.cells[41].day, 9);
        assert_eq!(grid.title(), "February 2024");
    }

    #[test]
    fn test_month_starting_sunday_has_no_leading_cells() {
        // September 2024 starts on a Sunday
        let grid = render_month_grid(month(2024, 8), date(2030, 1, 1));
        assert_eq!(grid.leading_count(), 0);
        assert_eq!(grid.cells[0].key, Some(DateKey::new(date(2024, 9, 1))));
    }

    #[test]
    fn test_today_marked_only_in_current_month() {
        let today = date(2024, 2, 14);
        let grid = render_month_grid(month(2024, 1), today);
        let marked: Vec<_> = grid.cells.iter().filter(|c| c.is_today).collect();
        assert_eq!(marked.len(), 1);
        assert_eq!(marked[0].key, Some(DateKey::new(today)));

        let other = render_month_grid(month(2024, 2), today);
        assert!(other.cells.iter().all(|c| !c.is_today));
    }

    #[test]
    fn test_navigation_rolls_year() {
        assert_eq!(month(2024, 0).navigate(-1), month(2023, 11));
        assert_eq!(month(2024, 11).navigate(1), month(2025, 0));
        assert_eq!(month(2024, 5).navigate(1), month(2024, 6));
        assert_eq!(month(2024, 5).navigate(-13), month(2023, 4));
    }

    #[test]
    fn test_invalid_month_rejected() {
        assert!(DisplayedMonth::new(2024, 12).is_none());
    }

    #[test]
    fn test_date_key_format() {
        let key = DateKey::new(date(2024, 3, 5));
        assert_eq!(key.to_string(), "2024-03-05");
        assert_eq!("2024-03-05".parse::<DateKey>().unwrap(), key);
    }

    #[test]
    fn test_time_range_in_zone() {
        let (start, end) = month(2024, 1).time_range(&chrono_tz::America::New_York);
        assert_eq!(start, "2024-02-01T05:00:00Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(end, "2024-03-01T05:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_midnight_dst_gap_uses_first_valid_instant() {
        // Chile skipped 2022-09-11 00:00 local
        let start = start_of_day(date(2022, 9, 11), &chrono_tz::America::Santiago);
        assert_eq!(start, "2022-09-11T04:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_event_attaches_only_to_matching_cell() {
        let mut grid = render_month_grid(month(2024, 2), date(2030, 1, 1));
        let attached = attach_events_to_grid(
            &mut grid,
            &[all_day("ides", date(2024, 3, 15))],
            &chrono_tz::UTC,
        );

        assert_eq!(attached, 1);
        let key: DateKey = "2024-03-15".parse().unwrap();
        for cell in &grid.cells {
            if cell.key == Some(key) {
                assert_eq!(cell.events.len(), 1);
                assert_eq!(cell.events[0].label(), "All Day - Event ides");
            } else {
                assert!(cell.events.is_empty());
            }
        }
    }

    #[test]
    fn test_attach_is_idempotent() {
        let events = vec![
            all_day("a", date(2024, 3, 1)),
            all_day("b", date(2024, 3, 1)),
            all_day("c", date(2024, 3, 20)),
        ];
        let mut once = render_month_grid(month(2024, 2), date(2030, 1, 1));
        attach_events_to_grid(&mut once, &events, &chrono_tz::UTC);

        let mut twice = render_month_grid(month(2024, 2), date(2030, 1, 1));
        attach_events_to_grid(&mut twice, &events, &chrono_tz::UTC);
        let second = attach_events_to_grid(&mut twice, &events, &chrono_tz::UTC);

        assert_eq!(second, 0);
        assert_eq!(once, twice);
        assert_eq!(twice.summary_count(), 3);
    }

    #[test]
    fn test_out_of_range_events_dropped() {
        let mut grid = render_month_grid(month(2024, 2), date(2030, 1, 1));
        // Feb 29 is rendered as a leading cell, which carries no key
        let attached = attach_events_to_grid(
            &mut grid,
            &[all_day("leap", date(2024, 2, 29)), all_day("apr", date(2024, 4, 1))],
            &chrono_tz::UTC,
        );
        assert_eq!(attached, 0);
        assert_eq!(grid.summary_count(), 0);
    }

    #[test]
    fn test_timed_event_uses_local_date() {
        let mut grid = render_month_grid(month(2024, 2), date(2030, 1, 1));
        let event = CalendarEvent {
            start: EventTiming::Timed("2024-03-15T02:30:00Z".parse().unwrap()),
            ..all_day("late", date(2000, 1, 1))
        };
        attach_events_to_grid(&mut grid, &[event], &chrono_tz::America::New_York);

        let cell = grid.cell("2024-03-14".parse().unwrap()).unwrap();
        assert_eq!(cell.events[0].label(), "10:30 PM - Event late");
    }

    #[test]
    fn test_weeks_are_rows_of_seven() {
        let grid = render_month_grid(month(2024, 1), date(2030, 1, 1));
        assert_eq!(grid.weeks().count(), 6);
        assert!(grid.weeks().all(|w| w.len() == 7));
    }
}
