//! Calendar state: today's date, the selected date and month navigation

use std::rc::Rc;

use chrono::{Datelike, Month, NaiveDate};

use crate::clock::Clock;
use crate::config::HolidayEntry;
use crate::observable::{Property, Signal};

/// Tracks the current day and the date selected in the calendar view
pub struct CalendarService {
    clock: Rc<dyn Clock>,
    holidays: Vec<HolidayEntry>,
    /// Today's date, refreshed by [`Self::poll_for_date_change`]
    pub today: Property<NaiveDate>,
    /// Date highlighted in the calendar view
    pub selected_date: Property<NaiveDate>,
    /// Fired with the new date after `today` changes
    pub day_changed: Signal<NaiveDate>,
}

impl std::fmt::Debug for CalendarService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarService")
            .field("today", &self.today.get())
            .field("selected_date", &self.selected_date.get())
            .finish_non_exhaustive()
    }
}

impl CalendarService {
    /// Starts with today selected
    #[must_use]
    pub fn new(clock: Rc<dyn Clock>, holidays: Vec<HolidayEntry>) -> Self {
        let today = clock.today();
        Self {
            clock,
            holidays,
            today: Property::new(today),
            selected_date: Property::new(today),
            day_changed: Signal::new(),
        }
    }

    /// Re-reads the clock; on a new date updates `today` and fires
    /// `day_changed`. Returns whether the date changed.
    pub fn poll_for_date_change(&self) -> bool {
        let today = self.clock.today();
        if !self.today.set(today) {
            return false;
        }
        tracing::debug!(%today, "Date changed");
        self.day_changed.emit(&today);
        true
    }

    /// Every day of the weeks (Sunday first) overlapping the selected month
    #[must_use]
    pub fn month_calendar(&self) -> Vec<NaiveDate> {
        let selected = self.selected_date.get();
        let Some(first) = selected.with_day(1) else {
            return Vec::new();
        };
        let last = first
            .with_day(days_in_month(first.year(), first.month()))
            .unwrap_or(first);

        let start = first - chrono::Duration::days(i64::from(first.weekday().num_days_from_sunday()));
        let end = last + chrono::Duration::days(i64::from(6 - last.weekday().num_days_from_sunday()));
        start.iter_days().take_while(|d| *d <= end).collect()
    }

    /// English name of the selected month
    #[must_use]
    pub fn month_name(&self) -> &'static str {
        month_name(self.selected_date.get().month())
    }

    /// Selects `date`
    pub fn select_date(&self, date: NaiveDate) {
        self.selected_date.set(date);
    }

    /// Moves the selection back one day
    pub fn select_prev_day(&self) {
        if let Some(date) = self.selected_date.get().pred_opt() {
            self.select_date(date);
        }
    }

    /// Moves the selection forward one day
    pub fn select_next_day(&self) {
        if let Some(date) = self.selected_date.get().succ_opt() {
            self.select_date(date);
        }
    }

    /// Same day in the previous month, clamped to its length
    pub fn select_prev_month(&self) {
        let selected = self.selected_date.get();
        let (year, month) = if selected.month() == 1 {
            (selected.year() - 1, 12)
        } else {
            (selected.year(), selected.month() - 1)
        };
        self.select_clamped(year, month, selected.day());
    }

    /// Same day in the next month, clamped to its length
    pub fn select_next_month(&self) {
        let selected = self.selected_date.get();
        let (year, month) = if selected.month() == 12 {
            (selected.year() + 1, 1)
        } else {
            (selected.year(), selected.month() + 1)
        };
        self.select_clamped(year, month, selected.day());
    }

    /// Same day and month a year earlier
    pub fn select_prev_year(&self) {
        let selected = self.selected_date.get();
        self.select_clamped(selected.year() - 1, selected.month(), selected.day());
    }

    /// Same day and month a year later
    pub fn select_next_year(&self) {
        let selected = self.selected_date.get();
        self.select_clamped(selected.year() + 1, selected.month(), selected.day());
    }

    /// Month `month` (1-12) of the selected year; out-of-range values are ignored
    pub fn select_month(&self, month: u32) {
        if !(1..=12).contains(&month) {
            tracing::warn!(month, "Ignoring invalid month");
            return;
        }
        let selected = self.selected_date.get();
        self.select_clamped(selected.year(), month, selected.day());
    }

    /// Names of the configured holidays falling on `date`
    #[must_use]
    pub fn holidays_on(&self, date: NaiveDate) -> Vec<String> {
        self.holidays
            .iter()
            .filter(|h| h.month == date.month() && h.day == date.day())
            .map(|h| h.name.clone())
            .collect()
    }

    fn select_clamped(&self, year: i32, month: u32, day: u32) {
        let day = day.min(days_in_month(year, month));
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            self.select_date(date);
        }
    }
}

/// English month name for 1-12, empty otherwise
#[must_use]
pub fn month_name(month: u32) -> &'static str {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map_or("", |m| m.name())
}

fn days_in_month(year: i32, month: u32) -> u32 {
    (28..=31)
        .rev()
        .find(|day| NaiveDate::from_ymd_opt(year, month, *day).is_some())
        .unwrap_or(28)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Weekday;
    use std::cell::RefCell;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn service_at(day: NaiveDate) -> (Rc<ManualClock>, CalendarService) {
        let clock = Rc::new(ManualClock::new(day.and_hms_opt(23, 59, 0).unwrap()));
        let holidays = vec![HolidayEntry {
            name: "New Year's Day".to_string(),
            month: 1,
            day: 1,
        }];
        let service = CalendarService::new(clock.clone(), holidays);
        (clock, service)
    }

    #[test]
    fn test_poll_detects_rollover_once() {
        let (clock, service) = service_at(date(2026, 10, 18));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        service.day_changed.connect(move |d| s.borrow_mut().push(*d));

        assert!(!service.poll_for_date_change());
        clock.advance(chrono::Duration::minutes(2));
        assert!(service.poll_for_date_change());
        assert!(!service.poll_for_date_change());
        assert_eq!(*seen.borrow(), vec![date(2026, 10, 19)]);
        assert_eq!(service.today.get(), date(2026, 10, 19));
    }

    #[test]
    fn test_month_calendar_whole_weeks_sunday_first() {
        let (_clock, service) = service_at(date(2026, 10, 18));
        let days = service.month_calendar();
        assert_eq!(days.len() % 7, 0);
        assert_eq!(days[0].weekday(), Weekday::Sun);
        assert_eq!(days.last().unwrap().weekday(), Weekday::Sat);
        assert!(days.contains(&date(2026, 10, 1)));
        assert!(days.contains(&date(2026, 10, 31)));
        // October 2026 starts on a Thursday
        assert_eq!(days[0], date(2026, 9, 27));
    }

    #[test]
    fn test_month_navigation_clamps_day() {
        let (_clock, service) = service_at(date(2026, 3, 31));
        service.select_prev_month();
        assert_eq!(service.selected_date.get(), date(2026, 2, 28));
        service.select_month(12);
        assert_eq!(service.selected_date.get(), date(2026, 12, 28));
        service.select_next_month();
        assert_eq!(service.selected_date.get(), date(2027, 1, 28));
        assert_eq!(service.month_name(), "January");
    }

    #[test]
    fn test_year_navigation_from_leap_day() {
        let (_clock, service) = service_at(date(2028, 2, 29));
        service.select_next_year();
        assert_eq!(service.selected_date.get(), date(2029, 2, 28));
        service.select_prev_year();
        assert_eq!(service.selected_date.get(), date(2028, 2, 28));
    }

    #[test]
    fn test_day_navigation_and_invalid_month() {
        let (_clock, service) = service_at(date(2026, 12, 31));
        service.select_next_day();
        assert_eq!(service.selected_date.get(), date(2027, 1, 1));
        service.select_prev_day();
        service.select_month(13);
        assert_eq!(service.selected_date.get(), date(2026, 12, 31));
    }

    #[test]
    fn test_holidays() {
        let (_clock, service) = service_at(date(2026, 1, 1));
        assert_eq!(service.holidays_on(date(2027, 1, 1)), vec!["New Year's Day"]);
        assert!(service.holidays_on(date(2027, 1, 2)).is_empty());
    }
}
