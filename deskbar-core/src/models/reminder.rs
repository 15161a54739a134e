//! Reminder model and its on-disk form

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user reminder for a calendar day, optionally at a time of day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    /// Unique identifier, also the store key
    pub id: Uuid,
    /// Text shown in the day view and the notification
    pub title: String,
    /// Icon name or markup shown beside the title
    pub icon: Option<String>,
    /// Day the reminder belongs to
    pub date: NaiveDate,
    /// Time of day; `None` for all-day reminders
    pub time: Option<NaiveTime>,
}

/// Stored representation; the id is the map key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderEntry {
    /// Title
    pub title: String,
    /// Optional icon
    #[serde(default)]
    pub icon: Option<String>,
    /// ISO-8601 date
    pub date: NaiveDate,
    /// `HH:MM` or null
    #[serde(with = "hh_mm", default)]
    pub time: Option<NaiveTime>,
}

impl Reminder {
    /// Creates a reminder with a fresh id
    #[must_use]
    pub fn new(title: impl Into<String>, date: NaiveDate, time: Option<NaiveTime>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            icon: None,
            date,
            time: time.map(truncate_to_minute),
        }
    }

    /// Sets the icon
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Rebuilds a reminder from its store key and entry
    #[must_use]
    pub fn from_entry(id: Uuid, entry: ReminderEntry) -> Self {
        Self {
            id,
            title: entry.title,
            icon: entry.icon,
            date: entry.date,
            time: entry.time,
        }
    }

    /// Stored representation
    #[must_use]
    pub fn to_entry(&self) -> ReminderEntry {
        ReminderEntry {
            title: self.title.clone(),
            icon: self.icon.clone(),
            date: self.date,
            time: self.time,
        }
    }

    /// Replaces the supplied fields, keeping the rest
    pub fn update(
        &mut self,
        title: Option<String>,
        icon: Option<String>,
        date: Option<NaiveDate>,
        time: Option<NaiveTime>,
    ) {
        if let Some(title) = title {
            self.title = title;
        }
        if let Some(icon) = icon {
            self.icon = Some(icon);
        }
        if let Some(date) = date {
            self.date = date;
        }
        if let Some(time) = time {
            self.time = Some(truncate_to_minute(time));
        }
    }

    /// Whether the reminder has no time of day
    #[must_use]
    pub const fn is_all_day(&self) -> bool {
        self.time.is_none()
    }

    /// Exact target moment for timed reminders
    #[must_use]
    pub fn target(&self) -> Option<NaiveDateTime> {
        self.time.map(|t| self.date.and_time(t))
    }

    /// True once `date + retention` is on or before `today`
    #[must_use]
    pub fn is_expired(&self, today: NaiveDate, retention: chrono::Duration) -> bool {
        self.date
            .checked_add_signed(retention)
            .is_some_and(|limit| limit <= today)
    }

    /// Label used in lists: `title @ HH:MM` or just the title
    #[must_use]
    pub fn display_label(&self) -> String {
        match self.time {
            Some(t) => format!("{} @ {}", self.title, t.format("%H:%M")),
            None => self.title.clone(),
        }
    }
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    use chrono::Timelike;
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

/// `Option<NaiveTime>` as `"HH:MM"` / null
pub(crate) mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => serializer.serialize_str(&t.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| parse(&s).map_err(serde::de::Error::custom))
            .transpose()
    }

    pub fn parse(s: &str) -> Result<NaiveTime, String> {
        NaiveTime::parse_from_str(s, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S%.f"))
            .map_err(|e| format!("invalid time '{s}': {e}"))
    }
}

/// Parses `HH:MM` (or `HH:MM:SS`) user input
///
/// # Errors
///
/// Returns a message describing the rejected input.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, String> {
    hh_mm::parse(s.trim()).map(truncate_to_minute)
}
