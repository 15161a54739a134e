//! Reminder commands.

use std::fmt::Write as _;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use deskbar_core::store::JsonStore;
use deskbar_core::{
    Clock, Reminder, ReminderEntry, ReminderPolicy, SystemClock, Urgency,
    notification_for, plan_notifications,
};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::util::{load_settings, open_reminders, resolve_id, short_id};

/// Reminder as printed by `list --format json`
#[derive(Debug, Serialize)]
pub struct ReminderOutput {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl From<&Reminder> for ReminderOutput {
    fn from(reminder: &Reminder) -> Self {
        Self {
            id: reminder.id.to_string(),
            title: reminder.title.clone(),
            date: reminder.date,
            time: reminder.time.map(|t| t.format("%H:%M").to_string()),
            icon: reminder.icon.clone(),
        }
    }
}

/// A notification the scheduler would raise
#[derive(Debug, Serialize)]
pub struct UpcomingOutput {
    pub reminder_id: String,
    pub fires_at: NaiveDateTime,
    pub summary: String,
    pub body: String,
    pub urgency: Urgency,
}

/// Add reminder command handler
pub fn cmd_add(
    config_path: Option<&Path>,
    title: String,
    date: NaiveDate,
    time: Option<NaiveTime>,
    icon: Option<String>,
) -> Result<(), CliError> {
    let settings = load_settings(config_path)?;
    let service = open_reminders(&settings)?;

    let mut reminder = Reminder::new(title, date, time);
    reminder.icon = icon;
    service.add_reminder(reminder.clone());

    println!("Added reminder {} ({})", reminder.display_label(), reminder.id);
    Ok(())
}

/// List reminders command handler
pub fn cmd_list(
    config_path: Option<&Path>,
    date: Option<NaiveDate>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let settings = load_settings(config_path)?;
    let service = open_reminders(&settings)?;

    let reminders = match date {
        Some(date) => service.reminders_by_date(date),
        None => service.reminders(),
    };

    match format {
        OutputFormat::Table => println!("{}", format_table(&reminders)),
        OutputFormat::Json => {
            let output: Vec<ReminderOutput> = reminders.iter().map(Into::into).collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

/// Format reminders as a table string
#[must_use]
pub fn format_table(reminders: &[Reminder]) -> String {
    if reminders.is_empty() {
        return "No reminders found.".to_string();
    }

    let mut output = String::new();
    let _ = writeln!(output, "{:<8}  {:<10}  {:<5}  TITLE", "ID", "DATE", "TIME");
    let _ = writeln!(output, "{:-<8}  {:-<10}  {:-<5}  {:-<5}", "", "", "", "");
    for reminder in reminders {
        let time = reminder
            .time
            .map_or_else(|| "-".to_string(), |t| t.format("%H:%M").to_string());
        let _ = writeln!(
            output,
            "{:<8}  {:<10}  {:<5}  {}",
            short_id(reminder.id),
            reminder.date,
            time,
            reminder.title
        );
    }
    output.trim_end().to_string()
}

/// Delete reminder command handler
pub fn cmd_delete(config_path: Option<&Path>, id: &str) -> Result<(), CliError> {
    let settings = load_settings(config_path)?;
    let service = open_reminders(&settings)?;

    let ids = service.reminders().into_iter().map(|r| r.id);
    let id = resolve_id("Reminder", ids, id)?;
    service.delete_reminder(id);

    println!("Deleted reminder {id}");
    Ok(())
}

/// Sweep command handler
///
/// Opening the service already runs the retention sweep, so the count is
/// taken from the file before it is opened.
pub fn cmd_sweep(config_path: Option<&Path>) -> Result<(), CliError> {
    let settings = load_settings(config_path)?;
    let (_, stored) = JsonStore::<ReminderEntry>::open(settings.storage.reminders_path())?;
    let before = stored.len();

    let service = open_reminders(&settings)?;
    let removed = before.saturating_sub(service.reminders().len());

    println!(
        "Removed {removed} reminder(s) older than {} days",
        settings.reminders.retention_days
    );
    Ok(())
}

/// Upcoming notifications command handler
pub fn cmd_upcoming(config_path: Option<&Path>, format: OutputFormat) -> Result<(), CliError> {
    let settings = load_settings(config_path)?;
    let service = open_reminders(&settings)?;

    let upcoming = upcoming(&service.reminders(), SystemClock.now(), service.policy());
    match format {
        OutputFormat::Table => println!("{}", format_upcoming(&upcoming)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&upcoming)?),
    }
    Ok(())
}

/// Every notification the reminders would raise from `now`, soonest first
#[must_use]
pub fn upcoming(reminders: &[Reminder], now: NaiveDateTime, policy: &ReminderPolicy) -> Vec<UpcomingOutput> {
    let mut output: Vec<UpcomingOutput> = reminders
        .iter()
        .flat_map(|reminder| {
            plan_notifications(reminder, now, policy)
                .into_iter()
                .filter_map(move |planned| {
                    let delay = chrono::Duration::from_std(planned.delay).ok()?;
                    let request = notification_for(reminder, planned.kind);
                    Some(UpcomingOutput {
                        reminder_id: reminder.id.to_string(),
                        fires_at: now + delay,
                        summary: request.summary,
                        body: request.body,
                        urgency: request.urgency,
                    })
                })
        })
        .collect();
    output.sort_by_key(|u| u.fires_at);
    output
}

fn format_upcoming(upcoming: &[UpcomingOutput]) -> String {
    if upcoming.is_empty() {
        return "Nothing scheduled.".to_string();
    }
    let mut output = String::new();
    let _ = writeln!(output, "{:<8}  {:<24}  BODY", "FIRES", "SUMMARY");
    let _ = writeln!(output, "{:-<8}  {:-<24}  {:-<4}", "", "", "");
    for entry in upcoming {
        let _ = writeln!(
            output,
            "{:<8}  {:<24}  {}",
            entry.fires_at.format("%H:%M:%S"),
            entry.summary,
            entry.body
        );
    }
    output.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_upcoming_sorted_and_future_only() {
        let today = at(0, 0).date();
        let standup = Reminder::new("Standup", today, NaiveTime::from_hms_opt(9, 30, 0));
        let flight = Reminder::new("Flight", today.succ_opt().unwrap(), None);
        let policy = ReminderPolicy::default();

        let upcoming = upcoming(&[standup, flight], at(9, 12), &policy);
        let summaries: Vec<&str> = upcoming.iter().map(|u| u.summary.as_str()).collect();
        // 30 and 60 minute leads have passed; the day-before notice fires a minute in
        assert_eq!(
            summaries,
            ["Tomorrow", "Reminder in 10 minutes", "Reminder in 5 minutes", "Now"]
        );
        assert!(upcoming.windows(2).all(|w| w[0].fires_at <= w[1].fires_at));
        assert_eq!(upcoming.last().map(|u| u.fires_at), Some(at(9, 30)));
    }

    #[test]
    fn test_table_lists_all_day_with_dash() {
        let reminder = Reminder::new("Dentist", at(0, 0).date(), None);
        let table = format_table(&[reminder]);
        assert!(table.contains("Dentist"));
        assert!(table.lines().nth(2).is_some_and(|l| l.contains("  -  ")));
    }
}
