//! In-process notification record

use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Notification urgency (freedesktop levels)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// Background information
    Low,
    /// Regular notification
    #[default]
    Normal,
    /// Stays until dismissed
    Critical,
}

impl Urgency {
    /// CSS class used by popups
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Low => "notification-low",
            Self::Normal => "notification-normal",
            Self::Critical => "notification-critical",
        }
    }
}

/// A notification held by the notification service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Service-assigned id
    pub id: u32,
    /// Sending application
    pub app_name: String,
    /// Title line
    pub summary: String,
    /// Body text
    pub body: String,
    /// Icon name
    pub icon: Option<String>,
    /// Urgency
    pub urgency: Urgency,
    /// How long a popup stays; `None` means until dismissed
    pub timeout: Option<Duration>,
    /// Arrival time
    pub created_at: DateTime<Local>,
}

/// Fields supplied by the sender; the service assigns id and timestamp
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotificationRequest {
    /// Sending application
    pub app_name: String,
    /// Title line
    pub summary: String,
    /// Body text
    pub body: String,
    /// Icon name
    pub icon: Option<String>,
    /// Urgency
    pub urgency: Urgency,
    /// Popup timeout override
    pub timeout: Option<Duration>,
}

impl NotificationRequest {
    /// Request with summary and body, normal urgency
    #[must_use]
    pub fn new(summary: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            app_name: "deskbar".to_string(),
            summary: summary.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    /// Sets the icon
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Sets the urgency
    #[must_use]
    pub const fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = urgency;
        self
    }
}
