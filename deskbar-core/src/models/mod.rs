//! Data models persisted or published by the services

mod notification;
mod reminder;
mod todo;

pub use notification::{Notification, NotificationRequest, Urgency};
pub use reminder::{Reminder, ReminderEntry, parse_time_of_day};
pub use todo::{ToDoItem, ToDoItemEntry, ToDoItemParent, ToDoParentEntry};
