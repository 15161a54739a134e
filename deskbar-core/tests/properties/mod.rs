//! Property test suites

mod observable_tests;
mod reminder_schedule_tests;
mod reminder_store_tests;
mod todo_tests;
