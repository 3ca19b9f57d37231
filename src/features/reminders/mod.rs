//! # Reminders Feature
//!
//! Tiered appointment reminders (5 days, 1 day, 1 hour before) and the
//! periodic cleanup of past appointments.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod message;
pub mod notifier;
pub mod scheduler;
pub mod sweeper;
pub mod tier;

pub use notifier::{DiscordNotifier, Notifier, NotifyError};
pub use scheduler::{ReminderScheduler, TickFailure, TickReport};
pub use sweeper::CleanupSweeper;
pub use tier::ReminderTier;
