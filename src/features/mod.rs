//! # Features
//!
//! - `reminders`: tiered reminder scheduler and expired-appointment sweeper
//! - `scheduling`: appointment creation dialog and per-owner session registry

pub mod reminders;
pub mod scheduling;

pub use reminders::{CleanupSweeper, DiscordNotifier, Notifier, ReminderScheduler, ReminderTier};
pub use scheduling::{DialogStep, SessionKey, SessionRegistry, TurnOutcome};
