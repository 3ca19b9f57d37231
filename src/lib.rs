// Core layer - configuration and formatting
pub mod core;

// Features layer - reminders and the scheduling dialog
pub mod features;

// Infrastructure
pub mod database;
pub mod store;

// Application layer
pub mod command_handler;
pub mod commands;

pub use core::Config;
pub use database::Database;
pub use store::{Appointment, AppointmentStore, NewAppointment, OwnerId, StoreError};

pub use features::{
    // Reminders
    CleanupSweeper, DiscordNotifier, Notifier, ReminderScheduler, ReminderTier,
    // Scheduling
    DialogStep, SessionKey, SessionRegistry, TurnOutcome,
};
