//! # Appointment Store
//!
//! Record types and the persistence contract shared by the dialog, the
//! reminder scheduler and the cleanup sweeper.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;

use crate::features::reminders::ReminderTier;

/// Chat identifier that owns appointments and dialog sessions
pub type OwnerId = i64;

/// Server-assigned appointment identifier
pub type AppointmentId = i64;

/// Storage format for timestamps (naive local time)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A persisted appointment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appointment {
    pub id: AppointmentId,
    pub owner_id: OwnerId,
    pub description: String,
    pub scheduled_at: NaiveDateTime,
    pub tier_5d_fired: bool,
    pub tier_1d_fired: bool,
    pub tier_1h_fired: bool,
    pub created_at: NaiveDateTime,
}

impl Appointment {
    /// Whether the reminder for `tier` has already been delivered
    pub fn is_fired(&self, tier: ReminderTier) -> bool {
        match tier {
            ReminderTier::FiveDays => self.tier_5d_fired,
            ReminderTier::OneDay => self.tier_1d_fired,
            ReminderTier::OneHour => self.tier_1h_fired,
        }
    }

    #[cfg(test)]
    pub fn all_fired(&self) -> bool {
        ReminderTier::ALL.iter().all(|tier| self.is_fired(*tier))
    }
}

/// A validated appointment produced by a completed dialog, not yet persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub owner_id: OwnerId,
    pub description: String,
    pub scheduled_at: NaiveDateTime,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Backend(#[from] sqlite::Error),

    #[error("malformed row: {0}")]
    MalformedRow(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence operations for appointments
///
/// Every operation is a single-row (or single-statement) atomic update;
/// callers never need a multi-row transaction. Owner-scoped operations
/// fail closed: a row belonging to another owner is treated as absent.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Insert a new appointment with all reminder flags cleared
    async fn create(&self, appointment: &NewAppointment) -> Result<AppointmentId, StoreError>;

    /// Owner's appointments scheduled after `now`, soonest first
    async fn list_upcoming(
        &self,
        owner_id: OwnerId,
        now: NaiveDateTime,
    ) -> Result<Vec<Appointment>, StoreError>;

    /// Delete an owner's appointment; `Ok(false)` when no such row exists for that owner
    async fn delete(&self, id: AppointmentId, owner_id: OwnerId) -> Result<bool, StoreError>;

    /// Every appointment scheduled after `now`, regardless of owner
    async fn list_pending_active(&self, now: NaiveDateTime)
        -> Result<Vec<Appointment>, StoreError>;

    /// Set the fired flag for one tier; never clears a flag
    async fn mark_tier(&self, id: AppointmentId, tier: ReminderTier) -> Result<(), StoreError>;

    /// Delete every appointment scheduled strictly before `now`
    async fn delete_expired(&self, now: NaiveDateTime) -> Result<usize, StoreError>;

    async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>, StoreError>;
}
