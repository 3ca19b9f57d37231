//! Reminder lead-time tiers

use chrono::Duration;

/// One of the three fixed lead times before an appointment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReminderTier {
    FiveDays,
    OneDay,
    OneHour,
}

impl ReminderTier {
    /// Evaluation order within a single appointment
    pub const ALL: [ReminderTier; 3] = [
        ReminderTier::FiveDays,
        ReminderTier::OneDay,
        ReminderTier::OneHour,
    ];

    /// Maximum remaining time at which this tier becomes due
    pub fn threshold(self) -> Duration {
        match self {
            ReminderTier::FiveDays => Duration::days(5),
            ReminderTier::OneDay => Duration::days(1),
            ReminderTier::OneHour => Duration::hours(1),
        }
    }

    pub fn is_due(self, remaining: Duration) -> bool {
        remaining <= self.threshold()
    }

    pub fn label(self) -> &'static str {
        match self {
            ReminderTier::FiveDays => "5d",
            ReminderTier::OneDay => "1d",
            ReminderTier::OneHour => "1h",
        }
    }
}

impl std::fmt::Display for ReminderTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
