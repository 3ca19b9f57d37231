//! # Database
//!
//! SQLite persistence for appointments.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use async_trait::async_trait;
use chrono::{NaiveDateTime, Timelike};
use log::{debug, info};
use sqlite::{Connection, State, Statement};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::features::reminders::ReminderTier;
use crate::store::{
    Appointment, AppointmentId, AppointmentStore, NewAppointment, OwnerId, StoreError,
    TIMESTAMP_FORMAT,
};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS appointments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER NOT NULL,
        description TEXT NOT NULL,
        scheduled_at TEXT NOT NULL,
        tier_5d_fired INTEGER NOT NULL DEFAULT 0,
        tier_1d_fired INTEGER NOT NULL DEFAULT 0,
        tier_1h_fired INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime'))
    );
    CREATE INDEX IF NOT EXISTS idx_appointments_scheduled_at ON appointments(scheduled_at);
    CREATE INDEX IF NOT EXISTS idx_appointments_owner ON appointments(owner_id, scheduled_at);
";

const SELECT_COLUMNS: &str = "SELECT id, owner_id, description, scheduled_at, \
     tier_5d_fired, tier_1d_fired, tier_1h_fired, created_at FROM appointments";

#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and apply the schema
    pub async fn new(database_path: &str) -> Result<Self, StoreError> {
        info!("Opening appointment database at {database_path}");
        let connection = sqlite::open(database_path)?;
        Self::with_connection(connection)
    }

    /// Private in-memory database, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(sqlite::open(":memory:")?)
    }

    fn with_connection(connection: Connection) -> Result<Self, StoreError> {
        connection.execute(SCHEMA)?;
        debug!("Appointment schema ready");
        Ok(Database {
            connection: Arc::new(Mutex::new(connection)),
        })
    }
}

/// Column holding the fired flag for a tier
///
/// The tier set is closed, so the update statement is always built from one
/// of these static identifiers and never from caller-supplied text.
fn tier_column(tier: ReminderTier) -> &'static str {
    match tier {
        ReminderTier::FiveDays => "tier_5d_fired",
        ReminderTier::OneDay => "tier_1d_fired",
        ReminderTier::OneHour => "tier_1h_fired",
    }
}

fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Smallest whole second not before `value`
///
/// Stored timestamps have second granularity, so a strict `< now` cut-off
/// must compare against `now` rounded up or a row at 14:30:00 would survive
/// a sweep at 14:30:00.5.
fn round_up_to_second(value: NaiveDateTime) -> NaiveDateTime {
    let whole = value - chrono::Duration::nanoseconds(i64::from(value.nanosecond()));
    if whole == value {
        value
    } else {
        whole + chrono::Duration::seconds(1)
    }
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, StoreError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map_err(|e| StoreError::MalformedRow(format!("bad timestamp '{raw}': {e}")))
}

fn read_appointment(statement: &Statement<'_>) -> Result<Appointment, StoreError> {
    let scheduled_at: String = statement.read("scheduled_at")?;
    let created_at: String = statement.read("created_at")?;
    Ok(Appointment {
        id: statement.read("id")?,
        owner_id: statement.read("owner_id")?,
        description: statement.read("description")?,
        scheduled_at: parse_timestamp(&scheduled_at)?,
        tier_5d_fired: statement.read::<i64, _>("tier_5d_fired")? != 0,
        tier_1d_fired: statement.read::<i64, _>("tier_1d_fired")? != 0,
        tier_1h_fired: statement.read::<i64, _>("tier_1h_fired")? != 0,
        created_at: parse_timestamp(&created_at)?,
    })
}

/// Rows touched by the last statement on this connection
fn changes(conn: &Connection) -> Result<usize, StoreError> {
    let mut statement = conn.prepare("SELECT changes()")?;
    statement.next()?;
    let count = statement.read::<i64, _>(0)?;
    Ok(usize::try_from(count).unwrap_or(0))
}

fn collect_rows(statement: &mut Statement<'_>) -> Result<Vec<Appointment>, StoreError> {
    let mut rows = Vec::new();
    while let State::Row = statement.next()? {
        rows.push(read_appointment(statement)?);
    }
    Ok(rows)
}

#[async_trait]
impl AppointmentStore for Database {
    async fn create(&self, appointment: &NewAppointment) -> Result<AppointmentId, StoreError> {
        let conn = self.connection.lock().await;
        let scheduled_at = format_timestamp(appointment.scheduled_at);

        let mut statement = conn.prepare(
            "INSERT INTO appointments (owner_id, description, scheduled_at) VALUES (?, ?, ?)",
        )?;
        statement.bind((1, appointment.owner_id))?;
        statement.bind((2, appointment.description.as_str()))?;
        statement.bind((3, scheduled_at.as_str()))?;
        statement.next()?;

        let mut statement = conn.prepare("SELECT last_insert_rowid()")?;
        let id = match statement.next()? {
            State::Row => statement.read::<i64, _>(0)?,
            State::Done => {
                return Err(StoreError::MalformedRow(
                    "insert returned no row id".to_string(),
                ))
            }
        };

        debug!(
            "Stored appointment {id} for owner {} at {scheduled_at}",
            appointment.owner_id
        );
        Ok(id)
    }

    async fn list_upcoming(
        &self,
        owner_id: OwnerId,
        now: NaiveDateTime,
    ) -> Result<Vec<Appointment>, StoreError> {
        let conn = self.connection.lock().await;
        let now = format_timestamp(now);
        let mut statement = conn.prepare(format!(
            "{SELECT_COLUMNS} WHERE owner_id = ? AND scheduled_at > ? ORDER BY scheduled_at ASC, id ASC"
        ))?;
        statement.bind((1, owner_id))?;
        statement.bind((2, now.as_str()))?;
        collect_rows(&mut statement)
    }

    async fn delete(&self, id: AppointmentId, owner_id: OwnerId) -> Result<bool, StoreError> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare("DELETE FROM appointments WHERE id = ? AND owner_id = ?")?;
        statement.bind((1, id))?;
        statement.bind((2, owner_id))?;
        statement.next()?;
        Ok(changes(&conn)? == 1)
    }

    async fn list_pending_active(
        &self,
        now: NaiveDateTime,
    ) -> Result<Vec<Appointment>, StoreError> {
        let conn = self.connection.lock().await;
        let now = format_timestamp(now);
        let mut statement = conn.prepare(format!("{SELECT_COLUMNS} WHERE scheduled_at > ?"))?;
        statement.bind((1, now.as_str()))?;
        collect_rows(&mut statement)
    }

    async fn mark_tier(&self, id: AppointmentId, tier: ReminderTier) -> Result<(), StoreError> {
        let conn = self.connection.lock().await;
        let column = tier_column(tier);
        let mut statement =
            conn.prepare(format!("UPDATE appointments SET {column} = 1 WHERE id = ?"))?;
        statement.bind((1, id))?;
        statement.next()?;
        Ok(())
    }

    async fn delete_expired(&self, now: NaiveDateTime) -> Result<usize, StoreError> {
        let conn = self.connection.lock().await;
        let cutoff = format_timestamp(round_up_to_second(now));
        let mut statement = conn.prepare("DELETE FROM appointments WHERE scheduled_at < ?")?;
        statement.bind((1, cutoff.as_str()))?;
        statement.next()?;
        changes(&conn)
    }

    async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>, StoreError> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(format!("{SELECT_COLUMNS} WHERE id = ?"))?;
        statement.bind((1, id))?;
        match statement.next()? {
            State::Row => Ok(Some(read_appointment(&statement)?)),
            State::Done => Ok(None),
        }
    }
}
