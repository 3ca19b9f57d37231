//! # Session Registry
//!
//! Holds at most one dialog session per user in each chat and persists
//! completed dialogs. The appointment belongs to the chat; the session
//! belongs to whoever opened it, so other people talking in the same chat
//! never feed or close someone else's dialog. Sessions never contend with
//! each other; map guards are released before the store is awaited.

use chrono::NaiveDateTime;
use dashmap::DashMap;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::session::{Advance, DialogStep, Session, ValidationError};
use crate::store::{AppointmentId, AppointmentStore, NewAppointment, OwnerId, StoreError};

/// User who drives a dialog inside an owner's chat
pub type AuthorId = u64;

/// Identifies one dialog: a user inside a chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub owner_id: OwnerId,
    pub author_id: AuthorId,
}

impl SessionKey {
    pub fn new(owner_id: OwnerId, author_id: AuthorId) -> Self {
        Self {
            owner_id,
            author_id,
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner_id, self.author_id)
    }
}

/// Text that cancels the dialog when typed as a plain message
const CANCEL_INPUT: &str = "/cancelar";

/// What happened to a plain-message turn
#[derive(Debug)]
pub enum TurnOutcome {
    /// The author has no active dialog in this chat; the message is not for us
    NoSession,
    /// Accepted; the dialog now waits in this step
    Advanced(DialogStep),
    /// Invalid input; the dialog stays in `step`
    Rejected {
        step: DialogStep,
        error: ValidationError,
    },
    /// The appointment was stored and the session removed
    Completed {
        id: AppointmentId,
        appointment: NewAppointment,
    },
    /// The appointment could not be stored; the dialog stays in the time step
    StoreFailed(StoreError),
    Cancelled,
    /// A command outside the dialog grammar ended the session
    Discarded,
}

pub struct SessionRegistry {
    sessions: DashMap<SessionKey, Session>,
    store: Arc<dyn AppointmentStore>,
    generations: AtomicU64,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self {
            sessions: DashMap::new(),
            store,
            generations: AtomicU64::new(0),
        }
    }

    /// Open a fresh dialog for `key`, replacing any active one
    ///
    /// Returns true when a previous session was replaced.
    pub fn start(&self, key: SessionKey) -> bool {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let replaced = self
            .sessions
            .insert(key, Session::new(key.owner_id, generation))
            .is_some();
        debug!("Started dialog {key} (replaced: {replaced})");
        replaced
    }

    /// Cancel the dialog; false when none was active
    pub fn cancel(&self, key: SessionKey) -> bool {
        match self.sessions.remove(&key) {
            Some((_, mut session)) => {
                session.cancel();
                debug!("Cancelled dialog {key}");
                true
            }
            None => false,
        }
    }

    /// Drop the dialog because an unrelated command arrived
    pub fn discard(&self, key: SessionKey) -> bool {
        let discarded = self.sessions.remove(&key).is_some();
        if discarded {
            debug!("Discarded dialog {key}");
        }
        discarded
    }

    pub fn step(&self, key: SessionKey) -> Option<DialogStep> {
        self.sessions.get(&key).map(|s| s.step())
    }

    #[cfg(test)]
    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    /// Route one plain message from the author in `key` into their dialog
    pub async fn handle_turn(
        &self,
        key: SessionKey,
        input: &str,
        now: NaiveDateTime,
    ) -> TurnOutcome {
        let trimmed = input.trim();
        if trimmed.starts_with('/') {
            if !self.sessions.contains_key(&key) {
                return TurnOutcome::NoSession;
            }
            if trimmed.eq_ignore_ascii_case(CANCEL_INPUT) {
                self.cancel(key);
                return TurnOutcome::Cancelled;
            }
            self.discard(key);
            return TurnOutcome::Discarded;
        }

        let (generation, step, result) = {
            let Some(mut session) = self.sessions.get_mut(&key) else {
                return TurnOutcome::NoSession;
            };
            let result = session.advance(input, now);
            (session.generation(), session.step(), result)
        };

        let appointment = match result {
            Ok(Advance::Next(step)) => return TurnOutcome::Advanced(step),
            Ok(Advance::Ready(appointment)) => appointment,
            Err(error) => {
                debug!("Dialog {key} input rejected in {step:?}: {error}");
                return TurnOutcome::Rejected { step, error };
            }
        };

        match self.store.create(&appointment).await {
            Ok(id) => {
                self.sessions
                    .remove_if(&key, |_, s| s.generation() == generation);
                info!(
                    "Appointment {id} created for owner {} by {} at {}",
                    key.owner_id, key.author_id, appointment.scheduled_at
                );
                TurnOutcome::Completed { id, appointment }
            }
            Err(error) => {
                warn!("Failed to store appointment for dialog {key}: {error}");
                if let Some(mut session) = self.sessions.get_mut(&key) {
                    if session.generation() == generation {
                        session.reopen();
                    }
                }
                TurnOutcome::StoreFailed(error)
            }
        }
    }
}
