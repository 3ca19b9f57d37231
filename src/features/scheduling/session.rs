//! # Appointment Dialog
//!
//! Per-owner state machine that collects a description, a date and a time,
//! and yields a validated [`NewAppointment`].
//!
//! ```text
//! AwaitDescription -> AwaitDate -> AwaitTime -> Completed
//!         \______________\____________\-------> Cancelled
//! ```
//!
//! Invalid input never advances the dialog; the caller re-prompts the same
//! step with the returned [`ValidationError`].

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

use crate::store::{NewAppointment, OwnerId};

pub const DATE_FORMAT: &str = "%d/%m/%Y";
pub const TIME_FORMAT: &str = "%H:%M";

/// Longest accepted description, in characters; keeps every reminder and
/// confirmation inside a single chat message
pub const DESCRIPTION_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogStep {
    AwaitDescription,
    AwaitDate,
    AwaitTime,
    Completed,
    Cancelled,
}

impl DialogStep {
    pub fn is_terminal(self) -> bool {
        matches!(self, DialogStep::Completed | DialogStep::Cancelled)
    }

    /// Question shown to the user while the dialog waits in this step
    pub fn prompt(self) -> &'static str {
        match self {
            DialogStep::AwaitDescription => "📝 Qual é a descrição do compromisso?",
            DialogStep::AwaitDate => {
                "📅 Qual é a data do compromisso?\nFormato: DD/MM/AAAA\nExemplo: 25/03/2025"
            }
            DialogStep::AwaitTime => "🕐 Qual é o horário?\nFormato: HH:MM\nExemplo: 14:30",
            DialogStep::Completed => "✅ Compromisso agendado.",
            DialogStep::Cancelled => "❌ Ação cancelada.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("description is empty")]
    EmptyDescription,

    #[error("description has {0} characters, over the allowed maximum")]
    DescriptionTooLong(usize),

    #[error("'{0}' is not a valid DD/MM/YYYY date")]
    InvalidDate(String),

    #[error("'{0}' is not a valid HH:MM time")]
    InvalidTime(String),

    #[error("{0} is not in the future")]
    NotInFuture(NaiveDateTime),

    #[error("dialog already finished")]
    SessionClosed,
}

impl ValidationError {
    /// Re-prompt text for the step that rejected the input
    pub fn reprompt(&self) -> &'static str {
        match self {
            ValidationError::EmptyDescription => {
                "❌ A descrição não pode ficar vazia. Qual é a descrição do compromisso?"
            }
            ValidationError::DescriptionTooLong(_) => {
                "❌ A descrição é muito longa (máximo de 500 caracteres). Qual é a descrição do compromisso?"
            }
            ValidationError::InvalidDate(_) => {
                "❌ Data inválida. Use o formato DD/MM/AAAA\nExemplo: 25/03/2025"
            }
            ValidationError::InvalidTime(_) => {
                "❌ Horário inválido. Use o formato HH:MM\nExemplo: 14:30"
            }
            ValidationError::NotInFuture(_) => {
                "❌ Essa data já passou. Por favor, informe um horário futuro."
            }
            ValidationError::SessionClosed => "⏳ Este agendamento já foi concluído.",
        }
    }
}

pub fn parse_date(input: &str) -> Result<NaiveDate, ValidationError> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(input.to_string()))
}

pub fn parse_time(input: &str) -> Result<NaiveTime, ValidationError> {
    let input = input.trim();
    NaiveTime::parse_from_str(input, TIME_FORMAT)
        .map_err(|_| ValidationError::InvalidTime(input.to_string()))
}

/// Result of a turn that was accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The dialog moved on and now waits in this step
    Next(DialogStep),
    /// All fields are valid; the appointment is ready to be stored
    Ready(NewAppointment),
}

#[derive(Debug, Clone)]
enum Stage {
    AwaitDescription,
    AwaitDate { description: String },
    AwaitTime { description: String, date: NaiveDate },
    Completed { appointment: NewAppointment },
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct Session {
    owner_id: OwnerId,
    generation: u64,
    stage: Stage,
}

impl Session {
    pub fn new(owner_id: OwnerId, generation: u64) -> Self {
        Self {
            owner_id,
            generation,
            stage: Stage::AwaitDescription,
        }
    }

    pub fn owner_id(&self) -> OwnerId {
        self.owner_id
    }

    /// Distinguishes this session from any later one for the same owner
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn step(&self) -> DialogStep {
        match self.stage {
            Stage::AwaitDescription => DialogStep::AwaitDescription,
            Stage::AwaitDate { .. } => DialogStep::AwaitDate,
            Stage::AwaitTime { .. } => DialogStep::AwaitTime,
            Stage::Completed { .. } => DialogStep::Completed,
            Stage::Cancelled => DialogStep::Cancelled,
        }
    }

    /// Feed one user message into the dialog
    ///
    /// On `Ready` the session is already `Completed`; if storing the
    /// appointment fails the caller should [`reopen`](Self::reopen) it.
    pub fn advance(&mut self, input: &str, now: NaiveDateTime) -> Result<Advance, ValidationError> {
        let next = match &self.stage {
            Stage::AwaitDescription => {
                let description = input.trim();
                if description.is_empty() {
                    return Err(ValidationError::EmptyDescription);
                }
                let length = description.chars().count();
                if length > DESCRIPTION_MAX_CHARS {
                    return Err(ValidationError::DescriptionTooLong(length));
                }
                Stage::AwaitDate {
                    description: description.to_string(),
                }
            }
            Stage::AwaitDate { description } => Stage::AwaitTime {
                description: description.clone(),
                date: parse_date(input)?,
            },
            Stage::AwaitTime { description, date } => {
                let scheduled_at = date.and_time(parse_time(input)?);
                if scheduled_at <= now {
                    return Err(ValidationError::NotInFuture(scheduled_at));
                }
                Stage::Completed {
                    appointment: NewAppointment {
                        owner_id: self.owner_id,
                        description: description.clone(),
                        scheduled_at,
                    },
                }
            }
            Stage::Completed { .. } | Stage::Cancelled => {
                return Err(ValidationError::SessionClosed)
            }
        };

        self.stage = next;
        Ok(match &self.stage {
            Stage::Completed { appointment } => Advance::Ready(appointment.clone()),
            _ => Advance::Next(self.step()),
        })
    }

    /// Return a completed-but-unsaved dialog to the time step
    pub fn reopen(&mut self) {
        if let Stage::Completed { appointment } = &self.stage {
            self.stage = Stage::AwaitTime {
                description: appointment.description.clone(),
                date: appointment.scheduled_at.date(),
            };
        }
    }

    pub fn cancel(&mut self) {
        if !self.step().is_terminal() {
            self.stage = Stage::Cancelled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 20)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_full_dialog() {
        let mut session = Session::new(5, 1);
        assert_eq!(session.step(), DialogStep::AwaitDescription);

        assert_eq!(
            session.advance("  Dentist ", now()),
            Ok(Advance::Next(DialogStep::AwaitDate))
        );
        assert_eq!(
            session.advance("25/03/2025", now()),
            Ok(Advance::Next(DialogStep::AwaitTime))
        );

        let expected = NewAppointment {
            owner_id: 5,
            description: "Dentist".to_string(),
            scheduled_at: NaiveDate::from_ymd_opt(2025, 3, 25)
                .unwrap()
                .and_hms_opt(14, 30, 0)
                .unwrap(),
        };
        assert_eq!(session.advance("14:30", now()), Ok(Advance::Ready(expected)));
        assert_eq!(session.step(), DialogStep::Completed);
        assert_eq!(
            session.advance("again", now()),
            Err(ValidationError::SessionClosed)
        );
    }

    #[test]
    fn test_empty_description_is_rejected() {
        let mut session = Session::new(5, 1);
        assert_eq!(
            session.advance("   ", now()),
            Err(ValidationError::EmptyDescription)
        );
        assert_eq!(session.step(), DialogStep::AwaitDescription);
    }

    #[test]
    fn test_overlong_description_is_rejected() {
        let mut session = Session::new(5, 1);
        let long = "a".repeat(1990);
        assert_eq!(
            session.advance(&long, now()),
            Err(ValidationError::DescriptionTooLong(1990))
        );
        assert_eq!(session.step(), DialogStep::AwaitDescription);
        assert!(ValidationError::DescriptionTooLong(1990)
            .reprompt()
            .contains(&DESCRIPTION_MAX_CHARS.to_string()));

        // Multi-byte text is measured in characters, not bytes
        let accented = "é".repeat(DESCRIPTION_MAX_CHARS);
        assert_eq!(
            session.advance(&accented, now()),
            Ok(Advance::Next(DialogStep::AwaitDate))
        );
    }

    #[test]
    fn test_impossible_date_stays_in_date_step() {
        let mut session = Session::new(5, 1);
        session.advance("Dentist", now()).unwrap();

        for bad in ["31/02/2025", "2025-03-25", "25/13/2025", "amanhã", ""] {
            assert!(matches!(
                session.advance(bad, now()),
                Err(ValidationError::InvalidDate(_))
            ));
            assert_eq!(session.step(), DialogStep::AwaitDate);
        }
    }

    #[test]
    fn test_bad_time_stays_in_time_step() {
        let mut session = Session::new(5, 1);
        session.advance("Dentist", now()).unwrap();
        session.advance("25/03/2025", now()).unwrap();

        for bad in ["25:00", "14h30", "14:30:00", "noon"] {
            assert!(matches!(
                session.advance(bad, now()),
                Err(ValidationError::InvalidTime(_))
            ));
            assert_eq!(session.step(), DialogStep::AwaitTime);
        }
    }

    #[test]
    fn test_past_or_present_time_is_rejected() {
        let mut session = Session::new(5, 1);
        session.advance("Dentist", now()).unwrap();
        session.advance("20/03/2025", now()).unwrap();

        assert!(matches!(
            session.advance("08:59", now()),
            Err(ValidationError::NotInFuture(_))
        ));
        assert!(matches!(
            session.advance("09:00", now()),
            Err(ValidationError::NotInFuture(_))
        ));
        assert_eq!(session.step(), DialogStep::AwaitTime);

        assert!(matches!(
            session.advance("09:01", now()),
            Ok(Advance::Ready(_))
        ));
    }

    #[test]
    fn test_reopen_returns_to_time_step() {
        let mut session = Session::new(5, 1);
        session.advance("Dentist", now()).unwrap();
        session.advance("25/03/2025", now()).unwrap();
        session.advance("14:30", now()).unwrap();

        session.reopen();
        assert_eq!(session.step(), DialogStep::AwaitTime);
        assert!(matches!(
            session.advance("15:00", now()),
            Ok(Advance::Ready(a)) if a.description == "Dentist"
        ));
    }

    #[test]
    fn test_cancel_from_any_open_step() {
        for turns in 0..3 {
            let mut session = Session::new(5, 1);
            for input in ["Dentist", "25/03/2025", "14:30"].iter().take(turns) {
                session.advance(input, now()).unwrap();
            }
            session.cancel();
            assert_eq!(session.step(), DialogStep::Cancelled);
        }
    }

    #[test]
    fn test_prompts_exist_for_every_step() {
        assert!(DialogStep::AwaitDate.prompt().contains("DD/MM/AAAA"));
        assert!(DialogStep::AwaitTime.prompt().contains("HH:MM"));
        assert!(DialogStep::Completed.is_terminal());
        assert!(!DialogStep::AwaitTime.is_terminal());
    }
}
