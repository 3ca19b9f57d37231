//! # Scheduling Feature
//!
//! Multi-turn dialog that assembles a new appointment, one session per user
//! in each chat.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod registry;
pub mod session;

pub use registry::{AuthorId, SessionKey, SessionRegistry, TurnOutcome};
pub use session::{
    parse_date, parse_time, Advance, DialogStep, Session, ValidationError, DESCRIPTION_MAX_CHARS,
};
