//! Slash command handler implementations
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

pub mod agenda;

pub use agenda::{AppointmentsHandler, DialogHandler};

use std::sync::Arc;

use super::registry::CommandRegistry;

/// Registry with every appointment command handler registered
pub fn create_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry.register(Arc::new(DialogHandler));
    registry.register(Arc::new(AppointmentsHandler));
    registry
}
