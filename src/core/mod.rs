//! # Core Module
//!
//! Configuration and message formatting shared across the bot.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod config;
pub mod response;

// Re-export commonly used items
pub use config::Config;
pub use response::{chunk_for_message, format_when, DISPLAY_FORMAT, MESSAGE_LIMIT};
