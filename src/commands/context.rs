//! Shared context for command handlers
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use serenity::model::id::{ChannelId, UserId};
use std::sync::Arc;

use crate::features::scheduling::{SessionKey, SessionRegistry};
use crate::store::{AppointmentStore, OwnerId};

/// Shared context for all command handlers
///
/// Contains the services every handler needs:
/// - the appointment store
/// - the per-user dialog sessions
#[derive(Clone)]
pub struct CommandContext {
    pub store: Arc<dyn AppointmentStore>,
    pub sessions: Arc<SessionRegistry>,
}

impl CommandContext {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        let sessions = Arc::new(SessionRegistry::new(store.clone()));
        Self { store, sessions }
    }
}

/// Appointments belong to the conversation's channel
pub fn owner_of(channel_id: ChannelId) -> OwnerId {
    channel_id.0 as OwnerId
}

/// A dialog belongs to the user who opened it, inside the channel's agenda
pub fn session_key(channel_id: ChannelId, user_id: UserId) -> SessionKey {
    SessionKey::new(owner_of(channel_id), user_id.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[test]
    fn test_command_context_clone_shares_sessions() {
        let ctx = CommandContext::new(Arc::new(MemoryStore::new()));
        let copy = ctx.clone();
        ctx.sessions.start(SessionKey::new(1, 2));
        assert_eq!(copy.sessions.active_count(), 1);
    }

    #[test]
    fn test_owner_of_channel() {
        assert_eq!(owner_of(ChannelId(123456789012345678)), 123456789012345678);
    }

    #[test]
    fn test_session_key_pairs_channel_and_user() {
        let key = session_key(ChannelId(42), UserId(7));
        assert_eq!(key, SessionKey::new(42, 7));
        assert_ne!(key, session_key(ChannelId(42), UserId(8)));
    }
}
