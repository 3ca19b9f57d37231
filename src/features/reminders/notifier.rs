//! Outbound delivery of rendered messages to an owner's chat

use async_trait::async_trait;
use log::debug;
use serenity::http::Http;
use serenity::model::id::ChannelId;
use std::sync::Arc;
use thiserror::Error;

use crate::core::chunk_for_message;
use crate::store::OwnerId;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("discord error: {0}")]
    Discord(#[from] serenity::Error),

    #[error("invalid owner id {0}")]
    InvalidOwner(OwnerId),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Sends a message to an owner; failures are returned, never raised
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, owner_id: OwnerId, text: &str) -> Result<(), NotifyError>;
}

/// Delivers messages into the owner's Discord channel
///
/// Text over the message limit goes out as several consecutive messages.
pub struct DiscordNotifier {
    http: Arc<Http>,
}

impl DiscordNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, owner_id: OwnerId, text: &str) -> Result<(), NotifyError> {
        let channel = u64::try_from(owner_id).map_err(|_| NotifyError::InvalidOwner(owner_id))?;
        let chunks = chunk_for_message(text);
        for chunk in &chunks {
            ChannelId(channel).say(&self.http, chunk).await?;
        }
        debug!("Delivered {} message(s) to channel {channel}", chunks.len());
        Ok(())
    }
}
