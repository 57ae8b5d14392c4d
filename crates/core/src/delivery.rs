use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::session::ConversationKey;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Text { body: String },
    Image { link: String, caption: Option<String> },
}

impl OutboundMessage {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("delivery transport failed: {0}")]
    Transport(String),
    #[error("delivery rejected by channel: {0}")]
    Rejected(String),
}

/// Outbound side of the messaging channel. Callers treat delivery as
/// fire-and-forget: failures are logged by the implementation and never retried.
#[async_trait]
pub trait MessageDelivery: Send + Sync {
    async fn deliver(
        &self,
        conversation: &ConversationKey,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError>;
}
