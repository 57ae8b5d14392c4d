use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use orderbot_core::config::ChannelConfig;
use orderbot_core::delivery::{DeliveryError, MessageDelivery, OutboundMessage};
use orderbot_core::domain::session::ConversationKey;

use crate::phone::normalize_phone;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum WhatsAppError {
    #[error("whatsapp channel is missing `{0}`")]
    MissingSetting(&'static str),
    #[error("could not build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// WhatsApp Cloud API sender.
#[derive(Clone)]
pub struct WhatsAppDelivery {
    client: reqwest::Client,
    access_token: SecretString,
    messages_url: String,
}

impl WhatsAppDelivery {
    pub fn new(
        api_base_url: &str,
        phone_number_id: &str,
        access_token: SecretString,
    ) -> Result<Self, WhatsAppError> {
        if phone_number_id.trim().is_empty() {
            return Err(WhatsAppError::MissingSetting("phone_number_id"));
        }
        if access_token.expose_secret().trim().is_empty() {
            return Err(WhatsAppError::MissingSetting("access_token"));
        }

        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let messages_url =
            format!("{}/{}/messages", api_base_url.trim_end_matches('/'), phone_number_id.trim());

        Ok(Self { client, access_token, messages_url })
    }

    pub fn from_config(config: &ChannelConfig) -> Result<Self, WhatsAppError> {
        let phone_number_id = config
            .phone_number_id
            .as_deref()
            .ok_or(WhatsAppError::MissingSetting("phone_number_id"))?;
        Self::new(&config.api_base_url, phone_number_id, config.access_token.clone())
    }

    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }
}

pub(crate) fn message_payload(to: &str, message: &OutboundMessage) -> Value {
    match message {
        OutboundMessage::Text { body } => json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": body },
        }),
        OutboundMessage::Image { link, caption } => json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to,
            "type": "image",
            "image": { "link": link, "caption": caption.clone().unwrap_or_default() },
        }),
    }
}

#[async_trait]
impl MessageDelivery for WhatsAppDelivery {
    async fn deliver(
        &self,
        conversation: &ConversationKey,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError> {
        let to = normalize_phone(&conversation.user_phone);
        let payload = message_payload(&to, message);

        let response = self
            .client
            .post(&self.messages_url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                warn!(
                    event_name = "channel.whatsapp.transport_failed",
                    conversation = %conversation,
                    error = %error,
                    "whatsapp request failed"
                );
                DeliveryError::Transport(error.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                event_name = "channel.whatsapp.rejected",
                conversation = %conversation,
                status = status.as_u16(),
                "whatsapp rejected the message"
            );
            return Err(DeliveryError::Rejected(format!("{status}: {body}")));
        }

        info!(
            event_name = "channel.whatsapp.sent",
            conversation = %conversation,
            "whatsapp message sent"
        );
        Ok(())
    }
}
