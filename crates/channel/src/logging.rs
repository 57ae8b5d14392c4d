use async_trait::async_trait;
use tracing::info;

use orderbot_core::delivery::{DeliveryError, MessageDelivery, OutboundMessage};
use orderbot_core::domain::session::ConversationKey;

/// Delivery that only writes the outbound message to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingDelivery;

#[async_trait]
impl MessageDelivery for LoggingDelivery {
    async fn deliver(
        &self,
        conversation: &ConversationKey,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError> {
        match message {
            OutboundMessage::Text { body } => info!(
                event_name = "channel.message.logged",
                conversation = %conversation,
                kind = "text",
                chars = body.chars().count(),
                "outbound message recorded"
            ),
            OutboundMessage::Image { link, .. } => info!(
                event_name = "channel.message.logged",
                conversation = %conversation,
                kind = "image",
                link = %link,
                "outbound message recorded"
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use orderbot_core::delivery::{MessageDelivery, OutboundMessage};
    use orderbot_core::domain::session::ConversationKey;

    use super::LoggingDelivery;

    #[tokio::test]
    async fn logging_delivery_always_succeeds() {
        let key = ConversationKey::new("5215550001", "5215550002");
        LoggingDelivery.deliver(&key, &OutboundMessage::text("hola")).await.expect("deliver");
    }
}
