//! Outbound messaging channel.
//!
//! - **WhatsApp** (`whatsapp`) - Cloud API client that posts text and image
//!   messages to `{api_base_url}/{phone_number_id}/messages`
//! - **Log** (`logging`) - records replies through `tracing` only; the default for
//!   local development and tests
//! - **Phone numbers** (`phone`) - normalization of inbound sender ids
//!
//! Delivery is fire-and-forget from the agent's point of view: failures are
//! logged here and never retried.

use std::sync::Arc;

use orderbot_core::config::{ChannelConfig, ChannelProvider};
use orderbot_core::delivery::MessageDelivery;

pub mod logging;
pub mod phone;
pub mod whatsapp;

pub use logging::LoggingDelivery;
pub use phone::normalize_phone;
pub use whatsapp::{WhatsAppDelivery, WhatsAppError};

pub fn delivery_from_config(
    config: &ChannelConfig,
) -> Result<Arc<dyn MessageDelivery>, WhatsAppError> {
    match config.provider {
        ChannelProvider::Log => Ok(Arc::new(LoggingDelivery)),
        ChannelProvider::Whatsapp => Ok(Arc::new(WhatsAppDelivery::from_config(config)?)),
    }
}
