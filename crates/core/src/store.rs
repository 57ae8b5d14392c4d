//! Collaborator seams for the record store, the session store and the
//! outbound channel. Implementations live in `orderbot-db` and
//! `orderbot-channel`; the agent only ever sees these traits.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::business::BusinessId;
use crate::domain::client::ClientId;
use crate::domain::menu::MenuItem;
use crate::domain::order::{NewOrder, Order, OrderId, OrderLineItem};
use crate::domain::session::{ConversationKey, Session};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("unique constraint conflict on {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store call `{operation}` timed out after {timeout_ms}ms")]
    Timeout { operation: &'static str, timeout_ms: u64 },
    #[error("store returned undecodable data: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. })
    }
}

#[async_trait]
pub trait CommerceStore: Send + Sync {
    async fn lookup_business_by_phone(&self, phone: &str)
        -> Result<Option<BusinessId>, StoreError>;

    async fn lookup_client(
        &self,
        business_id: &BusinessId,
        wa_id: &str,
    ) -> Result<Option<ClientId>, StoreError>;

    /// Must fail with [`StoreError::Conflict`] when `(business_id, wa_id)` already exists.
    async fn create_client(
        &self,
        business_id: &BusinessId,
        wa_id: &str,
        full_name: &str,
    ) -> Result<ClientId, StoreError>;

    async fn list_menu_items(&self, business_id: &BusinessId)
        -> Result<Vec<MenuItem>, StoreError>;

    /// Opens a unit of work for writing one order and its line items.
    async fn begin_order(&self) -> Result<Box<dyn OrderTransaction>, StoreError>;

    async fn find_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;
}

/// Writes made through a transaction become visible only after
/// [`OrderTransaction::commit`]; dropping it discards them.
#[async_trait]
pub trait OrderTransaction: Send {
    async fn create_order(&mut self, order: &NewOrder) -> Result<OrderId, StoreError>;

    async fn create_order_items(
        &mut self,
        order_id: &OrderId,
        lines: &[OrderLineItem],
    ) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, key: &ConversationKey) -> Result<Option<Session>, StoreError>;
    async fn save(&self, session: &Session) -> Result<(), StoreError>;
}
