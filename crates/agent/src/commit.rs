use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use orderbot_core::domain::business::BusinessId;
use orderbot_core::domain::client::ClientId;
use orderbot_core::domain::order::{
    Fulfillment, NewOrder, OrderLineItem, OrderReceipt, OrderStatus,
};
use orderbot_core::domain::session::Session;
use orderbot_core::errors::{ApplicationError, DomainError};
use orderbot_core::store::{CommerceStore, StoreError};

use crate::bounded::bounded;

/// Turns a cart snapshot into a persisted order.
///
/// The order header and its line items are written through one
/// [`orderbot_core::store::OrderTransaction`]; any failure drops the
/// transaction so neither is kept. The caller clears the cart only on `Ok`.
#[derive(Clone)]
pub struct OrderCommitter {
    store: Arc<dyn CommerceStore>,
    timeout: Duration,
}

impl OrderCommitter {
    pub fn new(store: Arc<dyn CommerceStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn commit(
        &self,
        snapshot: &Session,
        delivery_type: &str,
        address: Option<&str>,
    ) -> Result<OrderReceipt, ApplicationError> {
        if snapshot.cart.is_empty() {
            return Err(DomainError::EmptyCart.into());
        }
        let fulfillment = Fulfillment::parse(delivery_type, address)?;

        let business_phone = snapshot.key.business_phone.as_str();
        let business_id = bounded(
            "lookup_business_by_phone",
            self.timeout,
            self.store.lookup_business_by_phone(business_phone),
        )
        .await?
        .ok_or_else(|| ApplicationError::BusinessNotFound(business_phone.to_string()))?;

        let client_id = self.client_for(&business_id, snapshot).await?;

        let lines: Vec<OrderLineItem> = snapshot.cart.items().map(OrderLineItem::from).collect();
        let total = snapshot.cart.total();
        let order = NewOrder {
            business_id,
            client_id,
            fulfillment,
            total_amount: total,
            status: OrderStatus::Pending,
        };

        let mut tx = bounded("begin_order", self.timeout, self.store.begin_order()).await?;
        let order_id = bounded("create_order", self.timeout, tx.create_order(&order)).await?;
        bounded("create_order_items", self.timeout, tx.create_order_items(&order_id, &lines))
            .await?;
        bounded("commit_order", self.timeout, tx.commit()).await?;

        info!(
            event_name = "agent.order.committed",
            conversation = %snapshot.key,
            order_id = %order_id,
            delivery_type = order.fulfillment.delivery_type().as_str(),
            line_count = lines.len(),
            total = %total,
            "order committed"
        );

        Ok(OrderReceipt { order_id, total, status: order.status })
    }

    /// Get-or-create keyed on `(business_id, wa_id)`. Losing a creation race
    /// shows up as a conflict, after which the winner's row is looked up once.
    async fn client_for(
        &self,
        business_id: &BusinessId,
        snapshot: &Session,
    ) -> Result<ClientId, ApplicationError> {
        let wa_id = snapshot.key.user_phone.as_str();

        if let Some(existing) =
            bounded("lookup_client", self.timeout, self.store.lookup_client(business_id, wa_id))
                .await?
        {
            return Ok(existing);
        }

        let created = bounded(
            "create_client",
            self.timeout,
            self.store.create_client(business_id, wa_id, &snapshot.display_name),
        )
        .await;

        match created {
            Ok(client_id) => Ok(client_id),
            Err(StoreError::Conflict(detail)) => {
                warn!(
                    event_name = "agent.client.create_conflict",
                    conversation = %snapshot.key,
                    detail = %detail,
                    "client already exists, retrying lookup"
                );
                bounded("lookup_client", self.timeout, self.store.lookup_client(business_id, wa_id))
                    .await?
                    .ok_or_else(|| StoreError::Conflict(detail).into())
            }
            Err(other) => Err(other.into()),
        }
    }
}
