use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use orderbot_core::domain::business::{Business, BusinessId};
use orderbot_core::domain::client::{Client, ClientId};
use orderbot_core::domain::menu::MenuItem;
use orderbot_core::domain::order::{NewOrder, Order, OrderId, OrderLineItem};
use orderbot_core::domain::session::{ConversationKey, Session};
use orderbot_core::store::{CommerceStore, OrderTransaction, SessionStore, StoreError};

#[derive(Default)]
struct CommerceState {
    businesses: HashMap<String, Business>,
    menu: HashMap<String, Vec<MenuItem>>,
    clients: HashMap<(String, String), Client>,
    orders: HashMap<String, Order>,
}

/// Process-local record store. Orders written through a transaction only
/// land in the shared state when the transaction commits.
#[derive(Clone, Default)]
pub struct InMemoryCommerceStore {
    state: Arc<RwLock<CommerceState>>,
}

impl InMemoryCommerceStore {
    pub async fn upsert_business(&self, business: Business) {
        let mut state = self.state.write().await;
        state.businesses.insert(business.whatsapp_phone_number.clone(), business);
    }

    pub async fn upsert_menu_item(&self, item: MenuItem) {
        let mut state = self.state.write().await;
        let items = state.menu.entry(item.business_id.0.clone()).or_default();
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }

    pub async fn orders(&self) -> Vec<Order> {
        let state = self.state.read().await;
        let mut orders = state.orders.values().cloned().collect::<Vec<_>>();
        orders.sort_by_key(|order| order.ordered_at);
        orders
    }

    pub async fn clients(&self) -> Vec<Client> {
        let state = self.state.read().await;
        state.clients.values().cloned().collect()
    }
}

#[async_trait::async_trait]
impl CommerceStore for InMemoryCommerceStore {
    async fn lookup_business_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<BusinessId>, StoreError> {
        let state = self.state.read().await;
        Ok(state.businesses.get(phone).map(|business| business.id.clone()))
    }

    async fn lookup_client(
        &self,
        business_id: &BusinessId,
        wa_id: &str,
    ) -> Result<Option<ClientId>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .clients
            .get(&(business_id.0.clone(), wa_id.to_string()))
            .map(|client| client.id.clone()))
    }

    async fn create_client(
        &self,
        business_id: &BusinessId,
        wa_id: &str,
        full_name: &str,
    ) -> Result<ClientId, StoreError> {
        let mut state = self.state.write().await;
        let key = (business_id.0.clone(), wa_id.to_string());
        if state.clients.contains_key(&key) {
            return Err(StoreError::Conflict(format!("client ({}, {wa_id})", business_id.0)));
        }

        let client = Client {
            id: ClientId(Uuid::new_v4().to_string()),
            business_id: business_id.clone(),
            wa_id: wa_id.to_string(),
            full_name: Some(full_name.to_string()),
            created_at: Utc::now(),
        };
        let id = client.id.clone();
        state.clients.insert(key, client);
        Ok(id)
    }

    async fn list_menu_items(&self, business_id: &BusinessId) -> Result<Vec<MenuItem>, StoreError> {
        let state = self.state.read().await;
        Ok(state.menu.get(&business_id.0).cloned().unwrap_or_default())
    }

    async fn begin_order(&self) -> Result<Box<dyn OrderTransaction>, StoreError> {
        Ok(Box::new(InMemoryOrderTransaction {
            state: Arc::clone(&self.state),
            staged: HashMap::new(),
        }))
    }

    async fn find_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        let state = self.state.read().await;
        Ok(state.orders.get(&order_id.0).cloned())
    }
}

pub struct InMemoryOrderTransaction {
    state: Arc<RwLock<CommerceState>>,
    staged: HashMap<String, Order>,
}

#[async_trait::async_trait]
impl OrderTransaction for InMemoryOrderTransaction {
    async fn create_order(&mut self, order: &NewOrder) -> Result<OrderId, StoreError> {
        let id = OrderId(Uuid::new_v4().to_string());
        self.staged.insert(
            id.0.clone(),
            Order {
                id: id.clone(),
                business_id: order.business_id.clone(),
                client_id: order.client_id.clone(),
                fulfillment: order.fulfillment.clone(),
                total_amount: order.total_amount,
                status: order.status,
                ordered_at: Utc::now(),
                lines: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn create_order_items(
        &mut self,
        order_id: &OrderId,
        lines: &[OrderLineItem],
    ) -> Result<(), StoreError> {
        let order = self.staged.get_mut(&order_id.0).ok_or_else(|| {
            StoreError::Unavailable(format!("order {order_id} is not part of this transaction"))
        })?;
        order.lines.extend_from_slice(lines);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        let mut state = this.state.write().await;
        state.orders.extend(this.staged);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<ConversationKey, Session>>,
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, key: &ConversationKey) -> Result<Option<Session>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(key).cloned())
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.key.clone(), session.clone());
        Ok(())
    }
}
