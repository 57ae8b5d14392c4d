#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use orderbot_agent::{GuardrailPolicy, ToolExecutor, TurnCoordinator};
use orderbot_core::delivery::{DeliveryError, MessageDelivery, OutboundMessage};
use orderbot_core::domain::business::BusinessId;
use orderbot_core::domain::client::ClientId;
use orderbot_core::domain::menu::MenuItem;
use orderbot_core::domain::order::{NewOrder, Order, OrderId, OrderLineItem};
use orderbot_core::domain::session::{ConversationKey, Session};
use orderbot_core::store::{CommerceStore, OrderTransaction, SessionStore, StoreError};
use orderbot_db::{DemoSeedDataset, InMemoryCommerceStore, InMemorySessionStore, DEMO_BUSINESS_PHONE};

pub const CUSTOMER_PHONE: &str = "5215550002";
pub const STORE_TIMEOUT: Duration = Duration::from_millis(200);

pub fn conversation() -> ConversationKey {
    ConversationKey::new(DEMO_BUSINESS_PHONE, CUSTOMER_PHONE)
}

/// In-memory store with switchable failure modes.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: InMemoryCommerceStore,
    pub fail_order_items: AtomicBool,
    pub hide_client_once: AtomicBool,
    pub stall_menu: AtomicBool,
    pub panic_on_menu: AtomicBool,
}

impl FaultyStore {
    pub async fn seeded() -> Arc<Self> {
        let store = Self::default();
        DemoSeedDataset::load_into(&store.inner).await;
        Arc::new(store)
    }
}

#[async_trait]
impl CommerceStore for FaultyStore {
    async fn lookup_business_by_phone(&self, phone: &str) -> Result<Option<BusinessId>, StoreError> {
        self.inner.lookup_business_by_phone(phone).await
    }

    async fn lookup_client(
        &self,
        business_id: &BusinessId,
        wa_id: &str,
    ) -> Result<Option<ClientId>, StoreError> {
        if self.hide_client_once.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.lookup_client(business_id, wa_id).await
    }

    async fn create_client(
        &self,
        business_id: &BusinessId,
        wa_id: &str,
        full_name: &str,
    ) -> Result<ClientId, StoreError> {
        self.inner.create_client(business_id, wa_id, full_name).await
    }

    async fn list_menu_items(&self, business_id: &BusinessId) -> Result<Vec<MenuItem>, StoreError> {
        if self.panic_on_menu.load(Ordering::SeqCst) {
            panic!("menu backend crashed");
        }
        if self.stall_menu.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        self.inner.list_menu_items(business_id).await
    }

    async fn begin_order(&self) -> Result<Box<dyn OrderTransaction>, StoreError> {
        let inner = self.inner.begin_order().await?;
        Ok(Box::new(FaultyTransaction {
            inner,
            fail_items: self.fail_order_items.load(Ordering::SeqCst),
        }))
    }

    async fn find_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        self.inner.find_order(order_id).await
    }
}

struct FaultyTransaction {
    inner: Box<dyn OrderTransaction>,
    fail_items: bool,
}

#[async_trait]
impl OrderTransaction for FaultyTransaction {
    async fn create_order(&mut self, order: &NewOrder) -> Result<OrderId, StoreError> {
        self.inner.create_order(order).await
    }

    async fn create_order_items(
        &mut self,
        order_id: &OrderId,
        lines: &[OrderLineItem],
    ) -> Result<(), StoreError> {
        if self.fail_items {
            return Err(StoreError::Unavailable("order_item insert failed".to_string()));
        }
        self.inner.create_order_items(order_id, lines).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.commit().await
    }
}

/// Session store that fails the next `failing_saves` writes.
#[derive(Default)]
pub struct FlakySessions {
    pub inner: InMemorySessionStore,
    pub failing_saves: AtomicU32,
}

#[async_trait]
impl SessionStore for FlakySessions {
    async fn load(&self, key: &ConversationKey) -> Result<Option<Session>, StoreError> {
        self.inner.load(key).await
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let failing = self
            .failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Unavailable("session write failed".to_string()));
        }
        self.inner.save(session).await
    }
}

#[derive(Default)]
pub struct RecordingDelivery {
    pub sent: Mutex<Vec<(ConversationKey, OutboundMessage)>>,
}

#[async_trait]
impl MessageDelivery for RecordingDelivery {
    async fn deliver(
        &self,
        conversation: &ConversationKey,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError> {
        self.sent.lock().await.push((conversation.clone(), message.clone()));
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<FaultyStore>,
    pub sessions: Arc<FlakySessions>,
    pub coordinator: Arc<TurnCoordinator>,
}

pub async fn harness() -> Harness {
    let store = FaultyStore::seeded().await;
    let sessions = Arc::new(FlakySessions::default());
    let executor = ToolExecutor::new(
        Arc::clone(&store) as Arc<dyn CommerceStore>,
        GuardrailPolicy::default(),
        STORE_TIMEOUT,
    );
    let coordinator = Arc::new(TurnCoordinator::new(
        Arc::clone(&sessions) as Arc<dyn SessionStore>,
        executor,
    ));
    Harness { store, sessions, coordinator }
}
