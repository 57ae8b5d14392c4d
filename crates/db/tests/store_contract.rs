//! The same behavioral contract run against the SQLite and in-memory stores.

use std::sync::Arc;

use rust_decimal::Decimal;

use orderbot_core::domain::menu::MenuItemId;
use orderbot_core::domain::order::{Fulfillment, NewOrder, OrderLineItem, OrderStatus};
use orderbot_core::store::{CommerceStore, StoreError};
use orderbot_db::{
    connect_with_settings, migrations, DemoSeedDataset, InMemoryCommerceStore, SqlCommerceStore,
    DEMO_BUSINESS_PHONE,
};

type ContractResult = Result<(), String>;

macro_rules! require {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

async fn sql_store() -> Result<Arc<dyn CommerceStore>, String> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.map_err(|e| e.to_string())?;
    migrations::run_pending(&pool).await.map_err(|e| e.to_string())?;
    DemoSeedDataset::load(&pool).await.map_err(|e| e.to_string())?;
    Ok(Arc::new(SqlCommerceStore::new(pool)))
}

async fn memory_store() -> Arc<dyn CommerceStore> {
    let store = InMemoryCommerceStore::default();
    DemoSeedDataset::load_into(&store).await;
    Arc::new(store)
}

async fn client_lifecycle(store: Arc<dyn CommerceStore>) -> ContractResult {
    let business = store
        .lookup_business_by_phone(DEMO_BUSINESS_PHONE)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("demo business should exist")?;

    let missing = store.lookup_client(&business, "5215559999").await.map_err(|e| e.to_string())?;
    require!(missing.is_none(), "unknown client should not be found");

    let created =
        store.create_client(&business, "5215559999", "Ana").await.map_err(|e| e.to_string())?;
    let duplicate = store.create_client(&business, "5215559999", "Ana").await;
    require!(
        matches!(duplicate, Err(StoreError::Conflict(_))),
        "duplicate client should conflict, got {duplicate:?}"
    );

    let found = store.lookup_client(&business, "5215559999").await.map_err(|e| e.to_string())?;
    require!(found == Some(created), "lookup should return the created client");
    Ok(())
}

async fn order_round_trip(store: Arc<dyn CommerceStore>) -> ContractResult {
    let business = store
        .lookup_business_by_phone(DEMO_BUSINESS_PHONE)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("demo business should exist")?;
    let client =
        store.create_client(&business, "5215558888", "Luis").await.map_err(|e| e.to_string())?;

    let mut tx = store.begin_order().await.map_err(|e| e.to_string())?;
    let order_id = tx
        .create_order(&NewOrder {
            business_id: business.clone(),
            client_id: client.clone(),
            fulfillment: Fulfillment::Pickup,
            total_amount: Decimal::new(2400, 2),
            status: OrderStatus::Pending,
        })
        .await
        .map_err(|e| e.to_string())?;
    tx.create_order_items(
        &order_id,
        &[
            OrderLineItem {
                item_id: MenuItemId("item-pizza".to_string()),
                quantity: 1,
                unit_price: Decimal::new(1200, 2),
                name: "Pizza".to_string(),
            },
            OrderLineItem {
                item_id: MenuItemId("item-taco".to_string()),
                quantity: 3,
                unit_price: Decimal::new(400, 2),
                name: "Taco".to_string(),
            },
        ],
    )
    .await
    .map_err(|e| e.to_string())?;
    tx.commit().await.map_err(|e| e.to_string())?;

    let order = store
        .find_order(&order_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("committed order should be readable")?;
    require!(order.client_id == client, "order should belong to the client");
    require!(order.lines.len() == 2, "order should carry both lines");
    require!(order.total_amount == Decimal::new(2400, 2), "total should be 24.00");
    Ok(())
}

#[tokio::test]
async fn sqlite_store_honors_client_contract() -> ContractResult {
    client_lifecycle(sql_store().await?).await
}

#[tokio::test]
async fn memory_store_honors_client_contract() -> ContractResult {
    client_lifecycle(memory_store().await).await
}

#[tokio::test]
async fn sqlite_store_honors_order_contract() -> ContractResult {
    order_round_trip(sql_store().await?).await
}

#[tokio::test]
async fn memory_store_honors_order_contract() -> ContractResult {
    order_round_trip(memory_store().await).await
}
