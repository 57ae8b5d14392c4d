use chrono::Utc;
use sqlx::{Row, Sqlite, Transaction};
use uuid::Uuid;

use orderbot_core::domain::business::{Business, BusinessId};
use orderbot_core::domain::client::ClientId;
use orderbot_core::domain::menu::{MenuItem, MenuItemId};
use orderbot_core::domain::order::{
    Fulfillment, NewOrder, Order, OrderId, OrderLineItem, OrderStatus,
};
use orderbot_core::store::{CommerceStore, OrderTransaction, StoreError};

use super::{decode_err, parse_decimal, parse_timestamp, RepositoryError};
use crate::DbPool;

pub struct SqlCommerceStore {
    pool: DbPool,
}

impl SqlCommerceStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn save_business(&self, business: &Business) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO business (id, name, whatsapp_phone_number, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 whatsapp_phone_number = excluded.whatsapp_phone_number",
        )
        .bind(&business.id.0)
        .bind(&business.name)
        .bind(&business.whatsapp_phone_number)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn save_menu_item(&self, item: &MenuItem) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO menu_item (id, business_id, name, description, price, available)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 description = excluded.description,
                 price = excluded.price,
                 available = excluded.available",
        )
        .bind(&item.id.0)
        .bind(&item.business_id.0)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price.to_string())
        .bind(item.available)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, business_id, client_id, delivery_type, delivery_address,
                    total_amount, status, ordered_at
             FROM customer_order WHERE id = ?",
        )
        .bind(&order_id.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let delivery_type: String = row.try_get("delivery_type").map_err(decode_err)?;
        let delivery_address: Option<String> =
            row.try_get("delivery_address").map_err(decode_err)?;
        let total_amount: String = row.try_get("total_amount").map_err(decode_err)?;
        let status: String = row.try_get("status").map_err(decode_err)?;
        let ordered_at: String = row.try_get("ordered_at").map_err(decode_err)?;

        let fulfillment = Fulfillment::parse(&delivery_type, delivery_address.as_deref())
            .map_err(decode_err)?;
        let status = OrderStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown order status `{status}`")))?;

        let item_rows = sqlx::query(
            "SELECT item_id, name, quantity, unit_price
             FROM order_item WHERE order_id = ? ORDER BY id ASC",
        )
        .bind(&order_id.0)
        .fetch_all(&self.pool)
        .await?;

        let lines = item_rows.iter().map(row_to_line).collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Order {
            id: OrderId(row.try_get("id").map_err(decode_err)?),
            business_id: BusinessId(row.try_get("business_id").map_err(decode_err)?),
            client_id: ClientId(row.try_get("client_id").map_err(decode_err)?),
            fulfillment,
            total_amount: parse_decimal("total_amount", &total_amount)?,
            status,
            ordered_at: parse_timestamp("ordered_at", &ordered_at)?,
            lines,
        }))
    }
}

fn row_to_line(row: &sqlx::sqlite::SqliteRow) -> Result<OrderLineItem, RepositoryError> {
    let quantity: i64 = row.try_get("quantity").map_err(decode_err)?;
    let unit_price: String = row.try_get("unit_price").map_err(decode_err)?;

    Ok(OrderLineItem {
        item_id: MenuItemId(row.try_get("item_id").map_err(decode_err)?),
        quantity: u32::try_from(quantity).map_err(decode_err)?,
        unit_price: parse_decimal("unit_price", &unit_price)?,
        name: row.try_get("name").map_err(decode_err)?,
    })
}

fn row_to_menu_item(row: &sqlx::sqlite::SqliteRow) -> Result<MenuItem, RepositoryError> {
    let price: String = row.try_get("price").map_err(decode_err)?;

    Ok(MenuItem {
        id: MenuItemId(row.try_get("id").map_err(decode_err)?),
        business_id: BusinessId(row.try_get("business_id").map_err(decode_err)?),
        name: row.try_get("name").map_err(decode_err)?,
        description: row.try_get("description").map_err(decode_err)?,
        price: parse_decimal("price", &price)?,
        available: row.try_get("available").map_err(decode_err)?,
    })
}

#[async_trait::async_trait]
impl CommerceStore for SqlCommerceStore {
    async fn lookup_business_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<BusinessId>, StoreError> {
        let id: Option<String> =
            sqlx::query_scalar("SELECT id FROM business WHERE whatsapp_phone_number = ?")
                .bind(phone)
                .fetch_optional(&self.pool)
                .await
                .map_err(RepositoryError::from)?;

        Ok(id.map(BusinessId))
    }

    async fn lookup_client(
        &self,
        business_id: &BusinessId,
        wa_id: &str,
    ) -> Result<Option<ClientId>, StoreError> {
        let id: Option<String> =
            sqlx::query_scalar("SELECT id FROM client WHERE business_id = ? AND wa_id = ?")
                .bind(&business_id.0)
                .bind(wa_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(RepositoryError::from)?;

        Ok(id.map(ClientId))
    }

    async fn create_client(
        &self,
        business_id: &BusinessId,
        wa_id: &str,
        full_name: &str,
    ) -> Result<ClientId, StoreError> {
        let id = ClientId(Uuid::new_v4().to_string());
        sqlx::query(
            "INSERT INTO client (id, business_id, wa_id, full_name, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id.0)
        .bind(&business_id.0)
        .bind(wa_id)
        .bind(full_name)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(id)
    }

    async fn list_menu_items(&self, business_id: &BusinessId) -> Result<Vec<MenuItem>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, business_id, name, description, price, available
             FROM menu_item WHERE business_id = ? ORDER BY name ASC",
        )
        .bind(&business_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows.iter().map(row_to_menu_item).collect::<Result<Vec<_>, _>>()?)
    }

    async fn begin_order(&self) -> Result<Box<dyn OrderTransaction>, StoreError> {
        let tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        Ok(Box::new(SqlOrderTransaction { tx }))
    }

    async fn find_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.fetch_order(order_id).await?)
    }
}

/// Open SQLite transaction for one order. Dropped without `commit`, sqlx rolls it back.
pub struct SqlOrderTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait::async_trait]
impl OrderTransaction for SqlOrderTransaction {
    async fn create_order(&mut self, order: &NewOrder) -> Result<OrderId, StoreError> {
        let id = OrderId(Uuid::new_v4().to_string());
        sqlx::query(
            "INSERT INTO customer_order (id, business_id, client_id, delivery_type,
                                         delivery_address, total_amount, status, ordered_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id.0)
        .bind(&order.business_id.0)
        .bind(&order.client_id.0)
        .bind(order.fulfillment.delivery_type().as_str())
        .bind(order.fulfillment.address())
        .bind(order.total_amount.to_string())
        .bind(order.status.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *self.tx)
        .await
        .map_err(RepositoryError::from)?;

        Ok(id)
    }

    async fn create_order_items(
        &mut self,
        order_id: &OrderId,
        lines: &[OrderLineItem],
    ) -> Result<(), StoreError> {
        for line in lines {
            sqlx::query(
                "INSERT INTO order_item (order_id, item_id, name, quantity, unit_price)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&order_id.0)
            .bind(&line.item_id.0)
            .bind(&line.name)
            .bind(i64::from(line.quantity))
            .bind(line.unit_price.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(RepositoryError::from)?;
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        this.tx.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }
}
