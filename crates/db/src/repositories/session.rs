use sqlx::Row;

use orderbot_core::domain::cart::Cart;
use orderbot_core::domain::session::{ConversationKey, Session};
use orderbot_core::store::{SessionStore, StoreError};

use super::{decode_err, parse_timestamp, RepositoryError};
use crate::DbPool;

/// Conversation state keyed by `(business_phone, user_phone)`. The cart is
/// kept as a JSON array of snapshot entries.
pub struct SqlSessionStore {
    pool: DbPool,
}

impl SqlSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, key: &ConversationKey) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query(
            "SELECT display_name, cart_json, updated_at
             FROM conversation_session WHERE business_phone = ? AND user_phone = ?",
        )
        .bind(&key.business_phone)
        .bind(&key.user_phone)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let cart_json: String = row.try_get("cart_json").map_err(decode_err)?;
        let updated_at: String = row.try_get("updated_at").map_err(decode_err)?;
        let cart: Cart = serde_json::from_str(&cart_json).map_err(decode_err)?;

        Ok(Some(Session {
            key: key.clone(),
            display_name: row.try_get("display_name").map_err(decode_err)?,
            cart,
            updated_at: parse_timestamp("updated_at", &updated_at)?,
        }))
    }

    async fn upsert(&self, session: &Session) -> Result<(), RepositoryError> {
        let cart_json = serde_json::to_string(&session.cart).map_err(decode_err)?;

        sqlx::query(
            "INSERT INTO conversation_session (business_phone, user_phone, display_name,
                                               cart_json, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(business_phone, user_phone) DO UPDATE SET
                 display_name = excluded.display_name,
                 cart_json = excluded.cart_json,
                 updated_at = excluded.updated_at",
        )
        .bind(&session.key.business_phone)
        .bind(&session.key.user_phone)
        .bind(&session.display_name)
        .bind(cart_json)
        .bind(session.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionStore for SqlSessionStore {
    async fn load(&self, key: &ConversationKey) -> Result<Option<Session>, StoreError> {
        Ok(self.fetch(key).await?)
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        Ok(self.upsert(session).await?)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use orderbot_core::domain::cart::{CartDelta, CartItem};
    use orderbot_core::domain::menu::MenuItemId;
    use orderbot_core::domain::session::{ConversationKey, Session};
    use orderbot_core::ordering::merge;
    use orderbot_core::store::SessionStore;

    use super::SqlSessionStore;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn session_cart_survives_a_save_and_load() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let store = SqlSessionStore::new(pool);
        let key = ConversationKey::new("5215550001", "5215550002");

        assert_eq!(store.load(&key).await.expect("load"), None);

        let mut session = Session::new(key.clone(), Some("Ana"));
        session.cart = merge(
            &session.cart,
            &CartDelta::add(CartItem {
                item_id: MenuItemId("item-taco".to_string()),
                name: "Taco".to_string(),
                unit_price: Decimal::new(400, 2),
                quantity: 3,
            }),
        )
        .expect("merge");
        store.save(&session).await.expect("save");

        let loaded = store.load(&key).await.expect("load").expect("session exists");
        assert_eq!(loaded.display_name, "Ana");
        assert_eq!(loaded.cart, session.cart);
        assert_eq!(loaded.cart.total(), Decimal::new(1200, 2));
    }

    #[tokio::test]
    async fn saving_twice_overwrites_the_previous_state() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let store = SqlSessionStore::new(pool);
        let key = ConversationKey::new("5215550001", "5215550002");

        store.save(&Session::new(key.clone(), None)).await.expect("first save");
        store.save(&Session::new(key.clone(), Some("Luis"))).await.expect("second save");

        let loaded = store.load(&key).await.expect("load").expect("session exists");
        assert_eq!(loaded.display_name, "Luis");
        assert!(loaded.cart.is_empty());
    }
}
