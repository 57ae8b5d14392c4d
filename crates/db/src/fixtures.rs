use rust_decimal::Decimal;

use orderbot_core::domain::business::{Business, BusinessId};
use orderbot_core::domain::menu::{MenuItem, MenuItemId};

use crate::connection::DbPool;
use crate::repositories::{InMemoryCommerceStore, RepositoryError};

const DEMO_BUSINESS_ID: &str = "biz-demo-001";
const DEMO_BUSINESS_NAME: &str = "Corner Diner";
pub const DEMO_BUSINESS_PHONE: &str = "5215550001";

/// (id, name, description, price in cents, available)
const DEMO_MENU: &[(&str, &str, Option<&str>, i64, bool)] = &[
    ("item-burger", "Burger", Some("Beef patty, cheddar, pickles"), 1000, true),
    ("item-cheeseburger", "Cheeseburger", Some("Double cheddar"), 1200, true),
    ("item-pizza", "Pizza", Some("Margherita, 12 inch"), 1200, true),
    ("item-taco", "Taco", Some("Al pastor with pineapple"), 400, true),
    ("item-fries", "Fries", None, 350, true),
    ("item-soda", "Soda", Some("330ml can"), 200, true),
    ("item-churros", "Churros", Some("Seasonal, currently out"), 500, false),
];

/// Deterministic demo business and menu used by `orderbot seed`, local
/// development, and the end-to-end tests.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub fn business() -> Business {
        Business {
            id: BusinessId(DEMO_BUSINESS_ID.to_string()),
            name: DEMO_BUSINESS_NAME.to_string(),
            whatsapp_phone_number: DEMO_BUSINESS_PHONE.to_string(),
        }
    }

    pub fn menu() -> Vec<MenuItem> {
        DEMO_MENU
            .iter()
            .map(|(id, name, description, cents, available)| MenuItem {
                id: MenuItemId((*id).to_string()),
                business_id: BusinessId(DEMO_BUSINESS_ID.to_string()),
                name: (*name).to_string(),
                description: description.map(str::to_string),
                price: Decimal::new(*cents, 2),
                available: *available,
            })
            .collect()
    }

    /// Idempotent: re-running replaces the demo rows in place.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let business = Self::business();
        let menu = Self::menu();
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO business (id, name, whatsapp_phone_number, created_at)
             VALUES (?, ?, ?, datetime('now'))
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 whatsapp_phone_number = excluded.whatsapp_phone_number",
        )
        .bind(&business.id.0)
        .bind(&business.name)
        .bind(&business.whatsapp_phone_number)
        .execute(&mut *tx)
        .await?;

        for item in &menu {
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
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(SeedResult {
            business_phone: business.whatsapp_phone_number,
            menu_items_seeded: menu.len(),
        })
    }

    pub async fn load_into(store: &InMemoryCommerceStore) -> SeedResult {
        let business = Self::business();
        let menu = Self::menu();
        let menu_items_seeded = menu.len();
        let business_phone = business.whatsapp_phone_number.clone();

        store.upsert_business(business).await;
        for item in menu {
            store.upsert_menu_item(item).await;
        }

        SeedResult { business_phone, menu_items_seeded }
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let business_exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM business WHERE id = ? AND whatsapp_phone_number = ?)",
        )
        .bind(DEMO_BUSINESS_ID)
        .bind(DEMO_BUSINESS_PHONE)
        .fetch_one(pool)
        .await?;
        checks.push(("business", business_exists == 1));

        let menu_count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM menu_item WHERE business_id = ?")
                .bind(DEMO_BUSINESS_ID)
                .fetch_one(pool)
                .await?;
        checks.push(("menu-items", menu_count == DEMO_MENU.len() as i64));

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub business_phone: String,
    pub menu_items_seeded: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
