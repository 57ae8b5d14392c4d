use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::business::BusinessId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MenuItemId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub business_id: BusinessId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub available: bool,
}
