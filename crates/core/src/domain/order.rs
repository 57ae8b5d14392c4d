use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::business::BusinessId;
use crate::domain::cart::CartItem;
use crate::domain::client::ClientId;
use crate::domain::menu::MenuItemId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    Pickup,
    Delivery,
}

impl DeliveryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pickup => "pickup",
            Self::Delivery => "delivery",
        }
    }
}

impl FromStr for DeliveryType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pickup" => Ok(Self::Pickup),
            "delivery" => Ok(Self::Delivery),
            other => Err(DomainError::UnknownDeliveryType(other.to_string())),
        }
    }
}

/// How an order leaves the kitchen. A delivery always carries an address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Fulfillment {
    Pickup,
    Delivery { address: String },
}

impl Fulfillment {
    /// Chat models tend to send the literal string "None" for an absent
    /// address, so it counts as missing.
    pub fn parse(delivery_type: &str, address: Option<&str>) -> Result<Self, DomainError> {
        match delivery_type.parse::<DeliveryType>()? {
            DeliveryType::Pickup => Ok(Self::Pickup),
            DeliveryType::Delivery => {
                let address = address
                    .map(str::trim)
                    .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("none"))
                    .ok_or(DomainError::MissingDeliveryAddress)?;
                Ok(Self::Delivery { address: address.to_string() })
            }
        }
    }

    pub fn delivery_type(&self) -> DeliveryType {
        match self {
            Self::Pickup => DeliveryType::Pickup,
            Self::Delivery { .. } => DeliveryType::Delivery,
        }
    }

    pub fn address(&self) -> Option<&str> {
        match self {
            Self::Pickup => None,
            Self::Delivery { address } => Some(address),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "preparing" => Some(Self::Preparing),
            "ready" => Some(Self::Ready),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line item snapshot written with an order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub item_id: MenuItemId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub name: String,
}

impl From<&CartItem> for OrderLineItem {
    fn from(item: &CartItem) -> Self {
        Self {
            item_id: item.item_id.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            name: item.name.clone(),
        }
    }
}

/// Order header as handed to the store; the store assigns the id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub business_id: BusinessId,
    pub client_id: ClientId,
    pub fulfillment: Fulfillment,
    pub total_amount: Decimal,
    pub status: OrderStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub business_id: BusinessId,
    pub client_id: ClientId,
    pub fulfillment: Fulfillment,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub ordered_at: DateTime<Utc>,
    pub lines: Vec<OrderLineItem>,
}

/// What a successful commit reports back to the conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub total: Decimal,
    pub status: OrderStatus,
}
