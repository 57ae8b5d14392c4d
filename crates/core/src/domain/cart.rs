use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::menu::{MenuItem, MenuItemId};
use crate::errors::DomainError;
use crate::ordering::pricing;

/// One cart entry. `name` and `unit_price` are copied from the menu when the
/// item is added and are never refreshed afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub item_id: MenuItemId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl CartItem {
    pub fn from_menu(item: &MenuItem, quantity: u32) -> Self {
        Self {
            item_id: item.id.clone(),
            name: item.name.clone(),
            unit_price: item.price,
            quantity,
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Set of cart entries keyed by `item_id`.
///
/// Entries with a zero quantity are never stored. The only way to grow a cart
/// is through [`crate::ordering::reducer::merge`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CartItem>", into = "Vec<CartItem>")]
pub struct Cart {
    pub(crate) entries: BTreeMap<MenuItemId, CartItem>,
}

impl Cart {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn items(&self) -> impl Iterator<Item = &CartItem> {
        self.entries.values()
    }

    pub fn get(&self, item_id: &MenuItemId) -> Option<&CartItem> {
        self.entries.get(item_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> Decimal {
        pricing::price_items(self.items())
    }
}

impl TryFrom<Vec<CartItem>> for Cart {
    type Error = DomainError;

    fn try_from(items: Vec<CartItem>) -> Result<Self, Self::Error> {
        crate::ordering::reducer::merge(&Cart::empty(), &CartDelta::Add(items))
    }
}

impl From<Cart> for Vec<CartItem> {
    fn from(cart: Cart) -> Self {
        cart.entries.into_values().collect()
    }
}

/// A change to apply to a cart after a turn.
///
/// `NoChange` and `Clear` are deliberately distinct: a tool that produced
/// nothing must never be confused with a committed order emptying the cart.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum CartDelta {
    #[default]
    NoChange,
    Clear,
    Add(Vec<CartItem>),
}

impl CartDelta {
    pub fn add(item: CartItem) -> Self {
        Self::Add(vec![item])
    }

    pub fn is_no_change(&self) -> bool {
        matches!(self, Self::NoChange)
    }
}
