use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::cart::Cart;

pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown";

/// Identifies one conversation: a customer talking to one business number.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationKey {
    pub business_phone: String,
    pub user_phone: String,
}

impl ConversationKey {
    pub fn new(business_phone: impl Into<String>, user_phone: impl Into<String>) -> Self {
        Self { business_phone: business_phone.into(), user_phone: user_phone.into() }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.business_phone, self.user_phone)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub key: ConversationKey,
    pub display_name: String,
    pub cart: Cart,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(key: ConversationKey, display_name: Option<&str>) -> Self {
        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_DISPLAY_NAME)
            .to_string();
        Self { key, display_name, cart: Cart::empty(), updated_at: Utc::now() }
    }

    pub fn has_known_name(&self) -> bool {
        self.display_name != UNKNOWN_DISPLAY_NAME
    }
}
