use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::business::BusinessId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub String);

/// A customer of one business, keyed by `(business_id, wa_id)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub business_id: BusinessId,
    pub wa_id: String,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
