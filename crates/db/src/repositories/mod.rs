use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use orderbot_core::store::StoreError;

pub mod commerce;
pub mod memory;
pub mod session;

pub use commerce::{SqlCommerceStore, SqlOrderTransaction};
pub use memory::{InMemoryCommerceStore, InMemoryOrderTransaction, InMemorySessionStore};
pub use session::SqlSessionStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StoreError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Database(sqlx::Error::Database(db))
                if db.is_unique_violation() =>
            {
                StoreError::Conflict(db.message().to_string())
            }
            RepositoryError::Database(
                other @ (sqlx::Error::ColumnDecode { .. }
                | sqlx::Error::ColumnNotFound(_)
                | sqlx::Error::Decode(_)),
            ) => StoreError::Decode(other.to_string()),
            RepositoryError::Database(other) => StoreError::Unavailable(other.to_string()),
            RepositoryError::Decode(message) => StoreError::Decode(message),
        }
    }
}

pub(crate) fn decode_err(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

pub(crate) fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw)
        .map_err(|error| RepositoryError::Decode(format!("{column} `{raw}`: {error}")))
}

pub(crate) fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{column} `{raw}`: {error}")))
}
