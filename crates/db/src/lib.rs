pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, ping, DbPool};
pub use fixtures::{DemoSeedDataset, SeedResult, VerificationResult, DEMO_BUSINESS_PHONE};
pub use repositories::{
    InMemoryCommerceStore, InMemorySessionStore, RepositoryError, SqlCommerceStore,
    SqlSessionStore,
};
