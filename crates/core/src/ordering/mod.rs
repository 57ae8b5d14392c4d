//! Deterministic ordering rules: menu resolution, cart reduction and pricing.
//!
//! Nothing in here performs I/O. The agent crate feeds these functions with
//! snapshots it obtained from the store and the session.

pub mod menu;
pub mod pricing;
pub mod reducer;

pub use menu::{resolve, MenuResolution};
pub use reducer::{fold, merge};
