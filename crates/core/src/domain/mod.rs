pub mod business;
pub mod cart;
pub mod client;
pub mod menu;
pub mod order;
pub mod session;
