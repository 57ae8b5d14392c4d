pub mod config;
pub mod delivery;
pub mod domain;
pub mod errors;
pub mod ordering;
pub mod store;

pub use delivery::{DeliveryError, MessageDelivery, OutboundMessage};
pub use domain::business::{Business, BusinessId};
pub use domain::cart::{Cart, CartDelta, CartItem};
pub use domain::client::{Client, ClientId};
pub use domain::menu::{MenuItem, MenuItemId};
pub use domain::order::{
    DeliveryType, Fulfillment, NewOrder, Order, OrderId, OrderLineItem, OrderReceipt, OrderStatus,
};
pub use domain::session::{ConversationKey, Session};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use ordering::{fold, merge, resolve, MenuResolution};
pub use store::{CommerceStore, OrderTransaction, SessionStore, StoreError};
