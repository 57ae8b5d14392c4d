use thiserror::Error;

use crate::store::StoreError;

/// Problems with what the customer asked for. Never retried, never mutate state.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("delivery address is required for delivery orders")]
    MissingDeliveryAddress,
    #[error("invalid quantity {quantity} (allowed 1..={max})")]
    InvalidQuantity { quantity: i64, max: u32 },
    #[error("unknown delivery type `{0}` (expected pickup|delivery)")]
    UnknownDeliveryType(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyCart => {
                "Your cart is empty. Please add items before placing an order.".to_string()
            }
            Self::MissingDeliveryAddress => {
                "Error: Delivery address is required for delivery orders.".to_string()
            }
            Self::InvalidQuantity { max, .. } => {
                format!("Error: Quantity must be a whole number between 1 and {max}.")
            }
            Self::UnknownDeliveryType(_) => {
                "Error: Please choose either pickup or delivery.".to_string()
            }
            Self::InvariantViolation(_) => "Error: That request could not be processed.".to_string(),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("no business registered for phone `{0}`")]
    BusinessNotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Transient dependency failures may succeed on a later attempt; input and
    /// lookup failures will not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(error) => error.is_retryable(),
            Self::Domain(_) | Self::BusinessNotFound(_) | Self::Configuration(_) => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Domain(error) => error.user_message(),
            Self::BusinessNotFound(_) => {
                "Error: Could not find the business for this conversation.".to_string()
            }
            Self::Store(_) | Self::Configuration(_) => {
                "Sorry, we could not reach the ordering system right now. Your cart is unchanged; please try again in a moment."
                    .to_string()
            }
        }
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "The requested resource does not exist.",
            Self::ServiceUnavailable { .. } => {
                "Agent is not available right now. Please try again later."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            ApplicationError::BusinessNotFound(phone) => Self::NotFound {
                message: format!("no business registered for phone `{phone}`"),
                correlation_id,
            },
            ApplicationError::Store(error) => {
                Self::ServiceUnavailable { message: error.to_string(), correlation_id }
            }
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}
