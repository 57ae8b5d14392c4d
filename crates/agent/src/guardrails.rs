use orderbot_core::domain::order::DeliveryType;
use orderbot_core::errors::DomainError;

use crate::tools::ToolCall;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Deny { reason_code: &'static str, user_message: String },
}

/// Input checks applied before a tool touches any store. A denial becomes
/// the tool's reply and leaves the cart untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    pub max_line_quantity: u32,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self { max_line_quantity: 50 }
    }
}

impl GuardrailPolicy {
    pub fn new(max_line_quantity: u32) -> Self {
        Self { max_line_quantity: max_line_quantity.max(1) }
    }

    pub fn evaluate(&self, call: &ToolCall) -> GuardrailDecision {
        match call {
            ToolCall::AddItem { quantity, .. }
                if *quantity < 1 || *quantity > i64::from(self.max_line_quantity) =>
            {
                deny(
                    "quantity_out_of_range",
                    DomainError::InvalidQuantity { quantity: *quantity, max: self.max_line_quantity },
                )
            }
            ToolCall::AddItem { product_name, .. } if product_name.trim().is_empty() => {
                GuardrailDecision::Deny {
                    reason_code: "empty_product_name",
                    user_message: "Please tell me which menu item you would like.".to_string(),
                }
            }
            ToolCall::PlaceOrder { delivery_type, .. } => {
                match delivery_type.parse::<DeliveryType>() {
                    Ok(_) => GuardrailDecision::Allow,
                    Err(error) => deny("unknown_delivery_type", error),
                }
            }
            ToolCall::UpdateUserName { name } if name.trim().is_empty() => {
                GuardrailDecision::Deny {
                    reason_code: "empty_display_name",
                    user_message: "Error: The name cannot be empty.".to_string(),
                }
            }
            _ => GuardrailDecision::Allow,
        }
    }
}

fn deny(reason_code: &'static str, error: DomainError) -> GuardrailDecision {
    GuardrailDecision::Deny { reason_code, user_message: error.user_message() }
}
