use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use orderbot_core::domain::cart::{CartDelta, CartItem};
use orderbot_core::domain::session::Session;
use orderbot_core::errors::ApplicationError;
use orderbot_core::ordering::menu::render_menu;
use orderbot_core::ordering::pricing::format_amount;
use orderbot_core::ordering::{resolve, MenuResolution};
use orderbot_core::store::CommerceStore;

use crate::bounded::bounded;
use crate::commit::OrderCommitter;
use crate::guardrails::{GuardrailDecision, GuardrailPolicy};

/// Tool invocation as it arrives from a planner: a name plus a JSON object
/// of arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// The closed set of operations the conversation may invoke.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawToolCall", into = "RawToolCall")]
pub enum ToolCall {
    AddItem { product_name: String, quantity: i64 },
    GetSummary,
    GetTotal,
    PlaceOrder { delivery_type: String, address: Option<String> },
    GetMenu,
    GetUserName,
    GetUserPhone,
    UpdateUserName { name: String },
}

#[derive(Deserialize)]
struct AddItemArgs {
    product_name: String,
    quantity: i64,
}

#[derive(Deserialize)]
struct PlaceOrderArgs {
    delivery_type: String,
    #[serde(default)]
    address: Option<String>,
}

#[derive(Deserialize)]
struct UpdateUserNameArgs {
    #[serde(alias = "user_name")]
    name: String,
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddItem { .. } => "add_item",
            Self::GetSummary => "get_summary",
            Self::GetTotal => "get_total",
            Self::PlaceOrder { .. } => "place_order",
            Self::GetMenu => "get_menu",
            Self::GetUserName => "get_user_name",
            Self::GetUserPhone => "get_user_phone",
            Self::UpdateUserName { .. } => "update_user_name",
        }
    }

    /// Tool descriptions handed to a planner so it knows what it may call.
    pub fn catalog() -> Value {
        json!([
            {
                "name": "add_item",
                "description": "Add a confirmed menu item to the customer's cart.",
                "parameters": {
                    "product_name": "string, menu item name",
                    "quantity": "integer >= 1"
                }
            },
            { "name": "get_summary", "description": "Summarize the cart with line totals.", "parameters": {} },
            { "name": "get_total", "description": "Current cart total.", "parameters": {} },
            {
                "name": "place_order",
                "description": "Register the order and empty the cart.",
                "parameters": {
                    "delivery_type": "pickup | delivery",
                    "address": "string, required for delivery"
                }
            },
            { "name": "get_menu", "description": "List available menu items with prices.", "parameters": {} },
            { "name": "get_user_name", "description": "The customer's name if known.", "parameters": {} },
            { "name": "get_user_phone", "description": "The customer's phone number.", "parameters": {} },
            {
                "name": "update_user_name",
                "description": "Remember the customer's name once they share it.",
                "parameters": { "name": "string" }
            }
        ])
    }
}

impl TryFrom<RawToolCall> for ToolCall {
    type Error = String;

    fn try_from(raw: RawToolCall) -> Result<Self, Self::Error> {
        let arguments = match raw.arguments {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let bad_args = |error: serde_json::Error| format!("invalid arguments for `{}`: {error}", raw.name);

        match raw.name.as_str() {
            "add_item" | "add_order_item" => {
                let args: AddItemArgs = serde_json::from_value(arguments).map_err(bad_args)?;
                Ok(Self::AddItem { product_name: args.product_name, quantity: args.quantity })
            }
            "get_summary" | "get_order_summary" => Ok(Self::GetSummary),
            "get_total" => Ok(Self::GetTotal),
            "place_order" | "add_order" => {
                let args: PlaceOrderArgs = serde_json::from_value(arguments).map_err(bad_args)?;
                Ok(Self::PlaceOrder { delivery_type: args.delivery_type, address: args.address })
            }
            "get_menu" => Ok(Self::GetMenu),
            "get_user_name" => Ok(Self::GetUserName),
            "get_user_phone" | "get_user_phone_number" => Ok(Self::GetUserPhone),
            "update_user_name" => {
                let args: UpdateUserNameArgs =
                    serde_json::from_value(arguments).map_err(bad_args)?;
                Ok(Self::UpdateUserName { name: args.name })
            }
            other => Err(format!("unknown tool `{other}`")),
        }
    }
}

impl From<ToolCall> for RawToolCall {
    fn from(call: ToolCall) -> Self {
        let name = call.name().to_string();
        let arguments = match call {
            ToolCall::AddItem { product_name, quantity } => {
                json!({ "product_name": product_name, "quantity": quantity })
            }
            ToolCall::PlaceOrder { delivery_type, address } => {
                json!({ "delivery_type": delivery_type, "address": address })
            }
            ToolCall::UpdateUserName { name } => json!({ "name": name }),
            ToolCall::GetSummary
            | ToolCall::GetTotal
            | ToolCall::GetMenu
            | ToolCall::GetUserName
            | ToolCall::GetUserPhone => json!({}),
        };
        Self { name, arguments }
    }
}

/// What one invocation hands back: text for the conversation, a cart delta
/// and an optional display-name change. Never a whole cart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToolOutcome {
    pub reply: String,
    pub cart: CartDelta,
    pub rename: Option<String>,
}

impl ToolOutcome {
    pub fn reply(text: impl Into<String>) -> Self {
        Self { reply: text.into(), cart: CartDelta::NoChange, rename: None }
    }

    pub fn with_cart(mut self, delta: CartDelta) -> Self {
        self.cart = delta;
        self
    }

    pub fn with_rename(mut self, name: impl Into<String>) -> Self {
        self.rename = Some(name.into());
        self
    }
}

/// Runs tool calls against a read-only session snapshot.
#[derive(Clone)]
pub struct ToolExecutor {
    commerce: Arc<dyn CommerceStore>,
    guardrails: GuardrailPolicy,
    committer: OrderCommitter,
    store_timeout: Duration,
}

impl ToolExecutor {
    pub fn new(
        commerce: Arc<dyn CommerceStore>,
        guardrails: GuardrailPolicy,
        store_timeout: Duration,
    ) -> Self {
        let committer = OrderCommitter::new(Arc::clone(&commerce), store_timeout);
        Self { commerce, guardrails, committer, store_timeout }
    }

    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    pub async fn execute(&self, call: &ToolCall, snapshot: &Session) -> ToolOutcome {
        if let GuardrailDecision::Deny { reason_code, user_message } = self.guardrails.evaluate(call)
        {
            info!(
                event_name = "agent.tool.denied",
                tool = call.name(),
                reason_code,
                conversation = %snapshot.key,
                "guardrail rejected tool call"
            );
            return ToolOutcome::reply(user_message);
        }

        match call {
            ToolCall::AddItem { product_name, quantity } => {
                // Guardrails already bounded the quantity to 1..=max_line_quantity.
                let quantity = u32::try_from(*quantity).unwrap_or(0);
                self.add_item(snapshot, product_name, quantity).await
            }
            ToolCall::GetSummary => ToolOutcome::reply(summarize(snapshot)),
            ToolCall::GetTotal => {
                ToolOutcome::reply(format!("Total: {}", format_amount(snapshot.cart.total())))
            }
            ToolCall::PlaceOrder { delivery_type, address } => {
                self.place_order(snapshot, delivery_type, address.as_deref()).await
            }
            ToolCall::GetMenu => self.get_menu(snapshot).await,
            ToolCall::GetUserName => ToolOutcome::reply(snapshot.display_name.clone()),
            ToolCall::GetUserPhone => ToolOutcome::reply(snapshot.key.user_phone.clone()),
            ToolCall::UpdateUserName { name } => {
                ToolOutcome::reply("Successfully updated user name").with_rename(name.trim())
            }
        }
    }

    async fn menu_for(
        &self,
        snapshot: &Session,
    ) -> Result<Vec<orderbot_core::MenuItem>, ApplicationError> {
        let phone = snapshot.key.business_phone.as_str();
        let business = bounded(
            "lookup_business_by_phone",
            self.store_timeout,
            self.commerce.lookup_business_by_phone(phone),
        )
        .await?
        .ok_or_else(|| ApplicationError::BusinessNotFound(phone.to_string()))?;

        Ok(bounded("list_menu_items", self.store_timeout, self.commerce.list_menu_items(&business))
            .await?)
    }

    async fn add_item(&self, snapshot: &Session, product_name: &str, quantity: u32) -> ToolOutcome {
        let menu = match self.menu_for(snapshot).await {
            Ok(menu) => menu,
            Err(error) => return failure("add_item", snapshot, error),
        };

        match resolve(&menu, product_name) {
            MenuResolution::Resolved(item) => {
                ToolOutcome::reply(format!("Added {quantity}x {} to your cart.", item.name))
                    .with_cart(CartDelta::add(CartItem::from_menu(&item, quantity)))
            }
            unresolved => {
                ToolOutcome::reply(unresolved.clarification().unwrap_or_default())
            }
        }
    }

    async fn get_menu(&self, snapshot: &Session) -> ToolOutcome {
        match self.menu_for(snapshot).await {
            Ok(menu) => ToolOutcome::reply(render_menu(&menu)),
            Err(error) => failure("get_menu", snapshot, error),
        }
    }

    async fn place_order(
        &self,
        snapshot: &Session,
        delivery_type: &str,
        address: Option<&str>,
    ) -> ToolOutcome {
        match self.committer.commit(snapshot, delivery_type, address).await {
            Ok(receipt) => ToolOutcome::reply(format!(
                "Order placed successfully! Order ID: {}\nTotal: {}\nStatus: {}",
                receipt.order_id,
                format_amount(receipt.total),
                receipt.status
            ))
            .with_cart(CartDelta::Clear),
            Err(error) => failure("place_order", snapshot, error),
        }
    }
}

fn failure(tool: &'static str, snapshot: &Session, error: ApplicationError) -> ToolOutcome {
    warn!(
        event_name = "agent.tool.failed",
        tool,
        conversation = %snapshot.key,
        retryable = error.is_retryable(),
        error = %error,
        "tool call failed"
    );
    ToolOutcome::reply(error.user_message())
}

pub fn summarize(snapshot: &Session) -> String {
    if snapshot.cart.is_empty() {
        return "Your cart is currently empty.".to_string();
    }

    let mut summary = String::from("Here is your current order summary:\n\n");
    for item in snapshot.cart.items() {
        summary.push_str(&format!(
            "- {} (x{}): {}\n",
            item.name,
            item.quantity,
            format_amount(item.line_total())
        ));
    }
    summary.push_str(&format!("\nTotal: {}", format_amount(snapshot.cart.total())));
    summary
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use orderbot_core::domain::cart::{CartDelta, CartItem};
    use orderbot_core::domain::menu::MenuItemId;
    use orderbot_core::domain::session::{ConversationKey, Session};
    use orderbot_core::ordering::merge;

    use super::{summarize, RawToolCall, ToolCall};

    #[test]
    fn decodes_tool_calls_by_name_including_legacy_aliases() {
        let call: ToolCall = serde_json::from_value(json!({
            "name": "add_order_item",
            "arguments": { "product_name": "Burger", "quantity": 2 }
        }))
        .expect("decode");
        assert_eq!(call, ToolCall::AddItem { product_name: "Burger".to_string(), quantity: 2 });

        let call: ToolCall =
            serde_json::from_value(json!({ "name": "get_summary" })).expect("decode unit");
        assert_eq!(call, ToolCall::GetSummary);

        let call: ToolCall = serde_json::from_value(json!({
            "name": "update_user_name",
            "arguments": { "user_name": "Ana" }
        }))
        .expect("decode alias");
        assert_eq!(call, ToolCall::UpdateUserName { name: "Ana".to_string() });
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let result = ToolCall::try_from(RawToolCall {
            name: "refund_everything".to_string(),
            arguments: json!({}),
        });
        assert_eq!(result, Err("unknown tool `refund_everything`".to_string()));
    }

    #[test]
    fn place_order_address_is_optional_in_arguments() {
        let call: ToolCall = serde_json::from_value(json!({
            "name": "place_order",
            "arguments": { "delivery_type": "pickup" }
        }))
        .expect("decode");
        assert_eq!(
            call,
            ToolCall::PlaceOrder { delivery_type: "pickup".to_string(), address: None }
        );
    }

    #[test]
    fn summary_lists_lines_and_total() {
        let mut session = Session::new(ConversationKey::new("b", "u"), None);
        assert_eq!(summarize(&session), "Your cart is currently empty.");

        session.cart = merge(
            &session.cart,
            &CartDelta::Add(vec![
                CartItem {
                    item_id: MenuItemId("item-pizza".to_string()),
                    name: "Pizza".to_string(),
                    unit_price: Decimal::new(1200, 2),
                    quantity: 1,
                },
                CartItem {
                    item_id: MenuItemId("item-taco".to_string()),
                    name: "Taco".to_string(),
                    unit_price: Decimal::new(400, 2),
                    quantity: 3,
                },
            ]),
        )
        .expect("merge");

        let summary = summarize(&session);
        assert!(summary.contains("- Pizza (x1): $12.00"));
        assert!(summary.contains("- Taco (x3): $12.00"));
        assert!(summary.ends_with("Total: $24.00"));
    }
}
