//! Conversational ordering agent.
//!
//! One inbound message drives a constrained loop:
//! 1. **Decide** (`llm`) - a [`llm::DecisionModel`] picks a batch of tool calls or a reply
//! 2. **Guard** (`guardrails`) - quantity and delivery-type checks before any store call
//! 3. **Run a turn** (`turn`) - the batch runs concurrently against one session
//!    snapshot; cart deltas are folded back once every call has finished
//! 4. **Commit** (`commit`) - `place_order` writes order and line items atomically
//! 5. **Reply** (`runtime`) - the final text goes out through the channel
//!
//! The model never mutates state directly. Prices come from the menu, totals
//! from the cart, and the only way to change a cart is a delta.

mod bounded;
pub mod commit;
pub mod guardrails;
pub mod llm;
pub mod runtime;
pub mod tools;
pub mod turn;

pub use commit::OrderCommitter;
pub use guardrails::{GuardrailDecision, GuardrailPolicy};
pub use llm::{
    ChatMessage, Decision, DecisionModel, HttpDecisionModel, ScriptedDecisionModel,
    UnavailableDecisionModel, SYSTEM_PROMPT,
};
pub use runtime::{AgentReply, AgentRuntime, FALLBACK_REPLY};
pub use tools::{RawToolCall, ToolCall, ToolExecutor, ToolOutcome};
pub use turn::{ToolResult, TurnCoordinator, TurnReport};
