use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use orderbot_core::delivery::{MessageDelivery, OutboundMessage};
use orderbot_core::domain::cart::Cart;
use orderbot_core::domain::session::ConversationKey;
use orderbot_core::errors::InterfaceError;

use crate::llm::{ChatMessage, Decision, DecisionModel};
use crate::tools::ToolCall;
use crate::turn::TurnCoordinator;

pub const FALLBACK_REPLY: &str = "Agent is not available right now. Please try again later.";
const ROUNDS_EXHAUSTED_REPLY: &str =
    "Sorry, I could not finish that request. Could you say it again in a different way?";
const MAX_TRANSCRIPT_MESSAGES: usize = 60;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AgentReply {
    pub text: String,
    pub cart: Option<Cart>,
    pub rounds: u32,
    pub degraded: bool,
}

/// Drives the decide → run tools → decide loop for one inbound message and
/// hands the final reply to the channel.
///
/// Messages for the same conversation are handled one at a time: the
/// conversation's transcript stays locked from the first decision until the
/// reply is recorded.
pub struct AgentRuntime {
    model: Arc<dyn DecisionModel>,
    coordinator: Arc<TurnCoordinator>,
    delivery: Arc<dyn MessageDelivery>,
    max_tool_rounds: u32,
    transcripts: Mutex<HashMap<ConversationKey, Arc<Mutex<Vec<ChatMessage>>>>>,
}

impl AgentRuntime {
    pub fn new(
        model: Arc<dyn DecisionModel>,
        coordinator: Arc<TurnCoordinator>,
        delivery: Arc<dyn MessageDelivery>,
        max_tool_rounds: u32,
    ) -> Self {
        Self {
            model,
            coordinator,
            delivery,
            max_tool_rounds: max_tool_rounds.max(1),
            transcripts: Mutex::new(HashMap::new()),
        }
    }

    pub fn coordinator(&self) -> &Arc<TurnCoordinator> {
        &self.coordinator
    }

    /// Copy of what the model has seen so far in this conversation.
    pub async fn transcript(&self, key: &ConversationKey) -> Vec<ChatMessage> {
        let slot = self.transcripts.lock().await.get(key).cloned();
        match slot {
            Some(slot) => slot.lock().await.clone(),
            None => Vec::new(),
        }
    }

    async fn transcript_slot(&self, key: &ConversationKey) -> Arc<Mutex<Vec<ChatMessage>>> {
        let mut transcripts = self.transcripts.lock().await;
        Arc::clone(transcripts.entry(key.clone()).or_default())
    }

    /// `profile_name` is the customer's channel profile name; it names the
    /// session on first contact.
    pub async fn handle_message(
        &self,
        key: &ConversationKey,
        profile_name: Option<&str>,
        text: &str,
        correlation_id: &str,
    ) -> AgentReply {
        let slot = self.transcript_slot(key).await;
        let mut transcript = slot.lock().await;
        transcript.push(ChatMessage::user(text));

        let mut cart = None;
        let mut rounds = 0;
        let mut degraded = false;

        let reply = loop {
            if rounds >= self.max_tool_rounds {
                warn!(
                    event_name = "agent.runtime.rounds_exhausted",
                    correlation_id,
                    conversation = %key,
                    rounds,
                    "tool round limit reached"
                );
                degraded = true;
                break ROUNDS_EXHAUSTED_REPLY.to_string();
            }

            let decision = match self.model.decide(&transcript).await {
                Ok(decision) => decision,
                Err(error) => {
                    error!(
                        event_name = "agent.runtime.model_failed",
                        correlation_id,
                        conversation = %key,
                        error = %error,
                        "decision model failed"
                    );
                    degraded = true;
                    break FALLBACK_REPLY.to_string();
                }
            };

            let raw_calls = match decision {
                Decision::Reply(text) => break text,
                Decision::CallTools(raw_calls) if raw_calls.is_empty() => {
                    degraded = true;
                    break FALLBACK_REPLY.to_string();
                }
                Decision::CallTools(raw_calls) => raw_calls,
            };
            rounds += 1;

            let mut calls = Vec::with_capacity(raw_calls.len());
            for raw in raw_calls {
                let name = raw.name.clone();
                match ToolCall::try_from(raw) {
                    Ok(call) => calls.push(call),
                    Err(reason) => transcript.push(ChatMessage::tool(name, format!("Error: {reason}"))),
                }
            }
            if calls.is_empty() {
                continue;
            }

            match self.coordinator.run_turn_as(key, profile_name, calls).await {
                Ok(report) => {
                    if !report.session_saved {
                        warn!(
                            event_name = "agent.runtime.session_not_saved",
                            correlation_id,
                            conversation = %key,
                            "order placed but the cart could not be cleared"
                        );
                    }
                    for result in report.results {
                        transcript.push(ChatMessage::tool(result.tool, result.reply));
                    }
                    cart = Some(report.cart);
                }
                Err(failure) => {
                    let interface = failure.into_interface(correlation_id);
                    error!(
                        event_name = "agent.runtime.turn_failed",
                        correlation_id,
                        conversation = %key,
                        error = %interface,
                        "turn could not be applied"
                    );
                    degraded = true;
                    break user_facing(&interface);
                }
            }
        };

        transcript.push(ChatMessage::assistant(&reply));
        if transcript.len() > MAX_TRANSCRIPT_MESSAGES {
            let overflow = transcript.len() - MAX_TRANSCRIPT_MESSAGES;
            transcript.drain(..overflow);
        }
        drop(transcript);

        if let Err(delivery_error) = self.delivery.deliver(key, &OutboundMessage::text(&reply)).await
        {
            warn!(
                event_name = "agent.runtime.delivery_failed",
                correlation_id,
                conversation = %key,
                error = %delivery_error,
                "reply delivery failed; not retried"
            );
        }

        info!(
            event_name = "agent.runtime.replied",
            correlation_id,
            conversation = %key,
            rounds,
            degraded,
            "reply produced"
        );

        AgentReply { text: reply, cart, rounds, degraded }
    }
}

fn user_facing(error: &InterfaceError) -> String {
    match error {
        InterfaceError::ServiceUnavailable { .. } => FALLBACK_REPLY.to_string(),
        other => other.user_message().to_string(),
    }
}
