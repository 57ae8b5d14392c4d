use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use orderbot_core::domain::cart::{Cart, CartDelta};
use orderbot_core::domain::session::{ConversationKey, Session};
use orderbot_core::errors::ApplicationError;
use orderbot_core::ordering::fold;
use orderbot_core::store::SessionStore;

use crate::bounded::bounded;
use crate::tools::{ToolCall, ToolExecutor, ToolOutcome};

const FAILED_CALL_REPLY: &str = "Error: This request could not be completed. Please try again.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToolResult {
    pub tool: &'static str,
    pub reply: String,
    pub failed: bool,
}

/// Everything a turn produced, in request order, plus the state it left behind.
///
/// `session_saved` is false only when an order was committed but the cleared
/// cart could not be written back; the replies are still reported.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TurnReport {
    pub results: Vec<ToolResult>,
    pub cart: Cart,
    pub display_name: String,
    pub session_saved: bool,
}

/// Executes one turn's tool calls concurrently and folds their deltas into
/// the conversation's session.
///
/// Every call sees the same immutable snapshot taken before the turn started.
/// Additive deltas commute, and a clearing delta is applied ahead of them, so
/// the outcome never depends on completion order. A call that panics
/// contributes nothing. Turns for the same conversation are serialized;
/// different conversations run in parallel.
pub struct TurnCoordinator {
    sessions: Arc<dyn SessionStore>,
    executor: ToolExecutor,
    locks: Mutex<HashMap<ConversationKey, Arc<Mutex<()>>>>,
}

impl TurnCoordinator {
    pub fn new(sessions: Arc<dyn SessionStore>, executor: ToolExecutor) -> Self {
        Self { sessions, executor, locks: Mutex::new(HashMap::new()) }
    }

    async fn conversation_lock(&self, key: &ConversationKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        lock.lock_owned().await
    }

    pub async fn session(&self, key: &ConversationKey) -> Result<Session, ApplicationError> {
        Ok(self.load_or_start(key, None).await?.0)
    }

    /// Loads the stored session, or starts one named after the customer's
    /// profile on first contact. The flag reports whether it is new.
    async fn load_or_start(
        &self,
        key: &ConversationKey,
        profile_name: Option<&str>,
    ) -> Result<(Session, bool), ApplicationError> {
        let loaded =
            bounded("load_session", self.executor.store_timeout(), self.sessions.load(key)).await?;
        Ok(match loaded {
            Some(session) => (session, false),
            None => (Session::new(key.clone(), profile_name), true),
        })
    }

    pub async fn run_turn(
        &self,
        key: &ConversationKey,
        calls: Vec<ToolCall>,
    ) -> Result<TurnReport, ApplicationError> {
        self.run_turn_as(key, None, calls).await
    }

    /// Runs a turn for a customer whose channel profile name is known.
    pub async fn run_turn_as(
        &self,
        key: &ConversationKey,
        profile_name: Option<&str>,
        calls: Vec<ToolCall>,
    ) -> Result<TurnReport, ApplicationError> {
        let _turn = self.conversation_lock(key).await;
        let (session, first_contact) = self.load_or_start(key, profile_name).await?;
        let snapshot = Arc::new(session);

        let mut results: Vec<ToolResult> = calls
            .iter()
            .map(|call| ToolResult {
                tool: call.name(),
                reply: FAILED_CALL_REPLY.to_string(),
                failed: true,
            })
            .collect();

        let mut in_flight = JoinSet::new();
        for (index, call) in calls.into_iter().enumerate() {
            let executor = self.executor.clone();
            let snapshot = Arc::clone(&snapshot);
            in_flight.spawn(async move {
                let outcome = executor.execute(&call, &snapshot).await;
                (index, outcome)
            });
        }

        let mut deltas: Vec<CartDelta> = Vec::new();
        let mut rename: Option<String> = None;
        while let Some(joined) = in_flight.join_next().await {
            match joined {
                Ok((index, ToolOutcome { reply, cart, rename: renamed })) => {
                    debug!(
                        event_name = "agent.tool.completed",
                        conversation = %key,
                        tool = results[index].tool,
                        changes_cart = !cart.is_no_change(),
                        "tool call completed"
                    );
                    results[index].reply = reply;
                    results[index].failed = false;
                    if !cart.is_no_change() {
                        deltas.push(cart);
                    }
                    if renamed.is_some() {
                        rename = renamed;
                    }
                }
                Err(error) => {
                    warn!(
                        event_name = "agent.tool.aborted",
                        conversation = %key,
                        error = %error,
                        "tool call aborted, contributing no delta"
                    );
                }
            }
        }

        let committed = deltas.iter().any(|delta| matches!(delta, CartDelta::Clear));
        let mut session = Session::clone(&snapshot);
        session.cart = fold(&snapshot.cart, &deltas)?;
        if let Some(name) = rename {
            session.display_name = name;
        }
        session.updated_at = Utc::now();

        let changed = !deltas.is_empty() || session.display_name != snapshot.display_name;
        let session_saved = if changed || first_contact {
            self.persist(key, &session, committed).await?
        } else {
            true
        };

        info!(
            event_name = "agent.turn.applied",
            conversation = %key,
            calls = results.len(),
            deltas = deltas.len(),
            committed,
            session_saved,
            cart_lines = session.cart.len(),
            "turn applied"
        );

        Ok(TurnReport {
            results,
            cart: session.cart,
            display_name: session.display_name,
            session_saved,
        })
    }

    /// Writes the session back, retrying once. After a committed order the
    /// failure is reported instead of raised so the order reply still reaches
    /// the customer.
    async fn persist(
        &self,
        key: &ConversationKey,
        session: &Session,
        committed: bool,
    ) -> Result<bool, ApplicationError> {
        let timeout = self.executor.store_timeout();
        let first = match bounded("save_session", timeout, self.sessions.save(session)).await {
            Ok(()) => return Ok(true),
            Err(error) => error,
        };
        warn!(
            event_name = "agent.turn.save_retry",
            conversation = %key,
            error = %first,
            "session save failed, retrying once"
        );

        match bounded("save_session", timeout, self.sessions.save(session)).await {
            Ok(()) => Ok(true),
            Err(error) if committed => {
                error!(
                    event_name = "agent.turn.save_failed_after_commit",
                    conversation = %key,
                    error = %error,
                    "order committed but the cleared cart was not saved"
                );
                Ok(false)
            }
            Err(error) => Err(error.into()),
        }
    }
}
