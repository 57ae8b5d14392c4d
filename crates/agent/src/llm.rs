use std::collections::VecDeque;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use crate::tools::{RawToolCall, ToolCall};

pub const SYSTEM_PROMPT: &str = "You are OrderBot, an assistant that takes restaurant orders over chat.
Greet the customer briefly and casually without listing the menu.
Use get_menu to learn which items exist; never offer anything that is not on it.
Collect the order one item at a time and call add_item only after the customer confirms an item.
Ask whether the order is for pickup or delivery, and ask for the address when it is delivery.
When the customer is done, show the cart with get_summary and ask once more if they want anything else.
Register the order with place_order.
Pickup orders are ready in about 1 to 1.5 hours; deliveries arrive in about 1.5 to 2 hours.
Keep replies short and friendly, and ask at most one question per message.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), tool: None }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), tool: None }
    }

    pub fn tool(tool: impl Into<String>, content: impl Into<String>) -> Self {
        Self { role: Role::Tool, content: content.into(), tool: Some(tool.into()) }
    }
}

/// What the model wants next: run a batch of tools (one turn) or answer.
#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    CallTools(Vec<RawToolCall>),
    Reply(String),
}

impl Decision {
    pub fn call(calls: impl IntoIterator<Item = ToolCall>) -> Self {
        Self::CallTools(calls.into_iter().map(RawToolCall::from).collect())
    }
}

#[async_trait]
pub trait DecisionModel: Send + Sync {
    async fn decide(&self, transcript: &[ChatMessage]) -> Result<Decision>;
}

/// Delegates decisions to an external planner service.
///
/// Request: `{ "system_prompt", "tools", "messages" }`.
/// Response: `{ "tool_calls": [{ "name", "arguments" }] }` or `{ "reply": "..." }`.
#[derive(Clone)]
pub struct HttpDecisionModel {
    client: reqwest::Client,
    url: String,
}

#[derive(Deserialize)]
struct PlannerResponse {
    #[serde(default)]
    tool_calls: Vec<RawToolCall>,
    #[serde(default)]
    reply: Option<String>,
}

impl HttpDecisionModel {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building planner http client")?;
        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl DecisionModel for HttpDecisionModel {
    async fn decide(&self, transcript: &[ChatMessage]) -> Result<Decision> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({
                "system_prompt": SYSTEM_PROMPT,
                "tools": ToolCall::catalog(),
                "messages": transcript,
            }))
            .send()
            .await
            .context("planner request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("planner error {status}: {body}");
        }

        let planned: PlannerResponse =
            response.json().await.context("planner returned an unreadable body")?;

        if !planned.tool_calls.is_empty() {
            return Ok(Decision::CallTools(planned.tool_calls));
        }
        planned
            .reply
            .filter(|reply| !reply.trim().is_empty())
            .map(Decision::Reply)
            .ok_or_else(|| anyhow!("planner returned neither tool calls nor a reply"))
    }
}

/// Plays back a fixed list of decisions, one per call.
#[derive(Default)]
pub struct ScriptedDecisionModel {
    script: Mutex<VecDeque<Decision>>,
}

impl ScriptedDecisionModel {
    pub fn new(script: impl IntoIterator<Item = Decision>) -> Self {
        Self { script: Mutex::new(script.into_iter().collect()) }
    }
}

#[async_trait]
impl DecisionModel for ScriptedDecisionModel {
    async fn decide(&self, _transcript: &[ChatMessage]) -> Result<Decision> {
        self.script.lock().await.pop_front().ok_or_else(|| anyhow!("decision script is exhausted"))
    }
}

/// Stand-in when no planner is configured; every decision fails so the
/// runtime answers with its fallback reply.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableDecisionModel;

#[async_trait]
impl DecisionModel for UnavailableDecisionModel {
    async fn decide(&self, _transcript: &[ChatMessage]) -> Result<Decision> {
        bail!("no planner configured (set agent.planner_url)")
    }
}
