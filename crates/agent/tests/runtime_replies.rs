mod common;

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;

use orderbot_agent::{AgentRuntime, Decision, RawToolCall, ScriptedDecisionModel, ToolCall, FALLBACK_REPLY};
use orderbot_core::delivery::MessageDelivery;

use common::{conversation, harness, RecordingDelivery};

fn runtime(
    script: Vec<Decision>,
    coordinator: Arc<orderbot_agent::TurnCoordinator>,
) -> (AgentRuntime, Arc<RecordingDelivery>) {
    let delivery = Arc::new(RecordingDelivery::default());
    let runtime = AgentRuntime::new(
        Arc::new(ScriptedDecisionModel::new(script)),
        coordinator,
        Arc::clone(&delivery) as Arc<dyn MessageDelivery>,
        4,
    );
    (runtime, delivery)
}

#[tokio::test]
async fn tool_round_then_reply_is_delivered() {
    let h = harness().await;
    let (runtime, delivery) = runtime(
        vec![
            Decision::call([
                ToolCall::AddItem { product_name: "Burger".to_string(), quantity: 1 },
                ToolCall::AddItem { product_name: "Burger".to_string(), quantity: 1 },
            ]),
            Decision::Reply("Two burgers coming up. Pickup or delivery?".to_string()),
        ],
        Arc::clone(&h.coordinator),
    );

    let reply = runtime.handle_message(&conversation(), None, "two burgers please", "corr-1").await;

    assert_eq!(reply.text, "Two burgers coming up. Pickup or delivery?");
    assert_eq!(reply.rounds, 1);
    assert!(!reply.degraded);
    assert_eq!(reply.cart.expect("cart after tools").total(), Decimal::new(2000, 2));

    let sent = delivery.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, conversation());
}

#[tokio::test]
async fn model_failure_degrades_to_the_fallback_reply() {
    let h = harness().await;
    let (runtime, delivery) = runtime(Vec::new(), Arc::clone(&h.coordinator));

    let reply = runtime.handle_message(&conversation(), None, "hello", "corr-2").await;

    assert_eq!(reply.text, FALLBACK_REPLY);
    assert!(reply.degraded);
    assert!(reply.cart.is_none());
    assert_eq!(delivery.sent.lock().await.len(), 1);
}

#[tokio::test]
async fn malformed_calls_are_reported_without_blocking_valid_ones() {
    let h = harness().await;
    let (runtime, _delivery) = runtime(
        vec![
            Decision::CallTools(vec![
                RawToolCall { name: "add_item".to_string(), arguments: json!({ "quantity": 1 }) },
                RawToolCall {
                    name: "add_item".to_string(),
                    arguments: json!({ "product_name": "Soda", "quantity": 2 }),
                },
            ]),
            Decision::Reply("Added your sodas.".to_string()),
        ],
        Arc::clone(&h.coordinator),
    );

    let reply = runtime.handle_message(&conversation(), None, "two sodas", "corr-3").await;

    assert_eq!(reply.text, "Added your sodas.");
    assert_eq!(reply.cart.expect("cart").total(), Decimal::new(400, 2));
}

#[tokio::test]
async fn exhausting_tool_rounds_stops_the_loop() {
    let h = harness().await;
    let script = (0..6).map(|_| Decision::call([ToolCall::GetTotal])).collect();
    let (runtime, _delivery) = runtime(script, Arc::clone(&h.coordinator));

    let reply = runtime.handle_message(&conversation(), None, "total?", "corr-4").await;

    assert_eq!(reply.rounds, 4);
    assert!(reply.degraded);
}

#[tokio::test]
async fn concurrent_messages_in_one_conversation_keep_both_exchanges() {
    let h = harness().await;
    let (runtime, delivery) = runtime(
        vec![Decision::Reply("first".to_string()), Decision::Reply("second".to_string())],
        Arc::clone(&h.coordinator),
    );
    let key = conversation();

    let (left, right) = tokio::join!(
        runtime.handle_message(&key, None, "hola", "corr-5"),
        runtime.handle_message(&key, None, "una hamburguesa", "corr-6"),
    );

    assert!(!left.degraded && !right.degraded);
    let transcript = runtime.transcript(&key).await;
    assert_eq!(transcript.len(), 4);
    let texts: Vec<&str> = transcript.iter().map(|message| message.content.as_str()).collect();
    assert!(texts.contains(&"hola"));
    assert!(texts.contains(&"una hamburguesa"));
    assert_eq!(delivery.sent.lock().await.len(), 2);
}

#[tokio::test]
async fn profile_name_reaches_the_session_through_the_loop() {
    let h = harness().await;
    let (runtime, _delivery) = runtime(
        vec![
            Decision::call([ToolCall::GetUserName]),
            Decision::Reply("Hi Ana!".to_string()),
        ],
        Arc::clone(&h.coordinator),
    );

    runtime.handle_message(&conversation(), Some("Ana"), "hi", "corr-7").await;

    let session = h.coordinator.session(&conversation()).await.expect("session");
    assert_eq!(session.display_name, "Ana");
    let transcript = runtime.transcript(&conversation()).await;
    assert!(transcript.iter().any(|message| message.content == "Ana"));
}
