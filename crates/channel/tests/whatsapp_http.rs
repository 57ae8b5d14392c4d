use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use orderbot_channel::WhatsAppDelivery;
use orderbot_core::delivery::{DeliveryError, MessageDelivery, OutboundMessage};
use orderbot_core::domain::session::ConversationKey;

/// Accepts one connection, captures the raw request and answers with `status_line`.
async fn one_shot_server(status_line: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let base_url = format!("http://{}", listener.local_addr().expect("addr"));

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut request = Vec::new();
        let mut buffer = [0_u8; 4096];

        loop {
            let read = socket.read(&mut buffer).await.expect("read");
            if read == 0 {
                break;
            }
            request.extend_from_slice(&buffer[..read]);
            if request_is_complete(&request) {
                break;
            }
        }

        let response = format!("{status_line}\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{{}}");
        socket.write_all(response.as_bytes()).await.expect("write");
        String::from_utf8_lossy(&request).into_owned()
    });

    (base_url, handle)
}

fn request_is_complete(request: &[u8]) -> bool {
    let text = String::from_utf8_lossy(request);
    let Some((head, body)) = text.split_once("\r\n\r\n") else {
        return false;
    };
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);
    body.len() >= content_length
}

#[tokio::test]
async fn text_message_is_posted_with_bearer_token_and_normalized_recipient() {
    let (base_url, server) = one_shot_server("HTTP/1.1 200 OK").await;
    let delivery =
        WhatsAppDelivery::new(&base_url, "1098765", "EAAG-test".to_string().into()).expect("client");
    let key = ConversationKey::new("5215550001", "+521 55 1234 5678");

    delivery.deliver(&key, &OutboundMessage::text("Order placed")).await.expect("deliver");

    let request = server.await.expect("server task");
    assert!(request.starts_with("POST /1098765/messages"), "request: {request}");
    assert!(request.to_ascii_lowercase().contains("authorization: bearer eaag-test"));
    assert!(request.contains("\"to\":\"525512345678\""));
    assert!(request.contains("Order placed"));
}

#[tokio::test]
async fn non_success_status_is_reported_as_rejection() {
    let (base_url, server) = one_shot_server("HTTP/1.1 400 Bad Request").await;
    let delivery =
        WhatsAppDelivery::new(&base_url, "1098765", "EAAG-test".to_string().into()).expect("client");
    let key = ConversationKey::new("5215550001", "5215550002");

    let result = delivery.deliver(&key, &OutboundMessage::text("hello")).await;
    server.await.expect("server task");

    assert!(matches!(result, Err(DeliveryError::Rejected(_))), "got {result:?}");
}
