//! Dashboard forwarding against a throwaway local HTTP listener.

use std::time::Duration;

use coalesce_rs::config::EngineConfig;
use coalesce_rs::engine::{Consumer as _, Engine};
use coalesce_rs::forward::DashboardForwarder;
use coalesce_rs::ingest::InboundMessage;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Accept one request, answer with `status`, and return the raw request.
async fn one_shot_server(status: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if request_complete(&buf) {
                break;
            }
        }
        let response =
            format!("HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&buf).into_owned()
    });

    (format!("http://{addr}"), handle)
}

fn request_complete(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let length = text[..header_end]
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    buf.len() >= header_end + 4 + length
}

fn request_json(raw: &str) -> Value {
    let (_, body) = raw.split_once("\r\n\r\n").expect("no body");
    serde_json::from_str(body).expect("body is not json")
}

fn message() -> InboundMessage {
    InboundMessage {
        key: "5511999@c.us-acme".to_string(),
        text: "ignored".to_string(),
        from: "5511999@c.us".to_string(),
        message_id: Some("wamid.1".to_string()),
        company_id: "acme".to_string(),
    }
}

#[tokio::test]
async fn delivery_posts_burst_to_dashboard() {
    let (base, server) = one_shot_server("200 OK").await;
    // Trailing slash on the base URL must not double up.
    let forwarder = DashboardForwarder::new(&SecretString::from(format!("{base}/"))).unwrap();

    let consumer = forwarder.consumer_for(&message());
    consumer
        .deliver("A B".to_string(), "5511999@c.us-acme".to_string())
        .await
        .unwrap();

    let raw = server.await.unwrap();
    assert!(
        raw.starts_with("POST /api/webhooks/whatsapp "),
        "unexpected request line: {raw}"
    );
    assert_eq!(
        request_json(&raw),
        json!({
            "message": "A B",
            "from": "5511999@c.us",
            "id": "wamid.1",
            "companyId": "acme",
        })
    );
}

#[tokio::test]
async fn non_success_status_is_a_delivery_failure() {
    let (base, server) = one_shot_server("500 Internal Server Error").await;
    let forwarder = DashboardForwarder::new(&SecretString::from(base)).unwrap();

    let result = forwarder
        .consumer_for(&message())
        .deliver("A".to_string(), "k".to_string())
        .await;

    assert!(result.is_err());
    server.await.unwrap();
}

#[tokio::test]
async fn engine_forwards_one_request_per_burst() {
    let (base, server) = one_shot_server("200 OK").await;
    let forwarder = DashboardForwarder::new(&SecretString::from(base)).unwrap();
    let engine = Engine::new(EngineConfig::new(Duration::from_millis(50))).unwrap();

    let msg = message();
    for text in ["first", "second", "third"] {
        assert!(engine.submit(&msg.key, text, forwarder.consumer_for(&msg)));
    }

    tokio::time::timeout(Duration::from_secs(5), engine.drain())
        .await
        .expect("burst did not settle");

    let raw = server.await.unwrap();
    assert_eq!(request_json(&raw)["message"], "first second third");
}
