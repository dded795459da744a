//! Webhook routing tests.

use coalesce_rs::error::Error;
use coalesce_rs::ingest::{Disposition, InboundMessage, route, route_json};
use serde_json::json;

fn body(event: &str, from: &str, text: Option<&str>) -> String {
    json!({
        "event": event,
        "payload": { "body": text, "from": from, "id": "wamid.1" }
    })
    .to_string()
}

#[test]
fn message_is_keyed_by_sender_and_company() {
    let disposition = route_json(&body("message", "5511999@c.us", Some("hi")), "acme").unwrap();

    assert_eq!(
        disposition,
        Disposition::Accepted(InboundMessage {
            key: "5511999@c.us-acme".to_string(),
            text: "hi".to_string(),
            from: "5511999@c.us".to_string(),
            message_id: Some("wamid.1".to_string()),
            company_id: "acme".to_string(),
        })
    );
}

#[test]
fn same_sender_different_companies_get_different_keys() {
    let key = |company: &str| match route_json(&body("message", "5511999@c.us", Some("hi")), company)
        .unwrap()
    {
        Disposition::Accepted(message) => message.key,
        Disposition::Ignored(reason) => panic!("unexpectedly ignored: {reason}"),
    };
    assert_ne!(key("acme"), key("globex"));
}

#[test]
fn non_message_events_are_errors() {
    let result = route_json(&body("ack", "5511999@c.us", Some("hi")), "acme");
    assert!(matches!(result, Err(Error::UnsupportedEvent(event)) if event == "ack"));
}

#[test]
fn status_broadcasts_are_ignored() {
    let disposition = route_json(&body("message", "status@broadcast", Some("hi")), "acme").unwrap();
    assert!(matches!(disposition, Disposition::Ignored(_)));
}

#[test]
fn empty_or_missing_body_is_ignored() {
    for text in [None, Some("")] {
        let disposition = route_json(&body("message", "5511999@c.us", text), "acme").unwrap();
        assert!(matches!(disposition, Disposition::Ignored(_)), "{text:?}");
    }
}

#[test]
fn missing_company_is_ignored() {
    let disposition = route_json(&body("message", "5511999@c.us", Some("hi")), "").unwrap();
    assert_eq!(disposition, Disposition::Ignored("missing company id"));
}

#[test]
fn malformed_json_is_an_error() {
    assert!(matches!(route_json("{not json", "acme"), Err(Error::Json(_))));
}

#[test]
fn route_accepts_a_parsed_envelope() {
    let envelope = serde_json::from_value(json!({
        "event": "message",
        "payload": { "body": "olá", "from": "123@c.us" }
    }))
    .unwrap();

    match route(envelope, "acme").unwrap() {
        Disposition::Accepted(message) => {
            assert_eq!(message.text, "olá");
            assert_eq!(message.message_id, None);
        }
        other => panic!("expected Accepted, got {other:?}"),
    }
}
