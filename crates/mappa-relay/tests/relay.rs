use std::time::Duration;

use mappa_relay::{RelayError, TelegramRelay};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "123:ABC";
const SEND_PATH: &str = "/bot123:ABC/sendMessage";

fn relay_for(server: &MockServer) -> TelegramRelay {
    TelegramRelay::new(TOKEN, "4242")
        .with_base_url(server.uri())
        .with_delay(Duration::from_millis(5))
}

async fn sent_texts(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .map(|req| {
            let body: Value = serde_json::from_slice(&req.body).unwrap();
            body["text"].as_str().unwrap().to_string()
        })
        .collect()
}

#[tokio::test]
async fn send_one_posts_escaped_html_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(body_json(json!({
            "chat_id": "4242",
            "text": "x &lt; y &amp;&amp; y &lt; z",
            "parse_mode": "HTML"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    relay_for(&server).send_one("x < y && y < z").await.unwrap();
}

#[tokio::test]
async fn send_one_reports_telegram_description_on_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: chat not found"
        })))
        .mount(&server)
        .await;

    let err = relay_for(&server).send_one("hello").await.unwrap_err();
    assert!(matches!(err, RelayError::Rejected { .. }), "{err:?}");
    assert_eq!(
        err.to_string(),
        "Telegram answered 400 Bad Request: Bad Request: chat not found"
    );
}

#[tokio::test]
async fn send_one_falls_back_to_raw_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = relay_for(&server).send_one("hello").await.unwrap_err();
    assert!(err.to_string().ends_with("upstream down"), "{err}");
}

#[tokio::test]
async fn transport_errors_do_not_leak_the_token() {
    // Nothing listens on port 9 of localhost in the test environment.
    let relay = TelegramRelay::new(TOKEN, "4242").with_base_url("http://127.0.0.1:9");
    let err = relay.send_one("hello").await.unwrap_err();
    assert!(matches!(err, RelayError::Transport(_)), "{err:?}");
    assert!(!err.to_string().contains("ABC"), "{err}");
}

#[tokio::test]
async fn send_many_sends_everything_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(3)
        .mount(&server)
        .await;

    let sent = relay_for(&server)
        .send_many(&["one", "two", "three"])
        .await
        .unwrap();
    assert_eq!(sent, 3);
    assert_eq!(sent_texts(&server).await, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn send_many_keeps_going_after_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(body_partial_json(json!({"text": "two"})))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "ok": false,
            "description": "Too Many Requests: retry after 1"
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(2)
        .mount(&server)
        .await;

    let err = relay_for(&server)
        .send_many(&["one", "two", "three"])
        .await
        .unwrap_err();

    let RelayError::Partial { attempted, failures } = &err else {
        panic!("expected partial failure, got {err:?}");
    };
    assert_eq!(*attempted, 3);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].index, 2);

    let message = err.to_string();
    assert!(message.contains("Msg 2: "), "{message}");
    assert!(!message.contains("Msg 1") && !message.contains("Msg 3"), "{message}");
    assert_eq!(sent_texts(&server).await, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn send_many_waits_between_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let relay = relay_for(&server).with_delay(Duration::from_millis(60));
    let started = std::time::Instant::now();
    relay.send_many(&["a", "b", "c"]).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(120));
}

#[tokio::test]
async fn empty_batch_sends_nothing() {
    let server = MockServer::start().await;
    let sent = relay_for(&server).send_many::<&str>(&[]).await.unwrap();
    assert_eq!(sent, 0);
    assert!(sent_texts(&server).await.is_empty());
}
