//! Integration test: inbound activities register a conversation, then the notify trigger
//! resumes it through a stub connector running on another port.

use axum::{extract::Path, routing::post, Json, Router};
use proactive::config::Config;
use proactive::gateway;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Received = Arc<Mutex<Vec<(String, Value)>>>;

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

/// Stub channel connector: records every posted activity and answers with a fresh id.
async fn spawn_connector() -> (String, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    let app = Router::new().route(
        "/v3/conversations/:conversation_id/activities",
        post(move |Path(conversation_id): Path<String>, Json(body): Json<Value>| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().push((conversation_id, body));
                Json(json!({ "id": uuid::Uuid::new_v4().to_string() }))
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind connector");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}/", addr), received)
}

async fn start_gateway() -> String {
    let port = free_port();
    let mut config = Config::default();
    config.gateway.port = port;
    config.gateway.bind = "127.0.0.1".to_string();
    config.notify.timeout_secs = 5;
    tokio::spawn(async move {
        let _ = gateway::run_gateway(config).await;
    });

    let base = format!("http://127.0.0.1:{}", port);
    let client = reqwest::Client::new();
    for _ in 0..100 {
        if let Ok(resp) = client.get(format!("{}/", base)).send().await {
            if resp.status().is_success() {
                return base;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("gateway at {} did not come up within 5s", base);
}

fn activity(typ: &str, from: &str, conversation: &str, service_url: &str) -> Value {
    json!({
        "type": typ,
        "id": format!("{}-{}", typ, from),
        "serviceUrl": service_url,
        "channelId": "emulator",
        "from": { "id": from },
        "recipient": { "id": "bot", "role": "bot" },
        "conversation": { "id": conversation },
        "membersAdded": [{ "id": from }, { "id": "bot" }],
        "text": "hello"
    })
}

async fn notify(client: &reqwest::Client, base: &str, user: &str, message: &str) -> String {
    let resp = client
        .get(format!("{}/api/notify", base))
        .query(&[("user", user), ("message", message)])
        .send()
        .await
        .expect("notify request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/html"), "content type {}", content_type);
    resp.text().await.expect("notify body")
}

#[tokio::test]
async fn registered_user_receives_proactive_message() {
    let (connector_url, received) = spawn_connector().await;
    let base = start_gateway().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/messages", base))
        .json(&activity("conversationUpdate", "alice", "conv-1", &connector_url))
        .send()
        .await
        .expect("post activity");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    {
        let received = received.lock().unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].1["text"], "Welcome to the Proactive Bot sample");
        let hint = received[1].1["text"].as_str().unwrap_or_default();
        assert!(hint.contains("/api/notify?user=alice&message="), "hint: {}", hint);
    }

    let page = notify(&client, &base, "alice", "hi").await;
    assert!(page.contains("<h1>Proactive messages have been sent</h1>"), "page: {}", page);
    assert!(page.ends_with("Exception: </body></html>"), "page: {}", page);

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 3);
    let (conversation_id, body) = &received[2];
    assert_eq!(conversation_id, "conv-1");
    assert_eq!(body["type"], "message");
    assert_eq!(body["text"], "hi");
    assert_eq!(body["from"]["id"], "bot");
    assert_eq!(body["recipient"]["id"], "alice");
}

#[tokio::test]
async fn unknown_user_gets_no_conversation_page() {
    let base = start_gateway().await;
    let client = reqwest::Client::new();

    let page = notify(&client, &base, "bob", "hi").await;
    assert!(page.contains("<h1>No messages sent</h1>"), "page: {}", page);
    assert!(page.contains("proactive messages for bob."), "page: {}", page);

    // Missing parameters behave like an unknown user, still 200.
    let resp = client
        .get(format!("{}/api/notify", base))
        .send()
        .await
        .expect("notify without params");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert!(resp.text().await.unwrap_or_default().contains("No messages sent"));
}

#[tokio::test]
async fn failed_delivery_is_reported_with_success_status() {
    let base = start_gateway().await;
    let client = reqwest::Client::new();
    // Nothing listens here, so every send fails.
    let dead_connector = format!("http://127.0.0.1:{}/", free_port());

    let resp = client
        .post(format!("{}/api/messages", base))
        .json(&activity("message", "carol", "conv-9", &dead_connector))
        .send()
        .await
        .expect("post activity");
    // The echo reply failed, but the reference was stored before replying.
    assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

    let health: Value = client
        .get(format!("{}/", base))
        .send()
        .await
        .expect("health")
        .json()
        .await
        .expect("health json");
    assert_eq!(health["conversations"], 1);
    assert_eq!(health["users"], json!(["carol"]));

    let page = notify(&client, &base, "carol", "hi").await;
    assert!(page.contains("<h1>Proactive messages have been sent</h1>"), "page: {}", page);
    assert!(page.contains("Exception: connector request failed"), "page: {}", page);

    // The gateway keeps serving after the failure.
    let page = notify(&client, &base, "dave", "hi").await;
    assert!(page.contains("No messages sent"));
}
