//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use spendbot_core::dispatcher::{HELP_TEXT, NOT_UNDERSTOOD, WELCOME};
use spendbot_core::test_utils::{ScriptedClassifier, TestHarness};
use spendbot_core::ClassifiedIntent;
use tower::ServiceExt;

const VERIFY_TOKEN: &str = "let-me-in";

fn setup_harness() -> TestHarness {
    TestHarness::new(
        ScriptedClassifier::new()
            .with("KFC 10", ClassifiedIntent::expense("KFC", 10, "Food/Dining"))
            .with("Taxi 20", ClassifiedIntent::expense("Taxi", 20, "Transport")),
    )
}

fn setup_test_app(h: &TestHarness) -> Router {
    let config = ServerConfig {
        verify_token: Some(VERIFY_TOKEN.to_string()),
    };
    create_router(h.dispatcher.clone(), config)
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get_body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn delivery(messages: &[(&str, &str)]) -> serde_json::Value {
    let messaging: Vec<_> = messages
        .iter()
        .map(|(psid, text)| {
            serde_json::json!({
                "sender": { "id": psid },
                "recipient": { "id": "page-1" },
                "message": { "mid": "m1", "text": text },
            })
        })
        .collect();
    serde_json::json!({
        "object": "page",
        "entry": [{ "id": "page-1", "time": 0, "messaging": messaging }],
    })
}

// ========== Handshake Tests ==========

#[tokio::test]
async fn test_verify_echoes_challenge() {
    let h = setup_harness();
    let response = setup_test_app(&h)
        .oneshot(get(
            "/webhook?hub.mode=subscribe&hub.verify_token=let-me-in&hub.challenge=12345",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_text(response).await, "12345");
}

#[tokio::test]
async fn test_verify_rejects_wrong_token() {
    let h = setup_harness();
    let response = setup_test_app(&h)
        .oneshot(get(
            "/webhook?hub.mode=subscribe&hub.verify_token=nope&hub.challenge=12345",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Verification failed");
}

#[tokio::test]
async fn test_verify_rejects_wrong_mode() {
    let h = setup_harness();
    let response = setup_test_app(&h)
        .oneshot(get(
            "/webhook?hub.mode=unsubscribe&hub.verify_token=let-me-in&hub.challenge=1",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_verify_rejects_when_no_token_configured() {
    let h = setup_harness();
    let app = create_router(h.dispatcher.clone(), ServerConfig::default());
    let response = app
        .oneshot(get(
            "/webhook?hub.mode=subscribe&hub.verify_token=let-me-in&hub.challenge=1",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_verify_without_params_is_ok() {
    let h = setup_harness();
    let response = setup_test_app(&h).oneshot(get("/webhook")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
}

// ========== Delivery Tests ==========

#[tokio::test]
async fn test_delivery_logs_expense_and_replies() {
    let h = setup_harness();
    let response = setup_test_app(&h)
        .oneshot(post_json("/webhook", delivery(&[("psid-1", "  KFC 10  ")])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "received");

    let texts = h.notifier.texts_for("psid-1");
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0], WELCOME);
    assert_eq!(texts[1], "Logged: KFC ($10.00) - Food/Dining");
    assert_eq!(h.db().user_stats("psid-1").unwrap().transaction_count, 1);
}

#[tokio::test]
async fn test_delivery_handles_every_event_in_order() {
    let h = setup_harness();
    let body = delivery(&[("psid-1", "KFC 10"), ("psid-2", "help"), ("psid-1", "Taxi 20")]);
    let response = setup_test_app(&h)
        .oneshot(post_json("/webhook", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        h.notifier.texts_for("psid-1"),
        vec![
            WELCOME.to_string(),
            "Logged: KFC ($10.00) - Food/Dining".to_string(),
            "Logged: Taxi ($20.00) - Transport".to_string(),
        ]
    );
    assert_eq!(
        h.notifier.texts_for("psid-2"),
        vec![WELCOME.to_string(), HELP_TEXT.to_string()]
    );
}

#[tokio::test]
async fn test_delivery_unclassified_message_gets_generic_reply() {
    let h = setup_harness();
    setup_test_app(&h)
        .oneshot(post_json("/webhook", delivery(&[("psid-1", "asdkjh")])))
        .await
        .unwrap();

    assert_eq!(
        h.notifier.texts_for("psid-1"),
        vec![WELCOME.to_string(), NOT_UNDERSTOOD.to_string()]
    );
    assert_eq!(h.db().user_stats("psid-1").unwrap().transaction_count, 0);
}

#[tokio::test]
async fn test_delivery_ignores_non_page_objects() {
    let h = setup_harness();
    let mut body = delivery(&[("psid-1", "KFC 10")]);
    body["object"] = serde_json::json!("instagram");

    let response = setup_test_app(&h)
        .oneshot(post_json("/webhook", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(h.notifier.sent().is_empty());
    assert!(h.db().get_user("psid-1").unwrap().is_none());
}

#[tokio::test]
async fn test_delivery_acknowledges_malformed_body() {
    let h = setup_harness();
    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = setup_test_app(&h).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "received");
    assert!(h.notifier.sent().is_empty());
}

// ========== Health & Headers ==========

#[tokio::test]
async fn test_health_reports_classifier() {
    let h = setup_harness();
    h.db().insert_user("psid-1", chrono::Utc::now()).unwrap();

    let response = setup_test_app(&h).oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["classifier"], "scripted://localhost");
    assert_eq!(json["users"], 1);
}

#[tokio::test]
async fn test_security_headers_present() {
    let h = setup_harness();
    let response = setup_test_app(&h).oneshot(get("/health")).await.unwrap();

    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
}
