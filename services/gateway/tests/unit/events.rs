//! Event publication through the full router

use axum::{http::StatusCode, response::IntoResponse};
use pretty_assertions::assert_eq;
use rstest::*;
use serde::Serialize;
use tower::ServiceExt;

use edge_gateway::{EventPublisher, GatewayConfig, SHOPPING_CART_BINDING, handlers::publish_event};

use super::helpers::*;

#[fixture]
fn test_config() -> GatewayConfig {
    crate::init_test_env();
    create_test_config()
}

#[rstest]
#[tokio::test]
async fn test_audit_event_published(test_config: GatewayConfig) {
    let broker = RecordingBroker::accepting();
    let app = build_app(&test_config, broker.clone());

    let response = app
        .oneshot(
            TestRequest::post("/api/v1/audit/events")
                .bearer(valid_token("alice"))
                .json(audit_event())
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Message sent successfully");

    let calls = broker.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "audit-out-0");
    assert_eq!(
        String::from_utf8(calls[0].1.clone()).unwrap(),
        r#"{"id":"e1","action":"login"}"#
    );
}

#[rstest]
#[tokio::test]
async fn test_audit_event_uses_configured_broker(mut test_config: GatewayConfig) {
    test_config.broker.default_broker = "compliance".to_string();
    let broker = RecordingBroker::accepting();
    let app = build_app(&test_config, broker.clone());

    let response = app
        .oneshot(
            TestRequest::post("/api/v1/audit/events")
                .bearer(valid_token("alice"))
                .json(audit_event())
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(broker.calls()[0].0, "compliance-out-0");
}

#[rstest]
#[tokio::test]
async fn test_declined_publish_returns_500(test_config: GatewayConfig) {
    let broker = RecordingBroker::declining();
    let app = build_app(&test_config, broker.clone());

    let response = app
        .oneshot(
            TestRequest::post("/api/v1/audit/events")
                .bearer(valid_token("alice"))
                .json(audit_event())
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "Failed to send message");
    // Exactly one attempt, no retry
    assert_eq!(broker.call_count(), 1);
}

struct Unencodable;

impl Serialize for Unencodable {
    fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("value cannot be represented"))
    }
}

#[tokio::test]
async fn test_serialization_failure_never_reaches_broker() {
    let broker = RecordingBroker::accepting();
    let publisher = EventPublisher::new(broker.clone(), "audit");

    let response = publish_event(&publisher, "audit-out-0", &Unencodable)
        .await
        .unwrap_err()
        .into_response();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(response).await;
    assert!(body.starts_with("Failed to serialize event: "), "body was {body}");
    assert!(body.contains("value cannot be represented"));
    assert_eq!(broker.call_count(), 0);
}

#[rstest]
#[tokio::test]
async fn test_checkout_publishes_cart(test_config: GatewayConfig) {
    let broker = RecordingBroker::accepting();
    let app = build_app(&test_config, broker.clone());

    let response = app
        .oneshot(
            TestRequest::post("/api/v1/checkout")
                .bearer(valid_token("bob"))
                .json(shopping_cart())
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let calls = broker.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, SHOPPING_CART_BINDING);

    let published: serde_json::Value = serde_json::from_slice(&calls[0].1).unwrap();
    assert_eq!(published["id"], "cart-42");
    assert_eq!(published["items"][0]["quantity"], 2);
}

#[rstest]
#[tokio::test]
async fn test_checkout_disabled_returns_501(mut test_config: GatewayConfig) {
    test_config.broker.checkout_enabled = false;
    let broker = RecordingBroker::accepting();
    let app = build_app(&test_config, broker.clone());

    let response = app
        .oneshot(
            TestRequest::post("/api/v1/checkout")
                .bearer(valid_token("bob"))
                .json(shopping_cart())
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(broker.call_count(), 0);
}

#[rstest]
#[case::audit("/api/v1/audit/events", audit_event())]
#[case::checkout("/api/v1/checkout", shopping_cart())]
#[tokio::test]
async fn test_expired_token_never_publishes(
    test_config: GatewayConfig,
    #[case] uri: &str,
    #[case] body: serde_json::Value,
) {
    let broker = RecordingBroker::accepting();
    let app = build_app(&test_config, broker.clone());

    let response = app
        .oneshot(
            TestRequest::post(uri)
                .bearer(expired_token("alice"))
                .json(body)
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["error"], "authentication_failed");
    assert_eq!(broker.call_count(), 0);
}

#[rstest]
#[tokio::test]
async fn test_missing_token_never_publishes(test_config: GatewayConfig) {
    let broker = RecordingBroker::accepting();
    let app = build_app(&test_config, broker.clone());

    let response = app
        .oneshot(TestRequest::post("/api/v1/audit/events").json(audit_event()).build())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(broker.call_count(), 0);
}

#[rstest]
#[tokio::test]
async fn test_token_signed_with_other_secret_rejected(test_config: GatewayConfig) {
    let broker = RecordingBroker::accepting();
    let app = build_app(&test_config, broker.clone());
    let forged = mint_token_with("not-the-gateway-secret", "mallory", 3600, &["admin"]);

    let response = app
        .oneshot(
            TestRequest::post("/api/v1/audit/events")
                .bearer(forged)
                .json(audit_event())
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(broker.call_count(), 0);
}

#[rstest]
#[tokio::test]
async fn test_malformed_body_rejected_before_publish(test_config: GatewayConfig) {
    let broker = RecordingBroker::accepting();
    let app = build_app(&test_config, broker.clone());

    let response = app
        .oneshot(
            TestRequest::post("/api/v1/audit/events")
                .bearer(valid_token("alice"))
                .json(serde_json::json!({"id": "e1"}))
                .build(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    assert_eq!(broker.call_count(), 0);
}
