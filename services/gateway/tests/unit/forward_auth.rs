//! Forward-auth endpoint tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use rstest::*;
use serde_json::json;
use tower::ServiceExt;

use edge_gateway::{GatewayConfig, handlers::forward_auth::FORWARDED_URI_HEADER};

use super::helpers::*;

#[fixture]
fn test_config() -> GatewayConfig {
    crate::init_test_env();
    create_test_config()
}

#[rstest]
#[case::get(TestRequest::get("/auth"))]
#[case::post(TestRequest::post("/auth"))]
#[tokio::test]
async fn test_public_uri_granted(test_config: GatewayConfig, #[case] request: TestRequest) {
    let app = build_app(&test_config, RecordingBroker::accepting());

    let response = app
        .oneshot(request.header(FORWARDED_URI_HEADER, "/public/index.html").build())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"message": "Public access granted", "user_id": null, "roles": []})
    );
}

#[rstest]
#[tokio::test]
async fn test_query_string_ignored_for_classification(test_config: GatewayConfig) {
    let app = build_app(&test_config, RecordingBroker::accepting());

    let response = app
        .oneshot(
            TestRequest::get("/auth")
                .header(FORWARDED_URI_HEADER, "/public/search?q=/api/x")
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[rstest]
#[tokio::test]
async fn test_protected_uri_with_valid_token(test_config: GatewayConfig) {
    let app = build_app(&test_config, RecordingBroker::accepting());
    let token = mint_token_with(TEST_SECRET, "carol", 3600, &["user", "auditor", "user"]);

    let response = app
        .oneshot(
            TestRequest::get("/auth")
                .header(FORWARDED_URI_HEADER, "/api/v1/orders")
                .bearer(token)
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "message": "Authentication successful",
            "user_id": "carol",
            "roles": ["auditor", "user"]
        })
    );
}

#[rstest]
#[case::protected("/api/v1/orders")]
#[case::default_class("/dashboard")]
#[tokio::test]
async fn test_non_public_uri_without_token(test_config: GatewayConfig, #[case] uri: &str) {
    let app = build_app(&test_config, RecordingBroker::accepting());

    let response = app
        .oneshot(TestRequest::get("/auth").header(FORWARDED_URI_HEADER, uri).build())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(
        body["error"]["message"],
        "Unauthorized: Missing or malformed Authorization header"
    );
}

#[rstest]
#[case::dot_segments("/public/../api/v1/checkout")]
#[case::encoded_dots("/public/%2e%2e/api/v1/checkout")]
#[case::encoded_slash("/public/%2E%2E%2Fapi/v1/checkout")]
#[case::above_root("/public/../../api/v1/checkout")]
#[case::broken_escape("/public/%zz")]
#[tokio::test]
async fn test_traversal_out_of_public_needs_token(test_config: GatewayConfig, #[case] uri: &str) {
    let app = build_app(&test_config, RecordingBroker::accepting());

    let response = app
        .oneshot(TestRequest::get("/auth").header(FORWARDED_URI_HEADER, uri).build())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[rstest]
#[tokio::test]
async fn test_traversal_into_public_granted(test_config: GatewayConfig) {
    let app = build_app(&test_config, RecordingBroker::accepting());

    let response = app
        .oneshot(
            TestRequest::get("/auth")
                .header(FORWARDED_URI_HEADER, "/api/v1/../../public/index.html")
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "Public access granted");
}

#[rstest]
#[tokio::test]
async fn test_unnormalizable_uri_denied_with_token(test_config: GatewayConfig) {
    let app = build_app(&test_config, RecordingBroker::accepting());

    let response = app
        .oneshot(
            TestRequest::get("/auth")
                .header(FORWARDED_URI_HEADER, "/api/../../api/v1/admin")
                .bearer(mint_token_with(TEST_SECRET, "mallory", 3600, &["user"]))
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await["error"]["message"],
        "Forbidden: No access control configured for: /api/../../api/v1/admin"
    );
}

#[rstest]
#[tokio::test]
async fn test_role_mapping_public_prefix_granted(test_config: GatewayConfig) {
    let app = build_app(&test_config, RecordingBroker::accepting());

    let response = app
        .oneshot(
            TestRequest::get("/auth")
                .header(FORWARDED_URI_HEADER, "/docs/getting-started")
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["user_id"], json!(null));
}

#[rstest]
#[tokio::test]
async fn test_missing_header_defaults_to_root(test_config: GatewayConfig) {
    let app = build_app(&test_config, RecordingBroker::accepting());

    let response = app
        .oneshot(TestRequest::get("/auth").bearer(valid_token("dave")).build())
        .await
        .unwrap();

    // No rule covers "/"
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"]["error"], "access_denied");
    assert_eq!(
        body["error"]["message"],
        "Forbidden: No access control configured for: /"
    );
}

#[rstest]
#[case::no_roles("/api/v1/orders", &[], "Forbidden: Token contains no roles")]
#[case::unmapped("/dashboard", &["user"], "Forbidden: No access control configured for: /dashboard")]
#[case::insufficient(
    "/api/v1/admin/users",
    &["user"],
    "Forbidden: Insufficient roles. Required: [\"admin\"]"
)]
#[tokio::test]
async fn test_role_check_denied(
    test_config: GatewayConfig,
    #[case] uri: &str,
    #[case] roles: &[&str],
    #[case] message: &str,
) {
    let app = build_app(&test_config, RecordingBroker::accepting());

    let response = app
        .oneshot(
            TestRequest::get("/auth")
                .header(FORWARDED_URI_HEADER, uri)
                .bearer(mint_token_with(TEST_SECRET, "frank", 3600, roles))
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"]["message"], message);
}

#[rstest]
#[tokio::test]
async fn test_longest_prefix_grants_admin(test_config: GatewayConfig) {
    let app = build_app(&test_config, RecordingBroker::accepting());

    let response = app
        .oneshot(
            TestRequest::get("/auth")
                .header(FORWARDED_URI_HEADER, "/api/v1/admin/users?page=2")
                .bearer(mint_token_with(TEST_SECRET, "grace", 3600, &["admin"]))
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"message": "Authentication successful", "user_id": "grace", "roles": ["admin"]})
    );
}

#[rstest]
#[tokio::test]
async fn test_expired_token_rejected(test_config: GatewayConfig) {
    let app = build_app(&test_config, RecordingBroker::accepting());

    let response = app
        .oneshot(
            TestRequest::post("/auth")
                .header(FORWARDED_URI_HEADER, "/api/v1/orders")
                .bearer(expired_token("erin"))
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["error"]["message"],
        "Unauthorized: Token expired"
    );
}
