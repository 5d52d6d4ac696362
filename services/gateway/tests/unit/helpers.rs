//! Test helpers and utilities

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Method, Request, Response, header},
};
use chrono::Utc;
use edge_common::{BrokerClient, BrokerError, BrokerResult};
use jsonwebtoken::{EncodingKey, Header, encode};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;

use edge_gateway::{AppState, GatewayConfig, RoleRule, create_router};

pub const TEST_SECRET: &str = "test-secret-key";

/// Test configuration factory
pub fn create_test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.server.compression = false;
    config.auth.jwt_secret = TEST_SECRET.to_string();
    config.rate_limiting.requests_per_minute = 100;
    config.rate_limiting.burst_size = 100;
    config.monitoring.metrics_enabled = false;
    config.role_mapping.rules = vec![
        RoleRule::new("/api/", ["user", "admin"]),
        RoleRule::new("/api/v1/admin", ["admin"]),
        RoleRule::new("/docs", ["public"]),
    ];
    config
}

/// Broker double that records every send and answers with a fixed verdict
pub struct RecordingBroker {
    accept: bool,
    calls: Mutex<Vec<(String, Vec<u8>)>>,
}

impl RecordingBroker {
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self {
            accept: true,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn declining() -> Arc<Self> {
        Arc::new(Self {
            accept: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, Vec<u8>)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl BrokerClient for RecordingBroker {
    async fn try_send(&self, binding: &str, payload: Vec<u8>) -> BrokerResult<()> {
        self.calls.lock().push((binding.to_string(), payload));
        if self.accept {
            Ok(())
        } else {
            Err(BrokerError::Transport("broker unavailable".to_string()))
        }
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Router over `config` publishing to `broker`
pub fn build_app(config: &GatewayConfig, broker: Arc<RecordingBroker>) -> Router {
    let state = AppState::new(config, broker).expect("state builds from test config");
    create_router(config, state)
}

/// Mint an HS256 token signed with `secret`
pub fn mint_token_with(secret: &str, subject: &str, exp_offset_secs: i64, roles: &[&str]) -> String {
    let now = Utc::now().timestamp();
    let claims = json!({
        "sub": subject,
        "iat": now,
        "exp": now + exp_offset_secs,
        "realm_access": { "roles": roles },
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .expect("token encodes")
}

/// Valid token for the test secret
pub fn valid_token(subject: &str) -> String {
    mint_token_with(TEST_SECRET, subject, 3600, &["user"])
}

/// Token that expired an hour ago
pub fn expired_token(subject: &str) -> String {
    mint_token_with(TEST_SECRET, subject, -3600, &["user"])
}

pub fn peer(addr: &str) -> SocketAddr {
    addr.parse().expect("valid socket address")
}

/// Builder for requests as the server would see them
pub struct TestRequest {
    method: Method,
    uri: String,
    token: Option<String>,
    body: Option<Value>,
    peer: Option<SocketAddr>,
    headers: Vec<(&'static str, String)>,
}

impl TestRequest {
    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            token: None,
            body: None,
            peer: Some(peer("203.0.113.7:51000")),
            headers: Vec::new(),
        }
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn from_peer(mut self, addr: &str) -> Self {
        self.peer = Some(peer(addr));
        self
    }

    pub fn without_peer(mut self) -> Self {
        self.peer = None;
        self
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn build(self) -> Request<Body> {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        if let Some(token) = self.token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }
        let body = match self.body {
            Some(body) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        let mut request = builder.body(body).expect("request builds");
        if let Some(addr) = self.peer {
            request.extensions_mut().insert(ConnectInfo(addr));
        }
        request
    }
}

/// Collect a response body as text
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

/// Collect a response body as JSON
pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}

pub fn audit_event() -> Value {
    json!({"id": "e1", "action": "login"})
}

pub fn shopping_cart() -> Value {
    json!({
        "id": "cart-42",
        "customer_id": "c-7",
        "items": [{"product_id": "sku-1", "quantity": 2}]
    })
}
