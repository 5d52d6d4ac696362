//! Event publication endpoints

use axum::{
    Extension,
    extract::State,
    response::Json,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    auth::Principal,
    error::GatewayError,
    models::{AuditEvent, ShoppingCart},
    publisher::{EventPublisher, SHOPPING_CART_BINDING},
    server::AppState,
};

/// Body returned when the broker accepts a message
pub const SEND_OK_MESSAGE: &str = "Message sent successfully";

/// Publish `event` on `binding` and map the outcome to a response
pub async fn publish_event<E>(
    publisher: &EventPublisher,
    binding: &str,
    event: &E,
) -> Result<&'static str, GatewayError>
where
    E: Serialize + Sync + ?Sized,
{
    publisher.try_publish(binding, event).await?;
    Ok(SEND_OK_MESSAGE)
}

fn caller(principal: Option<&Extension<Principal>>) -> &str {
    principal.map_or("anonymous", |Extension(p)| p.subject.as_str())
}

/// `POST /api/v1/audit/events`
pub async fn publish_audit_event(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
    Json(event): Json<AuditEvent>,
) -> Result<&'static str, GatewayError> {
    info!(
        "Audit event {} ({}) received from {}",
        event.id,
        event.action,
        caller(principal.as_ref())
    );
    let binding = state.publisher.default_binding().to_string();
    publish_event(&state.publisher, &binding, &event).await
}

/// `POST /api/v1/checkout`
pub async fn initiate_checkout(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
    Json(cart): Json<ShoppingCart>,
) -> Result<&'static str, GatewayError> {
    debug!("Cart object received: {:?}", cart);

    if !state.checkout_enabled {
        return Err(GatewayError::NotImplemented("Checkout"));
    }

    info!(
        "Checkout of cart {} with {} item(s) initiated by {}",
        cart.id,
        cart.items.len(),
        caller(principal.as_ref())
    );
    publish_event(&state.publisher, SHOPPING_CART_BINDING, &cart).await
}
