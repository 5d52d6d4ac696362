//! HTTP handlers

pub mod events;
pub mod forward_auth;
pub mod health;

pub use events::{initiate_checkout, publish_audit_event, publish_event};
pub use forward_auth::forward_auth;
pub use health::{health_check, metrics};
