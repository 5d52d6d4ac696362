//! Unit tests module organization

pub mod events;
pub mod forward_auth;

// Test utilities and helpers
pub mod helpers;
