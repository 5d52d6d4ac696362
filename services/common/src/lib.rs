//! Shared building blocks for the edge services
//!
//! Broker clients used to hand validated payloads to downstream consumers,
//! and the error types they report.

pub mod broker;
pub mod errors;

pub use broker::*;
pub use errors::*;
