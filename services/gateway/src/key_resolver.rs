//! Rate-limit key resolution from the transport-level peer address

use axum::extract::{ConnectInfo, Request};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use tracing::debug;

/// Partition key for per-client throttling
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    /// Key text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<IpAddr> for RateLimitKey {
    fn from(ip: IpAddr) -> Self {
        // IPv4-mapped IPv6 peers share a key with their IPv4 form
        let ip = match ip {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(IpAddr::V6(v6), IpAddr::V4),
            v4 => v4,
        };
        Self(ip.to_string())
    }
}

/// Derive the rate-limit key from a peer address
///
/// Returns `None` when no peer address is known; such requests are not
/// throttled.
#[must_use]
pub fn resolve(remote: Option<SocketAddr>) -> Option<RateLimitKey> {
    let key = remote.map(|addr| RateLimitKey::from(addr.ip()));
    match &key {
        Some(key) => debug!("Resolved IP address: {}", key),
        None => debug!("No remote address, request will not be rate limited"),
    }
    key
}

/// Peer address recorded by the server's connect-info layer
#[must_use]
pub fn remote_addr(request: &Request) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}
