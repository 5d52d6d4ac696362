//! Role-based access control for forward-auth
//!
//! Forwarded URIs are matched by plain prefix against the configured rules and
//! the longest covering prefix decides which roles may pass.

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{RoleMappingConfig, RoleRule};

/// Role that marks a prefix as public
pub const PUBLIC_ROLE: &str = "public";

/// Why a verified principal was refused
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("Token contains no roles")]
    NoRoles,

    #[error("No access control configured for: {0}")]
    Unmapped(String),

    #[error("Insufficient roles. Required: {required:?}")]
    InsufficientRoles { required: Vec<String> },
}

/// Compiled role mapping
#[derive(Debug, Clone, Default)]
pub struct RoleMapping {
    protected: Vec<RoleRule>,
    public: Vec<String>,
}

impl RoleMapping {
    #[must_use]
    pub fn new(config: &RoleMappingConfig) -> Self {
        let (public, protected): (Vec<RoleRule>, Vec<RoleRule>) = config
            .rules
            .iter()
            .cloned()
            .partition(|rule| rule.roles.is_empty() || rule.roles == [PUBLIC_ROLE]);

        for rule in &public {
            debug!("Detected public prefix: {}", rule.prefix);
        }
        info!(
            "Role mapping loaded: {} protected prefixes, {} public prefixes",
            protected.len(),
            public.len()
        );

        Self {
            protected,
            public: public.into_iter().map(|rule| rule.prefix).collect(),
        }
    }

    /// Whether a public rule covers `path`
    #[must_use]
    pub fn is_public(&self, path: &str) -> bool {
        self.public.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Roles of the longest protected prefix covering `path`
    #[must_use]
    pub fn required_roles(&self, path: &str) -> Option<&[String]> {
        self.protected
            .iter()
            .filter(|rule| path.starts_with(rule.prefix.as_str()))
            .max_by_key(|rule| rule.prefix.len())
            .map(|rule| rule.roles.as_slice())
    }

    /// Check a principal's roles against the rule covering `path`
    ///
    /// `path` is the normalized forwarded path, `None` when normalization
    /// failed; `uri` is what the caller sent and only feeds the message.
    pub fn authorize(&self, path: Option<&str>, uri: &str, roles: &[String]) -> Result<(), AccessDenied> {
        if roles.is_empty() {
            return Err(AccessDenied::NoRoles);
        }

        let required = path
            .and_then(|path| self.required_roles(path))
            .ok_or_else(|| AccessDenied::Unmapped(uri.to_string()))?;

        if required.iter().any(|role| roles.contains(role)) {
            Ok(())
        } else {
            Err(AccessDenied::InsufficientRoles {
                required: required.to_vec(),
            })
        }
    }
}
