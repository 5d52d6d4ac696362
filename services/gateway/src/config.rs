//! Configuration for the edge gateway
//!
//! Loaded once at start from a TOML file plus `GATEWAY__`-prefixed environment
//! overrides, then shared read-only for the life of the process.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Shipped value of `auth.jwt_secret`; refused at start
pub const PLACEHOLDER_SECRET: &str = "change-me";

/// Edge gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Token trust source configuration
    pub auth: AuthConfig,
    /// Path classification patterns
    pub routes: RouteConfig,
    /// Forward-auth role requirements
    pub role_mapping: RoleMappingConfig,
    /// Rate limiting configuration
    pub rate_limiting: RateLimitConfig,
    /// Broker configuration
    pub broker: BrokerConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Monitoring configuration
    pub monitoring: MonitoringConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    /// Enable compression
    pub compression: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            timeout_seconds: 30,
            max_body_size: 1024 * 1024, // 1MB
            compression: true,
        }
    }
}

/// Where token signing keys come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustSourceKind {
    /// Shared HMAC secret
    Secret,
    /// Issuer-published JSON Web Key Set
    Jwks,
}

/// Token validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Trust source kind
    pub trust_source: TrustSourceKind,
    /// Shared secret for `secret` trust source
    pub jwt_secret: String,
    /// OpenID discovery document URL for `jwks` trust source
    pub discovery_url: Option<String>,
    /// JWKS URL, skips discovery when set
    pub jwks_url: Option<String>,
    /// Expected `iss` claim
    pub issuer: Option<String>,
    /// Expected `aud` claim, also the client whose roles are read
    pub audience: Option<String>,
    /// Allowed token algorithms
    pub allowed_algorithms: Vec<String>,
    /// Clock skew tolerance for `exp`/`nbf`
    pub leeway_seconds: u64,
    /// Timeout for discovery and JWKS fetches
    pub fetch_timeout_seconds: u64,
    /// Minimum time between key set fetches triggered by unknown `kid`s
    pub jwks_refetch_interval_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            trust_source: TrustSourceKind::Secret,
            jwt_secret: PLACEHOLDER_SECRET.to_string(),
            discovery_url: None,
            jwks_url: None,
            issuer: None,
            audience: None,
            allowed_algorithms: vec!["HS256".to_string()],
            leeway_seconds: 60,
            fetch_timeout_seconds: 5,
            jwks_refetch_interval_seconds: 30,
        }
    }
}

/// Path classification patterns
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Paths admitted without identity
    pub public_patterns: Vec<String>,
    /// Paths requiring a valid identity
    pub protected_patterns: Vec<String>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            public_patterns: vec![
                "/public/**".to_string(),
                "/actuator/**".to_string(),
                "/v3/api-docs/**".to_string(),
                "/health".to_string(),
                "/metrics".to_string(),
                "/auth".to_string(),
            ],
            protected_patterns: vec!["/api/**".to_string()],
        }
    }
}

/// Roles required by `/auth` for forwarded URIs
///
/// Each rule covers URIs starting with its prefix; the longest covering prefix
/// decides. A rule with no roles, or with the single role `public`, marks its
/// prefix public.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleMappingConfig {
    pub rules: Vec<RoleRule>,
}

/// One URI prefix and the roles that may reach it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRule {
    pub prefix: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl RoleRule {
    pub fn new<S: Into<String>>(prefix: &str, roles: impl IntoIterator<Item = S>) -> Self {
        Self {
            prefix: prefix.to_string(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,
    /// Sustained requests per minute per key
    pub requests_per_minute: u32,
    /// Burst capacity per key
    pub burst_size: u32,
    /// Interval between sweeps of idle keys
    pub cleanup_interval_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: 100,
            burst_size: 100,
            cleanup_interval_seconds: 300,
        }
    }
}

/// Broker client implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerKind {
    /// In-process queues drained to the log
    InMemory,
    /// HTTP bridge to a remote broker
    Webhook,
}

/// Broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Broker client implementation
    pub kind: BrokerKind,
    /// Default broker name, its binding is `<name>-out-0`
    pub default_broker: String,
    /// Base URL for the webhook broker
    pub webhook_url: Option<String>,
    /// Per-send timeout in seconds
    pub timeout_seconds: u64,
    /// Queue capacity per binding for the in-memory broker
    pub channel_capacity: usize,
    /// Publish carts on checkout; when off checkout answers 501
    pub checkout_enabled: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            kind: BrokerKind::InMemory,
            default_broker: "audit".to_string(),
            webhook_url: None,
            timeout_seconds: 5,
            channel_capacity: 1024,
            checkout_enabled: true,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS
    pub enabled: bool,
    /// Allowed origins
    pub allowed_origins: Vec<String>,
    /// Allowed methods
    pub allowed_methods: Vec<String>,
    /// Allowed headers
    pub allowed_headers: Vec<String>,
    /// Allow credentials
    pub allow_credentials: bool,
    /// Max age for preflight requests
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec![
                "GET".to_string(),
                "POST".to_string(),
                "OPTIONS".to_string(),
            ],
            allowed_headers: vec![
                "Authorization".to_string(),
                "Content-Type".to_string(),
                "X-Requested-With".to_string(),
            ],
            allow_credentials: false,
            max_age_seconds: 86400, // 24 hours
        }
    }
}

/// Monitoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Enable Prometheus metrics
    pub metrics_enabled: bool,
    /// Metrics endpoint path
    pub metrics_path: String,
    /// Health check endpoint path
    pub health_path: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            metrics_path: "/metrics".to_string(),
            health_path: "/health".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from file
    pub fn from_file(path: &str) -> Result<Self> {
        Self::build(path, true)
    }

    /// Load configuration from `path` if it exists, else from defaults
    ///
    /// Environment overrides apply either way. A file that exists but does not
    /// parse or validate is an error.
    pub fn load(path: &str) -> Result<Self> {
        Self::build(path, false)
    }

    fn build(path: &str, required: bool) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(required))
            .add_source(config::Environment::with_prefix("GATEWAY").separator("__"))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that cannot work at runtime
    pub fn validate(&self) -> Result<()> {
        if self.broker.kind == BrokerKind::Webhook && self.broker.webhook_url.is_none() {
            bail!("broker.webhook_url is required for the webhook broker");
        }
        if self.broker.default_broker.is_empty() {
            bail!("broker.default_broker must not be empty");
        }
        if self.auth.trust_source == TrustSourceKind::Jwks
            && self.auth.discovery_url.is_none()
            && self.auth.jwks_url.is_none()
        {
            bail!("auth.discovery_url or auth.jwks_url is required for the jwks trust source");
        }
        if self.auth.trust_source == TrustSourceKind::Secret
            && (self.auth.jwt_secret.is_empty() || self.auth.jwt_secret == PLACEHOLDER_SECRET)
        {
            bail!(
                "auth.jwt_secret must be set for the secret trust source \
                 (e.g. GATEWAY__AUTH__JWT_SECRET); the placeholder is refused"
            );
        }
        if self.auth.allowed_algorithms.is_empty() {
            bail!("auth.allowed_algorithms must list at least one algorithm");
        }
        if let Some(rule) = self.role_mapping.rules.iter().find(|r| !r.prefix.starts_with('/')) {
            bail!("role_mapping prefix '{}' must start with '/'", rule.prefix);
        }
        Ok(())
    }

    /// Get server address
    #[must_use]
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
