//! Authentication gate
//!
//! Validates bearer tokens against the configured trust source and turns the
//! result into a [`TokenOutcome`]. The gate never rejects on its own; the
//! admission pipeline decides what an outcome means for a given route class.

use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use jsonwebtoken::{
    Algorithm, DecodingKey, Validation, decode, decode_header, errors::ErrorKind, jwk::JwkSet,
};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{AuthConfig, TrustSourceKind};

/// Authenticated identity derived from a validated token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// Token subject
    pub subject: String,
    /// Always true for principals produced by the gate
    pub authenticated: bool,
    /// Realm and client roles carried by the token
    pub roles: Vec<String>,
    /// Token expiry (seconds since epoch)
    pub expires_at: usize,
}

/// Role list claim
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleClaim {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm_access: Option<RoleClaim>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_access: Option<FxHashMap<String, RoleClaim>>,
}

impl Claims {
    /// Realm roles plus roles granted for `client`, de-duplicated
    #[must_use]
    pub fn roles(&self, client: Option<&str>) -> Vec<String> {
        let mut roles = BTreeSet::new();

        if let Some(realm) = &self.realm_access {
            roles.extend(realm.roles.iter().cloned());
        }
        let client_roles = client
            .zip(self.resource_access.as_ref())
            .and_then(|(client, resources)| resources.get(client));
        if let Some(client_roles) = client_roles {
            roles.extend(client_roles.roles.iter().cloned());
        }

        roles.into_iter().collect()
    }
}

/// Token validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Missing 'kid' in token header")]
    MissingKeyId,

    #[error("No signing key for kid '{0}'")]
    UnknownKey(String),

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Trust source unavailable: {0}")]
    TrustSource(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        match error.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Invalid(error.to_string()),
        }
    }
}

impl From<reqwest::Error> for TokenError {
    fn from(error: reqwest::Error) -> Self {
        Self::TrustSource(error.to_string())
    }
}

/// Result of presenting a (possibly absent) token to the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenOutcome {
    /// No bearer token on the request
    NoToken,
    /// Token verified
    Valid(Principal),
    /// Token present but rejected
    Invalid(TokenError),
}

impl TokenOutcome {
    /// Principal if the token verified
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Valid(principal) => Some(principal),
            _ => None,
        }
    }

    /// Take the principal out of the outcome
    #[must_use]
    pub fn into_principal(self) -> Option<Principal> {
        match self {
            Self::Valid(principal) => Some(principal),
            _ => None,
        }
    }
}

impl std::fmt::Display for TokenOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid(principal) => {
                write!(f, "Authenticated (Principal: {})", principal.subject)
            }
            Self::NoToken => f.write_str("Unauthenticated"),
            Self::Invalid(e) => write!(f, "Unauthenticated ({e})"),
        }
    }
}

/// Source of truth for token signatures
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify signature and standard claims, returning the decoded claims
    async fn verify(&self, token: &str) -> Result<Claims, TokenError>;
}

/// Build a validation template from configuration
pub fn build_validation(config: &AuthConfig) -> anyhow::Result<Validation> {
    let algorithms = config
        .allowed_algorithms
        .iter()
        .map(|alg| Algorithm::from_str(alg))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow::anyhow!("Unsupported token algorithm: {e}"))?;

    let first = algorithms
        .first()
        .copied()
        .ok_or_else(|| anyhow::anyhow!("No token algorithms configured"))?;

    let mut validation = Validation::new(first);
    validation.algorithms = algorithms;
    validation.leeway = config.leeway_seconds;
    match &config.audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }
    if let Some(issuer) = &config.issuer {
        validation.set_issuer(&[issuer]);
    }

    Ok(validation)
}

/// Verifies tokens signed with a shared HMAC secret
pub struct SecretVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl SecretVerifier {
    pub fn new(config: &AuthConfig) -> anyhow::Result<Self> {
        Ok(Self {
            key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation: build_validation(config)?,
        })
    }
}

#[async_trait]
impl TokenVerifier for SecretVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        Ok(decode::<Claims>(token, &self.key, &self.validation)?.claims)
    }
}

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    jwks_uri: String,
}

/// Verifies tokens against an issuer's published key set
///
/// The discovery document and key set are fetched on first use and cached.
/// A token naming an unknown `kid` triggers a refetch of the key set, at most
/// once per refetch interval. Concurrent misses wait on a single fetch and
/// then read its result.
pub struct JwksVerifier {
    client: reqwest::Client,
    discovery_url: Option<String>,
    jwks_uri: RwLock<Option<String>>,
    keys: RwLock<Option<Arc<JwkSet>>>,
    fetch_lock: tokio::sync::Mutex<()>,
    last_fetch: Mutex<Option<Instant>>,
    refetch_interval: Duration,
    validation: Validation,
}

impl JwksVerifier {
    pub fn new(config: &AuthConfig) -> anyhow::Result<Self> {
        if config.discovery_url.is_none() && config.jwks_url.is_none() {
            anyhow::bail!("JWKS trust source needs a discovery URL or a JWKS URL");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_seconds.max(1)))
            .build()?;

        Ok(Self {
            client,
            discovery_url: config.discovery_url.clone(),
            jwks_uri: RwLock::new(config.jwks_url.clone()),
            keys: RwLock::new(None),
            fetch_lock: tokio::sync::Mutex::new(()),
            last_fetch: Mutex::new(None),
            refetch_interval: Duration::from_secs(config.jwks_refetch_interval_seconds),
            validation: build_validation(config)?,
        })
    }

    async fn jwks_uri(&self) -> Result<String, TokenError> {
        if let Some(uri) = self.jwks_uri.read().clone() {
            return Ok(uri);
        }

        let discovery_url = self
            .discovery_url
            .as_deref()
            .ok_or_else(|| TokenError::TrustSource("no discovery URL".to_string()))?;

        info!("Fetching discovery document from {}", discovery_url);
        let document: DiscoveryDocument = self
            .client
            .get(discovery_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| TokenError::TrustSource(format!("discovery document missing 'jwks_uri': {e}")))?;

        *self.jwks_uri.write() = Some(document.jwks_uri.clone());
        Ok(document.jwks_uri)
    }

    async fn fetch_keys(&self) -> Result<Arc<JwkSet>, TokenError> {
        let uri = self.jwks_uri().await?;
        info!("Fetching JWKS from {}", uri);

        let keys: JwkSet = self
            .client
            .get(&uri)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let keys = Arc::new(keys);
        *self.keys.write() = Some(Arc::clone(&keys));
        Ok(keys)
    }

    /// Fetch the key set unless a fetch started within the refetch interval
    ///
    /// Inside the interval the cached set is returned as is; with nothing
    /// cached that is a trust source error.
    async fn refresh_keys(&self) -> Result<Arc<JwkSet>, TokenError> {
        let _fetching = self.fetch_lock.lock().await;

        let last_fetch = *self.last_fetch.lock();
        if last_fetch.is_some_and(|at| at.elapsed() < self.refetch_interval) {
            debug!("JWKS fetched within the last {:?}, not refetching", self.refetch_interval);
            return self.keys.read().clone().ok_or_else(|| {
                TokenError::TrustSource("key set unavailable, retrying later".to_string())
            });
        }

        *self.last_fetch.lock() = Some(Instant::now());
        self.fetch_keys()
            .await
            .inspect_err(|e| error!("JWKS fetch failed: {}", e))
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, TokenError> {
        let cached = self.keys.read().clone();
        let keys = match cached {
            Some(keys) if keys.find(kid).is_some() => {
                debug!("Using cached JWKS");
                keys
            }
            _ => self.refresh_keys().await?,
        };

        let jwk = keys
            .find(kid)
            .ok_or_else(|| TokenError::UnknownKey(kid.to_string()))?;
        Ok(DecodingKey::from_jwk(jwk)?)
    }
}

#[async_trait]
impl TokenVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let header = decode_header(token)?;
        let kid = header.kid.ok_or(TokenError::MissingKeyId)?;
        let key = self.decoding_key(&kid).await?;
        Ok(decode::<Claims>(token, &key, &self.validation)?.claims)
    }
}

/// Turns optional bearer tokens into outcomes
#[derive(Clone)]
pub struct AuthenticationGate {
    verifier: Arc<dyn TokenVerifier>,
    role_client: Option<String>,
}

impl std::fmt::Debug for AuthenticationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationGate")
            .field("verifier", &"Arc<dyn TokenVerifier>")
            .field("role_client", &self.role_client)
            .finish()
    }
}

impl AuthenticationGate {
    /// Create a gate around an explicit verifier
    pub fn new(verifier: Arc<dyn TokenVerifier>, role_client: Option<String>) -> Self {
        Self {
            verifier,
            role_client,
        }
    }

    /// Create a gate for the configured trust source
    pub fn from_config(config: &AuthConfig) -> anyhow::Result<Self> {
        let verifier: Arc<dyn TokenVerifier> = match config.trust_source {
            TrustSourceKind::Secret => Arc::new(SecretVerifier::new(config)?),
            TrustSourceKind::Jwks => Arc::new(JwksVerifier::new(config)?),
        };
        Ok(Self::new(verifier, config.audience.clone()))
    }

    /// Validate a token, if one was presented
    pub async fn authenticate(&self, token: Option<&str>) -> TokenOutcome {
        let Some(token) = token else {
            return TokenOutcome::NoToken;
        };

        match self.verifier.verify(token).await {
            Ok(claims) => {
                let roles = claims.roles(self.role_client.as_deref());
                TokenOutcome::Valid(Principal {
                    subject: claims.sub,
                    authenticated: true,
                    roles,
                    expires_at: claims.exp,
                })
            }
            Err(e) => {
                warn!("JWT validation failed: {}", e);
                TokenOutcome::Invalid(e)
            }
        }
    }
}

/// Extract a bearer token from the `Authorization` header
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
