use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{HeaderMap, AUTHORIZATION};
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::config::{JwtAlgorithm, JwtConfig};
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
}

impl Identity {
    pub fn user(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Clone, Debug)]
pub enum Credentials {
    Bearer(String),
    Anonymous,
}

impl Credentials {
    /// Read an `Authorization: Bearer` header. The scheme is case-insensitive.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .and_then(|v| {
                let (scheme, token) = v.split_once(' ')?;
                scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
            })
            .filter(|t| !t.is_empty());
        match token {
            Some(t) => Self::Bearer(t.to_string()),
            None => Self::Anonymous,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    ReadConfig,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadConfig => write!(f, "read-config"),
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity>;
    async fn authorize(&self, identity: &Identity, action: &Action) -> ServerResult<bool>;
}

/// Refuses every caller. Used when no token verification is configured.
pub struct DenyAllAuth;

#[async_trait]
impl AuthProvider for DenyAllAuth {
    async fn authenticate(&self, _credentials: &Credentials) -> ServerResult<Identity> {
        Err(ServerError::Unauthorized("token verification is not configured".into()))
    }

    async fn authorize(&self, _identity: &Identity, _action: &Action) -> ServerResult<bool> {
        Ok(false)
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Option<String>,
    identity: Option<String>,
}

/// Verifies signed bearer tokens. Any holder of a valid token is authorized.
pub struct JwtAuth {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuth {
    pub fn hs256(secret: &[u8]) -> Self {
        Self::with_key(DecodingKey::from_secret(secret), Algorithm::HS256)
    }

    pub fn rs256_pem(pem: &[u8]) -> ServerResult<Self> {
        let key = DecodingKey::from_rsa_pem(pem)
            .map_err(|e| ServerError::Config(format!("invalid RSA public key: {e}")))?;
        Ok(Self::with_key(key, Algorithm::RS256))
    }

    pub fn from_config(config: &JwtConfig) -> ServerResult<Self> {
        match config.algorithm {
            JwtAlgorithm::HS256 => {
                let secret = config
                    .secret
                    .as_deref()
                    .ok_or_else(|| ServerError::Config("jwt.secret is not set".into()))?;
                Ok(Self::hs256(secret.as_bytes()))
            }
            JwtAlgorithm::RS256 => {
                let path = config
                    .public_key_file
                    .as_ref()
                    .ok_or_else(|| ServerError::Config("jwt.public_key_file is not set".into()))?;
                Self::rs256_pem(&std::fs::read(path)?)
            }
        }
    }

    fn with_key(key: DecodingKey, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.required_spec_claims.clear();
        validation.validate_aud = false;
        Self { key, validation }
    }
}

#[async_trait]
impl AuthProvider for JwtAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        let Credentials::Bearer(token) = credentials else {
            return Err(ServerError::Unauthorized("bearer token required".into()));
        };
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| ServerError::Unauthorized(format!("invalid token: {e}")))?;
        data.claims
            .identity
            .or(data.claims.sub)
            .map(Identity::user)
            .ok_or_else(|| ServerError::Unauthorized("token names no identity".into()))
    }

    async fn authorize(&self, _identity: &Identity, _action: &Action) -> ServerResult<bool> {
        Ok(true)
    }
}

/// Extractor yielding the authenticated caller, or a 401 rejection.
#[derive(Debug)]
pub struct Authenticated(pub Identity);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let credentials = Credentials::from_headers(&parts.headers);
        let identity = state.auth.authenticate(&credentials).await?;
        Ok(Self(identity))
    }
}
