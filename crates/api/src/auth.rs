//! Bearer token authentication.
//!
//! Tokens are HS256 JWTs. The [`authenticate`] middleware decodes the
//! `Authorization` header and stores an [`AuthUser`] in the request
//! extensions; handlers that need a caller take `AuthUser` as a parameter.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use common::{RoleId, User, UserId};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature does not match any known key")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("signing key rejected: {0}")]
    Key(String),

    #[error("claims encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i64,
    roles: Vec<i32>,
    iat: i64,
    exp: i64,
}

/// Issues and verifies access tokens.
///
/// Signing always uses the active key. Verification also accepts retired
/// keys so tokens survive a key rotation until they expire.
#[derive(Clone)]
pub struct TokenCodec {
    active: Arc<SecretString>,
    retired: Arc<[SecretString]>,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(active: SecretString, retired: Vec<SecretString>, ttl_secs: i64) -> Self {
        Self {
            active: Arc::new(active),
            retired: retired.into(),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Issues a token for `user` valid from now.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        self.issue_at(user, Utc::now())
    }

    fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<String, TokenError> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };
        let claims = Claims {
            sub: user.id.as_i64(),
            roles: user.roles.iter().map(RoleId::as_i32).collect(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
        let claims = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signing_input = format!("{header}.{claims}");
        let signature = sign(&self.active, &signing_input)?;
        Ok(format!("{signing_input}.{signature}"))
    }

    pub fn decode(&self, token: &str) -> Result<AuthUser, TokenError> {
        self.decode_at(token, Utc::now())
    }

    fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<AuthUser, TokenError> {
        let (signing_input, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let (header, claims) = signing_input
            .split_once('.')
            .filter(|(_, claims)| !claims.contains('.'))
            .ok_or(TokenError::Malformed)?;

        let header: Header = decode_part(header)?;
        if header.alg != ALGORITHM {
            return Err(TokenError::Malformed);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;
        let verified = std::iter::once(self.active.as_ref())
            .chain(self.retired.iter())
            .any(|key| verify(key, signing_input, &signature));
        if !verified {
            return Err(TokenError::BadSignature);
        }

        let claims: Claims = decode_part(claims)?;
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(AuthUser {
            id: UserId::new(claims.sub),
            roles: claims.roles.into_iter().map(RoleId::new).collect(),
        })
    }
}

fn mac_for(key: &SecretString) -> Result<HmacSha256, TokenError> {
    HmacSha256::new_from_slice(key.expose_secret().as_bytes())
        .map_err(|e| TokenError::Key(e.to_string()))
}

fn sign(key: &SecretString, input: &str) -> Result<String, TokenError> {
    let mut mac = mac_for(key)?;
    mac.update(input.as_bytes());
    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

fn verify(key: &SecretString, input: &str, signature: &[u8]) -> bool {
    let Ok(mut mac) = mac_for(key) else {
        return false;
    };
    mac.update(input.as_bytes());
    mac.verify_slice(signature).is_ok()
}

fn decode_part<T: serde::de::DeserializeOwned>(part: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub roles: Vec<RoleId>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&RoleId::ADMIN)
    }

    /// Allows the owner of a resource and admins.
    pub fn ensure_owner(&self, owner: UserId) -> Result<(), ApiError> {
        if self.id == owner || self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "not allowed to access this resource".to_string(),
            ))
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("admin role required".to_string()))
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))
    }
}

/// Decodes the bearer token, if any, into an [`AuthUser`] extension.
///
/// A header that is not of the form `Bearer <token>` is rejected. A token
/// that fails verification leaves the request unauthenticated.
pub async fn authenticate(
    State(tokens): State<TokenCodec>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(value) = request.headers().get(AUTHORIZATION) else {
        return next.run(request).await;
    };

    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty() && !t.contains(' '));
    let Some(token) = token else {
        return ApiError::Unauthorized("malformed authorization header".to_string())
            .into_response();
    };

    match tokens.decode(token) {
        Ok(user) => {
            request.extensions_mut().insert(user);
        }
        Err(err) => tracing::debug!(error = %err, "ignoring unusable token"),
    }
    next.run(request).await
}
