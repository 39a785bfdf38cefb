//! Session cookies
//!
//! A session is an HS256 JWT stored in an HTTP-only cookie. Besides the
//! user id it carries the backend access token obtained at login, which
//! the forwarder falls back to when a request has no Authorization header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::api::server::AppState;
use crate::config::SessionConfig;
use crate::error::{GateError, Result};
use crate::proxy::SessionLookup;

/// Session claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// Subject (user identifier)
    pub sub: String,
    /// Backend bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl SessionClaims {
    pub fn new(user_id: &str, access_token: Option<String>, expiry_hours: i64) -> Result<Self> {
        let now = Utc::now();
        let exp = TimeDelta::try_hours(expiry_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                GateError::Internal(format!(
                    "session TTL of {} hours is out of range",
                    expiry_hours
                ))
            })?;

        Ok(Self {
            sub: user_id.to_string(),
            access_token,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        })
    }
}

/// Issues and validates session tokens
#[derive(Clone)]
pub struct SessionAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    cookie_name: String,
    ttl_hours: i64,
}

impl SessionAuth {
    /// Create a session handler.
    ///
    /// If the secret is empty, a random secret is generated and sessions
    /// do not survive a restart.
    pub fn new(config: &SessionConfig) -> Self {
        let key = if config.jwt_secret.is_empty() {
            let mut key_bytes = [0u8; 32];
            OsRng.fill_bytes(&mut key_bytes);

            debug!("Generated random session secret");
            key_bytes.to_vec()
        } else {
            config.jwt_secret.as_bytes().to_vec()
        };

        Self {
            encoding_key: EncodingKey::from_secret(&key),
            decoding_key: DecodingKey::from_secret(&key),
            cookie_name: config.cookie_name.clone(),
            ttl_hours: config.ttl_hours,
        }
    }

    pub fn ttl_hours(&self) -> i64 {
        self.ttl_hours
    }

    /// Issue a session token for the given user
    pub fn issue(&self, user_id: &str, access_token: Option<String>) -> Result<String> {
        self.issue_with_ttl(user_id, access_token, self.ttl_hours)
    }

    fn issue_with_ttl(
        &self,
        user_id: &str,
        access_token: Option<String>,
        ttl_hours: i64,
    ) -> Result<String> {
        let claims = SessionClaims::new(user_id, access_token, ttl_hours)?;

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            error!("Failed to issue session token: {}", e);
            GateError::Internal("failed to issue session".to_string())
        })
    }

    /// Validate a session token and return the claims
    pub fn validate(&self, token: &str) -> Result<SessionClaims> {
        decode::<SessionClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Session validation failed: {}", e);
                GateError::InvalidSession
            })
    }

    /// Session token from the request cookies, if any
    pub fn session_token<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        cookie_value(headers, &self.cookie_name)
    }

    /// Claims of the current session
    pub fn current(&self, headers: &HeaderMap) -> Result<SessionClaims> {
        let token = self.session_token(headers).ok_or(GateError::MissingSession)?;
        self.validate(token)
    }

    /// `Set-Cookie` value establishing a session
    pub fn set_cookie(&self, token: &str) -> String {
        format!(
            "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
            self.cookie_name,
            token,
            self.ttl_hours * 3600
        )
    }

    /// `Set-Cookie` value ending the session
    pub fn clear_cookie(&self) -> String {
        format!(
            "{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0",
            self.cookie_name
        )
    }
}

impl SessionLookup for SessionAuth {
    fn access_token(&self, headers: &HeaderMap) -> Option<String> {
        self.current(headers).ok().and_then(|claims| claims.access_token)
    }
}

/// Find a cookie by name across all `Cookie` headers
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Extractor for requests carrying a valid session
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub claims: SessionClaims,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = GateError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let claims = state.sessions.current(&parts.headers)?;

        Ok(AuthenticatedUser {
            user_id: claims.sub.clone(),
            claims,
        })
    }
}
