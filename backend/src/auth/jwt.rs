use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Who a verified token speaks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("token expired")]
    Expired,

    #[error("token invalid: {0}")]
    Invalid(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Expired | SessionError::Invalid(_) => {
                AppError::Forbidden("Invalid or expired token".into())
            }
            SessionError::Signing(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

/// Issues and checks stateless HS256 bearer tokens.
///
/// Nothing is stored server-side: a token stays valid until `exp` even after
/// logout or a password change. There is no revocation list.
#[derive(Clone)]
pub struct SessionManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.jwt_secret.as_bytes(),
            Duration::seconds(config.jwt_ttl_secs),
        )
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: Uuid, email: &str) -> Result<String, SessionError> {
        self.issue_at(user_id, email, Utc::now())
    }

    pub fn issue_at(
        &self,
        user_id: Uuid,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<String, SessionError> {
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| SessionError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Identity, SessionError> {
        self.verify_at(token, Utc::now())
    }

    /// Signature and shape are checked by `jsonwebtoken`; expiry is checked
    /// here against `now`, with no leeway.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| SessionError::Invalid(e.to_string()))?;

        if data.claims.exp <= now.timestamp() {
            return Err(SessionError::Expired);
        }

        Ok(Identity {
            user_id: data.claims.sub,
            email: data.claims.email,
        })
    }
}
