//! Signed, expiring tokens for unsubscribe links and other signed URLs.
//!
//! Tokens are compact three-part HS256 strings. Verification is strict:
//! zero expiry leeway, constant-time signature comparison (both provided by
//! the underlying JWT implementation). Replay protection is layered on top
//! via a best-effort consumption log keyed by `jti`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("signing secret is not configured")]
    MissingSecret,

    #[error("malformed token")]
    Malformed,

    #[error("bad signature")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// Issues and verifies signed tokens with a shared secret.
pub struct TokenCodec {
    secret: String,
}

impl TokenCodec {
    pub fn new(secret: impl Into<String>) -> Result<Self, TokenError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        Ok(Self { secret })
    }

    /// Sign a payload into a compact token valid for `ttl`.
    pub fn issue(&self, payload: &Map<String, Value>, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(payload, ttl, Utc::now().timestamp())
    }

    /// Sign a payload with a fresh unique `jti` for one-time consumption.
    /// Returns the token and the jti.
    pub fn issue_with_jti(
        &self,
        payload: &Map<String, Value>,
        ttl: Duration,
    ) -> Result<(String, String), TokenError> {
        let jti = uuid::Uuid::new_v4().to_string();
        let mut claims = payload.clone();
        claims.insert("jti".to_string(), Value::String(jti.clone()));
        let token = self.issue(&claims, ttl)?;
        Ok((token, jti))
    }

    fn issue_at(
        &self,
        payload: &Map<String, Value>,
        ttl: Duration,
        issued_at: i64,
    ) -> Result<String, TokenError> {
        let mut claims = payload.clone();
        claims.insert("iat".to_string(), Value::from(issued_at));
        claims.insert("exp".to_string(), Value::from(issued_at + ttl.as_secs() as i64));

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify signature and expiry, returning the decoded payload
    /// (including any `jti`).
    pub fn verify(&self, token: &str) -> Result<Map<String, Value>, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        decode::<Map<String, Value>>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            _ => TokenError::Malformed,
        })
    }
}

/// A recorded one-time consumption, keyed by the token's `jti`
#[derive(Debug, Clone)]
pub struct ConsumptionRecord {
    pub message_id: String,
    pub user_id: Option<String>,
    pub event_type: String,
    pub consumed_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
#[error("consumption log error: {0}")]
pub struct ConsumptionLogError(pub String);

/// Append-only event log used to detect token replay.
#[async_trait]
pub trait ConsumptionLog: Send + Sync {
    async fn find_consumption(
        &self,
        jti: &str,
    ) -> Result<Option<ConsumptionRecord>, ConsumptionLogError>;

    async fn append_consumption(
        &self,
        record: &ConsumptionRecord,
    ) -> Result<(), ConsumptionLogError>;
}

/// Outcome of a jti replay check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JtiCheck {
    pub already_used: bool,
    /// False when the log could not be consulted; tracking is best-effort
    /// and a lookup failure is not an error
    pub tracked: bool,
}

/// Check whether a jti has already been consumed. Log failures degrade to
/// `tracked = false` rather than propagating.
pub async fn consume_jti(log: &dyn ConsumptionLog, jti: &str) -> JtiCheck {
    match log.find_consumption(jti).await {
        Ok(Some(_)) => JtiCheck {
            already_used: true,
            tracked: true,
        },
        Ok(None) => JtiCheck {
            already_used: false,
            tracked: true,
        },
        Err(e) => {
            tracing::warn!("jti lookup failed for {}: {}", jti, e);
            JtiCheck {
                already_used: false,
                tracked: false,
            }
        }
    }
}

/// Best-effort append of a consumption record. Failures are logged and
/// swallowed so they can never block the primary flow.
pub async fn record_jti_consumed(
    log: &dyn ConsumptionLog,
    jti: &str,
    user_id: Option<&str>,
    event_type: &str,
) {
    let record = ConsumptionRecord {
        message_id: jti.to_string(),
        user_id: user_id.map(str::to_string),
        event_type: event_type.to_string(),
        consumed_at: Utc::now(),
    };
    if let Err(e) = log.append_consumption(&record).await {
        tracing::warn!("failed to record jti consumption for {}: {}", jti, e);
    }
}
