use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::error::{Error, Result};
use crate::middleware::auth::Claims;

pub fn issue_access_token(
    secret: &str,
    subject: &str,
    email: &str,
    ttl_minutes: i64,
    now: DateTime<Utc>,
) -> Result<String> {
    let expires_at = Duration::try_minutes(ttl_minutes)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| Error::Config(format!("Token lifetime of {} minutes is out of range", ttl_minutes)))?;
    let exp = expires_at.timestamp().max(0) as usize;
    let claims = Claims {
        sub: subject.to_string(),
        email: Some(email.to_string()),
        exp,
        role: None,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("Failed to sign token: {}", e)))
}

pub fn decode_access_token(secret: &str, token: &str) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| Error::Unauthorized("invalid_token".to_string()))
}
