//! Job token minting and verification. Single-use redemption bookkeeping
//! lives on the bus keyspace (`codr_bus`), not here — this module only
//! signs and checks HMAC-signed claims.

use chrono::{Duration, Utc};
use codr_ids::JobId;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub job_id: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MintedToken {
    pub job_id: JobId,
    pub job_token: String,
    pub expires_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("malformed or invalid signature")]
    Invalid,
    #[error("token was minted for a different job")]
    JobMismatch,
}

pub struct TokenService {
    secret: String,
    expiration_minutes: i64,
}

impl TokenService {
    pub fn new(secret: impl Into<String>, expiration_minutes: i64) -> Self {
        Self {
            secret: secret.into(),
            expiration_minutes,
        }
    }

    /// Mint a single-use bearer token scoped to `job_id`.
    pub fn mint(&self, job_id: &JobId) -> MintedToken {
        let now = Utc::now();
        let expires_at = now + Duration::minutes(self.expiration_minutes);
        let claims = Claims {
            job_id: job_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: codr_ids::Jti::new().to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .expect("HMAC signing cannot fail for well-formed claims");

        MintedToken {
            job_id: job_id.clone(),
            job_token: token,
            expires_at,
        }
    }

    /// Verify `token` decodes, is unexpired, and matches `expected_job_id`.
    /// Does not check single-use redemption — the caller combines this
    /// with the bus's `used_token:{jti}` lookup.
    pub fn verify(&self, token: &str, expected_job_id: &JobId) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })?;

        if data.claims.job_id != expected_job_id.to_string() {
            return Err(TokenError::JobMismatch);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_then_verify_round_trips() {
        let service = TokenService::new("test-secret", 15);
        let job_id = JobId::new();
        let minted = service.mint(&job_id);
        let claims = service.verify(&minted.job_token, &job_id).unwrap();
        assert_eq!(claims.job_id, job_id.to_string());
    }

    #[test]
    fn verify_rejects_job_id_mismatch() {
        let service = TokenService::new("test-secret", 15);
        let job_id = JobId::new();
        let minted = service.mint(&job_id);
        let other = JobId::new();
        assert!(matches!(
            service.verify(&minted.job_token, &other),
            Err(TokenError::JobMismatch)
        ));
    }

    #[test]
    fn verify_rejects_expired_token() {
        let service = TokenService::new("test-secret", -1);
        let job_id = JobId::new();
        let minted = service.mint(&job_id);
        assert!(matches!(
            service.verify(&minted.job_token, &job_id),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn verify_rejects_bad_signature() {
        let service = TokenService::new("test-secret", 15);
        let other_service = TokenService::new("other-secret", 15);
        let job_id = JobId::new();
        let minted = service.mint(&job_id);
        assert!(matches!(
            other_service.verify(&minted.job_token, &job_id),
            Err(TokenError::Invalid)
        ));
    }
}
