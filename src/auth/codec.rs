/// Token Signing and Verification
///
/// Pure, I/O-free HS256 codec. One instance is built from `TokenSettings` at
/// startup and shared by the issuer and the validator.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::auth::claims::Claims;
use crate::auth::identity::OwnerId;
use crate::configuration::TokenSettings;
use crate::error::ConfigError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Malformed token, wrong algorithm, bad signature, or foreign issuer/audience
    #[error("token signature is invalid")]
    Signature,
    #[error("token has expired")]
    Expired,
    #[error("token could not be signed: {0}")]
    Signing(String),
}

/// Claims recovered from a verified token
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub owner: OwnerId,
    pub issued_at: i64,
    pub expires_at: i64,
}

pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    ttl_seconds: i64,
}

impl TokenCodec {
    /// Build a codec from settings
    ///
    /// # Errors
    /// Returns error if the secret is empty or the TTL is not positive
    pub fn new(settings: &TokenSettings) -> Result<Self, ConfigError> {
        if settings.secret.is_empty() {
            return Err(ConfigError::MissingRequired("token.secret".to_string()));
        }
        if settings.ttl_seconds <= 0 {
            return Err(ConfigError::InvalidValue(format!(
                "token.ttl_seconds must be positive, got {}",
                settings.ttl_seconds
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&settings.issuer]);
        validation.set_audience(&[&settings.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            ttl_seconds: settings.ttl_seconds,
        })
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Sign a fresh token for `owner`, issued now
    pub fn sign(&self, owner: &OwnerId) -> Result<String, CodecError> {
        self.sign_at(owner, chrono::Utc::now().timestamp())
    }

    /// Sign a token for `owner` as if issued at `issued_at` (Unix seconds)
    pub fn sign_at(&self, owner: &OwnerId, issued_at: i64) -> Result<String, CodecError> {
        let claims = Claims::new(
            owner.clone(),
            self.issuer.clone(),
            self.audience.clone(),
            issued_at,
            self.ttl_seconds,
        );

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| CodecError::Signing(e.to_string()))
    }

    /// Verify signature, algorithm, issuer, audience and expiry
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, CodecError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => CodecError::Expired,
                _ => {
                    tracing::debug!("Token verification error: {}", e);
                    CodecError::Signature
                }
            }
        })?;

        Ok(VerifiedToken {
            owner: data.claims.owner().clone(),
            issued_at: data.claims.iat,
            expires_at: data.claims.exp,
        })
    }
}
