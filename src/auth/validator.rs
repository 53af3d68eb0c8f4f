/// Token Validation
///
/// Two gates, store first: a token must have an active record *and* verify
/// cryptographically. Unknown, revoked, forged and expired tokens all come
/// back as the same `Invalid`.

use std::sync::Arc;

use crate::auth::codec::TokenCodec;
use crate::auth::identity::OwnerId;
use crate::auth::store::{TokenLease, TokenRecord, TokenStore};
use crate::auth::TokenError;

#[derive(Clone)]
pub struct TokenValidator {
    codec: Arc<TokenCodec>,
    store: Arc<dyn TokenStore>,
}

impl TokenValidator {
    pub fn new(codec: Arc<TokenCodec>, store: Arc<dyn TokenStore>) -> Self {
        Self { codec, store }
    }

    /// Resolve a presented token to its owner without consuming it
    pub async fn validate(&self, token: &str) -> Result<OwnerId, TokenError> {
        let record = match self.store.find_active(token).await? {
            Some(record) => record,
            None => {
                tracing::debug!("Token has no active record");
                return Err(TokenError::Invalid);
            }
        };

        self.verify_against(token, &record)
    }

    /// Validate and take the exclusive lease rotation needs. The lease is
    /// released again if cryptographic verification fails.
    pub async fn validate_for_rotation(
        &self,
        token: &str,
    ) -> Result<(Box<dyn TokenLease>, OwnerId), TokenError> {
        let lease = match self.store.lock_active(token).await? {
            Some(lease) => lease,
            None => {
                tracing::debug!("Token has no active record");
                return Err(TokenError::Invalid);
            }
        };

        match self.verify_against(token, lease.record()) {
            Ok(owner) => Ok((lease, owner)),
            Err(e) => {
                if let Err(release_err) = lease.release().await {
                    tracing::warn!(error = %release_err, "Failed to release token lease");
                }
                Err(e)
            }
        }
    }

    fn verify_against(&self, token: &str, record: &TokenRecord) -> Result<OwnerId, TokenError> {
        let verified = self.codec.verify(token).map_err(|e| {
            tracing::warn!(user_id = %record.owner, reason = %e, "Stored token failed verification");
            TokenError::Invalid
        })?;

        if verified.owner != record.owner {
            tracing::warn!(
                claimed = %verified.owner,
                stored = %record.owner,
                "Token claims disagree with stored owner"
            );
            return Err(TokenError::Invalid);
        }

        Ok(record.owner.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory_store::MemoryTokenStore;
    use crate::configuration::TokenSettings;

    fn codec() -> Arc<TokenCodec> {
        Arc::new(
            TokenCodec::new(&TokenSettings {
                secret: "validator-test-secret-validator-test".to_string(),
                issuer: "iss".to_string(),
                audience: "aud".to_string(),
                ttl_seconds: 9999,
            })
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_valid_token_resolves_owner() {
        let codec = codec();
        let store = MemoryTokenStore::new();
        let token = codec.sign(&OwnerId::new("u7")).unwrap();
        store.insert(&token, &OwnerId::new("u7")).await.unwrap();

        let validator = TokenValidator::new(codec, Arc::new(store));
        assert_eq!(validator.validate(&token).await.unwrap(), OwnerId::new("u7"));
    }

    #[tokio::test]
    async fn test_signed_but_unstored_token_is_invalid() {
        let codec = codec();
        let token = codec.sign(&OwnerId::new("u7")).unwrap();

        let validator = TokenValidator::new(codec, Arc::new(MemoryTokenStore::new()));
        assert!(matches!(validator.validate(&token).await, Err(TokenError::Invalid)));
    }

    #[tokio::test]
    async fn test_stored_but_forged_token_is_invalid() {
        let store = MemoryTokenStore::new();
        store.insert("hand-inserted-row", &OwnerId::new("u7")).await.unwrap();

        let validator = TokenValidator::new(codec(), Arc::new(store));
        assert!(matches!(
            validator.validate("hand-inserted-row").await,
            Err(TokenError::Invalid)
        ));
    }

    #[tokio::test]
    async fn test_owner_mismatch_between_claims_and_row_is_invalid() {
        let codec = codec();
        let store = MemoryTokenStore::new();
        let token = codec.sign(&OwnerId::new("u7")).unwrap();
        store.insert(&token, &OwnerId::new("u8")).await.unwrap();

        let validator = TokenValidator::new(codec, Arc::new(store));
        assert!(matches!(validator.validate(&token).await, Err(TokenError::Invalid)));
    }

    #[tokio::test]
    async fn test_store_outage_is_not_reported_as_invalid() {
        let store = MemoryTokenStore::new();
        store.set_reachable(false);

        let validator = TokenValidator::new(codec(), Arc::new(store));
        assert!(matches!(
            validator.validate("anything").await,
            Err(TokenError::Persistence(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_verification_releases_lease() {
        let store = MemoryTokenStore::new();
        store.insert("hand-inserted-row", &OwnerId::new("u7")).await.unwrap();
        let validator = TokenValidator::new(codec(), Arc::new(store.clone()));

        assert!(validator.validate_for_rotation("hand-inserted-row").await.is_err());
        // A second attempt would hang if the first lease were still held
        assert!(store.lock_active("hand-inserted-row").await.unwrap().is_some());
    }
}
