/// Token Issuance
///
/// Signing and persisting are one failable operation: a token whose record
/// could not be written is never handed out, since it could never validate.

use std::sync::Arc;

use crate::auth::codec::{CodecError, TokenCodec};
use crate::auth::identity::OwnerId;
use crate::auth::store::{TokenLease, TokenStore};
use crate::auth::{StoreError, TokenError};

#[derive(Clone)]
pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
    store: Arc<dyn TokenStore>,
}

impl TokenIssuer {
    pub fn new(codec: Arc<TokenCodec>, store: Arc<dyn TokenStore>) -> Self {
        Self { codec, store }
    }

    /// Mint and persist a new active token for `owner`
    ///
    /// # Errors
    /// `Persistence` if the record cannot be written; `Signing` if the
    /// claims cannot be encoded
    pub async fn issue(&self, owner: &OwnerId) -> Result<String, TokenError> {
        let token = self.mint(owner)?;

        self.store.insert(&token, owner).await.map_err(|e| {
            tracing::error!(user_id = %owner, error = %e, "Failed to persist issued token");
            TokenError::Persistence(e)
        })?;

        tracing::info!(user_id = %owner, "Token issued");
        Ok(token)
    }

    /// Sign a token without persisting it. Only for replacement tokens that
    /// are persisted through [`TokenIssuer::reissue`].
    pub(crate) fn mint(&self, owner: &OwnerId) -> Result<String, TokenError> {
        self.codec.sign(owner).map_err(|e| match e {
            CodecError::Signing(msg) => TokenError::Signing(msg),
            other => TokenError::Signing(other.to_string()),
        })
    }

    /// Consume the leased token and persist its already-minted replacement.
    ///
    /// The commit runs on its own task: once the business effect has
    /// committed, dropping the request must not roll the swap back.
    pub(crate) async fn reissue(
        &self,
        lease: Box<dyn TokenLease>,
        replacement: String,
        owner: OwnerId,
    ) -> Result<(), StoreError> {
        tokio::spawn(async move { lease.consume_and_replace(&replacement, &owner).await })
            .await
            .map_err(|e| StoreError::Unavailable(format!("token commit task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory_store::MemoryTokenStore;
    use crate::auth::store::TokenStatus;
    use crate::configuration::TokenSettings;

    fn issuer_with(store: MemoryTokenStore) -> TokenIssuer {
        let codec = TokenCodec::new(&TokenSettings {
            secret: "issuer-test-secret-issuer-test-secret".to_string(),
            issuer: "iss".to_string(),
            audience: "aud".to_string(),
            ttl_seconds: 9999,
        })
        .unwrap();
        TokenIssuer::new(Arc::new(codec), Arc::new(store))
    }

    #[tokio::test]
    async fn test_issue_persists_active_record() {
        let store = MemoryTokenStore::new();
        let issuer = issuer_with(store.clone());

        let token = issuer.issue(&OwnerId::new("u7")).await.unwrap();
        assert_eq!(store.status_of(&token), Some(TokenStatus::Active));
    }

    #[tokio::test]
    async fn test_issue_fails_when_store_unreachable() {
        let store = MemoryTokenStore::new();
        store.set_reachable(false);
        let issuer = issuer_with(store.clone());

        let result = issuer.issue(&OwnerId::new("u7")).await;
        assert!(matches!(result, Err(TokenError::Persistence(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_consecutive_tokens_are_distinct() {
        let issuer = issuer_with(MemoryTokenStore::new());
        let owner = OwnerId::new("u7");

        let first = issuer.issue(&owner).await.unwrap();
        let second = issuer.issue(&owner).await.unwrap();
        assert_ne!(first, second);
    }
}
