/// Single-use token rotation
///
/// Every authenticated request consumes the presented token and receives a
/// replacement, but only when its business effect succeeds:
///
/// 1. lease the token record and validate it (store gate, then signature)
/// 2. check ownership when the request targets an owned resource
/// 3. sign the replacement
/// 4. run the effect while the lease is held
/// 5. on success revoke the old token and persist the replacement in one
///    commit; on failure release the lease and leave the token active
///
/// Concurrent requests presenting the same token queue on the lease. Whoever
/// gets it second finds the token revoked and is rejected as `Invalid`
/// before its effect runs. Step 5 runs to completion even if the request is
/// dropped while it is in flight.

use std::future::Future;
use std::sync::Arc;

use crate::audit::{AuditLog, AuditStatus};
use crate::auth::codec::TokenCodec;
use crate::auth::identity::OwnerId;
use crate::auth::issuer::TokenIssuer;
use crate::auth::store::{TokenLease, TokenStore};
use crate::auth::validator::TokenValidator;
use crate::auth::TokenError;
use crate::error::AppError;

/// What the presented token must be entitled to
#[derive(Debug, Clone, Copy)]
pub enum Access<'a> {
    /// Any valid token
    Authenticated,
    /// A valid token whose owner is exactly this identity
    Owner(&'a OwnerId),
}

/// Result of a rotated request: the effect's output and the token the caller
/// must present next
#[derive(Debug)]
pub struct Rotated<T> {
    pub data: T,
    pub token: String,
}

pub struct RotationCoordinator {
    issuer: TokenIssuer,
    validator: TokenValidator,
}

impl RotationCoordinator {
    pub fn new(codec: TokenCodec, store: Arc<dyn TokenStore>) -> Self {
        let codec = Arc::new(codec);
        Self {
            issuer: TokenIssuer::new(codec.clone(), store.clone()),
            validator: TokenValidator::new(codec, store),
        }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    /// Run `effect` on behalf of the holder of `token` and rotate the token
    /// if and only if the effect succeeds.
    ///
    /// `effect` is not polled until authentication and authorization have
    /// passed, so a rejected request has no side effects.
    ///
    /// # Errors
    /// - `Invalid` / `Persistence` from validation
    /// - `Forbidden` if `access` names a different owner
    /// - the effect's own error (token left active)
    /// - `PartialFailure` if the effect committed but the token swap did not
    pub async fn rotate<T, Fut>(
        &self,
        token: &str,
        access: Access<'_>,
        effect: Fut,
    ) -> Result<Rotated<T>, AppError>
    where
        Fut: Future<Output = Result<T, AppError>>,
    {
        let (lease, owner) = self.validator.validate_for_rotation(token).await?;

        if let Access::Owner(target) = access {
            if *target != owner {
                release(lease).await;
                AuditLog::new("ROTATE", "token", AuditStatus::Failure, "Token owner does not own target")
                    .with_user_id(&owner)
                    .with_resource_id(target)
                    .log();
                return Err(TokenError::Forbidden.into());
            }
        }

        let replacement = match self.issuer.mint(&owner) {
            Ok(replacement) => replacement,
            Err(e) => {
                release(lease).await;
                return Err(e.into());
            }
        };

        let data = match effect.await {
            Ok(data) => data,
            Err(e) => {
                release(lease).await;
                tracing::info!(user_id = %owner, "Operation failed, token left active");
                return Err(e);
            }
        };

        self.issuer
            .reissue(lease, replacement.clone(), owner.clone())
            .await
            .map_err(|e| {
                AuditLog::new("ROTATE", "token", AuditStatus::Failure, "Replacement token not persisted")
                    .with_user_id(&owner)
                    .log();
                TokenError::PartialFailure(e)
            })?;

        AuditLog::new("ROTATE", "token", AuditStatus::Success, "Token consumed and replaced")
            .with_user_id(&owner)
            .log();

        Ok(Rotated {
            data,
            token: replacement,
        })
    }
}

async fn release(lease: Box<dyn TokenLease>) {
    if let Err(e) = lease.release().await {
        tracing::warn!(error = %e, "Failed to release token lease");
    }
}
