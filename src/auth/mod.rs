/// Authentication module
///
/// Token lifecycle (signing, storage, validation, single-use rotation) and
/// password hashing.

mod claims;
mod codec;
mod identity;
mod issuer;
mod memory_store;
mod password;
mod rotation;
mod store;
mod validator;

use thiserror::Error;

pub use claims::{Claims, ClaimsData};
pub use codec::{CodecError, TokenCodec, VerifiedToken};
pub use identity::OwnerId;
pub use issuer::TokenIssuer;
pub use memory_store::MemoryTokenStore;
pub use password::{hash_password, verify_password};
pub use rotation::{Access, RotationCoordinator, Rotated};
pub use store::{hash_token, PgTokenStore, StoreError, TokenLease, TokenRecord, TokenStatus, TokenStore};
pub use validator::TokenValidator;

/// Failures of the token lifecycle as seen by a request
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("no bearer token presented")]
    MissingAuth,
    /// Unknown, revoked, forged and expired tokens are deliberately one case
    #[error("token is invalid")]
    Invalid,
    #[error("token owner does not match the targeted resource")]
    Forbidden,
    #[error("token store error: {0}")]
    Persistence(#[from] StoreError),
    /// The business effect committed but the old token could not be swapped
    /// for its replacement
    #[error("token rotation failed after the operation committed: {0}")]
    PartialFailure(StoreError),
    #[error("token signing failed: {0}")]
    Signing(String),
}
