/// Token Store
///
/// Server-side ledger of issued tokens. Records are keyed by the SHA-256
/// digest of the token string (the plaintext never reaches the database) and
/// move from `active` to `revoked` exactly once; rows are never deleted.
///
/// Callers that must act on a token atomically take a [`TokenLease`] via
/// [`TokenStore::lock_active`]. While a lease is held no other lease on the
/// same token can be granted; leases on different tokens are independent.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;

use crate::auth::identity::OwnerId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token store unavailable: {0}")]
    Unavailable(String),
    #[error("token already exists")]
    Duplicate,
    /// The conditional `active -> revoked` write found the record no longer active
    #[error("token is no longer active")]
    Conflict,
    #[error("token store query failed: {0}")]
    Query(String),
}

const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::Duplicate
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
            _ => StoreError::Query(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Active,
    Revoked,
}

impl TokenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStatus::Active => "active",
            TokenStatus::Revoked => "revoked",
        }
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TokenStatus::Active),
            "revoked" => Ok(TokenStatus::Revoked),
            other => Err(StoreError::Query(format!("unknown token status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub token_hash: String,
    pub owner: OwnerId,
    pub status: TokenStatus,
    pub created_at: DateTime<Utc>,
}

/// Hash a token using SHA-256
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Create an `active` record; fails with `Duplicate` if the token exists
    async fn insert(&self, token: &str, owner: &OwnerId) -> Result<(), StoreError>;

    /// Return the record only if it exists and is `active`.
    /// Revoked and unknown tokens are indistinguishable.
    async fn find_active(&self, token: &str) -> Result<Option<TokenRecord>, StoreError>;

    /// Mark the token `revoked`. Revoking twice, or revoking an unknown
    /// token, is a no-op.
    async fn revoke(&self, token: &str) -> Result<(), StoreError>;

    /// Take an exclusive lease on an active token, waiting for any current
    /// holder. Returns `None` if the token is unknown or was revoked by the
    /// time the lease was granted.
    async fn lock_active(&self, token: &str) -> Result<Option<Box<dyn TokenLease>>, StoreError>;
}

/// Exclusive hold on one active token record
#[async_trait]
pub trait TokenLease: Send {
    fn record(&self) -> &TokenRecord;

    /// Revoke the leased token and insert `replacement` for `owner` as one
    /// unit: both writes take effect or neither does.
    async fn consume_and_replace(
        self: Box<Self>,
        replacement: &str,
        owner: &OwnerId,
    ) -> Result<(), StoreError>;

    /// Give the lease up without changing any record
    async fn release(self: Box<Self>) -> Result<(), StoreError>;
}

// ============================================================================
// Postgres implementation
// ============================================================================

#[derive(sqlx::FromRow)]
struct TokenRow {
    token_hash: String,
    owner_identity: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TokenRow> for TokenRecord {
    type Error = StoreError;

    fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
        Ok(TokenRecord {
            token_hash: row.token_hash,
            owner: OwnerId::new(row.owner_identity),
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

const INSERT_TOKEN: &str = r#"
    INSERT INTO tokens (token_hash, owner_identity, status, created_at)
    VALUES ($1, $2, 'active', $3)
"#;

const REVOKE_ACTIVE_TOKEN: &str = r#"
    UPDATE tokens
    SET status = 'revoked', revoked_at = $1
    WHERE token_hash = $2 AND status = 'active'
"#;

/// Token ledger over its own pool. A lease keeps one connection busy for
/// the whole rotation, so sharing a pool with the catalog lets leases starve
/// the very writes they are waiting on.
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn insert(&self, token: &str, owner: &OwnerId) -> Result<(), StoreError> {
        sqlx::query(INSERT_TOKEN)
            .bind(hash_token(token))
            .bind(owner.as_str())
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_active(&self, token: &str) -> Result<Option<TokenRecord>, StoreError> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT token_hash, owner_identity, status, created_at
            FROM tokens
            WHERE token_hash = $1 AND status = 'active'
            "#,
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await?;

        row.map(TokenRecord::try_from).transpose()
    }

    async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        sqlx::query(REVOKE_ACTIVE_TOKEN)
            .bind(Utc::now())
            .bind(hash_token(token))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn lock_active(&self, token: &str) -> Result<Option<Box<dyn TokenLease>>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Blocks behind a concurrent holder; once that holder commits the row
        // is re-evaluated and no longer matches `status = 'active'`.
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT token_hash, owner_identity, status, created_at
            FROM tokens
            WHERE token_hash = $1 AND status = 'active'
            FOR UPDATE
            "#,
        )
        .bind(hash_token(token))
        .fetch_optional(&mut tx)
        .await?;

        match row {
            None => {
                tx.rollback().await?;
                Ok(None)
            }
            Some(row) => Ok(Some(Box::new(PgTokenLease {
                tx,
                record: row.try_into()?,
            }))),
        }
    }
}

struct PgTokenLease {
    tx: Transaction<'static, Postgres>,
    record: TokenRecord,
}

#[async_trait]
impl TokenLease for PgTokenLease {
    fn record(&self) -> &TokenRecord {
        &self.record
    }

    async fn consume_and_replace(
        self: Box<Self>,
        replacement: &str,
        owner: &OwnerId,
    ) -> Result<(), StoreError> {
        let PgTokenLease { mut tx, record } = *self;

        let revoked = sqlx::query(REVOKE_ACTIVE_TOKEN)
            .bind(Utc::now())
            .bind(&record.token_hash)
            .execute(&mut tx)
            .await?;

        if revoked.rows_affected() != 1 {
            return Err(StoreError::Conflict);
        }

        sqlx::query(INSERT_TOKEN)
            .bind(hash_token(replacement))
            .bind(owner.as_str())
            .bind(Utc::now())
            .execute(&mut tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn release(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
