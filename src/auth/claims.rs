/// Token Claims
///
/// Payload signed into every bearer token. The wire layout nests the owner
/// under `data`, i.e. `{ iss, aud, iat, exp, jti, data: { user_id } }`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::identity::OwnerId;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ClaimsData {
    pub user_id: OwnerId,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Unique token id; keeps same-second tokens for one owner distinct
    pub jti: String,
    pub data: ClaimsData,
}

impl Claims {
    /// Build claims for `owner` valid for `ttl_seconds` from `issued_at`
    pub fn new(
        owner: OwnerId,
        issuer: String,
        audience: String,
        issued_at: i64,
        ttl_seconds: i64,
    ) -> Self {
        Self {
            iss: issuer,
            aud: audience,
            iat: issued_at,
            exp: issued_at + ttl_seconds,
            jti: Uuid::new_v4().to_string(),
            data: ClaimsData { user_id: owner },
        }
    }

    pub fn owner(&self) -> &OwnerId {
        &self.data.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_at(issued_at: i64, ttl: i64) -> Claims {
        Claims::new(
            OwnerId::new("u7"),
            "issuer".to_string(),
            "audience".to_string(),
            issued_at,
            ttl,
        )
    }

    #[test]
    fn test_claims_creation() {
        let now = chrono::Utc::now().timestamp();
        let claims = claims_at(now, 9999);

        assert_eq!(claims.owner(), &OwnerId::new("u7"));
        assert_eq!(claims.exp, now + 9999);
        assert_eq!(claims.iss, "issuer");
        assert_eq!(claims.aud, "audience");
    }

    #[test]
    fn test_claims_issued_in_same_second_differ() {
        let now = chrono::Utc::now().timestamp();
        assert_ne!(claims_at(now, 60).jti, claims_at(now, 60).jti);
    }

    #[test]
    fn test_wire_layout_nests_user_id() {
        let claims = claims_at(100, 10);
        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value["data"]["user_id"], "u7");
        assert_eq!(value["exp"], 110);
    }
}
