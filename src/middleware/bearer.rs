/// Bearer token extractor
///
/// Every authenticated endpoint takes its token from
/// `Authorization: Bearer <token>`. The extractor only parses the header;
/// validation and rotation happen in the handler through the
/// `RotationCoordinator`, because they must share one lease with the
/// business effect.

use actix_web::{
    dev::Payload,
    http::header::{HeaderValue, AUTHORIZATION},
    FromRequest, HttpRequest,
};
use std::future::{ready, Ready};

use crate::auth::TokenError;
use crate::error::AppError;

const BEARER_SCHEME: &str = "Bearer";

#[derive(Debug, Clone)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Absent header, non-UTF-8 value, another scheme or an empty credential
/// all count as no token presented
fn parse_authorization(header: Option<&HeaderValue>) -> Result<String, TokenError> {
    let value = header
        .and_then(|h| h.to_str().ok())
        .ok_or(TokenError::MissingAuth)?;

    let (scheme, credential) = value.trim().split_once(' ').ok_or(TokenError::MissingAuth)?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return Err(TokenError::MissingAuth);
    }

    let credential = credential.trim();
    if credential.is_empty() {
        return Err(TokenError::MissingAuth);
    }

    Ok(credential.to_string())
}

impl FromRequest for BearerToken {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = parse_authorization(req.headers().get(AUTHORIZATION))
            .map(BearerToken)
            .map_err(|e| {
                tracing::warn!(path = %req.path(), "Missing or malformed Authorization header");
                AppError::from(e)
            });
        ready(result)
    }
}
