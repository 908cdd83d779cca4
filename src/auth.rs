use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

/// The authenticated owner every core operation runs on behalf of.
/// Resolved once at the HTTP edge and passed explicitly into services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerContext {
    pub user_id: Uuid,
}

impl OwnerContext {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Verifies bearer tokens issued by the identity provider (HS256, shared secret).
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<OwnerContext, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            warn!("Rejected bearer token: {}", e);
            AppError::Unauthorized
        })?;

        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| AppError::Unauthorized)?;
        Ok(OwnerContext::new(user_id))
    }

    pub fn verify_header(&self, header: Option<&str>) -> Result<OwnerContext, AppError> {
        let header = header.ok_or(AppError::Unauthorized)?;

        let mut parts = header.splitn(2, ' ');
        let (Some(scheme), Some(token)) = (parts.next(), parts.next()) else {
            return Err(AppError::Unauthorized);
        };

        if !scheme.eq_ignore_ascii_case("Bearer") {
            return Err(AppError::Unauthorized);
        }

        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Unauthorized);
        }

        self.verify(token)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for OwnerContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        state.token_verifier.verify_header(header)
    }
}
