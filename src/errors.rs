use http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use thiserror::Error;

use crate::external::price_provider::PriceProviderError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(sqlx::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Rate limited by external provider")]
    RateLimited,
    #[error("External error: {0}")]
    External(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Corrupt record: {0}")]
    Data(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg).into_response(),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
            AppError::RateLimited => {
                let mut headers = HeaderMap::new();
                headers.insert("Retry-After", HeaderValue::from_static("60"));
                (StatusCode::TOO_MANY_REQUESTS, headers, "Rate limited").into_response()
            },
            AppError::External(msg) => (StatusCode::BAD_GATEWAY, msg).into_response(),
            AppError::Db(_) | AppError::Data(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            },
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        AppError::Db(value)
    }
}

impl From<PriceProviderError> for AppError {
    fn from(value: PriceProviderError) -> Self {
        match value {
            PriceProviderError::RateLimited => AppError::RateLimited,
            other => AppError::External(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_taxonomy() {
        let cases = [
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("lot".into()), StatusCode::NOT_FOUND),
            (AppError::Conflict("insufficient quantity".into()), StatusCode::CONFLICT),
            (AppError::External("oracle down".into()), StatusCode::BAD_GATEWAY),
            (AppError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (AppError::Data("sold lot without sale date".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = AppError::RateLimited.into_response();
        assert_eq!(response.headers().get("Retry-After").unwrap(), "60");
    }

    #[test]
    fn test_provider_errors_map_to_external() {
        let err: AppError = PriceProviderError::NotFound("XYZ".into()).into();
        assert!(matches!(err, AppError::External(_)));

        let err: AppError = PriceProviderError::RateLimited.into();
        assert!(matches!(err, AppError::RateLimited));
    }
}
