//! JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::StorefrontError;

impl StorefrontError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Auth(_) | Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::EmptyCart => StatusCode::CONFLICT,
            Self::Store(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for StorefrontError {
    fn into_response(self) -> Response {
        if let Self::Store(_) = &self {
            tracing::error!(error = %self, "store request failed");
        }
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, StorefrontError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let status = |e: StorefrontError| e.into_response().status();
        assert_eq!(status(StorefrontError::Auth("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status(StorefrontError::NotAuthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(status(StorefrontError::NotFound("products/p".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(StorefrontError::validation("bad")), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status(StorefrontError::EmptyCart), StatusCode::CONFLICT);
        assert_eq!(status(StorefrontError::Store("down".into())), StatusCode::BAD_GATEWAY);
    }
}
