use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::verification::VerificationError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("document store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<VerificationError> for ApiError {
    fn from(e: VerificationError) -> Self {
        match e {
            VerificationError::MalformedInput { .. } => ApiError::BadRequest(e.to_string()),
            VerificationError::Store(store) => ApiError::StoreUnavailable(store.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::StoreUnavailable(_) => StatusCode::BAD_GATEWAY,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn test_status_mapping() {
        let malformed = VerificationError::MalformedInput {
            field: "item_id",
            reason: "must not be empty",
        };
        let response = ApiError::from(malformed).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let store = VerificationError::Store(StoreError::Transport("reset".to_string()));
        let response = ApiError::from(store).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
