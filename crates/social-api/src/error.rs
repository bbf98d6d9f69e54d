use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, error, warn};

use social_db::StoreError;
use social_types::api::MessageResponse;
use social_types::validation::ValidationError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),

    /// Schema rule or unique index violated; the message goes out verbatim.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Persistence(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(msg) => {
                debug!("Not found: {}", msg);
                StatusCode::NOT_FOUND
            }
            ApiError::Validation(msg) => {
                warn!("Rejected request: {}", msg);
                StatusCode::BAD_REQUEST
            }
            ApiError::Persistence(msg) => {
                error!("Store failure: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(MessageResponse::new(self.to_string()))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { .. } => ApiError::Validation(err.to_string()),
            other => ApiError::Persistence(other.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<JoinError> for ApiError {
    fn from(err: JoinError) -> Self {
        ApiError::Persistence(format!("store task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(
            ApiError::NotFound("No user with that ID").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Validation("bad".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Persistence("down".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn duplicates_are_client_errors() {
        let err: ApiError = StoreError::Duplicate {
            field: "email".into(),
            value: "a@b.co".into(),
        }
        .into();
        assert!(matches!(err, ApiError::Validation(ref msg) if msg.contains("email_1")));

        let err: ApiError = StoreError::LockPoisoned.into();
        assert!(matches!(err, ApiError::Persistence(_)));
    }
}
