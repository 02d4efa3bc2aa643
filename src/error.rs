use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, state::room::RoomError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Caller does not hold the role the operation requires.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        if err.is_not_found() {
            ServiceError::NotFound(err.to_string())
        } else {
            ServiceError::Unavailable(err)
        }
    }
}

impl From<RoomError> for ServiceError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::Validation(message) => ServiceError::InvalidInput(message),
            other => ServiceError::InvalidState(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Caller lacks the required role.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Storage backend unavailable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Forbidden(message) => AppError::Forbidden(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

/// Machine readable code attached to live `ERROR` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Frame is not a `{type, payload}` envelope.
    InvalidMessage,
    /// Envelope type is not part of the protocol.
    UnknownType,
    /// Payload does not match its type.
    InvalidPayload,
    /// Connection has not sent `CLIENT_CONNECTED`.
    NotIdentified,
    /// Caller lacks the required role.
    Forbidden,
    /// Room or participant is missing.
    NotFound,
    /// Operation not allowed in the current phase.
    InvalidState,
    /// Payload failed validation.
    Validation,
    /// Storage failure.
    Internal,
}

/// Error answered to the live connection that caused it, never broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code:?}: {message}")]
pub struct ProtocolError {
    /// Machine readable code.
    pub code: ErrorCode,
    /// Human readable detail.
    pub message: String,
}

impl ProtocolError {
    /// Build an error with `code` and `message`.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<ServiceError> for ProtocolError {
    fn from(err: ServiceError) -> Self {
        let code = match &err {
            ServiceError::Unavailable(_) => ErrorCode::Internal,
            ServiceError::Forbidden(_) => ErrorCode::Forbidden,
            ServiceError::InvalidInput(_) => ErrorCode::Validation,
            ServiceError::InvalidState(_) => ErrorCode::InvalidState,
            ServiceError::NotFound(_) => ErrorCode::NotFound,
        };
        ProtocolError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::state_machine::{InvalidTransition, RoomStatus};

    #[test]
    fn storage_not_found_is_not_an_outage() {
        let err = ServiceError::from(StorageError::not_found("room", "abc"));
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = ServiceError::from(StorageError::unavailable(
            "down".into(),
            std::io::Error::other("boom"),
        ));
        assert!(matches!(err, ServiceError::Unavailable(_)));
        assert_eq!(ProtocolError::from(err).code, ErrorCode::Internal);
    }

    #[test]
    fn room_errors_split_into_input_and_state() {
        let err = ServiceError::from(RoomError::Validation("topic must not be empty".into()));
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let err = ServiceError::from(RoomError::InvalidTransition(InvalidTransition {
            from: RoomStatus::Finished,
            to: RoomStatus::Waiting,
        }));
        assert!(matches!(err, ServiceError::InvalidState(_)));
        assert_eq!(ProtocolError::from(err).code, ErrorCode::InvalidState);
    }

    #[test]
    fn http_status_follows_error_kind() {
        let status = |err: ServiceError| AppError::from(err).into_response().status();
        assert_eq!(status(ServiceError::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status(ServiceError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(ServiceError::InvalidState("x".into())), StatusCode::CONFLICT);
        assert_eq!(status(ServiceError::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
    }
}
