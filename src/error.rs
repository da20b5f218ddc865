use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("room already booked")]
    RoomBooked,
    #[error("instructor already scheduled")]
    InstructorBusy,
    #[error("session was modified concurrently")]
    StaleRevision,
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Store(StoreError),
}

impl SchedulerError {
    pub fn not_found(what: impl Into<String>) -> Self {
        SchedulerError::NotFound(what.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        SchedulerError::InvalidArgument(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        SchedulerError::InvalidState(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        SchedulerError::Conflict(msg.into())
    }
}

impl From<StoreError> for SchedulerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::RoomBooked | StoreError::InstructorBusy | StoreError::StaleRevision => {
                SchedulerError::Conflict(value.to_string())
            }
            StoreError::Unavailable(_) => SchedulerError::Store(value),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unprocessable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg).into_response(),
            ApiError::Unprocessable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, msg).into_response()
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response(),
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(value: SchedulerError) -> Self {
        match value {
            SchedulerError::NotFound(_) => ApiError::NotFound(value.to_string()),
            SchedulerError::InvalidArgument(msg) => ApiError::BadRequest(msg),
            SchedulerError::InvalidState(msg) => ApiError::Unprocessable(msg),
            SchedulerError::Conflict(msg) => ApiError::Conflict(msg),
            SchedulerError::Store(err) => {
                error!("Session store error: {err}");
                ApiError::Internal("Session store unavailable".into())
            }
        }
    }
}
