use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failures local to one stream session. None of them outlive the session.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("frame rejected by decoder: {0}")]
    DecodeFailure(#[from] image::ImageError),
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::internal(value.to_string())
    }
}

impl From<StreamError> for AppError {
    fn from(value: StreamError) -> Self {
        match value {
            StreamError::InvalidInput(_) => Self::new(StatusCode::BAD_REQUEST, value.to_string()),
            StreamError::DecodeFailure(_) => Self::internal(value.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}
