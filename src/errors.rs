use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

pub const RATE_LIMIT_MESSAGE: &str = "Rate Limit exceeded. Too Many Requests";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThrottleError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("{}", RATE_LIMIT_MESSAGE)]
    RateLimitExceeded,
}

impl ThrottleError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ThrottleError::InvalidConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ThrottleError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl IntoResponse for ThrottleError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            detail: self.to_string(),
        });
        (self.status_code(), body).into_response()
    }
}
