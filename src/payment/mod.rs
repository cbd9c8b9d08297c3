use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::gateway::{GatewayError, checksum::ChecksumError};

pub mod api;
pub mod coordinator;
pub mod order;
/// Confirmed payment bookkeeping
pub mod recorder;

pub type Result<T> = std::result::Result<T, PaymentError>;

#[derive(Debug)]
pub enum PaymentError {
    /// Missing or malformed caller input
    Validation(String),
    /// Gateway refused the request, carries the gateway's reason
    GatewayRejected(String),
    /// Gateway could not be reached or answered with something unreadable
    Transport(GatewayError),
    Unexpected(String),
}

impl From<GatewayError> for PaymentError {
    fn from(value: GatewayError) -> Self {
        Self::Transport(value)
    }
}

impl From<ChecksumError> for PaymentError {
    fn from(value: ChecksumError) -> Self {
        Self::Unexpected(value.to_string())
    }
}

impl std::error::Error for PaymentError {}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentError::Validation(msg) => write!(f, "validation error: {msg}"),
            PaymentError::GatewayRejected(msg) => write!(f, "gateway rejected request: {msg}"),
            PaymentError::Transport(e) => write!(f, "gateway transport error: {e}"),
            PaymentError::Unexpected(msg) => write!(f, "unexpected error: {msg}"),
        }
    }
}

impl PaymentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentError::Validation(_) | PaymentError::GatewayRejected(_) => {
                StatusCode::BAD_REQUEST
            }
            PaymentError::Transport(_) | PaymentError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message that is safe to hand to the caller. Transport and unexpected
    /// failures never expose their details.
    pub fn public_message(&self) -> String {
        match self {
            PaymentError::Validation(msg) | PaymentError::GatewayRejected(msg) => msg.clone(),
            PaymentError::Transport(_) => "Payment gateway is unavailable".into(),
            PaymentError::Unexpected(_) => "Internal server error".into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    success: bool,
    error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        match &self {
            PaymentError::Transport(_) | PaymentError::Unexpected(_) => {
                tracing::error!("Payment request failed: {self}");
            }
            PaymentError::Validation(_) | PaymentError::GatewayRejected(_) => {
                tracing::debug!("Payment request refused: {self}");
            }
        }
        let body = Json(ErrorResponse::new(self.public_message()));
        (self.status_code(), body).into_response()
    }
}
