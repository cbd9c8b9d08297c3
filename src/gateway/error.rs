use std::fmt::Display;

use serde::de::Error;

#[derive(Debug)]
pub enum GatewayError {
    RequestError(reqwest::Error),
    GatewayDeserialization(serde_json::Error),
    /// Gateway reported success but left out a field the flow depends on
    MissingField(&'static str),
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            return Self::GatewayDeserialization(serde_json::Error::custom(
                "failed to decode response body",
            ));
        }
        Self::RequestError(value)
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(value: serde_json::Error) -> Self {
        Self::GatewayDeserialization(value)
    }
}

impl std::error::Error for GatewayError {}

impl Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::RequestError(e) if e.is_timeout() => {
                write!(f, "gateway request timed out: {e}")
            }
            GatewayError::RequestError(e) => write!(f, "http request error: {e}"),
            GatewayError::GatewayDeserialization(e) => {
                write!(f, "gateway response deserialization: {e}")
            }
            GatewayError::MissingField(field) => {
                write!(f, "gateway response is missing `{field}`")
            }
        }
    }
}
