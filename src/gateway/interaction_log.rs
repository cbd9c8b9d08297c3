use std::time::Instant;

use serde::Serialize;
use time::OffsetDateTime;

#[derive(Debug, Serialize)]
struct Request {
    url: String,
    params: serde_json::Value,
}

/// A finished exchange with the payment gateway. Payloads are stored masked.
#[derive(Debug, Serialize)]
pub struct InteractionLog {
    gateway: &'static str,
    kind: &'static str,
    request: Option<Request>,
    status: Option<u16>,
    response: Option<serde_json::Value>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    duration: f32,
}

#[derive(Debug)]
pub struct InteractionSpan {
    kind: &'static str,
    created_at: OffsetDateTime,
    created: Instant,
    request: Option<Request>,
    response: Option<serde_json::Value>,
    response_status: Option<u16>,
}

impl InteractionSpan {
    pub fn enter(kind: &'static str) -> Self {
        Self {
            kind,
            created_at: OffsetDateTime::now_utc(),
            created: Instant::now(),
            request: None,
            response: None,
            response_status: None,
        }
    }

    pub fn set_request(&mut self, url: String, params: serde_json::Value) {
        self.request = Some(Request { url, params });
    }

    pub fn set_response(&mut self, res: serde_json::Value) {
        self.response = Some(res);
    }

    pub fn set_response_status(&mut self, status: u16) {
        self.response_status = Some(status);
    }

    pub fn interaction_log(self) -> InteractionLog {
        InteractionLog {
            gateway: "paytm",
            kind: self.kind,
            request: self.request,
            status: self.response_status,
            response: self.response,
            created_at: self.created_at,
            duration: self.created.elapsed().as_secs_f32(),
        }
    }

    /// Closes the span and emits it as a debug event
    pub fn finish(self) {
        let log = self.interaction_log();
        match serde_json::to_value(&log) {
            Ok(value) => tracing::debug!(
                kind = log.kind,
                status = ?log.status,
                duration = log.duration,
                interaction = %value,
                "Gateway interaction finished"
            ),
            Err(e) => tracing::warn!("Failed to serialize gateway interaction: {e}"),
        }
    }
}
