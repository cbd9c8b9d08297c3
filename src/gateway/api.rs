use std::{any::Any, sync::Arc};

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Response, header::CONTENT_TYPE},
    response::{IntoResponse, Redirect},
    routing::post,
};
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};
use tracing::instrument;

use crate::{
    config::{Config, RedirectPages},
    gateway::{callback::CallbackPayload, mask},
    payment::coordinator::{CallbackFailure, CallbackOutcome, PaymentCoordinator},
    state::AppState,
};

/// Browser lands here after the hosted payment page. Always answers with a
/// redirect to one of the configured result pages.
#[instrument(skip_all)]
async fn callback_handler(
    State(coordinator): State<Arc<PaymentCoordinator>>,
    State(config): State<Arc<Config>>,
    headers: HeaderMap,
    body: Bytes,
) -> Redirect {
    let payload = match parse_payload(&headers, &body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("Failed to parse callback body: {e}");
            let outcome = CallbackOutcome::Failed(CallbackFailure::InvalidPayload);
            return Redirect::to(&redirect_url(&config.pages, &outcome));
        }
    };
    tracing::trace!(
        data = %mask::secure_serializable(payload.fields()),
        "Received callback from payment gateway"
    );

    let outcome = coordinator.handle_callback(payload).await;
    Redirect::to(&redirect_url(&config.pages, &outcome))
}

fn parse_payload(headers: &HeaderMap, body: &[u8]) -> anyhow::Result<CallbackPayload> {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().starts_with("application/json"));
    if is_json {
        CallbackPayload::from_json(body)
    } else {
        CallbackPayload::from_form(body)
    }
}

fn redirect_url(pages: &RedirectPages, outcome: &CallbackOutcome) -> String {
    match outcome {
        CallbackOutcome::Confirmed(confirmation) => with_query(
            &pages.success,
            &[
                ("orderId", confirmation.order_id.as_str()),
                ("txnId", confirmation.txn_id.as_str()),
            ],
        ),
        CallbackOutcome::Failed(failure) => {
            with_query(&pages.failure, &[("reason", failure.reason())])
        }
    }
}

fn with_query(page: &str, query: &[(&str, &str)]) -> String {
    match serde_urlencoded::to_string(query) {
        Ok(query) => {
            let separator = if page.contains('?') { '&' } else { '?' };
            format!("{page}{separator}{query}")
        }
        Err(e) => {
            tracing::error!("Failed to encode redirect query: {e}");
            page.to_string()
        }
    }
}

/// Turns a panic anywhere below the callback route into the `server_error`
/// redirect, so the browser never sees a dropped connection.
#[derive(Debug, Clone)]
struct RedirectOnPanic {
    location: String,
}

impl RedirectOnPanic {
    fn new(pages: &RedirectPages) -> Self {
        let outcome = CallbackOutcome::Failed(CallbackFailure::ServerError);
        Self {
            location: redirect_url(pages, &outcome),
        }
    }
}

impl ResponseForPanic for RedirectOnPanic {
    type ResponseBody = Body;

    fn response_for_panic(
        &mut self,
        err: Box<dyn Any + Send + 'static>,
    ) -> Response<Self::ResponseBody> {
        let detail = err
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| err.downcast_ref::<&str>().copied())
            .unwrap_or("non-string panic payload");
        tracing::error!("Payment callback handler panicked: {detail}");
        Redirect::to(&self.location).into_response()
    }
}

pub fn router(pages: &RedirectPages) -> axum::Router<AppState> {
    axum::Router::new()
        .route("/payment/callback", post(callback_handler))
        .layer(CatchPanicLayer::custom(RedirectOnPanic::new(pages)))
}
