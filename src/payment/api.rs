use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
};
use axum_extra::headers::{self, HeaderMapExt};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    config::Config,
    payment::{
        PaymentError, Result,
        coordinator::{InitiatedPayment, PaymentCoordinator, VerificationOutcome},
        order::InitiateRequest,
    },
    state::AppState,
};

/// Public path the gateway posts the payment result to
pub const CALLBACK_PATH: &str = "/api/payment/callback";

#[derive(Debug, Serialize)]
pub struct InitiateResponse {
    success: bool,
    #[serde(flatten)]
    payment: InitiatedPayment,
}

#[instrument(skip_all)]
pub async fn initiate(
    State(coordinator): State<Arc<PaymentCoordinator>>,
    State(config): State<Arc<Config>>,
    headers: HeaderMap,
    Json(request): Json<InitiateRequest>,
) -> Result<axum::Json<InitiateResponse>> {
    let callback_url = callback_url(&config, &headers);
    let payment = coordinator.initiate(request, callback_url).await?;
    Ok(axum::Json(InitiateResponse {
        success: true,
        payment,
    }))
}

/// Configured callback base, otherwise the host the booking page talked to
fn callback_url(config: &Config, headers: &HeaderMap) -> String {
    if let Some(base) = &config.callback_base_url {
        return format!("{base}{CALLBACK_PATH}");
    }
    let host = match headers.typed_get::<headers::Host>() {
        Some(host) => match host.port() {
            Some(port) => format!("{}:{port}", host.hostname()),
            None => host.hostname().to_string(),
        },
        None => format!("localhost:{}", config.port),
    };
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| matches!(*v, "http" | "https"))
        .unwrap_or("http");
    format!("{scheme}://{host}{CALLBACK_PATH}")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    order_id: Option<String>,
    txn_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    txn_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_id: Option<String>,
}

#[instrument(skip_all)]
pub async fn verify(
    State(coordinator): State<Arc<PaymentCoordinator>>,
    Json(request): Json<VerifyRequest>,
) -> Result<axum::Json<VerifyResponse>> {
    let present = |v: Option<String>| v.filter(|v| !v.is_empty());
    let (Some(order_id), Some(txn_id)) = (present(request.order_id), present(request.txn_id))
    else {
        let message = "Missing required fields: orderId, txnId".to_string();
        return Err(PaymentError::Validation(message));
    };

    let result = coordinator.verify(&order_id, &txn_id).await;
    match result.outcome {
        VerificationOutcome::Confirmed => {
            tracing::info!(order_id = %result.order_id, "Verified transaction");
            Ok(axum::Json(VerifyResponse {
                success: true,
                txn_id: Some(result.txn_id),
                order_id: Some(result.order_id),
            }))
        }
        VerificationOutcome::Rejected => Ok(axum::Json(VerifyResponse {
            success: false,
            txn_id: None,
            order_id: None,
        })),
        VerificationOutcome::Indeterminate(e) => Err(e),
    }
}

#[derive(Debug, Serialize)]
pub struct Health {
    status: &'static str,
    env: &'static str,
}

pub async fn health(State(config): State<Arc<Config>>) -> axum::Json<Health> {
    axum::Json(Health {
        status: "ok",
        env: config.environment.as_str(),
    })
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/payment/initiate", post(initiate))
        .route("/payment/verify", post(verify))
        .route("/health", get(health))
}

/// `Json` extractor wrapper that customizes the error from `axum::extract::Json`
pub struct Json<T>(pub T);

impl<S, T> axum::extract::FromRequest<S> for Json<T>
where
    T: serde::de::DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = PaymentError;

    async fn from_request(
        req: axum::http::Request<axum::body::Body>,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(e) => Err(PaymentError::Validation(e.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::testing::{self, StubGateway};

    const INITIATE: &str = "/api/payment/initiate";
    const VERIFY: &str = "/api/payment/verify";

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("host", "voyagr.example.com")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn initiate_order(amount: Value) -> Request<Body> {
        let order = json!({ "orderId": "ORD1", "amount": amount, "customerId": "C1" });
        post_json(INITIATE, &order)
    }

    fn verify_order(txn_id: &str) -> Request<Body> {
        post_json(VERIFY, &json!({ "orderId": "ORD1", "txnId": txn_id }))
    }

    /// JSON body of the last request the gateway received
    fn last_signed_body(gateway: &StubGateway) -> Value {
        let (signed, _) = gateway.last_signed_body().unwrap();
        serde_json::from_str(&signed).unwrap()
    }

    #[tokio::test]
    async fn initiate_scenario() {
        let gateway = testing::initiate_gateway("TKN1");
        let app = testing::app_state(gateway.clone()).into_router();

        let (status, body) = send(app, initiate_order(json!("100"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true,
                "txnToken": "TKN1",
                "orderId": "ORD1",
                "amount": "100",
                "mid": testing::MID,
                "host": "securegw-stage.paytm.in"
            })
        );

        let signed = last_signed_body(&gateway);
        assert_eq!(
            signed["callbackUrl"],
            "http://voyagr.example.com/api/payment/callback"
        );
        assert_eq!(signed["txnAmount"]["value"], "100.00");
    }

    #[tokio::test]
    async fn initiate_missing_fields() {
        let bodies = [
            json!({ "amount": "100", "customerId": "C1" }),
            json!({ "orderId": "ORD1", "customerId": "C1" }),
            json!({ "orderId": "ORD1", "amount": "100" }),
            json!({ "orderId": "", "amount": "100", "customerId": "C1" }),
        ];
        for body in bodies {
            let gateway = testing::initiate_gateway("TKN1");
            let app = testing::app_state(gateway.clone()).into_router();

            let (status, response) = send(app, post_json(INITIATE, &body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            let error = response["error"].as_str().unwrap();
            assert!(error.contains("Missing required fields"));
            assert_eq!(gateway.initiate_calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn initiate_malformed_body() {
        let gateway = Arc::new(StubGateway::new());
        let app = testing::app_state(gateway.clone()).into_router();
        let request = Request::builder()
            .method("POST")
            .uri(INITIATE)
            .header("content-type", "application/json")
            .body(Body::from("{\"orderId\":"))
            .unwrap();

        let (status, response) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["success"], false);
        assert_eq!(gateway.initiate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn initiate_rejected_by_gateway() {
        let reply = json!({
            "body": {
                "resultInfo": {
                    "resultStatus": "F",
                    "resultCode": "325",
                    "resultMsg": "Duplicate order id"
                }
            }
        });
        let gateway = Arc::new(StubGateway::new().with_initiate(reply));
        let app = testing::app_state(gateway).into_router();

        let (status, body) = send(app, initiate_order(json!(100))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let expected = json!({ "success": false, "error": "Duplicate order id" });
        assert_eq!(body, expected);
    }

    #[tokio::test]
    async fn initiate_gateway_unreachable() {
        let app = testing::app_state(Arc::new(StubGateway::new())).into_router();

        let (status, body) = send(app, initiate_order(json!("100"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        let error = body["error"].as_str().unwrap();
        assert!(!error.contains("connection refused"));
    }

    #[tokio::test]
    async fn configured_callback_url() {
        let gateway = testing::initiate_gateway("TKN1");
        let mut config = testing::config();
        config.callback_base_url = Some("https://pay.voyagr.example.com".into());
        let coordinator = Arc::new(testing::coordinator(gateway.clone()));
        let app = AppState::new(config, coordinator).into_router();

        let (status, _) = send(app, initiate_order(json!("100"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            last_signed_body(&gateway)["callbackUrl"],
            "https://pay.voyagr.example.com/api/payment/callback"
        );
    }

    #[test]
    fn forwarded_proto() {
        let config = testing::config();
        let mut headers = HeaderMap::new();
        headers.insert("host", "voyagr.example.com:8443".parse().unwrap());
        headers.insert("x-forwarded-proto", "https, http".parse().unwrap());
        assert_eq!(
            callback_url(&config, &headers),
            "https://voyagr.example.com:8443/api/payment/callback"
        );
        assert_eq!(
            callback_url(&config, &HeaderMap::new()),
            "http://localhost:5000/api/payment/callback"
        );
    }

    #[tokio::test]
    async fn verify_confirmed() {
        let gateway = testing::status_gateway("TXN_SUCCESS", "TXN1");
        let app = testing::app_state(gateway).into_router();

        let (status, body) = send(app, verify_order("TXN1")).await;
        assert_eq!(status, StatusCode::OK);
        let expected = json!({ "success": true, "txnId": "TXN1", "orderId": "ORD1" });
        assert_eq!(body, expected);
    }

    #[tokio::test]
    async fn verify_mismatch() {
        let gateway = testing::status_gateway("TXN_SUCCESS", "TXN1");
        let app = testing::app_state(gateway).into_router();

        let (status, body) = send(app, verify_order("TXN2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": false }));
    }

    #[tokio::test]
    async fn verify_missing_fields() {
        let gateway = Arc::new(StubGateway::new());
        let app = testing::app_state(gateway.clone()).into_router();

        let request = post_json(VERIFY, &json!({ "orderId": "ORD1" }));
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(gateway.status_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn verify_gateway_unreachable() {
        let app = testing::app_state(Arc::new(StubGateway::new())).into_router();

        let (status, body) = send(app, verify_order("TXN1")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({ "success": false, "error": "Payment gateway is unavailable" })
        );
    }

    #[tokio::test]
    async fn health_reports_environment() {
        let app = testing::app_state(Arc::new(StubGateway::new())).into_router();
        let request = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok", "env": "staging" }));
    }
}
