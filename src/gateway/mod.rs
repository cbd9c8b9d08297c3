use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    config::Config,
    gateway::{
        checksum::{ChecksumError, ChecksumSigner, MerchantKey},
        interaction_log::InteractionSpan,
    },
};

pub mod api;
/// Gateway callback payload
pub mod callback;
/// Request signing shared with the gateway
pub mod checksum;
mod error;
pub mod interaction_log;
/// Masking of signatures, tokens and contact data in logs
pub mod mask;
/// Transaction initiation
pub mod payin;
/// Order status
pub mod status;

pub use error::GatewayError;

pub type Result<T> = std::result::Result<T, GatewayError>;

/// `resultStatus` of an accepted initiate request
pub const RESULT_SUCCESS: &str = "S";
/// Transaction status of a settled payment
pub const TXN_SUCCESS: &str = "TXN_SUCCESS";

const INITIATE_PATH: &str = "/theia/api/v1/initiateTransaction";
const ORDER_STATUS_PATH: &str = "/v3/order/status";

#[derive(Debug, Serialize)]
pub struct RequestHead {
    pub signature: String,
}

/// Gateway request envelope. The signature covers the serialized `body`.
#[derive(Debug, Serialize)]
pub struct SignedRequest<T> {
    pub head: RequestHead,
    pub body: T,
}

impl<T: Serialize> SignedRequest<T> {
    pub fn sign(
        body: T,
        signer: &dyn ChecksumSigner,
        key: &MerchantKey,
    ) -> std::result::Result<Self, ChecksumError> {
        let payload = serde_json::to_string(&body)?;
        let signature = signer.sign(&payload, key)?;
        Ok(Self {
            head: RequestHead { signature },
            body,
        })
    }
}

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultInfo {
    #[serde(default)]
    pub result_status: String,
    pub result_code: Option<String>,
    pub result_msg: Option<String>,
}

impl ResultInfo {
    pub fn message(&self) -> &str {
        self.result_msg
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or("Payment gateway declined the request")
    }
}

/// Gateway response envelope. The response `head` carries nothing the flow uses.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct GatewayResponse<T> {
    pub body: T,
}

/// Remote operations of the payment gateway.
///
/// One call is exactly one request. Retries are left to the caller.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Host serving the hosted payment page
    fn host(&self) -> &str;

    async fn initiate_transaction(
        &self,
        request: &SignedRequest<payin::InitiateTransactionBody>,
    ) -> Result<GatewayResponse<payin::InitiateTransactionData>>;

    async fn order_status(
        &self,
        request: &SignedRequest<status::OrderStatusBody>,
    ) -> Result<GatewayResponse<status::OrderStatusData>>;
}

#[derive(Debug, Clone)]
pub struct PaytmGateway {
    client: reqwest::Client,
    host: &'static str,
    base_url: String,
}

impl PaytmGateway {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.gateway_timeout)
            .build()?;
        let host = config.gateway_host();
        Ok(Self {
            client,
            host,
            base_url: format!("https://{host}"),
        })
    }

    /// Sends every request to `base_url` instead of the gateway host
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn post<B, T>(
        &self,
        kind: &'static str,
        path: &str,
        query: &[(&str, &str)],
        request: &SignedRequest<B>,
    ) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let mut span = InteractionSpan::enter(kind);
        let url = format!("{}{}", self.base_url, path);
        let secured_request = mask::secure_serializable(request);
        tracing::debug!(%url, data = %secured_request, "Gateway API {kind} request");
        span.set_request(url.clone(), secured_request);

        let result = async {
            let res = self
                .client
                .post(&url)
                .query(query)
                .json(request)
                .send()
                .await?;
            span.set_response_status(res.status().as_u16());
            let response = res.json::<serde_json::Value>().await?;
            let secured_response = mask::secure_value(&response);
            tracing::debug!(data = %secured_response, "Gateway API {kind} response");
            span.set_response(secured_response);
            Ok::<T, GatewayError>(serde_json::from_value(response)?)
        }
        .await;
        span.finish();
        result
    }
}

#[async_trait]
impl GatewayClient for PaytmGateway {
    fn host(&self) -> &str {
        self.host
    }

    async fn initiate_transaction(
        &self,
        request: &SignedRequest<payin::InitiateTransactionBody>,
    ) -> Result<GatewayResponse<payin::InitiateTransactionData>> {
        let query = [
            ("mid", request.body.mid.as_str()),
            ("orderId", request.body.order_id.as_str()),
        ];
        self.post("initiate_transaction", INITIATE_PATH, &query, request)
            .await
    }

    async fn order_status(
        &self,
        request: &SignedRequest<status::OrderStatusBody>,
    ) -> Result<GatewayResponse<status::OrderStatusData>> {
        self.post("order_status", ORDER_STATUS_PATH, &[], request)
            .await
    }
}
