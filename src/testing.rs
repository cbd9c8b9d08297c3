//! Offline fakes for the gateway and confirmation store.

use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;

use crate::{
    config::Config,
    gateway::{
        self, GatewayClient, GatewayError, GatewayResponse, SignedRequest,
        callback::{CallbackPayload, SIGNATURE_FIELD},
        checksum::{ChecksumError, ChecksumSigner, MerchantKey, PaytmChecksum, canonical_params},
        payin, status,
    },
    payment::{
        coordinator::PaymentCoordinator,
        recorder::{Confirmation, ConfirmationRecorder},
    },
    state::AppState,
};

pub const MID: &str = "VOYAGR00001";
pub const KEY: &str = "Xk9pQ2vR7sT4wY1z";

pub fn config() -> Config {
    Config::from_lookup(|name| match name {
        "PAYTM_MID" => Some(MID.into()),
        "PAYTM_KEY" => Some(KEY.into()),
        _ => None,
    })
    .expect("test config is valid")
}

/// Scripted gateway. Without a scripted reply a call fails like an unreachable host.
#[derive(Default)]
pub struct StubGateway {
    initiate_reply: Option<serde_json::Value>,
    status_reply: Option<serde_json::Value>,
    pub initiate_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    signed_bodies: Mutex<Vec<(String, String)>>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initiate(mut self, reply: serde_json::Value) -> Self {
        self.initiate_reply = Some(reply);
        self
    }

    pub fn with_status(mut self, reply: serde_json::Value) -> Self {
        self.status_reply = Some(reply);
        self
    }

    /// Serialized body and signature of the most recent request
    pub fn last_signed_body(&self) -> Option<(String, String)> {
        self.signed_bodies.lock().unwrap().last().cloned()
    }

    fn capture<B: Serialize>(&self, request: &SignedRequest<B>) {
        let body = serde_json::to_string(&request.body).unwrap();
        self.signed_bodies
            .lock()
            .unwrap()
            .push((body, request.head.signature.clone()));
    }

    fn reply<T: DeserializeOwned>(reply: &Option<serde_json::Value>) -> gateway::Result<T> {
        use serde::de::Error;

        match reply {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Err(GatewayError::GatewayDeserialization(
                serde_json::Error::custom("connection refused"),
            )),
        }
    }
}

#[async_trait]
impl GatewayClient for StubGateway {
    fn host(&self) -> &str {
        "securegw-stage.paytm.in"
    }

    async fn initiate_transaction(
        &self,
        request: &SignedRequest<payin::InitiateTransactionBody>,
    ) -> gateway::Result<GatewayResponse<payin::InitiateTransactionData>> {
        self.initiate_calls.fetch_add(1, Ordering::SeqCst);
        self.capture(request);
        Self::reply(&self.initiate_reply)
    }

    async fn order_status(
        &self,
        request: &SignedRequest<status::OrderStatusBody>,
    ) -> gateway::Result<GatewayResponse<status::OrderStatusData>> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.capture(request);
        Self::reply(&self.status_reply)
    }
}

/// Gateway that hands out `token` on initiate
pub fn initiate_gateway(token: &str) -> Arc<StubGateway> {
    Arc::new(StubGateway::new().with_initiate(initiate_success(token)))
}

/// Gateway that answers every status query with `result_status` for `txn_id`
pub fn status_gateway(result_status: &str, txn_id: &str) -> Arc<StubGateway> {
    let reply = order_status(result_status, txn_id);
    Arc::new(StubGateway::new().with_status(reply))
}

/// Verifies like the real scheme but cannot produce a salt for new signatures
pub struct EntropylessSigner;

impl ChecksumSigner for EntropylessSigner {
    fn sign(&self, _payload: &str, _key: &MerchantKey) -> Result<String, ChecksumError> {
        Err(ChecksumError::Entropy("os rng unavailable".into()))
    }

    fn verify(&self, payload: &str, key: &MerchantKey, signature: &str) -> bool {
        PaytmChecksum.verify(payload, key, signature)
    }
}

#[derive(Default)]
pub struct MemoryRecorder {
    confirmations: Mutex<Vec<Confirmation>>,
    fail: bool,
}

impl MemoryRecorder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn confirmed_orders(&self) -> Vec<String> {
        self.confirmations
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.order_id.clone())
            .collect()
    }
}

#[async_trait]
impl ConfirmationRecorder for MemoryRecorder {
    async fn record(&self, confirmation: &Confirmation) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("booking store is down");
        }
        let mut confirmations = self.confirmations.lock().unwrap();
        confirmations.push(confirmation.clone());
        Ok(())
    }
}

/// Store whose driver panics instead of returning an error
pub struct PanickingRecorder;

#[async_trait]
impl ConfirmationRecorder for PanickingRecorder {
    async fn record(&self, _confirmation: &Confirmation) -> anyhow::Result<()> {
        panic!("store driver bug");
    }
}

pub fn coordinator(gateway: Arc<StubGateway>) -> PaymentCoordinator {
    coordinator_with_recorder(gateway, Arc::new(MemoryRecorder::default()))
}

pub fn coordinator_with_recorder(
    gateway: Arc<StubGateway>,
    recorder: Arc<dyn ConfirmationRecorder>,
) -> PaymentCoordinator {
    let signer = Arc::new(PaytmChecksum);
    PaymentCoordinator::new(config().merchant, gateway, signer, recorder)
}

pub fn app_state(gateway: Arc<StubGateway>) -> AppState {
    AppState::new(config(), Arc::new(coordinator(gateway)))
}

pub fn initiate_success(token: &str) -> serde_json::Value {
    json!({
        "head": {
            "responseTimestamp": "1718000000000",
            "version": "v1",
            "signature": "c2lnbmF0dXJl"
        },
        "body": {
            "resultInfo": { "resultStatus": "S", "resultCode": "0000", "resultMsg": "Success" },
            "txnToken": token,
            "isPromoCodeValid": false,
            "authenticated": false
        }
    })
}

pub fn order_status(result_status: &str, txn_id: &str) -> serde_json::Value {
    json!({
        "head": {
            "responseTimestamp": "1718000000000",
            "version": "v1",
            "signature": "c2lnbmF0dXJl"
        },
        "body": {
            "resultInfo": {
                "resultStatus": result_status,
                "resultCode": "01",
                "resultMsg": "Txn Success"
            },
            "txnId": txn_id,
            "bankTxnId": "777001",
            "orderId": "ORD1",
            "txnAmount": "100.00",
            "txnType": "SALE",
            "gatewayName": "HDFC"
        }
    })
}

/// Unsigned callback fields of a successful payment of ORD1
pub fn success_fields() -> BTreeMap<String, String> {
    [
        ("BANKNAME", "HDFC Bank"),
        ("BANKTXNID", "777001"),
        ("CURRENCY", "INR"),
        ("GATEWAYNAME", "HDFC"),
        ("MID", MID),
        ("ORDERID", "ORD1"),
        ("PAYMENTMODE", "UPI"),
        ("RESPCODE", "01"),
        ("RESPMSG", "Txn Success"),
        ("STATUS", "TXN_SUCCESS"),
        ("TXNAMOUNT", "100.00"),
        ("TXNDATE", "2026-10-17 12:00:00.0"),
        ("TXNID", "TXN1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Fields plus a valid `CHECKSUMHASH`
pub fn signed_fields(fields: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let key = config().merchant.key;
    let signature = PaytmChecksum
        .sign(&canonical_params(fields), &key)
        .expect("signing succeeds");
    let mut signed = fields.clone();
    signed.insert(SIGNATURE_FIELD.to_string(), signature);
    signed
}

pub fn signed_callback(fields: &BTreeMap<String, String>) -> CallbackPayload {
    CallbackPayload::from_fields(signed_fields(fields))
}
