use std::sync::Arc;

use time::OffsetDateTime;
use tracing::instrument;

use crate::{
    config::Merchant,
    gateway::{
        GatewayClient, GatewayError, RESULT_SUCCESS, SignedRequest, TXN_SUCCESS,
        callback::CallbackPayload,
        checksum::ChecksumSigner,
        payin::InitiateTransactionBody,
        status::{OrderStatusBody, OrderStatusData},
    },
    payment::{
        PaymentError, Result,
        order::{InitiateRequest, Order},
        recorder::{Confirmation, ConfirmationRecorder},
    },
};

/// Outcome of a single callback step
type Step<T> = std::result::Result<T, CallbackFailure>;

/// What the booking page needs to open the hosted payment page
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatedPayment {
    pub txn_token: String,
    pub order_id: String,
    pub amount: serde_json::Value,
    pub mid: String,
    pub host: String,
}

#[derive(Debug)]
pub enum VerificationOutcome {
    Confirmed,
    Rejected,
    /// Status could not be checked at all
    Indeterminate(PaymentError),
}

#[derive(Debug)]
pub struct VerificationResult {
    pub order_id: String,
    pub txn_id: String,
    pub outcome: VerificationOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackFailure {
    ChecksumMismatch,
    /// Gateway reported a non-successful transaction
    Declined(Option<String>),
    InvalidPayload,
    /// Status query disagrees with the callback
    NotConfirmed,
    /// Status query could not be completed
    VerificationError,
    ServerError,
}

impl CallbackFailure {
    /// Reason code carried to the failure page
    pub fn reason(&self) -> &str {
        match self {
            CallbackFailure::ChecksumMismatch => "checksum",
            CallbackFailure::Declined(Some(message)) => message,
            CallbackFailure::Declined(None) => "payment_failed",
            CallbackFailure::InvalidPayload => "invalid_payload",
            CallbackFailure::NotConfirmed => "verification_failed",
            CallbackFailure::VerificationError => "verification_error",
            CallbackFailure::ServerError => "server_error",
        }
    }
}

#[derive(Debug)]
pub enum CallbackOutcome {
    Confirmed(Confirmation),
    Failed(CallbackFailure),
}

/// Drives a payment through initiation, gateway callback and status verification.
pub struct PaymentCoordinator {
    merchant: Merchant,
    gateway: Arc<dyn GatewayClient>,
    signer: Arc<dyn ChecksumSigner>,
    recorder: Arc<dyn ConfirmationRecorder>,
}

impl PaymentCoordinator {
    pub fn new(
        merchant: Merchant,
        gateway: Arc<dyn GatewayClient>,
        signer: Arc<dyn ChecksumSigner>,
        recorder: Arc<dyn ConfirmationRecorder>,
    ) -> Self {
        Self {
            merchant,
            gateway,
            signer,
            recorder,
        }
    }

    /// Registers the order with the gateway and returns the transaction token
    /// for the hosted payment page.
    #[instrument(skip_all)]
    pub async fn initiate(
        &self,
        request: InitiateRequest,
        callback_url: String,
    ) -> Result<InitiatedPayment> {
        let order = Order::try_from(request)?;
        tracing::debug!(
            order_id = %order.order_id,
            amount = %order.amount.formatted(),
            "Initiating payment"
        );

        let body = InitiateTransactionBody::new(&self.merchant, &order, callback_url);
        let request = SignedRequest::sign(body, self.signer.as_ref(), &self.merchant.key)?;
        let response = self.gateway.initiate_transaction(&request).await?.body;

        if response.result_info.result_status != RESULT_SUCCESS {
            tracing::info!(
                order_id = %order.order_id,
                code = ?response.result_info.result_code,
                "Gateway rejected payment initiation"
            );
            let message = response.result_info.message().to_string();
            return Err(PaymentError::GatewayRejected(message));
        }
        let txn_token = response
            .txn_token
            .filter(|t| !t.is_empty())
            .ok_or(GatewayError::MissingField("txnToken"))?;

        tracing::info!(order_id = %order.order_id, "Created payment");
        Ok(InitiatedPayment {
            txn_token,
            amount: order.amount.received().clone(),
            order_id: order.order_id,
            mid: self.merchant.mid.clone(),
            host: self.gateway.host().to_string(),
        })
    }

    /// Resolves a gateway callback. Never fails: every problem becomes a
    /// [`CallbackFailure`].
    #[instrument(skip_all)]
    pub async fn handle_callback(&self, payload: CallbackPayload) -> CallbackOutcome {
        let confirmation = match self.confirm_callback(&payload).await {
            Ok(confirmation) => confirmation,
            Err(failure) => {
                tracing::info!(
                    order_id = ?payload.order_id(),
                    reason = failure.reason(),
                    "Payment callback not confirmed"
                );
                return CallbackOutcome::Failed(failure);
            }
        };
        if let Err(e) = self.recorder.record(&confirmation).await {
            // gateway already settled the payment, the redirect still reports success
            tracing::error!(
                order_id = %confirmation.order_id,
                "Failed to record payment confirmation: {e}"
            );
        }
        CallbackOutcome::Confirmed(confirmation)
    }

    async fn confirm_callback(&self, payload: &CallbackPayload) -> Step<Confirmation> {
        self.check_signature(payload)?;
        let (order_id, txn_id) = check_status(payload)?;
        self.check_with_gateway(order_id, txn_id).await?;
        Ok(Confirmation {
            order_id: order_id.to_string(),
            txn_id: txn_id.to_string(),
            amount: payload.txn_amount().map(str::to_string),
            confirmed_at: OffsetDateTime::now_utc(),
        })
    }

    fn check_signature(&self, payload: &CallbackPayload) -> Step<()> {
        let content = payload.signed_content();
        let key = &self.merchant.key;
        let valid = payload
            .signature()
            .is_some_and(|signature| self.signer.verify(&content, key, signature));
        if !valid {
            tracing::warn!(
                order_id = ?payload.order_id(),
                signature_present = payload.signature().is_some(),
                "Checksum mismatch on payment callback"
            );
            return Err(CallbackFailure::ChecksumMismatch);
        }
        Ok(())
    }

    async fn check_with_gateway(&self, order_id: &str, txn_id: &str) -> Step<()> {
        match self.verify(order_id, txn_id).await.outcome {
            VerificationOutcome::Confirmed => Ok(()),
            VerificationOutcome::Rejected => Err(CallbackFailure::NotConfirmed),
            VerificationOutcome::Indeterminate(PaymentError::Transport(_)) => {
                Err(CallbackFailure::VerificationError)
            }
            VerificationOutcome::Indeterminate(_) => Err(CallbackFailure::ServerError),
        }
    }

    /// Asks the gateway whether `order_id` was paid under `txn_id`.
    #[instrument(skip(self))]
    pub async fn verify(&self, order_id: &str, txn_id: &str) -> VerificationResult {
        let outcome = match self.query_status(order_id).await {
            Ok(status) if status.is_paid(txn_id) => VerificationOutcome::Confirmed,
            Ok(status) => {
                tracing::info!(
                    result = %status.result_info.result_status,
                    code = ?status.result_info.result_code,
                    gateway_txn_id = ?status.txn_id,
                    "Transaction is not confirmed by gateway"
                );
                VerificationOutcome::Rejected
            }
            Err(e) => {
                tracing::error!("Failed to fetch transaction status: {e}");
                VerificationOutcome::Indeterminate(e)
            }
        };
        VerificationResult {
            order_id: order_id.to_string(),
            txn_id: txn_id.to_string(),
            outcome,
        }
    }

    async fn query_status(&self, order_id: &str) -> Result<OrderStatusData> {
        let body = OrderStatusBody {
            mid: self.merchant.mid.clone(),
            order_id: order_id.to_string(),
        };
        let request = SignedRequest::sign(body, self.signer.as_ref(), &self.merchant.key)?;
        let status = self.gateway.order_status(&request).await?.body;
        tracing::debug!(
            order_id = ?status.order_id,
            bank_txn_id = ?status.bank_txn_id,
            "Gateway order status"
        );
        Ok(status)
    }
}

/// Only a successful transaction with both identifiers moves on to the
/// independent status check.
fn check_status(payload: &CallbackPayload) -> Step<(&str, &str)> {
    if payload.status() != Some(TXN_SUCCESS) {
        let message = payload.response_message().map(str::to_string);
        return Err(CallbackFailure::Declined(message));
    }
    match (payload.order_id(), payload.txn_id()) {
        (Some(order_id), Some(txn_id)) => Ok((order_id, txn_id)),
        _ => Err(CallbackFailure::InvalidPayload),
    }
}
