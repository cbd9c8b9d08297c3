use async_trait::async_trait;
use serde::Serialize;
use time::OffsetDateTime;

/// A payment confirmed by both the callback signature and the gateway status query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub order_id: String,
    pub txn_id: String,
    pub amount: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub confirmed_at: OffsetDateTime,
}

/// Destination for confirmed payments, e.g. the booking store.
#[async_trait]
pub trait ConfirmationRecorder: Send + Sync {
    async fn record(&self, confirmation: &Confirmation) -> anyhow::Result<()>;
}

/// Records confirmations as structured log events
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRecorder;

#[async_trait]
impl ConfirmationRecorder for LogRecorder {
    async fn record(&self, confirmation: &Confirmation) -> anyhow::Result<()> {
        tracing::info!(
            order_id = %confirmation.order_id,
            txn_id = %confirmation.txn_id,
            amount = confirmation.amount.as_deref().unwrap_or_default(),
            confirmed_at = %confirmation.confirmed_at,
            "Payment confirmed"
        );
        Ok(())
    }
}
