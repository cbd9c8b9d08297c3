use serde::{Deserialize, Serialize};

use crate::gateway::{ResultInfo, TXN_SUCCESS};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusBody {
    pub mid: String,
    pub order_id: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusData {
    #[serde(default)]
    pub result_info: ResultInfo,
    pub txn_id: Option<String>,
    pub order_id: Option<String>,
    pub bank_txn_id: Option<String>,
}

impl OrderStatusData {
    /// Settled successfully under the given gateway transaction id
    pub fn is_paid(&self, txn_id: &str) -> bool {
        self.result_info.result_status == TXN_SUCCESS && self.txn_id.as_deref() == Some(txn_id)
    }
}
