use crate::{
    config::Merchant,
    gateway::ResultInfo,
    payment::order::{CURRENCY, Order},
};

const REQUEST_TYPE_PAYMENT: &str = "Payment";

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateTransactionBody {
    pub request_type: &'static str,
    pub mid: String,
    pub website_name: String,
    pub order_id: String,
    pub callback_url: String,
    pub txn_amount: TxnAmount,
    pub user_info: UserInfo,
}

#[derive(Debug, serde::Serialize)]
pub struct TxnAmount {
    /// Decimal with exactly two fraction digits, e.g. `"12.50"`
    pub value: String,
    pub currency: &'static str,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub cust_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
}

impl InitiateTransactionBody {
    pub fn new(merchant: &Merchant, order: &Order, callback_url: String) -> Self {
        Self {
            request_type: REQUEST_TYPE_PAYMENT,
            mid: merchant.mid.clone(),
            website_name: merchant.website.clone(),
            order_id: order.order_id.clone(),
            callback_url,
            txn_amount: TxnAmount {
                value: order.amount.formatted(),
                currency: CURRENCY,
            },
            user_info: UserInfo {
                cust_id: order.customer.id.clone(),
                email: order.customer.email.clone(),
                mobile: order.customer.phone.clone(),
            },
        }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateTransactionData {
    #[serde(default)]
    pub result_info: ResultInfo,
    pub txn_token: Option<String>,
}
