use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;

use crate::payment::PaymentError;

pub const CURRENCY: &str = "INR";

/// Initiate request as posted by the booking page
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateRequest {
    pub order_id: Option<String>,
    /// String or number, echoed back unchanged
    pub amount: Option<serde_json::Value>,
    pub customer_id: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Customer {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A validated payment attempt
#[derive(Debug, Clone)]
pub struct Order {
    pub order_id: String,
    pub amount: Amount,
    pub customer: Customer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Amount {
    value: Decimal,
    received: serde_json::Value,
}

impl Amount {
    pub fn parse(received: serde_json::Value) -> Result<Self, PaymentError> {
        use serde_json::Value;

        let parsed = match &received {
            Value::String(s) => Decimal::from_str(s.trim()).ok(),
            Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
            _ => None,
        };
        let Some(value) = parsed else {
            return Err(PaymentError::Validation(
                "amount must be a decimal number".into(),
            ));
        };
        let value = round_currency(value);
        if value <= Decimal::ZERO {
            return Err(PaymentError::Validation("amount must be positive".into()));
        }
        Ok(Self { value, received })
    }

    /// Amount with exactly two fraction digits
    pub fn formatted(&self) -> String {
        format_amount(self.value)
    }

    /// Amount as the caller sent it
    pub fn received(&self) -> &serde_json::Value {
        &self.received
    }
}

fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn format_amount(value: Decimal) -> String {
    let mut value = round_currency(value);
    value.rescale(2);
    value.to_string()
}

fn required(value: Option<String>, name: &str) -> Result<String, PaymentError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| missing_field(name))
}

fn missing_field(name: &str) -> PaymentError {
    PaymentError::Validation(format!("Missing required fields: {name}"))
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl TryFrom<InitiateRequest> for Order {
    type Error = PaymentError;

    fn try_from(request: InitiateRequest) -> Result<Self, Self::Error> {
        let order_id = required(request.order_id, "orderId")?;
        let amount = match request.amount {
            None | Some(serde_json::Value::Null) => {
                return Err(PaymentError::Validation(
                    "Missing required fields: amount".into(),
                ));
            }
            Some(amount) => Amount::parse(amount)?,
        };
        let customer_id = required(request.customer_id, "customerId")?;
        Ok(Self {
            order_id,
            amount,
            customer: Customer {
                id: customer_id,
                email: optional(request.customer_email),
                phone: optional(request.customer_phone),
            },
        })
    }
}
