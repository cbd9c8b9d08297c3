use std::collections::BTreeMap;

use anyhow::Context;

use crate::gateway::checksum::canonical_params;

pub const SIGNATURE_FIELD: &str = "CHECKSUMHASH";

/// Fields posted back by the gateway after the hosted payment page.
///
/// Nothing in here is trusted until the signature is verified.
#[derive(Debug, Clone)]
pub struct CallbackPayload {
    fields: BTreeMap<String, String>,
    signature: Option<String>,
}

impl CallbackPayload {
    pub fn from_fields(mut fields: BTreeMap<String, String>) -> Self {
        let signature = fields.remove(SIGNATURE_FIELD);
        Self { fields, signature }
    }

    pub fn from_form(body: &[u8]) -> anyhow::Result<Self> {
        let fields = serde_urlencoded::from_bytes::<BTreeMap<String, String>>(body)
            .context("invalid form body")?;
        Ok(Self::from_fields(fields))
    }

    pub fn from_json(body: &[u8]) -> anyhow::Result<Self> {
        use serde_json::Value;

        let raw: BTreeMap<String, Value> =
            serde_json::from_slice(body).context("invalid json body")?;
        let fields = raw
            .into_iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (k, v)
            })
            .collect();
        Ok(Self::from_fields(fields))
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// Content covered by the signature: every field except the signature itself
    pub fn signed_content(&self) -> String {
        canonical_params(&self.fields)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn status(&self) -> Option<&str> {
        self.field("STATUS")
    }

    pub fn order_id(&self) -> Option<&str> {
        self.field("ORDERID")
    }

    pub fn txn_id(&self) -> Option<&str> {
        self.field("TXNID")
    }

    pub fn txn_amount(&self) -> Option<&str> {
        self.field("TXNAMOUNT")
    }

    pub fn response_message(&self) -> Option<&str> {
        self.field("RESPMSG")
    }
}
