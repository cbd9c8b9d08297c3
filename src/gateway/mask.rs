use serde::Serialize;

pub struct Masked;

pub trait MaskPolicy {
    fn mask(value: &str) -> String;
}

impl MaskPolicy for Masked {
    fn mask(value: &str) -> String {
        let len = value.chars().count();
        if len > 4 {
            let visible: String = value.chars().skip(len - 4).collect();
            "*".repeat(len - 4) + &visible
        } else {
            "*".repeat(len)
        }
    }
}

/// Return true if a key name holds a request or callback signature.
fn is_signature_key(key: &str) -> bool {
    let k = key.to_lowercase();
    k.contains("signature") || k.contains("checksum")
}

/// Return true if a key name holds a session token or customer contact data.
fn is_partial_key(key: &str) -> bool {
    let k = key.to_lowercase();
    k.contains("token") || k.contains("email") || k.contains("mobile") || k.contains("phone")
}

pub fn secure_serializable(v: impl Serialize) -> serde_json::Value {
    match serde_json::to_value(v) {
        Ok(value) => secure_value(&value),
        Err(e) => serde_json::Value::String(format!("<unserializable: {e}>")),
    }
}

pub fn secure_value(v: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match v {
        Value::Object(map) => {
            let mut new = serde_json::Map::with_capacity(map.len());
            for (k, val) in map {
                let new_val = match val {
                    Value::String(_) | Value::Number(_) if is_signature_key(k) => {
                        Value::String("***".to_string())
                    }
                    Value::String(s) if is_partial_key(k) => Value::String(Masked::mask(s)),
                    _ => secure_value(val),
                };
                new.insert(k.clone(), new_val);
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(secure_value).collect()),
        other => other.clone(),
    }
}
