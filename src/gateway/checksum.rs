use std::{collections::BTreeMap, fmt, str::FromStr};

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use base64::{Engine, engine::general_purpose};
use sha2::{Digest, Sha256};

/// Fixed initialization vector of the Paytm checksum scheme
const IV: [u8; 16] = *b"@@@@&&&&####$$$$";
/// 3 random bytes encode to exactly 4 base64 characters
const SALT_BYTES: usize = 3;
const SALT_LEN: usize = 4;

type Encryptor = cbc::Encryptor<aes::Aes128>;
type Decryptor = cbc::Decryptor<aes::Aes128>;

/// AES-128 merchant secret.
#[derive(Clone)]
pub struct MerchantKey([u8; 16]);

impl FromStr for MerchantKey {
    type Err = ChecksumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s
            .as_bytes()
            .try_into()
            .map_err(|_| ChecksumError::KeyLength(s.len()))?;
        Ok(Self(key))
    }
}

impl fmt::Debug for MerchantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MerchantKey(***)")
    }
}

#[derive(Debug)]
pub enum ChecksumError {
    KeyLength(usize),
    Entropy(String),
    Payload(serde_json::Error),
}

impl std::error::Error for ChecksumError {}

impl From<serde_json::Error> for ChecksumError {
    fn from(value: serde_json::Error) -> Self {
        Self::Payload(value)
    }
}

impl fmt::Display for ChecksumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumError::KeyLength(len) => {
                write!(f, "merchant key must be 16 bytes long, got {len}")
            }
            ChecksumError::Entropy(e) => write!(f, "failed to generate checksum salt: {e}"),
            ChecksumError::Payload(e) => write!(f, "failed to serialize signed payload: {e}"),
        }
    }
}

/// Signature scheme shared with the payment gateway.
pub trait ChecksumSigner: Send + Sync {
    fn sign(&self, payload: &str, key: &MerchantKey) -> Result<String, ChecksumError>;

    /// Fails closed: any malformed signature is reported as a mismatch
    fn verify(&self, payload: &str, key: &MerchantKey, signature: &str) -> bool;
}

/// Paytm checksum.
///
/// `base64(aes128cbc(sha256_hex(payload + "|" + salt) + salt))` with a fixed IV
/// and a 4 character salt.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaytmChecksum;

impl PaytmChecksum {
    fn gen_salt() -> Result<String, ChecksumError> {
        use rand::TryRngCore;
        let mut salt = [0u8; SALT_BYTES];
        rand::rngs::OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| ChecksumError::Entropy(e.to_string()))?;
        Ok(general_purpose::STANDARD.encode(salt))
    }

    fn sign_with_salt(payload: &str, key: &MerchantKey, salt: &str) -> String {
        let hash = salted_hash(payload, salt);
        let encrypted = Encryptor::new(&key.0.into(), &IV.into())
            .encrypt_padded_vec_mut::<Pkcs7>(hash.as_bytes());
        general_purpose::STANDARD.encode(encrypted)
    }
}

impl ChecksumSigner for PaytmChecksum {
    fn sign(&self, payload: &str, key: &MerchantKey) -> Result<String, ChecksumError> {
        let salt = Self::gen_salt()?;
        Ok(Self::sign_with_salt(payload, key, &salt))
    }

    fn verify(&self, payload: &str, key: &MerchantKey, signature: &str) -> bool {
        let Some(expected) = decrypt(signature, key) else {
            return false;
        };
        let Some(salt) = expected
            .len()
            .checked_sub(SALT_LEN)
            .and_then(|start| expected.get(start..))
        else {
            return false;
        };
        salted_hash(payload, salt) == expected
    }
}

fn salted_hash(payload: &str, salt: &str) -> String {
    let digest = Sha256::digest(format!("{payload}|{salt}"));
    format!("{}{salt}", hex::encode(digest))
}

fn decrypt(signature: &str, key: &MerchantKey) -> Option<String> {
    let encrypted = general_purpose::STANDARD.decode(signature.trim()).ok()?;
    let decrypted = Decryptor::new(&key.0.into(), &IV.into())
        .decrypt_padded_vec_mut::<Pkcs7>(&encrypted)
        .ok()?;
    String::from_utf8(decrypted).ok()
}

/// Signed string of a flat parameter set: values ordered by key and joined
/// with `|`. The literal `null` is signed as an empty value.
pub fn canonical_params(params: &BTreeMap<String, String>) -> String {
    params
        .values()
        .map(|v| {
            if v.eq_ignore_ascii_case("null") {
                ""
            } else {
                v.as_str()
            }
        })
        .collect::<Vec<_>>()
        .join("|")
}
