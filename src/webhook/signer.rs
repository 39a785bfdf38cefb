//! Webhook identity and payload signatures
//!
//! Webhook secrets are 256-bit random values; signatures are hex-encoded
//! HMAC-SHA256 over the exact payload bytes.

use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;
use uuid::Uuid;

use crate::error::{GateError, Result};

use super::signal::Signal;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying a signature over the raw request body
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

const SECRET_BYTES: usize = 32;

/// Generate a new webhook identifier
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a new hex-encoded webhook secret
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Sign a payload with the webhook secret
pub fn sign(payload: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Check a signature against a payload in constant time
pub fn verify(payload: &str, signature: &str, secret: &str) -> bool {
    let expected = sign(payload, secret);

    if expected.len() != signature.len() {
        return false;
    }

    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

/// The signed form of a payload whose signature travels inside it:
/// the JSON object without its `signature` field, keys sorted.
pub fn canonical_payload(raw: &str) -> Option<String> {
    let mut value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object_mut()?;
    object.remove("signature");
    serde_json::to_string(&value).ok()
}

/// Authenticate an inbound signal.
///
/// A header signature covers the raw body. Otherwise the payload's own
/// `signature` field covers [`canonical_payload`]. Unsigned signals pass
/// unless `require_signature` is set.
pub fn verify_signal(
    raw: &str,
    header_signature: Option<&str>,
    signal: &Signal,
    secret: &str,
    require_signature: bool,
) -> Result<()> {
    if let Some(signature) = header_signature {
        return if verify(raw, signature.trim(), secret) {
            Ok(())
        } else {
            debug!("Header signature mismatch");
            Err(GateError::InvalidSignature)
        };
    }

    match signal.signature.as_deref() {
        Some(signature) => {
            let canonical = canonical_payload(raw).ok_or(GateError::InvalidSignal)?;
            if verify(&canonical, signature, secret) {
                Ok(())
            } else {
                debug!("Payload signature mismatch");
                Err(GateError::InvalidSignature)
            }
        }
        None if require_signature => Err(GateError::MissingSignature),
        None => Ok(()),
    }
}
