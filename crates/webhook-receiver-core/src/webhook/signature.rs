//! HMAC-SHA256 signing and verification over raw request bytes.
//!
//! The header format is `sha256=<lowercase-hex-digest>`. Both the HTTP
//! endpoint and the offline signing tool go through [`compute_signature`], so
//! a value produced by one is always accepted by the other.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Prefix carried by every signature header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Compute the signature header value for `body` keyed by `secret`.
///
/// The body must be the exact bytes sent on the wire; re-serialized JSON will
/// not produce the same digest.
///
/// # Examples
///
/// ```rust
/// use webhook_receiver_core::webhook::compute_signature;
///
/// let sig = compute_signature(b"topsecret", b"{}");
/// assert!(sig.starts_with("sha256="));
/// assert_eq!(sig.len(), "sha256=".len() + 64);
/// ```
pub fn compute_signature(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(body);
    let digest = mac.finalize().into_bytes();
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(digest))
}

/// Verify a received signature header against `body`.
///
/// A missing header is treated exactly like a wrong one. The comparison runs
/// in constant time with respect to the position of the first differing byte.
pub fn verify_signature(secret: &[u8], body: &[u8], received: Option<&str>) -> bool {
    let received = match received {
        Some(value) if !value.is_empty() => value,
        _ => return false,
    };

    let expected = compute_signature(secret, body);
    expected.as_bytes().ct_eq(received.as_bytes()).into()
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
