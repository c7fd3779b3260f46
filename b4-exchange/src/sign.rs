//! Request signing primitives used by a future concrete venue client.
//! Exercised today only by the unit tests of the algorithm itself.

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::atomic::{AtomicI64, Ordering};

type HmacSha256 = Hmac<Sha256>;

/// `base64(HMAC-SHA256(base64-decoded-secret, apiKey||stampMs))`.
pub fn sign_request(secret_b64: &str, api_key: &str, stamp_ms: i64) -> Result<String, SignError> {
    let secret = STANDARD.decode(secret_b64).map_err(|_| SignError::InvalidSecret)?;
    let mut mac = HmacSha256::new_from_slice(&secret).map_err(|_| SignError::InvalidSecret)?;
    mac.update(api_key.as_bytes());
    mac.update(stamp_ms.to_string().as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignError {
    #[error("invalid base64 HMAC secret")]
    InvalidSecret,
}

/// Monotonic millisecond nonce: strictly increasing by at least 1ms even
/// when the wall clock does not advance between calls.
pub struct MonotonicNonce {
    last: AtomicI64,
}

impl Default for MonotonicNonce {
    fn default() -> Self {
        Self { last: AtomicI64::new(0) }
    }
}

impl MonotonicNonce {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, wall_clock_ms: i64) -> i64 {
        loop {
            let prev = self.last.load(Ordering::SeqCst);
            let candidate = wall_clock_ms.max(prev + 1);
            if self
                .last
                .compare_exchange(prev, candidate, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_is_deterministic() {
        let secret = STANDARD.encode(b"super-secret-key");
        let a = sign_request(&secret, "key1", 1_000).unwrap();
        let b = sign_request(&secret, "key1", 1_000).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn signing_changes_with_stamp() {
        let secret = STANDARD.encode(b"super-secret-key");
        let a = sign_request(&secret, "key1", 1_000).unwrap();
        let b = sign_request(&secret, "key1", 1_001).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn nonce_strictly_increases_even_without_clock_progress() {
        let nonce = MonotonicNonce::new();
        let a = nonce.next(1_000);
        let b = nonce.next(1_000);
        let c = nonce.next(1_000);
        assert!(a < b);
        assert!(b < c);
    }
}
