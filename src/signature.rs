//! Request signature verification for the stateless endpoint
//!
//! Providers sign `canonical_url || body` with HMAC-SHA256 over a shared
//! secret and send the base64 digest in [`SIGNATURE_HEADER`].

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;

pub const SIGNATURE_HEADER: &str = "x-hotline-signature";

type HmacSha256 = Hmac<Sha256>;

/// Decides whether a signed request is genuine
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, signature: Option<&str>, url: &str, body: &[u8]) -> bool;
}

impl<T: SignatureVerifier + ?Sized> SignatureVerifier for Arc<T> {
    fn verify(&self, signature: Option<&str>, url: &str, body: &[u8]) -> bool {
        (**self).verify(signature, url, body)
    }
}

pub struct HmacSignatureVerifier {
    secret: Vec<u8>,
}

impl HmacSignatureVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self, url: &str, body: &[u8]) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(url.as_bytes());
        mac.update(body);
        Some(mac)
    }

    /// Signature a provider would send for this request
    pub fn sign(&self, url: &str, body: &[u8]) -> Option<String> {
        self.mac(url, body)
            .map(|mac| BASE64.encode(mac.finalize().into_bytes()))
    }
}

impl SignatureVerifier for HmacSignatureVerifier {
    fn verify(&self, signature: Option<&str>, url: &str, body: &[u8]) -> bool {
        let Some(signature) = signature else {
            return false;
        };
        let Ok(expected) = BASE64.decode(signature.trim()) else {
            return false;
        };
        // verify_slice compares in constant time
        self.mac(url, body)
            .is_some_and(|mac| mac.verify_slice(&expected).is_ok())
    }
}

/// Development mode: every request passes
pub struct AcceptAllVerifier;

impl SignatureVerifier for AcceptAllVerifier {
    fn verify(&self, _signature: Option<&str>, _url: &str, _body: &[u8]) -> bool {
        true
    }
}

/// Production without a secret: nothing can be trusted
pub struct RejectAllVerifier;

impl SignatureVerifier for RejectAllVerifier {
    fn verify(&self, _signature: Option<&str>, _url: &str, _body: &[u8]) -> bool {
        false
    }
}

/// Pick the verifier for a deployment
pub fn verifier_for(secret: Option<&str>, required: bool) -> Arc<dyn SignatureVerifier> {
    match (secret, required) {
        (Some(secret), true) => Arc::new(HmacSignatureVerifier::new(secret.as_bytes())),
        (None, true) => {
            tracing::error!("Signatures required but no signing secret set; rejecting all signed endpoints");
            Arc::new(RejectAllVerifier)
        }
        (_, false) => {
            tracing::warn!("Request signature verification disabled");
            Arc::new(AcceptAllVerifier)
        }
    }
}
