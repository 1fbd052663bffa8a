// src/auth/token.rs
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

const TOKEN_BYTES: usize = 32;

/// A bearer secret handed to the client once. Only its digest is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretToken {
    raw: String,
}

impl SecretToken {
    pub fn generate() -> Self {
        Self::generate_with(&mut OsRng)
    }

    /// URL-safe base64 without padding, so it drops into query strings as-is.
    pub fn generate_with<R: RngCore>(rng: &mut R) -> Self {
        let mut buf = [0u8; TOKEN_BYTES];
        rng.fill_bytes(&mut buf);
        Self {
            raw: base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn digest(&self) -> [u8; 32] {
        digest(&self.raw)
    }
}

/// SHA-256 of a presented token, for lookups against stored hashes.
pub fn digest(raw: &str) -> [u8; 32] {
    Sha256::digest(raw.as_bytes()).into()
}
