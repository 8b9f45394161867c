//! Share link token generation.

use rand::RngCore;
use rand::rngs::OsRng;

/// Number of random bytes in a token unless configured otherwise.
pub const DEFAULT_TOKEN_BYTES: usize = 16;

/// Generates share link tokens.
#[derive(Debug, Clone)]
pub struct LinkService {
    token_bytes: usize,
}

impl LinkService {
    /// Creates a link service producing tokens of `token_bytes` random bytes.
    pub fn new(token_bytes: usize) -> Self {
        Self {
            token_bytes: token_bytes.max(DEFAULT_TOKEN_BYTES),
        }
    }

    /// Generates a cryptographically secure random token, hex encoded.
    pub fn generate_token(&self) -> String {
        let mut bytes = vec![0u8; self.token_bytes];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(&bytes)
    }
}

impl Default for LinkService {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_BYTES)
    }
}

/// Leading characters of a token, safe to put in logs.
pub(crate) fn token_prefix(token: &str) -> &str {
    token.get(..8).unwrap_or(token)
}

mod hex {
    /// Encode bytes as lowercase hex.
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}
