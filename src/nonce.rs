//! Handshake nonces.

use std::fmt::{self, Write};

use rand::{rngs::OsRng, RngCore};

/// Number of random bytes behind a nonce.
pub const NONCE_BYTES: usize = 16;

/// Single-use value binding the issuer token to the partner's answer.
///
/// Rendered as 32 uppercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Nonce(String);

impl Nonce {
    /// Draws a fresh nonce from the operating system's CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_BYTES];
        OsRng.fill_bytes(&mut bytes);

        let mut hex = String::with_capacity(NONCE_BYTES * 2);
        for b in bytes {
            // Writing into a String cannot fail.
            let _ = write!(hex, "{b:02X}");
        }
        Nonce(hex)
    }

    /// The hex rendering.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Nonce {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Nonce> for String {
    fn from(nonce: Nonce) -> Self {
        nonce.0
    }
}
