//! Partner key material.
//!
//! Keys travel as JSON Web Keys. A partner registers the public half with the issuer
//! out of band and keeps the private half to sign its compact tokens.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebkey as jwk;
use jsonwebtoken as jwt;
use tracing::warn;

use crate::error::{AuthError, Result};

/// Algorithm used for signing and verifying compact token data (RSASSA-PKCS1-v1_5 with SHA-256).
pub const SIGNATURE_ALGORITHM: jwt::Algorithm = jwt::Algorithm::RS256;

/// Public key of a partner application.
///
/// Only emptiness is checked when constructing. Key material that is not a usable
/// public JWK is accepted here and makes every [ApplicationKeys::validate_signature]
/// call return `false`, so a typo in a registered key shows up as rejected tokens
/// (and a `warn!` log line) rather than as an error.
///
/// The JWK is parsed once, when the keys are created.
#[derive(Clone)]
pub struct ApplicationKeys {
    public_jwk: String,
    verifying_key: Option<jwt::DecodingKey>,
}

impl ApplicationKeys {
    /// Wraps the partner's public JWK.
    ///
    /// ```rust
    /// use mirroring_auth::{ApplicationKeys, AuthError};
    ///
    /// assert!(matches!(ApplicationKeys::new("   "), Err(AuthError::InvalidArgument(_))));
    /// ```
    pub fn new(public_jwk: impl Into<String>) -> Result<Self> {
        let public_jwk = public_jwk.into();
        if public_jwk.trim().is_empty() {
            return Err(AuthError::InvalidArgument("public_jwk"));
        }
        let verifying_key = match public_jwk.parse::<jwk::JsonWebKey>() {
            Ok(key) => verifying_key(&key),
            Err(e) => {
                warn!(error = %e, "partner public key is not a valid JWK");
                None
            }
        };
        Ok(ApplicationKeys { public_jwk, verifying_key })
    }

    /// The JWK this instance was created with.
    pub fn public_jwk(&self) -> &str {
        &self.public_jwk
    }

    /// Checks that `signature` was produced over `data` by the private key paired with
    /// this public key. A mismatch is `false`, never an error.
    pub fn validate_signature(&self, data: &[u8], signature: &[u8]) -> bool {
        let Some(key) = &self.verifying_key else {
            warn!("partner public key unusable, rejecting signature");
            return false;
        };

        let signature = URL_SAFE_NO_PAD.encode(signature);
        match jwt::crypto::verify(&signature, data, key, SIGNATURE_ALGORITHM) {
            Ok(valid) => valid,
            Err(e) => {
                warn!(error = %e, "partner public key rejected by crypto provider");
                false
            }
        }
    }
}

impl fmt::Debug for ApplicationKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationKeys")
            .field("public_jwk", &self.public_jwk)
            .field("usable", &self.verifying_key.is_some())
            .finish()
    }
}

impl PartialEq for ApplicationKeys {
    fn eq(&self, other: &Self) -> bool {
        self.public_jwk == other.public_jwk
    }
}

impl Eq for ApplicationKeys {}

/// Public half of `key` as a verification key. Private parameters are dropped first, so
/// a private JWK registered by mistake still verifies. `None` for symmetric keys.
pub(crate) fn verifying_key(key: &jwk::JsonWebKey) -> Option<jwt::DecodingKey> {
    Some(key.key.to_public()?.to_decoding_key())
}

/// Loads an RSA private JWK for signing.
pub(crate) fn signing_key(private_jwk: &str) -> Result<jwt::EncodingKey> {
    let key = private_jwk
        .parse::<jwk::JsonWebKey>()
        .map_err(|e| AuthError::Signing(format!("private key is not a valid JWK: {e}")))?;
    encoding_key(&key)
}

pub(crate) fn encoding_key(key: &jwk::JsonWebKey) -> Result<jwt::EncodingKey> {
    if !matches!(*key.key, jwk::Key::RSA { private: Some(_), .. }) {
        return Err(AuthError::Signing("key is not an RSA private key".into()));
    }
    key.key
        .try_to_encoding_key()
        .map_err(|e| AuthError::Signing(format!("private key rejected: {e}")))
}

/// Signs `data` and returns the raw signature bytes.
pub(crate) fn sign(data: &[u8], key: &jwt::EncodingKey) -> Result<Vec<u8>> {
    let signature = jwt::crypto::sign(data, key, SIGNATURE_ALGORITHM)
        .map_err(|e| AuthError::Signing(e.to_string()))?;
    URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|e| AuthError::Signing(format!("crypto provider returned malformed signature: {e}")))
}
