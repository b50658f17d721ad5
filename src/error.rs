//! Error types for the handshake.
//!
//! Routine rejections of untrusted partner tokens are plain `false` results and never
//! appear here. Every variant below means the deployment is broken (missing
//! certificate, unusable key, unreadable config) or the issuer token was refused.

use jsonwebtoken as jwt;
use thiserror::Error;

/// Result type alias for handshake operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// The error type for token generation and issuer token validation.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required argument was empty or whitespace-only.
    #[error("invalid argument `{0}`: value must not be empty")]
    InvalidArgument(&'static str),

    /// The signing key could not be loaded or the crypto provider rejected it.
    #[error("failed to sign token: {0}")]
    Signing(String),

    /// A claim needed to pick verification parameters is absent from the issuer token.
    #[error("unable to read `{claim}` from issuer token: {reason}")]
    ClaimExtraction {
        /// Name of the claim that could not be read.
        claim: &'static str,
        /// What went wrong while reading it.
        reason: String,
    },

    /// No usable certificate for the issuer.
    #[error("issuer certificate for `{issuer}` unavailable: {reason}")]
    Certificate {
        /// Issuer the certificate was requested for.
        issuer: String,
        /// Why it could not be loaded.
        reason: String,
    },

    /// Key ids mismatched between the token header and the issuer certificate.
    #[error("key id mismatch: token {0:?}, certificate {1:?}")]
    KidMismatch(Option<String>, Option<String>),

    /// The issuer token failed verification. See the associated `jwt::errors::Error`.
    #[error("failed to validate the token")]
    TokenValidation(#[source] jwt::errors::Error),

    /// The token was well formed but addressed to a different audience than configured.
    #[error("token audience `{found}` does not match expected `{expected}`")]
    AudienceMismatch {
        /// Audience pinned by configuration.
        expected: String,
        /// Audience read from the token.
        found: String,
    },

    /// Configuration could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}
