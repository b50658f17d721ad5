//! Claims carried by issuer tokens.

use serde::{Deserialize, Serialize};

/// Name of the claim carrying the customer context identifier.
pub const CONTEXT_CLAIM: &str = "ctx";

/// Prefix the issuer puts in front of an application id to form the audience.
pub const AUDIENCE_PREFIX: &str = "spn:";

/// Claim set of an issuer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerClaims {
    /// Subject, the audience identifier of the receiving application.
    pub sub: String,
    /// Audience, `spn:<application id>`.
    pub aud: String,
    /// Issuer name.
    pub iss: String,
    /// Issued at, Unix seconds.
    pub iat: i64,
    /// Not before, Unix seconds.
    pub nbf: i64,
    /// Expiry, Unix seconds.
    pub exp: i64,
    /// Handshake nonce the partner has to echo.
    pub nonce: String,
    /// Customer context identifier.
    #[serde(rename = "ctx")]
    pub context_id: String,
}

/// Audience identifier for an application id.
pub fn audience_for(application_id: &str) -> String {
    format!("{AUDIENCE_PREFIX}{application_id}")
}
