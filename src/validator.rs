//! Verification of both token kinds.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use jsonwebtoken as jwt;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::{
    certificate::CertificateStore,
    claims::IssuerClaims,
    compact::CompactToken,
    config::HandshakeConfig,
    error::{AuthError, Result},
    keys::{ApplicationKeys, SIGNATURE_ALGORITHM},
};

/// A verified issuer token.
#[derive(Debug, Clone)]
pub struct IssuerTokenValidation {
    /// Header of the token.
    pub header: jwt::Header,
    /// Claims, checked against the issuer certificate.
    pub claims: IssuerClaims,
}

/// Checks partner answers and issuer tokens.
pub struct TokenValidator {
    config: HandshakeConfig,
    store: Arc<dyn CertificateStore>,
}

impl TokenValidator {
    /// Creates a validator that looks issuer certificates up in `store`.
    pub fn new(config: HandshakeConfig, store: Arc<dyn CertificateStore>) -> Self {
        TokenValidator { config, store }
    }

    /// Configuration in use.
    pub fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    /// Verifies a compact token sent by a partner.
    ///
    /// The token must be signed by the private key paired with `keys`, carry a
    /// timestamp within the drift window, and echo exactly `expected_nonce`. Malformed
    /// or forged tokens are `false`, never an error.
    pub fn validate_partner_token(&self, keys: &ApplicationKeys, token: &str, expected_nonce: &str) -> bool {
        self.validate_partner_token_at(keys, token, expected_nonce, Utc::now())
    }

    /// Like [TokenValidator::validate_partner_token], with `now` as the current time.
    #[instrument(skip(self, keys, token))]
    pub fn validate_partner_token_at(
        &self,
        keys: &ApplicationKeys,
        token: &str,
        expected_nonce: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(max_drift) = self.config.max_drift() else {
            warn!(max_drift_minutes = self.config.max_drift_minutes, "drift window unusable, rejecting partner token");
            return false;
        };

        let token = CompactToken::parse(token);
        if !token.validate_at(keys, now, max_drift) {
            debug!(parsed = token.is_parsed(), "partner token rejected");
            return false;
        }

        if token.nonce() != Some(expected_nonce) {
            debug!("partner token nonce mismatch");
            return false;
        }
        true
    }

    /// Verifies a token produced by an issuer.
    ///
    /// The audience and issuer are first read from the unverified payload to pick the
    /// certificate and pin the expected values; the whole token is then verified
    /// against that certificate. Nothing read in the first step is trusted unless the
    /// second succeeds.
    ///
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use mirroring_auth::{DirectoryCertificateStore, HandshakeConfig, TokenValidator};
    ///
    /// let store = DirectoryCertificateStore::single("/etc/issuer", "Issuer AS", "issuer.public.jwk");
    /// let validator = TokenValidator::new(HandshakeConfig::default(), Arc::new(store));
    ///
    /// let issuer_token = "...";
    /// match validator.validate_issuer_token(issuer_token) {
    ///     Ok(validation) => println!("nonce to echo: {}", validation.claims.nonce),
    ///     Err(err) => println!("Auth error: {:?}", err),
    /// }
    /// ```
    #[instrument(skip_all)]
    pub fn validate_issuer_token(&self, token: &str) -> Result<IssuerTokenValidation> {
        let (audience, issuer) = read_audience_and_issuer(token)?;

        if let Some(expected) = &self.config.expected_audience {
            if *expected != audience {
                return Err(AuthError::AudienceMismatch { expected: expected.clone(), found: audience });
            }
        }

        let certificate = self.store.certificate(&issuer).map_err(|e| {
            warn!(issuer = %issuer, error = %e, "no certificate for issuer token");
            e
        })?;

        let header = jwt::decode_header(token).map_err(AuthError::TokenValidation)?;
        if header.kid.as_deref() != certificate.key_id() {
            return Err(AuthError::KidMismatch(header.kid, certificate.key_id().map(str::to_owned)));
        }

        let mut validation = jwt::Validation::new(SIGNATURE_ALGORITHM);
        validation
            .required_spec_claims
            .extend(["exp", "nbf", "iss", "aud", "sub"].into_iter().map(String::from));
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = self.config.leeway();
        validation.set_audience(&[&audience]);
        validation.set_issuer(&[&issuer]);

        let token = jwt::decode::<IssuerClaims>(token, certificate.decoding_key(), &validation).map_err(|e| {
            debug!(error = %e, issuer = %issuer, "issuer token rejected");
            AuthError::TokenValidation(e)
        })?;

        debug!(issuer = %issuer, audience = %audience, "issuer token verified");
        Ok(IssuerTokenValidation { header: token.header, claims: token.claims })
    }
}

/// Reads `aud` and `iss` without checking the signature.
fn read_audience_and_issuer(token: &str) -> Result<(String, String)> {
    let unreadable = |reason: String| AuthError::ClaimExtraction { claim: "aud", reason };

    let mut parts = token.split('.');
    let (Some(_), Some(payload), Some(_), None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
        return Err(unreadable("token is not a compact JWS".into()));
    };

    let payload = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| unreadable(format!("payload is not base64url: {e}")))?;
    let claims: Map<String, Value> =
        serde_json::from_slice(&payload).map_err(|e| unreadable(format!("payload is not a JSON object: {e}")))?;

    Ok((string_claim(&claims, "aud")?, string_claim(&claims, "iss")?))
}

fn string_claim(claims: &Map<String, Value>, claim: &'static str) -> Result<String> {
    match claims.get(claim) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(AuthError::ClaimExtraction { claim, reason: "claim is not a string".into() }),
        None => Err(AuthError::ClaimExtraction { claim, reason: "claim is missing".into() }),
    }
}
