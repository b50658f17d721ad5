//! Token construction for both sides of the handshake.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken as jwt;
use tracing::{debug, instrument};

use crate::{
    certificate::CertificateStore,
    claims::{audience_for, IssuerClaims},
    compact::CompactToken,
    config::{HandshakeConfig, MAX_WINDOW_SECS},
    error::{AuthError, Result},
    keys::SIGNATURE_ALGORITHM,
    nonce::Nonce,
};

/// Builds issuer tokens and compact partner tokens.
///
/// Issuer tokens are signed with the certificate registered for the configured issuer
/// name. Partner tokens need no store and are built with the associated functions.
pub struct TokenGenerator {
    config: HandshakeConfig,
    store: Arc<dyn CertificateStore>,
}

impl TokenGenerator {
    /// Creates a generator signing as `config.issuer`.
    pub fn new(config: HandshakeConfig, store: Arc<dyn CertificateStore>) -> Self {
        TokenGenerator { config, store }
    }

    /// Configuration in use.
    pub fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    /// Signs the partner's answer to an issuer token.
    ///
    /// `nonce` must be the nonce received in the issuer token; `private_jwk` is the
    /// partner's RSA private key as a JWK. Returns `nonce.yyyyMMddHHmm.base64(signature)`.
    pub fn create_signed_application_token(nonce: &str, private_jwk: &str) -> Result<String> {
        Self::create_signed_application_token_at(nonce, private_jwk, Utc::now())
    }

    /// Like [TokenGenerator::create_signed_application_token], stamped with `now`.
    #[instrument(skip(private_jwk))]
    pub fn create_signed_application_token_at(
        nonce: &str,
        private_jwk: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        if nonce.trim().is_empty() {
            return Err(AuthError::InvalidArgument("nonce"));
        }
        let token = CompactToken::sign(nonce, private_jwk, now)?;
        debug!("signed application token");
        Ok(token.to_string())
    }

    /// Issues a signed token for `application_id` acting in `context_id`.
    ///
    /// Returns the serialized token together with the freshly generated nonce, which the
    /// caller keeps to check the partner's answer.
    pub fn create_signed_issuer_token(&self, context_id: &str, application_id: &str) -> Result<(String, Nonce)> {
        self.create_signed_issuer_token_at(context_id, application_id, Utc::now())
    }

    /// Like [TokenGenerator::create_signed_issuer_token], issued at `now`.
    #[instrument(skip(self), fields(issuer = %self.config.issuer))]
    pub fn create_signed_issuer_token_at(
        &self,
        context_id: &str,
        application_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(String, Nonce)> {
        if context_id.trim().is_empty() {
            return Err(AuthError::InvalidArgument("context_id"));
        }
        if application_id.trim().is_empty() {
            return Err(AuthError::InvalidArgument("application_id"));
        }

        let nonce = Nonce::generate();
        let audience = audience_for(application_id);
        let not_before = now - seconds(self.config.not_before_skew_secs);

        let claims = IssuerClaims {
            sub: audience.clone(),
            aud: audience,
            iss: self.config.issuer.clone(),
            iat: not_before.timestamp(),
            nbf: not_before.timestamp(),
            exp: (now + seconds(self.config.token_lifetime_secs)).timestamp(),
            nonce: nonce.as_str().to_owned(),
            context_id: context_id.to_owned(),
        };

        let token = self.sign(&claims)?;
        debug!(exp = claims.exp, "signed issuer token");
        Ok((token, nonce))
    }

    fn sign(&self, claims: &IssuerClaims) -> Result<String> {
        let certificate = self
            .store
            .certificate(&self.config.issuer)
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        let key = certificate.encoding_key()?;

        let mut header = jwt::Header::new(SIGNATURE_ALGORITHM);
        header.kid = certificate.key_id().map(str::to_owned);

        jwt::encode(&header, claims, &key).map_err(|e| AuthError::Signing(e.to_string()))
    }
}

fn seconds(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_WINDOW_SECS) as i64)
}
