//! Issuer certificates and where to find them.
//!
//! The issuer signs its tokens with an RSA key published as a JWK. Validators only need
//! the public half; the issuing side keeps a JWK with the private parameters. Both are
//! looked up by issuer name through a [CertificateStore].

use std::{collections::HashMap, fmt, path::PathBuf, sync::Arc};

use dashmap::DashMap;
use jsonwebkey as jwk;
use jsonwebtoken as jwt;
use tracing::{debug, warn};

use crate::{
    config::CertificateStoreConfig,
    error::{AuthError, Result},
    keys,
};

/// The key an issuer signs its tokens with.
pub struct IssuerCertificate {
    issuer: String,
    key: jwk::JsonWebKey,
    verifying_key: jwt::DecodingKey,
}

impl IssuerCertificate {
    /// Parses the issuer's JWK. Public-only keys can verify but not sign.
    pub fn from_jwk(issuer: impl Into<String>, jwk_json: &str) -> Result<Self> {
        let issuer = issuer.into();
        let key = jwk_json.parse::<jwk::JsonWebKey>().map_err(|e| AuthError::Certificate {
            issuer: issuer.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(*key.key, jwk::Key::RSA { .. }) {
            return Err(AuthError::Certificate { issuer, reason: "not an RSA key".into() });
        }
        let Some(verifying_key) = keys::verifying_key(&key) else {
            return Err(AuthError::Certificate { issuer, reason: "no public key".into() });
        };
        Ok(IssuerCertificate { issuer, key, verifying_key })
    }

    /// Issuer this certificate belongs to.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The `kid` of the underlying JWK.
    pub fn key_id(&self) -> Option<&str> {
        self.key.key_id.as_deref()
    }

    /// Whether the certificate carries the private parameters needed for signing.
    pub fn can_sign(&self) -> bool {
        matches!(*self.key.key, jwk::Key::RSA { private: Some(_), .. })
    }

    pub(crate) fn decoding_key(&self) -> &jwt::DecodingKey {
        &self.verifying_key
    }

    pub(crate) fn encoding_key(&self) -> Result<jwt::EncodingKey> {
        keys::encoding_key(&self.key)
    }
}

impl fmt::Debug for IssuerCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuerCertificate")
            .field("issuer", &self.issuer)
            .field("key_id", &self.key.key_id)
            .field("can_sign", &self.can_sign())
            .finish()
    }
}

/// Source of issuer certificates.
///
/// Implementations must be safe to share across threads; certificates are handed out
/// as shared, read-only [Arc]s.
pub trait CertificateStore: Send + Sync {
    /// The certificate registered for `issuer`.
    fn certificate(&self, issuer: &str) -> Result<Arc<IssuerCertificate>>;
}

/// Certificates held in memory, typically built once at startup.
#[derive(Debug, Default)]
pub struct MemoryCertificateStore {
    certificates: HashMap<String, Arc<IssuerCertificate>>,
}

impl MemoryCertificateStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `certificate` under its issuer name, replacing any previous one.
    pub fn with_certificate(mut self, certificate: IssuerCertificate) -> Self {
        self.certificates.insert(certificate.issuer.clone(), Arc::new(certificate));
        self
    }
}

impl CertificateStore for MemoryCertificateStore {
    fn certificate(&self, issuer: &str) -> Result<Arc<IssuerCertificate>> {
        self.certificates.get(issuer).cloned().ok_or_else(|| AuthError::Certificate {
            issuer: issuer.to_owned(),
            reason: "no certificate registered".into(),
        })
    }
}

/// JWK files on disk, read on first use and cached for the life of the store.
#[derive(Debug)]
pub struct DirectoryCertificateStore {
    config: CertificateStoreConfig,
    cache: DashMap<String, Arc<IssuerCertificate>>,
}

impl DirectoryCertificateStore {
    /// Creates a store over the files named in `config`. Nothing is read yet.
    pub fn new(config: CertificateStoreConfig) -> Self {
        DirectoryCertificateStore { config, cache: DashMap::new() }
    }

    /// Shorthand for a single issuer whose JWK sits at `directory/file`.
    pub fn single(directory: impl Into<PathBuf>, issuer: impl Into<String>, file: impl Into<String>) -> Self {
        let mut certificates = HashMap::new();
        certificates.insert(issuer.into(), file.into());
        Self::new(CertificateStoreConfig { directory: directory.into(), certificates })
    }

    /// Number of certificates loaded so far.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    fn load(&self, issuer: &str) -> Result<IssuerCertificate> {
        let path = self.config.path_for(issuer).ok_or_else(|| AuthError::Certificate {
            issuer: issuer.to_owned(),
            reason: "no certificate registered".into(),
        })?;

        let json = std::fs::read_to_string(&path).map_err(|e| {
            warn!(issuer, path = %path.display(), error = %e, "failed to read issuer certificate");
            AuthError::Certificate { issuer: issuer.to_owned(), reason: format!("{}: {e}", path.display()) }
        })?;

        debug!(issuer, path = %path.display(), "loaded issuer certificate");
        IssuerCertificate::from_jwk(issuer, &json)
    }
}

impl CertificateStore for DirectoryCertificateStore {
    fn certificate(&self, issuer: &str) -> Result<Arc<IssuerCertificate>> {
        if let Some(certificate) = self.cache.get(issuer) {
            return Ok(Arc::clone(&certificate));
        }

        let certificate = Arc::new(self.load(issuer)?);
        Ok(Arc::clone(self.cache.entry(issuer.to_owned()).or_insert(certificate).value()))
    }
}
