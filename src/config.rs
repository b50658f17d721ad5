//! Handshake configuration.

use std::{collections::HashMap, path::PathBuf};

use serde::Deserialize;

use crate::error::{AuthError, Result};

/// Issuer name stamped into tokens when none is configured.
pub const DEFAULT_ISSUER: &str = "Issuer AS";

/// Upper bound for configured token windows, one day.
pub const MAX_WINDOW_SECS: u64 = 86_400;

/// Settings shared by [TokenGenerator](crate::TokenGenerator) and [TokenValidator](crate::TokenValidator).
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust
/// use mirroring_auth::HandshakeConfig;
///
/// let config = HandshakeConfig::from_json_str(r#"{ "max_drift_minutes": 5 }"#).unwrap();
/// assert_eq!(config.max_drift_minutes, 5);
/// assert_eq!(config.token_lifetime_secs, 300);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// Value of the `iss` claim on issued tokens.
    pub issuer: String,

    /// Maximum absolute distance, in minutes, between a compact token's timestamp and now.
    pub max_drift_minutes: i64,

    /// How far `iat`/`nbf` are backdated on issued tokens.
    pub not_before_skew_secs: u64,

    /// Lifetime of an issued token, counted from the moment of signing.
    pub token_lifetime_secs: u64,

    /// Leeway granted to `exp`/`nbf` checks when validating issuer tokens.
    pub leeway_secs: u64,

    /// When set, issuer tokens addressed to any other audience are refused.
    pub expected_audience: Option<String>,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        HandshakeConfig {
            issuer: String::from(DEFAULT_ISSUER),
            max_drift_minutes: 15,
            not_before_skew_secs: 60,
            token_lifetime_secs: 300,
            leeway_secs: 0,
            expected_audience: None,
        }
    }
}

impl HandshakeConfig {
    /// Parses a JSON document, filling absent fields with defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| AuthError::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_json_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let json = std::fs::read_to_string(&path)
            .map_err(|e| AuthError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Drift window for compact tokens, or `None` when `max_drift_minutes` is not a
    /// positive duration chrono can represent.
    pub fn max_drift(&self) -> Option<chrono::Duration> {
        if self.max_drift_minutes <= 0 {
            return None;
        }
        chrono::Duration::try_minutes(self.max_drift_minutes)
    }

    /// Leeway for issuer token validation, capped at one day.
    pub fn leeway(&self) -> u64 {
        self.leeway_secs.min(MAX_WINDOW_SECS)
    }

    fn check(&self) -> Result<()> {
        if self.issuer.trim().is_empty() {
            return Err(AuthError::Config("issuer must not be empty".into()));
        }
        if self.max_drift_minutes <= 0 || self.max_drift_minutes as u64 > MAX_WINDOW_SECS / 60 {
            return Err(AuthError::Config(format!("max_drift_minutes must be within 1..={}", MAX_WINDOW_SECS / 60)));
        }
        if self.token_lifetime_secs == 0 || self.token_lifetime_secs > MAX_WINDOW_SECS {
            return Err(AuthError::Config(format!("token_lifetime_secs must be within 1..={MAX_WINDOW_SECS}")));
        }
        if self.not_before_skew_secs > MAX_WINDOW_SECS {
            return Err(AuthError::Config(format!("not_before_skew_secs must not exceed {MAX_WINDOW_SECS}")));
        }
        if self.leeway_secs > MAX_WINDOW_SECS {
            return Err(AuthError::Config(format!("leeway_secs must not exceed {MAX_WINDOW_SECS}")));
        }
        Ok(())
    }
}

/// Where the issuer certificates live on disk.
///
/// `certificates` maps an issuer name to a JWK file name relative to `directory`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CertificateStoreConfig {
    /// Directory holding the JWK files.
    pub directory: PathBuf,

    /// Issuer name to file name.
    #[serde(default)]
    pub certificates: HashMap<String, String>,
}

impl CertificateStoreConfig {
    /// Parses a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| AuthError::Config(e.to_string()))
    }

    /// Full path of the certificate registered for `issuer`, if any.
    pub fn path_for(&self, issuer: &str) -> Option<PathBuf> {
        self.certificates.get(issuer).map(|file| self.directory.join(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HandshakeConfig::default();
        assert_eq!(config.issuer, "Issuer AS");
        assert_eq!(config.max_drift(), Some(chrono::Duration::minutes(15)));
        assert_eq!(config.not_before_skew_secs, 60);
        assert_eq!(config.token_lifetime_secs, 300);
        assert_eq!(config.leeway_secs, 0);
        assert_eq!(config.expected_audience, None);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = HandshakeConfig::from_json_str(
            r#"{ "issuer": "SuperIssuer", "expected_audience": "spn:APP123" }"#,
        )
        .unwrap();
        assert_eq!(config.issuer, "SuperIssuer");
        assert_eq!(config.expected_audience.as_deref(), Some("spn:APP123"));
        assert_eq!(config.max_drift_minutes, 15);
    }

    #[test]
    fn reject_empty_issuer() {
        let res = HandshakeConfig::from_json_str(r#"{ "issuer": "  " }"#);
        assert!(matches!(res, Err(AuthError::Config(_))), "{:?}", res);
    }

    #[test]
    fn reject_zero_drift() {
        let res = HandshakeConfig::from_json_str(r#"{ "max_drift_minutes": 0 }"#);
        assert!(matches!(res, Err(AuthError::Config(_))), "{:?}", res);
    }

    #[test]
    fn unrepresentable_drift_has_no_window() {
        for minutes in [0, -5, i64::MIN, i64::MAX / 2, i64::MAX] {
            let config = HandshakeConfig { max_drift_minutes: minutes, ..HandshakeConfig::default() };
            assert_eq!(config.max_drift(), None, "window for {minutes} minutes");
        }
    }

    #[test]
    fn leeway_is_capped() {
        let config = HandshakeConfig { leeway_secs: u64::MAX, ..HandshakeConfig::default() };
        assert_eq!(config.leeway(), MAX_WINDOW_SECS);

        let res = HandshakeConfig::from_json_str(r#"{ "leeway_secs": 86401 }"#);
        assert!(matches!(res, Err(AuthError::Config(_))), "{:?}", res);
    }

    #[test]
    fn reject_unbounded_lifetime() {
        let res = HandshakeConfig::from_json_str(r#"{ "token_lifetime_secs": 86401 }"#);
        assert!(matches!(res, Err(AuthError::Config(_))), "{:?}", res);
    }

    #[test]
    fn reject_malformed_json() {
        let res = HandshakeConfig::from_json_str("{ issuer");
        assert!(matches!(res, Err(AuthError::Config(_))), "{:?}", res);
    }

    #[test]
    fn store_config_paths() {
        let config = CertificateStoreConfig::from_json_str(
            r#"{ "directory": "/etc/certs", "certificates": { "Issuer AS": "issuer.jwk" } }"#,
        )
        .unwrap();
        assert_eq!(config.path_for("Issuer AS"), Some(PathBuf::from("/etc/certs/issuer.jwk")));
        assert_eq!(config.path_for("Someone Else"), None);
    }
}
