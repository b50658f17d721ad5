//! The compact partner token.
//!
//! A partner answers the issuer's challenge with
//!
//! ```text
//! <nonce>.<timestamp>.<base64(signature)>
//! ```
//!
//! where `timestamp` is the UTC minute of signing formatted as `yyyyMMddHHmm` and the
//! signature is RS256 over the UTF-8 bytes of `<nonce>.<timestamp>`.
//!
//! Parsing untrusted input never fails: anything that does not look like a token
//! becomes [CompactToken::Invalid], which never validates.

use std::{convert::Infallible, fmt, str::FromStr};

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::{
    error::Result,
    keys::{self, ApplicationKeys},
};

/// Default drift bound in minutes.
pub const MAX_ALLOWED_DRIFT_MINUTES: i64 = 15;

/// `chrono` format of the timestamp field.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";

const TIMESTAMP_LEN: usize = 12;

/// A parsed compact token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompactToken {
    /// Three well-formed fields. Their contents are not checked until validation.
    Parts {
        /// Nonce echoed from the issuer token.
        nonce: String,
        /// Signing minute, `yyyyMMddHHmm`.
        timestamp: String,
        /// Decoded signature bytes.
        signature: Vec<u8>,
    },
    /// Wrong arity or undecodable signature.
    Invalid,
}

impl CompactToken {
    /// Splits `raw` into its three fields.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split('.');
        let (Some(nonce), Some(timestamp), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return CompactToken::Invalid;
        };

        match STANDARD.decode(signature) {
            Ok(signature) => CompactToken::Parts {
                nonce: nonce.to_owned(),
                timestamp: timestamp.to_owned(),
                signature,
            },
            Err(_) => CompactToken::Invalid,
        }
    }

    /// Builds and signs a token for the given instant with an RSA private JWK.
    pub fn sign(nonce: &str, private_jwk: &str, now: DateTime<Utc>) -> Result<Self> {
        let key = keys::signing_key(private_jwk)?;
        let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
        let signature = keys::sign(signing_input(nonce, &timestamp).as_bytes(), &key)?;
        Ok(CompactToken::Parts { nonce: nonce.to_owned(), timestamp, signature })
    }

    /// The nonce field, if the token parsed.
    pub fn nonce(&self) -> Option<&str> {
        match self {
            CompactToken::Parts { nonce, .. } => Some(nonce),
            CompactToken::Invalid => None,
        }
    }

    /// The raw timestamp field, if the token parsed.
    pub fn timestamp(&self) -> Option<&str> {
        match self {
            CompactToken::Parts { timestamp, .. } => Some(timestamp),
            CompactToken::Invalid => None,
        }
    }

    /// The decoded signature, if the token parsed.
    pub fn signature(&self) -> Option<&[u8]> {
        match self {
            CompactToken::Parts { signature, .. } => Some(signature),
            CompactToken::Invalid => None,
        }
    }

    /// Whether the token parsed into three fields.
    pub fn is_parsed(&self) -> bool {
        matches!(self, CompactToken::Parts { .. })
    }

    /// Checks the timestamp against the current time.
    pub fn has_valid_timestamp(&self, max_drift: Duration) -> bool {
        self.has_valid_timestamp_at(Utc::now(), max_drift)
    }

    /// Checks the timestamp against `now`. The timestamp may lie on either side of `now`
    /// but must be strictly closer than `max_drift`.
    pub fn has_valid_timestamp_at(&self, now: DateTime<Utc>, max_drift: Duration) -> bool {
        let Some(timestamp) = self.timestamp().and_then(parse_timestamp) else {
            return false;
        };
        (timestamp - now).num_milliseconds().abs() < max_drift.num_milliseconds()
    }

    /// Validates timestamp and signature against the current time with the default drift.
    pub fn validate(&self, keys: &ApplicationKeys) -> bool {
        self.validate_at(keys, Utc::now(), Duration::minutes(MAX_ALLOWED_DRIFT_MINUTES))
    }

    /// Validates against `now`. Every field must be present, the timestamp within
    /// `max_drift`, and the signature must verify.
    pub fn validate_at(&self, keys: &ApplicationKeys, now: DateTime<Utc>, max_drift: Duration) -> bool {
        let CompactToken::Parts { nonce, timestamp, signature } = self else {
            return false;
        };
        if nonce.is_empty() || timestamp.is_empty() || signature.is_empty() {
            return false;
        }

        if !self.has_valid_timestamp_at(now, max_drift) {
            return false;
        }

        keys.validate_signature(signing_input(nonce, timestamp).as_bytes(), signature)
    }
}

impl FromStr for CompactToken {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(CompactToken::parse(s))
    }
}

impl fmt::Display for CompactToken {
    /// Wire form. [CompactToken::Invalid] renders as an empty string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompactToken::Parts { nonce, timestamp, signature } => {
                write!(f, "{nonce}.{timestamp}.{}", STANDARD.encode(signature))
            }
            CompactToken::Invalid => Ok(()),
        }
    }
}

fn signing_input(nonce: &str, timestamp: &str) -> String {
    format!("{nonce}.{timestamp}")
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if raw.len() != TIMESTAMP_LEN || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}
