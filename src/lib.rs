#![warn(missing_docs)]
//!
//! This crate implements a mutual token handshake between a trusted identity issuer and a partner application.
//!
//! 1. The issuer sends the partner a signed JWT (RS256) carrying a fresh nonce and the customer context id.
//! 2. The partner checks the JWT against the issuer certificate and answers with a compact token
//!    `nonce.yyyyMMddHHmm.base64(signature)`, signed with the private half of the key it registered with the issuer.
//! 3. The issuer checks the compact token against the registered public key and the nonce it handed out.
//!
//! Keys are exchanged as JSON Web Keys. Issuer certificates are looked up through a [CertificateStore].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mirroring_auth::{
//!     ApplicationKeys, DirectoryCertificateStore, HandshakeConfig, TokenGenerator, TokenValidator,
//! };
//!
//! # fn main() -> mirroring_auth::Result<()> {
//! let config = HandshakeConfig::default();
//!
//! // Issuer side: sign with the private certificate.
//! let signing_store = DirectoryCertificateStore::single("/etc/issuer", "Issuer AS", "issuer.private.jwk");
//! let generator = TokenGenerator::new(config.clone(), Arc::new(signing_store));
//! let (issuer_token, nonce) = generator.create_signed_issuer_token("Cust12020", "APP123")?;
//!
//! // Partner side: verify with the public certificate, then answer.
//! let verify_store = DirectoryCertificateStore::single("/etc/partner", "Issuer AS", "issuer.public.jwk");
//! let partner = TokenValidator::new(config.clone(), Arc::new(verify_store));
//! let validation = partner.validate_issuer_token(&issuer_token)?;
//! let partner_private_jwk = std::fs::read_to_string("/etc/partner/partner.private.jwk").unwrap();
//! let answer = TokenGenerator::create_signed_application_token(&validation.claims.nonce, &partner_private_jwk)?;
//!
//! // Back on the issuer side.
//! let registered = ApplicationKeys::new(std::fs::read_to_string("/etc/issuer/partners/APP123.jwk").unwrap())?;
//! let issuer = TokenValidator::new(config, Arc::new(mirroring_auth::MemoryCertificateStore::new()));
//! assert!(issuer.validate_partner_token(&registered, &answer, nonce.as_str()));
//! # Ok(())
//! # }
//! ```
//!
pub mod certificate;
pub mod claims;
pub mod compact;
pub mod config;
pub mod error;
pub mod generator;
pub mod keys;
pub mod nonce;
pub mod validator;

pub use certificate::{CertificateStore, DirectoryCertificateStore, IssuerCertificate, MemoryCertificateStore};
pub use claims::IssuerClaims;
pub use compact::CompactToken;
pub use config::{CertificateStoreConfig, HandshakeConfig};
pub use error::{AuthError, Result};
pub use generator::TokenGenerator;
pub use keys::ApplicationKeys;
pub use nonce::Nonce;
pub use validator::{IssuerTokenValidation, TokenValidator};
