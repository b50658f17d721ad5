use std::{path::PathBuf, sync::Arc};

use chrono::{Duration, Utc};
use mirroring_auth::{
    ApplicationKeys, AuthError, CertificateStoreConfig, CompactToken, DirectoryCertificateStore, HandshakeConfig,
    TokenGenerator, TokenValidator,
};

fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixtures().join(name)).unwrap()
}

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn store(file: &str) -> Arc<DirectoryCertificateStore> {
    Arc::new(DirectoryCertificateStore::single(fixtures(), "Issuer AS", file))
}

fn issuer_generator() -> TokenGenerator {
    TokenGenerator::new(HandshakeConfig::default(), store("issuer.private.jwk"))
}

fn validator() -> TokenValidator {
    TokenValidator::new(HandshakeConfig::default(), store("issuer.public.jwk"))
}

#[test]
fn full_handshake() {
    let (issuer_token, nonce) = issuer_generator().create_signed_issuer_token("Cust12020", "APP123").unwrap();

    // Partner verifies the issuer and echoes the nonce.
    let validation = validator().validate_issuer_token(&issuer_token).unwrap();
    assert_eq!(validation.claims.aud, "spn:APP123");
    assert_eq!(validation.claims.iss, "Issuer AS");
    assert_eq!(validation.claims.nonce, nonce.as_str());

    let answer =
        TokenGenerator::create_signed_application_token(&validation.claims.nonce, &fixture("partner.private.jwk"))
            .unwrap();

    // Issuer checks the answer against the registered key.
    let registered = ApplicationKeys::new(fixture("partner.public.jwk")).unwrap();
    assert!(validator().validate_partner_token(&registered, &answer, nonce.as_str()));
}

#[test]
fn answer_from_unregistered_key() {
    let (_, nonce) = issuer_generator().create_signed_issuer_token("Cust12020", "APP123").unwrap();
    let answer = TokenGenerator::create_signed_application_token(nonce.as_str(), &fixture("stranger.private.jwk"))
        .unwrap();

    let registered = ApplicationKeys::new(fixture("partner.public.jwk")).unwrap();
    assert!(!validator().validate_partner_token(&registered, &answer, nonce.as_str()));
}

#[test]
fn answer_to_another_handshake() {
    let generator = issuer_generator();
    let (_, first) = generator.create_signed_issuer_token("Cust12020", "APP123").unwrap();
    let (_, second) = generator.create_signed_issuer_token("Cust12020", "APP123").unwrap();

    let answer =
        TokenGenerator::create_signed_application_token(first.as_str(), &fixture("partner.private.jwk")).unwrap();
    let registered = ApplicationKeys::new(fixture("partner.public.jwk")).unwrap();

    assert!(validator().validate_partner_token(&registered, &answer, first.as_str()));
    assert!(!validator().validate_partner_token(&registered, &answer, second.as_str()));
}

#[test]
fn issuer_token_expires() {
    let generator = issuer_generator();

    let (fresh, nonce) = generator.create_signed_issuer_token("Cust12020", "APP123").unwrap();
    let validation = validator().validate_issuer_token(&fresh).unwrap();
    assert_eq!(validation.claims.nonce, nonce.as_str());

    // Issued long enough ago that iat + 5 minutes has passed.
    let (stale, _) = generator
        .create_signed_issuer_token_at("Cust12020", "APP123", Utc::now() - Duration::minutes(6))
        .unwrap();
    assert!(matches!(validator().validate_issuer_token(&stale), Err(AuthError::TokenValidation(_))));
}

#[test]
fn compact_token_drift_window() {
    let signed = Utc::now();
    let nonce = "0123456789ABCDEF0123456789ABCDEF";
    let token =
        TokenGenerator::create_signed_application_token_at(nonce, &fixture("partner.private.jwk"), signed).unwrap();
    let registered = ApplicationKeys::new(fixture("partner.public.jwk")).unwrap();
    let validator = validator();

    assert!(validator.validate_partner_token_at(&registered, &token, nonce, signed + Duration::minutes(10)));
    assert!(!validator.validate_partner_token_at(&registered, &token, nonce, signed + Duration::minutes(16)));

    let parsed = CompactToken::parse(&token);
    assert!(parsed.validate_at(&registered, signed - Duration::minutes(14), Duration::minutes(15)));
    assert!(!parsed.validate_at(&registered, signed - Duration::minutes(16), Duration::minutes(15)));
}

#[test]
fn issuer_token_signed_by_wrong_certificate() {
    let config = CertificateStoreConfig::from_json_str(&format!(
        r#"{{ "directory": {:?}, "certificates": {{ "Issuer AS": "stranger.private.jwk" }} }}"#,
        fixtures().display().to_string()
    ))
    .unwrap();
    let impostor = TokenGenerator::new(HandshakeConfig::default(), Arc::new(DirectoryCertificateStore::new(config)));
    let (token, _) = impostor.create_signed_issuer_token("Cust12020", "APP123").unwrap();

    // The impostor's kid differs from the registered certificate.
    assert!(matches!(validator().validate_issuer_token(&token), Err(AuthError::KidMismatch(_, _))));
}

#[test]
fn config_file_round_trip() {
    let path = std::env::temp_dir().join(format!("mirroring-auth-config-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "issuer": "Issuer AS", "max_drift_minutes": 10, "leeway_secs": 30 }"#).unwrap();

    let config = HandshakeConfig::from_json_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.max_drift_minutes, 10);
    assert_eq!(config.leeway_secs, 30);
    assert_eq!(config.token_lifetime_secs, 300);

    let missing = HandshakeConfig::from_json_file(fixtures().join("absent.json"));
    assert!(matches!(missing, Err(AuthError::Config(_))));
}
