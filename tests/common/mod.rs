//! Shared fixtures: an RSA signing key whose public half is published by a
//! static key set, plus helpers for building tokens and application state.
#![allow(dead_code)]

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tattoo_shop::{
    AppConfig, AppState, InMemoryRepository, StaticKeySet, TokenVerifier,
    jwks::KeySetState,
    repository::RepositoryState,
};

pub const TEST_KID: &str = "test-key-1";
pub const TEST_JWKS: &str = include_str!("../fixtures/test_jwks.json");
pub const TEST_RSA_PEM: &str = include_str!("../fixtures/test_rsa.pem");
pub const OTHER_RSA_PEM: &str = include_str!("../fixtures/other_rsa.pem");

pub const ALL_PERMISSIONS: [&str; 11] = [
    "get:all",
    "get:appointment",
    "create:artist",
    "update:artist",
    "delete:artist",
    "create:client",
    "update:client",
    "delete:client",
    "create:appointment",
    "update:appointment",
    "delete:appointment",
];

pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// Claims accepted by a verifier built from `AppConfig::default()`.
pub fn valid_claims(permissions: &[&str]) -> Value {
    let config = AppConfig::default();
    json!({
        "sub": "auth0|tester",
        "iss": config.issuer(),
        "aud": config.api_audience,
        "iat": now_secs(),
        "exp": now_secs() + 3600,
        "permissions": permissions,
    })
}

pub fn sign_with(claims: &Value, pem: &str, kid: Option<&str>) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

pub fn sign(claims: &Value) -> String {
    sign_with(claims, TEST_RSA_PEM, Some(TEST_KID))
}

/// A valid token granting exactly `permissions`.
pub fn token_with(permissions: &[&str]) -> String {
    sign(&valid_claims(permissions))
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub fn test_keys() -> KeySetState {
    Arc::new(StaticKeySet::from_json(TEST_JWKS).unwrap())
}

pub fn test_verifier(config: &AppConfig) -> Arc<TokenVerifier> {
    Arc::new(TokenVerifier::from_config(config, test_keys()))
}

pub fn create_test_state(repo: RepositoryState, config: AppConfig) -> AppState {
    AppState {
        verifier: test_verifier(&config),
        repo,
        config,
    }
}

pub fn in_memory_state() -> AppState {
    create_test_state(Arc::new(InMemoryRepository::new()), AppConfig::default())
}
