mod common;

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use common::*;
use jsonwebtoken::jwk::JwkSet;
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tattoo_shop::{
    AppConfig, ApiError, AuthError, CachedKeySet, KeySetProvider, StaticKeySet, TokenVerifier,
    auth::{AuthPayload, check_permissions, extract_bearer_token},
    jwks::UnavailableKeySet,
};

fn headers_with(value: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
    headers
}

fn verifier() -> Arc<TokenVerifier> {
    test_verifier(&AppConfig::default())
}

// --- Header Extraction ---

#[test]
fn test_extract_bearer_token_accepts_any_case_scheme() {
    assert_eq!(extract_bearer_token(&headers_with("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
    assert_eq!(extract_bearer_token(&headers_with("bearer abc")), Ok("abc"));
    assert_eq!(extract_bearer_token(&headers_with("BEARER abc")), Ok("abc"));
}

#[test]
fn test_extract_bearer_token_missing_header() {
    assert_eq!(extract_bearer_token(&HeaderMap::new()), Err(AuthError::MissingHeader));
    assert_eq!(extract_bearer_token(&headers_with("")), Err(AuthError::MissingHeader));
}

#[test]
fn test_extract_bearer_token_malformed_header() {
    for value in ["Basic abc", "Bearer", "abc", "Bearer a b", "Token abc"] {
        assert_eq!(
            extract_bearer_token(&headers_with(value)),
            Err(AuthError::MalformedHeader),
            "header value: {value:?}"
        );
    }
}

// --- Token Verification ---

#[tokio::test]
async fn test_verify_valid_token_returns_payload() {
    let token = token_with(&["create:artist", "get:all"]);

    let payload = verifier().verify(&token).await.expect("token should verify");

    assert_eq!(payload.sub.as_deref(), Some("auth0|tester"));
    assert_eq!(
        payload.permissions,
        Some(vec!["create:artist".to_string(), "get:all".to_string()])
    );
    // Unrecognized claims are carried through untouched.
    assert!(payload.claims.contains_key("iat"));
}

#[tokio::test]
async fn test_verify_token_without_kid_is_invalid_header() {
    let token = sign_with(&valid_claims(&[]), TEST_RSA_PEM, None);
    assert_eq!(verifier().verify(&token).await.unwrap_err(), AuthError::InvalidHeader);
}

#[tokio::test]
async fn test_verify_unknown_kid_is_key_not_found() {
    let token = sign_with(&valid_claims(&[]), TEST_RSA_PEM, Some("rotated-away"));
    assert_eq!(verifier().verify(&token).await.unwrap_err(), AuthError::KeyNotFound);
}

#[tokio::test]
async fn test_verify_expired_token() {
    let mut claims = valid_claims(&["get:all"]);
    claims["exp"] = (now_secs() - 3600).into();

    assert_eq!(verifier().verify(&sign(&claims)).await.unwrap_err(), AuthError::TokenExpired);
}

#[tokio::test]
async fn test_verify_recently_expired_token_gets_no_grace() {
    let mut claims = valid_claims(&["get:all"]);
    claims["exp"] = (now_secs() - 30).into();

    assert_eq!(verifier().verify(&sign(&claims)).await.unwrap_err(), AuthError::TokenExpired);
}

#[tokio::test]
async fn test_verify_wrong_audience_or_issuer_is_invalid_claims() {
    let mut wrong_aud = valid_claims(&[]);
    wrong_aud["aud"] = "someone-elses-api".into();
    assert_eq!(verifier().verify(&sign(&wrong_aud)).await.unwrap_err(), AuthError::InvalidClaims);

    let mut wrong_iss = valid_claims(&[]);
    wrong_iss["iss"] = "https://impostor.example.com/".into();
    assert_eq!(verifier().verify(&sign(&wrong_iss)).await.unwrap_err(), AuthError::InvalidClaims);

    let mut no_aud = valid_claims(&[]);
    no_aud.as_object_mut().unwrap().remove("aud");
    assert_eq!(verifier().verify(&sign(&no_aud)).await.unwrap_err(), AuthError::InvalidClaims);
}

#[tokio::test]
async fn test_verify_signature_from_other_key_is_malformed() {
    let token = sign_with(&valid_claims(&["get:all"]), OTHER_RSA_PEM, Some(TEST_KID));
    assert_eq!(verifier().verify(&token).await.unwrap_err(), AuthError::MalformedToken);
}

#[tokio::test]
async fn test_verify_garbage_is_malformed() {
    for token in ["not-a-token", "a.b.c", ""] {
        assert_eq!(
            verifier().verify(token).await.unwrap_err(),
            AuthError::MalformedToken,
            "token: {token:?}"
        );
    }
}

#[tokio::test]
async fn test_verify_without_key_set_is_unavailable() {
    let config = AppConfig::default();
    let verifier = TokenVerifier::from_config(&config, Arc::new(UnavailableKeySet));

    let err = verifier.verify(&token_with(&["get:all"])).await.unwrap_err();
    assert_eq!(err, AuthError::KeySetUnavailable);
    assert_eq!(ApiError::from(err).status(), StatusCode::UNAUTHORIZED);
}

// --- Key Set Caching ---

struct CountingKeySet {
    calls: Arc<AtomicUsize>,
    inner: StaticKeySet,
}

#[async_trait]
impl KeySetProvider for CountingKeySet {
    async fn fetch_key_set(&self) -> Result<JwkSet, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_key_set().await
    }
}

#[tokio::test]
async fn test_cached_key_set_reuses_answer_within_ttl() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counting = CountingKeySet {
        calls: calls.clone(),
        inner: StaticKeySet::from_json(TEST_JWKS).unwrap(),
    };
    let config = AppConfig::default();
    let verifier = TokenVerifier::from_config(
        &config,
        Arc::new(CachedKeySet::new(counting, Duration::from_secs(300))),
    );

    let token = token_with(&["get:all"]);
    verifier.verify(&token).await.unwrap();
    verifier.verify(&token).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cached_key_set_with_zero_ttl_always_refetches() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counting = CountingKeySet {
        calls: calls.clone(),
        inner: StaticKeySet::from_json(TEST_JWKS).unwrap(),
    };
    let cached = CachedKeySet::new(counting, Duration::ZERO);

    cached.fetch_key_set().await.unwrap();
    cached.fetch_key_set().await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cached_key_set_does_not_cache_failures() {
    let cached = CachedKeySet::new(UnavailableKeySet, Duration::from_secs(300));
    assert_eq!(cached.fetch_key_set().await.unwrap_err(), AuthError::KeySetUnavailable);
    assert_eq!(cached.fetch_key_set().await.unwrap_err(), AuthError::KeySetUnavailable);
}

// --- Permission Check ---

fn payload_with(permissions: Option<Vec<&str>>) -> AuthPayload {
    AuthPayload {
        permissions: permissions.map(|p| p.into_iter().map(str::to_string).collect()),
        ..AuthPayload::default()
    }
}

#[test]
fn test_check_permissions_membership() {
    let payload = payload_with(Some(vec!["create:artist", "get:all"]));

    assert!(check_permissions(&payload, "create:artist").is_ok());
    assert!(check_permissions(&payload, "get:all").is_ok());

    let err = check_permissions(&payload, "delete:artist").unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(ref p) if p == "delete:artist"));
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[test]
fn test_check_permissions_without_claim() {
    let payload = payload_with(None);

    assert!(matches!(
        check_permissions(&payload, "get:all"),
        Err(ApiError::Unauthorized(_))
    ));
    // The open policy needs no claim at all.
    assert!(check_permissions(&payload, "").is_ok());
}

#[test]
fn test_check_permissions_every_scope() {
    let payload = payload_with(Some(ALL_PERMISSIONS.to_vec()));
    for permission in ALL_PERMISSIONS {
        assert!(check_permissions(&payload, permission).is_ok(), "{permission}");
    }
    assert!(check_permissions(&payload_with(Some(vec![])), "get:all").is_err());
}
