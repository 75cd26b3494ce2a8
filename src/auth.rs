use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::{config::AppConfig, error::{ApiError, AuthError}, jwks::KeySetState};

/// AuthPayload
///
/// The decoded claim set of a verified bearer token. Only `permissions` is
/// interpreted; every other claim is kept as-is in `claims`. Lives for one
/// request: produced by the verifier, checked by the gate, then stored in the
/// request extensions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthPayload {
    /// Subject: the identity provider's user id.
    #[serde(default)]
    pub sub: Option<String>,
    /// Permission scopes granted to the caller, e.g. `create:artist`.
    /// `None` when the token carries no `permissions` claim at all.
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

/// extract_bearer_token
///
/// Pulls the raw token out of `Authorization: Bearer <token>`. The header must
/// split into exactly two space-separated parts, the first of which is
/// `bearer` in any case.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    if value.is_empty() {
        return Err(AuthError::MissingHeader);
    }

    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthError::MalformedHeader),
    }
}

/// TokenVerifier
///
/// Verifies bearer tokens against the issuer's published key set: signature,
/// expiry, audience and issuer. The key set is requested from the provider on
/// every verification; caching, if any, is the provider's business.
pub struct TokenVerifier {
    keys: KeySetState,
    issuer: String,
    audience: String,
    algorithms: Vec<Algorithm>,
}

/// VerifierState
///
/// Shared verifier handle stored in the application state.
pub type VerifierState = Arc<TokenVerifier>;

impl TokenVerifier {
    pub fn new(
        keys: KeySetState,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        algorithms: Vec<Algorithm>,
    ) -> Self {
        Self {
            keys,
            issuer: issuer.into(),
            audience: audience.into(),
            algorithms,
        }
    }

    pub fn from_config(config: &AppConfig, keys: KeySetState) -> Self {
        Self::new(
            keys,
            config.issuer(),
            config.api_audience.clone(),
            config.algorithms.clone(),
        )
    }

    /// verify
    ///
    /// Turns a raw token into an `AuthPayload`, classifying every failure:
    /// no `kid` in the header is `InvalidHeader`, an unknown `kid` is
    /// `KeyNotFound`, a passed `exp` is `TokenExpired`, a wrong `aud`/`iss` is
    /// `InvalidClaims`, anything else is `MalformedToken`.
    pub async fn verify(&self, token: &str) -> Result<AuthPayload, AuthError> {
        let header = decode_header(token).map_err(|e| {
            tracing::debug!("undecodable token header: {}", e);
            AuthError::MalformedToken
        })?;
        let kid = header.kid.ok_or(AuthError::InvalidHeader)?;

        let key_set = self.keys.fetch_key_set().await?;
        let jwk = key_set.find(&kid).ok_or_else(|| {
            tracing::debug!("no published key matches kid '{}'", kid);
            AuthError::KeyNotFound
        })?;
        let key = DecodingKey::from_jwk(jwk).map_err(|e| {
            tracing::warn!("published key '{}' is unusable: {}", kid, e);
            AuthError::MalformedToken
        })?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.algorithms = self.algorithms.clone();
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);
        // Expired means expired: no grace period on `exp` or `nbf`.
        validation.leeway = 0;

        decode::<AuthPayload>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidAudience
                | ErrorKind::InvalidIssuer
                | ErrorKind::ImmatureSignature
                | ErrorKind::MissingRequiredClaim(_) => AuthError::InvalidClaims,
                other => {
                    tracing::debug!("token rejected: {:?}", other);
                    AuthError::MalformedToken
                }
            })
    }
}

/// check_permissions
///
/// Succeeds iff `required` is empty or is one of the payload's permissions.
/// An empty requirement is the open policy and passes even when the token
/// carries no permissions claim.
pub fn check_permissions(payload: &AuthPayload, required: &str) -> Result<(), ApiError> {
    if required.is_empty() {
        return Ok(());
    }

    let granted = payload
        .permissions
        .as_ref()
        .ok_or_else(|| ApiError::Unauthorized(required.to_string()))?;

    if granted.iter().any(|permission| permission == required) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized(required.to_string()))
    }
}

/// PermissionGate
///
/// State for one guarded route: the shared verifier plus the permission that
/// route requires.
#[derive(Clone)]
pub struct PermissionGate {
    verifier: VerifierState,
    permission: &'static str,
}

impl PermissionGate {
    pub fn new(verifier: VerifierState, permission: &'static str) -> Self {
        Self {
            verifier,
            permission,
        }
    }
}

/// permission_gate
///
/// Middleware wrapped around individual handlers:
/// extract token → verify → check permission → run the handler.
/// The verified `AuthPayload` is placed in the request extensions. Any
/// failure returns before the handler is reached.
pub async fn permission_gate(
    State(gate): State<PermissionGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?.to_owned();
    let payload = gate.verifier.verify(&token).await?;
    check_permissions(&payload, gate.permission)?;

    tracing::debug!(
        sub = payload.sub.as_deref().unwrap_or("unknown"),
        permission = gate.permission,
        "permission granted"
    );

    request.extensions_mut().insert(payload);
    Ok(next.run(request).await)
}
