use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, Method, header},
    routing::get,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod jwks;
pub mod models;
pub mod repository;
pub mod validation;

// One router per entity, each gating its own methods.
pub mod routes;
use routes::{appointments, artists, clients};

// --- Public Re-exports ---

pub use auth::{TokenVerifier, VerifierState};
pub use config::AppConfig;
pub use error::{ApiError, AuthError};
pub use jwks::{CachedKeySet, KeySetProvider, KeySetState, RemoteKeySet, StaticKeySet};
pub use repository::{InMemoryRepository, PostgresRepository, Repository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every route, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::list_artists, handlers::get_artist, handlers::create_artist,
        handlers::update_artist, handlers::delete_artist,
        handlers::list_clients, handlers::get_client, handlers::create_client,
        handlers::update_client, handlers::delete_client,
        handlers::get_appointment, handlers::create_appointment,
        handlers::update_appointment, handlers::delete_appointment,
    ),
    components(
        schemas(
            models::Artist, models::Client, models::Appointment,
            models::NewArtist, models::ArtistChanges, models::NewClient, models::ClientChanges,
            models::NewAppointment, models::AppointmentChanges,
            models::ArtistListResponse, models::ArtistResponse, models::DeletedArtistResponse,
            models::ClientListResponse, models::ClientResponse, models::DeletedClientResponse,
            models::AppointmentResponse, models::DeletedAppointmentResponse,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "tattoo-shop", description = "Tattoo shop booking API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Shared by every request: persistence, token verification and the loaded
/// configuration. Cheap to clone; all services sit behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: Postgres in deployment, in-memory locally and in tests.
    pub repo: RepositoryState,
    /// Verifies bearer tokens against the identity provider's key set.
    pub verifier: VerifierState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for VerifierState {
    fn from_ref(app_state: &AppState) -> VerifierState {
        app_state.verifier.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles all routes, wraps them in the observability stack and CORS, and
/// binds the shared state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS: any origin, but only the methods and headers the API uses.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Routes. Permission gates are attached per method inside each module.
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health))
        .merge(artists::artist_routes(&state))
        .merge(clients::client_routes(&state))
        .merge(appointments::appointment_routes(&state))
        .with_state(state);

    // 3. Observability: request id → tracing span → id echoed on the response.
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span, tagged with method, URI and `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
