use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use super::{guarded, read_route};

/// Client Router
///
/// Client records are personal data; both list and detail reads require
/// `get:all` unless the service runs with open reads.
pub fn client_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // GET /api/clients?page=N
        .route(
            "/api/clients",
            read_route(state, "get:all", get(handlers::list_clients)),
        )
        // POST /api/clients
        .route(
            "/api/clients",
            guarded(state, "create:client", post(handlers::create_client)),
        )
        // GET /api/clients/{id}
        .route(
            "/api/clients/{id}",
            read_route(state, "get:all", get(handlers::get_client)),
        )
        // PATCH /api/clients/{id}
        .route(
            "/api/clients/{id}",
            guarded(state, "update:client", patch(handlers::update_client)),
        )
        // DELETE /api/clients/{id}
        .route(
            "/api/clients/{id}",
            guarded(state, "delete:client", delete(handlers::delete_client)),
        )
}
