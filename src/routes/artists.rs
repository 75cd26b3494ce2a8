use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use super::guarded;

/// Artist Router
///
/// Reads are always open: the artist roster is the shop's public face.
pub fn artist_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // GET /api/artists
        .route("/api/artists", get(handlers::list_artists))
        // POST /api/artists
        .route(
            "/api/artists",
            guarded(state, "create:artist", post(handlers::create_artist)),
        )
        // GET /api/artists/{id}
        .route("/api/artists/{id}", get(handlers::get_artist))
        // PATCH /api/artists/{id}
        .route(
            "/api/artists/{id}",
            guarded(state, "update:artist", patch(handlers::update_artist)),
        )
        // DELETE /api/artists/{id}
        .route(
            "/api/artists/{id}",
            guarded(state, "delete:artist", delete(handlers::delete_artist)),
        )
}
