use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use super::{guarded, read_route};

/// Appointment Router
pub fn appointment_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // POST /api/appointments
        // Referenced artist/client ids are checked before insert.
        .route(
            "/api/appointments",
            guarded(
                state,
                "create:appointment",
                post(handlers::create_appointment),
            ),
        )
        // GET /api/appointments/{id}
        .route(
            "/api/appointments/{id}",
            read_route(state, "get:appointment", get(handlers::get_appointment)),
        )
        // PATCH /api/appointments/{id}
        .route(
            "/api/appointments/{id}",
            guarded(
                state,
                "update:appointment",
                patch(handlers::update_appointment),
            ),
        )
        // DELETE /api/appointments/{id}
        // Responds with the number of appointments still ahead.
        .route(
            "/api/appointments/{id}",
            guarded(
                state,
                "delete:appointment",
                delete(handlers::delete_appointment),
            ),
        )
}
