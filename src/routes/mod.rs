/// Router Module Index
///
/// One module per entity. Every write route, and every read route the
/// configuration asks to protect, is wrapped individually in the permission
/// gate, so a single path can mix open and guarded methods.
use axum::{middleware, routing::MethodRouter};

use crate::{
    AppState,
    auth::{PermissionGate, permission_gate},
};

/// /api/appointments/*
pub mod appointments;

/// /api/artists/*
pub mod artists;

/// /api/clients/*
pub mod clients;

/// guarded
///
/// Wraps one method route in the gate for `permission`:
/// verify token → check permission → call handler.
pub fn guarded(
    state: &AppState,
    permission: &'static str,
    route: MethodRouter<AppState>,
) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn_with_state(
        PermissionGate::new(state.verifier.clone(), permission),
        permission_gate,
    ))
}

/// read_route
///
/// A GET route: gated when `require_auth_for_reads` is set, open otherwise.
pub fn read_route(
    state: &AppState,
    permission: &'static str,
    route: MethodRouter<AppState>,
) -> MethodRouter<AppState> {
    if state.config.require_auth_for_reads {
        guarded(state, permission, route)
    } else {
        route
    }
}
