use crate::{
    AppState,
    error::{ApiError, ErrorResponse},
    models::{
        Appointment, AppointmentChanges, AppointmentResponse, ArtistChanges, ArtistListResponse,
        ArtistResponse, ClientChanges, ClientListResponse, ClientResponse,
        DeletedAppointmentResponse, DeletedArtistResponse, DeletedClientResponse, NewAppointment,
        NewArtist, NewClient,
    },
    validation::{self, FieldMap},
};
use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request, State},
    http::request::Parts,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::num::IntErrorKind;

/// Page size of GET /api/clients.
pub const CLIENTS_PER_PAGE: usize = 10;

// --- Extractors & Query Structs ---

/// JsonBody
///
/// The raw JSON object of a request body, handed to the validators untyped.
/// An empty body reads as `{}`; anything that is not a JSON object is a 400.
#[derive(Debug, Clone, Default)]
pub struct JsonBody(pub FieldMap);

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(request, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonBody(FieldMap::new()));
        }

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(JsonBody(map)),
            Ok(_) => Err(ApiError::BadRequest(
                "Request body must be a JSON object".to_string(),
            )),
            Err(e) => Err(ApiError::BadRequest(format!("Malformed JSON body: {}", e))),
        }
    }
}

/// EntityId
///
/// The `{id}` path segment. A segment that is not an `i32` is a 400 in the
/// usual failure envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityId(pub i32);

impl<S> FromRequestParts<S> for EntityId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i32>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(EntityId(id))
    }
}

/// Pagination
///
/// `?page=N`, 1-indexed. A value that is not an integer falls back to page 1.
/// Integers too large for `i64` saturate, so they still land past the data.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct Pagination {
    pub page: Option<String>,
}

impl Pagination {
    pub fn page(&self) -> i64 {
        let Some(raw) = self.page.as_deref() else {
            return 1;
        };
        match raw.trim().parse::<i64>() {
            Ok(page) => page,
            Err(e) => match e.kind() {
                IntErrorKind::PosOverflow => i64::MAX,
                IntErrorKind::NegOverflow => i64::MIN,
                _ => 1,
            },
        }
    }
}

/// paginate
///
/// Returns the `page`-th window of `CLIENTS_PER_PAGE` items in stored order.
/// Pages below 1 or past the end yield an empty window.
pub fn paginate<T>(items: Vec<T>, page: i64) -> Vec<T> {
    if page < 1 {
        return Vec::new();
    }
    let start = usize::try_from(page - 1)
        .unwrap_or(usize::MAX)
        .saturating_mul(CLIENTS_PER_PAGE);
    items.into_iter().skip(start).take(CLIENTS_PER_PAGE).collect()
}

// --- Artist Handlers ---

/// list_artists
///
/// [Open Route] Every artist, with the total count.
#[utoipa::path(
    get,
    path = "/api/artists",
    responses((status = 200, description = "All artists", body = ArtistListResponse))
)]
pub async fn list_artists(State(state): State<AppState>) -> Result<Json<ArtistListResponse>, ApiError> {
    let artists = state.repo.list_artists().await?;
    let total_artists = artists.len() as i64;
    Ok(Json(ArtistListResponse {
        success: true,
        artists,
        total_artists,
    }))
}

/// get_artist
///
/// [Open Route] A single artist by id.
#[utoipa::path(
    get,
    path = "/api/artists/{id}",
    params(("id" = i32, Path, description = "Artist ID")),
    responses(
        (status = 200, description = "Found", body = ArtistResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn get_artist(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<ArtistResponse>, ApiError> {
    let artist = state.repo.get_artist(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(ArtistResponse {
        success: true,
        artist,
        total_artists: None,
    }))
}

/// create_artist
///
/// [`create:artist`] Validates and inserts a new artist. A duplicate name is
/// rejected by the store and surfaces as 422.
#[utoipa::path(
    post,
    path = "/api/artists",
    request_body = NewArtist,
    responses(
        (status = 200, description = "Created", body = ArtistResponse),
        (status = 401, description = "Missing or insufficient token", body = ErrorResponse),
        (status = 422, description = "Invalid payload or duplicate name", body = ErrorResponse)
    )
)]
pub async fn create_artist(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<ArtistResponse>, ApiError> {
    let new_artist = validation::validate_new_artist(&body)?;
    let artist = state.repo.create_artist(new_artist).await?;
    let total_artists = state.repo.count_artists().await?;

    tracing::info!("artist {} created ({})", artist.id, artist.name);

    Ok(Json(ArtistResponse {
        success: true,
        artist,
        total_artists: Some(total_artists),
    }))
}

/// update_artist
///
/// [`update:artist`] Partial update: fields absent from the body keep their
/// stored value.
#[utoipa::path(
    patch,
    path = "/api/artists/{id}",
    params(("id" = i32, Path, description = "Artist ID")),
    request_body = ArtistChanges,
    responses(
        (status = 200, description = "Updated", body = ArtistResponse),
        (status = 404, description = "Not Found", body = ErrorResponse),
        (status = 422, description = "Invalid payload", body = ErrorResponse)
    )
)]
pub async fn update_artist(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    JsonBody(body): JsonBody,
) -> Result<Json<ArtistResponse>, ApiError> {
    let mut artist = state.repo.get_artist(id).await?.ok_or(ApiError::NotFound)?;
    validation::validate_artist_changes(&body)?.apply(&mut artist);

    let artist = state.repo.update_artist(artist).await?;
    tracing::info!("artist {} updated", artist.id);

    Ok(Json(ArtistResponse {
        success: true,
        artist,
        total_artists: None,
    }))
}

/// delete_artist
///
/// [`delete:artist`] Removes an artist. Appointments that referenced it keep
/// existing with the reference cleared.
#[utoipa::path(
    delete,
    path = "/api/artists/{id}",
    params(("id" = i32, Path, description = "Artist ID")),
    responses(
        (status = 200, description = "Deleted", body = DeletedArtistResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn delete_artist(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<DeletedArtistResponse>, ApiError> {
    if !state.repo.delete_artist(id).await? {
        return Err(ApiError::NotFound);
    }
    let total_artists = state.repo.count_artists().await?;
    tracing::info!("artist {} deleted", id);

    Ok(Json(DeletedArtistResponse {
        success: true,
        deleted_artist_id: id,
        total_artists,
    }))
}

// --- Client Handlers ---

/// list_clients
///
/// [`get:all`] One page of clients in stored order. An empty page, including
/// the first page of an empty table, is a 404 rather than an empty list.
#[utoipa::path(
    get,
    path = "/api/clients",
    params(Pagination),
    responses(
        (status = 200, description = "Page of clients", body = ClientListResponse),
        (status = 404, description = "Page out of range", body = ErrorResponse)
    )
)]
pub async fn list_clients(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<ClientListResponse>, ApiError> {
    let clients = state.repo.list_clients().await?;
    let total_clients = clients.len() as i64;

    let page = paginate(clients, pagination.page());
    if page.is_empty() {
        return Err(ApiError::NotFound);
    }

    Ok(Json(ClientListResponse {
        success: true,
        clients: page,
        total_clients,
    }))
}

#[utoipa::path(
    get,
    path = "/api/clients/{id}",
    params(("id" = i32, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Found", body = ClientResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn get_client(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<ClientResponse>, ApiError> {
    let client = state.repo.get_client(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(ClientResponse {
        success: true,
        client,
        total_clients: None,
    }))
}

#[utoipa::path(
    post,
    path = "/api/clients",
    request_body = NewClient,
    responses(
        (status = 200, description = "Created", body = ClientResponse),
        (status = 422, description = "Invalid payload", body = ErrorResponse)
    )
)]
pub async fn create_client(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<ClientResponse>, ApiError> {
    let new_client = validation::validate_new_client(&body)?;
    let client = state.repo.create_client(new_client).await?;
    let total_clients = state.repo.count_clients().await?;

    tracing::info!("client {} created", client.id);

    Ok(Json(ClientResponse {
        success: true,
        client,
        total_clients: Some(total_clients),
    }))
}

#[utoipa::path(
    patch,
    path = "/api/clients/{id}",
    params(("id" = i32, Path, description = "Client ID")),
    request_body = ClientChanges,
    responses(
        (status = 200, description = "Updated", body = ClientResponse),
        (status = 404, description = "Not Found", body = ErrorResponse),
        (status = 422, description = "Invalid payload", body = ErrorResponse)
    )
)]
pub async fn update_client(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    JsonBody(body): JsonBody,
) -> Result<Json<ClientResponse>, ApiError> {
    let mut client = state.repo.get_client(id).await?.ok_or(ApiError::NotFound)?;
    validation::validate_client_changes(&body)?.apply(&mut client);

    let client = state.repo.update_client(client).await?;
    tracing::info!("client {} updated", client.id);

    Ok(Json(ClientResponse {
        success: true,
        client,
        total_clients: None,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/clients/{id}",
    params(("id" = i32, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Deleted", body = DeletedClientResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn delete_client(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<DeletedClientResponse>, ApiError> {
    if !state.repo.delete_client(id).await? {
        return Err(ApiError::NotFound);
    }
    let total_clients = state.repo.count_clients().await?;
    tracing::info!("client {} deleted", id);

    Ok(Json(DeletedClientResponse {
        success: true,
        deleted_client_id: id,
        total_clients,
    }))
}

// --- Appointment Handlers ---

/// get_appointment
///
/// [`get:appointment`] A single appointment by id.
#[utoipa::path(
    get,
    path = "/api/appointments/{id}",
    params(("id" = i32, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Found", body = AppointmentResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn get_appointment(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let appointment = state
        .repo
        .get_appointment(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(AppointmentResponse {
        success: true,
        appointment,
        total_upcoming_appointments: None,
    }))
}

/// create_appointment
///
/// [`create:appointment`] Requires a parseable `appointment_date`. Supplied
/// artist/client ids must exist, same as on update.
#[utoipa::path(
    post,
    path = "/api/appointments",
    request_body = NewAppointment,
    responses(
        (status = 200, description = "Created", body = AppointmentResponse),
        (status = 404, description = "Referenced artist or client missing", body = ErrorResponse),
        (status = 422, description = "Missing or unparseable date", body = ErrorResponse)
    )
)]
pub async fn create_appointment(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let new_appointment = validation::validate_new_appointment(&body)?;
    validation::ensure_references_exist(
        state.repo.as_ref(),
        new_appointment.artist,
        new_appointment.client,
    )
    .await?;

    let appointment = state.repo.create_appointment(new_appointment).await?;
    let upcoming = state.repo.count_upcoming_appointments(Utc::now()).await?;

    tracing::info!("appointment {} booked", appointment.id);

    Ok(Json(AppointmentResponse {
        success: true,
        appointment,
        total_upcoming_appointments: Some(upcoming),
    }))
}

/// update_appointment
///
/// [`update:appointment`] Partial update. Every supplied reference is checked
/// before the date is parsed or anything is written, so a missing artist or
/// client is a 404 and leaves the appointment untouched.
#[utoipa::path(
    patch,
    path = "/api/appointments/{id}",
    params(("id" = i32, Path, description = "Appointment ID")),
    request_body = AppointmentChanges,
    responses(
        (status = 200, description = "Updated", body = AppointmentResponse),
        (status = 404, description = "Appointment, artist or client missing", body = ErrorResponse),
        (status = 422, description = "Unparseable date", body = ErrorResponse)
    )
)]
pub async fn update_appointment(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    JsonBody(body): JsonBody,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let mut appointment: Appointment = state
        .repo
        .get_appointment(id)
        .await?
        .ok_or(ApiError::NotFound)?;

    // Missing references win over a bad date.
    let (artist, client) = validation::appointment_references(&body)?;
    validation::ensure_references_exist(state.repo.as_ref(), artist, client).await?;
    validation::validate_appointment_changes(&body)?.apply(&mut appointment);

    let appointment = state.repo.update_appointment(appointment).await?;
    tracing::info!("appointment {} updated", appointment.id);

    Ok(Json(AppointmentResponse {
        success: true,
        appointment,
        total_upcoming_appointments: None,
    }))
}

/// delete_appointment
///
/// [`delete:appointment`] Removes an appointment and reports how many
/// appointments remain in the future.
#[utoipa::path(
    delete,
    path = "/api/appointments/{id}",
    params(("id" = i32, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Deleted", body = DeletedAppointmentResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn delete_appointment(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<DeletedAppointmentResponse>, ApiError> {
    if !state.repo.delete_appointment(id).await? {
        return Err(ApiError::NotFound);
    }
    let upcoming = state.repo.count_upcoming_appointments(Utc::now()).await?;
    tracing::info!("appointment {} cancelled", id);

    Ok(Json(DeletedAppointmentResponse {
        success: true,
        deleted_appointment_id: id,
        total_upcoming_appointments: upcoming,
    }))
}

/// Liveness probe. Never touches the repository.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health() -> Json<Value> {
    Json(serde_json::json!({ "success": true, "status": "ok" }))
}
