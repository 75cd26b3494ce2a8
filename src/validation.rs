//! Entity validators.
//!
//! Each validator takes the raw JSON object from a request body and either
//! produces a typed draft from `models` or fails with `ApiError::Validation`.
//! Existence checks for referenced rows go through the `Repository` and fail
//! with `ApiError::NotFound`.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::{
    error::ApiError,
    models::{
        AppointmentChanges, ArtistChanges, ClientChanges, NewAppointment, NewArtist, NewClient,
        http_date,
    },
    repository::Repository,
};

/// Raw request body: string keys to arbitrary JSON values.
pub type FieldMap = Map<String, Value>;

// --- Field helpers ---

/// Absent → `None`. Present values must be JSON strings, empty included.
fn optional_string(body: &FieldMap, key: &str) -> Result<Option<String>, ApiError> {
    match body.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ApiError::Validation(format!("'{key}' must be a string"))),
    }
}

fn string_or_empty(body: &FieldMap, key: &str) -> Result<String, ApiError> {
    Ok(optional_string(body, key)?.unwrap_or_default())
}

fn non_empty_name(name: String) -> Result<String, ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation("'name' must not be empty".to_string()));
    }
    Ok(name)
}

fn required_name(body: &FieldMap) -> Result<String, ApiError> {
    let name = optional_string(body, "name")?
        .ok_or_else(|| ApiError::Validation("'name' is required".to_string()))?;
    non_empty_name(name)
}

/// Entity reference. Absent and `null` both mean "not supplied".
fn optional_id(body: &FieldMap, key: &str) -> Result<Option<i32>, ApiError> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|id| i32::try_from(id).ok())
            .map(Some)
            .ok_or_else(|| ApiError::Validation(format!("'{key}' must be an integer id"))),
        Some(_) => Err(ApiError::Validation(format!("'{key}' must be an integer id"))),
    }
}

/// Parses the fixed `Sat, 06 Mar 2021 12:30:00 GMT` format.
pub fn parse_appointment_date(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    http_date::parse(raw).ok_or_else(|| {
        ApiError::Validation(format!(
            "'appointment_date' must look like 'Sat, 06 Mar 2021 12:30:00 GMT', got '{raw}'"
        ))
    })
}

fn optional_date(body: &FieldMap) -> Result<Option<DateTime<Utc>>, ApiError> {
    match body.get("appointment_date") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => parse_appointment_date(raw).map(Some),
        Some(_) => Err(ApiError::Validation(
            "'appointment_date' must be a string".to_string(),
        )),
    }
}

// --- Artists ---

pub fn validate_new_artist(body: &FieldMap) -> Result<NewArtist, ApiError> {
    Ok(NewArtist {
        name: required_name(body)?,
        phone: string_or_empty(body, "phone")?,
        styles: string_or_empty(body, "styles")?,
        image_link: string_or_empty(body, "image_link")?,
        instagram_link: string_or_empty(body, "instagram_link")?,
        email: string_or_empty(body, "email")?,
    })
}

pub fn validate_artist_changes(body: &FieldMap) -> Result<ArtistChanges, ApiError> {
    Ok(ArtistChanges {
        name: optional_string(body, "name")?.map(non_empty_name).transpose()?,
        phone: optional_string(body, "phone")?,
        styles: optional_string(body, "styles")?,
        image_link: optional_string(body, "image_link")?,
        instagram_link: optional_string(body, "instagram_link")?,
        email: optional_string(body, "email")?,
    })
}

// --- Clients ---

pub fn validate_new_client(body: &FieldMap) -> Result<NewClient, ApiError> {
    Ok(NewClient {
        name: required_name(body)?,
        phone: string_or_empty(body, "phone")?,
        email: string_or_empty(body, "email")?,
        address: string_or_empty(body, "address")?,
    })
}

pub fn validate_client_changes(body: &FieldMap) -> Result<ClientChanges, ApiError> {
    Ok(ClientChanges {
        name: optional_string(body, "name")?.map(non_empty_name).transpose()?,
        phone: optional_string(body, "phone")?,
        email: optional_string(body, "email")?,
        address: optional_string(body, "address")?,
    })
}

// --- Appointments ---

pub fn validate_new_appointment(body: &FieldMap) -> Result<NewAppointment, ApiError> {
    let appointment_date = optional_date(body)?
        .ok_or_else(|| ApiError::Validation("'appointment_date' is required".to_string()))?;

    Ok(NewAppointment {
        client: optional_id(body, "client")?,
        artist: optional_id(body, "artist")?,
        appointment_date,
    })
}

/// The `(artist, client)` ids a body refers to, read without touching the
/// date so references can be resolved first.
pub fn appointment_references(body: &FieldMap) -> Result<(Option<i32>, Option<i32>), ApiError> {
    Ok((optional_id(body, "artist")?, optional_id(body, "client")?))
}

pub fn validate_appointment_changes(body: &FieldMap) -> Result<AppointmentChanges, ApiError> {
    let (artist, client) = appointment_references(body)?;
    Ok(AppointmentChanges {
        client,
        artist,
        appointment_date: optional_date(body)?,
    })
}

/// ensure_references_exist
///
/// Fails with `NotFound` when a supplied artist or client id does not
/// resolve. Runs before any write so a bad reference never half-applies.
pub async fn ensure_references_exist(
    repo: &dyn Repository,
    artist: Option<i32>,
    client: Option<i32>,
) -> Result<(), ApiError> {
    if let Some(id) = artist {
        if repo.get_artist(id).await?.is_none() {
            tracing::debug!("referenced artist {} does not exist", id);
            return Err(ApiError::NotFound);
        }
    }
    if let Some(id) = client {
        if repo.get_client(id).await?.is_none() {
            tracing::debug!("referenced client {} does not exist", id);
            return Err(ApiError::NotFound);
        }
    }
    Ok(())
}
