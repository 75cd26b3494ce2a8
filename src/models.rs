use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Core Application Schemas (Mapped to Database) ---

/// Artist
///
/// A tattoo artist working at the shop (`artists` table). The name is unique
/// across all artists; every other column is free text defaulting to "".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Artist {
    pub id: i32,
    pub name: String,
    pub phone: String,
    pub styles: String,
    pub image_link: String,
    pub instagram_link: String,
    pub email: String,
}

/// Client
///
/// A customer record (`clients` table). Names are required but not unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Client {
    pub id: i32,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

/// Appointment
///
/// A booking between a client and an artist (`appointments` table).
/// Both references are nullable: deleting the referenced artist or client
/// leaves the appointment in place with the reference cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Appointment {
    pub id: i32,
    pub client: Option<i32>,
    pub artist: Option<i32>,
    #[serde(with = "http_date")]
    #[ts(type = "string")]
    #[schema(value_type = String, example = "Sat, 06 Mar 2021 12:30:00 GMT")]
    pub appointment_date: DateTime<Utc>,
}

/// http_date
///
/// The single textual date format accepted and produced by the API:
/// `Sat, 06 Mar 2021 12:30:00 GMT`. Timestamps are stored as UTC, so the
/// zone name must be `GMT` or `UTC` on input and is always `GMT` on output.
/// The weekday must be a weekday name but is not checked against the date.
pub mod http_date {
    use chrono::{DateTime, NaiveDateTime, Utc, Weekday};
    use serde::{Deserialize, Deserializer, Serializer, de};

    const STAMP_FORMAT: &str = "%a, %d %b %Y %H:%M:%S";
    const DATE_TIME_FORMAT: &str = "%d %b %Y %H:%M:%S";
    const ACCEPTED_ZONES: [&str; 2] = ["GMT", "UTC"];

    pub fn parse(value: &str) -> Option<DateTime<Utc>> {
        let (stamp, zone) = value.rsplit_once(' ')?;
        if !ACCEPTED_ZONES.contains(&zone) {
            return None;
        }
        let (weekday, date_time) = stamp.split_once(", ")?;
        weekday.parse::<Weekday>().ok()?;
        NaiveDateTime::parse_from_str(date_time, DATE_TIME_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn format(value: &DateTime<Utc>) -> String {
        format!("{} GMT", value.format(STAMP_FORMAT))
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid appointment date: {raw}")))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer, de};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(date) => super::serialize(date, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("invalid appointment date: {raw}"))),
                None => Ok(None),
            }
        }
    }
}

// --- Validated Drafts (Input Schemas) ---

/// NewArtist
///
/// A validated artist creation payload (POST /api/artists).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Default)]
pub struct NewArtist {
    pub name: String,
    pub phone: String,
    pub styles: String,
    pub image_link: String,
    pub instagram_link: String,
    pub email: String,
}

/// ArtistChanges
///
/// Partial update for an artist (PATCH /api/artists/{id}). `None` keeps the
/// stored value, `Some` overwrites it, including with an empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Default)]
pub struct ArtistChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub styles: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ArtistChanges {
    pub fn apply(self, artist: &mut Artist) {
        overwrite(&mut artist.name, self.name);
        overwrite(&mut artist.phone, self.phone);
        overwrite(&mut artist.styles, self.styles);
        overwrite(&mut artist.image_link, self.image_link);
        overwrite(&mut artist.instagram_link, self.instagram_link);
        overwrite(&mut artist.email, self.email);
    }
}

/// NewClient
///
/// A validated client creation payload (POST /api/clients).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Default)]
pub struct NewClient {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

/// ClientChanges
///
/// Partial update for a client (PATCH /api/clients/{id}).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Default)]
pub struct ClientChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl ClientChanges {
    pub fn apply(self, client: &mut Client) {
        overwrite(&mut client.name, self.name);
        overwrite(&mut client.phone, self.phone);
        overwrite(&mut client.email, self.email);
        overwrite(&mut client.address, self.address);
    }
}

/// NewAppointment
///
/// A validated appointment creation payload (POST /api/appointments).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NewAppointment {
    pub client: Option<i32>,
    pub artist: Option<i32>,
    #[serde(with = "http_date")]
    #[schema(value_type = String, example = "Sat, 06 Mar 2021 12:30:00 GMT")]
    pub appointment_date: DateTime<Utc>,
}

/// AppointmentChanges
///
/// Partial update for an appointment (PATCH /api/appointments/{id}).
/// Referenced ids are checked for existence by the handler before applying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Default)]
pub struct AppointmentChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "http_date::option")]
    #[schema(value_type = Option<String>, example = "Sat, 06 Mar 2021 12:30:00 GMT")]
    pub appointment_date: Option<DateTime<Utc>>,
}

impl AppointmentChanges {
    pub fn apply(self, appointment: &mut Appointment) {
        if self.client.is_some() {
            appointment.client = self.client;
        }
        if self.artist.is_some() {
            appointment.artist = self.artist;
        }
        if let Some(date) = self.appointment_date {
            appointment.appointment_date = date;
        }
    }
}

fn overwrite(field: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *field = value;
    }
}

// --- Response Envelopes (Output Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ArtistListResponse {
    pub success: bool,
    pub artists: Vec<Artist>,
    pub total_artists: i64,
}

/// ArtistResponse
///
/// Single-artist envelope. `total_artists` is only present on creation.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ArtistResponse {
    pub success: bool,
    pub artist: Artist,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_artists: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DeletedArtistResponse {
    pub success: bool,
    pub deleted_artist_id: i32,
    pub total_artists: i64,
}

/// ClientListResponse
///
/// One page of clients. `total_clients` counts every client, not just the page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ClientListResponse {
    pub success: bool,
    pub clients: Vec<Client>,
    pub total_clients: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ClientResponse {
    pub success: bool,
    pub client: Client,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_clients: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DeletedClientResponse {
    pub success: bool,
    pub deleted_client_id: i32,
    pub total_clients: i64,
}

/// AppointmentResponse
///
/// Single-appointment envelope. On creation it also reports how many
/// appointments are still in the future.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AppointmentResponse {
    pub success: bool,
    pub appointment: Appointment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_upcoming_appointments: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DeletedAppointmentResponse {
    pub success: bool,
    pub deleted_appointment_id: i32,
    pub total_upcoming_appointments: i64,
}
