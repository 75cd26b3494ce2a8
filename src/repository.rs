use crate::models::{Appointment, Artist, Client, NewAppointment, NewArtist, NewClient};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// RepositoryError
///
/// Failures raised by the persistence layer. Handlers never inspect these
/// beyond logging; they all surface as a generic 422.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A uniqueness constraint rejected the write (e.g. duplicate artist name).
    #[error("unique constraint violated on {0}")]
    Conflict(&'static str),
    #[error("persistence store unavailable")]
    Unavailable,
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The persistence capability consumed by the handlers. Every entity gets the
/// same create / get / list / update / delete / count surface; creation
/// returns the inserted row directly so no read-back by natural key is needed.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` usable as axum state.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Artists ---
    async fn list_artists(&self) -> RepoResult<Vec<Artist>>;
    async fn get_artist(&self, id: i32) -> RepoResult<Option<Artist>>;
    async fn create_artist(&self, new: NewArtist) -> RepoResult<Artist>;
    async fn update_artist(&self, artist: Artist) -> RepoResult<Artist>;
    // Returns false when no row matched.
    async fn delete_artist(&self, id: i32) -> RepoResult<bool>;
    async fn count_artists(&self) -> RepoResult<i64>;

    // --- Clients ---
    // Stored (insertion) order, which the pagination relies on.
    async fn list_clients(&self) -> RepoResult<Vec<Client>>;
    async fn get_client(&self, id: i32) -> RepoResult<Option<Client>>;
    async fn create_client(&self, new: NewClient) -> RepoResult<Client>;
    async fn update_client(&self, client: Client) -> RepoResult<Client>;
    async fn delete_client(&self, id: i32) -> RepoResult<bool>;
    async fn count_clients(&self) -> RepoResult<i64>;

    // --- Appointments ---
    async fn get_appointment(&self, id: i32) -> RepoResult<Option<Appointment>>;
    async fn create_appointment(&self, new: NewAppointment) -> RepoResult<Appointment>;
    async fn update_appointment(&self, appointment: Appointment) -> RepoResult<Appointment>;
    async fn delete_appointment(&self, id: i32) -> RepoResult<bool>;
    /// Appointments strictly after `now`.
    async fn count_upcoming_appointments(&self, now: DateTime<Utc>) -> RepoResult<i64>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Queries are bound at runtime so the
/// crate builds without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled migrations in `./migrations`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

const ARTIST_COLUMNS: &str = "id, name, phone, styles, image_link, instagram_link, email";
const CLIENT_COLUMNS: &str = "id, name, phone, email, address";
const APPOINTMENT_COLUMNS: &str = "id, client, artist, appointment_date";

/// Maps a Postgres unique violation (SQLSTATE 23505) to `Conflict`.
fn conflict_on(table: &'static str) -> impl Fn(sqlx::Error) -> RepositoryError {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict(table),
        _ => RepositoryError::Database(e),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_artists(&self) -> RepoResult<Vec<Artist>> {
        let query = format!("SELECT {ARTIST_COLUMNS} FROM artists ORDER BY id");
        Ok(sqlx::query_as::<_, Artist>(&query).fetch_all(&self.pool).await?)
    }

    async fn get_artist(&self, id: i32) -> RepoResult<Option<Artist>> {
        let query = format!("SELECT {ARTIST_COLUMNS} FROM artists WHERE id = $1");
        Ok(sqlx::query_as::<_, Artist>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_artist(&self, new: NewArtist) -> RepoResult<Artist> {
        let query = format!(
            "INSERT INTO artists (name, phone, styles, image_link, instagram_link, email) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ARTIST_COLUMNS}"
        );
        sqlx::query_as::<_, Artist>(&query)
            .bind(new.name)
            .bind(new.phone)
            .bind(new.styles)
            .bind(new.image_link)
            .bind(new.instagram_link)
            .bind(new.email)
            .fetch_one(&self.pool)
            .await
            .map_err(conflict_on("artists.name"))
    }

    async fn update_artist(&self, artist: Artist) -> RepoResult<Artist> {
        let query = format!(
            "UPDATE artists SET name = $2, phone = $3, styles = $4, image_link = $5, \
             instagram_link = $6, email = $7 WHERE id = $1 RETURNING {ARTIST_COLUMNS}"
        );
        sqlx::query_as::<_, Artist>(&query)
            .bind(artist.id)
            .bind(artist.name)
            .bind(artist.phone)
            .bind(artist.styles)
            .bind(artist.image_link)
            .bind(artist.instagram_link)
            .bind(artist.email)
            .fetch_one(&self.pool)
            .await
            .map_err(conflict_on("artists.name"))
    }

    async fn delete_artist(&self, id: i32) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM artists WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_artists(&self) -> RepoResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM artists")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_clients(&self) -> RepoResult<Vec<Client>> {
        let query = format!("SELECT {CLIENT_COLUMNS} FROM clients ORDER BY id");
        Ok(sqlx::query_as::<_, Client>(&query).fetch_all(&self.pool).await?)
    }

    async fn get_client(&self, id: i32) -> RepoResult<Option<Client>> {
        let query = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1");
        Ok(sqlx::query_as::<_, Client>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_client(&self, new: NewClient) -> RepoResult<Client> {
        let query = format!(
            "INSERT INTO clients (name, phone, email, address) \
             VALUES ($1, $2, $3, $4) RETURNING {CLIENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Client>(&query)
            .bind(new.name)
            .bind(new.phone)
            .bind(new.email)
            .bind(new.address)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_client(&self, client: Client) -> RepoResult<Client> {
        let query = format!(
            "UPDATE clients SET name = $2, phone = $3, email = $4, address = $5 \
             WHERE id = $1 RETURNING {CLIENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Client>(&query)
            .bind(client.id)
            .bind(client.name)
            .bind(client.phone)
            .bind(client.email)
            .bind(client.address)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn delete_client(&self, id: i32) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_clients(&self) -> RepoResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clients")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_appointment(&self, id: i32) -> RepoResult<Option<Appointment>> {
        let query = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1");
        Ok(sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_appointment(&self, new: NewAppointment) -> RepoResult<Appointment> {
        let query = format!(
            "INSERT INTO appointments (client, artist, appointment_date) \
             VALUES ($1, $2, $3) RETURNING {APPOINTMENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Appointment>(&query)
            .bind(new.client)
            .bind(new.artist)
            .bind(new.appointment_date)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_appointment(&self, appointment: Appointment) -> RepoResult<Appointment> {
        let query = format!(
            "UPDATE appointments SET client = $2, artist = $3, appointment_date = $4 \
             WHERE id = $1 RETURNING {APPOINTMENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Appointment>(&query)
            .bind(appointment.id)
            .bind(appointment.client)
            .bind(appointment.artist)
            .bind(appointment.appointment_date)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn delete_appointment(&self, id: i32) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_upcoming_appointments(&self, now: DateTime<Utc>) -> RepoResult<i64> {
        Ok(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM appointments WHERE appointment_date > $1")
                .bind(now)
                .fetch_one(&self.pool)
                .await?,
        )
    }
}

// --- In-Memory Implementation (Local runs and tests) ---

#[derive(Default)]
struct Tables {
    artists: Vec<Artist>,
    clients: Vec<Client>,
    appointments: Vec<Appointment>,
    next_artist_id: i32,
    next_client_id: i32,
    next_appointment_id: i32,
}

/// InMemoryRepository
///
/// A `Repository` kept in process memory. Mirrors the Postgres schema rules
/// that matter to the handlers: serial ids, unique artist names, and
/// `ON DELETE SET NULL` on appointment references.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
    /// When true, every write fails with `Unavailable`.
    pub fail_writes: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    fn tables(&self) -> RepoResult<std::sync::MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| RepositoryError::Unavailable)
    }

    fn writable(&self) -> RepoResult<std::sync::MutexGuard<'_, Tables>> {
        if self.fail_writes {
            return Err(RepositoryError::Unavailable);
        }
        self.tables()
    }
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_artists(&self) -> RepoResult<Vec<Artist>> {
        Ok(self.tables()?.artists.clone())
    }

    async fn get_artist(&self, id: i32) -> RepoResult<Option<Artist>> {
        Ok(self.tables()?.artists.iter().find(|a| a.id == id).cloned())
    }

    async fn create_artist(&self, new: NewArtist) -> RepoResult<Artist> {
        let mut tables = self.writable()?;
        if tables.artists.iter().any(|a| a.name == new.name) {
            return Err(RepositoryError::Conflict("artists.name"));
        }
        let artist = Artist {
            id: next_id(&mut tables.next_artist_id),
            name: new.name,
            phone: new.phone,
            styles: new.styles,
            image_link: new.image_link,
            instagram_link: new.instagram_link,
            email: new.email,
        };
        tables.artists.push(artist.clone());
        Ok(artist)
    }

    async fn update_artist(&self, artist: Artist) -> RepoResult<Artist> {
        let mut tables = self.writable()?;
        if tables
            .artists
            .iter()
            .any(|a| a.id != artist.id && a.name == artist.name)
        {
            return Err(RepositoryError::Conflict("artists.name"));
        }
        let slot = tables
            .artists
            .iter_mut()
            .find(|a| a.id == artist.id)
            .ok_or(RepositoryError::Database(sqlx::Error::RowNotFound))?;
        *slot = artist.clone();
        Ok(artist)
    }

    async fn delete_artist(&self, id: i32) -> RepoResult<bool> {
        let mut tables = self.writable()?;
        let before = tables.artists.len();
        tables.artists.retain(|a| a.id != id);
        let deleted = tables.artists.len() < before;
        if deleted {
            for appointment in tables.appointments.iter_mut().filter(|a| a.artist == Some(id)) {
                appointment.artist = None;
            }
        }
        Ok(deleted)
    }

    async fn count_artists(&self) -> RepoResult<i64> {
        Ok(self.tables()?.artists.len() as i64)
    }

    async fn list_clients(&self) -> RepoResult<Vec<Client>> {
        Ok(self.tables()?.clients.clone())
    }

    async fn get_client(&self, id: i32) -> RepoResult<Option<Client>> {
        Ok(self.tables()?.clients.iter().find(|c| c.id == id).cloned())
    }

    async fn create_client(&self, new: NewClient) -> RepoResult<Client> {
        let mut tables = self.writable()?;
        let client = Client {
            id: next_id(&mut tables.next_client_id),
            name: new.name,
            phone: new.phone,
            email: new.email,
            address: new.address,
        };
        tables.clients.push(client.clone());
        Ok(client)
    }

    async fn update_client(&self, client: Client) -> RepoResult<Client> {
        let mut tables = self.writable()?;
        let slot = tables
            .clients
            .iter_mut()
            .find(|c| c.id == client.id)
            .ok_or(RepositoryError::Database(sqlx::Error::RowNotFound))?;
        *slot = client.clone();
        Ok(client)
    }

    async fn delete_client(&self, id: i32) -> RepoResult<bool> {
        let mut tables = self.writable()?;
        let before = tables.clients.len();
        tables.clients.retain(|c| c.id != id);
        let deleted = tables.clients.len() < before;
        if deleted {
            for appointment in tables.appointments.iter_mut().filter(|a| a.client == Some(id)) {
                appointment.client = None;
            }
        }
        Ok(deleted)
    }

    async fn count_clients(&self) -> RepoResult<i64> {
        Ok(self.tables()?.clients.len() as i64)
    }

    async fn get_appointment(&self, id: i32) -> RepoResult<Option<Appointment>> {
        Ok(self.tables()?.appointments.iter().find(|a| a.id == id).cloned())
    }

    async fn create_appointment(&self, new: NewAppointment) -> RepoResult<Appointment> {
        let mut tables = self.writable()?;
        let appointment = Appointment {
            id: next_id(&mut tables.next_appointment_id),
            client: new.client,
            artist: new.artist,
            appointment_date: new.appointment_date,
        };
        tables.appointments.push(appointment.clone());
        Ok(appointment)
    }

    async fn update_appointment(&self, appointment: Appointment) -> RepoResult<Appointment> {
        let mut tables = self.writable()?;
        let slot = tables
            .appointments
            .iter_mut()
            .find(|a| a.id == appointment.id)
            .ok_or(RepositoryError::Database(sqlx::Error::RowNotFound))?;
        *slot = appointment.clone();
        Ok(appointment)
    }

    async fn delete_appointment(&self, id: i32) -> RepoResult<bool> {
        let mut tables = self.writable()?;
        let before = tables.appointments.len();
        tables.appointments.retain(|a| a.id != id);
        Ok(tables.appointments.len() < before)
    }

    async fn count_upcoming_appointments(&self, now: DateTime<Utc>) -> RepoResult<i64> {
        Ok(self
            .tables()?
            .appointments
            .iter()
            .filter(|a| a.appointment_date > now)
            .count() as i64)
    }
}
