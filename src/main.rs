use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tattoo_shop::{
    AppState, CachedKeySet, InMemoryRepository, PostgresRepository, RemoteKeySet, TokenVerifier,
    config::{AppConfig, Env},
    create_router,
    jwks::KeySetState,
    repository::RepositoryState,
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, persistence and token verification,
/// then serves the API.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production settings)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise crate debug + request summaries.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tattoo_shop=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Persistence
    let repo: RepositoryState = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

            let postgres = PostgresRepository::new(pool);
            postgres
                .migrate()
                .await
                .expect("FATAL: Failed to apply database migrations.");
            tracing::info!("Connected to Postgres, migrations applied");
            Arc::new(postgres)
        }
        None => {
            tracing::warn!("DATABASE_URL not set: using the in-memory repository, data will not persist");
            Arc::new(InMemoryRepository::new())
        }
    };

    // 4. Token verification against the tenant's published key set
    let remote = RemoteKeySet::for_domain(&config.auth0_domain);
    tracing::info!("Verifying tokens against {}", remote.url());
    let keys: KeySetState = if config.jwks_cache_ttl.is_zero() {
        Arc::new(remote)
    } else {
        Arc::new(CachedKeySet::new(remote, config.jwks_cache_ttl))
    };
    let verifier = Arc::new(TokenVerifier::from_config(&config, keys));

    if !config.require_auth_for_reads {
        tracing::warn!("REQUIRE_AUTH_FOR_READS is off: client and appointment reads are open");
    }

    // 5. Router and server
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState {
        repo,
        verifier,
        config,
    });

    let listener = TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: cannot bind {}: {}", bind_addr, e));

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server terminated: {}", e);
    }
}
