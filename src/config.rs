use jsonwebtoken::Algorithm;
use std::{env, str::FromStr, time::Duration};

/// AppConfig
///
/// The application's entire configuration, loaded once at startup and
/// immutable afterwards. Pulled into handlers and middleware via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and which settings are mandatory.
    pub env: Env,
    // Postgres connection string. `None` (local only) selects the in-memory repository.
    pub db_url: Option<String>,
    // Identity provider tenant, e.g. `my-shop.eu.auth0.com`.
    pub auth0_domain: String,
    // Expected `aud` claim of incoming tokens.
    pub api_audience: String,
    // Signature algorithms accepted on incoming tokens.
    pub algorithms: Vec<Algorithm>,
    // "Authenticated read" when true, "open read" when false.
    pub require_auth_for_reads: bool,
    // Lifetime of a fetched key set. Zero disables caching.
    pub jwks_cache_ttl: Duration,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
}

/// Env
///
/// Runtime context: pretty logs and lenient defaults locally, JSON logs and
/// mandatory secrets in production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe values for test state setup, no environment access.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            auth0_domain: "tattoo-shop.local".to_string(),
            api_audience: "tattoo-shop".to_string(),
            algorithms: vec![Algorithm::RS256],
            require_auth_for_reads: true,
            jwks_cache_ttl: Duration::ZERO,
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables, failing fast.
    ///
    /// # Panics
    /// Panics when a variable mandatory for the current environment is
    /// missing, or when a present variable cannot be parsed.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };
        let defaults = Self::default();

        let algorithms = env::var("ALGORITHMS")
            .map(|raw| parse_algorithms(&raw))
            .unwrap_or(defaults.algorithms);

        let require_auth_for_reads = env::var("REQUIRE_AUTH_FOR_READS")
            .map(|raw| parse_flag("REQUIRE_AUTH_FOR_READS", &raw))
            .unwrap_or(defaults.require_auth_for_reads);

        let jwks_cache_ttl = env::var("JWKS_CACHE_TTL_SECS")
            .map(|raw| {
                Duration::from_secs(
                    raw.parse()
                        .expect("FATAL: JWKS_CACHE_TTL_SECS must be a whole number of seconds"),
                )
            })
            .unwrap_or(defaults.jwks_cache_ttl);

        let bind_addr = env::var("BIND_ADDR").unwrap_or(defaults.bind_addr);

        match env {
            Env::Local => Self {
                env: Env::Local,
                // Without a database the service runs on the in-memory repository.
                db_url: env::var("DATABASE_URL").ok(),
                auth0_domain: env::var("AUTH0_DOMAIN").unwrap_or(defaults.auth0_domain),
                api_audience: env::var("API_AUDIENCE").unwrap_or(defaults.api_audience),
                algorithms,
                require_auth_for_reads,
                jwks_cache_ttl,
                bind_addr,
            },
            Env::Production => Self {
                env: Env::Production,
                db_url: Some(
                    env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod"),
                ),
                auth0_domain: env::var("AUTH0_DOMAIN")
                    .expect("FATAL: AUTH0_DOMAIN required in prod"),
                api_audience: env::var("API_AUDIENCE")
                    .expect("FATAL: API_AUDIENCE required in prod"),
                algorithms,
                require_auth_for_reads,
                jwks_cache_ttl,
                bind_addr,
            },
        }
    }

    /// Expected `iss` claim: Auth0 issuers are the tenant URL with a trailing slash.
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.auth0_domain)
    }
}

fn parse_algorithms(raw: &str) -> Vec<Algorithm> {
    let algorithms: Vec<Algorithm> = raw
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            Algorithm::from_str(name)
                .unwrap_or_else(|_| panic!("FATAL: unsupported signing algorithm '{}'", name))
        })
        .collect();

    if algorithms.is_empty() {
        panic!("FATAL: ALGORITHMS must name at least one algorithm");
    }
    algorithms
}

fn parse_flag(name: &str, raw: &str) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        other => panic!("FATAL: {} must be a boolean, got '{}'", name, other),
    }
}
