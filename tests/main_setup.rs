use jsonwebtoken::Algorithm;
use serial_test::serial;
use std::{env, panic, time::Duration};
use tattoo_shop::{AppConfig, config::Env};

const CONFIG_VARS: [&str; 8] = [
    "APP_ENV",
    "DATABASE_URL",
    "AUTH0_DOMAIN",
    "API_AUDIENCE",
    "ALGORITHMS",
    "REQUIRE_AUTH_FOR_READS",
    "JWKS_CACHE_TTL_SECS",
    "BIND_ADDR",
];

// --- Setup/Teardown Utilities ---

/// Runs `test` with exactly `vars` set (all other config variables cleared),
/// then restores the previous environment, re-raising any panic.
fn run_with_env<T, R>(vars: &[(&str, &str)], test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(&str, Option<String>)> = CONFIG_VARS
        .iter()
        .map(|&var| (var, env::var(var).ok()))
        .collect();

    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
    }

    let result = panic::catch_unwind(test);

    for (key, original_value) in originals {
        unsafe {
            match original_value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_local_config_defaults() {
    let config = run_with_env(&[], AppConfig::load);

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.db_url, None);
    assert_eq!(config.algorithms, vec![Algorithm::RS256]);
    assert!(config.require_auth_for_reads);
    assert_eq!(config.jwks_cache_ttl, Duration::ZERO);
    assert_eq!(config.bind_addr, "0.0.0.0:8080");
    assert_eq!(config.issuer(), "https://tattoo-shop.local/");
}

#[test]
#[serial]
fn test_local_config_reads_overrides() {
    let config = run_with_env(
        &[
            ("AUTH0_DOMAIN", "ink.eu.auth0.com"),
            ("API_AUDIENCE", "ink-api"),
            ("ALGORITHMS", "RS256, RS384"),
            ("REQUIRE_AUTH_FOR_READS", "false"),
            ("JWKS_CACHE_TTL_SECS", "600"),
            ("BIND_ADDR", "127.0.0.1:9000"),
        ],
        AppConfig::load,
    );

    assert_eq!(config.issuer(), "https://ink.eu.auth0.com/");
    assert_eq!(config.api_audience, "ink-api");
    assert_eq!(config.algorithms, vec![Algorithm::RS256, Algorithm::RS384]);
    assert!(!config.require_auth_for_reads);
    assert_eq!(config.jwks_cache_ttl, Duration::from_secs(600));
    assert_eq!(config.bind_addr, "127.0.0.1:9000");
}

#[test]
#[serial]
fn test_production_config_complete() {
    let config = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://ink:secret@db/tattoo_shop"),
            ("AUTH0_DOMAIN", "ink.eu.auth0.com"),
            ("API_AUDIENCE", "ink-api"),
        ],
        AppConfig::load,
    );

    assert_eq!(config.env, Env::Production);
    assert_eq!(config.db_url.as_deref(), Some("postgres://ink:secret@db/tattoo_shop"));
}

#[test]
#[serial]
fn test_production_config_fail_fast() {
    // AUTH0_DOMAIN and API_AUDIENCE are missing.
    let result = panic::catch_unwind(|| {
        run_with_env(
            &[
                ("APP_ENV", "production"),
                ("DATABASE_URL", "postgres://ink:secret@db/tattoo_shop"),
            ],
            AppConfig::load,
        )
    });
    assert!(result.is_err(), "production config without AUTH0_DOMAIN must panic");

    let result = panic::catch_unwind(|| {
        run_with_env(
            &[
                ("APP_ENV", "production"),
                ("AUTH0_DOMAIN", "ink.eu.auth0.com"),
                ("API_AUDIENCE", "ink-api"),
            ],
            AppConfig::load,
        )
    });
    assert!(result.is_err(), "production config without DATABASE_URL must panic");
}

#[test]
#[serial]
fn test_unparseable_values_fail_fast() {
    for vars in [
        [("ALGORITHMS", "ROT13")],
        [("ALGORITHMS", " , ")],
        [("REQUIRE_AUTH_FOR_READS", "sometimes")],
        [("JWKS_CACHE_TTL_SECS", "ten")],
    ] {
        let result = panic::catch_unwind(|| run_with_env(&vars, AppConfig::load));
        assert!(result.is_err(), "accepted {:?}", vars);
    }
}
