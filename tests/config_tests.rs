use std::env;
use std::time::Duration;

use serial_test::serial;

use gluca::config::{Config, ConfigError, DEFAULT_SPOONACULAR_BASE_URL};

const VARIABLES: [&str; 5] = [
    "SPOONACULAR_API_KEY",
    "SPOONACULAR_BASE_URL",
    "OPENFOODFACTS_BASE_URL",
    "UPSTREAM_TIMEOUT_SECS",
    "BYNAME_CONCURRENCY",
];

fn clear_env() {
    for key in VARIABLES {
        // Env mutation is confined to #[serial] tests.
        unsafe { env::remove_var(key) };
    }
}

fn set_env(key: &str, value: &str) {
    unsafe { env::set_var(key, value) };
}

#[test]
#[serial]
fn missing_api_key_is_rejected() {
    clear_env();

    let err = Config::from_env().unwrap_err();

    assert!(matches!(err, ConfigError::Missing(ref key) if key == "SPOONACULAR_API_KEY"));
}

#[test]
#[serial]
fn blank_api_key_is_rejected() {
    clear_env();
    set_env("SPOONACULAR_API_KEY", "   ");

    assert!(matches!(
        Config::from_env().unwrap_err(),
        ConfigError::Missing(_)
    ));

    clear_env();
}

#[test]
#[serial]
fn defaults_apply_when_only_the_key_is_set() {
    clear_env();
    set_env("SPOONACULAR_API_KEY", "abc");

    let config = Config::from_env().unwrap();

    assert_eq!(config.spoonacular_api_key, "abc");
    assert_eq!(config.spoonacular_base_url, DEFAULT_SPOONACULAR_BASE_URL);
    assert_eq!(config.upstream_timeout, Duration::from_secs(10));
    assert_eq!(config.byname_concurrency, 1);

    clear_env();
}

#[test]
#[serial]
fn overrides_are_parsed() {
    clear_env();
    set_env("SPOONACULAR_API_KEY", "abc");
    set_env("UPSTREAM_TIMEOUT_SECS", "3");
    set_env("BYNAME_CONCURRENCY", "0");

    let config = Config::from_env().unwrap();

    assert_eq!(config.upstream_timeout, Duration::from_secs(3));
    assert_eq!(config.byname_concurrency, 1);

    clear_env();
}

#[test]
#[serial]
fn invalid_timeout_is_rejected() {
    clear_env();
    set_env("SPOONACULAR_API_KEY", "abc");
    set_env("UPSTREAM_TIMEOUT_SECS", "soon");

    let err = Config::from_env().unwrap_err();

    assert!(matches!(
        err,
        ConfigError::Invalid { ref key, ref value }
            if key == "UPSTREAM_TIMEOUT_SECS" && value == "soon"
    ));

    clear_env();
}
