use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SPOONACULAR_BASE_URL: &str = "https://api.spoonacular.com";
pub const DEFAULT_OPENFOODFACTS_BASE_URL: &str = "https://world.openfoodfacts.org";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub spoonacular_api_key: String,
    pub spoonacular_base_url: String,
    pub openfoodfacts_base_url: String,
    /// Applied to every upstream request.
    pub upstream_timeout: Duration,
    /// Max in-flight detail fetches for a by-name search. 1 keeps it sequential.
    pub byname_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        dotenv().ok(); // Load .env file if present
        Ok(Config {
            spoonacular_api_key: get_env("SPOONACULAR_API_KEY")?,
            spoonacular_base_url: get_env_or_default(
                "SPOONACULAR_BASE_URL",
                DEFAULT_SPOONACULAR_BASE_URL,
            ),
            openfoodfacts_base_url: get_env_or_default(
                "OPENFOODFACTS_BASE_URL",
                DEFAULT_OPENFOODFACTS_BASE_URL,
            ),
            upstream_timeout: Duration::from_secs(parse_env_or_default(
                "UPSTREAM_TIMEOUT_SECS",
                10u64,
            )?),
            byname_concurrency: parse_env_or_default("BYNAME_CONCURRENCY", 1usize)?.max(1),
        })
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Config {
        Config {
            spoonacular_api_key: api_key.into(),
            spoonacular_base_url: DEFAULT_SPOONACULAR_BASE_URL.to_string(),
            openfoodfacts_base_url: DEFAULT_OPENFOODFACTS_BASE_URL.to_string(),
            upstream_timeout: Duration::from_secs(10),
            byname_concurrency: 1,
        }
    }
}

fn get_env(key: &str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key.to_string())),
    }
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env_or_default<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}
