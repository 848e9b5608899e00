use std::time::Duration;
use std::{env, io};

use secrecy::SecretString;
use serde::Serialize;
use tracing::debug;

pub const DEFAULT_COUNTRIES_API_BASE: &str = "https://restcountries.com/v3.1";
pub const DEFAULT_SUBDIVISIONS_API_BASE: &str = "https://countriesnow.space/api/v0.1";
pub const DEFAULT_GEOCODER_API_BASE: &str = "https://nominatim.openstreetmap.org";

const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
const DEFAULT_MAP_INIT_MAX_RETRIES: u32 = 3;
const DEFAULT_MAP_INIT_BACKOFF_MS: u64 = 250;
const MAX_MAP_INIT_BACKOFF_MS: u64 = 60_000;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub countries_api_base: String,
    pub subdivisions_api_base: String,
    pub geocoder_api_base: String,
    pub geocoder_api_key: Option<SecretString>,
    pub geocoder_rate_limit_qps: u32,
    pub http_timeout_ms: u64,
    pub search_debounce_ms: u64,
    pub map_init_max_retries: u32,
    pub map_init_backoff_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct PublicAppConfig {
    pub countries_api_base: String,
    pub subdivisions_api_base: String,
    pub geocoder_api_base: String,
    pub has_geocoder_key: bool,
    pub geocoder_rate_limit_qps: u32,
    pub http_timeout_ms: u64,
    pub search_debounce_ms: u64,
    pub map_init_max_retries: u32,
    pub map_init_backoff_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            countries_api_base: DEFAULT_COUNTRIES_API_BASE.to_string(),
            subdivisions_api_base: DEFAULT_SUBDIVISIONS_API_BASE.to_string(),
            geocoder_api_base: DEFAULT_GEOCODER_API_BASE.to_string(),
            geocoder_api_key: None,
            geocoder_rate_limit_qps: 1,
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            map_init_max_retries: DEFAULT_MAP_INIT_MAX_RETRIES,
            map_init_backoff_ms: DEFAULT_MAP_INIT_BACKOFF_MS,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        load_dotenv_if_applicable();
        let defaults = Self::default();
        Self {
            countries_api_base: parse_string("COUNTRIES_API_BASE", defaults.countries_api_base),
            subdivisions_api_base: parse_string(
                "SUBDIVISIONS_API_BASE",
                defaults.subdivisions_api_base,
            ),
            geocoder_api_base: parse_string("GEOCODER_API_BASE", defaults.geocoder_api_base),
            geocoder_api_key: env::var("GEOCODER_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from),
            geocoder_rate_limit_qps: parse_u32(
                "GEOCODER_RATE_LIMIT_QPS",
                defaults.geocoder_rate_limit_qps,
            )
            .max(1),
            http_timeout_ms: parse_u64("HTTP_TIMEOUT_MS", defaults.http_timeout_ms),
            search_debounce_ms: parse_u64("SEARCH_DEBOUNCE_MS", defaults.search_debounce_ms),
            map_init_max_retries: parse_u32("MAP_INIT_MAX_RETRIES", defaults.map_init_max_retries),
            map_init_backoff_ms: parse_u64("MAP_INIT_BACKOFF_MS", defaults.map_init_backoff_ms)
                .min(MAX_MAP_INIT_BACKOFF_MS),
        }
    }

    pub fn public_profile(&self) -> PublicAppConfig {
        PublicAppConfig {
            countries_api_base: self.countries_api_base.clone(),
            subdivisions_api_base: self.subdivisions_api_base.clone(),
            geocoder_api_base: self.geocoder_api_base.clone(),
            has_geocoder_key: self.geocoder_api_key.is_some(),
            geocoder_rate_limit_qps: self.geocoder_rate_limit_qps,
            http_timeout_ms: self.http_timeout_ms,
            search_debounce_ms: self.search_debounce_ms,
            map_init_max_retries: self.map_init_max_retries,
            map_init_backoff_ms: self.map_init_backoff_ms,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms.max(1))
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn user_agent(&self) -> String {
        format!("site-locator/{}", env!("CARGO_PKG_VERSION"))
    }
}

fn load_dotenv_if_applicable() {
    if !should_load_dotenv() {
        debug!("skipping .env load outside dev mode");
        return;
    }

    if let Err(err) = dotenvy::dotenv() {
        match &err {
            dotenvy::Error::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound => {}
            _ => debug!(?err, "unable to load .env file"),
        }
    }
}

fn should_load_dotenv() -> bool {
    cfg!(debug_assertions) || parse_bool("ALLOW_DOTENV", false)
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(default)
}

fn parse_string(key: &str, default: String) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}

fn parse_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(default)
}
