use thiserror::Error;

use crate::geolocation::GeolocationError;
use crate::map::MapEngineError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Config(String),
    #[error("lookup failed: {0}")]
    Lookup(String),
    #[error("geocoding failed: {0}")]
    Geocoding(String),
    #[error(transparent)]
    MapEngine(#[from] MapEngineError),
    #[error(transparent)]
    Geolocation(#[from] GeolocationError),
}
