use async_trait::async_trait;
use thiserror::Error;

use crate::location::LatLng;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("location permission was denied")]
    PermissionDenied,
    #[error("geolocation is not supported on this device")]
    Unsupported,
    #[error("current position is unavailable: {0}")]
    Unavailable(String),
}

impl GeolocationError {
    pub fn user_message(&self) -> String {
        match self {
            GeolocationError::PermissionDenied => {
                "Location access was denied. Allow location access to use My Location.".to_string()
            }
            GeolocationError::Unsupported => {
                "Your device does not support location services.".to_string()
            }
            GeolocationError::Unavailable(reason) => {
                format!("Unable to determine your location: {reason}")
            }
        }
    }
}

#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(&self) -> Result<LatLng, GeolocationError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedGeolocator;

#[async_trait]
impl Geolocator for UnsupportedGeolocator {
    async fn current_position(&self) -> Result<LatLng, GeolocationError> {
        Err(GeolocationError::Unsupported)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocator(pub LatLng);

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<LatLng, GeolocationError> {
        Ok(self.0)
    }
}
