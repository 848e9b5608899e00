use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::AppConfig;
use crate::directory::{build_http_client, endpoint, parse_base};
use crate::errors::{AppError, AppResult};
use crate::location::{LatLng, Location};
use crate::throttle::RateLimiter;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub country: String,
    pub region: String,
    pub city: String,
    pub town: String,
}

impl Address {
    pub fn apply_to(&self, location: &Location, point: LatLng) -> Location {
        Location {
            country: self.country.clone(),
            region: self.region.clone(),
            city: self.city.clone(),
            town: self.town.clone(),
            ..location.with_point(point)
        }
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn forward(&self, query: &str) -> AppResult<Option<LatLng>>;
    async fn reverse(&self, point: LatLng) -> AppResult<Address>;
}

#[derive(Clone)]
pub struct GeocodingService {
    inner: Arc<dyn Geocoder>,
}

impl GeocodingService {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let client = NominatimClient::new(
            build_http_client(config)?,
            &config.geocoder_api_base,
            config.geocoder_api_key.clone(),
            config.geocoder_rate_limit_qps,
        )?;
        Ok(Self {
            inner: Arc::new(client),
        })
    }

    pub fn from_geocoder(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { inner: geocoder }
    }

    pub async fn forward(&self, query: &str) -> AppResult<Option<LatLng>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }
        self.inner.forward(query).await
    }

    pub async fn reverse(&self, point: LatLng) -> AppResult<Address> {
        self.inner.reverse(point).await
    }
}

pub struct NominatimClient {
    http: Client,
    base: Url,
    api_key: Option<SecretString>,
    rate_limiter: RateLimiter,
}

impl NominatimClient {
    pub fn new(
        http: Client,
        base: &str,
        api_key: Option<SecretString>,
        qps: u32,
    ) -> AppResult<Self> {
        Ok(Self {
            http,
            base: parse_base(base)?,
            api_key,
            rate_limiter: RateLimiter::per_second(qps),
        })
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> AppResult<Url> {
        let mut url = endpoint(&self.base, &[path])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("format", "json");
            for (key, value) in params {
                query.append_pair(key, value);
            }
            if let Some(key) = &self.api_key {
                query.append_pair("key", key.expose_secret());
            }
        }
        Ok(url)
    }
}

#[derive(Deserialize)]
struct SearchHit {
    lat: CoordinateValue,
    lon: CoordinateValue,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CoordinateValue {
    Text(String),
    Number(f64),
}

impl CoordinateValue {
    fn value(&self) -> Option<f64> {
        match self {
            CoordinateValue::Text(text) => text.trim().parse().ok(),
            CoordinateValue::Number(value) => Some(*value),
        }
    }
}

#[derive(Deserialize)]
struct ReverseResponse {
    error: Option<String>,
    #[serde(default)]
    address: Option<AddressComponents>,
}

#[derive(Default, Deserialize)]
struct AddressComponents {
    country: Option<String>,
    state: Option<String>,
    province: Option<String>,
    region: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    suburb: Option<String>,
    neighbourhood: Option<String>,
    district: Option<String>,
}

impl AddressComponents {
    fn into_address(self) -> Address {
        Address {
            country: first_present([self.country]),
            region: first_present([self.state, self.province, self.region]),
            city: first_present([self.city, self.town, self.village]),
            town: first_present([self.suburb, self.neighbourhood, self.district]),
        }
    }
}

fn first_present<const N: usize>(candidates: [Option<String>; N]) -> String {
    candidates
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn forward(&self, query: &str) -> AppResult<Option<LatLng>> {
        let url = self.url("search", &[("q", query), ("limit", "1")])?;
        self.rate_limiter.wait().await;
        let hits: Vec<SearchHit> = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let point = hits.first().and_then(|hit| {
            let lat = hit.lat.value()?;
            let lng = hit.lon.value()?;
            LatLng::new(lat, lng)
        });
        if point.is_none() {
            debug!(query, "forward geocode returned no usable match");
        }
        Ok(point)
    }

    async fn reverse(&self, point: LatLng) -> AppResult<Address> {
        let lat = point.lat.to_string();
        let lon = point.lng.to_string();
        let url = self.url("reverse", &[("lat", lat.as_str()), ("lon", lon.as_str())])?;
        self.rate_limiter.wait().await;
        let response: ReverseResponse = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(message) = response.error {
            return Err(AppError::Geocoding(message));
        }
        let address = response.address.unwrap_or_default().into_address();
        trace!(%point, ?address, "reverse geocode resolved");
        Ok(address)
    }
}
