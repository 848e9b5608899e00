use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::geocoding::GeocodingService;
use crate::geolocation::{GeolocationError, Geolocator};
use crate::location::{LatLng, Location};

pub const WORLD_ZOOM: f64 = 2.0;
pub const FOCUS_ZOOM: f64 = 13.0;
pub const WORLD_CENTER: LatLng = LatLng { lat: 20.0, lng: 0.0 };

const MAX_BACKOFF_EXPONENT: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContainerSize {
    pub width: u32,
    pub height: u32,
}

impl ContainerSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapEngineError {
    #[error("map container {0} has no size")]
    ZeroSizedContainer(ContainerId),
    #[error("map engine unavailable: {0}")]
    Unavailable(String),
}

pub trait MapView: Send {
    fn set_view(&mut self, center: LatLng, zoom: f64);
    fn set_marker(&mut self, point: Option<LatLng>);
    fn invalidate_size(&mut self, size: ContainerSize);
    fn remove(&mut self);
}

pub trait MapEngine: Send + Sync {
    fn create(
        &self,
        container: &ContainerId,
        size: ContainerSize,
    ) -> Result<Box<dyn MapView>, MapEngineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    Created,
    Reused,
}

struct MapSlot {
    view: Box<dyn MapView>,
    holders: usize,
}

/// Container → map instance table. Attaching to a container that already
/// has a view reuses it; the view is removed when its last holder releases.
#[derive(Clone, Default)]
pub struct MapRegistry {
    slots: Arc<Mutex<HashMap<ContainerId, MapSlot>>>,
}

impl MapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(
        &self,
        engine: &dyn MapEngine,
        container: &ContainerId,
        size: ContainerSize,
    ) -> Result<Attachment, MapEngineError> {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(container) {
            slot.holders += 1;
            return Ok(Attachment::Reused);
        }
        let view = engine.create(container, size)?;
        slots.insert(container.clone(), MapSlot { view, holders: 1 });
        Ok(Attachment::Created)
    }

    pub fn with_view<R>(
        &self,
        container: &ContainerId,
        f: impl FnOnce(&mut dyn MapView) -> R,
    ) -> Option<R> {
        let mut slots = self.slots.lock();
        slots.get_mut(container).map(|slot| f(slot.view.as_mut()))
    }

    pub fn release(&self, container: &ContainerId) -> bool {
        let mut slots = self.slots.lock();
        let Some(slot) = slots.get_mut(container) else {
            return false;
        };
        slot.holders = slot.holders.saturating_sub(1);
        if slot.holders > 0 {
            return false;
        }
        if let Some(mut slot) = slots.remove(container) {
            slot.view.remove();
        }
        true
    }

    pub fn is_attached(&self, container: &ContainerId) -> bool {
        self.slots.lock().contains_key(container)
    }

    pub fn holders(&self, container: &ContainerId) -> usize {
        self.slots
            .lock()
            .get(container)
            .map(|slot| slot.holders)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MapStatus {
    Uninitialized,
    Loading {
        attempt: u32,
    },
    Ready,
    #[serde(rename_all = "camelCase")]
    Error {
        attempts: u32,
        message: String,
        auto_retry_exhausted: bool,
    },
}

impl MapStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, MapStatus::Ready)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_retries: config.map_init_max_retries,
            base_backoff: Duration::from_millis(config.map_init_backoff_ms),
        }
    }

    /// `base · 2^(attempt-1)` plus jitter in `[0, base)`.
    pub fn delay(&self, attempt: u32, rng: &mut StdRng) -> Duration {
        let base_ms = u64::try_from(self.base_backoff.as_millis()).unwrap_or(u64::MAX);
        let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        let backoff = Duration::from_millis(base_ms.saturating_mul(1 << exponent));
        let jitter = if base_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rng.gen_range(0..base_ms))
        };
        backoff.saturating_add(jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: WORLD_CENTER,
            zoom: WORLD_ZOOM,
        }
    }
}

pub struct MapSync {
    container: ContainerId,
    engine: Arc<dyn MapEngine>,
    registry: MapRegistry,
    geocoder: GeocodingService,
    geolocator: Arc<dyn Geolocator>,
    policy: RetryPolicy,
    jitter_rng: StdRng,
    status: MapStatus,
    attached: bool,
    size: ContainerSize,
    location: Location,
    marker: Option<LatLng>,
    viewport: Viewport,
    geocoded_query: Option<String>,
}

impl MapSync {
    pub fn new(
        container: ContainerId,
        engine: Arc<dyn MapEngine>,
        registry: MapRegistry,
        geocoder: GeocodingService,
        geolocator: Arc<dyn Geolocator>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            container,
            engine,
            registry,
            geocoder,
            geolocator,
            policy,
            jitter_rng: StdRng::from_entropy(),
            status: MapStatus::Uninitialized,
            attached: false,
            size: ContainerSize::default(),
            location: Location::default(),
            marker: None,
            viewport: Viewport::default(),
            geocoded_query: None,
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.jitter_rng = rng;
        self
    }

    pub fn container(&self) -> &ContainerId {
        &self.container
    }

    pub fn status(&self) -> &MapStatus {
        &self.status
    }

    pub fn marker(&self) -> Option<LatLng> {
        self.marker
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub async fn initialize(&mut self, size: ContainerSize) -> Option<Location> {
        self.size = size;
        if self.attached && self.status.is_ready() {
            return None;
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            self.status = MapStatus::Loading { attempt };
            match self.attach() {
                Ok(()) => break,
                Err(err) if attempt <= self.policy.max_retries => {
                    let delay = self.policy.delay(attempt, &mut self.jitter_rng);
                    warn!(
                        ?err,
                        attempt,
                        container = %self.container,
                        "map init failed; retrying after {:?}",
                        delay
                    );
                    sleep(delay).await;
                }
                Err(err) => {
                    warn!(?err, attempt, container = %self.container, "map init gave up");
                    self.status = MapStatus::Error {
                        attempts: attempt,
                        message: err.to_string(),
                        auto_retry_exhausted: true,
                    };
                    return None;
                }
            }
        }

        info!(container = %self.container, attempts = attempt, "map ready");
        self.status = MapStatus::Ready;
        self.relayout();
        self.sync_location().await
    }

    pub async fn refresh(&mut self, size: ContainerSize) -> Option<Location> {
        if self.status.is_ready() {
            self.resize(size);
            return None;
        }
        self.initialize(size).await
    }

    pub fn resize(&mut self, size: ContainerSize) {
        self.size = size;
        if self.status.is_ready() {
            self.relayout();
        }
    }

    pub async fn set_location(&mut self, location: Location) -> Option<Location> {
        self.location = location;
        if !self.status.is_ready() {
            return None;
        }
        self.sync_location().await
    }

    pub async fn click(&mut self, point: LatLng) -> Option<Location> {
        if !self.status.is_ready() {
            debug!(%point, "ignoring click before the map is ready");
            return None;
        }
        Some(self.pin(point).await)
    }

    pub async fn locate_me(&mut self) -> Result<Location, GeolocationError> {
        let point = self.geolocator.current_position().await?;
        self.set_view(point, FOCUS_ZOOM.max(self.viewport.zoom));
        Ok(self.pin(point).await)
    }

    pub fn center(&mut self) -> bool {
        match self.location.gps_coordinates.point() {
            Some(point) => {
                self.set_view(point, self.viewport.zoom);
                true
            }
            None => false,
        }
    }

    pub fn teardown(&mut self) {
        if self.attached {
            let removed = self.registry.release(&self.container);
            debug!(container = %self.container, removed, "map released");
            self.attached = false;
        }
        self.status = MapStatus::Uninitialized;
    }

    fn attach(&mut self) -> Result<(), MapEngineError> {
        if self.attached {
            return Ok(());
        }
        let attachment = self
            .registry
            .attach(self.engine.as_ref(), &self.container, self.size)?;
        debug!(container = %self.container, ?attachment, "map attached");
        self.attached = true;
        Ok(())
    }

    async fn sync_location(&mut self) -> Option<Location> {
        if let Some(point) = self.location.gps_coordinates.point() {
            self.geocoded_query = None;
            self.set_marker(Some(point));
            self.set_view(point, FOCUS_ZOOM);
            return None;
        }
        if !self.location.gps_coordinates.is_unset() {
            // Half-typed coordinates: leave the marker where it is.
            return None;
        }

        let query = self.location.geocode_query()?;
        if self.geocoded_query.as_deref() == Some(query.as_str()) {
            return None;
        }
        self.geocoded_query = Some(query.clone());

        match self.geocoder.forward(&query).await {
            Ok(Some(point)) => {
                self.set_marker(Some(point));
                self.set_view(point, FOCUS_ZOOM);
                let next = self.location.with_point(point);
                self.location = next.clone();
                Some(next)
            }
            Ok(None) => {
                debug!(%query, "no coordinates found for location");
                None
            }
            Err(err) => {
                warn!(?err, %query, "forward geocode failed");
                None
            }
        }
    }

    async fn pin(&mut self, point: LatLng) -> Location {
        self.set_marker(Some(point));
        let next = match self.geocoder.reverse(point).await {
            Ok(address) => address.apply_to(&self.location, point),
            Err(err) => {
                warn!(?err, %point, "reverse geocode failed; keeping place names");
                self.location.with_point(point)
            }
        };
        self.location = next.clone();
        self.geocoded_query = None;
        next
    }

    fn set_marker(&mut self, point: Option<LatLng>) {
        self.marker = point;
        if self.attached {
            self.registry
                .with_view(&self.container, |view| view.set_marker(point));
        }
    }

    fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.viewport = Viewport { center, zoom };
        if self.attached {
            self.registry
                .with_view(&self.container, |view| view.set_view(center, zoom));
        }
    }

    fn relayout(&mut self) {
        let size = self.size;
        let viewport = self.viewport;
        let marker = self.marker;
        self.registry.with_view(&self.container, |view| {
            view.invalidate_size(size);
            view.set_view(viewport.center, viewport.zoom);
            view.set_marker(marker);
        });
    }
}

impl Drop for MapSync {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSnapshot {
    pub center: LatLng,
    pub zoom: f64,
    pub marker: Option<LatLng>,
    pub size: ContainerSize,
    pub relayouts: u32,
    pub removed: bool,
}

#[derive(Default)]
struct HeadlessState {
    snapshots: HashMap<ContainerId, MapSnapshot>,
    created: usize,
    failures_remaining: u32,
}

#[derive(Clone, Default)]
pub struct HeadlessMapEngine {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessMapEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, count: u32) {
        self.state.lock().failures_remaining = count;
    }

    pub fn snapshot(&self, container: &ContainerId) -> Option<MapSnapshot> {
        self.state.lock().snapshots.get(container).cloned()
    }

    pub fn instances_created(&self) -> usize {
        self.state.lock().created
    }
}

impl MapEngine for HeadlessMapEngine {
    fn create(
        &self,
        container: &ContainerId,
        size: ContainerSize,
    ) -> Result<Box<dyn MapView>, MapEngineError> {
        if size.is_zero() {
            return Err(MapEngineError::ZeroSizedContainer(container.clone()));
        }
        let mut state = self.state.lock();
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(MapEngineError::Unavailable("engine still loading".into()));
        }
        state.created += 1;
        state.snapshots.insert(
            container.clone(),
            MapSnapshot {
                center: WORLD_CENTER,
                zoom: WORLD_ZOOM,
                marker: None,
                size,
                relayouts: 0,
                removed: false,
            },
        );
        Ok(Box::new(HeadlessView {
            container: container.clone(),
            state: self.state.clone(),
        }))
    }
}

struct HeadlessView {
    container: ContainerId,
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessView {
    fn update(&self, f: impl FnOnce(&mut MapSnapshot)) {
        if let Some(snapshot) = self.state.lock().snapshots.get_mut(&self.container) {
            f(snapshot);
        }
    }
}

impl MapView for HeadlessView {
    fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.update(|snapshot| {
            snapshot.center = center;
            snapshot.zoom = zoom;
        });
    }

    fn set_marker(&mut self, point: Option<LatLng>) {
        self.update(|snapshot| snapshot.marker = point);
    }

    fn invalidate_size(&mut self, size: ContainerSize) {
        self.update(|snapshot| {
            snapshot.size = size;
            snapshot.relayouts += 1;
        });
    }

    fn remove(&mut self) {
        self.update(|snapshot| {
            snapshot.removed = true;
            snapshot.marker = None;
        });
    }
}
