use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use crate::candidates::{Candidate, CandidateList};
use crate::config::AppConfig;
use crate::debounce::Debouncer;
use crate::directory::LocationDirectory;
use crate::errors::AppResult;
use crate::geocoding::GeocodingService;
use crate::geolocation::{Geolocator, UnsupportedGeolocator};
use crate::location::{Axis, LatLng, Level, Location};
use crate::map::{
    ContainerId, ContainerSize, HeadlessMapEngine, MapEngine, MapRegistry, MapStatus, MapSync,
    RetryPolicy,
};
use crate::resolver::{
    CustomKey, Fetch, FetchRequest, LevelView, LocationResolver, ResolverEffect, Ticket,
};

pub trait LocationObserver: Send + Sync {
    fn location_changed(&self, location: &Location);
    fn alert(&self, message: &str);
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    ToggleDropdown(Level),
    ClickOutside,
    Escape,
    SelectCountry(String),
    SelectCandidate { level: Level, candidate: Candidate },
    EditCustom { level: Level, text: String },
    CustomKey { level: Level, key: CustomKey },
    BlurCustom(Level),
    CancelCustom(Level),
    Search(String),
    SetGps { axis: Axis, text: String },
    MapClick(LatLng),
    MyLocation,
    CenterMap,
    RefreshMap,
    ContainerResized(ContainerSize),
}

#[derive(Clone)]
pub struct SessionServices {
    pub directory: LocationDirectory,
    pub geocoder: GeocodingService,
    pub geolocator: Arc<dyn Geolocator>,
    pub engine: Arc<dyn MapEngine>,
    pub registry: MapRegistry,
    pub search_delay: Duration,
    pub map_retry: RetryPolicy,
}

impl SessionServices {
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        Ok(Self {
            directory: LocationDirectory::new(config)?,
            geocoder: GeocodingService::new(config)?,
            geolocator: Arc::new(UnsupportedGeolocator),
            engine: Arc::new(HeadlessMapEngine::new()),
            registry: MapRegistry::new(),
            search_delay: config.search_debounce(),
            map_retry: RetryPolicy::from_config(config),
        })
    }

    pub fn from_env() -> AppResult<Self> {
        crate::init_tracing();
        let config = AppConfig::from_env();
        debug!(config = ?config.public_profile(), "loaded location services config");
        Self::from_config(&config)
    }

    pub fn new(directory: LocationDirectory, geocoder: GeocodingService) -> Self {
        let defaults = AppConfig::default();
        Self {
            directory,
            geocoder,
            geolocator: Arc::new(UnsupportedGeolocator),
            engine: Arc::new(HeadlessMapEngine::new()),
            registry: MapRegistry::new(),
            search_delay: defaults.search_debounce(),
            map_retry: RetryPolicy::from_config(&defaults),
        }
    }

    pub fn with_geolocator(mut self, geolocator: Arc<dyn Geolocator>) -> Self {
        self.geolocator = geolocator;
        self
    }

    pub fn with_engine(mut self, engine: Arc<dyn MapEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_registry(mut self, registry: MapRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_search_delay(mut self, delay: Duration) -> Self {
        self.search_delay = delay;
        self
    }

    pub fn with_map_retry(mut self, policy: RetryPolicy) -> Self {
        self.map_retry = policy;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub levels: Vec<LevelView>,
    pub loading: bool,
    pub search_term: String,
    pub map: MapStatus,
    pub marker: Option<LatLng>,
}

type Lookup = BoxFuture<'static, (Ticket, AppResult<Vec<String>>)>;

pub struct LocationSession {
    resolver: LocationResolver,
    map: MapSync,
    directory: LocationDirectory,
    observer: Arc<dyn LocationObserver>,
    lookups: FuturesUnordered<Lookup>,
    search: Debouncer<String>,
    size: ContainerSize,
}

impl LocationSession {
    pub async fn mount(
        services: SessionServices,
        container: ContainerId,
        size: ContainerSize,
        location: Location,
        observer: Arc<dyn LocationObserver>,
    ) -> Self {
        let SessionServices {
            directory,
            geocoder,
            geolocator,
            engine,
            registry,
            search_delay,
            map_retry,
        } = services;

        let (resolver, effects) = LocationResolver::mount(location.clone());
        let mut map = MapSync::new(container, engine, registry, geocoder, geolocator, map_retry);
        map.set_location(location).await;

        let mut session = Self {
            resolver,
            map,
            directory,
            observer,
            lookups: FuturesUnordered::new(),
            search: Debouncer::new(search_delay),
            size,
        };
        session.run_effects(effects).await;
        if let Some(backfill) = session.map.initialize(size).await {
            session.propose(backfill).await;
        }
        session
    }

    pub fn location(&self) -> &Location {
        self.resolver.location()
    }

    pub fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }

    pub fn map(&self) -> &MapSync {
        &self.map
    }

    pub fn is_loading(&self) -> bool {
        self.resolver.is_loading()
    }

    pub fn pending_lookups(&self) -> usize {
        self.lookups.len()
    }

    pub fn candidates(&self, level: Level) -> CandidateList {
        self.resolver.candidates(level)
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            levels: Level::ALL
                .iter()
                .map(|level| self.resolver.level_view(*level))
                .collect(),
            loading: self.resolver.is_loading(),
            search_term: self.resolver.search_term().to_string(),
            map: self.map.status().clone(),
            marker: self.map.marker(),
        }
    }

    pub async fn apply(&mut self, action: UserAction) {
        match action {
            UserAction::ToggleDropdown(level) => self.resolver.toggle_dropdown(level),
            UserAction::ClickOutside => self.resolver.click_outside(),
            UserAction::Escape => self.resolver.escape(),
            UserAction::SelectCountry(name) => {
                let effects = self.resolver.select_country(&name);
                self.run_effects(effects).await;
            }
            UserAction::SelectCandidate { level, candidate } => {
                let effects = self.resolver.select_candidate(level, &candidate);
                self.run_effects(effects).await;
            }
            UserAction::EditCustom { level, text } => self.resolver.edit_custom(level, &text),
            UserAction::CustomKey { level, key } => {
                let effects = self.resolver.custom_key(level, key);
                self.run_effects(effects).await;
            }
            UserAction::BlurCustom(level) => {
                let effects = self.resolver.blur_custom(level);
                self.run_effects(effects).await;
            }
            UserAction::CancelCustom(level) => self.resolver.cancel_custom(level),
            UserAction::Search(term) => self.search.push(term),
            UserAction::SetGps { axis, text } => {
                let effects = self.resolver.set_gps_field(axis, &text);
                self.run_effects(effects).await;
            }
            UserAction::MapClick(point) => {
                if let Some(next) = self.map.click(point).await {
                    self.propose(next).await;
                }
            }
            UserAction::MyLocation => match self.map.locate_me().await {
                Ok(next) => self.propose(next).await,
                Err(err) => {
                    warn!(?err, "current position unavailable");
                    self.observer.alert(&err.user_message());
                }
            },
            UserAction::CenterMap => {
                if !self.map.center() {
                    debug!("nothing to center on");
                }
            }
            UserAction::RefreshMap => {
                if let Some(backfill) = self.map.refresh(self.size).await {
                    self.propose(backfill).await;
                }
            }
            UserAction::ContainerResized(size) => {
                self.size = size;
                self.map.resize(size);
            }
        }
    }

    pub async fn set_location(&mut self, location: Location) {
        let effects = self.resolver.location_updated(location.clone());
        self.run_effects(effects).await;
        if let Some(backfill) = self.map.set_location(location).await {
            self.propose(backfill).await;
        }
    }

    /// Waits for the next lookup or debounced search and applies it.
    /// Returns false when nothing was pending.
    pub async fn poll_once(&mut self) -> bool {
        tokio::select! {
            Some((ticket, result)) = self.lookups.next(), if !self.lookups.is_empty() => {
                self.resolver.fetch_resolved(ticket, result);
                true
            }
            Some(term) = self.search.fire(), if self.search.is_pending() => {
                debug!(%term, "applying search term");
                self.resolver.set_search_term(&term);
                true
            }
            else => false,
        }
    }

    pub async fn settle(&mut self) {
        while self.poll_once().await {}
    }

    pub fn unmount(&mut self) {
        if self.search.cancel().is_some() {
            debug!("discarded pending search on unmount");
        }
        self.lookups = FuturesUnordered::new();
        self.resolver.abandon_lookups();
        self.map.teardown();
    }

    async fn run_effects(&mut self, effects: Vec<ResolverEffect>) {
        let mut proposal = None;
        for effect in effects {
            match effect {
                ResolverEffect::Fetch(fetch) => self.start_lookup(fetch),
                ResolverEffect::LocationChanged(location) => proposal = Some(location),
            }
        }
        if let Some(location) = proposal {
            self.propose(location).await;
        }
    }

    async fn propose(&mut self, next: Location) {
        let mut next = next;
        loop {
            self.observer.location_changed(&next);
            let effects = self.resolver.location_updated(next.clone());
            for effect in effects {
                if let ResolverEffect::Fetch(fetch) = effect {
                    self.start_lookup(fetch);
                }
            }
            match self.map.set_location(next).await {
                Some(backfill) => next = backfill,
                None => break,
            }
        }
    }

    fn start_lookup(&mut self, fetch: Fetch) {
        let directory = self.directory.clone();
        let Fetch { ticket, request } = fetch;
        debug!(level = %ticket.level, generation = ticket.generation, "starting lookup");
        self.lookups.push(
            async move {
                let result = match request {
                    FetchRequest::Countries => directory
                        .countries()
                        .await
                        .map(|countries| countries.into_iter().map(|c| c.name).collect()),
                    FetchRequest::Regions { country } => directory.regions(&country).await,
                    FetchRequest::Cities { country, region } => {
                        directory.cities(&country, &region).await
                    }
                    FetchRequest::Towns {
                        country,
                        region,
                        city,
                    } => directory.towns(&country, &region, &city).await,
                };
                (ticket, result)
            }
            .boxed(),
        );
    }
}
