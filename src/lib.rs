pub mod candidates;
pub mod config;
pub mod debounce;
pub mod directory;
pub mod errors;
pub mod geocoding;
pub mod geolocation;
pub mod location;
pub mod map;
pub mod resolver;
pub mod session;
pub mod throttle;

use once_cell::sync::OnceCell;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use crate::candidates::{Candidate, CandidateKind, CandidateList, CUSTOM_OPTION};
pub use crate::config::{AppConfig, PublicAppConfig};
pub use crate::directory::{
    Country, CountryDirectory, LocationDirectory, NoTownDirectory, SubdivisionDirectory,
    TownDirectory,
};
pub use crate::errors::{AppError, AppResult};
pub use crate::geocoding::{Address, Geocoder, GeocodingService};
pub use crate::geolocation::{GeolocationError, Geolocator};
pub use crate::location::{Axis, GpsCoordinates, LatLng, Level, Location};
pub use crate::map::{
    ContainerId, ContainerSize, HeadlessMapEngine, MapEngine, MapRegistry, MapStatus, MapSync,
    MapView,
};
pub use crate::resolver::{CustomKey, DropdownState, LocationResolver};
pub use crate::session::{
    LocationObserver, LocationSession, SessionServices, SessionView, UserAction,
};

pub fn init_tracing() {
    static INIT: OnceCell<()> = OnceCell::new();
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,site_locator=debug"));
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init();
    });
}
