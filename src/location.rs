use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return None;
        }
        Some(Self { lat, lng })
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Lat,
    Lng,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpsCoordinates {
    #[serde(default)]
    pub lat: String,
    #[serde(default)]
    pub lng: String,
}

impl GpsCoordinates {
    pub fn new(lat: impl Into<String>, lng: impl Into<String>) -> Self {
        Self {
            lat: lat.into(),
            lng: lng.into(),
        }
    }

    pub fn from_point(point: LatLng) -> Self {
        Self {
            lat: point.lat.to_string(),
            lng: point.lng.to_string(),
        }
    }

    pub fn is_unset(&self) -> bool {
        self.lat.trim().is_empty() && self.lng.trim().is_empty()
    }

    pub fn point(&self) -> Option<LatLng> {
        let lat = self.lat.trim().parse::<f64>().ok()?;
        let lng = self.lng.trim().parse::<f64>().ok()?;
        LatLng::new(lat, lng)
    }

    pub fn get(&self, axis: Axis) -> &str {
        match axis {
            Axis::Lat => &self.lat,
            Axis::Lng => &self.lng,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Country,
    Region,
    City,
    Town,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Country, Level::Region, Level::City, Level::Town];
    pub const DEPENDENT: [Level; 3] = [Level::Region, Level::City, Level::Town];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Country => "country",
            Level::Region => "region",
            Level::City => "city",
            Level::Town => "town",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Level::Country => "Country",
            Level::Region => "Region",
            Level::City => "City",
            Level::Town => "Town",
        }
    }

    pub fn placeholder(&self) -> &'static str {
        match self {
            Level::Country => "Select Country",
            Level::Region => "Select Region",
            Level::City => "Select City",
            Level::Town => "Select Town",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Level::Country => 0,
            Level::Region => 1,
            Level::City => 2,
            Level::Town => 3,
        }
    }

    pub fn parent(&self) -> Option<Level> {
        match self {
            Level::Country => None,
            Level::Region => Some(Level::Country),
            Level::City => Some(Level::Region),
            Level::Town => Some(Level::City),
        }
    }

    pub fn descendants(&self) -> &'static [Level] {
        match self {
            Level::Country => &Level::DEPENDENT,
            Level::Region => &[Level::City, Level::Town],
            Level::City => &[Level::Town],
            Level::Town => &[],
        }
    }

    pub fn accepts_custom(&self) -> bool {
        !matches!(self, Level::Country)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub town: String,
    #[serde(default)]
    pub gps_coordinates: GpsCoordinates,
}

impl Location {
    pub fn get(&self, level: Level) -> &str {
        match level {
            Level::Country => &self.country,
            Level::Region => &self.region,
            Level::City => &self.city,
            Level::Town => &self.town,
        }
    }

    fn slot_mut(&mut self, level: Level) -> &mut String {
        match level {
            Level::Country => &mut self.country,
            Level::Region => &mut self.region,
            Level::City => &mut self.city,
            Level::Town => &mut self.town,
        }
    }

    /// Sets `level` and clears every level below it. Coordinates are kept.
    pub fn with_level(&self, level: Level, value: impl Into<String>) -> Location {
        let mut next = self.clone();
        *next.slot_mut(level) = value.into();
        for child in level.descendants() {
            next.slot_mut(*child).clear();
        }
        next
    }

    pub fn with_coordinates(&self, coordinates: GpsCoordinates) -> Location {
        Location {
            gps_coordinates: coordinates,
            ..self.clone()
        }
    }

    pub fn with_point(&self, point: LatLng) -> Location {
        self.with_coordinates(GpsCoordinates::from_point(point))
    }

    pub fn with_gps_field(&self, axis: Axis, text: impl Into<String>) -> Location {
        let mut next = self.clone();
        match axis {
            Axis::Lat => next.gps_coordinates.lat = text.into(),
            Axis::Lng => next.gps_coordinates.lng = text.into(),
        }
        next
    }

    pub fn has_place_names(&self) -> bool {
        [&self.country, &self.region, &self.city]
            .iter()
            .any(|value| !value.trim().is_empty())
    }

    pub fn geocode_query(&self) -> Option<String> {
        let segments = [&self.city, &self.region, &self.country]
            .into_iter()
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .collect::<Vec<_>>();
        if segments.is_empty() {
            None
        } else {
            Some(segments.join(", "))
        }
    }
}
