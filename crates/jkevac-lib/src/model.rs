//! Domain types shared by the store, coordinator and presenter.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Name shown for a shelter whose category the service did not report.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// A geographic coordinate pair.
///
/// On the wire a coordinate is the two-element array `[lat, lon]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<[f64; 2]> for LatLon {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

impl From<LatLon> for [f64; 2] {
    fn from(value: LatLon) -> Self {
        [value.lat, value.lon]
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lat: {:.4}, Lon: {:.4}", self.lat, self.lon)
    }
}

/// Hazard categories the route computation can be asked to avoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HazardType {
    Flood,
    Landslide,
    Earthquake,
}

impl HazardType {
    /// Every hazard the service understands, in display order.
    pub const ALL: [HazardType; 3] = [
        HazardType::Flood,
        HazardType::Landslide,
        HazardType::Earthquake,
    ];

    /// Wire tag sent as a `blocked` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            HazardType::Flood => "flood",
            HazardType::Landslide => "landslide",
            HazardType::Earthquake => "earthquake",
        }
    }
}

impl fmt::Display for HazardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HazardType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flood" => Ok(HazardType::Flood),
            "landslide" => Ok(HazardType::Landslide),
            "earthquake" => Ok(HazardType::Earthquake),
            other => Err(format!(
                "unknown hazard type '{other}'; expected one of: flood, landslide, earthquake"
            )),
        }
    }
}

/// A single route computation request, built fresh from the current selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteQuery {
    pub start: String,
    pub destination: String,
    pub excluded: BTreeSet<HazardType>,
}

impl RouteQuery {
    pub fn new(start: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            destination: destination.into(),
            excluded: BTreeSet::new(),
        }
    }

    /// Builder-style helper adding one hazard exclusion.
    pub fn excluding(mut self, hazard: HazardType) -> Self {
        self.excluded.insert(hazard);
        self
    }

    /// A query is ready when both ends are selected and they differ.
    ///
    /// Queries that are not ready are silently ignored by the coordinator.
    pub fn is_ready(&self) -> bool {
        let start = self.start.trim();
        let destination = self.destination.trim();
        !start.is_empty() && !destination.is_empty() && start != destination
    }

    /// Copy with surrounding whitespace removed from both district names.
    pub fn trimmed(&self) -> Self {
        Self {
            start: self.start.trim().to_string(),
            destination: self.destination.trim().to_string(),
            excluded: self.excluded.clone(),
        }
    }
}

/// Identity of one completed route computation.
///
/// Two results never share an id, even when every other field is equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteId(u64);

static NEXT_ROUTE_ID: AtomicU64 = AtomicU64::new(1);

impl RouteId {
    pub(crate) fn next() -> Self {
        RouteId(NEXT_ROUTE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "route-{}", self.0)
    }
}

/// Immutable result of a successful route computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteResult {
    #[serde(skip)]
    id: RouteId,
    pub waypoints: Vec<LatLon>,
    pub total_cost: f64,
    pub risky_node_count: u32,
    pub labels: Vec<String>,
}

impl RouteResult {
    /// Create a result with a fresh identity.
    pub fn new(
        waypoints: Vec<LatLon>,
        total_cost: f64,
        risky_node_count: u32,
        labels: Vec<String>,
    ) -> Self {
        Self {
            id: RouteId::next(),
            waypoints,
            total_cost,
            risky_node_count,
            labels,
        }
    }

    pub fn id(&self) -> RouteId {
        self.id
    }

    /// Place names joined in travel order, e.g. `Srinagar → Ramban → Jammu`.
    pub fn summary_path(&self) -> String {
        self.labels.join(" → ")
    }
}

/// A shelter close to the current destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shelter {
    pub name: String,
    pub category: Option<String>,
    pub position: LatLon,
    pub distance_km: f64,
}

impl Shelter {
    /// Category label, falling back to `Unknown` when the service omits it.
    pub fn category(&self) -> &str {
        self.category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(UNKNOWN_CATEGORY)
    }
}
