//! Remote evacuation service client.
//!
//! The routing and shelter-finding backend is an opaque HTTP service. This
//! module defines the [`RouteService`] seam the coordinator talks to, and
//! [`HttpRouteService`], the `reqwest` implementation of it.
//!
//! Endpoints consumed:
//!
//! - `GET /districts` → `{ "districts": [..] }`
//! - `GET /route?start=..&end=..&k=..[&blocked=..]` → route or `{ "error": ".." }`
//! - `GET /safehouses?district=..&k=..` → `{ "safehouses": [..] }`

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{LatLon, RouteQuery, RouteResult, Shelter};

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Answer to a route request that reached the service.
#[derive(Debug, Clone)]
pub enum RouteReply {
    /// The service found a route.
    Found(RouteResult),
    /// The service answered with a structured error, e.g. no path exists that
    /// avoids the blocked districts.
    Rejected(String),
}

/// Backend operations the coordinator depends on.
///
/// Returned futures are `Send` so a coordinator can be driven from spawned
/// tasks on a multi-threaded runtime.
pub trait RouteService: Send + Sync + 'static {
    /// Fetch the selectable district names.
    fn districts(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Request a route for `query`, asking for `alternatives` candidate paths.
    fn route(
        &self,
        query: &RouteQuery,
        alternatives: usize,
    ) -> impl Future<Output = Result<RouteReply>> + Send;

    /// Fetch up to `count` shelters near `district`.
    fn shelters(
        &self,
        district: &str,
        count: usize,
    ) -> impl Future<Output = Result<Vec<Shelter>>> + Send;
}

/// Connection settings for [`HttpRouteService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the evacuation service, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Timeout applied to each request.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`RouteService`] backed by the evacuation service's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpRouteService {
    client: Client,
    base_url: Url,
}

impl HttpRouteService {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = parse_base_url(&config.base_url)?;
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(user_agent())
            .build()
            .map_err(Error::Http)?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|err| Error::InvalidBaseUrl {
                url: self.base_url.to_string(),
                message: err.to_string(),
            })
    }
}

impl RouteService for HttpRouteService {
    async fn districts(&self) -> Result<Vec<String>> {
        let url = self.endpoint("districts")?;
        debug!(url = %url, "fetching districts");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::UnexpectedStatus {
                endpoint: "districts",
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let wire: DistrictsWire =
            serde_json::from_slice(&body).map_err(|err| Error::decode("districts", err))?;
        Ok(wire.districts)
    }

    async fn route(&self, query: &RouteQuery, alternatives: usize) -> Result<RouteReply> {
        let url = self.endpoint("route")?;
        let params = route_params(query, alternatives);
        debug!(url = %url, ?params, "requesting route");

        let response = self.client.get(url).query(&params).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        match serde_json::from_slice::<RouteWire>(&body) {
            Ok(RouteWire::Rejected { error }) if !error.trim().is_empty() => {
                Ok(RouteReply::Rejected(error))
            }
            _ if !status.is_success() => Err(Error::UnexpectedStatus {
                endpoint: "route",
                status: status.as_u16(),
            }),
            Ok(RouteWire::Found {
                coordinates,
                cost,
                risk_nodes,
                route,
            }) => Ok(RouteReply::Found(RouteResult::new(
                coordinates,
                cost,
                risk_nodes,
                route,
            ))),
            Ok(RouteWire::Rejected { .. }) => {
                Err(Error::decode("route", "error field present but empty"))
            }
            Err(err) => Err(Error::decode("route", err)),
        }
    }

    async fn shelters(&self, district: &str, count: usize) -> Result<Vec<Shelter>> {
        let url = self.endpoint("safehouses")?;
        let params = [("district", district.to_string()), ("k", count.to_string())];
        debug!(url = %url, district, count, "fetching shelters");

        let response = self.client.get(url).query(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::UnexpectedStatus {
                endpoint: "safehouses",
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let wire: SheltersWire =
            serde_json::from_slice(&body).map_err(|err| Error::decode("safehouses", err))?;
        Ok(wire.safehouses.into_iter().map(Shelter::from).collect())
    }
}

/// Query pairs for `/route`: one `blocked` pair per excluded hazard, none when
/// nothing is excluded.
pub(crate) fn route_params(query: &RouteQuery, alternatives: usize) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("start", query.start.clone()),
        ("end", query.destination.clone()),
        ("k", alternatives.to_string()),
    ];
    params.extend(
        query
            .excluded
            .iter()
            .map(|hazard| ("blocked", hazard.as_str().to_string())),
    );
    params
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    // Url::join drops the last path segment unless the base ends with '/'.
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&normalized).map_err(|err| Error::InvalidBaseUrl {
        url: raw.to_string(),
        message: err.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidBaseUrl {
            url: raw.to_string(),
            message: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}

fn user_agent() -> String {
    format!("jkevac-lib/{version}", version = env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize)]
struct DistrictsWire {
    #[serde(default)]
    districts: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RouteWire {
    Rejected {
        error: String,
    },
    Found {
        coordinates: Vec<LatLon>,
        cost: f64,
        risk_nodes: u32,
        route: Vec<String>,
    },
}

#[derive(Debug, Deserialize)]
struct SheltersWire {
    #[serde(default)]
    safehouses: Vec<ShelterWire>,
}

#[derive(Debug, Deserialize)]
struct ShelterWire {
    name: String,
    #[serde(rename = "type", default)]
    category: Option<String>,
    lat: f64,
    lon: f64,
    distance_km: f64,
}

impl From<ShelterWire> for Shelter {
    fn from(wire: ShelterWire) -> Self {
        Shelter {
            name: wire.name,
            category: wire.category,
            position: LatLon::new(wire.lat, wire.lon),
            distance_km: wire.distance_km,
        }
    }
}
