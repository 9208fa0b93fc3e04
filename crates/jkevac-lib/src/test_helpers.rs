//! Shared fixtures for unit tests.
//!
//! The values mirror the Srinagar → Jammu example used throughout the tests:
//! three waypoints, one risky node and a single relief camp near the
//! destination.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::client::{RouteReply, RouteService};
use crate::error::{Error, Result};
use crate::model::{LatLon, RouteQuery, RouteResult, Shelter};

pub fn sample_route() -> RouteResult {
    RouteResult::new(
        vec![
            LatLon::new(34.08, 74.8),
            LatLon::new(33.5, 75.1),
            LatLon::new(32.73, 74.86),
        ],
        262.0,
        1,
        vec!["Srinagar".into(), "Ramban".into(), "Jammu".into()],
    )
}

pub fn relief_camp() -> Shelter {
    Shelter {
        name: "Relief Camp A".into(),
        category: None,
        position: LatLon::new(32.7, 74.8),
        distance_km: 2.1,
    }
}

/// What a scripted call should produce.
#[derive(Clone)]
pub enum Scripted<T> {
    Ok(T),
    TransportError,
}

impl<T: Clone> Scripted<T> {
    fn resolve(&self, endpoint: &'static str) -> Result<T> {
        match self {
            Scripted::Ok(value) => Ok(value.clone()),
            Scripted::TransportError => Err(Error::UnexpectedStatus {
                endpoint,
                status: 503,
            }),
        }
    }
}

/// Route service whose answers and latencies are queued up front.
///
/// Route replies are popped in call order; shelter replies are keyed by
/// district and may be reused. Latency uses `tokio::time::sleep`, so tests running on a paused
/// clock can control which request finishes first.
#[derive(Clone, Default)]
pub struct ScriptedService {
    inner: Arc<Mutex<ScriptedInner>>,
}

#[derive(Default)]
struct ScriptedInner {
    districts: Option<Scripted<Vec<String>>>,
    routes: VecDeque<(Duration, Scripted<RouteReply>)>,
    shelters: HashMap<String, (Duration, Scripted<Vec<Shelter>>)>,
    route_calls: Vec<RouteQuery>,
    shelter_calls: Vec<(String, usize)>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_districts(self, districts: Scripted<Vec<String>>) -> Self {
        self.inner.lock().unwrap().districts = Some(districts);
        self
    }

    pub fn push_route(self, delay: Duration, reply: Scripted<RouteReply>) -> Self {
        self.inner.lock().unwrap().routes.push_back((delay, reply));
        self
    }

    pub fn with_shelters(self, district: &str, reply: Scripted<Vec<Shelter>>) -> Self {
        self.with_slow_shelters(district, Duration::ZERO, reply)
    }

    pub fn with_slow_shelters(
        self,
        district: &str,
        delay: Duration,
        reply: Scripted<Vec<Shelter>>,
    ) -> Self {
        self.inner
            .lock()
            .unwrap()
            .shelters
            .insert(district.to_string(), (delay, reply));
        self
    }

    pub fn route_calls(&self) -> Vec<RouteQuery> {
        self.inner.lock().unwrap().route_calls.clone()
    }

    pub fn shelter_calls(&self) -> Vec<(String, usize)> {
        self.inner.lock().unwrap().shelter_calls.clone()
    }
}

impl RouteService for ScriptedService {
    async fn districts(&self) -> Result<Vec<String>> {
        let scripted = self
            .inner
            .lock()
            .unwrap()
            .districts
            .clone()
            .unwrap_or(Scripted::Ok(Vec::new()));
        scripted.resolve("districts")
    }

    async fn route(&self, query: &RouteQuery, _alternatives: usize) -> Result<RouteReply> {
        let (delay, reply) = {
            let mut inner = self.inner.lock().unwrap();
            inner.route_calls.push(query.clone());
            inner
                .routes
                .pop_front()
                .expect("unexpected route call: no scripted reply left")
        };
        tokio::time::sleep(delay).await;
        reply.resolve("route")
    }

    async fn shelters(&self, district: &str, count: usize) -> Result<Vec<Shelter>> {
        let (delay, reply) = {
            let mut inner = self.inner.lock().unwrap();
            inner.shelter_calls.push((district.to_string(), count));
            inner
                .shelters
                .get(district)
                .cloned()
                .unwrap_or((Duration::ZERO, Scripted::Ok(Vec::new())))
        };
        tokio::time::sleep(delay).await;
        reply.resolve("safehouses")
    }
}
