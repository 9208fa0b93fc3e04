//! Route request coordination.
//!
//! The [`RouteCoordinator`] turns a [`RouteQuery`] into the two-step remote
//! protocol (route first, then shelters near the destination) and reconciles
//! the outcome into the [`RouteStore`]. It is the only writer of the store.
//!
//! # Supersession
//!
//! Every accepted invocation of [`RouteCoordinator::compute_route`] takes a
//! new generation number. A completion is applied only while its generation is
//! still the latest one issued; otherwise it is dropped without touching the
//! store. The in-flight HTTP request itself is not aborted.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::client::{RouteReply, RouteService};
use crate::model::{RouteQuery, RouteResult, Shelter};
use crate::store::{Phase, RouteStore};

/// Message stored when the route request fails below the domain level.
pub const GENERIC_ROUTE_FAILURE: &str = "Failed to compute route";

/// Message stored when the district list cannot be loaded at session start.
pub const DISTRICTS_LOAD_FAILURE: &str = "Failed to load districts";

/// Number of alternative routes requested from the service.
pub const ROUTE_ALTERNATIVES: usize = 1;

/// Number of shelters requested near the destination.
pub const SHELTER_COUNT: usize = 3;

/// What happened to one `compute_route` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeOutcome {
    /// The query was not ready; nothing was requested and the store is untouched.
    Skipped,
    /// The request finished and the store was moved to the given phase.
    Completed(Phase),
    /// A newer invocation started first; this result was discarded.
    Superseded,
}

/// Issues route and shelter requests and writes their outcome to the store.
pub struct RouteCoordinator<S> {
    service: Arc<S>,
    store: RouteStore,
    generations: Arc<Generations>,
}

/// Generation counter shared by all clones of one coordinator.
#[derive(Default)]
struct Generations {
    latest: AtomicU64,
    // Held across "check generation, then mutate the store". Readers of
    // `latest` never take it, so store subscribers may call `generation()`.
    publish: Mutex<()>,
}

impl<S> Clone for RouteCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            store: self.store.clone(),
            generations: Arc::clone(&self.generations),
        }
    }
}

impl<S: RouteService> RouteCoordinator<S> {
    pub fn new(service: S, store: RouteStore) -> Self {
        Self::from_shared(Arc::new(service), store)
    }

    pub fn from_shared(service: Arc<S>, store: RouteStore) -> Self {
        Self {
            service,
            store,
            generations: Arc::default(),
        }
    }

    pub fn store(&self) -> &RouteStore {
        &self.store
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Latest generation issued so far (0 before the first request).
    pub fn generation(&self) -> u64 {
        self.generations.latest.load(Ordering::SeqCst)
    }

    /// Load the selectable districts at session start.
    ///
    /// A failure leaves the session in `Failed`; there is no retry.
    pub async fn load_districts(&self) -> ComputeOutcome {
        match self.service.districts().await {
            Ok(districts) => {
                info!(count = districts.len(), "districts loaded");
                self.store.set_districts(districts);
                ComputeOutcome::Completed(self.store.state().phase())
            }
            Err(err) => {
                warn!(error = %err, "failed to load districts");
                self.store.set_error(DISTRICTS_LOAD_FAILURE);
                ComputeOutcome::Completed(Phase::Failed)
            }
        }
    }

    /// Compute a route for `query` and publish the result.
    ///
    /// Queries without two distinct endpoints are ignored. Otherwise the store
    /// moves to `Loading` immediately, then to `Ready` or `Failed` when the
    /// remote calls settle, unless a newer invocation started in the meantime.
    pub async fn compute_route(&self, query: &RouteQuery) -> ComputeOutcome {
        if !query.is_ready() {
            debug!(start = %query.start, destination = %query.destination, "route query not ready");
            return ComputeOutcome::Skipped;
        }
        let query = &query.trimmed();

        let generation = self.begin();
        info!(
            generation,
            start = %query.start,
            destination = %query.destination,
            excluded = ?query.excluded,
            "requesting route"
        );

        let route = match self.service.route(query, ROUTE_ALTERNATIVES).await {
            Ok(RouteReply::Found(route)) => route,
            Ok(RouteReply::Rejected(message)) => {
                warn!(generation, error = %message, "route rejected by service");
                return self.commit_error(generation, message);
            }
            Err(err) => {
                warn!(generation, error = %err, "route request failed");
                return self.commit_error(generation, GENERIC_ROUTE_FAILURE.to_string());
            }
        };

        if !self.is_current(generation) {
            debug!(generation, "route superseded before shelter lookup");
            return ComputeOutcome::Superseded;
        }

        let shelters = match self
            .service
            .shelters(&query.destination, SHELTER_COUNT)
            .await
        {
            Ok(shelters) => shelters,
            Err(err) => {
                warn!(
                    generation,
                    error = %err,
                    destination = %query.destination,
                    "shelter lookup failed; publishing route without shelters"
                );
                Vec::new()
            }
        };

        self.commit_route(generation, route, shelters)
    }

    /// Return the store to `Idle`, dropping the current result.
    ///
    /// Requests still in flight are superseded and will not publish.
    pub fn reset(&self) {
        let _publish = self.lock_publish();
        let generation = self.generations.latest.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "resetting route state");
        self.store.reset();
    }

    fn begin(&self) -> u64 {
        let _publish = self.lock_publish();
        let generation = self.generations.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.store.set_loading();
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    fn commit_route(
        &self,
        generation: u64,
        route: RouteResult,
        shelters: Vec<Shelter>,
    ) -> ComputeOutcome {
        let _publish = self.lock_publish();
        let latest = self.generation();
        if latest != generation {
            debug!(generation, latest, "discarding superseded route");
            return ComputeOutcome::Superseded;
        }

        info!(
            generation,
            route = %route.id(),
            waypoints = route.waypoints.len(),
            cost = route.total_cost,
            risky_nodes = route.risky_node_count,
            shelters = shelters.len(),
            "route ready"
        );
        self.store.set_route(route, shelters);
        ComputeOutcome::Completed(Phase::Ready)
    }

    fn commit_error(&self, generation: u64, message: String) -> ComputeOutcome {
        let _publish = self.lock_publish();
        let latest = self.generation();
        if latest != generation {
            debug!(generation, latest, "discarding superseded failure");
            return ComputeOutcome::Superseded;
        }

        self.store.set_error(message);
        ComputeOutcome::Completed(Phase::Failed)
    }

    fn lock_publish(&self) -> MutexGuard<'_, ()> {
        self.generations
            .publish
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S> fmt::Debug for RouteCoordinator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteCoordinator")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
