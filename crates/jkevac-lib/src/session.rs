//! Planning session: one store, coordinator and presenter per view.
//!
//! A [`Session`] is created when a planning view opens and dropped when it
//! closes. It wires the presenter to the store, loads the districts once, and
//! keeps the user's current [`Selection`].

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::client::RouteService;
use crate::coordinator::{ComputeOutcome, RouteCoordinator};
use crate::model::{HazardType, RouteQuery, Shelter};
use crate::presenter::{PathPresenter, PresenterConfig};
use crate::store::{OrchestrationState, Phase, RouteStore};
use crate::surface::MapSurface;

/// The user's current inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub start: String,
    pub destination: String,
    pub excluded: BTreeSet<HazardType>,
}

impl Selection {
    pub fn new(start: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            destination: destination.into(),
            excluded: BTreeSet::new(),
        }
    }

    /// Flip one hazard exclusion. Returns whether it is now excluded.
    pub fn toggle_hazard(&mut self, hazard: HazardType) -> bool {
        if self.excluded.remove(&hazard) {
            false
        } else {
            self.excluded.insert(hazard);
            true
        }
    }

    /// Preselect the first two districts, when there are at least two.
    pub fn apply_default_districts(&mut self, districts: &[String]) {
        if let [first, second, ..] = districts {
            self.start = first.clone();
            self.destination = second.clone();
        }
    }

    pub fn to_query(&self) -> RouteQuery {
        RouteQuery {
            start: self.start.clone(),
            destination: self.destination.clone(),
            excluded: self.excluded.clone(),
        }
    }
}

/// Summary panel content derived from a store snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RouteInfo {
    Loading,
    Failed {
        message: String,
    },
    Empty,
    Ready {
        cost_km: f64,
        risky_districts: u32,
        path: String,
        shelters: Vec<Shelter>,
    },
}

impl RouteInfo {
    pub fn from_state(state: &OrchestrationState) -> Self {
        if state.is_loading() {
            return RouteInfo::Loading;
        }
        if let Some(message) = state.error() {
            return RouteInfo::Failed {
                message: message.to_string(),
            };
        }
        match state.route() {
            None => RouteInfo::Empty,
            Some(route) => RouteInfo::Ready {
                cost_km: route.total_cost,
                risky_districts: route.risky_node_count,
                path: route.summary_path(),
                shelters: state.shelters().to_vec(),
            },
        }
    }
}

impl fmt::Display for RouteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteInfo::Loading => f.write_str("Computing safest route…"),
            RouteInfo::Failed { message } => f.write_str(message),
            RouteInfo::Empty => f.write_str("No route computed yet"),
            RouteInfo::Ready {
                cost_km,
                risky_districts,
                path,
                ..
            } => write!(
                f,
                "Route Cost: {cost_km} km\nRisky Districts: {risky_districts}\nEvacuation Path: {path}"
            ),
        }
    }
}

/// Everything one planning view needs, with a lifetime bound to the view.
pub struct Session<S: RouteService, M: MapSurface> {
    store: RouteStore,
    coordinator: RouteCoordinator<S>,
    presenter: PathPresenter<M>,
    selection: Selection,
}

impl<S: RouteService, M: MapSurface> Session<S, M> {
    /// Open a session: attach the presenter and load the district list.
    ///
    /// If the districts cannot be loaded the session starts in `Failed`.
    pub async fn start(service: S, surface: M, config: PresenterConfig) -> Self {
        let store = RouteStore::new();
        let mut presenter = PathPresenter::new(surface, config);
        presenter.attach(&store);
        let coordinator = RouteCoordinator::new(service, store.clone());

        let mut selection = Selection::default();
        if coordinator.load_districts().await != ComputeOutcome::Completed(Phase::Failed) {
            selection.apply_default_districts(store.state().districts());
        }

        Self {
            store,
            coordinator,
            presenter,
            selection,
        }
    }

    pub fn store(&self) -> &RouteStore {
        &self.store
    }

    pub fn coordinator(&self) -> &RouteCoordinator<S> {
        &self.coordinator
    }

    pub fn presenter(&self) -> &PathPresenter<M> {
        &self.presenter
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    /// Compute a route for the current selection.
    pub async fn compute(&self) -> ComputeOutcome {
        self.coordinator
            .compute_route(&self.selection.to_query())
            .await
    }

    /// Clear the current result; the presenter clears the map with it.
    pub fn reset(&self) {
        self.coordinator.reset();
    }

    pub fn route_info(&self) -> RouteInfo {
        RouteInfo::from_state(&self.store.state())
    }

    /// End the session, cancelling any running reveal.
    pub fn shutdown(mut self) {
        self.presenter.shutdown();
    }
}

impl<S: RouteService, M: MapSurface> fmt::Debug for Session<S, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("store", &self.store)
            .field("presenter", &self.presenter)
            .field("selection", &self.selection)
            .finish()
    }
}
