//! jkevac library entry points.
//!
//! This crate holds the client-side control logic of the evacuation route
//! planner: a shared [`RouteStore`] describing the current orchestration state,
//! a [`RouteCoordinator`] that sequences the route and shelter requests against
//! the remote service, and a [`PathPresenter`] that reveals the computed path on
//! a [`MapSurface`] one waypoint at a time. Front ends (the CLI, or any other
//! renderer) should only depend on the items exported here.
//!

#![deny(warnings)]

pub mod client;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod model;
pub mod presenter;
pub mod session;
pub mod store;
pub mod surface;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use client::{ClientConfig, HttpRouteService, RouteReply, RouteService};
pub use coordinator::{
    ComputeOutcome, RouteCoordinator, DISTRICTS_LOAD_FAILURE, GENERIC_ROUTE_FAILURE,
    ROUTE_ALTERNATIVES, SHELTER_COUNT,
};
pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use model::{HazardType, LatLon, RouteId, RouteQuery, RouteResult, Shelter};
pub use presenter::{PathPresenter, PresenterConfig, RevealPhase};
pub use session::{RouteInfo, Selection, Session};
pub use store::{OrchestrationState, Phase, RouteStore, Subscription};
pub use surface::{MapSurface, RecordingSurface, SurfaceCall, DEFAULT_CENTER, DEFAULT_ZOOM};
