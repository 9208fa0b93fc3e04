//! Animated path presenter.
//!
//! The [`PathPresenter`] follows the store's current route and reveals its
//! waypoints on a [`MapSurface`] one tick at a time instead of drawing the
//! whole line at once.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──new route──▶ Revealing ──cursor == len──▶ Complete
//!   ▲                    │  ▲                         │
//!   └──route cleared─────┘  └──────new route──────────┘
//! ```
//!
//! A reveal is keyed by the route's [`RouteId`], never by value equality. At
//! most one reveal task exists per presenter: the previous one is aborted
//! before a new one is spawned, and every tick re-checks that its route is
//! still current before drawing.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::model::{LatLon, RouteId, RouteResult, Shelter};
use crate::store::{OrchestrationState, RouteStore, Subscription};
use crate::surface::{MapSurface, DEFAULT_CENTER, DEFAULT_ZOOM};

const DEFAULT_TICK: Duration = Duration::from_millis(80);

/// Presentation parameters for the reveal animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenterConfig {
    /// Delay between two revealed waypoints.
    pub tick: Duration,
    /// Reveal waypoints one tick at a time. When off, or when `tick` is zero,
    /// each route is drawn in full at once.
    pub animate: bool,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            animate: true,
        }
    }
}

impl PresenterConfig {
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Draw every route in full as soon as it arrives.
    pub fn immediate() -> Self {
        Self {
            animate: false,
            ..Self::default()
        }
    }

    fn animates(&self) -> bool {
        self.animate && !self.tick.is_zero()
    }
}

/// Where the presenter is in its reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevealPhase {
    /// No route to show.
    #[default]
    Idle,
    /// A timer is extending the drawn prefix.
    Revealing,
    /// The whole route is drawn and no timer is running.
    Complete,
}

/// Marker label for the waypoint at `index` (zero-based).
pub fn waypoint_label(index: usize, position: LatLon) -> String {
    format!(
        "Waypoint {}\nLat: {:.4}\nLon: {:.4}",
        index + 1,
        position.lat,
        position.lon
    )
}

/// Marker label for a shelter.
pub fn shelter_label(shelter: &Shelter) -> String {
    format!(
        "{}\nType: {}\nDistance: {} km",
        shelter.name,
        shelter.category(),
        shelter.distance_km
    )
}

struct RevealState<M> {
    surface: M,
    route: Option<Arc<RouteResult>>,
    cursor: usize,
    task: Option<JoinHandle<()>>,
}

struct Shared<M> {
    state: Mutex<RevealState<M>>,
    phase: watch::Sender<RevealPhase>,
    config: PresenterConfig,
    runtime: Option<Handle>,
}

/// Reveals the current route on a map surface, one waypoint per tick.
pub struct PathPresenter<M: MapSurface> {
    shared: Arc<Shared<M>>,
    subscription: Option<Subscription>,
}

impl<M: MapSurface> PathPresenter<M> {
    /// Create a presenter drawing on `surface`.
    ///
    /// Reveal timers run on the tokio runtime current at construction. Without
    /// one, or with animation disabled, routes are drawn in full immediately.
    pub fn new(mut surface: M, config: PresenterConfig) -> Self {
        surface.set_view(DEFAULT_CENTER, DEFAULT_ZOOM);
        let runtime = if config.animates() {
            let runtime = Handle::try_current().ok();
            if runtime.is_none() {
                warn!("no tokio runtime available; path reveal will not be animated");
            }
            runtime
        } else {
            None
        };
        let (phase, _) = watch::channel(RevealPhase::Idle);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(RevealState {
                    surface,
                    route: None,
                    cursor: 0,
                    task: None,
                }),
                phase,
                config,
                runtime,
            }),
            subscription: None,
        }
    }

    /// Follow `store`: show its current route now and every new one later.
    ///
    /// Attaching again replaces the previous subscription.
    pub fn attach(&mut self, store: &RouteStore) {
        self.shared.show_state(&store.state());
        let shared = Arc::downgrade(&self.shared);
        self.subscription = Some(store.subscribe(move |state| {
            if let Some(shared) = shared.upgrade() {
                shared.show_state(state);
            }
        }));
    }

    /// Stop following the store. The current drawing is left as it is.
    pub fn detach(&mut self) {
        self.subscription = None;
    }

    /// Show `route` directly, bypassing the store.
    pub fn show(&self, route: Option<Arc<RouteResult>>, shelters: &[Shelter]) {
        self.shared.show(route, shelters);
    }

    pub fn phase(&self) -> RevealPhase {
        *self.shared.phase.borrow()
    }

    /// Watch reveal phase changes.
    pub fn phase_changes(&self) -> watch::Receiver<RevealPhase> {
        self.shared.phase.subscribe()
    }

    /// Number of waypoints currently drawn.
    pub fn visible_len(&self) -> usize {
        self.shared.lock().cursor
    }

    /// Identity of the route being shown, if any.
    pub fn route_id(&self) -> Option<RouteId> {
        self.shared.lock().route.as_ref().map(|route| route.id())
    }

    /// Whether a reveal timer is currently alive.
    pub fn has_active_timer(&self) -> bool {
        self.shared
            .lock()
            .task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Resolve once no reveal is in progress.
    pub async fn wait_until_settled(&self) {
        let mut phases = self.shared.phase.subscribe();
        // The sender lives in `self.shared`, so the channel cannot close here.
        let _ = phases
            .wait_for(|phase| *phase != RevealPhase::Revealing)
            .await;
    }

    /// Stop following the store, cancel any running reveal and return to
    /// `Idle`.
    pub fn shutdown(&mut self) {
        self.detach();
        self.shared.stop();
    }
}

impl<M: MapSurface> Drop for PathPresenter<M> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<M: MapSurface> fmt::Debug for PathPresenter<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathPresenter")
            .field("phase", &self.phase())
            .field("visible_len", &self.visible_len())
            .field("attached", &self.subscription.is_some())
            .finish()
    }
}

impl<M: MapSurface> Shared<M> {
    fn lock(&self) -> MutexGuard<'_, RevealState<M>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn show_state(self: &Arc<Self>, state: &OrchestrationState) {
        self.show(state.route().cloned(), state.shelters());
    }

    fn show(self: &Arc<Self>, route: Option<Arc<RouteResult>>, shelters: &[Shelter]) {
        let mut state = self.lock();

        let incoming = route.as_ref().map(|r| r.id());
        let current = state.route.as_ref().map(|r| r.id());
        if incoming == current {
            return;
        }

        if let Some(task) = state.task.take() {
            task.abort();
        }
        state.surface.clear_path();
        state.surface.clear_markers();

        let Some(route) = route else {
            debug!("route cleared; presenter idle");
            state.route = None;
            state.cursor = 0;
            self.phase.send_replace(RevealPhase::Idle);
            return;
        };

        for (index, point) in route.waypoints.iter().enumerate() {
            state.surface.place_marker(*point, &waypoint_label(index, *point));
        }
        for shelter in shelters {
            state
                .surface
                .place_shelter(shelter.position, &shelter_label(shelter));
        }

        let total = route.waypoints.len();
        let id = route.id();
        state.route = Some(Arc::clone(&route));

        if total == 0 {
            state.cursor = 0;
            self.phase.send_replace(RevealPhase::Complete);
            return;
        }

        let cursor = match self.runtime {
            Some(_) => 1,
            None => total,
        };
        state.cursor = cursor;
        state.surface.draw_path(&route.waypoints[..cursor]);

        if cursor >= total {
            self.phase.send_replace(RevealPhase::Complete);
            return;
        }

        if let Some(runtime) = &self.runtime {
            debug!(route = %id, waypoints = total, "starting path reveal");
            let tick = self.config.tick;
            let ticker = interval_at(Instant::now() + tick, tick);
            state.task = Some(runtime.spawn(run_reveal(Arc::downgrade(self), id, ticker)));
            self.phase.send_replace(RevealPhase::Revealing);
        }
    }

    /// Extend the drawn prefix by one waypoint. Returns `false` once the reveal
    /// for `id` is over, either complete or superseded.
    fn advance(&self, id: RouteId) -> bool {
        let mut state = self.lock();
        let Some(route) = state.route.clone() else {
            return false;
        };
        if route.id() != id {
            return false;
        }

        let total = route.waypoints.len();
        state.cursor = (state.cursor + 1).min(total);
        let cursor = state.cursor;
        state.surface.draw_path(&route.waypoints[..cursor]);

        if cursor >= total {
            debug!(route = %id, waypoints = total, "path reveal complete");
            // Detach our own handle; the task ends right after this returns.
            state.task = None;
            self.phase.send_replace(RevealPhase::Complete);
            return false;
        }
        true
    }

    /// Abort any reveal and forget the current route. The surface keeps
    /// whatever was drawn last.
    fn stop(&self) {
        let mut state = self.lock();
        if let Some(task) = state.task.take() {
            task.abort();
        }
        state.route = None;
        state.cursor = 0;
        self.phase.send_replace(RevealPhase::Idle);
    }
}

async fn run_reveal<M: MapSurface>(
    shared: Weak<Shared<M>>,
    id: RouteId,
    mut ticker: tokio::time::Interval,
) {
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(presenter) = shared.upgrade() else {
            return;
        };
        if !presenter.advance(id) {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{RecordingSurface, SurfaceCall};
    use crate::test_helpers::{relief_camp, sample_route};

    fn five_point_route() -> RouteResult {
        RouteResult::new(
            (0..5)
                .map(|i| LatLon::new(34.0 - f64::from(i) * 0.3, 74.8))
                .collect(),
            300.0,
            0,
            vec!["A".into(), "B".into()],
        )
    }

    fn attached() -> (RouteStore, RecordingSurface, PathPresenter<RecordingSurface>) {
        let store = RouteStore::new();
        let surface = RecordingSurface::new();
        let mut presenter = PathPresenter::new(surface.clone(), PresenterConfig::default());
        presenter.attach(&store);
        (store, surface, presenter)
    }

    #[tokio::test(start_paused = true)]
    async fn reveal_grows_one_waypoint_per_tick_then_stops() {
        let (store, surface, presenter) = attached();

        store.set_route(sample_route(), vec![relief_camp()]);
        assert_eq!(presenter.phase(), RevealPhase::Revealing);
        assert_eq!(presenter.visible_len(), 1);

        presenter.wait_until_settled().await;
        assert_eq!(presenter.phase(), RevealPhase::Complete);
        assert_eq!(surface.path_lengths(), vec![1, 2, 3]);
        assert!(!presenter.has_active_timer());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(surface.path_lengths(), vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_follow_configured_interval() {
        let (store, surface, _presenter) = attached();
        store.set_route(five_point_route(), Vec::new());

        tokio::time::sleep(Duration::from_millis(170)).await;
        assert_eq!(surface.path_lengths(), vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn same_identity_does_not_restart_reveal() {
        let (store, surface, presenter) = attached();
        store.set_route(sample_route(), Vec::new());
        presenter.wait_until_settled().await;

        store.set_loading();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(surface.path_lengths(), vec![1, 2, 3]);
        assert_eq!(presenter.phase(), RevealPhase::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn value_equal_route_with_new_identity_restarts() {
        let (store, surface, presenter) = attached();
        store.set_route(sample_route(), Vec::new());
        presenter.wait_until_settled().await;

        store.set_route(sample_route(), Vec::new());
        assert_eq!(presenter.visible_len(), 1);
        presenter.wait_until_settled().await;

        assert_eq!(surface.path_lengths(), vec![1, 2, 3, 1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn replacing_mid_reveal_cancels_previous_timer() {
        let (store, surface, presenter) = attached();
        store.set_route(five_point_route(), Vec::new());
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(presenter.visible_len(), 2);

        let replacement = sample_route();
        let replacement_id = replacement.id();
        store.set_route(replacement, vec![relief_camp()]);
        assert_eq!(presenter.visible_len(), 1);
        assert_eq!(presenter.route_id(), Some(replacement_id));

        presenter.wait_until_settled().await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(surface.path_lengths(), vec![1, 2, 1, 2, 3]);
        assert_eq!(
            surface.shelter_labels(),
            vec!["Relief Camp A\nType: Unknown\nDistance: 2.1 km".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_route_cancels_reveal_and_clears_path() {
        let (store, surface, presenter) = attached();
        store.set_route(five_point_route(), Vec::new());
        tokio::time::sleep(Duration::from_millis(90)).await;

        store.set_error("No path avoiding blocked districts");
        assert_eq!(presenter.phase(), RevealPhase::Idle);
        assert_eq!(presenter.visible_len(), 0);
        assert!(!presenter.has_active_timer());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(surface.current_path(), None);
        assert_eq!(surface.path_lengths(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_presenter_stops_the_timer() {
        let (store, surface, presenter) = attached();
        store.set_route(five_point_route(), Vec::new());
        tokio::time::sleep(Duration::from_millis(90)).await;

        drop(presenter);
        store.set_route(sample_route(), Vec::new());
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(surface.path_lengths(), vec![1, 2]);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_mid_reveal_returns_to_idle() {
        let (store, surface, mut presenter) = attached();
        store.set_route(five_point_route(), Vec::new());
        tokio::time::sleep(Duration::from_millis(90)).await;
        assert_eq!(presenter.phase(), RevealPhase::Revealing);

        presenter.shutdown();

        assert_eq!(presenter.phase(), RevealPhase::Idle);
        assert_eq!(presenter.route_id(), None);
        assert!(!presenter.has_active_timer());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(surface.path_lengths(), vec![1, 2]);
    }

    #[tokio::test]
    async fn single_point_route_completes_without_timer() {
        let (store, surface, presenter) = attached();
        store.set_route(
            RouteResult::new(vec![LatLon::new(32.73, 74.86)], 0.0, 0, vec!["Jammu".into()]),
            Vec::new(),
        );

        assert_eq!(presenter.phase(), RevealPhase::Complete);
        assert!(!presenter.has_active_timer());
        assert_eq!(surface.path_lengths(), vec![1]);
    }

    #[tokio::test]
    async fn empty_route_draws_nothing() {
        let (store, surface, presenter) = attached();
        store.set_route(RouteResult::new(vec![], 0.0, 0, vec![]), Vec::new());

        assert_eq!(presenter.phase(), RevealPhase::Complete);
        assert_eq!(presenter.visible_len(), 0);
        assert!(surface.path_lengths().is_empty());
    }

    #[tokio::test]
    async fn markers_are_placed_for_waypoints_and_shelters() {
        let (store, surface, _presenter) = attached();
        store.set_route(sample_route(), vec![relief_camp()]);

        let calls = surface.calls();
        let markers: Vec<&String> = calls
            .iter()
            .filter_map(|call| match call {
                SurfaceCall::Marker { label, .. } => Some(label),
                _ => None,
            })
            .collect();
        assert_eq!(markers.len(), 3);
        assert_eq!(markers[0], "Waypoint 1\nLat: 34.0800\nLon: 74.8000");
        assert_eq!(surface.shelter_labels().len(), 1);
        assert_eq!(
            calls.first(),
            Some(&SurfaceCall::SetView {
                center: DEFAULT_CENTER,
                zoom: DEFAULT_ZOOM
            })
        );
    }

    #[test]
    fn without_runtime_route_is_drawn_in_full() {
        let store = RouteStore::new();
        let surface = RecordingSurface::new();
        let mut presenter = PathPresenter::new(surface.clone(), PresenterConfig::default());
        presenter.attach(&store);

        store.set_route(sample_route(), Vec::new());

        assert_eq!(presenter.phase(), RevealPhase::Complete);
        assert_eq!(surface.path_lengths(), vec![3]);
    }

    #[tokio::test]
    async fn disabled_animation_draws_in_full_on_a_runtime() {
        for config in [
            PresenterConfig::immediate(),
            PresenterConfig::default().with_tick(Duration::ZERO),
        ] {
            let store = RouteStore::new();
            let surface = RecordingSurface::new();
            let mut presenter = PathPresenter::new(surface.clone(), config);
            presenter.attach(&store);

            store.set_route(sample_route(), Vec::new());

            assert_eq!(presenter.phase(), RevealPhase::Complete);
            assert!(!presenter.has_active_timer());
            assert_eq!(surface.path_lengths(), vec![3]);
        }
    }
}
