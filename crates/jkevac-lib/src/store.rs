//! Shared route state store.
//!
//! This module provides the single source of truth for the orchestration state
//! of one planning session. The store is a cheaply cloneable handle: the
//! coordinator holds one to publish transitions, the presenter and any display
//! consumers hold others to read snapshots and subscribe to changes. The
//! mutators are crate-private; outside this crate the store is read-only.
//!
//! # Notification order
//!
//! Every mutation notifies all subscribers synchronously, in registration
//! order, before the mutating call returns. Mutation and notification form one
//! serialized step, so every subscriber sees the same total order of states.
//! Callbacks run outside the state lock and may call [`RouteStore::state`] or
//! `RouteCoordinator::generation`, but must not start or reset a computation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::debug;

use crate::model::{RouteResult, Shelter};

/// Coarse lifecycle of the current computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing has been computed yet (or the session was reset).
    #[default]
    Idle,
    /// A computation is in flight.
    Loading,
    /// The last computation produced a route.
    Ready,
    /// The last computation failed; an error message is present.
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Phase::Idle => "idle",
            Phase::Loading => "loading",
            Phase::Ready => "ready",
            Phase::Failed => "failed",
        };
        f.write_str(value)
    }
}

/// Snapshot of the orchestration state.
///
/// Invariants upheld by the store's mutators:
/// - `Loading` keeps the previous route and shelters untouched.
/// - `Failed` always carries an error message and never a route.
/// - `Ready` always carries a route and never an error message.
#[derive(Debug, Clone, Default)]
pub struct OrchestrationState {
    phase: Phase,
    route: Option<Arc<RouteResult>>,
    shelters: Arc<Vec<Shelter>>,
    error: Option<String>,
    districts: Arc<Vec<String>>,
}

impl OrchestrationState {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    /// The current route, shared by reference so identity survives snapshots.
    pub fn route(&self) -> Option<&Arc<RouteResult>> {
        self.route.as_ref()
    }

    pub fn shelters(&self) -> &[Shelter] {
        &self.shelters
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Selectable districts loaded at session start.
    pub fn districts(&self) -> &[String] {
        &self.districts
    }
}

type Callback = Arc<dyn Fn(&OrchestrationState) + Send + Sync>;

struct StoreInner {
    state: Mutex<OrchestrationState>,
    subscribers: Mutex<Vec<(u64, Callback)>>,
    next_subscriber: AtomicU64,
    // Held across mutate + notify so notifications never interleave.
    publish: Mutex<()>,
}

/// Handle to the shared orchestration state of one session.
#[derive(Clone)]
pub struct RouteStore {
    inner: Arc<StoreInner>,
}

impl RouteStore {
    /// Create a store in the `Idle` phase with no data.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(OrchestrationState::default()),
                subscribers: Mutex::new(Vec::new()),
                next_subscriber: AtomicU64::new(0),
                publish: Mutex::new(()),
            }),
        }
    }

    /// Current snapshot. Never waits on in-flight requests.
    pub fn state(&self) -> OrchestrationState {
        lock(&self.inner.state).clone()
    }

    /// Register a callback invoked after every mutation.
    ///
    /// The callback stays registered until the returned [`Subscription`] is
    /// dropped or cancelled.
    #[must_use = "dropping the subscription unregisters the callback"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&OrchestrationState) + Send + Sync + 'static,
    {
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.subscribers).push((id, Arc::new(callback)));
        Subscription {
            id,
            store: Arc::downgrade(&self.inner),
        }
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.subscribers).len()
    }

    /// Publish a completed route together with its shelters.
    ///
    /// Both fields are replaced in the same step, so no consumer can observe
    /// a new route paired with the previous shelter list.
    pub(crate) fn set_route(&self, route: RouteResult, shelters: Vec<Shelter>) {
        let route = Arc::new(route);
        self.mutate("set_route", move |state| {
            state.phase = Phase::Ready;
            state.route = Some(route);
            state.shelters = Arc::new(shelters);
            state.error = None;
        });
    }

    /// Enter `Loading`, keeping the previous route and shelters visible.
    pub(crate) fn set_loading(&self) {
        self.mutate("set_loading", |state| {
            state.phase = Phase::Loading;
            state.error = None;
        });
    }

    /// Enter `Failed` with `message`, dropping the current route and shelters.
    pub(crate) fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.mutate("set_error", move |state| {
            state.phase = Phase::Failed;
            state.route = None;
            state.shelters = Arc::default();
            state.error = Some(message);
        });
    }

    /// Return to `Idle` and clear all result data.
    pub(crate) fn reset(&self) {
        self.mutate("reset", |state| {
            state.phase = Phase::Idle;
            state.route = None;
            state.shelters = Arc::default();
            state.error = None;
        });
    }

    /// Replace the list of selectable districts. The phase is left unchanged.
    pub(crate) fn set_districts(&self, districts: Vec<String>) {
        self.mutate("set_districts", move |state| {
            state.districts = Arc::new(districts);
        });
    }

    fn mutate<F>(&self, operation: &'static str, apply: F)
    where
        F: FnOnce(&mut OrchestrationState),
    {
        let _publish = lock(&self.inner.publish);

        let snapshot = {
            let mut state = lock(&self.inner.state);
            apply(&mut state);
            state.clone()
        };

        debug!(
            operation,
            phase = %snapshot.phase,
            route = snapshot.route.as_ref().map(|r| r.id().get()),
            shelters = snapshot.shelters.len(),
            "route store updated"
        );

        let callbacks: Vec<Callback> = lock(&self.inner.subscribers)
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(&snapshot);
        }
    }
}

impl Default for RouteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RouteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("RouteStore")
            .field("phase", &state.phase)
            .field("has_route", &state.route.is_some())
            .field("shelters", &state.shelters.len())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Registration handle returned by [`RouteStore::subscribe`].
pub struct Subscription {
    id: u64,
    store: Weak<StoreInner>,
}

impl Subscription {
    /// Unregister the callback now.
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.store.upgrade() {
            lock(&inner.subscribers).retain(|(id, _)| *id != self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
