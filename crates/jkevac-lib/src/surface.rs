//! Rendering surface abstraction.
//!
//! The map itself (tiles, projections, styling) lives outside this crate. The
//! presenter and display consumers only need the handful of drawing primitives
//! described by [`MapSurface`].

use std::sync::{Arc, Mutex, PoisonError};

use crate::model::LatLon;

/// Default map centre (Jammu & Kashmir).
pub const DEFAULT_CENTER: LatLon = LatLon::new(34.08, 74.8);

/// Default zoom level of the base map.
pub const DEFAULT_ZOOM: u8 = 7;

/// Drawing primitives offered by the map view.
pub trait MapSurface: Send + 'static {
    /// Position the base map.
    fn set_view(&mut self, center: LatLon, zoom: u8);

    /// Draw `points` as one connected line, replacing any previous path.
    fn draw_path(&mut self, points: &[LatLon]);

    /// Remove the drawn path.
    fn clear_path(&mut self);

    /// Place a waypoint marker with label content.
    fn place_marker(&mut self, position: LatLon, label: &str);

    /// Place a distinctly styled shelter marker.
    fn place_shelter(&mut self, position: LatLon, label: &str);

    /// Remove all waypoint and shelter markers.
    fn clear_markers(&mut self);
}

/// One recorded drawing call.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    SetView { center: LatLon, zoom: u8 },
    DrawPath(Vec<LatLon>),
    ClearPath,
    Marker { position: LatLon, label: String },
    Shelter { position: LatLon, label: String },
    ClearMarkers,
}

/// In-memory surface that records every call.
///
/// Clones share the same log, so a test can hand one clone to a presenter and
/// inspect the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    calls: Arc<Mutex<Vec<SurfaceCall>>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call recorded so far, oldest first.
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.log().clone()
    }

    /// Lengths of every path drawn so far, in drawing order.
    pub fn path_lengths(&self) -> Vec<usize> {
        self.log()
            .iter()
            .filter_map(|call| match call {
                SurfaceCall::DrawPath(points) => Some(points.len()),
                _ => None,
            })
            .collect()
    }

    /// The most recently drawn path, or `None` if it was cleared since.
    pub fn current_path(&self) -> Option<Vec<LatLon>> {
        self.log().iter().rev().find_map(|call| match call {
            SurfaceCall::DrawPath(points) => Some(Some(points.clone())),
            SurfaceCall::ClearPath => Some(None),
            _ => None,
        })?
    }

    /// Shelter labels placed since the markers were last cleared.
    pub fn shelter_labels(&self) -> Vec<String> {
        let log = self.log();
        let since_clear = log
            .iter()
            .rposition(|call| matches!(call, SurfaceCall::ClearMarkers))
            .map_or(0, |idx| idx + 1);
        log[since_clear..]
            .iter()
            .filter_map(|call| match call {
                SurfaceCall::Shelter { label, .. } => Some(label.clone()),
                _ => None,
            })
            .collect()
    }

    fn log(&self) -> std::sync::MutexGuard<'_, Vec<SurfaceCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MapSurface for RecordingSurface {
    fn set_view(&mut self, center: LatLon, zoom: u8) {
        self.log().push(SurfaceCall::SetView { center, zoom });
    }

    fn draw_path(&mut self, points: &[LatLon]) {
        self.log().push(SurfaceCall::DrawPath(points.to_vec()));
    }

    fn clear_path(&mut self) {
        self.log().push(SurfaceCall::ClearPath);
    }

    fn place_marker(&mut self, position: LatLon, label: &str) {
        self.log().push(SurfaceCall::Marker {
            position,
            label: label.to_string(),
        });
    }

    fn place_shelter(&mut self, position: LatLon, label: &str) {
        self.log().push(SurfaceCall::Shelter {
            position,
            label: label.to_string(),
        });
    }

    fn clear_markers(&mut self) {
        self.log().push(SurfaceCall::ClearMarkers);
    }
}
