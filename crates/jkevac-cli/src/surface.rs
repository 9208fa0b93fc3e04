//! Terminal rendering surface.
//!
//! Prints each waypoint as the presenter reveals it, so the animated path
//! reads as a growing list of stops.

use std::io::Write;

use jkevac_lib::{LatLon, MapSurface};
use tracing::debug;

use crate::terminal::ColorPalette;

/// A [`MapSurface`] that writes reveal progress as text lines.
pub struct TerminalSurface<W> {
    out: W,
    palette: ColorPalette,
    markers: Vec<String>,
    drawn: usize,
}

impl<W: Write + Send + 'static> TerminalSurface<W> {
    pub fn new(out: W, palette: ColorPalette) -> Self {
        Self {
            out,
            palette,
            markers: Vec::new(),
            drawn: 0,
        }
    }

    /// Number of waypoints printed for the current path.
    pub fn drawn(&self) -> usize {
        self.drawn
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: &str) {
        if let Err(err) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            debug!(error = %err, "failed to write map output");
        }
    }
}

/// Marker labels are multi-line popups; the terminal shows them on one line.
fn one_line(label: &str) -> String {
    label.lines().collect::<Vec<_>>().join("  ")
}

impl<W: Write + Send + 'static> MapSurface for TerminalSurface<W> {
    fn set_view(&mut self, center: LatLon, zoom: u8) {
        debug!(%center, zoom, "map view positioned");
    }

    fn draw_path(&mut self, points: &[LatLon]) {
        if points.len() < self.drawn {
            self.drawn = 0;
        }
        let p = self.palette;
        for index in self.drawn..points.len() {
            let line = match self.markers.get(index) {
                Some(label) => format!("  {}{}{}", p.white_bold, one_line(label), p.reset),
                None => format!("  {}{}{}", p.gray, points[index], p.reset),
            };
            self.emit(&line);
        }
        self.drawn = points.len();
    }

    fn clear_path(&mut self) {
        self.drawn = 0;
    }

    fn place_marker(&mut self, _position: LatLon, label: &str) {
        self.markers.push(label.to_string());
    }

    fn place_shelter(&mut self, _position: LatLon, label: &str) {
        let p = self.palette;
        let line = format!("  {}Shelter{} {}", p.green, p.reset, one_line(label));
        self.emit(&line);
    }

    fn clear_markers(&mut self) {
        self.markers.clear();
    }
}
