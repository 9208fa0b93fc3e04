//! Output formatting for districts and route results.

use std::io::{self, Write};

use clap::ValueEnum;
use jkevac_lib::RouteInfo;
use serde::Serialize;

use crate::terminal::ColorPalette;

/// How results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with the animated path reveal.
    #[default]
    Text,
    /// A single JSON document, no animation output.
    Json,
}

#[derive(Serialize)]
struct DistrictsDocument<'a> {
    districts: &'a [String],
}

/// Render the district list.
///
/// # Errors
///
/// Returns an error if JSON serialization or writing fails.
pub fn render_districts<W: Write>(
    out: &mut W,
    districts: &[String],
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => {
            for district in districts {
                writeln!(out, "{district}")?;
            }
            Ok(())
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &DistrictsDocument { districts })?;
            writeln!(out)
        }
    }
}

/// Render the route summary panel.
///
/// # Errors
///
/// Returns an error if JSON serialization or writing fails.
pub fn render_route_info<W: Write>(
    out: &mut W,
    info: &RouteInfo,
    format: OutputFormat,
    palette: ColorPalette,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, info)?;
            writeln!(out)
        }
        OutputFormat::Text => render_route_text(out, info, palette),
    }
}

fn render_route_text<W: Write>(out: &mut W, info: &RouteInfo, p: ColorPalette) -> io::Result<()> {
    match info {
        RouteInfo::Ready {
            cost_km,
            risky_districts,
            path,
            shelters,
        } => {
            writeln!(out)?;
            writeln!(out, "Route Cost: {}{cost_km} km{}", p.white_bold, p.reset)?;
            writeln!(out, "Risky Districts: {}{risky_districts}{}", p.orange, p.reset)?;
            writeln!(out, "Evacuation Path: {}{path}{}", p.white_bold, p.reset)?;
            if shelters.is_empty() {
                writeln!(out, "{}No shelters found near the destination{}", p.gray, p.reset)?;
            }
            Ok(())
        }
        RouteInfo::Failed { message } => writeln!(out, "{}{message}{}", p.red, p.reset),
        other => writeln!(out, "{}{other}{}", p.gray, p.reset),
    }
}

#[cfg(test)]
mod tests {
    use jkevac_lib::{LatLon, Shelter};

    use super::*;

    fn ready(shelters: Vec<Shelter>) -> RouteInfo {
        RouteInfo::Ready {
            cost_km: 262.0,
            risky_districts: 1,
            path: "Srinagar → Ramban → Jammu".to_string(),
            shelters,
        }
    }

    fn render(info: &RouteInfo, format: OutputFormat) -> String {
        let mut buf = Vec::new();
        render_route_info(&mut buf, info, format, ColorPalette::plain()).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn text_summary_matches_route_panel() {
        let shelter = Shelter {
            name: "Relief Camp A".to_string(),
            category: None,
            position: LatLon::new(32.7, 74.8),
            distance_km: 2.1,
        };
        let text = render(&ready(vec![shelter]), OutputFormat::Text);

        assert_eq!(
            text,
            "\nRoute Cost: 262 km\nRisky Districts: 1\nEvacuation Path: Srinagar → Ramban → Jammu\n"
        );
    }

    #[test]
    fn text_summary_notes_missing_shelters() {
        let text = render(&ready(Vec::new()), OutputFormat::Text);
        assert!(text.ends_with("No shelters found near the destination\n"));
    }

    #[test]
    fn failure_prints_message_only() {
        let info = RouteInfo::Failed {
            message: "No path avoiding blocked districts".to_string(),
        };
        assert_eq!(
            render(&info, OutputFormat::Text),
            "No path avoiding blocked districts\n"
        );
    }

    #[test]
    fn json_route_is_tagged_by_status() {
        let json: serde_json::Value =
            serde_json::from_str(&render(&ready(Vec::new()), OutputFormat::Json)).unwrap();
        assert_eq!(json["status"], "ready");
        assert_eq!(json["cost_km"], 262.0);
        assert_eq!(json["path"], "Srinagar → Ramban → Jammu");
    }

    #[test]
    fn districts_render_one_per_line_or_as_json() {
        let districts = vec!["Srinagar".to_string(), "Jammu".to_string()];

        let mut text = Vec::new();
        render_districts(&mut text, &districts, OutputFormat::Text).unwrap();
        assert_eq!(String::from_utf8(text).unwrap(), "Srinagar\nJammu\n");

        let mut json = Vec::new();
        render_districts(&mut json, &districts, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["districts"][1], "Jammu");
    }
}
