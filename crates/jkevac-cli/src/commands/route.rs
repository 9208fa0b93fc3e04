//! Route command: one planning session driven from the command line.

use std::io;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use jkevac_lib::{
    ComputeOutcome, HazardType, MapSurface, Phase, PresenterConfig, RecordingSurface,
    RouteInfo, RouteService, Session,
};
use tracing::info;

use crate::GlobalOptions;
use jkevac_cli::output::{render_route_info, OutputFormat};
use jkevac_cli::surface::TerminalSurface;
use jkevac_cli::terminal::ColorPalette;

/// Arguments for the route command.
#[derive(Debug, Clone)]
pub struct RouteCommandArgs {
    /// Starting district.
    pub from: String,
    /// Destination district.
    pub to: String,
    /// Hazard types whose affected districts must be avoided.
    pub block: Vec<HazardType>,
}

/// Compute a route, reveal it, and print the summary.
///
/// A failed computation is reported once: as the error in text mode, or as the
/// JSON document with a failure exit code.
pub async fn handle_route(global: &GlobalOptions, args: &RouteCommandArgs) -> Result<ExitCode> {
    let service = global.service()?;
    let config = global.presenter_config();
    let palette = ColorPalette::detect();

    let info = match global.format {
        OutputFormat::Text => {
            let surface = TerminalSurface::new(io::stdout(), palette);
            plan(service, surface, config, args, Some(palette)).await?
        }
        // JSON output stays a single document; the reveal runs headless.
        OutputFormat::Json => plan(service, RecordingSurface::new(), config, args, None).await?,
    };

    if let (OutputFormat::Text, RouteInfo::Failed { message }) = (global.format, &info) {
        bail!("{message}");
    }

    render_route_info(&mut io::stdout().lock(), &info, global.format, palette)
        .context("failed to write route summary")?;

    Ok(match info {
        RouteInfo::Failed { .. } => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

async fn plan<S, M>(
    service: S,
    surface: M,
    config: PresenterConfig,
    args: &RouteCommandArgs,
    progress: Option<ColorPalette>,
) -> Result<RouteInfo>
where
    S: RouteService,
    M: MapSurface,
{
    let mut session = Session::start(service, surface, config).await;

    let state = session.store().state();
    if let Some(message) = state.error() {
        bail!("{message}");
    }
    ensure_known(state.districts(), &args.from)?;
    ensure_known(state.districts(), &args.to)?;

    let selection = session.selection_mut();
    selection.start = args.from.clone();
    selection.destination = args.to.clone();
    selection.excluded = args.block.iter().copied().collect();

    let _progress = progress.map(|palette| {
        session.store().subscribe(move |state| {
            if state.phase() == Phase::Loading {
                println!("{}{}{}", palette.gray, RouteInfo::Loading, palette.reset);
            }
        })
    });

    let outcome = session.compute().await;
    info!(?outcome, "route computation finished");
    if outcome == ComputeOutcome::Skipped {
        bail!("start and destination must be two different districts");
    }

    session.presenter().wait_until_settled().await;
    let info = session.route_info();
    session.shutdown();
    Ok(info)
}

fn ensure_known(districts: &[String], name: &str) -> Result<()> {
    if districts.is_empty() || districts.iter().any(|d| d == name) {
        return Ok(());
    }
    bail!(
        "Unknown district '{name}'. Available districts: {}",
        districts.join(", ")
    )
}
