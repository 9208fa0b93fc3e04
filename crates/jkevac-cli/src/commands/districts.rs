//! District listing command.

use std::io;

use anyhow::{Context, Result};
use jkevac_lib::RouteService;

use crate::GlobalOptions;
use jkevac_cli::output::render_districts;

/// Fetch and print the selectable districts.
pub async fn handle_districts(global: &GlobalOptions) -> Result<()> {
    let service = global.service()?;
    let districts = service
        .districts()
        .await
        .with_context(|| format!("failed to fetch districts from {}", service.base_url()))?;

    render_districts(&mut io::stdout().lock(), &districts, global.format)
        .context("failed to write districts")
}
