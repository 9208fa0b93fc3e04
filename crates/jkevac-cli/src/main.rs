mod commands;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use jkevac_cli::output::OutputFormat;
use jkevac_lib::{
    init_logging, ClientConfig, HazardType, HttpRouteService, LoggingConfig, PresenterConfig,
};

use commands::districts::handle_districts;
use commands::route::{handle_route, RouteCommandArgs};

#[derive(Parser, Debug)]
#[command(author, version, about = "Plan evacuation routes that avoid hazard-affected districts")]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Command,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalOptions {
    /// Base URL of the evacuation service.
    #[arg(
        long,
        env = "JKEVAC_API_URL",
        default_value = "http://localhost:8000",
        global = true
    )]
    pub api_url: String,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Milliseconds between two revealed waypoints.
    #[arg(long, default_value_t = 80, global = true)]
    pub tick_ms: u64,

    /// Print the whole path at once instead of revealing it step by step.
    #[arg(long, global = true)]
    pub no_animate: bool,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = 30, global = true)]
    pub timeout_secs: u64,
}

impl GlobalOptions {
    pub fn service(&self) -> Result<HttpRouteService> {
        let config = ClientConfig::default()
            .with_base_url(&self.api_url)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        HttpRouteService::new(&config)
            .with_context(|| format!("invalid --api-url '{}'", self.api_url))
    }

    pub fn presenter_config(&self) -> PresenterConfig {
        let config = PresenterConfig::default().with_tick(Duration::from_millis(self.tick_ms));
        if self.no_animate {
            PresenterConfig {
                animate: false,
                ..config
            }
        } else {
            config
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the districts the service can route between.
    Districts,
    /// Compute the safest route between two districts.
    Route {
        /// Starting district.
        #[arg(long = "from")]
        from: String,
        /// Destination district.
        #[arg(long = "to")]
        to: String,
        /// Avoid districts affected by this hazard (flood, landslide,
        /// earthquake). Repeatable.
        #[arg(long = "block", value_name = "HAZARD")]
        block: Vec<HazardType>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_logging(&LoggingConfig::from_env());
    let cli = Cli::parse();

    match cli.command {
        Command::Districts => handle_districts(&cli.global)
            .await
            .map(|()| ExitCode::SUCCESS),
        Command::Route { from, to, block } => {
            let args = RouteCommandArgs { from, to, block };
            handle_route(&cli.global, &args).await
        }
    }
}
