//! EMT Madrid CLI
//!
//! Command-line access to nearby stops and live bus arrivals.

#![allow(clippy::print_stdout)]

mod speech;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use integration_emt::{Credentials, EmtClient, EmtConfig, NearbyQuery};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// EMT Madrid CLI
#[derive(Parser)]
#[command(name = "emt-cli")]
#[command(author, version, about = "EMT Madrid bus arrivals CLI", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// MobilityLabs account email
    #[arg(long, env = "EMT_EMAIL")]
    email: String,

    /// MobilityLabs account password
    #[arg(long, env = "EMT_PASSWORD", hide_env_values = true)]
    password: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List bus stops around a point
    Stops {
        /// Latitude (WGS84)
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude (WGS84)
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Search radius in meters (configured default if omitted)
        #[arg(short, long)]
        radius: Option<u32>,
    },

    /// Show live arrivals at a stop
    Arrivals {
        /// Stop id
        stop_id: String,

        /// Only show this line
        #[arg(short, long)]
        line: Option<String>,
    },

    /// Show the next buses at all stops around a point
    ///
    /// Example: emt-cli nearby --lat 40.4168 --lon -3.7038 --speech
    Nearby {
        /// Latitude (WGS84)
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude (WGS84)
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Search radius in meters (configured default if omitted)
        #[arg(short, long)]
        radius: Option<u32>,

        /// Number of arrivals to show (configured default if omitted)
        #[arg(short, long)]
        max_results: Option<u8>,

        /// Additional stop ids to include (repeatable)
        #[arg(long = "extra-stop")]
        extra_stops: Vec<String>,

        /// Print a spoken Spanish summary instead of JSON
        #[arg(long)]
        speech: bool,
    },
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Load the client configuration, falling back to defaults
fn load_config(path: Option<&Path>) -> anyhow::Result<EmtConfig> {
    let Some(path) = path else {
        return Ok(EmtConfig::default());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_config(&content).with_context(|| format!("invalid config file {}", path.display()))
}

fn parse_config(content: &str) -> anyhow::Result<EmtConfig> {
    let config: EmtConfig = toml::from_str(content)?;
    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = log_filter_from_verbosity(cli.verbose);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(cli.config.as_deref())?;
    debug!(base_url = %config.base_url, "Configuration loaded");

    let client = EmtClient::new(&config, Credentials::new(cli.email, cli.password))?;

    match cli.command {
        Commands::Stops { lat, lon, radius } => {
            let radius = radius.unwrap_or(config.default_radius_meters);
            let stops = client.find_nearby_stops(lat, lon, radius).await?;
            print_json(&stops)?;
        },

        Commands::Arrivals { stop_id, line } => {
            let arrivals = client.get_arrivals(&stop_id, line.as_deref()).await?;
            print_json(&arrivals)?;
        },

        Commands::Nearby {
            lat,
            lon,
            radius,
            max_results,
            extra_stops,
            speech,
        } => {
            let mut query = NearbyQuery::new(lat, lon).with_extra_stops(extra_stops);
            query.radius_meters = radius;
            query.max_results = max_results;

            let arrivals = client.nearby_arrivals(&query).await?;
            if speech {
                println!("{}", speech::format_arrivals(&arrivals));
            } else {
                print_json(&arrivals)?;
            }
        },
    }

    Ok(())
}
