//! Integration tests for CLI
//!
//! These tests verify CLI functionality without running actual commands,
//! but instead test the command parsing and structure.

#![allow(clippy::panic)] // Allow panic! in tests for clear failure messages

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

// Mock CLI structure for testing (mirrors main.rs)
#[derive(Parser)]
#[command(name = "emt-cli")]
#[command(author, version, about = "EMT Madrid bus arrivals CLI", long_about = None)]
struct Cli {
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    email: String,

    #[arg(long)]
    password: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    Stops {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(short, long)]
        radius: Option<u32>,
    },
    Arrivals {
        stop_id: String,
        #[arg(short, long)]
        line: Option<String>,
    },
    Nearby {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(short, long)]
        radius: Option<u32>,
        #[arg(short, long)]
        max_results: Option<u8>,
        #[arg(long = "extra-stop")]
        extra_stops: Vec<String>,
        #[arg(long)]
        speech: bool,
    },
}

const CREDENTIALS: [&str; 5] = ["emt-cli", "--email", "me@example.com", "--password", "pw"];

fn parse_args(args: &[&str]) -> Result<Cli, clap::Error> {
    let os_args: Vec<OsString> = CREDENTIALS
        .iter()
        .chain(args.iter())
        .map(OsString::from)
        .collect();
    Cli::try_parse_from(os_args)
}

#[test]
fn cli_parses_stops_command() {
    let cli = parse_args(&["stops", "--lat", "40.4168", "--lon", "-3.7038"]).unwrap();
    if let Commands::Stops { lat, lon, radius } = cli.command {
        assert!((lat - 40.4168).abs() < f64::EPSILON);
        assert!((lon + 3.7038).abs() < f64::EPSILON);
        assert_eq!(radius, None);
    } else {
        panic!("Expected Stops command");
    }
}

#[test]
fn cli_parses_stops_with_radius() {
    let cli = parse_args(&["stops", "--lat", "40.4", "--lon", "-3.7", "--radius", "500"]).unwrap();
    if let Commands::Stops { radius, .. } = cli.command {
        assert_eq!(radius, Some(500));
    } else {
        panic!("Expected Stops command");
    }
}

#[test]
fn cli_stops_requires_coordinates() {
    assert!(parse_args(&["stops", "--lat", "40.4"]).is_err());
}

#[test]
fn cli_parses_arrivals_command() {
    let cli = parse_args(&["arrivals", "72"]).unwrap();
    if let Commands::Arrivals { stop_id, line } = cli.command {
        assert_eq!(stop_id, "72");
        assert_eq!(line, None);
    } else {
        panic!("Expected Arrivals command");
    }
}

#[test]
fn cli_parses_arrivals_with_line() {
    let cli = parse_args(&["arrivals", "72", "--line", "27"]).unwrap();
    if let Commands::Arrivals { line, .. } = cli.command {
        assert_eq!(line.as_deref(), Some("27"));
    } else {
        panic!("Expected Arrivals command");
    }
}

#[test]
fn cli_parses_nearby_with_all_options() {
    let cli = parse_args(&[
        "nearby",
        "--lat",
        "40.4168",
        "--lon",
        "-3.7038",
        "--radius",
        "400",
        "--max-results",
        "3",
        "--extra-stop",
        "72",
        "--extra-stop",
        "5000",
        "--speech",
    ])
    .unwrap();

    if let Commands::Nearby {
        radius,
        max_results,
        extra_stops,
        speech,
        ..
    } = cli.command
    {
        assert_eq!(radius, Some(400));
        assert_eq!(max_results, Some(3));
        assert_eq!(extra_stops, vec!["72", "5000"]);
        assert!(speech);
    } else {
        panic!("Expected Nearby command");
    }
}

#[test]
fn cli_nearby_defaults() {
    let cli = parse_args(&["nearby", "--lat", "40.4", "--lon", "-3.7"]).unwrap();
    if let Commands::Nearby {
        extra_stops,
        speech,
        max_results,
        ..
    } = cli.command
    {
        assert!(extra_stops.is_empty());
        assert!(!speech);
        assert_eq!(max_results, None);
    } else {
        panic!("Expected Nearby command");
    }
}

#[test]
fn cli_parses_config_and_verbosity() {
    let cli = parse_args(&["-vv", "--config", "emt.toml", "arrivals", "72"]).unwrap();
    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.config, Some(PathBuf::from("emt.toml")));
    assert_eq!(cli.email, "me@example.com");
}

#[test]
fn cli_rejects_invalid_radius() {
    assert!(parse_args(&["stops", "--lat", "40.4", "--lon", "-3.7", "--radius", "-5"]).is_err());
}

#[test]
fn cli_rejects_unknown_command() {
    assert!(parse_args(&["departures"]).is_err());
}

#[test]
fn cli_requires_subcommand() {
    assert!(parse_args(&[]).is_err());
}
