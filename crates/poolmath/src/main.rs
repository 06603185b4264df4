//! Pool Math daemon - polls a Pool Math share page and reports readings.
//!
//! Acts as the monitoring host for the library: it owns the poll schedule,
//! registers newly discovered readings, and logs their values. The library
//! itself stays pull-based.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{info, warn, Level};

use poolmath::client::PoolMathClient;
use poolmath::config::PoolMathConfig;
use poolmath::sensor::{Reading, SensorKind};

#[derive(Parser)]
#[command(name = "poolmathd")]
#[command(about = "Pool chemistry readings scraped from a Pool Math share page", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pool Math share URL (overrides the config file)
    #[arg(long)]
    url: Option<String>,

    /// Source name (overrides the config file)
    #[arg(long)]
    name: Option<String>,

    /// Seconds between polls
    #[arg(long, default_value_t = 300)]
    interval: u64,

    /// Fetch once, print readings, and exit
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PoolMathConfig::load(path)?,
        None => match &cli.url {
            Some(url) => PoolMathConfig::new(url),
            None => bail!("either --config or --url is required"),
        },
    };
    if let Some(url) = cli.url {
        config.url = url;
    }
    if let Some(name) = cli.name {
        config.name = Some(name);
    }

    info!("poolmathd v{} starting", env!("CARGO_PKG_VERSION"));

    let client = PoolMathClient::with_http(&config)?;
    info!("Watching '{}' at {}", client.name(), client.url());

    for reading in client.readings() {
        register(&reading);
    }

    if cli.once {
        print_readings(&client);
        return Ok(());
    }

    loop {
        thread::sleep(Duration::from_secs(cli.interval));

        match client.refresh() {
            Ok(new_readings) => {
                for reading in new_readings {
                    register(&reading);
                }
                report(&client);
            }
            Err(e) => warn!("Refresh failed: {}", e),
        }
    }
}

fn register(reading: &Reading) {
    info!("Registered reading '{}' ({})", reading.name(), reading.unit());
}

fn report(client: &PoolMathClient) {
    if let Some(tested_at) = client.last_tested_at() {
        info!("Most recent test log: {}", tested_at);
    }

    for reading in client.readings() {
        let value = reading.value().unwrap_or_else(|| "unknown".to_string());
        info!("{} = {} {}", reading.name(), value, reading.unit());
    }
}

fn print_readings(client: &PoolMathClient) {
    if let Some(tested_at) = client.last_tested_at() {
        println!("Test log from {}", tested_at);
    }

    for kind in SensorKind::ALL {
        let reading = match client.reading(kind) {
            Some(reading) => reading,
            None => continue,
        };

        let value = reading.value().unwrap_or_else(|| "unknown".to_string());
        let range = kind.target_range();

        match range.target {
            Some(target) => println!(
                "{}: {} {} (recommended {}-{}, target {})",
                reading.name(),
                value,
                reading.unit(),
                range.min,
                range.max,
                target
            ),
            None if range.max > 0.0 => println!(
                "{}: {} {} (recommended {}-{})",
                reading.name(),
                value,
                reading.unit(),
                range.min,
                range.max
            ),
            None => println!("{}: {} {}", reading.name(), value, reading.unit()),
        }
    }
}
