//! UDP bridge daemon for flight simulation indicators
//!
//! Receives indicator commands over UDP, mirrors them into the
//! simulation as world objects and streams aircraft telemetry back out
//! over UDP. The command listener occupies the main thread; one
//! background thread owns the simulation host connection.

mod catalog;
mod config;
mod error;
mod protocol;
mod registry;
mod sim;
mod types;
mod udp;

use crate::catalog::IndicatorCatalog;
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::sim::{SimulatorDriver, create_link};
use crate::udp::{CommandListener, TelemetrySender};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Parse config path from command line arguments.
///
/// Supports:
/// - `flightpath-io <path>` (positional)
/// - `flightpath-io --config <path>` (flag-based)
/// - `flightpath-io -c <path>` (short flag)
///
/// Defaults to `flightpath.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    // Look for --config or -c flag
    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    // Fall back to first positional argument (if it doesn't start with -)
    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    // Default path
    "flightpath.toml".to_string()
}

fn main() -> Result<()> {
    // Load configuration before the logger so the configured level can
    // act as the default filter. A missing file is fine, a broken one
    // is not.
    let config_path = parse_config_path();
    let (config, config_missing) = match AppConfig::from_file(&config_path) {
        Ok(config) => (config, false),
        Err(Error::Io(ref e)) if e.kind() == std::io::ErrorKind::NotFound => {
            (AppConfig::default(), true)
        }
        Err(e) => return Err(e),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("flightpath-io v{} starting...", env!("CARGO_PKG_VERSION"));
    if config_missing {
        log::info!("Config {} not found, using defaults", config_path);
    } else {
        log::info!("Using config: {}", config_path);
    }

    // Telemetry goes out on its own ephemeral socket
    let telemetry_target: SocketAddr = config.network.telemetry_target.parse()?;
    let telemetry = TelemetrySender::new(telemetry_target)?;
    log::info!("Telemetry target: udp://{}", telemetry.target());

    let catalog = IndicatorCatalog::new(&config.catalog.path);
    log::info!("Indicator catalog: {}", config.catalog.path);

    // Simulation host connection and dispatch thread
    let link = create_link(&config.simulator)?;
    let mut driver = SimulatorDriver::new(link, catalog, Box::new(telemetry), &config.simulator);
    driver.start()?;

    // Set up shutdown signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    // Command listener occupies the main thread until shutdown
    let mut listener = CommandListener::bind(
        config.network.listen_port,
        Box::new(driver.handle()),
        Arc::clone(&running),
    )?;
    log::info!("flightpath-io running. Press Ctrl-C to stop.");
    listener.run();

    // Shutdown
    log::info!("Shutting down...");
    driver.shutdown()?;

    log::info!("flightpath-io stopped");
    Ok(())
}
