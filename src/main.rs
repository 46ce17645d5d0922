mod abort;
mod config;
mod devices;
mod gps;
mod nexstar;
mod sync;
mod timezone;
mod transport;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::config::Config;
use crate::devices::PortSelector;
use crate::sync::{SerialConnector, SerialLink, SyncOutcome, Synchronizer};
use crate::timezone::TzfLookup;

#[derive(Parser)]
#[command(name = "nexstar-gps-sync")]
#[command(about = "Set a NexStar telescope's time and location from a USB GPS")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List serial ports and show which ones match the GPS and telescope
    Ports,
    /// Wait for a GPS fix and push time and location to the telescope
    Sync {
        /// GPS serial port, instead of searching by USB id
        #[arg(long)]
        gps_port: Option<String>,
        /// Telescope serial port, instead of searching by USB id
        #[arg(long)]
        controller_port: Option<String>,
        /// Reject positions with HDOP at or above this
        #[arg(long)]
        max_hdop: Option<f32>,
        /// Give up waiting for a fix after this long (e.g. 5m)
        #[arg(long)]
        timeout: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => match Config::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error reading config {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    match cli.command {
        Commands::Ports => ports(&config),
        Commands::Sync {
            gps_port,
            controller_port,
            max_hdop,
            timeout,
            json,
        } => {
            let mut config = config;
            if gps_port.is_some() {
                config.gps.port = gps_port;
            }
            if controller_port.is_some() {
                config.controller.port = controller_port;
            }
            if let Some(max_hdop) = max_hdop {
                config.acquisition.max_hdop = max_hdop;
            }
            if timeout.is_some() {
                config.acquisition.timeout = timeout;
            }
            sync(&config, json)
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_target(false)
        .init();
}

fn ports(config: &Config) -> ExitCode {
    let available = match serialport::available_ports() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error listing serial ports: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let by_id = devices::usb_ports(&available);
    for port in &available {
        let usb = by_id
            .iter()
            .find(|(_, name)| **name == port.port_name)
            .map(|(id, _)| id.to_string());
        println!("{:<24} {}", port.port_name, usb.as_deref().unwrap_or("-"));
    }

    for (device, settings) in [("GPS", config.gps()), ("Telescope", config.controller())] {
        let settings = match settings {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Invalid {} settings: {}", device, e);
                return ExitCode::FAILURE;
            }
        };
        let found = match &settings.selector {
            PortSelector::Path(path) => Some(format!("{} (configured)", path)),
            PortSelector::Usb(id) => by_id.get(id).map(|p| format!("{} ({})", p, id)),
        };
        println!("{}: {}", device, found.as_deref().unwrap_or("not found"));
    }

    ExitCode::SUCCESS
}

fn sync(config: &Config, json: bool) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }
    let (gps, controller, timeout) = match (
        config.gps(),
        config.controller(),
        config.acquisition.timeout(),
    ) {
        (Ok(g), Ok(c), Ok(t)) => (g, c, t),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let ports = match devices::locate(&gps.selector, &controller.selector) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    log::info!("GPS: {}, telescope: {}", ports.gps, ports.telescope);

    let (abort_tx, abort) = abort::channel();
    if let Err(e) = abort::install_interrupt_handler(abort_tx) {
        log::warn!("Ctrl-C will not cancel fix acquisition: {}", e);
    }

    let mut connector = SerialConnector {
        gps: SerialLink {
            port: ports.gps,
            baud_rate: gps.baud_rate,
            read_timeout: gps.read_timeout,
        },
        controller: SerialLink {
            port: ports.telescope,
            baud_rate: controller.baud_rate,
            read_timeout: controller.read_timeout,
        },
    };

    let synchronizer = Synchronizer::new(TzfLookup::new())
        .max_hdop(config.acquisition.max_hdop)
        .acquire_timeout(timeout);
    if let Some(limit) = timeout {
        log::info!("Waiting up to {} for a fix", humantime::format_duration(limit));
    }

    match synchronizer.run(&mut connector, &abort) {
        Ok(SyncOutcome::Completed(report)) => {
            if json {
                match serde_json::to_string_pretty(&report) {
                    Ok(s) => println!("{}", s),
                    Err(e) => {
                        eprintln!("Error encoding report: {}", e);
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                println!("{}", report);
            }
            ExitCode::SUCCESS
        }
        Ok(SyncOutcome::Abandoned(no_fix)) => {
            eprintln!("Failed to acquire a fix: {}", no_fix);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Synchronization aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_duration;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sync_flags() {
        let cli = Cli::parse_from([
            "nexstar-gps-sync",
            "-v",
            "sync",
            "--gps-port",
            "/dev/ttyACM0",
            "--max-hdop",
            "2.5",
            "--timeout",
            "5m",
        ]);
        assert_eq!(cli.verbose, 1);
        let Commands::Sync {
            gps_port,
            controller_port,
            max_hdop,
            timeout,
            json,
        } = cli.command
        else {
            panic!("expected sync");
        };
        assert_eq!(gps_port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(controller_port, None);
        assert_eq!(max_hdop, Some(2.5));
        assert_eq!(parse_duration(&timeout.unwrap()).unwrap().as_secs(), 300);
        assert!(!json);
    }
}
