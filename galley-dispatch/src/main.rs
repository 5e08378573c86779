//! galley-dispatch operator CLI
//!
//! Inspect the bridge connection and station routing, and send test jobs.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use galley_dispatch::{DispatchConfig, PrintDispatcher, PrintTarget, logger};

#[derive(Debug, Parser)]
#[command(name = "galley-dispatch")]
#[command(author, version, about = "Restaurant printer dispatch", long_about = None)]
struct Cli {
    /// Bridge agent endpoint
    #[arg(long, env = "GALLEY_BRIDGE_ADDR")]
    bridge_addr: Option<String>,

    /// Directory holding the station database
    #[arg(long, env = "GALLEY_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect and report the connection status
    Status,
    /// List printers the bridge can see
    Printers,
    /// List stations and their printers
    Stations,
    /// Assign a printer to a station (omit the printer to clear it)
    Assign { station: String, printer: Option<String> },
    /// Print a test page to a station id or `printer:<name>`
    TestPrint { target: String },
    /// Open the cash drawer behind a station id or `printer:<name>`
    Drawer { target: String },
}

/// `printer:<name>` targets a printer directly; anything else is a station id
fn parse_target(raw: &str) -> PrintTarget {
    match raw.strip_prefix("printer:") {
        Some(name) => PrintTarget::printer(name),
        None => PrintTarget::station(raw),
    }
}

async fn require_connection(dispatcher: &PrintDispatcher) -> Result<()> {
    if !dispatcher.connect().await {
        bail!(
            "print bridge unavailable (status: {})",
            dispatcher.connection_status()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let mut config = DispatchConfig::from_env();
    if let Some(addr) = cli.bridge_addr {
        config.connection.bridge_addr = addr;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    logger::init_logger_with_file(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    let dispatcher = PrintDispatcher::from_config(&config).context("failed to start dispatcher")?;

    match cli.command {
        Command::Status => {
            let connected = dispatcher.connect().await;
            println!("bridge:  {}", config.connection.bridge_addr);
            println!("status:  {}", dispatcher.connection_status());
            if connected {
                dispatcher.disconnect().await;
            }
        }
        Command::Printers => {
            require_connection(&dispatcher).await?;
            if !dispatcher.refresh_printers().await {
                bail!("printer discovery failed");
            }
            for printer in dispatcher.available_printers() {
                let marker = if printer.is_default { " (default)" } else { "" };
                println!("{}{}", printer.name, marker);
            }
            dispatcher.disconnect().await;
        }
        Command::Stations => {
            for station in dispatcher.stations().stations() {
                println!(
                    "{:<44} {:<16} {}",
                    station.id,
                    station.name,
                    station.printer_name.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Assign { station, printer } => {
            if !dispatcher.stations().assign_printer(&station, printer.clone())? {
                bail!("unknown station: {}", station);
            }
            match printer {
                Some(p) => println!("{} -> {}", station, p),
                None => println!("{} cleared", station),
            }
        }
        Command::TestPrint { target } => {
            require_connection(&dispatcher).await?;
            dispatcher.print_test_page(&parse_target(&target)).await?;
            println!("test page sent");
            dispatcher.disconnect().await;
        }
        Command::Drawer { target } => {
            require_connection(&dispatcher).await?;
            dispatcher.open_cash_drawer(&parse_target(&target)).await?;
            println!("drawer pulse sent");
            dispatcher.disconnect().await;
        }
    }

    Ok(())
}
