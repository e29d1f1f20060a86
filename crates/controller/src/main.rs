//! robotic-arm command line tool
//!
//! Drives a Velleman KSR10 / OWI-535 robotic arm from the shell: list USB
//! devices, check that the arm can be reached, move actuators for a while,
//! or run the light blink self-test.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use common::setup_logging;
use controller::config::{self, ArmConfig};
use controller::{RoboticArm, RusbTransport};
use protocol::{Action, Actuator, ConnectionStatus, parse_command};
use std::thread;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "robotic-arm")]
#[command(
    author,
    version,
    about = "Control a USB robotic arm (Velleman KSR10 / OWI-535)"
)]
#[command(long_about = "
Control a Velleman KSR10 / OWI-535 robotic arm over USB.

EXAMPLES:
    # List attached USB devices
    robotic-arm list

    # Check whether the arm can be reached
    robotic-arm status

    # Close the gripper and raise the wrist for two seconds
    robotic-arm send gripper=close wrist=up --hold-ms 2000

    # Blink the light
    robotic-arm demo

CONFIGURATION:
    The tool looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/robotic-arm/arm.toml
    3. /etc/robotic-arm/arm.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<String>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List attached USB devices, marking the arm
    List,

    /// Connect, print the status and disconnect
    Status,

    /// Send commands such as `base=cw light=on`, hold them, then stop
    Send {
        /// Commands as actuator=action
        #[arg(required = true, value_name = "ACTUATOR=ACTION", value_parser = parse_command_arg)]
        commands: Vec<(Actuator, Action)>,

        /// How long to keep the commands asserted, in milliseconds
        #[arg(long, value_name = "MS")]
        hold_ms: Option<u64>,
    },

    /// Blink the light to check the connection
    Demo,
}

fn parse_command_arg(text: &str) -> std::result::Result<(Actuator, Action), String> {
    parse_command(text).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --save-config flag early (before loading config)
    if args.save_config {
        let config = ArmConfig::default();
        let path = ArmConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = if let Some(ref path) = args.config {
        config::load_config(path).context("Failed to load configuration")?
    } else {
        ArmConfig::load_or_default()
    };

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.logging.log_level);

    setup_logging(log_level).context("Failed to setup logging")?;

    info!("robotic-arm v{}", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", log_level);

    let Some(command) = args.command else {
        bail!("No command given, see --help");
    };

    match command {
        Command::List => list_devices_mode(&config),
        Command::Status => status_mode(&config),
        Command::Send { commands, hold_ms } => {
            let hold = Duration::from_millis(hold_ms.unwrap_or(config.cli.hold_ms));
            send_mode(&config, &commands, hold)
        }
        Command::Demo => demo_mode(&config),
    }
}

fn open_arm(config: &ArmConfig) -> Result<RoboticArm<RusbTransport>> {
    RoboticArm::open_with_settings(config.device.clone())
        .context("Failed to initialize USB subsystem")
}

/// List USB devices and exit
fn list_devices_mode(config: &ArmConfig) -> Result<()> {
    info!("Listing USB devices...");

    let transport = RusbTransport::new().context("Failed to initialize USB subsystem")?;
    let devices = transport
        .list_devices()
        .context("Failed to enumerate USB devices")?;

    if devices.is_empty() {
        println!("No USB devices found.");
        return Ok(());
    }

    println!("Found {} USB device(s):\n", devices.len());
    for device in devices {
        let marker = if device.matches(&config.device) {
            "  <- robotic arm"
        } else {
            ""
        };
        println!(
            "  Bus {:03} Device {:03}: {:04x}:{:04x}{}",
            device.bus_number, device.address, device.vendor_id, device.product_id, marker
        );
    }

    Ok(())
}

/// Connect, report, disconnect
fn status_mode(config: &ArmConfig) -> Result<()> {
    let arm = open_arm(config)?;

    let status = arm.connect()?;
    println!("connect     ==> '{}'", status);
    arm.disconnect()?;

    if status != ConnectionStatus::Connected {
        bail!("Arm not reachable: {}", status);
    }
    Ok(())
}

/// Send a batch, hold it, stop and disconnect
fn send_mode(config: &ArmConfig, commands: &[(Actuator, Action)], hold: Duration) -> Result<()> {
    let arm = open_arm(config)?;

    let status = arm.connect()?;
    if status != ConnectionStatus::Connected {
        bail!("Failed to connect to the arm: {}", status);
    }

    for (actuator, action) in commands {
        info!(
            "{} -> {}",
            actuator,
            action.label(*actuator).unwrap_or("invalid")
        );
    }

    let status = arm.send_commands(commands.iter().copied());
    if status != ConnectionStatus::Connected {
        if let Err(e) = arm.disconnect() {
            error!("Error disconnecting: {:#}", e);
        }
        bail!("Command not accepted: {}", status);
    }

    thread::sleep(hold);
    arm.send_stop();

    let status = arm.disconnect()?;
    println!("disconnect  ==> '{}'", status);
    Ok(())
}

/// Light blink self-test
///
/// Connects twice, switches the light on, off and on, then disconnects
/// twice. The second connect and disconnect must be no-ops.
fn demo_mode(config: &ArmConfig) -> Result<()> {
    let arm = open_arm(config)?;
    let pause = Duration::from_millis(config.cli.hold_ms);

    let report = |step: &str, status: ConnectionStatus| {
        println!("{:<11} ==> '{}'", step, status);
        println!("status      ==> '{}'", arm.status());
        println!();
    };

    println!("status      ==> '{}'", arm.status());
    println!();

    report("connect", arm.connect()?);
    thread::sleep(pause);
    report("connect", arm.connect()?);
    thread::sleep(pause);

    for action in [Action::ON, Action::OFF, Action::ON] {
        report("light", arm.send_command(Actuator::Light, action));
        thread::sleep(pause);
    }

    report("disconnect", arm.disconnect()?);
    thread::sleep(pause);
    report("disconnect", arm.disconnect()?);

    Ok(())
}
