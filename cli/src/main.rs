mod commands;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use sonos_upnp::{discovery, ControlPoint, DiscoveryConfig, SubscriptionConfig};

use commands::{Command, CommandError, Mute, PlayUri, Status, Target, Transport, Volume, Watch};

/// Control Sonos devices on the local network
#[derive(Parser, Debug)]
#[command(name = "sonos")]
#[command(about = "Control Sonos devices on the local network")]
#[command(version = "0.1.0")]
struct Args {
    /// Device address or room name; the first device to answer otherwise
    #[arg(short, long, global = true)]
    device: Option<Target>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug, PartialEq)]
enum CliCommand {
    /// List the devices that answer discovery
    Discover {
        /// Scan window in seconds
        #[arg(short, long, default_value = "2")]
        timeout: u64,
    },
    /// Resume playback, or play a URI
    Play { uri: Option<String> },
    Pause,
    Stop,
    Next,
    Previous,
    /// Show or set the volume
    Volume {
        #[arg(allow_negative_numbers = true)]
        level: Option<i32>,
    },
    /// Set mute (on/off) or toggle it
    Mute {
        #[arg(value_parser = parse_on_off)]
        state: Option<bool>,
    },
    /// Play state, current track and volume
    Status,
    /// Print events until Enter is pressed
    Watch,
}

impl Args {
    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Warn;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

impl CliCommand {
    fn into_command(self) -> Option<Box<dyn Command>> {
        let command: Box<dyn Command> = match self {
            CliCommand::Discover { .. } => return None,
            CliCommand::Play { uri: Some(uri) } => Box::new(PlayUri { uri }),
            CliCommand::Play { uri: None } => Box::new(Transport::Play),
            CliCommand::Pause => Box::new(Transport::Pause),
            CliCommand::Stop => Box::new(Transport::Stop),
            CliCommand::Next => Box::new(Transport::Next),
            CliCommand::Previous => Box::new(Transport::Previous),
            CliCommand::Volume { level } => Box::new(Volume { level }),
            CliCommand::Mute { state } => Box::new(Mute { state }),
            CliCommand::Status => Box::new(Status),
            CliCommand::Watch => Box::new(Watch),
        };
        Some(command)
    }
}

fn parse_on_off(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => Err(format!("expected on or off, got {:?}", other)),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = ConfigBuilder::new()
        .add_filter_allow_str("sonos")
        .build();
    if let Err(e) = TermLogger::init(args.log_level(), config, TerminalMode::Stderr, ColorChoice::Auto) {
        eprintln!("Logging unavailable: {}", e);
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), CommandError> {
    let control_point = Arc::new(ControlPoint::new(SubscriptionConfig::default())?);

    if let CliCommand::Discover { timeout } = args.command {
        return list_devices(&control_point, timeout);
    }

    let target = args.device.unwrap_or(Target::First);
    let Some(command) = args.command.into_command() else {
        return Ok(());
    };

    let device = target.resolve(&control_point)?;
    log::debug!("Running {} on {}", command.name(), device.ip());
    println!("{}", command.execute(&device)?);
    Ok(())
}

fn list_devices(control_point: &Arc<ControlPoint>, timeout: u64) -> Result<(), CommandError> {
    let config = DiscoveryConfig::default()
        .with_timeout(Duration::from_secs(timeout))
        .map_err(sonos_upnp::SonosError::InvalidArgument)?;

    let devices = discovery::discover_with(control_point, config)?;
    if devices.is_empty() {
        return Err(CommandError::NoDevicesFound);
    }

    for device in devices {
        match device.zone_group_state() {
            Ok(zone) => println!("{:<16} {:<20} group {}", device.ip(), zone.name, zone.members.join(",")),
            Err(e) => println!("{:<16} (unavailable: {})", device.ip(), e),
        }
    }
    Ok(())
}
