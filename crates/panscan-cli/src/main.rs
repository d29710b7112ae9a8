//! PanScan command line front-end
//!
//! Connects to the scanner (or the simulated one with `--demo`), then runs a
//! single operation: list ports, raw console, readings, sweeps, calibration.

mod monitor;
mod output;
mod prompt;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use tracing_subscriber::EnvFilter;

use panscan_core::config::ScannerConfig;
use panscan_core::demo::DemoDevice;
use panscan_core::protocol::{
    discover, AutoSelector, FixedPortSelector, PortSelector, SerialConnection, Transport,
};
use panscan_core::scanner::{
    AxisRange, CalibrationRow, ScanRow, Scanner, Sweep, SweepPlan, SweepProgress,
};

use prompt::{Prompter, TerminalSelector};

/// Closest distance the sensor reads reliably, in centimetres
const MIN_CALIBRATION_CM: u32 = 20;
/// Farthest distance the sensor reads reliably, in centimetres
const MAX_CALIBRATION_CM: u32 = 150;

type Link = Box<dyn Transport + Send>;

#[derive(Parser, Debug)]
#[command(name = "panscan", version, about = "Drive a pan/tilt distance-scanning rig over serial")]
struct Cli {
    /// Configuration file (defaults to the per-user config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serial device path; skips auto-detection
    #[arg(long, short, global = true)]
    port: Option<String>,

    /// Baud rate
    #[arg(long, short, global = true)]
    baud: Option<u32>,

    /// Give up on a command after this many milliseconds without `ready`
    #[arg(long, global = true)]
    max_wait_ms: Option<u64>,

    /// Use the simulated scanner instead of a serial port
    #[arg(long, global = true)]
    demo: bool,

    /// Accept every connection and overwrite prompt
    #[arg(long, short, global = true)]
    yes: bool,

    /// Log every line sent to and received from the device
    #[arg(long, global = true)]
    log_traffic: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial ports
    Ports {
        /// Include ports that are not known controller boards
        #[arg(long)]
        all: bool,
    },
    /// Raw console: type commands and see every line the device sends
    Monitor,
    /// Center the rig and take readings
    Read {
        #[arg(long, short, default_value_t = 1)]
        count: u32,
    },
    /// Move both axes to the center
    Center,
    /// Move both axes to 0
    Zero,
    /// Sweep a pan/tilt grid and save the readings as CSV
    Scan(ScanArgs),
    /// Record sensor voltage at distances measured by the operator
    Calibrate {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Write the effective configuration to the config file
    SaveConfig,
}

#[derive(Args, Debug)]
struct ScanArgs {
    #[arg(long, default_value_t = 70)]
    pan_start: i64,
    /// End of the pan range (exclusive)
    #[arg(long, default_value_t = 110)]
    pan_end: i64,
    #[arg(long, default_value_t = 1)]
    pan_step: i64,
    #[arg(long, default_value_t = 57)]
    tilt_start: i64,
    /// End of the tilt range (exclusive)
    #[arg(long, default_value_t = 107)]
    tilt_end: i64,
    #[arg(long, default_value_t = 1)]
    tilt_step: i64,
    /// Pause before each reading; defaults to the configured settle delay
    #[arg(long)]
    settle_ms: Option<u64>,
    /// Pause before the first move
    #[arg(long, default_value_t = 1000)]
    start_delay_ms: u64,
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_traffic);

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => ScannerConfig::default_path()?,
    };
    let config = load_config(&cli, &config_path)?;

    match &cli.command {
        Command::Ports { all } => list(!all && config.board_filter),
        Command::SaveConfig => {
            config
                .save(&config_path)
                .with_context(|| format!("saving {}", config_path.display()))?;
            println!("saved {}", config_path.display());
            Ok(())
        }
        Command::Monitor => {
            let mut link = open_link(&cli, &config)?;
            monitor::run(link.as_mut(), io::stdin().lock(), io::stdout())
        }
        Command::Read { count } => {
            let mut scanner = Scanner::homed(open_link(&cli, &config)?, config.controller_config())?;
            for _ in 0..*count {
                let r = scanner.read_sensor()?;
                println!("pan {:>5.1}  tilt {:>5.1}  voltage {:.3}", r.pan, r.tilt, r.voltage);
            }
            Ok(())
        }
        Command::Center => {
            let mut scanner = Scanner::new(open_link(&cli, &config)?, config.controller_config());
            scanner.center()?;
            println!("centered at {:?}", scanner.state());
            Ok(())
        }
        Command::Zero => {
            let mut scanner = Scanner::new(open_link(&cli, &config)?, config.controller_config());
            scanner.zero()?;
            println!("zeroed at {:?}", scanner.state());
            Ok(())
        }
        Command::Scan(args) => scan(&cli, &config, args),
        Command::Calibrate { output } => calibrate(&cli, &config, output.clone()),
    }
}

fn init_logging(verbose: u8, log_traffic: bool) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let mut directives = format!("panscan={level},panscan_core={level}");
    if log_traffic {
        directives.push_str(",panscan_core::traffic=trace");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives)),
        )
        .with_writer(io::stderr)
        .init();
}

fn load_config(cli: &Cli, path: &Path) -> Result<ScannerConfig> {
    let mut config = ScannerConfig::load_or_default(path)
        .with_context(|| format!("loading {}", path.display()))?;

    if let Some(port) = &cli.port {
        config.port = Some(port.clone());
    }
    if let Some(baud) = cli.baud {
        config.baud_rate = baud;
    }
    if let Some(ms) = cli.max_wait_ms {
        config.max_wait_ms = Some(ms);
    }
    if cli.log_traffic {
        config.log_traffic = true;
    }
    Ok(config)
}

fn list(known_boards_only: bool) -> Result<()> {
    let ports: Vec<_> = discover(known_boards_only).collect();
    if ports.is_empty() {
        println!(
            "no {}serial ports found",
            if known_boards_only { "recognized " } else { "" }
        );
        return Ok(());
    }

    for port in ports {
        let usb = match (port.vendor_id, port.product_id) {
            (Some(vid), Some(pid)) => format!("{:04x}:{:04x}", vid, pid),
            _ => "-".to_string(),
        };
        println!(
            "{:<16} {:<10} {}{}",
            port.device_path,
            usb,
            port.description.as_deref().unwrap_or(""),
            if port.is_known_board() { "  [scanner board]" } else { "" }
        );
    }
    Ok(())
}

fn open_link(cli: &Cli, config: &ScannerConfig) -> Result<Link> {
    if cli.demo {
        tracing::info!("using the simulated scanner");
        return Ok(Box::new(DemoDevice::new()));
    }

    let mut selector: Box<dyn PortSelector> = match (&config.port, cli.yes) {
        (Some(port), _) => Box::new(FixedPortSelector::new(port.clone())),
        (None, true) => Box::new(AutoSelector),
        (None, false) => Box::new(TerminalSelector::stdio()),
    };

    let mut link = SerialConnection::new(config.connection_config());
    link.connect_with(selector.as_mut())
        .context("could not connect to the scanner")?;
    Ok(Box::new(link))
}

/// Refuse to clobber an existing file unless the operator agrees
fn check_output(path: &Path, yes: bool) -> Result<()> {
    if !path.exists() || yes {
        return Ok(());
    }
    let question = format!("{} already exists. replace it?", path.display());
    if !Prompter::stdio().yes_no(&question)? {
        bail!("not overwriting {}", path.display());
    }
    Ok(())
}

fn scan(cli: &Cli, config: &ScannerConfig, args: &ScanArgs) -> Result<()> {
    let path = args.output.clone().unwrap_or_else(output::default_scan_path);
    check_output(&path, cli.yes)?;

    let plan = SweepPlan {
        pan: AxisRange::new(args.pan_start, args.pan_end, args.pan_step),
        tilt: AxisRange::new(args.tilt_start, args.tilt_end, args.tilt_step),
        settle_ms: args.settle_ms.unwrap_or(config.settle_delay_ms),
        start_delay_ms: args.start_delay_ms,
    };
    if plan.total_points() == 0 {
        bail!("the scan range is empty");
    }

    // The link lives on the worker thread for the whole sweep
    let link = open_link(cli, config)?;
    let controller = config.controller_config();
    let (tx, rx) = mpsc::channel::<SweepProgress>();
    let worker = thread::spawn(move || {
        let mut scanner = Scanner::homed(link, controller)?;
        Sweep::new(plan).run(&mut scanner, |progress| {
            let _ = tx.send(progress);
        })
    });

    for progress in rx {
        eprint!("\rscan progress: {}/{}", progress.completed, progress.total);
        io::stderr().flush()?;
    }
    eprintln!();

    let readings = match worker.join() {
        Ok(result) => result?,
        Err(_) => bail!("scan worker panicked"),
    };
    let rows: Vec<ScanRow> = readings.into_iter().map(ScanRow::from).collect();
    output::write_scan_csv(&path, &rows).with_context(|| format!("writing {}", path.display()))?;
    println!("saved {} readings to {}", rows.len(), path.display());
    Ok(())
}

fn calibrate(cli: &Cli, config: &ScannerConfig, destination: Option<PathBuf>) -> Result<()> {
    let path = destination.unwrap_or_else(output::default_calibration_path);
    check_output(&path, cli.yes)?;

    let mut scanner = Scanner::homed(open_link(cli, config)?, config.controller_config())?;
    let mut prompter = Prompter::stdio();
    let mut rows = Vec::new();

    prompter.say("beginning calibration routine...")?;
    loop {
        let Some(answer) =
            prompter.ask("enter the current distance in cm, or \"DONE\" to exit:")?
        else {
            break;
        };
        if answer.eq_ignore_ascii_case("done") {
            break;
        }
        let Ok(distance) = answer.parse::<u32>() else {
            prompter.say("invalid input!")?;
            continue;
        };
        if distance < MIN_CALIBRATION_CM {
            prompter.say(&format!(
                "the sensor is unreliable below {} cm, place it further away.",
                MIN_CALIBRATION_CM
            ))?;
            continue;
        }
        if distance > MAX_CALIBRATION_CM {
            prompter.say(&format!(
                "the sensor is unreliable beyond {} cm, place it closer.",
                MAX_CALIBRATION_CM
            ))?;
            continue;
        }

        let voltage = scanner.read_sensor()?.voltage;
        prompter.say(&format!("voltage at {}cm = {:.3}", distance, voltage))?;
        rows.push(CalibrationRow {
            distance: f64::from(distance),
            voltage,
        });
    }

    output::write_calibration_csv(&path, &rows)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("saved {} calibration points to {}", rows.len(), path.display());
    Ok(())
}
