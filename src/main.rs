//! RGBW strip command-line driver.
//!
//! ## Modes
//! - `run`: play a pattern on a background sequencer until Ctrl+C
//! - `set`: hold a single color until Ctrl+C
//! - `sweep`: ramp each channel up and down to check the wiring
//! - `reset`: turn every channel off and release the pins
//!
//! ## Usage
//! ```sh
//! sudo ./target/release/rgbw-strip run --pattern fade --from ff33dd44 --to aa99ee00
//! ./target/release/rgbw-strip --simulate sweep
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use rgbw_strip::diagnostics::{self, DEFAULT_SWEEP_STEP};
use rgbw_strip::{
    CompositeColor, Error, HardwareContext, Pattern, PatternKind, Rgbw, Sequencer, StripConfig,
    is_running, setup_signal_handler,
};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Drive an RGBW LED strip over four PWM pins
#[derive(Parser)]
#[command(name = "rgbw-strip")]
#[command(version)]
struct Args {
    /// JSON file with pin numbers and PWM frequency
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// PWM frequency in Hz (overrides the config file)
    #[arg(long, global = true)]
    frequency: Option<f64>,

    /// BCM pin for the red channel
    #[arg(long, global = true)]
    red: Option<u8>,

    /// BCM pin for the green channel
    #[arg(long, global = true)]
    green: Option<u8>,

    /// BCM pin for the blue channel
    #[arg(long, global = true)]
    blue: Option<u8>,

    /// BCM pin for the white channel
    #[arg(long, global = true)]
    white: Option<u8>,

    /// Log PWM writes instead of touching GPIO
    #[arg(long, global = true)]
    simulate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play a pattern until Ctrl+C
    Run {
        #[arg(long, value_enum, default_value_t = PatternArg::Random)]
        pattern: PatternArg,

        /// Tempo in beats per minute (the step count for fades)
        #[arg(long, default_value_t = 120.0)]
        bpm: f64,

        /// Fade start color
        #[arg(long, default_value = "ff33dd44")]
        from: String,

        /// Fade end color
        #[arg(long, default_value = "aa99ee00")]
        to: String,

        /// Fade duration multiplier
        #[arg(long, default_value_t = 1.0)]
        scale: f64,

        /// Give up waiting for the sequencer after this many milliseconds
        #[arg(long)]
        join_timeout_ms: Option<u64>,
    },
    /// Show one color until Ctrl+C
    Set {
        /// Up to 8 hex digits, RRGGBBWW, optional 0x prefix
        color: String,
    },
    /// Ramp each channel 0→255→0 to verify wiring
    Sweep {
        /// Milliseconds to hold each brightness level
        #[arg(long)]
        step_ms: Option<u64>,
    },
    /// Turn all channels off and disable PWM
    Reset,
}

#[derive(Clone, Copy, ValueEnum)]
enum PatternArg {
    Random,
    Fade,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .with_ansi(false) // Disable ANSI color codes for systemd/journald
        .compact()
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(&args)?;
    let mut ctx = open_context(args.simulate)?;

    tracing::info!("RGBW strip v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Pins R/G/B/W: {}/{}/{}/{} @ {} Hz",
        config.pins.red,
        config.pins.green,
        config.pins.blue,
        config.pins.white,
        config.frequency_hz
    );

    match args.command {
        Command::Run {
            pattern,
            bpm,
            from,
            to,
            scale,
            join_timeout_ms,
        } => {
            let kind = match pattern {
                PatternArg::Random => PatternKind::Random,
                PatternArg::Fade => PatternKind::Fade {
                    start: from.into(),
                    end: to.into(),
                    duration_scale: scale,
                },
            };
            // Reject bad colors and tempos before any pin is opened.
            kind.validate(bpm)?;
            let running = setup_signal_handler()?;
            let color = CompositeColor::open(&mut ctx, &config, Rgbw::OFF)?;
            let mut sequencer = Sequencer::with_pattern(Pattern::new(color), kind, bpm)?;
            sequencer.start()?;

            while is_running(&running) {
                thread::sleep(Duration::from_millis(100));
            }

            tracing::info!("Stopping sequencer...");
            match sequencer.join(join_timeout_ms.map(Duration::from_millis)) {
                Ok(()) => diagnostics::reset(&mut ctx, &config)?,
                Err(Error::TimeoutExceeded) => {
                    tracing::warn!("Sequencer did not stop in time; exiting without reset");
                    // Dropping would block on the thread again; process exit ends it.
                    std::mem::forget(sequencer);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Command::Set { color: hex } => {
            let value: Rgbw = hex.parse()?;
            let running = setup_signal_handler()?;
            let mut color = CompositeColor::open(&mut ctx, &config, Rgbw::OFF)?;
            color.set_color(hex)?;
            tracing::info!("Showing {} until Ctrl+C", value);

            while is_running(&running) {
                thread::sleep(Duration::from_millis(100));
            }
            color.off()?;
        }

        Command::Sweep { step_ms } => {
            let step = step_ms.map_or(DEFAULT_SWEEP_STEP, Duration::from_millis);
            let running = setup_signal_handler()?;
            let mut color = CompositeColor::open(&mut ctx, &config, Rgbw::OFF)?;
            diagnostics::sweep(&mut color, step, &running)?;
        }

        Command::Reset => diagnostics::reset(&mut ctx, &config)?,
    }

    println!("\nShutting down cleanly.");
    Ok(())
}

/// Config file (if any), then per-flag overrides.
fn resolve_config(args: &Args) -> rgbw_strip::Result<StripConfig> {
    let mut config = match &args.config {
        Some(path) => StripConfig::load(path)?,
        None => StripConfig::default(),
    };
    if let Some(frequency) = args.frequency {
        config.frequency_hz = frequency;
    }
    if let Some(pin) = args.red {
        config.pins.red = pin;
    }
    if let Some(pin) = args.green {
        config.pins.green = pin;
    }
    if let Some(pin) = args.blue {
        config.pins.blue = pin;
    }
    if let Some(pin) = args.white {
        config.pins.white = pin;
    }
    config.validate()?;
    Ok(config)
}

#[cfg(feature = "hardware")]
fn open_context(simulate: bool) -> rgbw_strip::Result<HardwareContext> {
    if simulate {
        return Ok(HardwareContext::simulated().0);
    }
    HardwareContext::raspberry_pi()
}

#[cfg(not(feature = "hardware"))]
fn open_context(simulate: bool) -> rgbw_strip::Result<HardwareContext> {
    if !simulate {
        tracing::warn!("Built without the 'hardware' feature; using simulated PWM");
    }
    Ok(HardwareContext::simulated().0)
}
