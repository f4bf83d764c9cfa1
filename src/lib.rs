//! Driver and pattern sequencer for a four-channel (RGBW) LED strip.
//!
//! Data flows one way:
//! `Sequencer` → pattern function → `CompositeColor::set_color`
//! → `Channel::set_brightness` → PWM duty-cycle write.
//!
//! Hardware access goes through the [`pwm`] traits, so everything except
//! the `rppal` backend runs and tests on any machine.
//!
//! This module holds the pieces the binary and the library share:
//! - Strip configuration (pin map and PWM frequency)
//! - Signal handling for clean shutdown

pub mod channel;
pub mod color;
pub mod composite;
pub mod diagnostics;
pub mod error;
pub mod pattern;
pub mod pwm;
#[cfg(feature = "hardware")]
pub mod rpi;
pub mod sequencer;

pub use channel::Channel;
pub use color::{ColorSpec, Rgbw};
pub use composite::CompositeColor;
pub use error::{Error, Result};
pub use pattern::{Pattern, PatternKind};
pub use pwm::HardwareContext;
pub use sequencer::{Sequencer, SequencerState};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// ── Strip configuration ────────────────────────────────────────────

/// BCM pin numbers for each color channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinConfig {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub white: u8,
}

impl PinConfig {
    pub fn as_array(&self) -> [u8; 4] {
        [self.red, self.green, self.blue, self.white]
    }
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            red: 22,
            green: 17,
            blue: 24,
            white: 27,
        }
    }
}

/// Everything needed to open the strip's four channels.
///
/// Missing fields in a config file fall back to the defaults, so a file
/// containing only `{"frequency_hz": 500}` is valid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripConfig {
    pub pins: PinConfig,
    pub frequency_hz: f64,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            pins: PinConfig::default(),
            frequency_hz: channel::DEFAULT_FREQUENCY_HZ,
        }
    }
}

impl StripConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: StripConfig =
            serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Pins must be distinct and the frequency a positive number.
    pub fn validate(&self) -> Result<()> {
        if !self.frequency_hz.is_finite() || self.frequency_hz <= 0.0 {
            return Err(Error::Config(format!(
                "frequency must be positive, got {}",
                self.frequency_hz
            )));
        }
        let pins = self.pins.as_array();
        for (i, pin) in pins.iter().enumerate() {
            if pins[i + 1..].contains(pin) {
                return Err(Error::Config(format!("pin {pin} is assigned twice")));
            }
        }
        Ok(())
    }
}

// ── Signal handling ────────────────────────────────────────────────

/// Set up a Ctrl+C handler that sets the returned flag to false.
///
/// # Rust concept: Arc and AtomicBool
/// The flag is shared between the main loop and the signal handler.
/// `Arc` gives both of them ownership; `AtomicBool` makes the single
/// bool safe to touch from two threads without a mutex.
pub fn setup_signal_handler() -> std::result::Result<Arc<AtomicBool>, ctrlc::Error> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    Ok(running)
}

/// Check if the main loop should keep running.
pub fn is_running(running: &AtomicBool) -> bool {
    running.load(Ordering::SeqCst)
}

// ── Tests ──────────────────────────────────────────────────────────
