//! Hardware checks run from the command line.
//!
//! - [`sweep`]: ramps each channel up and back down so every LED color can
//!   be checked by eye.
//! - [`reset`]: forces all four pins to zero and disables PWM, leaving the
//!   strip dark after a crash or an interrupted run.

use crate::color::Rgbw;
use crate::composite::CompositeColor;
use crate::pwm::HardwareContext;
use crate::{Result, StripConfig, is_running};
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;

/// Default hold time per sweep level.
pub const DEFAULT_SWEEP_STEP: Duration = Duration::from_millis(1);

const CHANNEL_NAMES: [&str; 4] = ["red", "green", "blue", "white"];

/// Brightness levels for one channel: 0 up to 255, then back down to 0.
pub fn ramp() -> impl Iterator<Item = u8> {
    (0..=255u8).chain((0..255u8).rev())
}

/// Ramp red, green, blue, then white, one at a time, holding each level
/// for `step`. Stops early (leaving the strip off) once `running` clears.
pub fn sweep(color: &mut CompositeColor, step: Duration, running: &AtomicBool) -> Result<()> {
    for (index, name) in CHANNEL_NAMES.iter().enumerate() {
        tracing::info!("Sweeping {} channel", name);
        for level in ramp() {
            if !is_running(running) {
                tracing::info!("Sweep interrupted");
                return color.off();
            }
            let mut values = [0u8; 4];
            values[index] = level;
            color.set_color(values)?;
            thread::sleep(step);
        }
    }
    color.off()
}

/// Open every pin at zero brightness, then disable PWM on all of them.
pub fn reset(ctx: &mut HardwareContext, config: &StripConfig) -> Result<()> {
    let mut color = CompositeColor::open(ctx, config, Rgbw::OFF)?;
    color.stop()?;
    tracing::info!(
        red = config.pins.red,
        green = config.pins.green,
        blue = config.pins.blue,
        white = config.pins.white,
        "All channels reset"
    );
    Ok(())
}
