//! A single PWM-driven color channel.
//!
//! Brightness is 0-255. The duty cycle written to hardware follows a
//! squared curve, `(brightness / 25.5)^2`, so perceived intensity rises
//! roughly linearly with brightness.

use crate::Result;
use crate::pwm::{HardwareContext, PwmPin};

/// Default PWM frequency for LED channels.
pub const DEFAULT_FREQUENCY_HZ: f64 = 1000.0;

/// Clamp any integer brightness into 0-255.
pub fn clamp_brightness(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Duty cycle in percent (0-100) for a brightness.
pub fn duty_cycle(brightness: u8) -> f64 {
    (f64::from(brightness) / 25.5).powf(2.0)
}

/// One output line of the strip, owning its PWM pin.
///
/// The pin is stopped when the channel is dropped.
pub struct Channel {
    pin: u8,
    frequency_hz: f64,
    brightness: u8,
    duty: f64,
    output: Box<dyn PwmPin>,
    stopped: bool,
}

impl Channel {
    /// Configure `pin` through `ctx` and apply the initial brightness.
    pub fn open(
        ctx: &mut HardwareContext,
        pin: u8,
        frequency_hz: f64,
        brightness: i32,
    ) -> Result<Self> {
        let output = ctx.configure(pin, frequency_hz)?;
        let mut channel = Self {
            pin,
            frequency_hz,
            brightness: 0,
            duty: 0.0,
            output,
            stopped: false,
        };
        channel.set_brightness(brightness)?;
        Ok(channel)
    }

    /// Clamp, store, and write the matching duty cycle to hardware.
    ///
    /// The stored brightness and duty are updated even if the write fails,
    /// so they always reflect the last requested value.
    pub fn set_brightness(&mut self, value: i32) -> Result<()> {
        let brightness = clamp_brightness(value);
        self.brightness = brightness;
        self.duty = duty_cycle(brightness);
        self.stopped = false;
        self.output.set_duty_cycle_percent(self.duty)
    }

    /// Disable PWM output. Calling this more than once is harmless.
    pub fn stop(&mut self) -> Result<()> {
        if self.stopped {
            return Ok(());
        }
        self.output.stop()?;
        self.stopped = true;
        Ok(())
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Last duty cycle written, in percent.
    pub fn duty(&self) -> f64 {
        self.duty
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(pin = self.pin, "failed to stop PWM on drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pwm::HardwareContext;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(-1000, 0)]
    #[case(-1, 0)]
    #[case(0, 0)]
    #[case(128, 128)]
    #[case(255, 255)]
    #[case(256, 255)]
    #[case(i32::MAX, 255)]
    fn test_clamp_brightness(#[case] input: i32, #[case] expected: u8) {
        assert_eq!(clamp_brightness(input), expected);
    }

    #[rstest]
    #[case(0, 0.0)]
    #[case(51, 4.0)]
    #[case(255, 100.0)]
    fn test_duty_cycle_golden(#[case] brightness: u8, #[case] expected: f64) {
        assert!((duty_cycle(brightness) - expected).abs() < 1e-9);
    }

    #[test]
    fn duty_cycle_is_monotonic_and_bounded() {
        let mut previous = -1.0;
        for b in 0..=255u8 {
            let d = duty_cycle(b);
            assert!((0.0..=100.0 + 1e-9).contains(&d), "duty {d} out of range");
            assert!(d >= previous);
            previous = d;
        }
    }

    #[test]
    fn open_configures_pin_and_writes_initial_brightness() {
        let (mut ctx, log) = HardwareContext::simulated();
        let channel = Channel::open(&mut ctx, 22, DEFAULT_FREQUENCY_HZ, 51).unwrap();

        assert_eq!(channel.pin(), 22);
        assert_eq!(channel.brightness(), 51);
        assert!((channel.duty() - 4.0).abs() < 1e-9);
        assert_eq!(log.duty_history(22).len(), 1);
        assert!((log.last_duty(22).unwrap() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn set_brightness_clamps_and_writes_immediately() {
        let (mut ctx, log) = HardwareContext::simulated();
        let mut channel = Channel::open(&mut ctx, 17, DEFAULT_FREQUENCY_HZ, 0).unwrap();

        channel.set_brightness(300).unwrap();
        assert_eq!(channel.brightness(), 255);
        assert!((log.last_duty(17).unwrap() - 100.0).abs() < 1e-9);

        channel.set_brightness(-5).unwrap();
        assert_eq!(channel.brightness(), 0);
        assert_eq!(log.last_duty(17), Some(0.0));
    }

    #[test]
    fn stop_is_idempotent_and_runs_on_drop() {
        let (mut ctx, log) = HardwareContext::simulated();
        let mut channel = Channel::open(&mut ctx, 24, DEFAULT_FREQUENCY_HZ, 10).unwrap();

        channel.stop().unwrap();
        channel.stop().unwrap();
        drop(channel);

        assert_eq!(log.stop_count(24), 1);
    }

    #[test]
    fn drop_stops_unstopped_channel() {
        let (mut ctx, log) = HardwareContext::simulated();
        let channel = Channel::open(&mut ctx, 27, DEFAULT_FREQUENCY_HZ, 10).unwrap();
        drop(channel);
        assert_eq!(log.stop_count(27), 1);
    }

    #[test]
    fn write_failure_propagates() {
        let (mut ctx, log) = HardwareContext::simulated();
        let mut channel = Channel::open(&mut ctx, 22, DEFAULT_FREQUENCY_HZ, 0).unwrap();

        log.fail_next_write();
        assert!(channel.set_brightness(100).is_err());
        assert!(channel.set_brightness(100).is_ok());
    }
}
