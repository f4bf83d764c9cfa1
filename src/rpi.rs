//! Raspberry Pi backend built on `rppal`.
//!
//! Uses software PWM so any BCM pin works, which matches the default
//! pin map (22, 17, 24, 27) that has no hardware PWM channels.

use crate::Result;
use crate::pwm::{PwmBackend, PwmPin};
use rppal::gpio::{Gpio, OutputPin};

pub struct RppalBackend {
    gpio: Gpio,
}

impl RppalBackend {
    /// Open the GPIO peripheral. Fails when not running on a Pi or
    /// without access to `/dev/gpiomem`.
    pub fn new() -> Result<Self> {
        Ok(Self { gpio: Gpio::new()? })
    }
}

impl PwmBackend for RppalBackend {
    fn configure(&mut self, pin: u8, frequency_hz: f64) -> Result<Box<dyn PwmPin>> {
        let mut output = self.gpio.get(pin)?.into_output_low();
        output.set_pwm_frequency(frequency_hz, 0.0)?;
        tracing::debug!(pin, frequency_hz, "rppal software PWM configured");
        Ok(Box::new(RppalPin {
            output,
            frequency_hz,
        }))
    }
}

struct RppalPin {
    output: OutputPin,
    frequency_hz: f64,
}

impl PwmPin for RppalPin {
    fn set_duty_cycle_percent(&mut self, percent: f64) -> Result<()> {
        // rppal expects a fraction in 0.0..=1.0
        let fraction = (percent / 100.0).clamp(0.0, 1.0);
        self.output.set_pwm_frequency(self.frequency_hz, fraction)?;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.output.clear_pwm()?;
        self.output.set_low();
        Ok(())
    }
}
