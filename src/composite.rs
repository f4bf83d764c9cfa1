//! Four channels driven together as one RGBW color.

use crate::channel::Channel;
use crate::color::{ColorSpec, Rgbw};
use crate::pwm::HardwareContext;
use crate::{Result, StripConfig};
use rand::Rng;

/// Red, green, blue and white channels plus the last color applied to them.
///
/// After any setter returns, `get_color()` and the channel brightness
/// values describe the same color.
pub struct CompositeColor {
    red: Channel,
    green: Channel,
    blue: Channel,
    white: Channel,
    current: ColorSpec,
}

impl CompositeColor {
    /// Open all four pins from `config` with the given starting brightness.
    pub fn open(ctx: &mut HardwareContext, config: &StripConfig, initial: Rgbw) -> Result<Self> {
        let pins = config.pins;
        let freq = config.frequency_hz;
        Ok(Self {
            red: Channel::open(ctx, pins.red, freq, initial.r.into())?,
            green: Channel::open(ctx, pins.green, freq, initial.g.into())?,
            blue: Channel::open(ctx, pins.blue, freq, initial.b.into())?,
            white: Channel::open(ctx, pins.white, freq, initial.w.into())?,
            current: ColorSpec::Hex(initial.to_hex()),
        })
    }

    /// Apply a color given as hex text or four bytes.
    ///
    /// The input is fully decoded before any channel is touched, so a
    /// malformed color leaves the strip and `get_color()` unchanged.
    /// A hardware failure on one channel does not stop the others from
    /// being written; the first failure is returned.
    pub fn set_color(&mut self, color: impl Into<ColorSpec>) -> Result<()> {
        let spec = color.into();
        let values = spec.to_rgbw()?;

        let mut first_err = None;
        for (channel, value) in self.channels_mut().into_iter().zip(values.to_array()) {
            if let Err(e) = channel.set_brightness(value.into()) {
                first_err.get_or_insert(e);
            }
        }
        self.current = spec;

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// The last applied color, in the form it was supplied.
    pub fn get_color(&self) -> &ColorSpec {
        &self.current
    }

    /// Current channel brightness values.
    pub fn rgbw(&self) -> Rgbw {
        Rgbw::new(
            self.red.brightness(),
            self.green.brightness(),
            self.blue.brightness(),
            self.white.brightness(),
        )
    }

    /// Jump to a uniformly random 32-bit color.
    pub fn randomize(&mut self) -> Result<()> {
        self.randomize_with(&mut rand::rng())
    }

    pub fn randomize_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        let value: u32 = rng.random();
        self.set_color(format!("{value:08x}"))
    }

    pub fn off(&mut self) -> Result<()> {
        self.set_color("00000000")
    }

    /// Disable PWM on all four pins.
    pub fn stop(&mut self) -> Result<()> {
        let mut first_err = None;
        for channel in self.channels_mut() {
            if let Err(e) = channel.stop() {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn channels(&self) -> [&Channel; 4] {
        [&self.red, &self.green, &self.blue, &self.white]
    }

    fn channels_mut(&mut self) -> [&mut Channel; 4] {
        [
            &mut self.red,
            &mut self.green,
            &mut self.blue,
            &mut self.white,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::pwm::{PwmEvent, PwmLog};
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn open_strip() -> (CompositeColor, PwmLog) {
        let (mut ctx, log) = HardwareContext::simulated();
        let color = CompositeColor::open(&mut ctx, &StripConfig::default(), Rgbw::OFF).unwrap();
        log.clear();
        (color, log)
    }

    #[test]
    fn open_applies_initial_brightness_and_caches_it() {
        let (mut ctx, log) = HardwareContext::simulated();
        let initial = Rgbw::new(255, 0, 51, 0);
        let color = CompositeColor::open(&mut ctx, &StripConfig::default(), initial).unwrap();

        assert_eq!(color.rgbw(), initial);
        assert_eq!(color.get_color(), &ColorSpec::Hex("ff003300".to_string()));
        assert!((log.last_duty(22).unwrap() - 100.0).abs() < 1e-9);
        assert!((log.last_duty(24).unwrap() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn set_color_from_hex_fans_out_in_rgbw_order() {
        let (mut color, log) = open_strip();
        color.set_color("ff33dd44").unwrap();

        assert_eq!(color.rgbw(), Rgbw::new(255, 51, 221, 68));
        assert_eq!(color.get_color(), &ColorSpec::from("ff33dd44"));

        let pins: Vec<u8> = log
            .events()
            .into_iter()
            .filter_map(|e| match e {
                PwmEvent::Duty { pin, .. } => Some(pin),
                _ => None,
            })
            .collect();
        assert_eq!(pins, vec![22, 17, 24, 27]);
    }

    #[test]
    fn channels_follow_configured_pins() {
        let (color, _log) = open_strip();
        let pins: Vec<u8> = color.channels().iter().map(|c| c.pin()).collect();
        assert_eq!(pins, StripConfig::default().pins.as_array().to_vec());
        assert!(color.channels().iter().all(|c| c.frequency_hz() == 1000.0));
    }

    #[test]
    fn set_color_from_bytes_keeps_raw_input() {
        let (mut color, _log) = open_strip();
        color.set_color([1u8, 2, 3, 4]).unwrap();

        assert_eq!(color.get_color(), &ColorSpec::Bytes([1, 2, 3, 4]));
        assert_eq!(color.rgbw(), Rgbw::new(1, 2, 3, 4));
    }

    #[test]
    fn malformed_color_leaves_state_untouched() {
        let (mut color, log) = open_strip();
        color.set_color("0a0b0c0d").unwrap();
        log.clear();

        let result = color.set_color("zzzzzzzz");

        assert!(matches!(result, Err(Error::InvalidColorFormat(_))));
        assert_eq!(color.rgbw(), Rgbw::new(10, 11, 12, 13));
        assert_eq!(color.get_color(), &ColorSpec::from("0a0b0c0d"));
        assert!(log.events().is_empty());
    }

    #[test]
    fn hardware_failure_still_updates_remaining_channels() {
        let (mut color, log) = open_strip();
        log.fail_next_write();

        let result = color.set_color("11223344");

        assert!(matches!(result, Err(Error::Hardware(_))));
        assert_eq!(color.rgbw(), Rgbw::new(0x11, 0x22, 0x33, 0x44));
        assert_eq!(color.get_color(), &ColorSpec::from("11223344"));
        assert_eq!(log.duty_history(22), Vec::<f64>::new());
        assert_eq!(log.duty_history(17).len(), 1);
    }

    #[test]
    fn off_sets_every_channel_to_zero() {
        let (mut color, _log) = open_strip();
        color.set_color("ffffffff").unwrap();
        color.off().unwrap();

        assert_eq!(color.rgbw(), Rgbw::OFF);
        assert_eq!(color.get_color(), &ColorSpec::from("00000000"));
    }

    #[test]
    fn randomize_stores_lowercase_hex_matching_channels() {
        let (mut color, _log) = open_strip();
        let mut rng = StdRng::seed_from_u64(7);
        color.randomize_with(&mut rng).unwrap();

        let ColorSpec::Hex(text) = color.get_color().clone() else {
            panic!("randomize should store hex text");
        };
        assert_eq!(text.len(), 8);
        assert_eq!(text, text.to_lowercase());
        assert_eq!(color.rgbw().to_hex(), text);
    }

    #[test]
    fn randomize_is_roughly_uniform() {
        let (mut color, _log) = open_strip();
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut buckets = [0usize; 16];
        let samples = 16_000;

        for _ in 0..samples {
            color.randomize_with(&mut rng).unwrap();
            buckets[(color.rgbw().to_u32() >> 28) as usize] += 1;
        }

        // Expected 1000 per bucket; allow a generous band.
        for (i, count) in buckets.iter().enumerate() {
            assert!(
                (800..=1200).contains(count),
                "bucket {i} has {count} samples"
            );
        }
    }

    #[test]
    fn randomize_with_system_rng_succeeds() {
        let (mut color, _log) = open_strip();
        color.randomize().unwrap();
        assert_eq!(color.get_color().to_rgbw().unwrap(), color.rgbw());
    }

    #[test]
    fn stop_disables_all_pins() {
        let (mut color, log) = open_strip();
        color.stop().unwrap();
        for pin in [22, 17, 24, 27] {
            assert_eq!(log.stop_count(pin), 1);
        }
    }
}
