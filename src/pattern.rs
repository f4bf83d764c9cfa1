//! Animation patterns played on a `CompositeColor`.
//!
//! Patterns block the calling thread while they run; the sequencer calls
//! them back to back on its own thread.
//!
//! Fade timing: each of the `steps` frames is held for
//! `60 * duration_scale / steps^2` seconds, so a whole fade lasts
//! `60 * duration_scale / steps` seconds and gets shorter as `steps` grows.

use crate::color::{ColorSpec, Rgbw};
use crate::composite::CompositeColor;
use crate::{Error, Result};
use std::thread;
use std::time::Duration;

/// How long each fade frame is held.
pub fn fade_step_delay(steps: u32, duration_scale: f64) -> Result<Duration> {
    if steps == 0 {
        return Err(Error::InvalidTempo);
    }
    let seconds = 60.0 * duration_scale / f64::from(steps).powi(2);
    Duration::try_from_secs_f64(seconds).map_err(|_| Error::InvalidTempo)
}

/// Color of fade frame `step` out of `steps`.
///
/// Each channel is `start + step * (end - start) / steps` with the division
/// truncating toward zero. Frame 0 is `start`; `end` itself is never reached.
pub fn fade_frame(start: Rgbw, end: Rgbw, step: u32, steps: u32) -> Rgbw {
    let channel = |a: u8, b: u8| -> u8 {
        let a = i64::from(a);
        let delta = i64::from(b) - a;
        let value = a + i64::from(step) * delta / i64::from(steps.max(1));
        value.clamp(0, 255) as u8
    };
    Rgbw::new(
        channel(start.r, end.r),
        channel(start.g, end.g),
        channel(start.b, end.b),
        channel(start.w, end.w),
    )
}

/// Largest step count a single fade may use.
pub const MAX_FADE_STEPS: u32 = 10_000;

/// Step count for a fade driven at `tempo`: the tempo truncated to an
/// integer, which must land in `1..=MAX_FADE_STEPS`.
pub fn fade_steps(tempo: f64) -> Result<u32> {
    if !tempo.is_finite() || tempo < 1.0 || tempo >= f64::from(MAX_FADE_STEPS) + 1.0 {
        return Err(Error::InvalidTempo);
    }
    Ok(tempo as u32)
}

/// Time between random jumps at the given tempo.
pub fn beat_interval(bpm: f64) -> Result<Duration> {
    if !bpm.is_finite() || bpm <= 0.0 {
        return Err(Error::InvalidTempo);
    }
    Duration::try_from_secs_f64(60.0 / bpm).map_err(|_| Error::InvalidTempo)
}

/// Which pattern a sequencer plays.
#[derive(Clone, Debug, PartialEq)]
pub enum PatternKind {
    /// Jump to a random color once per beat.
    Random,
    /// Fade from `start` toward `end`, using the tempo as the step count.
    Fade {
        start: ColorSpec,
        end: ColorSpec,
        duration_scale: f64,
    },
}

impl PatternKind {
    /// Check that one call at `tempo` can run to completion without
    /// failing on its inputs alone.
    pub fn validate(&self, tempo: f64) -> Result<()> {
        match self {
            PatternKind::Random => beat_interval(tempo).map(|_| ()),
            PatternKind::Fade {
                start,
                end,
                duration_scale,
            } => {
                start.to_rgbw()?;
                end.to_rgbw()?;
                fade_step_delay(fade_steps(tempo)?, *duration_scale).map(|_| ())
            }
        }
    }
}

/// Plays patterns on the color it owns.
pub struct Pattern {
    color: CompositeColor,
}

impl Pattern {
    pub fn new(color: CompositeColor) -> Self {
        Self { color }
    }

    pub fn color(&self) -> &CompositeColor {
        &self.color
    }

    /// Step from `start` toward `end` over `steps` frames.
    ///
    /// Both colors are decoded before anything is written.
    pub fn fade(
        &mut self,
        start: impl Into<ColorSpec>,
        end: impl Into<ColorSpec>,
        steps: u32,
        duration_scale: f64,
    ) -> Result<()> {
        let start = start.into().to_rgbw()?;
        let end = end.into().to_rgbw()?;
        let delay = fade_step_delay(steps, duration_scale)?;

        tracing::debug!(%start, %end, steps, ?delay, "fade");
        for step in 0..steps {
            let frame = fade_frame(start, end, step, steps);
            self.color.set_color(frame)?;
            thread::sleep(delay);
        }
        Ok(())
    }

    /// Jump to a random color, then hold it for one beat.
    pub fn random_jump(&mut self, bpm: f64) -> Result<()> {
        let interval = beat_interval(bpm)?;
        self.color.randomize()?;
        tracing::debug!(color = %self.color.get_color(), ?interval, "random jump");
        thread::sleep(interval);
        Ok(())
    }

    /// Play one invocation of `kind` at `tempo`.
    pub fn play(&mut self, kind: &PatternKind, tempo: f64) -> Result<()> {
        match kind {
            PatternKind::Random => self.random_jump(tempo),
            PatternKind::Fade {
                start,
                end,
                duration_scale,
            } => {
                let steps = fade_steps(tempo)?;
                self.fade(start.clone(), end.clone(), steps, *duration_scale)
            }
        }
    }

    /// Bind this pattern and a kind into a function the sequencer can loop.
    pub fn into_fn(
        mut self,
        kind: PatternKind,
    ) -> impl FnMut(f64) -> Result<()> + Send + 'static {
        move |tempo| self.play(&kind, tempo)
    }
}
