//! PWM capability: the only thing the core needs from the hardware.
//!
//! A backend hands out one [`PwmPin`] per configured pin. Each `Channel`
//! owns its pin exclusively, so no locking is needed between channels.
//! [`HardwareContext`] is created once by the entry point and passed into
//! channel constructors; there is no process-wide GPIO state.
//!
//! ## Backends
//! - `RppalBackend` (feature `hardware`): software PWM on Raspberry Pi BCM pins
//! - [`SimulatedPwm`]: records writes in memory, for tests and `--simulate`

use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// A single configured PWM output line.
pub trait PwmPin: Send {
    /// Write a duty cycle in percent (0-100). Takes effect immediately.
    fn set_duty_cycle_percent(&mut self, percent: f64) -> Result<()>;

    /// Disable PWM output on this pin.
    fn stop(&mut self) -> Result<()>;
}

/// Something that can claim pins and set them up for PWM.
pub trait PwmBackend {
    /// Configure `pin` for PWM at `frequency_hz` and hand back its output.
    fn configure(&mut self, pin: u8, frequency_hz: f64) -> Result<Box<dyn PwmPin>>;
}

/// Explicit hardware handle, constructed once and passed by reference.
pub struct HardwareContext {
    backend: Box<dyn PwmBackend>,
}

impl HardwareContext {
    pub fn new(backend: impl PwmBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Context backed by an in-memory [`SimulatedPwm`]. The returned log
    /// observes every write made through channels opened on it.
    pub fn simulated() -> (Self, PwmLog) {
        let backend = SimulatedPwm::new();
        let log = backend.log();
        (Self::new(backend), log)
    }

    /// Context backed by the Raspberry Pi GPIO peripheral.
    #[cfg(feature = "hardware")]
    pub fn raspberry_pi() -> Result<Self> {
        Ok(Self::new(crate::rpi::RppalBackend::new()?))
    }

    pub fn configure(&mut self, pin: u8, frequency_hz: f64) -> Result<Box<dyn PwmPin>> {
        self.backend.configure(pin, frequency_hz)
    }
}

// ── Simulated backend ────────────────────────────────────────────────

/// One observable hardware operation.
#[derive(Clone, Debug, PartialEq)]
pub enum PwmEvent {
    Configure { pin: u8, frequency_hz: f64 },
    Duty { pin: u8, percent: f64 },
    Stop { pin: u8 },
}

/// Shared record of everything written to a [`SimulatedPwm`].
///
/// Cloning is cheap; all clones see the same events.
#[derive(Clone, Default)]
pub struct PwmLog {
    events: Arc<Mutex<Vec<PwmEvent>>>,
    fail_next_write: Arc<AtomicBool>,
}

impl PwmLog {
    fn push(&self, event: PwmEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// Snapshot of all events so far, oldest first.
    pub fn events(&self) -> Vec<PwmEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Duty cycles written to `pin`, oldest first.
    pub fn duty_history(&self, pin: u8) -> Vec<f64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PwmEvent::Duty { pin: p, percent } if p == pin => Some(percent),
                _ => None,
            })
            .collect()
    }

    /// Most recent duty cycle written to `pin`, if any.
    pub fn last_duty(&self, pin: u8) -> Option<f64> {
        self.duty_history(pin).last().copied()
    }

    pub fn stop_count(&self, pin: u8) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, PwmEvent::Stop { pin: p } if *p == pin))
            .count()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Make the next duty-cycle write on any pin fail with `Error::Hardware`.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::Release);
    }

    fn take_failure(&self) -> bool {
        self.fail_next_write.swap(false, Ordering::AcqRel)
    }
}

/// In-memory PWM backend. Nothing touches real hardware.
#[derive(Default)]
pub struct SimulatedPwm {
    log: PwmLog,
}

impl SimulatedPwm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> PwmLog {
        self.log.clone()
    }
}

impl PwmBackend for SimulatedPwm {
    fn configure(&mut self, pin: u8, frequency_hz: f64) -> Result<Box<dyn PwmPin>> {
        tracing::debug!(pin, frequency_hz, "simulated PWM configured");
        self.log.push(PwmEvent::Configure { pin, frequency_hz });
        Ok(Box::new(SimulatedPin {
            pin,
            log: self.log.clone(),
        }))
    }
}

struct SimulatedPin {
    pin: u8,
    log: PwmLog,
}

impl PwmPin for SimulatedPin {
    fn set_duty_cycle_percent(&mut self, percent: f64) -> Result<()> {
        if self.log.take_failure() {
            return Err(Error::Hardware(format!(
                "simulated write failure on pin {}",
                self.pin
            )));
        }
        tracing::trace!(pin = self.pin, percent, "duty cycle");
        self.log.push(PwmEvent::Duty {
            pin: self.pin,
            percent,
        });
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.log.push(PwmEvent::Stop { pin: self.pin });
        Ok(())
    }
}
