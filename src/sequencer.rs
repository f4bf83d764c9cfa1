//! Background thread that plays a pattern over and over at a fixed tempo.
//!
//! ## Lifecycle
//! `Created` → `start()` → `Running` → `request_stop()` → `StopRequested`
//! → `join()` → `Stopped`.
//!
//! Cancellation is cooperative: the thread checks the state once per
//! pattern call, so stopping can take up to one full pattern invocation
//! (a whole fade, or one beat of random jumps). A join timeout only bounds
//! how long the caller waits; it never interrupts the thread.
//!
//! The tempo is checked before the thread is spawned. A pattern that
//! still fails is retried after [`ERROR_BACKOFF`], so a persistent fault
//! cannot spin the thread.

use crate::pattern::{Pattern, PatternKind, beat_interval};
use crate::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Pause after a failed pattern call before the next one.
pub const ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Boxed pattern function: called with the tempo in beats per minute.
pub type PatternFn = Box<dyn FnMut(f64) -> Result<()> + Send>;

/// Lifecycle state, stored in an `AtomicU8` so both threads can read it.
///
/// # Rust concept: atomics as a lock-free state machine
/// `#[repr(u8)]` fixes each variant's discriminant, so `state as u8` and
/// `from_u8` convert losslessly. Writes use `Release` and reads use
/// `Acquire`: anything the writer did before the store is visible to a
/// thread that observes the new state. `request_stop` uses
/// `compare_exchange` so it only moves `Running` forward and cannot undo
/// a `Stopped` written by `join`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SequencerState {
    Created = 0,
    Running = 1,
    StopRequested = 2,
    Stopped = 3,
}

impl SequencerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SequencerState::Created,
            1 => SequencerState::Running,
            2 => SequencerState::StopRequested,
            _ => SequencerState::Stopped,
        }
    }
}

/// State shared between the control side and the background thread.
struct Shared {
    state: AtomicU8,
    iterations: AtomicU64,
    errors: AtomicU64,
}

impl Shared {
    fn state(&self) -> SequencerState {
        SequencerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: SequencerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Handle to a spawned sequencer thread.
///
/// # Rust concept: channel disconnect as an exit signal
/// `JoinHandle::join` has no timeout, so the thread also owns the sending
/// half of an `mpsc` channel. When the closure returns or unwinds, the
/// `Sender` is dropped and `recv_timeout` on this side yields
/// `Disconnected`. Waiting on the receiver gives a bounded join; the real
/// `join` then only runs once the thread is known to be finished.
struct Worker {
    handle: JoinHandle<()>,
    exited: Receiver<()>,
}

pub struct Sequencer {
    shared: Arc<Shared>,
    pattern: Option<PatternFn>,
    bpm: f64,
    worker: Option<Worker>,
}

impl Sequencer {
    pub fn new(pattern: impl FnMut(f64) -> Result<()> + Send + 'static, bpm: f64) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: AtomicU8::new(SequencerState::Created as u8),
                iterations: AtomicU64::new(0),
                errors: AtomicU64::new(0),
            }),
            pattern: Some(Box::new(pattern)),
            bpm,
            worker: None,
        }
    }

    /// Sequencer that plays `kind` on `pattern`'s color.
    ///
    /// Fails without building anything when `kind` cannot run at `bpm`;
    /// see [`PatternKind::validate`].
    pub fn with_pattern(pattern: Pattern, kind: PatternKind, bpm: f64) -> Result<Self> {
        kind.validate(bpm)?;
        Ok(Self::new(pattern.into_fn(kind), bpm))
    }

    /// Spawn the background thread. Only valid once, from `Created`.
    ///
    /// The tempo must be finite and positive; otherwise this returns
    /// [`Error::InvalidTempo`] and the sequencer stays `Created`.
    pub fn start(&mut self) -> Result<()> {
        if self.state() != SequencerState::Created {
            return Err(Error::InvalidState);
        }
        beat_interval(self.bpm)?;
        let Some(mut pattern) = self.pattern.take() else {
            return Err(Error::InvalidState);
        };

        self.shared.set_state(SequencerState::Running);
        let shared = Arc::clone(&self.shared);
        let bpm = self.bpm;
        let (exited_tx, exited_rx) = mpsc::channel();

        let spawned = thread::Builder::new()
            .name("sequencer".to_string())
            .spawn(move || {
                run_loop(&shared, &mut pattern, bpm);
                // Release the pattern (and its pins) before reporting exit.
                drop(pattern);
                let _ = exited_tx.send(());
            });

        match spawned {
            Ok(handle) => {
                tracing::info!(bpm, "sequencer started");
                self.worker = Some(Worker {
                    handle,
                    exited: exited_rx,
                });
                Ok(())
            }
            Err(e) => {
                self.shared.set_state(SequencerState::Stopped);
                Err(Error::Spawn(e))
            }
        }
    }

    /// Ask the thread to stop after its current pattern call. Never blocks.
    pub fn request_stop(&self) {
        let requested = self.shared.state.compare_exchange(
            SequencerState::Running as u8,
            SequencerState::StopRequested as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if requested.is_ok() {
            tracing::debug!("sequencer stop requested");
        }
    }

    /// Request stop, then wait for the thread to exit.
    ///
    /// With `timeout`, gives up after that long and returns
    /// [`Error::TimeoutExceeded`]; the thread keeps running toward its
    /// stop and `join` may be called again. Once stopped, further calls
    /// return `Ok(())` immediately.
    pub fn join(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.request_stop();

        let Some(worker) = self.worker.take() else {
            // Never started (or already joined): nothing to wait for.
            self.pattern = None;
            self.shared.set_state(SequencerState::Stopped);
            return Ok(());
        };

        let exited = match timeout {
            None => {
                let _ = worker.exited.recv();
                true
            }
            Some(limit) => match worker.exited.recv_timeout(limit) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
                Err(RecvTimeoutError::Timeout) => false,
            },
        };

        if !exited {
            tracing::warn!(?timeout, "sequencer still running after join timeout");
            self.worker = Some(worker);
            return Err(Error::TimeoutExceeded);
        }

        if worker.handle.join().is_err() {
            tracing::error!("sequencer thread panicked");
        }
        self.shared.set_state(SequencerState::Stopped);
        tracing::info!(
            iterations = self.iterations(),
            errors = self.error_count(),
            "sequencer stopped"
        );
        Ok(())
    }

    pub fn state(&self) -> SequencerState {
        self.shared.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SequencerState::Running
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Completed pattern calls, including failed ones.
    pub fn iterations(&self) -> u64 {
        self.shared.iterations.load(Ordering::Acquire)
    }

    /// Pattern calls that returned an error.
    pub fn error_count(&self) -> u64 {
        self.shared.errors.load(Ordering::Acquire)
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.join(None);
        }
    }
}

fn run_loop(shared: &Shared, pattern: &mut PatternFn, bpm: f64) {
    while shared.state() == SequencerState::Running {
        if let Err(e) = pattern(bpm) {
            shared.errors.fetch_add(1, Ordering::AcqRel);
            tracing::warn!("pattern failed: {}", e);
            thread::sleep(ERROR_BACKOFF);
        }
        shared.iterations.fetch_add(1, Ordering::AcqRel);
    }
}
