//! Error type shared by every module of the crate.
//!
//! Brightness values are never an error: they are clamped. Everything
//! else that can go wrong surfaces as one of these variants.

use std::fmt;
use std::io;

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Color text was not 0-8 hex digits with an optional `0x` prefix.
    InvalidColorFormat(String),
    /// A byte color spec did not have exactly four entries.
    InvalidChannelCount(usize),
    /// `Sequencer::join` gave up waiting. Non-fatal: the background
    /// thread may still be finishing its current pattern call.
    TimeoutExceeded,
    /// Zero fade steps, or a tempo that is not a positive finite number.
    InvalidTempo,
    /// Lifecycle call made from the wrong sequencer state.
    InvalidState,
    /// The PWM backend rejected an operation.
    Hardware(String),
    /// The background thread could not be spawned.
    Spawn(io::Error),
    /// A configuration file could not be read or parsed.
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidColorFormat(input) => {
                write!(f, "invalid color format: {input:?} (expected up to 8 hex digits)")
            }
            Error::InvalidChannelCount(count) => {
                write!(f, "invalid channel count: expected 4 values, got {count}")
            }
            Error::TimeoutExceeded => write!(f, "timed out waiting for sequencer to stop"),
            Error::InvalidTempo => write!(f, "tempo and step count must be positive"),
            Error::InvalidState => write!(f, "operation not valid in current sequencer state"),
            Error::Hardware(msg) => write!(f, "PWM hardware error: {msg}"),
            Error::Spawn(e) => write!(f, "failed to spawn sequencer thread: {e}"),
            Error::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(feature = "hardware")]
impl From<rppal::gpio::Error> for Error {
    fn from(e: rppal::gpio::Error) -> Self {
        Error::Hardware(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_includes_offending_input() {
        let e = Error::InvalidColorFormat("zzzzzzzz".to_string());
        assert_eq!(
            e.to_string(),
            "invalid color format: \"zzzzzzzz\" (expected up to 8 hex digits)"
        );
    }

    #[test]
    fn spawn_error_exposes_source() {
        let e = Error::Spawn(io::Error::other("no threads"));
        assert!(std::error::Error::source(&e).is_some());
        assert!(std::error::Error::source(&Error::TimeoutExceeded).is_none());
    }
}
