//! RGBW color values and the hex text format used at every boundary.
//!
//! Text form: up to 8 hex digits, case-insensitive, optional `0x` prefix,
//! left-zero-padded to 8 digits and read as four bytes in R, G, B, W order.
//! `"ff33dd44"` is red 255, green 51, blue 221, white 68.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Four channel brightness values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgbw {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub w: u8,
}

impl Rgbw {
    pub const OFF: Rgbw = Rgbw::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, w: u8) -> Self {
        Self { r, g, b, w }
    }

    pub const fn from_array([r, g, b, w]: [u8; 4]) -> Self {
        Self { r, g, b, w }
    }

    /// Channels in application order: red, green, blue, white.
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.w]
    }

    /// Pack into a 32-bit value, red in the most significant byte.
    pub const fn to_u32(self) -> u32 {
        u32::from_be_bytes(self.to_array())
    }

    pub const fn from_u32(value: u32) -> Self {
        Self::from_array(value.to_be_bytes())
    }

    /// Lowercase 8-digit hex, no prefix.
    pub fn to_hex(self) -> String {
        format!("{:08x}", self.to_u32())
    }
}

impl fmt::Display for Rgbw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.to_u32())
    }
}

impl FromStr for Rgbw {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        decode_hex(s)
    }
}

impl From<[u8; 4]> for Rgbw {
    fn from(values: [u8; 4]) -> Self {
        Self::from_array(values)
    }
}

/// Decode color text into channel values.
///
/// Strings longer than 8 digits (after the prefix) and any non-hex
/// character are rejected with [`Error::InvalidColorFormat`].
pub fn decode_hex(input: &str) -> Result<Rgbw> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.len() > 8 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidColorFormat(input.to_string()));
    }

    let padded = format!("{digits:0>8}");
    let value = u32::from_str_radix(&padded, 16)
        .map_err(|_| Error::InvalidColorFormat(input.to_string()))?;
    Ok(Rgbw::from_u32(value))
}

/// A color exactly as the caller supplied it.
///
/// `CompositeColor` keeps the last applied spec so `get_color` returns
/// the caller's own representation rather than a normalized one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColorSpec {
    Hex(String),
    Bytes([u8; 4]),
}

impl ColorSpec {
    /// Build a byte spec from a slice, which must hold exactly four values.
    pub fn from_slice(values: &[u8]) -> Result<Self> {
        let bytes: [u8; 4] = values
            .try_into()
            .map_err(|_| Error::InvalidChannelCount(values.len()))?;
        Ok(ColorSpec::Bytes(bytes))
    }

    /// Resolve to channel values, validating hex text.
    pub fn to_rgbw(&self) -> Result<Rgbw> {
        match self {
            ColorSpec::Hex(text) => decode_hex(text),
            ColorSpec::Bytes(bytes) => Ok(Rgbw::from_array(*bytes)),
        }
    }
}

impl Default for ColorSpec {
    fn default() -> Self {
        ColorSpec::Hex("00000000".to_string())
    }
}

impl fmt::Display for ColorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorSpec::Hex(text) => f.write_str(text),
            ColorSpec::Bytes(bytes) => write!(f, "{bytes:?}"),
        }
    }
}

impl From<&str> for ColorSpec {
    fn from(text: &str) -> Self {
        ColorSpec::Hex(text.to_string())
    }
}

impl From<String> for ColorSpec {
    fn from(text: String) -> Self {
        ColorSpec::Hex(text)
    }
}

impl From<[u8; 4]> for ColorSpec {
    fn from(bytes: [u8; 4]) -> Self {
        ColorSpec::Bytes(bytes)
    }
}

impl From<Rgbw> for ColorSpec {
    fn from(color: Rgbw) -> Self {
        ColorSpec::Bytes(color.to_array())
    }
}

impl TryFrom<&[u8]> for ColorSpec {
    type Error = Error;

    fn try_from(values: &[u8]) -> Result<Self> {
        Self::from_slice(values)
    }
}
