//! Hex formatting for frame dumps in logs.

use std::fmt;

/// Lazily formats a byte slice as space-separated lowercase hex, so log
/// macros only pay for formatting when the record is enabled.
///
/// Frames longer than [`Hex::LIMIT`] are truncated with a byte count.
#[derive(Clone, Copy)]
pub struct Hex<'a>(pub &'a [u8]);

impl Hex<'_> {
    pub const LIMIT: usize = 32;
}

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = &self.0[..self.0.len().min(Self::LIMIT)];
        for (i, b) in shown.iter().enumerate() {
            if i != 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02x}", b)?;
        }
        if self.0.len() > Self::LIMIT {
            write!(f, " .. ({} bytes)", self.0.len())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Convert a byte slice to a lowercase hex string with a single space between
/// each byte. Not truncated.
pub fn bytes_to_hex_spaced(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
