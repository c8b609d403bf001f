//! Small helpers shared across the crate: hex formatting for frame dumps
//! and millisecond time helpers.

pub mod hex;
pub mod timeout;

pub use hex::*;
pub use timeout::*;
