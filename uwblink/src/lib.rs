// uwblink/src/lib.rs

//! uwblink
//!
//! Host-side SPI link stack for UWB coprocessors: handshake-driven framing
//! plus the HBCI firmware download and SWUP update engines built on it.

pub mod constants;
pub mod error;
pub mod hbci;
pub mod link;
pub mod prelude;
pub mod protocol;
pub mod swup;
pub mod test_support;
pub mod transport;
pub mod types;
pub mod uci;
pub mod utils;

// Re-export common types at crate root so `crate::Error`, `crate::Result`,
// and the small domain types are available to consumers and to the
// `prelude` re-exports.
pub use crate::error::*;
pub use crate::types::*;

pub use prelude::*;
