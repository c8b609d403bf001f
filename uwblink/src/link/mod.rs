// uwblink/src/link/mod.rs
//! Link layer: retry pacing and the synchronous read/write session over a
//! [`SpiHandshakeTransport`](crate::transport::SpiHandshakeTransport).

pub mod backoff;
pub mod config;
pub mod session;

pub use backoff::{Backoff, BackoffStep};
pub use config::LinkConfig;
pub use session::LinkSession;
