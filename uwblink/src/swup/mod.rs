// uwblink/src/swup/mod.rs
//! SWUP (software update) over RCI blocks.
//!
//! [`SwupClient`] issues single commands; [`SwupUpdater`] sequences them
//! into a full update following the state the device reports.

pub mod client;
pub mod config;
pub mod update;

pub use client::{SwupClient, SwupResponse};
pub use config::SwupConfig;
pub use update::{SwupPackage, SwupUpdater, UpdateOutcome};
