//! Core domain types for fingerprint capture sessions.
//!
//! This crate holds everything the other fingercap crates agree on: finger
//! identities and their requirement table, the per-finger capture status,
//! captured templates, alert kinds, and the capture settings together with
//! the stores that load and save them.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use config::{CaptureSettings, ConfigStore, FingerConfig, MemoryConfigStore, TomlConfigStore};
pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
