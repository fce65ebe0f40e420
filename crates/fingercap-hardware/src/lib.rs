//! Scanner abstraction layer for fingerprint capture.
//!
//! This crate defines the [`ScannerDevice`] trait that the capture engine
//! drives, the scanner's fault vocabulary ([`FaultCode`]), commands as data
//! ([`DeviceCommand`]), and a scriptable [`MockScanner`](mock::MockScanner)
//! for development and tests.
//!
//! # Design Philosophy
//!
//! - **Async-first**: All I/O operations are asynchronous using native `async fn`
//!   in traits (Rust 1.90 + Edition 2024 RPITIT).
//! - **Enum dispatch**: [`AnyScannerDevice`](devices::AnyScannerDevice) gives
//!   callers a concrete type to move into tasks.
//! - **Thread-safe**: The trait requires `Send + Sync` for use with Tokio.
//! - **One fault vocabulary**: every [`HardwareError`] maps onto a
//!   [`FaultCode`], which is all the capture engine ever inspects.
//!
//! # Capture Sequence
//!
//! ```no_run
//! use std::time::Duration;
//! use fingercap_hardware::{DeviceCommand, DeviceReply};
//! use fingercap_hardware::mock::MockScanner;
//!
//! # async fn example() -> fingercap_hardware::Result<()> {
//! let (mut scanner, handle) = MockScanner::new();
//! handle.place_finger(vec![1, 2, 3], 80).await?;
//!
//! let steps = [
//!     DeviceCommand::StartContinuousCapture { quality_floor: 60, timeout: Duration::from_secs(3) },
//!     DeviceCommand::ExtractImageQuality,
//!     DeviceCommand::GenerateTemplate,
//!     DeviceCommand::ExtractTemplate,
//! ];
//! for step in steps {
//!     let reply = step.execute(&mut scanner).await?;
//!     println!("{step}: {reply:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod devices;
pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use command::{DeviceCommand, DeviceReply};
pub use devices::AnyScannerDevice;
pub use error::{FaultCode, HardwareError, Result};
pub use traits::ScannerDevice;
pub use types::{DeviceInfo, TriggerPress};
