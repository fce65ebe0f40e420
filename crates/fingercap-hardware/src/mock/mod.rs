//! Mock device implementations for testing and development.
//!
//! This module provides a simulated scanner that can be controlled
//! programmatically without requiring physical hardware.

pub mod scanner;

pub use scanner::{MOCK_HARDWARE_REVISION, MockScanner, MockScannerHandle, MockStep};
