//! Capture settings and the stores that persist them.
//!
//! [`CaptureSettings`] carries the operator-tunable values (quality
//! threshold, continuous-capture timeout, nudge and haptic toggles) together
//! with the per-deployment finger table. Settings are validated every time
//! they are loaded or saved, so a session never starts from a table that
//! would break the active-set invariants.
//!
//! The on-disk format is TOML:
//!
//! ```toml
//! quality_threshold = 60
//! capture_timeout_secs = 3
//! nudge = true
//!
//! [[fingers]]
//! finger = "left_thumb"
//! requirement = "required"
//! priority = 0
//! ```

use crate::constants::{
    DEFAULT_CAPTURE_TIMEOUT_SECS, DEFAULT_NUDGE_DELAY_MS, DEFAULT_QUALITY_THRESHOLD,
    DEFAULT_RECONNECT_ATTEMPTS, MAX_CAPTURE_TIMEOUT_SECS, MAX_QUALITY_THRESHOLD,
    MAX_RECONNECT_ATTEMPTS, MIN_CAPTURE_TIMEOUT_SECS, MIN_QUALITY_THRESHOLD,
};
use crate::{Error, FingerId, FingerRequirement, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Requirement and ordering of one finger in the deployment table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerConfig {
    pub finger: FingerId,
    pub requirement: FingerRequirement,
    /// Ordering key; lower values are captured first.
    pub priority: u8,
}

impl FingerConfig {
    pub fn new(finger: FingerId, requirement: FingerRequirement, priority: u8) -> Self {
        Self {
            finger,
            requirement,
            priority,
        }
    }
}

/// The standard table: both left thumb and left index required, everything
/// else optional, ordered thumbs and index fingers before the rest.
pub fn default_finger_table() -> Vec<FingerConfig> {
    use FingerId::*;
    use FingerRequirement::*;

    vec![
        FingerConfig::new(LeftThumb, Required, 0),
        FingerConfig::new(LeftIndex, Required, 1),
        FingerConfig::new(RightThumb, Optional, 2),
        FingerConfig::new(RightIndex, Optional, 3),
        FingerConfig::new(LeftMiddle, Optional, 4),
        FingerConfig::new(LeftRing, Optional, 5),
        FingerConfig::new(LeftLittle, Optional, 6),
        FingerConfig::new(RightLittle, Optional, 7),
        FingerConfig::new(RightRing, Optional, 8),
        FingerConfig::new(RightMiddle, Optional, 9),
    ]
}

/// Settings that shape a capture session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Minimum quality for a good scan; also the continuous-capture floor.
    pub quality_threshold: u8,
    /// Continuous-capture timeout in seconds.
    pub capture_timeout_secs: u64,
    /// Auto-advance to the next finger after a good scan.
    pub nudge: bool,
    pub nudge_delay_ms: u64,
    /// Haptic pulse on scan completion.
    pub vibrate: bool,
    /// Start the session with optional fingers active as well as required ones.
    pub activate_optional_by_default: bool,
    /// Full connect/sync/verify passes before a reconnection is abandoned.
    pub reconnect_attempts: u32,
    pub fingers: Vec<FingerConfig>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            capture_timeout_secs: DEFAULT_CAPTURE_TIMEOUT_SECS,
            nudge: true,
            nudge_delay_ms: DEFAULT_NUDGE_DELAY_MS,
            vibrate: true,
            activate_optional_by_default: true,
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            fingers: default_finger_table(),
        }
    }
}

impl CaptureSettings {
    /// Settings with a different quality threshold, everything else default.
    pub fn with_threshold(quality_threshold: u8) -> Self {
        Self {
            quality_threshold,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.capture_timeout_secs)
    }

    #[must_use]
    pub fn nudge_delay(&self) -> Duration {
        Duration::from_millis(self.nudge_delay_ms)
    }

    /// Validate ranges and the finger table.
    ///
    /// # Errors
    /// - `ThresholdOutOfRange` / `TimeoutOutOfRange` for values outside the
    ///   operator-adjustable ranges
    /// - `DuplicateFinger` / `MissingFinger` unless every finger appears once
    /// - `NoRequiredFinger` if nothing is required
    /// - `InvalidConfig` for duplicated priorities or a bad reconnect count
    pub fn validate(&self) -> Result<()> {
        if !(MIN_QUALITY_THRESHOLD..=MAX_QUALITY_THRESHOLD).contains(&self.quality_threshold) {
            return Err(Error::ThresholdOutOfRange {
                value: self.quality_threshold,
                min: MIN_QUALITY_THRESHOLD,
                max: MAX_QUALITY_THRESHOLD,
            });
        }

        if !(MIN_CAPTURE_TIMEOUT_SECS..=MAX_CAPTURE_TIMEOUT_SECS)
            .contains(&self.capture_timeout_secs)
        {
            return Err(Error::TimeoutOutOfRange {
                value: self.capture_timeout_secs,
                min: MIN_CAPTURE_TIMEOUT_SECS,
                max: MAX_CAPTURE_TIMEOUT_SECS,
            });
        }

        if !(1..=MAX_RECONNECT_ATTEMPTS).contains(&self.reconnect_attempts) {
            return Err(Error::InvalidConfig(format!(
                "reconnect_attempts must be 1-{MAX_RECONNECT_ATTEMPTS}, got {}",
                self.reconnect_attempts
            )));
        }

        let mut seen = HashSet::new();
        let mut priorities = HashSet::new();
        for entry in &self.fingers {
            if !seen.insert(entry.finger) {
                return Err(Error::DuplicateFinger(entry.finger.to_string()));
            }
            if !priorities.insert(entry.priority) {
                return Err(Error::InvalidConfig(format!(
                    "priority {} assigned to more than one finger",
                    entry.priority
                )));
            }
        }

        if let Some(missing) = FingerId::ALL.into_iter().find(|f| !seen.contains(f)) {
            return Err(Error::MissingFinger(missing.to_string()));
        }

        if !self.fingers.iter().any(|entry| entry.requirement.is_required()) {
            return Err(Error::NoRequiredFinger);
        }

        Ok(())
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: CaptureSettings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize to TOML text.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Source and sink for capture settings.
pub trait ConfigStore: Send + Sync {
    /// Load validated settings.
    fn load(&self) -> Result<CaptureSettings>;

    /// Validate and persist settings.
    fn save(&self, settings: &CaptureSettings) -> Result<()>;
}

/// Settings kept in memory, for tests and embedded callers.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    settings: Mutex<CaptureSettings>,
}

impl MemoryConfigStore {
    pub fn new(settings: CaptureSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Result<CaptureSettings> {
        let settings = self
            .settings
            .lock()
            .map_err(|_| Error::InvalidConfig("settings lock poisoned".to_string()))?
            .clone();
        settings.validate()?;
        Ok(settings)
    }

    fn save(&self, settings: &CaptureSettings) -> Result<()> {
        settings.validate()?;
        *self
            .settings
            .lock()
            .map_err(|_| Error::InvalidConfig("settings lock poisoned".to_string()))? =
            settings.clone();
        Ok(())
    }
}

/// Settings stored in a TOML file.
///
/// A missing file loads as the defaults.
#[derive(Debug, Clone)]
pub struct TomlConfigStore {
    path: PathBuf,
}

impl TomlConfigStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for TomlConfigStore {
    fn load(&self) -> Result<CaptureSettings> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => CaptureSettings::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CaptureSettings::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, settings: &CaptureSettings) -> Result<()> {
        settings.validate()?;
        std::fs::write(&self.path, settings.to_toml_string()?)?;
        Ok(())
    }
}
