#![forbid(unsafe_code)]

//! Configuration for gesture disambiguation and popup selection.
//!
//! Every field has a default matching the behaviour of a stock keyboard, so
//! `KeytouchConfig::default()` needs no tuning. With the `config` feature
//! the whole tree can be loaded from TOML or JSON; durations are written as
//! integer milliseconds.
//!
//! ```toml
//! [gesture]
//! long_press_delay = 400
//! release_outside_tolerance = 0.5
//!
//! [gesture.scroll_deferral]
//! press_delay = 100
//! release_delay = 200
//!
//! [popup]
//! max_slot_width = 58.0
//! ```

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};
use web_time::Duration;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Complete configuration for one keyboard surface.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct KeytouchConfig {
    pub gesture: GestureConfig,
    pub popup: PopupConfig,
}

impl KeytouchConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(ConfigError::Toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(ConfigError::Json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Serialize to a pretty TOML string.
    #[cfg(feature = "config")]
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Validation(vec![e.to_string()]))
    }

    /// Check every constraint, collecting all violations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        self.gesture.collect_errors(&mut errors);
        self.popup.collect_errors(&mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ---------------------------------------------------------------------------
// Gesture config
// ---------------------------------------------------------------------------

/// Timing and tolerance parameters for the gesture engine.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct GestureConfig {
    /// Hold time before `LongPress` fires. Default: 500ms.
    #[cfg_attr(feature = "config", serde(with = "millis"))]
    pub long_press_delay: Duration,
    /// Maximum release-to-release gap for a double tap (exclusive). Default: 200ms.
    #[cfg_attr(feature = "config", serde(with = "millis"))]
    pub double_tap_timeout: Duration,
    /// Hold time before repeating starts. Default: 500ms.
    #[cfg_attr(feature = "config", serde(with = "millis"))]
    pub repeat_delay: Duration,
    /// Gap between repeat ticks once repeating. Default: 100ms.
    #[cfg_attr(feature = "config", serde(with = "millis"))]
    pub repeat_interval: Duration,
    /// Stuck-gesture safety window; `None` disables the net. Default: 3s.
    #[cfg_attr(feature = "config", serde(with = "opt_millis"))]
    pub cancel_safety_delay: Option<Duration>,
    /// Fraction of the button size still counted as inside on release. Default: 1.0.
    pub release_outside_tolerance: f32,
    /// Deferral windows used when the button lives in a scroll container.
    pub scroll_deferral: ScrollDeferral,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            long_press_delay: Duration::from_millis(500),
            double_tap_timeout: Duration::from_millis(200),
            repeat_delay: Duration::from_millis(500),
            repeat_interval: Duration::from_millis(100),
            cancel_safety_delay: Some(Duration::from_secs(3)),
            release_outside_tolerance: 1.0,
            scroll_deferral: ScrollDeferral::default(),
        }
    }
}

impl GestureConfig {
    fn collect_errors(&self, errors: &mut Vec<String>) {
        if self.long_press_delay.is_zero() {
            errors.push("gesture.long_press_delay must be > 0".into());
        }
        if self.repeat_interval.is_zero() {
            errors.push("gesture.repeat_interval must be > 0".into());
        }
        if self.cancel_safety_delay.is_some_and(|d| d.is_zero()) {
            errors.push("gesture.cancel_safety_delay must be > 0 when set".into());
        }
        if !self.release_outside_tolerance.is_finite() || self.release_outside_tolerance < 0.0 {
            errors.push(format!(
                "gesture.release_outside_tolerance must be finite and >= 0 (got {})",
                self.release_outside_tolerance
            ));
        }
    }
}

/// Grace windows applied inside a scroll container.
///
/// The first sample of a stream is classified `press_delay` after it
/// arrives, and the release `release_delay` after it arrives, so the
/// container can decide between scroll and tap first.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ScrollDeferral {
    /// Default: 100ms.
    #[cfg_attr(feature = "config", serde(with = "millis"))]
    pub press_delay: Duration,
    /// Default: 200ms.
    #[cfg_attr(feature = "config", serde(with = "millis"))]
    pub release_delay: Duration,
}

impl Default for ScrollDeferral {
    fn default() -> Self {
        Self {
            press_delay: Duration::from_millis(100),
            release_delay: Duration::from_millis(200),
        }
    }
}

// ---------------------------------------------------------------------------
// Popup config
// ---------------------------------------------------------------------------

/// Geometry parameters for popup selection.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct PopupConfig {
    /// Upper bound on the width of one selection slot. Default: 58.0.
    pub max_slot_width: f32,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            max_slot_width: 58.0,
        }
    }
}

impl PopupConfig {
    fn collect_errors(&self, errors: &mut Vec<String>) {
        if !self.max_slot_width.is_finite() || self.max_slot_width <= 0.0 {
            errors.push(format!(
                "popup.max_slot_width must be finite and > 0 (got {})",
                self.max_slot_width
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur when loading a configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde helpers for durations
// ---------------------------------------------------------------------------

#[cfg(feature = "config")]
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use web_time::Duration;

    pub(super) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(feature = "config")]
mod opt_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use web_time::Duration;

    pub(super) fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<u64>::deserialize(deserializer).map(|v| v.map(Duration::from_millis))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
