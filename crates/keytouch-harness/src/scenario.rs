#![forbid(unsafe_code)]

//! Scenario files: a button, its environment, and a timeline of input.
//!
//! ```json
//! {
//!   "name": "double_tap",
//!   "frame": { "x": 0, "y": 0, "width": 40, "height": 40 },
//!   "steps": [
//!     { "at_ms": 0,   "action": "down", "x": 5, "y": 5 },
//!     { "at_ms": 20,  "action": "up",   "x": 5, "y": 5 },
//!     { "at_ms": 100, "action": "down", "x": 5, "y": 5 },
//!     { "at_ms": 120, "action": "up",   "x": 5, "y": 5 }
//!   ]
//! }
//! ```
//!
//! Step times are milliseconds from the start of the run and must not
//! decrease. Timers due between steps fire at their own deadlines.

use std::path::Path;

use keytouch_core::{KeytouchConfig, Rect};
use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

/// Button rectangle as written in scenario files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSpec {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for FrameSpec {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 40.0,
            height: 40.0,
        }
    }
}

impl From<FrameSpec> for Rect {
    fn from(f: FrameSpec) -> Self {
        Rect::new(f.x, f.y, f.width, f.height)
    }
}

/// One input or environment change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up { x: f32, y: f32 },
    /// The scroll container starts or stops scrolling.
    Scroll { scrolling: bool },
    /// A layout pass moved the button.
    SetFrame { frame: FrameSpec },
    /// The platform cancelled the touch.
    Cancel,
    /// Only let time pass.
    Wait,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

/// A complete replayable scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: KeytouchConfig,
    #[serde(default)]
    pub frame: FrameSpec,
    /// Viewport width used to align the popup.
    #[serde(default = "default_viewport_width")]
    pub viewport_width: f32,
    /// Whether the button sits inside a scroll container.
    #[serde(default)]
    pub scroll_container: bool,
    /// Alternates shown on long press; empty means no popup.
    #[serde(default)]
    pub alternates: Vec<String>,
    pub steps: Vec<Step>,
    /// Extra time to run after the last step.
    #[serde(default)]
    pub settle_ms: u64,
}

fn default_viewport_width() -> f32 {
    390.0
}

impl Scenario {
    /// Parse and validate a scenario from JSON.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let scenario: Self = serde_json::from_str(s)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;
        if self.steps.is_empty() {
            return Err(HarnessError::invalid(format!("{}: no steps", self.name)));
        }
        if let Some(pair) = self.steps.windows(2).find(|w| w[1].at_ms < w[0].at_ms) {
            return Err(HarnessError::invalid(format!(
                "{}: step at {}ms follows step at {}ms",
                self.name, pair[1].at_ms, pair[0].at_ms
            )));
        }
        let frames = std::iter::once(self.frame).chain(self.steps.iter().filter_map(|s| {
            match s.action {
                Action::SetFrame { frame } => Some(frame),
                _ => None,
            }
        }));
        for frame in frames {
            let ok = [frame.x, frame.y, frame.width, frame.height]
                .iter()
                .all(|v| v.is_finite())
                && frame.width > 0.0
                && frame.height > 0.0;
            if !ok {
                return Err(HarnessError::invalid(format!(
                    "{}: degenerate frame {frame:?}",
                    self.name
                )));
            }
        }
        if !(self.viewport_width.is_finite() && self.viewport_width > 0.0) {
            return Err(HarnessError::invalid(format!(
                "{}: viewport_width must be > 0",
                self.name
            )));
        }
        Ok(())
    }

    /// Time of the last step plus the settle window.
    #[must_use]
    pub fn end_ms(&self) -> u64 {
        self.steps
            .last()
            .map_or(0, |s| s.at_ms)
            .saturating_add(self.settle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAP: &str = r#"{
        "name": "tap",
        "steps": [
            { "at_ms": 0, "action": "down", "x": 5, "y": 5 },
            { "at_ms": 30, "action": "up", "x": 5, "y": 5 }
        ]
    }"#;

    #[test]
    fn minimal_scenario_uses_defaults() {
        let s = Scenario::from_json_str(TAP).unwrap();
        assert_eq!(s.name, "tap");
        assert_eq!(s.frame, FrameSpec::default());
        assert_eq!(s.config, KeytouchConfig::default());
        assert!(!s.scroll_container);
        assert!(s.alternates.is_empty());
        assert_eq!(s.steps[0].action, Action::Down { x: 5.0, y: 5.0 });
        assert_eq!(s.end_ms(), 30);
    }

    #[test]
    fn all_actions_parse() {
        let json = r#"{
            "name": "all",
            "settle_ms": 500,
            "steps": [
                { "at_ms": 0, "action": "down", "x": 1, "y": 2 },
                { "at_ms": 1, "action": "move", "x": 3, "y": 4 },
                { "at_ms": 2, "action": "scroll", "scrolling": true },
                { "at_ms": 3, "action": "set_frame",
                  "frame": { "x": 10, "y": 0, "width": 30, "height": 30 } },
                { "at_ms": 4, "action": "wait" },
                { "at_ms": 5, "action": "cancel" },
                { "at_ms": 6, "action": "up", "x": 3, "y": 4 }
            ]
        }"#;
        let s = Scenario::from_json_str(json).unwrap();
        assert_eq!(s.steps.len(), 7);
        assert_eq!(s.steps[2].action, Action::Scroll { scrolling: true });
        assert_eq!(s.steps[5].action, Action::Cancel);
        assert_eq!(s.end_ms(), 506);
    }

    #[test]
    fn config_overrides_are_applied() {
        let json = r#"{
            "name": "cfg",
            "config": { "gesture": { "long_press_delay": 300, "cancel_safety_delay": null } },
            "steps": [{ "at_ms": 0, "action": "down", "x": 1, "y": 1 }]
        }"#;
        let s = Scenario::from_json_str(json).unwrap();
        assert_eq!(s.config.gesture.long_press_delay.as_millis(), 300);
        assert_eq!(s.config.gesture.cancel_safety_delay, None);
    }

    #[test]
    fn out_of_order_steps_are_rejected() {
        let json = r#"{
            "name": "bad",
            "steps": [
                { "at_ms": 50, "action": "down", "x": 1, "y": 1 },
                { "at_ms": 10, "action": "up", "x": 1, "y": 1 }
            ]
        }"#;
        let err = Scenario::from_json_str(json).unwrap_err();
        assert!(matches!(err, HarnessError::InvalidScenario { .. }));
        assert!(err.to_string().contains("10ms"));
    }

    #[test]
    fn empty_and_degenerate_scenarios_are_rejected() {
        let empty = r#"{ "name": "e", "steps": [] }"#;
        assert!(Scenario::from_json_str(empty).is_err());

        let flat = r#"{
            "name": "flat",
            "frame": { "x": 0, "y": 0, "width": 0, "height": 40 },
            "steps": [{ "at_ms": 0, "action": "wait" }]
        }"#;
        assert!(Scenario::from_json_str(flat).is_err());
    }

    #[test]
    fn invalid_config_is_a_config_error() {
        let json = r#"{
            "name": "cfg",
            "config": { "gesture": { "long_press_delay": 0 } },
            "steps": [{ "at_ms": 0, "action": "wait" }]
        }"#;
        let err = Scenario::from_json_str(json).unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[test]
    fn unknown_action_is_a_json_error() {
        let json = r#"{ "name": "x", "steps": [{ "at_ms": 0, "action": "jump" }] }"#;
        assert!(matches!(
            Scenario::from_json_str(json),
            Err(HarnessError::Json(_))
        ));
    }
}
