#![forbid(unsafe_code)]

//! Deterministic replay of a [`Scenario`] on a virtual clock.
//!
//! The replay owns one [`GestureEngine`], the keyboard-wide
//! [`PopupSelection`], and (optionally) the scroll container's
//! [`ScrollCoordination`]. Before each step, every timer due up to the step
//! time fires at its own deadline, so the trace timestamps are exact.
//!
//! # JSONL Schema
//!
//! One record per emitted event, in order:
//!
//! ```json
//! {"at_ms":0,"source":"gesture","event":"press","x":5.0,"y":5.0}
//! {"at_ms":500,"source":"gesture","event":"long_press","x":5.0,"y":5.0}
//! {"at_ms":500,"source":"popup","event":"opened","count":2,"alignment":"leading"}
//! {"at_ms":620,"source":"gesture","event":"release_inside","x":5.0,"y":5.0,"disposition":"popup"}
//! ```
//!
//! The trace digest is BLAKE3 over the JSONL bytes, written as
//! `blake3:<hex>`. Two runs of the same scenario always agree.

use std::io::Write;

use keytouch_core::{
    Alignment, CloseReason, GestureEngine, GestureEvent, PointerInput, PopupEvent,
    PopupSelection, ReleaseDisposition, ScrollCoordination,
};
use serde_json::{Value, json};
use web_time::{Duration, Instant};

use crate::error::Result;
use crate::scenario::{Action, Scenario};

/// Prefix on trace digests.
pub const DIGEST_PREFIX: &str = "blake3:";

/// Outcome of one replay.
#[derive(Debug, Clone)]
pub struct Replay {
    pub scenario: String,
    pub records: Vec<Value>,
    pub summary: Summary,
}

/// Event counts, for quick assertions and the CLI report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub presses: usize,
    pub releases_inside: usize,
    pub releases_outside: usize,
    pub long_presses: usize,
    pub double_taps: usize,
    pub repeat_ticks: usize,
    pub commits: usize,
    pub popup_commits: usize,
    pub cancelled: usize,
}

impl Summary {
    fn observe(&mut self, event: &GestureEvent) {
        match event {
            GestureEvent::Press { .. } => self.presses += 1,
            GestureEvent::LongPress { .. } => self.long_presses += 1,
            GestureEvent::DoubleTap { .. } => self.double_taps += 1,
            GestureEvent::RepeatTick { .. } => self.repeat_ticks += 1,
            GestureEvent::ReleaseInside { .. } => self.releases_inside += 1,
            GestureEvent::ReleaseOutside { .. } => self.releases_outside += 1,
            _ => {}
        }
        match event.disposition() {
            Some(ReleaseDisposition::Commit) => self.commits += 1,
            Some(ReleaseDisposition::Popup) => self.popup_commits += 1,
            Some(ReleaseDisposition::Cancelled) => self.cancelled += 1,
            Some(ReleaseDisposition::DoubleTap) | None => {}
        }
    }
}

impl Replay {
    /// The trace as JSONL, one record per line.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&record.to_string());
            out.push('\n');
        }
        out
    }

    /// `blake3:<hex>` over the JSONL trace.
    #[must_use]
    pub fn digest(&self) -> String {
        let hash = blake3::hash(self.to_jsonl().as_bytes());
        format!("{DIGEST_PREFIX}{}", hash.to_hex())
    }

    pub fn write_jsonl(&self, mut w: impl Write) -> Result<()> {
        w.write_all(self.to_jsonl().as_bytes())?;
        w.flush()?;
        Ok(())
    }
}

/// Replay a validated scenario.
#[must_use]
pub fn replay(scenario: &Scenario) -> Replay {
    let mut runner = Runner::new(scenario);
    for step in &scenario.steps {
        runner.advance_to(step.at_ms);
        runner.apply(step.at_ms, &step.action);
    }
    runner.advance_to(scenario.end_ms());

    tracing::info!(
        scenario = %scenario.name,
        records = runner.records.len(),
        "replay finished"
    );
    Replay {
        scenario: scenario.name.clone(),
        records: runner.records,
        summary: runner.summary,
    }
}

struct Runner<'s> {
    scenario: &'s Scenario,
    t0: Instant,
    engine: GestureEngine,
    popup: PopupSelection<String>,
    scroll: ScrollCoordination,
    records: Vec<Value>,
    summary: Summary,
}

impl<'s> Runner<'s> {
    fn new(scenario: &'s Scenario) -> Self {
        let scroll = ScrollCoordination::new();
        let mut engine =
            GestureEngine::new(scenario.config.gesture.clone()).with_frame(scenario.frame.into());
        if scenario.scroll_container {
            engine = engine.with_scroll(scroll.clone());
        }
        Self {
            scenario,
            t0: Instant::now(),
            engine,
            popup: PopupSelection::new(scenario.config.popup),
            scroll,
            records: Vec::new(),
            summary: Summary::default(),
        }
    }

    fn at(&self, ms: u64) -> Instant {
        self.t0 + Duration::from_millis(ms)
    }

    fn offset_ms(&self, instant: Instant) -> u64 {
        u64::try_from(instant.duration_since(self.t0).as_millis()).unwrap_or(u64::MAX)
    }

    /// Fire timers one deadline at a time up to `ms`.
    fn advance_to(&mut self, ms: u64) {
        let until = self.at(ms);
        while let Some(deadline) = self.engine.next_deadline() {
            if deadline > until {
                break;
            }
            let events = self.engine.advance(deadline, &mut self.popup);
            let at_ms = self.offset_ms(deadline);
            self.record(at_ms, events);
        }
    }

    fn apply(&mut self, at_ms: u64, action: &Action) {
        let now = self.at(at_ms);
        let events = match *action {
            Action::Down { x, y } => {
                self.engine.process(PointerInput::down((x, y), now), &mut self.popup)
            }
            Action::Move { x, y } => {
                self.engine.process(PointerInput::moved((x, y), now), &mut self.popup)
            }
            Action::Up { x, y } => {
                self.engine.process(PointerInput::up((x, y), now), &mut self.popup)
            }
            Action::Scroll { scrolling } => {
                if self.scroll.set_scrolling(scrolling) {
                    self.records.push(json!({
                        "at_ms": at_ms,
                        "source": "scroll",
                        "event": "scrolling",
                        "value": scrolling,
                    }));
                }
                Vec::new()
            }
            Action::SetFrame { frame } => {
                self.engine.set_frame(frame.into());
                Vec::new()
            }
            Action::Cancel => self.engine.cancel(&mut self.popup),
            Action::Wait => self.engine.advance(now, &mut self.popup),
        };
        self.record(at_ms, events);
    }

    fn record(&mut self, at_ms: u64, events: Vec<GestureEvent>) {
        for event in events {
            self.summary.observe(&event);
            let is_long_press = matches!(event, GestureEvent::LongPress { .. });
            self.records.push(gesture_record(at_ms, &event));
            self.drain_popup(at_ms);
            if is_long_press && !self.scenario.alternates.is_empty() {
                self.popup.open(
                    self.scenario.alternates.clone(),
                    self.engine.frame(),
                    self.scenario.viewport_width,
                    None,
                );
                self.drain_popup(at_ms);
            }
        }
        self.drain_popup(at_ms);
    }

    fn drain_popup(&mut self, at_ms: u64) {
        for event in self.popup.drain_events() {
            self.records.push(popup_record(at_ms, &event));
        }
        if let Some(alternate) = self.popup.take_committed() {
            self.records.push(json!({
                "at_ms": at_ms,
                "source": "popup",
                "event": "alternate",
                "value": alternate,
            }));
        }
    }
}

fn gesture_record(at_ms: u64, event: &GestureEvent) -> Value {
    let mut record = json!({
        "at_ms": at_ms,
        "source": "gesture",
        "event": event.name(),
    });
    let fields = match *event {
        GestureEvent::Press { point }
        | GestureEvent::DragStart { point }
        | GestureEvent::LongPress { point }
        | GestureEvent::DoubleTap { point } => json!({ "x": point.x, "y": point.y }),
        GestureEvent::DragChanged { point, translation }
        | GestureEvent::DragEnd { point, translation } => json!({
            "x": point.x,
            "y": point.y,
            "dx": translation.x,
            "dy": translation.y,
        }),
        GestureEvent::RepeatTick { count } => json!({ "count": count }),
        GestureEvent::ReleaseInside { point, disposition }
        | GestureEvent::ReleaseOutside { point, disposition } => json!({
            "x": point.x,
            "y": point.y,
            "disposition": disposition_name(disposition),
        }),
        GestureEvent::End => json!({}),
    };
    merge(&mut record, fields);
    record
}

fn popup_record(at_ms: u64, event: &PopupEvent) -> Value {
    let mut record = json!({ "at_ms": at_ms, "source": "popup" });
    let fields = match *event {
        PopupEvent::Opened { count, alignment } => json!({
            "event": "opened",
            "count": count,
            "alignment": match alignment {
                Alignment::Leading => "leading",
                Alignment::Trailing => "trailing",
            },
        }),
        PopupEvent::SelectionChanged { index } => {
            json!({ "event": "selection_changed", "index": index })
        }
        PopupEvent::Committed { index } => json!({ "event": "committed", "index": index }),
        PopupEvent::Closed { reason } => json!({
            "event": "closed",
            "reason": match reason {
                CloseReason::Committed => "committed",
                CloseReason::DraggedAway => "dragged_away",
                CloseReason::Reset => "reset",
            },
        }),
    };
    merge(&mut record, fields);
    record
}

fn disposition_name(d: ReleaseDisposition) -> &'static str {
    match d {
        ReleaseDisposition::Commit => "commit",
        ReleaseDisposition::DoubleTap => "double_tap",
        ReleaseDisposition::Popup => "popup",
        ReleaseDisposition::Cancelled => "cancelled",
    }
}

fn merge(into: &mut Value, from: Value) {
    if let (Value::Object(into), Value::Object(from)) = (into, from) {
        into.extend(from);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(json: &str) -> Scenario {
        Scenario::from_json_str(json).unwrap()
    }

    fn events(replay: &Replay, source: &str) -> Vec<String> {
        replay
            .records
            .iter()
            .filter(|r| r["source"] == source)
            .map(|r| r["event"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn tap_trace_shape() {
        let r = replay(&scenario(
            r#"{ "name": "tap", "steps": [
                { "at_ms": 0, "action": "down", "x": 5, "y": 5 },
                { "at_ms": 40, "action": "up", "x": 5, "y": 5 }
            ] }"#,
        ));
        assert_eq!(
            events(&r, "gesture"),
            vec!["press", "drag_start", "drag_end", "release_inside", "end"]
        );
        assert_eq!(r.records[3]["disposition"], "commit");
        assert_eq!(r.records[3]["at_ms"], 40);
        assert_eq!(r.summary.commits, 1);
    }

    #[test]
    fn timers_fire_at_their_deadlines() {
        let r = replay(&scenario(
            r#"{ "name": "hold", "steps": [
                { "at_ms": 0, "action": "down", "x": 5, "y": 5 },
                { "at_ms": 720, "action": "up", "x": 5, "y": 5 }
            ] }"#,
        ));
        let long_press = r
            .records
            .iter()
            .find(|rec| rec["event"] == "long_press")
            .unwrap();
        assert_eq!(long_press["at_ms"], 500);
        let ticks: Vec<u64> = r
            .records
            .iter()
            .filter(|rec| rec["event"] == "repeat_tick")
            .map(|rec| rec["at_ms"].as_u64().unwrap())
            .collect();
        assert_eq!(ticks, vec![600, 700]);
    }

    #[test]
    fn long_press_opens_popup_and_release_commits_alternate() {
        let r = replay(&scenario(
            r#"{ "name": "popup", "alternates": ["é", "è", "ê"],
                 "viewport_width": 400,
                 "steps": [
                { "at_ms": 0, "action": "down", "x": 20, "y": 20 },
                { "at_ms": 600, "action": "move", "x": 65, "y": 20 },
                { "at_ms": 650, "action": "up", "x": 65, "y": 20 }
            ] }"#,
        ));
        assert_eq!(
            events(&r, "popup"),
            vec![
                "opened",
                "selection_changed",
                "selection_changed",
                "committed",
                "closed",
                "alternate"
            ]
        );
        let alternate = r.records.iter().find(|rec| rec["event"] == "alternate").unwrap();
        assert_eq!(alternate["value"], "è");
        assert_eq!(r.summary.popup_commits, 1);
        assert_eq!(r.summary.commits, 0);
    }

    #[test]
    fn digest_is_prefixed_and_stable() {
        let s = scenario(
            r#"{ "name": "tap", "steps": [
                { "at_ms": 0, "action": "down", "x": 5, "y": 5 },
                { "at_ms": 40, "action": "up", "x": 5, "y": 5 }
            ] }"#,
        );
        let a = replay(&s).digest();
        let b = replay(&s).digest();
        assert!(a.starts_with(DIGEST_PREFIX));
        assert_eq!(a.len(), DIGEST_PREFIX.len() + 64);
        assert_eq!(a, b);
    }

    #[test]
    fn scroll_records_only_changes() {
        let r = replay(&scenario(
            r#"{ "name": "scroll", "scroll_container": true, "steps": [
                { "at_ms": 0, "action": "scroll", "scrolling": true },
                { "at_ms": 1, "action": "scroll", "scrolling": true },
                { "at_ms": 5, "action": "down", "x": 5, "y": 5 },
                { "at_ms": 60, "action": "up", "x": 5, "y": 5 },
                { "at_ms": 400, "action": "scroll", "scrolling": false }
            ] }"#,
        ));
        assert_eq!(events(&r, "scroll"), vec!["scrolling", "scrolling"]);
        assert!(events(&r, "gesture").is_empty());
    }

    #[test]
    fn jsonl_has_one_line_per_record() {
        let r = replay(&scenario(
            r#"{ "name": "cancel", "steps": [
                { "at_ms": 0, "action": "down", "x": 5, "y": 5 },
                { "at_ms": 10, "action": "cancel" }
            ] }"#,
        ));
        let jsonl = r.to_jsonl();
        assert_eq!(jsonl.lines().count(), r.records.len());
        assert_eq!(r.summary.cancelled, 1);
        let mut buf = Vec::new();
        r.write_jsonl(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), jsonl);
    }
}
