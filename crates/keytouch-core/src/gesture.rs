#![forbid(unsafe_code)]

//! Gesture engine: turns one button's pointer stream into discrete events.
//!
//! [`GestureEngine`] is a timer-driven state machine. Feed it pointer input
//! with [`process`](GestureEngine::process) and let time pass with
//! [`advance`](GestureEngine::advance); both return the [`GestureEvent`]s
//! produced, in order. Time only moves forward through the timestamps you
//! pass in, so a test can drive the engine on a virtual clock.
//!
//! # State Machine
//!
//! ```text
//! Idle --first sample--> Pressed --release / forced cancel--> Idle
//!   |                       ^
//!   | (scroll container)    |
//!   +--> Deferred ----------+   (or Ignored while the container is scrolling)
//! ```
//!
//! On entering `Pressed` the engine emits `Press` and `DragStart`, claims the
//! touch from the scroll container, and arms the long-press, repeat-start and
//! cancel-safety timers. Every armed timer captures the session
//! [`Generation`]; a fire is honored only if the stamp still matches, so a
//! timer armed for press N can never act on press N+1.
//!
//! # Invariants
//!
//! 1. Every press ends with exactly one `ReleaseInside` or `ReleaseOutside`,
//!    immediately followed by `End`.
//! 2. `DragEnd` precedes the inside/outside decision; `End` is always last.
//! 3. At most one repeat loop runs per press.
//! 4. A `DoubleTap` resets the release history, so a third rapid tap is a
//!    plain tap again.
//!
//! # Failure Modes
//!
//! - Some platform gesture pipelines stop delivering samples near scrollable
//!   regions, leaving a press that never releases. The cancel-safety timer
//!   force-finalizes a press whose position has not changed since it was
//!   armed. This also ends a legitimate motionless hold (for example a long
//!   backspace hold) after `cancel_safety_delay`; set the delay to `None` to
//!   trade that false positive for the stuck-press risk.
//! - Inside a scroll container the release is reported `release_delay`
//!   late. Timers due after the finger lifted are not honored in between.
//! - A release with no matching press is ignored.
//! - A `Down` while a press is still open (a lost `Up`) finalizes the old
//!   press as cancelled before starting the new one.

use web_time::Instant;

use crate::config::{GestureConfig, ScrollDeferral};
use crate::event::{GestureEvent, ReleaseDisposition};
use crate::geometry::{Point, Rect};
use crate::popup::SelectionTarget;
use crate::sample::{PointerInput, PointerPhase, PointerSample};
use crate::scroll::ScrollCoordination;
use crate::timer::{Fired, Generation, TimerId, TimerQueue};

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    LongPress(Generation),
    RepeatStart(Generation),
    Repeat(Generation),
    CancelSafety(Generation),
    DeferredPress(Generation),
    DeferredRelease(Generation),
}

/// A timer handle plus the session stamp it was armed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Armed {
    id: TimerId,
    stamp: Generation,
}

/// One press-to-release cycle.
#[derive(Debug, Clone, Default)]
struct GestureSession {
    is_pressed: bool,
    gesture_was_started: bool,
    start: Option<PointerSample>,
    last_sample: Option<PointerSample>,
    long_press: Option<Armed>,
    repeat_start: Option<Armed>,
    repeat: Option<Armed>,
    repeat_count: u32,
    // Position captured when the safety timer was armed.
    cancel_safety: Option<(Armed, Point)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stream {
    Idle,
    /// Waiting out the scroll container's grace window before classifying.
    Deferred {
        timer: TimerId,
        down: PointerSample,
        latest: Option<PointerSample>,
    },
    Pressed,
    /// The container was scrolling; drop samples until it stops.
    Ignored,
    /// The press was force-finalized; drop the rest of this stream.
    Spent,
}

// ---------------------------------------------------------------------------
// GestureEngine
// ---------------------------------------------------------------------------

/// Per-button gesture disambiguation engine.
pub struct GestureEngine {
    config: GestureConfig,
    frame: Rect,
    scroll: Option<ScrollCoordination>,
    timers: TimerQueue<TimerKind>,
    generation: Generation,
    stream: Stream,
    session: GestureSession,
    pending_release: Option<(TimerId, PointerSample)>,
    last_release: Option<Instant>,
}

impl std::fmt::Debug for GestureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureEngine")
            .field("frame", &self.frame)
            .field("pressed", &self.session.is_pressed)
            .field("generation", &self.generation)
            .field("armed_timers", &self.timers.len())
            .finish()
    }
}

impl GestureEngine {
    /// Create an engine for a button with the given configuration.
    #[must_use]
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            frame: Rect::default(),
            scroll: None,
            timers: TimerQueue::new(),
            generation: Generation::INITIAL,
            stream: Stream::Idle,
            session: GestureSession::default(),
            pending_release: None,
            last_release: None,
        }
    }

    /// Set the button frame (builder pattern).
    #[must_use]
    pub fn with_frame(mut self, frame: Rect) -> Self {
        self.frame = frame;
        self
    }

    /// Attach the enclosing scroll container's shared state (builder pattern).
    ///
    /// With a container attached, samples are classified after the
    /// [`ScrollDeferral`] windows.
    #[must_use]
    pub fn with_scroll(mut self, scroll: ScrollCoordination) -> Self {
        self.scroll = Some(scroll);
        self
    }

    /// Update the button frame after a layout pass.
    pub fn set_frame(&mut self, frame: Rect) {
        self.frame = frame;
    }

    #[inline]
    #[must_use]
    pub fn frame(&self) -> Rect {
        self.frame
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Replace the configuration. Timers already armed keep their deadlines.
    pub fn set_config(&mut self, config: GestureConfig) {
        self.config = config;
    }

    /// True from the first sample of a press until it is finalized.
    #[inline]
    #[must_use]
    pub fn is_pressed(&self) -> bool {
        self.session.is_pressed
    }

    /// Current session stamp.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Earliest pending timer deadline; hosts schedule their wake-up here.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Process one pointer sample.
    ///
    /// Timers due at or before the sample's timestamp fire first.
    pub fn process(
        &mut self,
        input: PointerInput,
        target: &mut dyn SelectionTarget,
    ) -> Vec<GestureEvent> {
        let mut out = Vec::with_capacity(4);
        self.fire_due(input.timestamp(), target, &mut out);
        match input.phase {
            PointerPhase::Down => self.on_down(input.sample, target, &mut out),
            PointerPhase::Move => self.on_move(input.sample, target, &mut out),
            PointerPhase::Up => self.on_up(input.sample, target, &mut out),
        }
        out
    }

    /// Fire every timer due at or before `now`.
    pub fn advance(
        &mut self,
        now: Instant,
        target: &mut dyn SelectionTarget,
    ) -> Vec<GestureEvent> {
        let mut out = Vec::new();
        self.fire_due(now, target, &mut out);
        out
    }

    /// The platform cancelled the touch: finalize any open press as cancelled.
    pub fn cancel(&mut self, target: &mut dyn SelectionTarget) -> Vec<GestureEvent> {
        let mut out = Vec::new();
        if let Stream::Deferred { timer, .. } = self.stream {
            self.timers.cancel(timer);
            self.stream = Stream::Idle;
        }
        if let Some((id, _)) = self.pending_release.take() {
            self.timers.cancel(id);
        }
        self.force_finalize(target, &mut out);
        self.stream = Stream::Idle;
        self.session = GestureSession::default();
        out
    }

    /// Drop all state without emitting events.
    pub fn reset(&mut self) {
        self.timers.clear();
        self.stream = Stream::Idle;
        self.session = GestureSession::default();
        self.pending_release = None;
        self.last_release = None;
        if let Some(scroll) = &self.scroll {
            scroll.set_gesture_disabled(false);
        }
    }

    fn deferral(&self) -> Option<ScrollDeferral> {
        self.scroll.as_ref().map(|_| self.config.scroll_deferral)
    }
}

// ---------------------------------------------------------------------------
// Pointer handling
// ---------------------------------------------------------------------------

impl GestureEngine {
    fn on_down(
        &mut self,
        sample: PointerSample,
        target: &mut dyn SelectionTarget,
        out: &mut Vec<GestureEvent>,
    ) {
        // A previous stream may still be waiting on a deferred step.
        self.flush_pending(target, out);
        if self.session.gesture_was_started {
            tracing::debug!("down while pressed; finalizing previous press");
            self.force_finalize(target, out);
        }
        self.start_stream(sample, target, out);
    }

    fn on_move(
        &mut self,
        sample: PointerSample,
        target: &mut dyn SelectionTarget,
        out: &mut Vec<GestureEvent>,
    ) {
        match self.stream {
            Stream::Idle => self.start_stream(sample, target, out),
            Stream::Deferred {
                timer,
                down,
                latest: _,
            } => {
                self.stream = Stream::Deferred {
                    timer,
                    down,
                    latest: Some(sample),
                };
            }
            Stream::Pressed => {
                if self.pending_release.is_none() {
                    self.drag(sample, target, out);
                }
            }
            Stream::Ignored => {
                if !self.scroll.as_ref().is_some_and(ScrollCoordination::is_scrolling) {
                    self.start_stream(sample, target, out);
                }
            }
            Stream::Spent => {}
        }
    }

    fn on_up(
        &mut self,
        sample: PointerSample,
        target: &mut dyn SelectionTarget,
        out: &mut Vec<GestureEvent>,
    ) {
        match self.stream {
            Stream::Idle => tracing::trace!("release without press ignored"),
            Stream::Ignored | Stream::Spent => {
                self.stream = Stream::Idle;
                self.session = GestureSession::default();
            }
            Stream::Deferred { .. } | Stream::Pressed => {
                if self.pending_release.is_some() {
                    return;
                }
                match self.deferral() {
                    Some(deferral) => {
                        let id = self.timers.arm(
                            sample.timestamp + deferral.release_delay,
                            TimerKind::DeferredRelease(self.generation),
                        );
                        self.pending_release = Some((id, sample));
                    }
                    None => self.finish_stream(sample, target, out),
                }
            }
        }
    }

    fn start_stream(
        &mut self,
        sample: PointerSample,
        target: &mut dyn SelectionTarget,
        out: &mut Vec<GestureEvent>,
    ) {
        self.generation = self.generation.next();
        self.session = GestureSession {
            is_pressed: true,
            ..GestureSession::default()
        };
        match self.deferral() {
            Some(deferral) => {
                let timer = self.timers.arm(
                    sample.timestamp + deferral.press_delay,
                    TimerKind::DeferredPress(self.generation),
                );
                self.stream = Stream::Deferred {
                    timer,
                    down: sample,
                    latest: None,
                };
            }
            None => self.try_begin(sample, target, out),
        }
    }

    fn try_begin(
        &mut self,
        sample: PointerSample,
        target: &mut dyn SelectionTarget,
        out: &mut Vec<GestureEvent>,
    ) {
        if self.scroll.as_ref().is_some_and(ScrollCoordination::is_scrolling) {
            tracing::debug!(generation = self.generation.get(), "stream ignored while scrolling");
            self.stream = Stream::Ignored;
            self.session = GestureSession::default();
            return;
        }
        self.begin_press(sample, target, out);
    }

    fn begin_press(
        &mut self,
        sample: PointerSample,
        target: &mut dyn SelectionTarget,
        out: &mut Vec<GestureEvent>,
    ) {
        // Only one popup keyboard-wide; a new press closes any open one.
        target.dismiss();

        let stamp = self.generation;
        let at = sample.timestamp;
        self.session.is_pressed = true;
        self.session.gesture_was_started = true;
        self.session.start = Some(sample);
        self.session.last_sample = Some(sample);
        self.stream = Stream::Pressed;

        out.push(GestureEvent::Press {
            point: sample.position,
        });
        out.push(GestureEvent::DragStart {
            point: sample.position,
        });
        if let Some(scroll) = &self.scroll {
            scroll.set_gesture_disabled(true);
        }

        let id = self
            .timers
            .arm(at + self.config.long_press_delay, TimerKind::LongPress(stamp));
        self.session.long_press = Some(Armed { id, stamp });

        let id = self
            .timers
            .arm(at + self.config.repeat_delay, TimerKind::RepeatStart(stamp));
        self.session.repeat_start = Some(Armed { id, stamp });

        if let Some(delay) = self.config.cancel_safety_delay {
            let id = self.timers.arm(at + delay, TimerKind::CancelSafety(stamp));
            self.session.cancel_safety = Some((Armed { id, stamp }, sample.position));
        }

        tracing::debug!(
            generation = stamp.get(),
            x = sample.position.x,
            y = sample.position.y,
            "press"
        );
    }

    fn drag(
        &mut self,
        sample: PointerSample,
        target: &mut dyn SelectionTarget,
        out: &mut Vec<GestureEvent>,
    ) {
        let start = self.session.start.map_or(sample.position, |s| s.position);
        let translation = sample.position - start;
        self.session.last_sample = Some(sample);
        out.push(GestureEvent::DragChanged {
            point: sample.position,
            translation,
        });
        if target.is_active() {
            target.update_selection(translation);
        }
    }

    /// Resolve any deferred press and deferred release right now.
    fn flush_pending(&mut self, target: &mut dyn SelectionTarget, out: &mut Vec<GestureEvent>) {
        self.resolve_deferred_press(target, out);
        if let Some((id, sample)) = self.pending_release.take() {
            self.timers.cancel(id);
            self.finish_stream(sample, target, out);
        }
    }

    fn resolve_deferred_press(
        &mut self,
        target: &mut dyn SelectionTarget,
        out: &mut Vec<GestureEvent>,
    ) {
        let Stream::Deferred {
            timer,
            down,
            latest,
        } = self.stream
        else {
            return;
        };
        self.timers.cancel(timer);
        self.stream = Stream::Idle;
        self.try_begin(down, target, out);
        if self.stream == Stream::Pressed
            && let Some(latest) = latest
        {
            self.drag(latest, target, out);
        }
    }

    fn finish_stream(
        &mut self,
        sample: PointerSample,
        target: &mut dyn SelectionTarget,
        out: &mut Vec<GestureEvent>,
    ) {
        self.resolve_deferred_press(target, out);
        if self.stream == Stream::Pressed {
            self.finalize(sample, false, target, out);
        } else {
            self.stream = Stream::Idle;
            self.session = GestureSession::default();
        }
    }
}

// ---------------------------------------------------------------------------
// Release
// ---------------------------------------------------------------------------

impl GestureEngine {
    /// End the open press at its last known position without committing.
    fn force_finalize(&mut self, target: &mut dyn SelectionTarget, out: &mut Vec<GestureEvent>) {
        if !self.session.gesture_was_started {
            return;
        }
        let Some(sample) = self.session.last_sample else {
            return;
        };
        target.dismiss();
        self.finalize(sample, true, target, out);
    }

    fn finalize(
        &mut self,
        sample: PointerSample,
        cancelled: bool,
        target: &mut dyn SelectionTarget,
        out: &mut Vec<GestureEvent>,
    ) {
        if !self.session.gesture_was_started {
            return;
        }
        if let Some(scroll) = &self.scroll {
            scroll.set_gesture_disabled(false);
        }
        self.disarm_session_timers();

        let point = sample.position;
        let start = self.session.start.map_or(point, |s| s.position);
        let disposition = if cancelled {
            ReleaseDisposition::Cancelled
        } else {
            self.release_disposition(sample, target, out)
        };

        out.push(GestureEvent::DragEnd {
            point,
            translation: point - start,
        });
        let inside = self.frame.contains(point)
            || self
                .frame
                .expanded_by_fraction(self.config.release_outside_tolerance)
                .contains(point);
        out.push(if inside {
            GestureEvent::ReleaseInside { point, disposition }
        } else {
            GestureEvent::ReleaseOutside { point, disposition }
        });
        out.push(GestureEvent::End);

        tracing::debug!(
            generation = self.generation.get(),
            inside,
            ?disposition,
            "release"
        );
        self.session = GestureSession::default();
        self.stream = if cancelled {
            Stream::Spent
        } else {
            Stream::Idle
        };
    }

    fn release_disposition(
        &mut self,
        sample: PointerSample,
        target: &mut dyn SelectionTarget,
        out: &mut Vec<GestureEvent>,
    ) -> ReleaseDisposition {
        let at = sample.timestamp;
        if target.is_active() && target.commit_selection() {
            self.last_release = Some(at);
            return ReleaseDisposition::Popup;
        }
        let is_double_tap = self
            .last_release
            .is_some_and(|prev| at.duration_since(prev) < self.config.double_tap_timeout);
        if is_double_tap {
            out.push(GestureEvent::DoubleTap {
                point: sample.position,
            });
            // Back-date so a third rapid tap starts a fresh pair.
            self.last_release = None;
            ReleaseDisposition::DoubleTap
        } else {
            self.last_release = Some(at);
            ReleaseDisposition::Commit
        }
    }

    fn disarm_session_timers(&mut self) {
        let armed = [
            self.session.long_press.take(),
            self.session.repeat_start.take(),
            self.session.repeat.take(),
            self.session.cancel_safety.take().map(|(a, _)| a),
        ];
        for a in armed.into_iter().flatten() {
            self.timers.cancel(a.id);
        }
    }
}

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

impl GestureEngine {
    fn fire_due(
        &mut self,
        now: Instant,
        target: &mut dyn SelectionTarget,
        out: &mut Vec<GestureEvent>,
    ) {
        while let Some(fired) = self.timers.pop_due(now) {
            self.on_timer(fired, target, out);
        }
    }

    fn honors(&self, armed: Option<Armed>, id: TimerId, at: Instant, stamp: Generation) -> bool {
        stamp == self.generation
            && self.session.is_pressed
            && armed.is_some_and(|a| a.id == id && a.stamp == stamp)
            && !self.lifted_before(at)
    }

    /// True if a deferred release already lifted the finger before `deadline`.
    fn lifted_before(&self, deadline: Instant) -> bool {
        self.pending_release.is_some_and(|(_, up)| deadline > up.timestamp)
    }

    fn on_timer(
        &mut self,
        fired: Fired<TimerKind>,
        target: &mut dyn SelectionTarget,
        out: &mut Vec<GestureEvent>,
    ) {
        let Fired {
            id,
            deadline,
            payload,
        } = fired;
        match payload {
            TimerKind::LongPress(stamp)
                if self.honors(self.session.long_press, id, deadline, stamp) =>
            {
                self.session.long_press = None;
                let point = self.last_position();
                tracing::debug!(generation = stamp.get(), "long press");
                out.push(GestureEvent::LongPress { point });
            }
            TimerKind::RepeatStart(stamp)
                if self.honors(self.session.repeat_start, id, deadline, stamp) =>
            {
                self.session.repeat_start = None;
                if self.session.repeat.is_none() {
                    let interval = self.config.repeat_interval;
                    let id = self.timers.arm_repeating(
                        deadline + interval,
                        interval,
                        TimerKind::Repeat(stamp),
                    );
                    self.session.repeat = Some(Armed { id, stamp });
                }
            }
            TimerKind::Repeat(stamp) if self.honors(self.session.repeat, id, deadline, stamp) => {
                self.session.repeat_count = self.session.repeat_count.saturating_add(1);
                out.push(GestureEvent::RepeatTick {
                    count: self.session.repeat_count,
                });
            }
            TimerKind::CancelSafety(stamp)
                if self.honors(self.session.cancel_safety.map(|(a, _)| a), id, deadline, stamp) =>
            {
                let armed_at = self.session.cancel_safety.take().map(|(_, p)| p);
                if armed_at == Some(self.last_position()) {
                    tracing::warn!(
                        generation = stamp.get(),
                        "no samples since press; forcing gesture to end"
                    );
                    self.force_finalize(target, out);
                }
            }
            TimerKind::DeferredPress(stamp)
                if stamp == self.generation
                    && matches!(self.stream, Stream::Deferred { timer, .. } if timer == id) =>
            {
                self.resolve_deferred_press(target, out);
            }
            TimerKind::DeferredRelease(stamp)
                if stamp == self.generation
                    && self.pending_release.is_some_and(|(pid, _)| pid == id) =>
            {
                if let Some((_, sample)) = self.pending_release.take() {
                    self.finish_stream(sample, target, out);
                }
            }
            stale => {
                tracing::trace!(?stale, generation = self.generation.get(), "stale timer dropped");
            }
        }
    }

    fn last_position(&self) -> Point {
        self.session
            .last_sample
            .map_or(Point::ZERO, |s| s.position)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
