#![forbid(unsafe_code)]

//! Discrete events produced by the gesture engine and the popup selection.
//!
//! # Ordering
//!
//! For one press on one button the engine emits:
//!
//! ```text
//! Press, DragStart, { LongPress | RepeatTick | DragChanged }*,
//! [DoubleTap], DragEnd, ReleaseInside | ReleaseOutside, End
//! ```
//!
//! Exactly one of `ReleaseInside` / `ReleaseOutside` is emitted per press,
//! always immediately followed by `End`, including when the stuck-gesture
//! safety net finalizes the press.

use crate::geometry::Point;
use crate::popup::Alignment;

/// What the owner should do with a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseDisposition {
    /// Normal release: perform the key's primary action.
    Commit,
    /// The release completed a double tap; the primary action is consumed.
    DoubleTap,
    /// A popup alternate was committed instead of the primary action.
    Popup,
    /// The press was force-finalized by the safety net; do nothing.
    Cancelled,
}

impl ReleaseDisposition {
    /// True when the key's primary action should run.
    #[must_use]
    pub const fn is_commit(self) -> bool {
        matches!(self, Self::Commit)
    }
}

/// Events emitted by a [`GestureEngine`](crate::gesture::GestureEngine).
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEvent {
    /// The press started.
    Press { point: Point },
    /// Drag tracking started at the press point.
    DragStart { point: Point },
    /// A subsequent sample arrived while pressed.
    DragChanged { point: Point, translation: Point },
    /// The press was held past the long-press delay.
    LongPress { point: Point },
    /// This release followed the previous one within the double-tap window.
    DoubleTap { point: Point },
    /// Repeat fired while held. `count` starts at 1.
    RepeatTick { count: u32 },
    /// Drag tracking ended at the release point.
    DragEnd { point: Point, translation: Point },
    /// Released inside the button (or within the release tolerance).
    ReleaseInside {
        point: Point,
        disposition: ReleaseDisposition,
    },
    /// Released outside the tolerance rectangle.
    ReleaseOutside {
        point: Point,
        disposition: ReleaseDisposition,
    },
    /// The press lifecycle is over. Always last.
    End,
}

impl GestureEvent {
    /// True for `ReleaseInside` / `ReleaseOutside`.
    #[must_use]
    pub fn is_release(&self) -> bool {
        matches!(self, Self::ReleaseInside { .. } | Self::ReleaseOutside { .. })
    }

    /// True for the drag bookkeeping events.
    #[must_use]
    pub fn is_drag(&self) -> bool {
        matches!(
            self,
            Self::DragStart { .. } | Self::DragChanged { .. } | Self::DragEnd { .. }
        )
    }

    /// The release disposition, if this is a release event.
    #[must_use]
    pub fn disposition(&self) -> Option<ReleaseDisposition> {
        match self {
            Self::ReleaseInside { disposition, .. } | Self::ReleaseOutside { disposition, .. } => {
                Some(*disposition)
            }
            _ => None,
        }
    }

    /// Stable lowercase name, used by traces and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Press { .. } => "press",
            Self::DragStart { .. } => "drag_start",
            Self::DragChanged { .. } => "drag_changed",
            Self::LongPress { .. } => "long_press",
            Self::DoubleTap { .. } => "double_tap",
            Self::RepeatTick { .. } => "repeat_tick",
            Self::DragEnd { .. } => "drag_end",
            Self::ReleaseInside { .. } => "release_inside",
            Self::ReleaseOutside { .. } => "release_outside",
            Self::End => "end",
        }
    }
}

/// Why a popup closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseReason {
    /// An alternate was committed.
    Committed,
    /// The drag went below the button (slide down to cancel).
    DraggedAway,
    /// Explicit reset: a new press, a new popup, or a forced cancel.
    Reset,
}

/// Events emitted by a [`PopupSelection`](crate::popup::PopupSelection).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PopupEvent {
    Opened { count: usize, alignment: Alignment },
    /// The highlighted slot changed; renderers pulse haptics on this.
    SelectionChanged { index: usize },
    Committed { index: usize },
    Closed { reason: CloseReason },
}

/// Optional per-event callbacks for a gesture engine.
///
/// Every handler is optional; unset handlers drop their events.
///
/// ```
/// use keytouch_core::event::{GestureEvent, GestureHandlers};
///
/// let mut taps = 0;
/// let mut handlers = GestureHandlers::new().on_end(|| taps += 1);
/// handlers.dispatch(&[GestureEvent::End]);
/// drop(handlers);
/// assert_eq!(taps, 1);
/// ```
#[derive(Default)]
pub struct GestureHandlers<'a> {
    press: Option<Box<dyn FnMut() + 'a>>,
    release_inside: Option<Box<dyn FnMut(ReleaseDisposition) + 'a>>,
    release_outside: Option<Box<dyn FnMut(ReleaseDisposition) + 'a>>,
    long_press: Option<Box<dyn FnMut() + 'a>>,
    double_tap: Option<Box<dyn FnMut() + 'a>>,
    repeat_tick: Option<Box<dyn FnMut(u32) + 'a>>,
    drag_start: Option<Box<dyn FnMut(Point) + 'a>>,
    drag_changed: Option<Box<dyn FnMut(Point) + 'a>>,
    drag_end: Option<Box<dyn FnMut(Point) + 'a>>,
    end: Option<Box<dyn FnMut() + 'a>>,
}

impl std::fmt::Debug for GestureHandlers<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureHandlers")
            .field("press", &self.press.is_some())
            .field("release_inside", &self.release_inside.is_some())
            .field("release_outside", &self.release_outside.is_some())
            .field("long_press", &self.long_press.is_some())
            .field("double_tap", &self.double_tap.is_some())
            .field("repeat_tick", &self.repeat_tick.is_some())
            .field("end", &self.end.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a> GestureHandlers<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_press(mut self, f: impl FnMut() + 'a) -> Self {
        self.press = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_release_inside(mut self, f: impl FnMut(ReleaseDisposition) + 'a) -> Self {
        self.release_inside = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_release_outside(mut self, f: impl FnMut(ReleaseDisposition) + 'a) -> Self {
        self.release_outside = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_long_press(mut self, f: impl FnMut() + 'a) -> Self {
        self.long_press = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_double_tap(mut self, f: impl FnMut() + 'a) -> Self {
        self.double_tap = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_repeat_tick(mut self, f: impl FnMut(u32) + 'a) -> Self {
        self.repeat_tick = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_drag_start(mut self, f: impl FnMut(Point) + 'a) -> Self {
        self.drag_start = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_drag_changed(mut self, f: impl FnMut(Point) + 'a) -> Self {
        self.drag_changed = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_drag_end(mut self, f: impl FnMut(Point) + 'a) -> Self {
        self.drag_end = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_end(mut self, f: impl FnMut() + 'a) -> Self {
        self.end = Some(Box::new(f));
        self
    }

    /// Deliver a batch of events in order.
    pub fn dispatch(&mut self, events: &[GestureEvent]) {
        for event in events {
            self.dispatch_one(event);
        }
    }

    /// Deliver one event to its handler, if set.
    pub fn dispatch_one(&mut self, event: &GestureEvent) {
        match *event {
            GestureEvent::Press { .. } => call0(&mut self.press),
            GestureEvent::DragStart { point } => call1(&mut self.drag_start, point),
            GestureEvent::DragChanged { point, .. } => call1(&mut self.drag_changed, point),
            GestureEvent::LongPress { .. } => call0(&mut self.long_press),
            GestureEvent::DoubleTap { .. } => call0(&mut self.double_tap),
            GestureEvent::RepeatTick { count } => call1(&mut self.repeat_tick, count),
            GestureEvent::DragEnd { point, .. } => call1(&mut self.drag_end, point),
            GestureEvent::ReleaseInside { disposition, .. } => {
                call1(&mut self.release_inside, disposition);
            }
            GestureEvent::ReleaseOutside { disposition, .. } => {
                call1(&mut self.release_outside, disposition);
            }
            GestureEvent::End => call0(&mut self.end),
        }
    }
}

fn call0(handler: &mut Option<Box<dyn FnMut() + '_>>) {
    if let Some(f) = handler.as_mut() {
        f();
    }
}

fn call1<T>(handler: &mut Option<Box<dyn FnMut(T) + '_>>, value: T) {
    if let Some(f) = handler.as_mut() {
        f(value);
    }
}
