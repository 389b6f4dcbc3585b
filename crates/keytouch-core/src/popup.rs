#![forbid(unsafe_code)]

//! Popup selection: sliding a finger sideways to pick an alternate action.
//!
//! When a long press reveals alternates for a key, [`PopupSelection`] owns
//! those alternates and maps the horizontal drag translation to a selected
//! slot. Only one popup is open keyboard-wide; opening a new one closes the
//! previous one.
//!
//! # Layout
//!
//! The popup grows rightward (`Leading`) when the pressed button sits left of
//! the viewport midpoint, and leftward (`Trailing`) otherwise. For a trailing
//! popup the alternates are stored reversed, so index 0 is always the
//! visually outermost slot and the start index is the slot nearest the press
//! point: `0` for leading, `count - 1` for trailing.
//!
//! # Selection mapping
//!
//! With `slot = min(button width, max_slot_width)` and `dx` the horizontal
//! translation:
//!
//! - `dx >= 0`: `steps = floor(dx / slot)`
//! - `dx < 0`:  `steps = floor((|dx| + slot) / slot)`
//!
//! Leading popups select `steps`, trailing popups select `count - 1 - steps`.
//! A step count past the last slot snaps back to the start index rather than
//! clamping to the nearest edge.
//!
//! # Invariants
//!
//! 1. While [`is_active`](PopupSelection::is_active), `selected_index()` is
//!    `Some(i)` with `i < actions().len()`.
//! 2. `reset()` is idempotent and emits `Closed` only once.
//! 3. A downward translation greater than the button height closes the popup.

use crate::config::PopupConfig;
use crate::event::{CloseReason, PopupEvent};
use crate::geometry::{Point, Rect};

/// Which way the popup grows from the pressed button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alignment {
    /// Grows rightward.
    Leading,
    /// Grows leftward.
    Trailing,
}

impl Alignment {
    /// Leading when the button's horizontal centre is left of the viewport
    /// midpoint, trailing otherwise.
    #[must_use]
    pub fn for_button(button_frame: Rect, viewport_width: f32) -> Self {
        if button_frame.center().x < viewport_width / 2.0 {
            Self::Leading
        } else {
            Self::Trailing
        }
    }
}

/// Something a pressed button forwards drags to and commits on release.
///
/// Implemented by [`PopupSelection`]; buttons without alternates use
/// [`NoPopup`].
pub trait SelectionTarget {
    /// True while a selection is open.
    fn is_active(&self) -> bool;

    /// Recompute the selection from the drag translation since press.
    fn update_selection(&mut self, translation: Point);

    /// Commit the current selection, returning whether anything was committed.
    fn commit_selection(&mut self) -> bool;

    /// Close without committing.
    fn dismiss(&mut self);
}

/// A [`SelectionTarget`] that never opens.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPopup;

impl SelectionTarget for NoPopup {
    fn is_active(&self) -> bool {
        false
    }

    fn update_selection(&mut self, _translation: Point) {}

    fn commit_selection(&mut self) -> bool {
        false
    }

    fn dismiss(&mut self) {}
}

type CommitHandler<A> = Box<dyn FnMut(&A)>;

/// The keyboard-wide popup selection model.
pub struct PopupSelection<A> {
    config: PopupConfig,
    actions: Vec<A>,
    alignment: Alignment,
    button_frame: Option<Rect>,
    selected: Option<usize>,
    events: Vec<PopupEvent>,
    on_commit: Option<CommitHandler<A>>,
    last_committed: Option<A>,
}

impl<A> std::fmt::Debug for PopupSelection<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PopupSelection")
            .field("count", &self.actions.len())
            .field("alignment", &self.alignment)
            .field("button_frame", &self.button_frame)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

impl<A> Default for PopupSelection<A> {
    fn default() -> Self {
        Self::new(PopupConfig::default())
    }
}

impl<A> PopupSelection<A> {
    /// Create a closed popup selection.
    #[must_use]
    pub fn new(config: PopupConfig) -> Self {
        Self {
            config,
            actions: Vec::new(),
            alignment: Alignment::Leading,
            button_frame: None,
            selected: None,
            events: Vec::new(),
            on_commit: None,
            last_committed: None,
        }
    }

    /// Install the callback that receives committed alternates.
    pub fn set_commit_handler(&mut self, handler: impl FnMut(&A) + 'static) {
        self.on_commit = Some(Box::new(handler));
    }

    /// Open the popup for a long-pressed button.
    ///
    /// `actions` are in left-to-right visual order. An empty list is a no-op.
    /// `preferred` overrides the alignment derived from `viewport_width`.
    pub fn open(
        &mut self,
        actions: Vec<A>,
        button_frame: Rect,
        viewport_width: f32,
        preferred: Option<Alignment>,
    ) {
        if actions.is_empty() {
            tracing::trace!("popup open ignored: no alternates");
            return;
        }
        self.close(CloseReason::Reset);

        let alignment =
            preferred.unwrap_or_else(|| Alignment::for_button(button_frame, viewport_width));
        let mut actions = actions;
        if alignment == Alignment::Trailing {
            actions.reverse();
        }
        let count = actions.len();
        self.actions = actions;
        self.alignment = alignment;
        self.button_frame = Some(button_frame);

        let start = self.start_index();
        self.selected = Some(start);
        self.events.push(PopupEvent::Opened { count, alignment });
        self.events.push(PopupEvent::SelectionChanged { index: start });
        tracing::debug!(count, ?alignment, start, "popup opened");
    }

    /// Recompute the selected slot from the drag translation since press.
    ///
    /// No-op while closed. A downward translation greater than the button
    /// height closes the popup.
    pub fn update_selection(&mut self, translation: Point) {
        let Some(frame) = self.button_frame else {
            return;
        };
        if translation.y > frame.height {
            tracing::debug!(dy = translation.y, height = frame.height, "popup dragged away");
            self.close(CloseReason::DraggedAway);
            return;
        }
        if self.actions.is_empty() {
            return;
        }

        let slot = frame.width.min(self.config.max_slot_width);
        if !(slot > 0.0) {
            return;
        }
        let dx = translation.x;
        let steps = if dx >= 0.0 {
            (dx / slot).floor()
        } else {
            ((dx.abs() + slot) / slot).floor()
        };

        let count = self.actions.len();
        let index = if steps.is_finite() && steps < count as f32 {
            let steps = steps as usize;
            match self.alignment {
                Alignment::Leading => steps,
                Alignment::Trailing => count - 1 - steps,
            }
        } else {
            self.start_index()
        };

        if self.selected != Some(index) {
            self.selected = Some(index);
            self.events.push(PopupEvent::SelectionChanged { index });
        }
    }

    /// Commit the selected alternate to the installed handler, then close.
    ///
    /// Returns whether a commit happened.
    pub fn commit(&mut self) -> bool {
        let Some(index) = self.selected.filter(|&i| i < self.actions.len()) else {
            return false;
        };
        let action = self.actions.swap_remove(index);
        if let Some(handler) = self.on_commit.as_mut() {
            handler(&action);
        }
        self.last_committed = Some(action);
        self.events.push(PopupEvent::Committed { index });
        tracing::debug!(index, "popup committed");
        self.close(CloseReason::Committed);
        true
    }

    /// Close the popup and clear its state. Idempotent.
    pub fn reset(&mut self) {
        self.close(CloseReason::Reset);
    }

    fn close(&mut self, reason: CloseReason) {
        let was_open = self.button_frame.is_some();
        self.actions.clear();
        self.selected = None;
        self.button_frame = None;
        if was_open {
            self.events.push(PopupEvent::Closed { reason });
            tracing::debug!(?reason, "popup closed");
        }
    }

    /// True while alternates are shown.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.actions.is_empty()
    }

    /// Alternates in storage order (index 0 is the outermost slot).
    #[must_use]
    pub fn actions(&self) -> &[A] {
        &self.actions
    }

    #[must_use]
    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    #[must_use]
    pub fn selected_action(&self) -> Option<&A> {
        self.selected.and_then(|i| self.actions.get(i))
    }

    /// Alignment of the open popup.
    #[must_use]
    pub fn alignment(&self) -> Option<Alignment> {
        self.button_frame.map(|_| self.alignment)
    }

    /// The pressed button's frame captured at open.
    #[must_use]
    pub fn button_frame(&self) -> Option<Rect> {
        self.button_frame
    }

    /// The slot nearest the press point.
    #[must_use]
    pub fn start_index(&self) -> usize {
        match self.alignment {
            Alignment::Leading => 0,
            Alignment::Trailing => self.actions.len().saturating_sub(1),
        }
    }

    /// The most recently committed alternate, taken out of the model.
    pub fn take_committed(&mut self) -> Option<A> {
        self.last_committed.take()
    }

    /// Drain notifications accumulated since the last call.
    pub fn drain_events(&mut self) -> Vec<PopupEvent> {
        std::mem::take(&mut self.events)
    }
}

impl<A> SelectionTarget for PopupSelection<A> {
    fn is_active(&self) -> bool {
        PopupSelection::is_active(self)
    }

    fn update_selection(&mut self, translation: Point) {
        PopupSelection::update_selection(self, translation);
    }

    fn commit_selection(&mut self) -> bool {
        self.commit()
    }

    fn dismiss(&mut self) {
        self.reset();
    }
}
