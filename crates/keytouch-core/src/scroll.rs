#![forbid(unsafe_code)]

//! Scroll coordination state shared between a button and its scroll container.
//!
//! The container publishes whether it is scrolling; the button's gesture
//! engine publishes whether it currently owns the touch stream (so the
//! container should stop intercepting). [`ScrollCoordination`] is a cheap,
//! cloneable handle: both sides hold a clone of the same state.
//!
//! Writes only take effect when the value actually changes. Every effective
//! write bumps [`revision`](ScrollCoordination::revision), which lets a
//! container skip redundant downstream work.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Shared `is_scrolling` / `is_gesture_disabled` flag pair.
#[derive(Clone, Default)]
pub struct ScrollCoordination {
    inner: Arc<ScrollInner>,
}

#[derive(Default)]
struct ScrollInner {
    is_scrolling: AtomicBool,
    is_gesture_disabled: AtomicBool,
    revision: AtomicU64,
}

impl std::fmt::Debug for ScrollCoordination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollCoordination")
            .field("is_scrolling", &self.is_scrolling())
            .field("is_gesture_disabled", &self.is_gesture_disabled())
            .field("revision", &self.revision())
            .finish()
    }
}

impl ScrollCoordination {
    /// Create a fresh state with both flags cleared.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the enclosing container is currently scrolling.
    #[must_use]
    pub fn is_scrolling(&self) -> bool {
        self.inner.is_scrolling.load(Ordering::Acquire)
    }

    /// Whether a button has asked the container to stop intercepting touches.
    #[must_use]
    pub fn is_gesture_disabled(&self) -> bool {
        self.inner.is_gesture_disabled.load(Ordering::Acquire)
    }

    /// Number of effective writes so far.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::Acquire)
    }

    /// Publish the container's scrolling state. Returns `true` if it changed.
    pub fn set_scrolling(&self, value: bool) -> bool {
        let changed = Self::write(&self.inner.is_scrolling, value);
        if changed {
            self.bump();
            tracing::debug!(is_scrolling = value, "scroll state changed");
        }
        changed
    }

    /// Publish the button's gesture ownership. Returns `true` if it changed.
    pub fn set_gesture_disabled(&self, value: bool) -> bool {
        let changed = Self::write(&self.inner.is_gesture_disabled, value);
        if changed {
            self.bump();
            tracing::debug!(is_gesture_disabled = value, "scroll gesture ownership changed");
        }
        changed
    }

    /// True if both handles observe the same shared state.
    #[must_use]
    pub fn same_state(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn write(flag: &AtomicBool, value: bool) -> bool {
        flag.compare_exchange(!value, value, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn bump(&self) {
        self.inner.revision.fetch_add(1, Ordering::AcqRel);
    }
}
