#![forbid(unsafe_code)]

//! Raw pointer input delivered to a button.
//!
//! A stream for one button is `Down`, zero or more `Move`, then `Up`. The
//! `Up` sample implies the end of the stream.

use web_time::Instant;

use crate::geometry::Point;

/// One position reading from the input source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub position: Point,
    pub timestamp: Instant,
}

impl PointerSample {
    #[must_use]
    pub const fn new(position: Point, timestamp: Instant) -> Self {
        Self {
            position,
            timestamp,
        }
    }
}

/// Where in its stream a sample sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
}

/// A sample tagged with its stream phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub phase: PointerPhase,
    pub sample: PointerSample,
}

impl PointerInput {
    #[must_use]
    pub fn down(position: impl Into<Point>, timestamp: Instant) -> Self {
        Self::new(PointerPhase::Down, position.into(), timestamp)
    }

    #[must_use]
    pub fn moved(position: impl Into<Point>, timestamp: Instant) -> Self {
        Self::new(PointerPhase::Move, position.into(), timestamp)
    }

    #[must_use]
    pub fn up(position: impl Into<Point>, timestamp: Instant) -> Self {
        Self::new(PointerPhase::Up, position.into(), timestamp)
    }

    #[must_use]
    pub const fn new(phase: PointerPhase, position: Point, timestamp: Instant) -> Self {
        Self {
            phase,
            sample: PointerSample::new(position, timestamp),
        }
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Point {
        self.sample.position
    }

    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> Instant {
        self.sample.timestamp
    }
}
