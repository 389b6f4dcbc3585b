#![forbid(unsafe_code)]

//! Core: touch gesture disambiguation for on-screen keyboard buttons.
//!
//! # Role in keytouch
//! `keytouch-core` is the input layer of a keyboard. It turns each button's
//! raw pointer stream into discrete gesture events, coordinates with an
//! enclosing scroll container, and maps sideways drags to an alternate in a
//! long-press popup.
//!
//! # Primary responsibilities
//! - **GestureEngine**: tap, long press, double tap, repeat, drag,
//!   release inside/outside and the stuck-press safety net.
//! - **TimerQueue**: cancellable one-shot and repeating deadlines on a
//!   caller-driven clock.
//! - **ScrollCoordination**: the flag pair shared with a scroll container.
//! - **PopupSelection**: alternates, alignment and slot selection.
//!
//! # How it fits in the system
//! Nothing here reads a clock or spawns threads. Hosts feed
//! [`PointerInput`](sample::PointerInput) values in, call
//! [`GestureEngine::advance`](gesture::GestureEngine::advance) when
//! [`next_deadline`](gesture::GestureEngine::next_deadline) passes, and act on
//! the returned events. `keytouch-harness` drives the same API from recorded
//! scenarios on a virtual clock.

pub mod config;
pub mod event;
pub mod geometry;
pub mod gesture;
pub mod popup;
pub mod sample;
pub mod scroll;
pub mod timer;

pub use config::{ConfigError, GestureConfig, KeytouchConfig, PopupConfig, ScrollDeferral};
pub use event::{CloseReason, GestureEvent, GestureHandlers, PopupEvent, ReleaseDisposition};
pub use geometry::{Point, Rect, Size};
pub use gesture::GestureEngine;
pub use popup::{Alignment, NoPopup, PopupSelection, SelectionTarget};
pub use sample::{PointerInput, PointerPhase, PointerSample};
pub use scroll::ScrollCoordination;
