#![forbid(unsafe_code)]

//! Timer service: deadline-ordered single-shot and repeating timers.
//!
//! [`TimerQueue`] never sleeps and never spawns threads. The owner advances
//! it by asking for due timers with [`pop_due`](TimerQueue::pop_due), which
//! makes the queue usable with a real clock and with a virtual clock in
//! tests alike.
//!
//! # Invariants
//!
//! 1. Timers fire in deadline order; equal deadlines fire in arm order.
//! 2. A cancelled timer never fires, even if it was already due.
//! 3. A repeating timer re-arms itself at `deadline + interval` after each
//!    fire, so a late poll catches up tick by tick instead of skipping.
//!
//! Payloads usually carry a [`Generation`] so the receiver can drop fires
//! that belong to a session that has already ended.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::AHashSet;
use web_time::{Duration, Instant};

/// Smallest interval a repeating timer may use.
pub const MIN_REPEAT_INTERVAL: Duration = Duration::from_millis(1);

/// A monotonically increasing stamp distinguishing one session from the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    /// The stamp before any session has started.
    pub const INITIAL: Self = Self(0);

    /// The following stamp.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Handle to an armed timer, used for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// A timer that came due.
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<T> {
    pub id: TimerId,
    /// The deadline the timer was armed for (not the poll time).
    pub deadline: Instant,
    pub payload: T,
}

#[derive(Debug)]
struct Entry<T> {
    deadline: Instant,
    seq: u64,
    id: TimerId,
    interval: Option<Duration>,
    payload: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // Reversed so BinaryHeap pops the earliest deadline first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Deadline-ordered queue of cancelable timers.
pub struct TimerQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    live: AHashSet<TimerId>,
    next_id: u64,
    next_seq: u64,
}

impl<T> std::fmt::Debug for TimerQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerQueue")
            .field("armed", &self.live.len())
            .field("next_deadline", &self.heap.peek().map(|e| e.deadline))
            .finish()
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: AHashSet::new(),
            next_id: 0,
            next_seq: 0,
        }
    }

    /// Arm a single-shot timer.
    pub fn arm(&mut self, deadline: Instant, payload: T) -> TimerId {
        self.push(deadline, None, payload)
    }

    /// Arm a repeating timer whose first fire is at `first` and which then
    /// fires every `interval` (clamped to [`MIN_REPEAT_INTERVAL`]).
    pub fn arm_repeating(&mut self, first: Instant, interval: Duration, payload: T) -> TimerId {
        self.push(first, Some(interval.max(MIN_REPEAT_INTERVAL)), payload)
    }

    /// Cancel a timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let removed = self.live.remove(&id);
        self.compact_front();
        removed
    }

    /// True while the timer is still armed.
    #[must_use]
    pub fn is_armed(&self, id: TimerId) -> bool {
        self.live.contains(&id)
    }

    /// Earliest deadline among armed timers.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|e| e.deadline)
    }

    /// Number of armed timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Cancel everything.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.live.clear();
    }

    fn push(&mut self, deadline: Instant, interval: Option<Duration>, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.live.insert(id);
        self.push_entry(deadline, id, interval, payload);
        id
    }

    fn push_entry(
        &mut self,
        deadline: Instant,
        id: TimerId,
        interval: Option<Duration>,
        payload: T,
    ) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.heap.push(Entry {
            deadline,
            seq,
            id,
            interval,
            payload,
        });
    }

    // Drop cancelled entries sitting at the front so next_deadline stays exact.
    fn compact_front(&mut self) {
        while let Some(top) = self.heap.peek() {
            if self.live.contains(&top.id) {
                break;
            }
            self.heap.pop();
        }
    }
}

impl<T: Clone> TimerQueue<T> {
    /// Pop the earliest timer whose deadline is at or before `now`.
    ///
    /// Repeating timers are re-armed before being returned.
    pub fn pop_due(&mut self, now: Instant) -> Option<Fired<T>> {
        self.compact_front();
        if self.heap.peek()?.deadline > now {
            return None;
        }
        let entry = self.heap.pop()?;
        match entry.interval {
            Some(interval) => {
                self.push_entry(
                    entry.deadline + interval,
                    entry.id,
                    Some(interval),
                    entry.payload.clone(),
                );
            }
            None => {
                self.live.remove(&entry.id);
            }
        }
        self.compact_front();
        Some(Fired {
            id: entry.id,
            deadline: entry.deadline,
            payload: entry.payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS_100: Duration = Duration::from_millis(100);
    const MS_200: Duration = Duration::from_millis(200);
    const MS_500: Duration = Duration::from_millis(500);

    #[test]
    fn fires_in_deadline_order() {
        let t = Instant::now();
        let mut q = TimerQueue::new();
        q.arm(t + MS_500, "late");
        q.arm(t + MS_100, "early");
        q.arm(t + MS_200, "middle");

        assert_eq!(q.next_deadline(), Some(t + MS_100));
        let order: Vec<_> = std::iter::from_fn(|| q.pop_due(t + MS_500))
            .map(|f| f.payload)
            .collect();
        assert_eq!(order, vec!["early", "middle", "late"]);
        assert!(q.is_empty());
    }

    #[test]
    fn equal_deadlines_fire_in_arm_order() {
        let t = Instant::now();
        let mut q = TimerQueue::new();
        q.arm(t + MS_100, 1);
        q.arm(t + MS_100, 2);
        q.arm(t + MS_100, 3);
        let order: Vec<_> = std::iter::from_fn(|| q.pop_due(t + MS_100))
            .map(|f| f.payload)
            .collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn not_due_yet() {
        let t = Instant::now();
        let mut q = TimerQueue::new();
        q.arm(t + MS_200, ());
        assert!(q.pop_due(t + MS_100).is_none());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let t = Instant::now();
        let mut q = TimerQueue::new();
        let a = q.arm(t + MS_100, "a");
        q.arm(t + MS_200, "b");
        assert!(q.cancel(a));
        assert!(!q.cancel(a));
        assert!(!q.is_armed(a));
        assert_eq!(q.next_deadline(), Some(t + MS_200));

        let fired = q.pop_due(t + MS_500).map(|f| f.payload);
        assert_eq!(fired, Some("b"));
        assert!(q.pop_due(t + MS_500).is_none());
    }

    #[test]
    fn repeating_timer_catches_up_tick_by_tick() {
        let t = Instant::now();
        let mut q = TimerQueue::new();
        let id = q.arm_repeating(t + MS_100, MS_100, "tick");

        let deadlines: Vec<_> = std::iter::from_fn(|| q.pop_due(t + Duration::from_millis(350)))
            .map(|f| f.deadline)
            .collect();
        assert_eq!(deadlines, vec![t + MS_100, t + MS_200, t + Duration::from_millis(300)]);
        assert!(q.is_armed(id));
        assert_eq!(q.next_deadline(), Some(t + Duration::from_millis(400)));

        q.cancel(id);
        assert!(q.pop_due(t + Duration::from_secs(10)).is_none());
    }

    #[test]
    fn zero_interval_is_clamped() {
        let t = Instant::now();
        let mut q = TimerQueue::new();
        q.arm_repeating(t, Duration::ZERO, ());
        let count = std::iter::from_fn(|| q.pop_due(t + Duration::from_millis(5))).count();
        assert_eq!(count, 6);
    }

    #[test]
    fn clear_disarms_everything() {
        let t = Instant::now();
        let mut q = TimerQueue::new();
        q.arm(t, 1);
        q.arm_repeating(t, MS_100, 2);
        q.clear();
        assert!(q.is_empty());
        assert!(q.next_deadline().is_none());
        assert!(q.pop_due(t + MS_500).is_none());
    }

    #[test]
    fn generation_advances() {
        let g = Generation::INITIAL;
        assert_eq!(g.next().get(), 1);
        assert!(g.next() > g);
    }

    #[test]
    fn debug_format() {
        let q: TimerQueue<()> = TimerQueue::new();
        assert!(format!("{q:?}").contains("TimerQueue"));
    }
}
