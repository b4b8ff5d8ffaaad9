//! The frame clock: frame numbering, retained deltas, and eviction.
//!
//! Each recorded tick registers a [`FrameStamp`] holding the delta time of
//! that tick. The stamps form one contiguous, strictly increasing window
//! `[min, max]`. Old frames leave the window through exactly three doors,
//! all of which evict oldest-first and report each evicted frame through a
//! caller-supplied callback:
//!
//! - [`FrameClock::fit_to_budget`] trims the front until the retained
//!   duration fits the recording budget.
//! - [`FrameClock::clear_from`] drops the unreachable "future" when
//!   recording resumes mid-history.
//! - [`FrameClock::reset`] drops everything on a session boundary.
//!
//! The clock also owns the subscription list that recorders join when they
//! attach and leave when their owner is destroyed.
//!
//! # Example
//!
//! ```
//! use rewind_core::frame::{FrameCapacity, FrameClock};
//!
//! let mut clock = FrameClock::new(FrameCapacity::default());
//! for _ in 0..4 {
//!     clock.register_frame(0.5).unwrap();
//!     clock.advance();
//! }
//!
//! let mut evicted = Vec::new();
//! clock.fit_to_budget(1.0, |frame| evicted.push(frame));
//! assert_eq!(evicted, vec![0, 1]);
//! assert_eq!((clock.min(), clock.max()), (Some(2), Some(3)));
//! ```

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::RewindError;

/// Index of one discrete simulation tick.
pub type Frame = u64;

/// Extra slack added to capacity predictions so that small timing jitter
/// does not force the first resize of a pre-sized collection.
const CAPACITY_ERROR_CORRECTION: usize = 30;

// ---------------------------------------------------------------------------
// PlaybackState
// ---------------------------------------------------------------------------

/// Whether the timeline is capturing new frames or scrubbing old ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    #[default]
    Recording,
    Paused,
}

// ---------------------------------------------------------------------------
// FrameStamp
// ---------------------------------------------------------------------------

/// One registered frame and the time that elapsed during it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameStamp {
    pub index: Frame,
    /// Seconds elapsed during this frame.
    pub delta: f64,
}

impl fmt::Display for FrameStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame: {}, Delta: {}", self.index, self.delta)
    }
}

// ---------------------------------------------------------------------------
// FrameCapacity
// ---------------------------------------------------------------------------

/// Advisory sizing for per-recorder collections and snapshot pools.
///
/// The prediction is only a pre-allocation hint. Collections sized from it
/// grow normally when the real frame count exceeds it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameCapacity {
    /// Recording budget in seconds.
    pub max_record_duration: f64,
    /// Frames per second the host is expected to run at.
    pub predicted_fps: u32,
}

impl Default for FrameCapacity {
    /// 30 seconds at a worst case of 144 fps.
    fn default() -> Self {
        Self {
            max_record_duration: 30.0,
            predicted_fps: 144,
        }
    }
}

impl FrameCapacity {
    /// Predicted number of frames the retention window will hold.
    pub fn prediction(&self) -> usize {
        let frames = (self.max_record_duration.max(0.0) * self.predicted_fps as f64).ceil();
        frames as usize + CAPACITY_ERROR_CORRECTION
    }
}

// ---------------------------------------------------------------------------
// SubscriptionId
// ---------------------------------------------------------------------------

/// Token identifying one recorder's subscription to clock events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

// ---------------------------------------------------------------------------
// FrameClock
// ---------------------------------------------------------------------------

/// Owns the current frame index and the window of retained frames.
///
/// While recording, `index` is the next frame to register, one past the
/// newest retained frame. While paused it is the frame being displayed and
/// may be moved anywhere in `[min, max]` by [`scrub_to`](Self::scrub_to).
#[derive(Debug)]
pub struct FrameClock {
    /// Current frame index.
    index: Frame,
    /// Retained stamps, oldest first, strictly increasing by index.
    stamps: VecDeque<FrameStamp>,
    /// Sizing hint for collections that scale with the window.
    capacity: FrameCapacity,
    /// Live recorder subscriptions.
    subscribers: BTreeSet<SubscriptionId>,
    /// Next subscription token to hand out.
    next_subscription: u64,
}

impl FrameClock {
    /// Create a clock at frame 0 with an empty window.
    pub fn new(capacity: FrameCapacity) -> Self {
        Self {
            index: 0,
            stamps: VecDeque::with_capacity(capacity.prediction()),
            capacity,
            subscribers: BTreeSet::new(),
            next_subscription: 0,
        }
    }

    // -- registration -------------------------------------------------------

    /// Register the current frame with the given delta time.
    ///
    /// # Errors
    ///
    /// Returns [`RewindError::FrameAlreadyRegistered`] if the current index
    /// is not newer than the newest retained frame. That only happens when
    /// the host ticks twice without advancing, and history must not be
    /// overwritten silently.
    pub fn register_frame(&mut self, delta: f64) -> Result<(), RewindError> {
        if let Some(max) = self.max() {
            if self.index <= max {
                tracing::error!(frame = self.index, max, "frame registered twice");
                return Err(RewindError::FrameAlreadyRegistered {
                    frame: self.index,
                    max,
                });
            }
        }
        self.stamps.push_back(FrameStamp {
            index: self.index,
            delta,
        });
        Ok(())
    }

    /// Move the index forward by one frame after a tick has been recorded.
    pub fn advance(&mut self) {
        self.index += 1;
    }

    // -- eviction -----------------------------------------------------------

    /// Evict the oldest retained frame, returning its index.
    pub fn evict_oldest(&mut self) -> Option<Frame> {
        let stamp = self.stamps.pop_front()?;
        tracing::trace!(frame = stamp.index, "frame evicted");
        Some(stamp.index)
    }

    /// Evict oldest frames until the retained duration is within `budget`
    /// seconds. Returns the number of frames evicted.
    ///
    /// The newest frame is never evicted, so a single delta larger than the
    /// whole budget still leaves one frame in the window.
    pub fn fit_to_budget(&mut self, budget: f64, mut on_evict: impl FnMut(Frame)) -> usize {
        let mut duration = self.retained_duration();
        let mut evicted = 0;
        while duration > budget && self.stamps.len() > 1 {
            let Some(oldest) = self.stamps.front().copied() else {
                break;
            };
            duration -= oldest.delta;
            if let Some(frame) = self.evict_oldest() {
                on_evict(frame);
                evicted += 1;
            }
        }
        evicted
    }

    /// Evict every frame from `start` through the newest, in increasing
    /// order. Returns the number of frames evicted.
    ///
    /// Used when recording resumes at `start`: everything from there on is
    /// an unreachable future. Afterwards the newest retained frame is at
    /// most `start - 1`.
    pub fn clear_from(&mut self, start: Frame, mut on_evict: impl FnMut(Frame)) -> usize {
        let split = self.stamps.partition_point(|stamp| stamp.index < start);
        let future = self.stamps.split_off(split);
        for stamp in &future {
            tracing::trace!(frame = stamp.index, "future frame discarded");
            on_evict(stamp.index);
        }
        future.len()
    }

    /// Evict the whole window oldest-first and return the index to zero.
    pub fn reset(&mut self, mut on_evict: impl FnMut(Frame)) -> usize {
        let mut evicted = 0;
        while let Some(frame) = self.evict_oldest() {
            on_evict(frame);
            evicted += 1;
        }
        self.index = 0;
        evicted
    }

    // -- scrubbing ----------------------------------------------------------

    /// Move the index to `frame` if it lies inside the retained window.
    ///
    /// Returns `false` and leaves the index unchanged otherwise.
    pub fn scrub_to(&mut self, frame: Frame) -> bool {
        if !self.contains(frame) {
            return false;
        }
        self.index = frame;
        true
    }

    // -- subscriptions ------------------------------------------------------

    /// Add a subscriber and return its token.
    pub fn subscribe(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.insert(id);
        id
    }

    /// Remove a subscriber. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(&id)
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscribers.contains(&id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    // -- accessors ----------------------------------------------------------

    /// The current frame index.
    pub fn index(&self) -> Frame {
        self.index
    }

    /// Oldest retained frame, `None` when the window is empty.
    pub fn min(&self) -> Option<Frame> {
        self.stamps.front().map(|stamp| stamp.index)
    }

    /// Newest retained frame, `None` when the window is empty.
    pub fn max(&self) -> Option<Frame> {
        self.stamps.back().map(|stamp| stamp.index)
    }

    /// Whether `frame` lies inside `[min, max]`.
    pub fn contains(&self, frame: Frame) -> bool {
        matches!((self.min(), self.max()), (Some(min), Some(max)) if (min..=max).contains(&frame))
    }

    /// Number of retained frames.
    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    /// Sum of the deltas of all retained frames, in seconds.
    pub fn retained_duration(&self) -> f64 {
        self.stamps.iter().map(|stamp| stamp.delta).sum()
    }

    /// Delta recorded for `frame`, if retained.
    pub fn delta_of(&self, frame: Frame) -> Option<f64> {
        let (min, max) = (self.min()?, self.max()?);
        if frame < min || frame > max {
            return None;
        }
        let at = self.stamps.partition_point(|stamp| stamp.index < frame);
        self.stamps
            .get(at)
            .filter(|stamp| stamp.index == frame)
            .map(|stamp| stamp.delta)
    }

    /// Iterate the retained stamps, oldest first.
    pub fn stamps(&self) -> impl Iterator<Item = &FrameStamp> {
        self.stamps.iter()
    }

    pub fn capacity(&self) -> FrameCapacity {
        self.capacity
    }

    /// Replace the sizing hint. Affects only collections sized afterwards.
    pub fn set_capacity(&mut self, capacity: FrameCapacity) {
        self.capacity = capacity;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_with_frames(count: u64, delta: f64) -> FrameClock {
        let mut clock = FrameClock::new(FrameCapacity::default());
        for _ in 0..count {
            clock.register_frame(delta).unwrap();
            clock.advance();
        }
        clock
    }

    #[test]
    fn register_then_advance_grows_window() {
        let clock = clock_with_frames(3, 0.1);
        assert_eq!(clock.index(), 3);
        assert_eq!(clock.min(), Some(0));
        assert_eq!(clock.max(), Some(2));
        assert_eq!(clock.len(), 3);
    }

    #[test]
    fn double_registration_is_rejected() {
        let mut clock = FrameClock::new(FrameCapacity::default());
        clock.register_frame(0.1).unwrap();
        let err = clock.register_frame(0.1).unwrap_err();
        assert!(matches!(
            err,
            RewindError::FrameAlreadyRegistered { frame: 0, max: 0 }
        ));
        assert_eq!(clock.len(), 1, "history must not be overwritten");
    }

    #[test]
    fn fit_evicts_oldest_first_until_within_budget() {
        let mut clock = clock_with_frames(10, 0.25);
        let mut evicted = Vec::new();
        let count = clock.fit_to_budget(1.0, |f| evicted.push(f));
        assert_eq!(count, 6);
        assert_eq!(evicted, vec![0, 1, 2, 3, 4, 5]);
        assert!(clock.retained_duration() <= 1.0);
    }

    #[test]
    fn fit_keeps_newest_frame_when_delta_exceeds_budget() {
        let mut clock = clock_with_frames(3, 5.0);
        clock.fit_to_budget(1.0, |_| {});
        assert_eq!(clock.len(), 1);
        assert_eq!(clock.max(), Some(2));
    }

    #[test]
    fn clear_from_discards_future_in_increasing_order() {
        let mut clock = clock_with_frames(8, 0.1);
        let mut evicted = Vec::new();
        clock.clear_from(5, |f| evicted.push(f));
        assert_eq!(evicted, vec![5, 6, 7]);
        assert_eq!(clock.max(), Some(4));
        assert_eq!(clock.min(), Some(0));
    }

    #[test]
    fn clear_from_past_the_newest_frame_is_a_noop() {
        let mut clock = clock_with_frames(4, 0.1);
        assert_eq!(clock.clear_from(4, |_| panic!("nothing to evict")), 0);
        assert_eq!(clock.max(), Some(3));
    }

    #[test]
    fn reset_evicts_everything_and_zeroes_index() {
        let mut clock = clock_with_frames(5, 0.1);
        let mut evicted = Vec::new();
        clock.reset(|f| evicted.push(f));
        assert_eq!(evicted, vec![0, 1, 2, 3, 4]);
        assert_eq!(clock.index(), 0);
        assert!(clock.is_empty());
        assert_eq!(clock.min(), None);
    }

    #[test]
    fn scrub_stays_inside_window() {
        let mut clock = clock_with_frames(5, 0.25);
        clock.fit_to_budget(0.75, |_| {});
        assert_eq!(clock.min(), Some(2));
        assert!(!clock.scrub_to(1));
        assert_eq!(clock.index(), 5);
        assert!(clock.scrub_to(3));
        assert_eq!(clock.index(), 3);
        assert!(!clock.scrub_to(5));
    }

    #[test]
    fn delta_lookup_finds_retained_frames_only() {
        let mut clock = FrameClock::new(FrameCapacity::default());
        for delta in [0.1, 0.2, 0.3] {
            clock.register_frame(delta).unwrap();
            clock.advance();
        }
        assert_eq!(clock.delta_of(1), Some(0.2));
        assert_eq!(clock.delta_of(3), None);
    }

    #[test]
    fn subscriptions_are_tracked() {
        let mut clock = FrameClock::new(FrameCapacity::default());
        let a = clock.subscribe();
        let b = clock.subscribe();
        assert_ne!(a, b);
        assert_eq!(clock.subscriber_count(), 2);
        assert!(clock.unsubscribe(a));
        assert!(!clock.unsubscribe(a));
        assert!(!clock.is_subscribed(a));
        assert!(clock.is_subscribed(b));
    }

    #[test]
    fn capacity_prediction_includes_slack() {
        let capacity = FrameCapacity {
            max_record_duration: 10.0,
            predicted_fps: 60,
        };
        assert_eq!(capacity.prediction(), 630);
    }
}
