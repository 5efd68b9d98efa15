// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timelines and the builder that lays effects out in time.

use crate::effect::{Direction, EffectError, TimelineEffect};
use serde::{Deserialize, Serialize};

/// Rule placing an element relative to the one inserted before it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Placement {
    /// Start `offset` seconds after the previous element ends
    AfterPreviousEnd(f32),
    /// Start `offset` seconds after the previous element starts
    WithPreviousStart(f32),
    /// Start at an absolute time
    AbsoluteTime(f32),
}

impl Default for Placement {
    fn default() -> Self {
        Self::AfterPreviousEnd(0.0)
    }
}

impl Placement {
    /// Resolve the absolute start given the previous element's start and span
    pub fn resolve(self, last_time: f32, last_duration: f32) -> f32 {
        match self {
            Self::AfterPreviousEnd(offset) => last_time + last_duration + offset,
            Self::WithPreviousStart(offset) => last_time + offset,
            Self::AbsoluteTime(time) => time,
        }
    }
}

/// An effect anchored at an absolute start time
#[derive(Debug)]
pub struct TimelineEntry {
    start: f32,
    span: f32,
    effect: Box<dyn TimelineEffect>,
}

impl TimelineEntry {
    /// Absolute start time
    pub fn start(&self) -> f32 {
        self.start
    }

    /// Absolute end time
    pub fn end(&self) -> f32 {
        self.start + self.span
    }

    /// The effect itself
    pub fn effect(&self) -> &dyn TimelineEffect {
        self.effect.as_ref()
    }

    fn is_hit(&self, prev: f32, next: f32, closed: bool, direction: Direction) -> bool {
        let (start, end) = (self.start, self.end());
        let instant = self.span == 0.0;
        match direction {
            Direction::Forward => {
                let entered = if closed { start <= next } else { start < next };
                let unsettled = if instant { end >= prev } else { end > prev };
                entered && unsettled
            }
            Direction::Backward => {
                let entered = if closed { end >= next } else { end > next };
                let unsettled = if instant { start <= prev } else { start < prev };
                entered && unsettled
            }
        }
    }
}

/// Immutable collection of effects laid out in time
///
/// Entries are kept sorted by start time; entries with equal starts keep
/// their insertion order.
#[derive(Debug, Default)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
    duration: f32,
}

impl Timeline {
    /// Start building a timeline
    pub fn builder() -> TimelineBuilder {
        TimelineBuilder::new()
    }

    /// Timeline holding a single effect starting after `delay`
    pub fn single(effect: impl TimelineEffect + 'static, delay: f32) -> Result<Self, TimelineError> {
        TimelineBuilder::new()
            .insert(Placement::AbsoluteTime(delay), effect)
            .build()
    }

    /// Total duration: the latest end over all effects
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Entries sorted by start time
    pub fn effects(&self) -> &[TimelineEntry] {
        &self.entries
    }

    /// Check if the timeline has no effects
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drive every effect touched by moving from `prev` to `next`
    ///
    /// The traversal covers `[prev, next)` going forward and `(next, prev]`
    /// going backward. When `next` is the terminal boundary for the
    /// direction the end point is included as well, so consecutive calls
    /// partition time and an instantaneous effect fires once per crossing.
    pub fn update(&self, prev: f32, next: f32, direction: Direction) -> Result<(), EffectError> {
        let prev = prev.clamp(0.0, self.duration);
        let next = next.clamp(0.0, self.duration);
        let inverted = match direction {
            Direction::Forward => next < prev,
            Direction::Backward => next > prev,
        };
        if inverted {
            tracing::trace!("Ignoring traversal {} -> {} against {:?}", prev, next, direction);
            return Ok(());
        }

        let closed = next == direction.end_boundary(self.duration);
        let apply = |entry: &TimelineEntry| -> Result<(), EffectError> {
            if entry.is_hit(prev, next, closed, direction) {
                let from = (prev - entry.start).clamp(0.0, entry.span);
                let to = (next - entry.start).clamp(0.0, entry.span);
                entry.effect.apply_range(from, to, direction)?;
            }
            Ok(())
        };

        match direction {
            Direction::Forward => self.entries.iter().try_for_each(&apply),
            Direction::Backward => self.entries.iter().rev().try_for_each(&apply),
        }
    }

    /// Put every effect into the state it has at time `t`
    ///
    /// Callbacks do not fire and relative effects are left alone. Effects
    /// starting after `t` are reset first (latest first), then effects that
    /// already ended are completed, then effects containing `t` are
    /// evaluated, so the effect active at `t` wins when several drive the
    /// same target.
    pub fn apply_state_at(&self, t: f32) -> Result<(), EffectError> {
        self.layered(t, |entry, elapsed| entry.effect.apply_state_at(elapsed))
    }

    /// Carry every effect's state from time `from` to time `to`
    ///
    /// Like [`Timeline::apply_state_at`] at `to`, except that relative
    /// effects also move their targets by what lies between `from` and `to`.
    pub fn move_state(&self, from: f32, to: f32) -> Result<(), EffectError> {
        let from = from.clamp(0.0, self.duration);
        self.layered(to, |entry, elapsed| entry.effect.move_state(from - entry.start, elapsed))
    }

    fn layered(
        &self,
        t: f32,
        apply: impl Fn(&TimelineEntry, f32) -> Result<(), EffectError>,
    ) -> Result<(), EffectError> {
        let t = t.clamp(0.0, self.duration);
        for entry in self.entries.iter().rev().filter(|e| e.start > t) {
            apply(entry, t - entry.start)?;
        }
        for entry in self.entries.iter().filter(|e| e.end() < t) {
            apply(entry, entry.span)?;
        }
        for entry in self.entries.iter().filter(|e| e.start <= t && t <= e.end()) {
            apply(entry, t - entry.start)?;
        }
        Ok(())
    }
}

enum Slot {
    Rule(Placement),
    AfterAll(f32),
}

/// Builder resolving placement rules into a [`Timeline`]
#[derive(Default)]
pub struct TimelineBuilder {
    elements: Vec<(Slot, Box<dyn TimelineEffect>)>,
}

impl TimelineBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an effect placed by `rule`
    pub fn insert(self, rule: Placement, effect: impl TimelineEffect + 'static) -> Self {
        self.insert_boxed(rule, Box::new(effect))
    }

    /// Insert an already boxed effect placed by `rule`
    pub fn insert_boxed(mut self, rule: Placement, effect: Box<dyn TimelineEffect>) -> Self {
        self.elements.push((Slot::Rule(rule), effect));
        self
    }

    /// Insert an effect starting when everything inserted so far has ended
    pub fn append(self, effect: impl TimelineEffect + 'static) -> Self {
        self.append_with_delay(0.0, effect)
    }

    /// Insert an effect starting `delay` seconds after everything inserted
    /// so far has ended
    pub fn append_with_delay(mut self, delay: f32, effect: impl TimelineEffect + 'static) -> Self {
        self.elements.push((Slot::AfterAll(delay), Box::new(effect)));
        self
    }

    /// Builder with every effect starting together
    pub fn parallel(effects: impl IntoIterator<Item = Box<dyn TimelineEffect>>) -> Self {
        effects.into_iter().fold(Self::new(), |builder, effect| {
            builder.insert_boxed(Placement::WithPreviousStart(0.0), effect)
        })
    }

    /// Builder with every effect starting when the previous one ends
    pub fn sequential(effects: impl IntoIterator<Item = Box<dyn TimelineEffect>>) -> Self {
        effects.into_iter().fold(Self::new(), |builder, effect| {
            builder.insert_boxed(Placement::AfterPreviousEnd(0.0), effect)
        })
    }

    /// Builder with effect `i` starting at `i * delay`
    pub fn with_growing_delay(
        delay: f32,
        effects: impl IntoIterator<Item = Box<dyn TimelineEffect>>,
    ) -> Self {
        effects.into_iter().enumerate().fold(Self::new(), |builder, (i, effect)| {
            let rule = if i == 0 {
                Placement::AbsoluteTime(0.0)
            } else {
                Placement::WithPreviousStart(delay)
            };
            builder.insert_boxed(rule, effect)
        })
    }

    /// Number of inserted effects
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if nothing has been inserted
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Resolve start times and produce the timeline
    pub fn build(self) -> Result<Timeline, TimelineError> {
        let mut entries = Vec::with_capacity(self.elements.len());
        let (mut last_time, mut last_duration, mut end) = (0.0_f32, 0.0_f32, 0.0_f32);

        for (index, (slot, effect)) in self.elements.into_iter().enumerate() {
            let span = effect.span();
            let start = match slot {
                Slot::Rule(rule) => rule.resolve(last_time, last_duration),
                Slot::AfterAll(delay) => end + delay,
            };
            if !start.is_finite() || !span.is_finite() {
                return Err(TimelineError::NonFiniteTime { index });
            }
            if start < 0.0 {
                return Err(TimelineError::NegativeStart { index, start });
            }
            if span < 0.0 {
                return Err(TimelineError::NegativeSpan { index, span });
            }

            last_time = start;
            last_duration = span;
            end = end.max(start + span);
            entries.push(TimelineEntry { start, span, effect });
        }

        entries.sort_by(|a, b| a.start.total_cmp(&b.start));
        tracing::debug!("Built timeline: {} effects, duration {}", entries.len(), end);
        Ok(Timeline {
            entries,
            duration: end,
        })
    }
}

/// Error raised while building a timeline
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimelineError {
    /// An element resolved to a start before zero
    #[error("Element {index} starts at negative time {start}")]
    NegativeStart {
        /// Insertion index of the element
        index: usize,
        /// Resolved start time
        start: f32,
    },

    /// An effect reported a negative span
    #[error("Element {index} has negative span {span}")]
    NegativeSpan {
        /// Insertion index of the element
        index: usize,
        /// Reported span
        span: f32,
    },

    /// A start or span is NaN or infinite
    #[error("Element {index} has a non-finite start or span")]
    NonFiniteTime {
        /// Insertion index of the element
        index: usize,
    },
}
