// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline effects.
//!
//! An effect is one time-bound unit of behavior placed on a [`Timeline`]:
//! - [`Tween`] blends a target between two absolute values
//! - [`RelativeTween`] moves a target by a delta
//! - [`Callback`] fires once whenever playback crosses it
//! - [`NestedTimeline`] plays a whole timeline as a single effect
//!
//! Effects are driven by elapsed time inside their own span. They never see
//! the absolute timeline clock.

use crate::ease::Ease;
use crate::target::TweenTarget;
use crate::timeline::Timeline;
use crate::value::TweenValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Direction of playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Direction {
    /// Time increases
    #[default]
    Forward,
    /// Time decreases
    Backward,
}

impl Direction {
    /// Direction from a "playing forwards" flag
    pub fn from_forwards(forwards: bool) -> Self {
        if forwards {
            Self::Forward
        } else {
            Self::Backward
        }
    }

    /// Check if this is forward playback
    pub fn is_forward(self) -> bool {
        self == Self::Forward
    }

    /// The opposite direction
    pub fn flipped(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }

    /// `1.0` going forward, `-1.0` going backward
    pub fn sign(self) -> f32 {
        match self {
            Self::Forward => 1.0,
            Self::Backward => -1.0,
        }
    }

    /// Boundary playback starts from in this direction
    pub fn start_boundary(self, duration: f32) -> f32 {
        match self {
            Self::Forward => 0.0,
            Self::Backward => duration,
        }
    }

    /// Boundary playback runs towards in this direction
    pub fn end_boundary(self, duration: f32) -> f32 {
        self.flipped().start_boundary(duration)
    }
}

/// Something that can be placed on a timeline
///
/// Effects hold no playback state: one timeline may be played by many
/// managers at once. Everything an effect needs to know about where playback
/// came from is passed in.
///
/// `apply` and `apply_range` receive elapsed times within the effect's span,
/// already clamped to `[0, span]`. `apply_state_at` and `move_state` receive
/// `t - start` unclamped from below: a negative value means the timeline
/// position precedes the effect.
pub trait TimelineEffect {
    /// Length of the effect; zero for instantaneous effects
    fn span(&self) -> f32;

    /// Advance the effect to `elapsed` while playing in `direction`
    fn apply(&self, elapsed: f32, direction: Direction) -> Result<(), EffectError>;

    /// Advance the effect from `prev_elapsed` to `elapsed`
    fn apply_range(&self, prev_elapsed: f32, elapsed: f32, direction: Direction) -> Result<(), EffectError> {
        let _ = prev_elapsed;
        self.apply(elapsed, direction)
    }

    /// Force the state the effect has at `elapsed`, without side effects
    /// such as callbacks
    fn apply_state_at(&self, _elapsed: f32) -> Result<(), EffectError> {
        Ok(())
    }

    /// Carry the effect's state from `prev_elapsed` to `elapsed` without
    /// side effects
    ///
    /// Effects whose state depends only on elapsed time keep the default.
    fn move_state(&self, prev_elapsed: f32, elapsed: f32) -> Result<(), EffectError> {
        let _ = prev_elapsed;
        self.apply_state_at(elapsed)
    }

    /// Short description used in logs
    fn label(&self) -> &str;
}

impl fmt::Debug for dyn TimelineEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimelineEffect")
            .field("label", &self.label())
            .field("span", &self.span())
            .finish()
    }
}

fn progress_moving(elapsed: f32, duration: f32, direction: Direction) -> f32 {
    if duration > 0.0 {
        (elapsed / duration).clamp(0.0, 1.0)
    } else if direction.is_forward() {
        1.0
    } else {
        0.0
    }
}

fn progress_at(elapsed: f32, duration: f32) -> f32 {
    if duration > 0.0 {
        (elapsed / duration).clamp(0.0, 1.0)
    } else if elapsed >= 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Tween between two absolute values
pub struct Tween {
    target: Rc<dyn TweenTarget>,
    from: TweenValue,
    to: TweenValue,
    ease: Ease,
    duration: f32,
    label: String,
}

impl Tween {
    /// Create a tween writing `from → to` into `target` over `duration` seconds
    pub fn new(
        target: impl TweenTarget + 'static,
        from: impl Into<TweenValue>,
        to: impl Into<TweenValue>,
        ease: Ease,
        duration: f32,
    ) -> Self {
        Self {
            target: Rc::new(target),
            from: from.into(),
            to: to.into(),
            ease,
            duration,
            label: "tween".to_string(),
        }
    }

    /// Set the label used in logs
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Value the tween writes at a given progress
    pub fn value_at_progress(&self, progress: f32) -> Result<TweenValue, EffectError> {
        self.from.lerp(&self.to, self.ease.apply(progress))
    }
}

impl TimelineEffect for Tween {
    fn span(&self) -> f32 {
        self.duration
    }

    fn apply(&self, elapsed: f32, direction: Direction) -> Result<(), EffectError> {
        let value = self.value_at_progress(progress_moving(elapsed, self.duration, direction))?;
        self.target.set(value)
    }

    fn apply_state_at(&self, elapsed: f32) -> Result<(), EffectError> {
        let value = self.value_at_progress(progress_at(elapsed, self.duration))?;
        self.target.set(value)
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Tween that moves its target by a delta ("move by")
///
/// The tween writes the eased difference between the progress playback came
/// from and the progress it moved to, so each manager's own clock decides how
/// much of the delta has been contributed.
pub struct RelativeTween {
    target: Rc<dyn TweenTarget>,
    by: TweenValue,
    ease: Ease,
    duration: f32,
    label: String,
}

impl RelativeTween {
    /// Create a tween adding `by` to `target` over `duration` seconds
    pub fn new(
        target: impl TweenTarget + 'static,
        by: impl Into<TweenValue>,
        ease: Ease,
        duration: f32,
    ) -> Self {
        Self {
            target: Rc::new(target),
            by: by.into(),
            ease,
            duration,
            label: "tween-by".to_string(),
        }
    }

    /// Set the label used in logs
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    fn shift(&self, from: f32, to: f32) -> Result<(), EffectError> {
        if from == to {
            return Ok(());
        }
        let factor = self.ease.apply(to) - self.ease.apply(from);
        self.target.add(self.by.scale(factor))
    }
}

impl TimelineEffect for RelativeTween {
    fn span(&self) -> f32 {
        self.duration
    }

    fn apply(&self, elapsed: f32, direction: Direction) -> Result<(), EffectError> {
        let from = direction.start_boundary(self.duration);
        self.apply_range(from, elapsed, direction)
    }

    fn apply_range(&self, prev_elapsed: f32, elapsed: f32, direction: Direction) -> Result<(), EffectError> {
        if self.duration > 0.0 {
            return self.shift(
                progress_moving(prev_elapsed, self.duration, direction),
                progress_moving(elapsed, self.duration, direction),
            );
        }
        // An instant crossing contributes the whole delta
        match direction {
            Direction::Forward => self.shift(0.0, 1.0),
            Direction::Backward => self.shift(1.0, 0.0),
        }
    }

    fn move_state(&self, prev_elapsed: f32, elapsed: f32) -> Result<(), EffectError> {
        self.shift(
            progress_at(prev_elapsed, self.duration),
            progress_at(elapsed, self.duration),
        )
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Which playback directions fire a callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InvokeOn {
    /// Only while playing forward
    #[default]
    Forward,
    /// Only while playing backward
    Backward,
    /// In both directions
    Both,
}

impl InvokeOn {
    /// Check if a crossing in `direction` should fire
    pub fn matches(self, direction: Direction) -> bool {
        match self {
            Self::Forward => direction.is_forward(),
            Self::Backward => !direction.is_forward(),
            Self::Both => true,
        }
    }
}

/// Argument passed to callback effects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackEvent {
    /// Direction playback was moving when the callback was crossed
    pub direction: Direction,
}

type CallbackFn = Box<dyn Fn(CallbackEvent) -> Result<(), EffectError>>;

/// Instantaneous effect that runs a function when crossed
pub struct Callback {
    invoke_on: InvokeOn,
    callback: CallbackFn,
    label: String,
}

impl Callback {
    /// Create a callback that cannot fail
    pub fn new(invoke_on: InvokeOn, callback: impl Fn(CallbackEvent) + 'static) -> Self {
        Self::fallible(invoke_on, move |event| {
            callback(event);
            Ok(())
        })
    }

    /// Create a callback whose failure propagates to the caller driving the
    /// timeline
    pub fn fallible(
        invoke_on: InvokeOn,
        callback: impl Fn(CallbackEvent) -> Result<(), EffectError> + 'static,
    ) -> Self {
        Self {
            invoke_on,
            callback: Box::new(callback),
            label: "callback".to_string(),
        }
    }

    /// Set the label used in logs
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl TimelineEffect for Callback {
    fn span(&self) -> f32 {
        0.0
    }

    fn apply(&self, _elapsed: f32, direction: Direction) -> Result<(), EffectError> {
        if self.invoke_on.matches(direction) {
            tracing::trace!("Firing callback '{}' ({:?})", self.label, direction);
            (self.callback)(CallbackEvent { direction })?;
        }
        Ok(())
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// A whole timeline used as one effect
pub struct NestedTimeline {
    timeline: Rc<Timeline>,
    label: String,
}

impl NestedTimeline {
    /// Wrap a built timeline
    pub fn new(timeline: Rc<Timeline>) -> Self {
        Self {
            timeline,
            label: "timeline".to_string(),
        }
    }

    /// Set the label used in logs
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// The wrapped timeline
    pub fn timeline(&self) -> &Rc<Timeline> {
        &self.timeline
    }

    fn clamp(&self, elapsed: f32) -> f32 {
        elapsed.clamp(0.0, self.timeline.duration())
    }
}

impl TimelineEffect for NestedTimeline {
    fn span(&self) -> f32 {
        self.timeline.duration()
    }

    /// Plays the nested timeline from the start boundary of `direction`
    fn apply(&self, elapsed: f32, direction: Direction) -> Result<(), EffectError> {
        let from = direction.start_boundary(self.timeline.duration());
        self.timeline.update(from, elapsed, direction)
    }

    fn apply_range(&self, prev_elapsed: f32, elapsed: f32, direction: Direction) -> Result<(), EffectError> {
        self.timeline.update(prev_elapsed, elapsed, direction)
    }

    fn apply_state_at(&self, elapsed: f32) -> Result<(), EffectError> {
        self.timeline.apply_state_at(self.clamp(elapsed))
    }

    fn move_state(&self, prev_elapsed: f32, elapsed: f32) -> Result<(), EffectError> {
        self.timeline.move_state(self.clamp(prev_elapsed), self.clamp(elapsed))
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Error raised while applying an effect
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EffectError {
    /// Two values of different kinds were blended
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Kind the target holds
        expected: &'static str,
        /// Kind that was supplied
        found: &'static str,
    },

    /// A bound property does not exist
    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    /// Custom error
    #[error("{0}")]
    Custom(String),
}
