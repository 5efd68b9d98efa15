// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline playback for OrdoPlay.
//!
//! This crate plays time-positioned effects:
//! - Absolute and relative property tweens
//! - One-shot callbacks
//! - Nested timelines
//!
//! ## Architecture
//!
//! Playback is built on:
//! - Immutable timelines assembled by a placement-rule builder
//! - A play/stop/loop state machine per playing instance
//! - A phase scheduler with one live set per timing domain, which tolerates
//!   registration changes while it is iterating
//!
//! Everything runs on the thread that drives the engine tick; the types are
//! `!Send`.

pub mod ease;
pub mod value;
pub mod target;
pub mod effect;
pub mod timeline;
pub mod looping;
pub mod manager;
pub mod scheduler;
pub mod host;
pub mod config;

pub use ease::Ease;
pub use value::{TweenValue, Interpolation};
pub use target::{TweenTarget, PropertyBag, PropertyBinding};
pub use effect::{
    Direction, TimelineEffect, EffectError,
    Tween, RelativeTween, Callback, CallbackEvent, InvokeOn, NestedTimeline,
};
pub use timeline::{Timeline, TimelineBuilder, TimelineEntry, TimelineError, Placement};
pub use looping::{LoopConfig, LoopMode, LoopConfigError};
pub use manager::{PlaybackManager, ManagerId, PlaybackState, PlaybackEvent};
pub use scheduler::{PhaseScheduler, TimingDomain, TweenTime, FrameTime};
pub use host::{TweenHost, TweenAction};
pub use config::{
    TweenSettings, TimelineDescription, ElementDescription, EffectDescription,
    TimelineBindings, ConfigError,
};
