// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lifecycle glue between a host object and its playback manager.

use crate::config::TweenSettings;
use crate::effect::{Direction, EffectError};
use crate::manager::PlaybackManager;
use crate::scheduler::PhaseScheduler;
use crate::timeline::Timeline;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Action a host can run on its manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TweenAction {
    /// Play from the start
    PlayForwards,
    /// Play from the end
    PlayBackwards,
    /// Resume playing forward
    ResumeForwards,
    /// Resume playing backward
    ResumeBackwards,
    /// Resume in the current direction
    Resume,
    /// Stop playback
    Stop,
    /// Flip the direction
    Reverse,
    /// Rewind, leaving relative effects in place
    Rewind,
    /// Rewind, moving relative effects back as well
    RewindWithEffectsForRelative,
    /// Apply the state at time zero
    ApplyZeroState,
    /// Apply the state at the end of the timeline
    ApplyMaxDurationState,
}

impl TweenAction {
    /// Run the action on `manager`
    pub fn run(self, manager: &PlaybackManager) -> Result<(), EffectError> {
        match self {
            Self::PlayForwards => manager.play(true),
            Self::PlayBackwards => manager.play(false),
            Self::ResumeForwards => manager.resume(Some(Direction::Forward)),
            Self::ResumeBackwards => manager.resume(Some(Direction::Backward)),
            Self::Resume => manager.resume(None),
            Self::Stop => {
                manager.stop();
                Ok(())
            }
            Self::Reverse => {
                manager.reverse();
                Ok(())
            }
            Self::Rewind => manager.rewind(false),
            Self::RewindWithEffectsForRelative => manager.rewind(true),
            Self::ApplyZeroState => manager.apply_state_at(0.0),
            Self::ApplyMaxDurationState => manager.apply_state_at(manager.timeline().duration()),
        }
    }
}

/// Owner of one playback manager, driven by host lifecycle events
///
/// Dropping the host disposes its manager.
pub struct TweenHost {
    manager: PlaybackManager,
    settings: TweenSettings,
}

impl TweenHost {
    /// Create a host playing `timeline` with `settings`
    pub fn new(timeline: Rc<Timeline>, settings: TweenSettings, scheduler: &PhaseScheduler) -> Self {
        let manager = scheduler
            .manage(timeline, settings.time, settings.looping)
            .with_timescale(settings.timescale);
        Self { manager, settings }
    }

    /// The manager
    pub fn manager(&self) -> &PlaybackManager {
        &self.manager
    }

    /// The settings the host was created with
    pub fn settings(&self) -> &TweenSettings {
        &self.settings
    }

    /// Run an action on the manager
    pub fn run(&self, action: TweenAction) -> Result<(), EffectError> {
        tracing::debug!("Running {:?} on manager {:?}", action, self.manager.id());
        action.run(&self.manager)
    }

    /// Host became active
    pub fn on_activate(&self) -> Result<(), EffectError> {
        match self.settings.on_activate {
            Some(action) => self.run(action),
            None => Ok(()),
        }
    }

    /// Host became inactive
    pub fn on_deactivate(&self) -> Result<(), EffectError> {
        match self.settings.on_deactivate {
            Some(action) => self.run(action),
            None => Ok(()),
        }
    }

    /// Host is being destroyed
    pub fn on_destroy(&self) {
        self.manager.dispose();
    }
}

impl Drop for TweenHost {
    fn drop(&mut self) {
        self.manager.dispose();
    }
}
