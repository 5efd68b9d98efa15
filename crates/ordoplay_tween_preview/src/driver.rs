// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless frame loop feeding the phase scheduler.
//!
//! Each frame runs the fixed steps owed by the accumulator, then the frame
//! update, then the late update.

use ordoplay_tween::{EffectError, FrameTime, PhaseScheduler, TimingDomain};

/// Limit on fixed steps per frame to prevent a spiral of death
const MAX_FIXED_STEPS: u32 = 8;

/// Drives a [`PhaseScheduler`] the way an engine main loop would
pub struct FrameDriver {
    /// Time scale applied to scaled domains (1.0 = normal speed)
    time_scale: f32,
    /// Fixed update interval in seconds
    fixed_timestep: f32,
    /// Scaled time not yet consumed by fixed steps
    accumulated_time: f32,
    /// Frames stepped so far
    pub frame_count: u64,
    /// Scaled time elapsed so far
    pub elapsed_time: f32,
}

impl FrameDriver {
    /// Create a driver with the given fixed update interval
    pub fn new(fixed_timestep: f32) -> Self {
        Self {
            time_scale: 1.0,
            fixed_timestep,
            accumulated_time: 0.0,
            frame_count: 0,
            elapsed_time: 0.0,
        }
    }

    /// Set time scale (clamped to a reasonable range)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.clamp(0.0, 10.0);
    }

    /// Run one frame of `delta_time` real seconds
    ///
    /// Returns the number of fixed steps that ran.
    pub fn step(&mut self, scheduler: &PhaseScheduler, delta_time: f32) -> Result<u32, EffectError> {
        let scaled_delta = delta_time * self.time_scale;
        self.elapsed_time += scaled_delta;
        self.accumulated_time += scaled_delta;
        self.frame_count += 1;

        let mut steps = 0;
        while self.fixed_timestep > 0.0 && self.accumulated_time >= self.fixed_timestep {
            self.accumulated_time -= self.fixed_timestep;
            steps += 1;
            scheduler.tick(TimingDomain::FixedUpdate, FrameTime::uniform(self.fixed_timestep))?;

            if steps >= MAX_FIXED_STEPS {
                self.accumulated_time = 0.0;
                break;
            }
        }

        let frame = FrameTime {
            delta: scaled_delta,
            unscaled_delta: delta_time,
        };
        scheduler.tick(TimingDomain::Update, frame)?;
        scheduler.tick(TimingDomain::LateUpdate, frame)?;
        tracing::trace!("Frame {} ran {} fixed steps", self.frame_count, steps);
        Ok(steps)
    }
}
