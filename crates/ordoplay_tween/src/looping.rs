// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loop configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What happens when playback reaches the end boundary and loops remain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LoopMode {
    /// Jump back to the start boundary and keep the direction
    #[default]
    Normal,
    /// Reflect and play in the opposite direction
    PingPong,
}

impl TryFrom<u8> for LoopMode {
    type Error = LoopConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Normal),
            1 => Ok(Self::PingPong),
            other => Err(LoopConfigError::UnknownMode(other)),
        }
    }
}

/// How many times a timeline plays and how it wraps between plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Number of boundary crossings before playback stops; 0 loops forever
    pub iterations: u32,
    /// Wrapping behavior between iterations
    pub mode: LoopMode,
}

impl LoopConfig {
    /// Create a loop configuration
    pub fn new(iterations: u32, mode: LoopMode) -> Self {
        Self { iterations, mode }
    }

    /// Build from a raw mode discriminant, rejecting unknown modes
    pub fn from_raw(iterations: u32, mode: u8) -> Result<Self, LoopConfigError> {
        Ok(Self::new(iterations, LoopMode::try_from(mode)?))
    }

    /// Play once
    pub fn single() -> Self {
        Self::new(1, LoopMode::Normal)
    }

    /// Play forward then back once
    pub fn single_ping_pong() -> Self {
        Self::new(2, LoopMode::PingPong)
    }

    /// Loop forever
    pub fn forever(mode: LoopMode) -> Self {
        Self::new(0, mode)
    }

    /// Play `iterations` times with normal wrapping
    pub fn times(iterations: u32) -> Self {
        Self::new(iterations, LoopMode::Normal)
    }

    /// Check if this configuration never finishes on its own
    pub fn is_infinite(&self) -> bool {
        self.iterations == 0
    }

    /// Check if `iterations_done` crossings complete playback
    pub fn is_finished(&self, iterations_done: u32) -> bool {
        !self.is_infinite() && iterations_done >= self.iterations
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::single()
    }
}

impl fmt::Display for LoopConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            write!(f, "Loop({:?} x forever)", self.mode)
        } else {
            write!(f, "Loop({:?} x {})", self.mode, self.iterations)
        }
    }
}

/// Error raised for an invalid loop configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoopConfigError {
    /// Mode discriminant does not name a known mode
    #[error("Unknown loop mode: {0}")]
    UnknownMode(u8),
}
