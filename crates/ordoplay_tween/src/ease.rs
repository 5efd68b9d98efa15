// SPDX-License-Identifier: MIT OR Apache-2.0
//! Easing curves for tweens.
//!
//! Every curve maps normalized progress `p` in `[0, 1]` to eased progress.
//! All curves satisfy `apply(0) == 0` and `apply(1) == 1`; some (back,
//! elastic) overshoot in between.

use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};

/// Easing curve applied to a tween's normalized progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Ease {
    /// No easing
    #[default]
    Linear,
    /// Quadratic ease in
    QuadIn,
    /// Quadratic ease out
    QuadOut,
    /// Quadratic ease in/out
    QuadInOut,
    /// Cubic ease in
    CubicIn,
    /// Cubic ease out
    CubicOut,
    /// Cubic ease in/out
    CubicInOut,
    /// Quartic ease in
    QuartIn,
    /// Quartic ease out
    QuartOut,
    /// Quartic ease in/out
    QuartInOut,
    /// Quintic ease in
    QuintIn,
    /// Quintic ease out
    QuintOut,
    /// Quintic ease in/out
    QuintInOut,
    /// Sine ease in
    SineIn,
    /// Sine ease out
    SineOut,
    /// Sine ease in/out
    SineInOut,
    /// Circular ease in
    CircularIn,
    /// Circular ease out
    CircularOut,
    /// Circular ease in/out
    CircularInOut,
    /// Exponential ease in
    ExpoIn,
    /// Exponential ease out
    ExpoOut,
    /// Exponential ease in/out
    ExpoInOut,
    /// Elastic ease in
    ElasticIn,
    /// Elastic ease out
    ElasticOut,
    /// Elastic ease in/out
    ElasticInOut,
    /// Back (overshoot) ease in
    BackIn,
    /// Back (overshoot) ease out
    BackOut,
    /// Back (overshoot) ease in/out
    BackInOut,
    /// Bounce ease in
    BounceIn,
    /// Bounce ease out
    BounceOut,
    /// Bounce ease in/out
    BounceInOut,
}

impl Ease {
    /// Evaluate the curve at normalized progress `p`
    ///
    /// `p` is clamped into `[0, 1]` first.
    pub fn apply(self, p: f32) -> f32 {
        let p = p.clamp(0.0, 1.0);
        match self {
            Self::Linear => p,
            Self::QuadIn => p * p,
            Self::QuadOut => p * (2.0 - p),
            Self::QuadInOut => {
                if p < 0.5 {
                    2.0 * p * p
                } else {
                    -1.0 + (4.0 - 2.0 * p) * p
                }
            }
            Self::CubicIn => p * p * p,
            Self::CubicOut => {
                let f = p - 1.0;
                f * f * f + 1.0
            }
            Self::CubicInOut => {
                if p < 0.5 {
                    4.0 * p * p * p
                } else {
                    let f = 2.0 * p - 2.0;
                    (p - 1.0) * f * f + 1.0
                }
            }
            Self::QuartIn => p.powi(4),
            Self::QuartOut => 1.0 - (p - 1.0).powi(4),
            Self::QuartInOut => {
                if p < 0.5 {
                    8.0 * p.powi(4)
                } else {
                    1.0 - 8.0 * (p - 1.0).powi(4)
                }
            }
            Self::QuintIn => p.powi(5),
            Self::QuintOut => 1.0 + (p - 1.0).powi(5),
            Self::QuintInOut => {
                if p < 0.5 {
                    16.0 * p.powi(5)
                } else {
                    1.0 + 16.0 * (p - 1.0).powi(5)
                }
            }
            Self::SineIn => ((p - 1.0) * FRAC_PI_2).sin() + 1.0,
            Self::SineOut => (p * FRAC_PI_2).sin(),
            Self::SineInOut => 0.5 * (1.0 - (p * PI).cos()),
            Self::CircularIn => 1.0 - (1.0 - p * p).sqrt(),
            Self::CircularOut => ((2.0 - p) * p).sqrt(),
            Self::CircularInOut => {
                if p < 0.5 {
                    0.5 * (1.0 - (1.0 - 4.0 * p * p).sqrt())
                } else {
                    0.5 * ((-(2.0 * p - 3.0) * (2.0 * p - 1.0)).sqrt() + 1.0)
                }
            }
            Self::ExpoIn => {
                if p == 0.0 {
                    0.0
                } else {
                    2f32.powf(10.0 * (p - 1.0))
                }
            }
            Self::ExpoOut => {
                if p == 1.0 {
                    1.0
                } else {
                    1.0 - 2f32.powf(-10.0 * p)
                }
            }
            Self::ExpoInOut => {
                if p == 0.0 || p == 1.0 {
                    p
                } else if p < 0.5 {
                    0.5 * 2f32.powf(20.0 * p - 10.0)
                } else {
                    -0.5 * 2f32.powf(-20.0 * p + 10.0) + 1.0
                }
            }
            Self::ElasticIn => elastic_in(p),
            Self::ElasticOut => elastic_out(p),
            Self::ElasticInOut => {
                if p < 0.5 {
                    0.5 * elastic_in(2.0 * p)
                } else {
                    0.5 * elastic_out(2.0 * p - 1.0) + 0.5
                }
            }
            Self::BackIn => back_in(p),
            Self::BackOut => 1.0 - back_in(1.0 - p),
            Self::BackInOut => {
                if p < 0.5 {
                    0.5 * back_in(2.0 * p)
                } else {
                    0.5 * (1.0 - back_in(2.0 - 2.0 * p)) + 0.5
                }
            }
            Self::BounceIn => 1.0 - bounce_out(1.0 - p),
            Self::BounceOut => bounce_out(p),
            Self::BounceInOut => {
                if p < 0.5 {
                    0.5 * (1.0 - bounce_out(1.0 - 2.0 * p))
                } else {
                    0.5 * bounce_out(2.0 * p - 1.0) + 0.5
                }
            }
        }
    }

    /// Every curve in the catalog
    pub fn all() -> &'static [Ease] {
        &[
            Self::Linear,
            Self::QuadIn,
            Self::QuadOut,
            Self::QuadInOut,
            Self::CubicIn,
            Self::CubicOut,
            Self::CubicInOut,
            Self::QuartIn,
            Self::QuartOut,
            Self::QuartInOut,
            Self::QuintIn,
            Self::QuintOut,
            Self::QuintInOut,
            Self::SineIn,
            Self::SineOut,
            Self::SineInOut,
            Self::CircularIn,
            Self::CircularOut,
            Self::CircularInOut,
            Self::ExpoIn,
            Self::ExpoOut,
            Self::ExpoInOut,
            Self::ElasticIn,
            Self::ElasticOut,
            Self::ElasticInOut,
            Self::BackIn,
            Self::BackOut,
            Self::BackInOut,
            Self::BounceIn,
            Self::BounceOut,
            Self::BounceInOut,
        ]
    }
}

// The elastic curves are pinned at both ends; the closed forms miss 0 and 1
// by a few ulps.
fn elastic_in(p: f32) -> f32 {
    if p == 0.0 || p == 1.0 {
        return p;
    }
    (13.0 * FRAC_PI_2 * p).sin() * 2f32.powf(10.0 * (p - 1.0))
}

fn elastic_out(p: f32) -> f32 {
    if p == 0.0 || p == 1.0 {
        return p;
    }
    (-13.0 * FRAC_PI_2 * (p + 1.0)).sin() * 2f32.powf(-10.0 * p) + 1.0
}

fn back_in(p: f32) -> f32 {
    p * p * p - p * (p * PI).sin()
}

fn bounce_out(p: f32) -> f32 {
    if p < 4.0 / 11.0 {
        (121.0 * p * p) / 16.0
    } else if p < 8.0 / 11.0 {
        (363.0 / 40.0 * p * p) - (99.0 / 10.0 * p) + 17.0 / 5.0
    } else if p < 9.0 / 10.0 {
        (4356.0 / 361.0 * p * p) - (35442.0 / 1805.0 * p) + 16061.0 / 1805.0
    } else {
        (54.0 / 5.0 * p * p) - (513.0 / 25.0 * p) + 268.0 / 25.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_are_fixed() {
        for ease in Ease::all() {
            assert!(ease.apply(0.0).abs() < 1e-4, "{ease:?} at 0");
            assert!((ease.apply(1.0) - 1.0).abs() < 1e-4, "{ease:?} at 1");
        }
    }

    #[test]
    fn test_input_is_clamped() {
        assert_eq!(Ease::QuadIn.apply(-2.0), 0.0);
        assert_eq!(Ease::QuadIn.apply(3.0), 1.0);
    }

    #[test]
    fn test_in_out_midpoint() {
        assert!((Ease::QuadInOut.apply(0.5) - 0.5).abs() < 1e-5);
        assert!((Ease::CubicInOut.apply(0.5) - 0.5).abs() < 1e-5);
        assert!((Ease::SineInOut.apply(0.5) - 0.5).abs() < 1e-5);
    }
}
