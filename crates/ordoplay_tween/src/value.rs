// SPDX-License-Identifier: MIT OR Apache-2.0
//! Values driven by tweens.

use crate::effect::EffectError;
use serde::{Deserialize, Serialize};

/// A value a tween can blend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TweenValue {
    /// Float value
    Float(f32),
    /// 2D vector
    Vec2([f32; 2]),
    /// 3D vector
    Vec3([f32; 3]),
    /// 4D vector
    Vec4([f32; 4]),
    /// Color (RGBA)
    Color([f32; 4]),
}

/// Interpolation utilities
pub struct Interpolation;

impl Interpolation {
    /// Linear interpolation between two floats
    ///
    /// `t` is not clamped, so overshooting eases extrapolate.
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }
}

impl TweenValue {
    /// Name of the value kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Float(_) => "Float",
            Self::Vec2(_) => "Vec2",
            Self::Vec3(_) => "Vec3",
            Self::Vec4(_) => "Vec4",
            Self::Color(_) => "Color",
        }
    }

    /// A zero value of the same kind
    pub fn zero_like(&self) -> TweenValue {
        self.map(|_| 0.0)
    }

    /// Interpolate towards `other`
    pub fn lerp(&self, other: &TweenValue, t: f32) -> Result<TweenValue, EffectError> {
        self.zip(other, |a, b| Interpolation::lerp(a, b, t))
    }

    /// Component-wise sum
    pub fn add(&self, other: &TweenValue) -> Result<TweenValue, EffectError> {
        self.zip(other, |a, b| a + b)
    }

    /// Component-wise difference
    pub fn sub(&self, other: &TweenValue) -> Result<TweenValue, EffectError> {
        self.zip(other, |a, b| a - b)
    }

    /// Multiply every component by `factor`
    pub fn scale(&self, factor: f32) -> TweenValue {
        self.map(|v| v * factor)
    }

    /// Get as float if possible
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as Vec2 if possible
    pub fn as_vec2(&self) -> Option<[f32; 2]> {
        match self {
            Self::Vec2(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as Vec3 if possible
    pub fn as_vec3(&self) -> Option<[f32; 3]> {
        match self {
            Self::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as color if possible
    pub fn as_color(&self) -> Option<[f32; 4]> {
        match self {
            Self::Color(v) => Some(*v),
            _ => None,
        }
    }

    fn map(&self, f: impl Fn(f32) -> f32) -> TweenValue {
        match self {
            Self::Float(v) => Self::Float(f(*v)),
            Self::Vec2(v) => Self::Vec2(v.map(&f)),
            Self::Vec3(v) => Self::Vec3(v.map(&f)),
            Self::Vec4(v) => Self::Vec4(v.map(&f)),
            Self::Color(v) => Self::Color(v.map(&f)),
        }
    }

    fn zip(&self, other: &TweenValue, f: impl Fn(f32, f32) -> f32) -> Result<TweenValue, EffectError> {
        fn zip_array<const N: usize>(a: [f32; N], b: [f32; N], f: impl Fn(f32, f32) -> f32) -> [f32; N] {
            std::array::from_fn(|i| f(a[i], b[i]))
        }

        match (self, other) {
            (Self::Float(a), Self::Float(b)) => Ok(Self::Float(f(*a, *b))),
            (Self::Vec2(a), Self::Vec2(b)) => Ok(Self::Vec2(zip_array(*a, *b, f))),
            (Self::Vec3(a), Self::Vec3(b)) => Ok(Self::Vec3(zip_array(*a, *b, f))),
            (Self::Vec4(a), Self::Vec4(b)) => Ok(Self::Vec4(zip_array(*a, *b, f))),
            (Self::Color(a), Self::Color(b)) => Ok(Self::Color(zip_array(*a, *b, f))),
            _ => Err(EffectError::TypeMismatch {
                expected: self.kind(),
                found: other.kind(),
            }),
        }
    }
}

impl From<f32> for TweenValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<[f32; 2]> for TweenValue {
    fn from(value: [f32; 2]) -> Self {
        Self::Vec2(value)
    }
}

impl From<[f32; 3]> for TweenValue {
    fn from(value: [f32; 3]) -> Self {
        Self::Vec3(value)
    }
}
