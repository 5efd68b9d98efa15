// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tween targets and property bindings.

use crate::effect::EffectError;
use crate::value::TweenValue;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// External state a tween writes to
pub trait TweenTarget {
    /// Read the current value
    fn get(&self) -> Result<TweenValue, EffectError>;

    /// Overwrite the value
    fn set(&self, value: TweenValue) -> Result<(), EffectError>;

    /// Add a delta to the current value
    fn add(&self, delta: TweenValue) -> Result<(), EffectError> {
        let current = self.get()?;
        self.set(current.add(&delta)?)
    }
}

/// Shared store of named properties
///
/// Cloning the bag yields another handle to the same storage.
#[derive(Debug, Clone, Default)]
pub struct PropertyBag {
    values: Rc<RefCell<IndexMap<String, TweenValue>>>,
}

impl PropertyBag {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bag holding the given properties
    pub fn with_values(values: impl IntoIterator<Item = (String, TweenValue)>) -> Self {
        Self {
            values: Rc::new(RefCell::new(values.into_iter().collect())),
        }
    }

    /// Insert or overwrite a property
    pub fn insert(&self, path: impl Into<String>, value: impl Into<TweenValue>) {
        self.values.borrow_mut().insert(path.into(), value.into());
    }

    /// Get a property value
    pub fn get(&self, path: &str) -> Option<TweenValue> {
        self.values.borrow().get(path).copied()
    }

    /// Get a float property
    pub fn float(&self, path: &str) -> Option<f32> {
        self.get(path).and_then(|v| v.as_float())
    }

    /// Check whether a property exists
    pub fn contains(&self, path: &str) -> bool {
        self.values.borrow().contains_key(path)
    }

    /// Snapshot of every property, in insertion order
    pub fn snapshot(&self) -> Vec<(String, TweenValue)> {
        self.values
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    /// Bind a property as a tween target
    pub fn bind(&self, path: impl Into<String>) -> PropertyBinding {
        PropertyBinding {
            bag: self.clone(),
            property_path: path.into(),
        }
    }
}

/// Binding of a tween to one property of a [`PropertyBag`]
#[derive(Debug, Clone)]
pub struct PropertyBinding {
    bag: PropertyBag,
    /// Property path within the bag
    property_path: String,
}

impl PropertyBinding {
    /// Property path this binding writes
    pub fn property_path(&self) -> &str {
        &self.property_path
    }
}

impl TweenTarget for PropertyBinding {
    fn get(&self) -> Result<TweenValue, EffectError> {
        self.bag
            .get(&self.property_path)
            .ok_or_else(|| EffectError::PropertyNotFound(self.property_path.clone()))
    }

    fn set(&self, value: TweenValue) -> Result<(), EffectError> {
        let mut values = self.bag.values.borrow_mut();
        let slot = values
            .get_mut(&self.property_path)
            .ok_or_else(|| EffectError::PropertyNotFound(self.property_path.clone()))?;
        if slot.kind() != value.kind() {
            return Err(EffectError::TypeMismatch {
                expected: slot.kind(),
                found: value.kind(),
            });
        }
        *slot = value;
        Ok(())
    }
}
