// SPDX-License-Identifier: MIT OR Apache-2.0
//! Serialized tween settings and timeline descriptions.
//!
//! Both are stored as RON. A [`TimelineDescription`] is resolved once at load
//! time into an immutable [`Timeline`] against a set of [`TimelineBindings`].

use crate::ease::Ease;
use crate::effect::{
    Callback, CallbackEvent, EffectError, InvokeOn, NestedTimeline, RelativeTween, TimelineEffect,
    Tween,
};
use crate::host::TweenAction;
use crate::looping::LoopConfig;
use crate::scheduler::TweenTime;
use crate::target::PropertyBag;
use crate::timeline::{Placement, Timeline, TimelineBuilder, TimelineError};
use crate::value::TweenValue;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::rc::Rc;

fn pretty() -> ron::ser::PrettyConfig {
    ron::ser::PrettyConfig::default()
        .struct_names(true)
        .enumerate_arrays(false)
}

/// How a timeline is played by its host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TweenSettings {
    /// Domain and time kind
    pub time: TweenTime,
    /// Loop configuration
    pub looping: LoopConfig,
    /// Playback speed multiplier
    pub timescale: f32,
    /// Action run when the host becomes active
    pub on_activate: Option<TweenAction>,
    /// Action run when the host becomes inactive
    pub on_deactivate: Option<TweenAction>,
}

impl Default for TweenSettings {
    fn default() -> Self {
        Self {
            time: TweenTime::default(),
            looping: LoopConfig::single(),
            timescale: 1.0,
            on_activate: Some(TweenAction::PlayForwards),
            on_deactivate: Some(TweenAction::Stop),
        }
    }
}

impl TweenSettings {
    /// Parse settings from RON
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(source)?)
    }

    /// Serialize settings to RON
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, pretty())?)
    }
}

/// Serialized form of one timeline effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EffectDescription {
    /// Absolute tween of a property
    Tween {
        /// Property path in the bound bag
        property: String,
        /// Start value
        from: TweenValue,
        /// End value
        to: TweenValue,
        /// Easing curve
        #[serde(default)]
        ease: Ease,
        /// Duration in seconds
        duration: f32,
    },
    /// Relative tween of a property
    TweenBy {
        /// Property path in the bound bag
        property: String,
        /// Total delta
        by: TweenValue,
        /// Easing curve
        #[serde(default)]
        ease: Ease,
        /// Duration in seconds
        duration: f32,
    },
    /// Named event routed to the bound handler
    Event {
        /// Event name
        name: String,
        /// Directions the event fires in
        #[serde(default)]
        invoke_on: InvokeOn,
    },
    /// Nested timeline
    Timeline(TimelineDescription),
}

/// One placed element of a timeline description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDescription {
    /// Display title, also used as the effect label
    #[serde(default)]
    pub title: String,
    /// Placement relative to the previous element
    #[serde(default)]
    pub placement: Placement,
    /// The effect
    pub effect: EffectDescription,
}

/// Serialized timeline
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimelineDescription {
    /// Elements in insertion order
    pub elements: Vec<ElementDescription>,
}

/// What a description's names resolve to
#[derive(Clone, Default)]
pub struct TimelineBindings {
    /// Properties tweens write to
    pub properties: PropertyBag,
    /// Handler for event effects
    pub events: Option<Rc<dyn Fn(&str, CallbackEvent)>>,
}

impl TimelineBindings {
    /// Bindings over a property bag, without an event handler
    pub fn new(properties: PropertyBag) -> Self {
        Self {
            properties,
            events: None,
        }
    }

    /// Route event effects to `handler`
    pub fn with_events(mut self, handler: impl Fn(&str, CallbackEvent) + 'static) -> Self {
        self.events = Some(Rc::new(handler));
        self
    }

    fn check_property(&self, property: &str, values: &[&TweenValue]) -> Result<(), ConfigError> {
        let current = self
            .properties
            .get(property)
            .ok_or_else(|| ConfigError::UnknownProperty(property.to_string()))?;
        for value in values {
            if value.kind() != current.kind() {
                return Err(EffectError::TypeMismatch {
                    expected: current.kind(),
                    found: value.kind(),
                }
                .into());
            }
        }
        Ok(())
    }
}

impl TimelineDescription {
    /// Parse a description from RON
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(source)?)
    }

    /// Load a description from a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Serialize the description to RON
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, pretty())?)
    }

    /// Resolve the description into a timeline
    pub fn build(&self, bindings: &TimelineBindings) -> Result<Timeline, ConfigError> {
        let mut builder = TimelineBuilder::new();
        for element in &self.elements {
            let effect = element.effect.build(&element.title, bindings)?;
            builder = builder.insert_boxed(element.placement, effect);
        }
        Ok(builder.build()?)
    }
}

impl EffectDescription {
    fn build(&self, title: &str, bindings: &TimelineBindings) -> Result<Box<dyn TimelineEffect>, ConfigError> {
        let label = |fallback: &str| -> String {
            let label = if title.is_empty() { fallback } else { title };
            label.to_string()
        };

        let effect: Box<dyn TimelineEffect> = match self {
            Self::Tween {
                property,
                from,
                to,
                ease,
                duration,
            } => {
                bindings.check_property(property, &[from, to])?;
                Box::new(
                    Tween::new(bindings.properties.bind(property), *from, *to, *ease, *duration)
                        .with_label(label(property.as_str())),
                )
            }
            Self::TweenBy {
                property,
                by,
                ease,
                duration,
            } => {
                bindings.check_property(property, &[by])?;
                Box::new(
                    RelativeTween::new(bindings.properties.bind(property), *by, *ease, *duration)
                        .with_label(label(property.as_str())),
                )
            }
            Self::Event { name, invoke_on } => {
                let handler = bindings.events.clone();
                let event_name = name.clone();
                Box::new(
                    Callback::new(*invoke_on, move |event| match &handler {
                        Some(handler) => handler(&event_name, event),
                        None => tracing::trace!("Event '{}' has no handler", event_name),
                    })
                    .with_label(label(name.as_str())),
                )
            }
            Self::Timeline(description) => {
                let nested = description.build(bindings)?;
                Box::new(NestedTimeline::new(Rc::new(nested)).with_label(label("timeline")))
            }
        };
        Ok(effect)
    }
}

/// Error raised while loading or resolving configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// RON could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON could not be written
    #[error("Serialize error: {0}")]
    Serialize(#[from] ron::Error),

    /// A tween names a property missing from the bindings
    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    /// A tween value does not fit its property
    #[error(transparent)]
    Effect(#[from] EffectError),

    /// The resolved layout is invalid
    #[error(transparent)]
    Timeline(#[from] TimelineError),
}
