// SPDX-License-Identifier: MIT OR Apache-2.0
//! `OrdoPlay` Tween Preview - headless timeline player
//!
//! Loads a RON preview script describing:
//! - Tween settings (domain, looping, activation actions)
//! - A timeline description
//! - Initial property values
//! - Frame rate and frame count
//!
//! then runs the frames through a phase scheduler and logs every property
//! after each frame.
//!
//! Usage: `ordoplay_tween_preview <script.ron>`

mod driver;

use driver::FrameDriver;
use indexmap::IndexMap;
use ordoplay_tween::{
    ConfigError, EffectError, PhaseScheduler, PropertyBag, TimelineBindings, TimelineDescription,
    TweenHost, TweenSettings, TweenValue,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn default_frame_rate() -> f32 {
    60.0
}

fn default_time_scale() -> f32 {
    1.0
}

/// A preview run
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PreviewScript {
    /// How the timeline is played
    #[serde(default)]
    settings: TweenSettings,
    /// What is played
    timeline: TimelineDescription,
    /// Initial property values
    properties: IndexMap<String, TweenValue>,
    /// Simulated frames per second
    #[serde(default = "default_frame_rate")]
    frame_rate: f32,
    /// Number of frames to run
    frames: u32,
    /// Engine time scale
    #[serde(default = "default_time_scale")]
    time_scale: f32,
}

impl PreviewScript {
    fn load(path: &Path) -> Result<Self, PreviewError> {
        let content = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&content)?)
    }
}

fn run(path: &Path) -> Result<(), PreviewError> {
    let script = PreviewScript::load(path)?;
    if script.frame_rate.is_nan() || script.frame_rate <= 0.0 {
        return Err(PreviewError::FrameRate(script.frame_rate));
    }

    let properties = PropertyBag::with_values(script.properties);
    let bindings = TimelineBindings::new(properties.clone())
        .with_events(|name, event| tracing::info!("Event '{}' ({:?})", name, event.direction));
    let timeline = Rc::new(script.timeline.build(&bindings)?);
    tracing::info!(
        "Loaded {}: {} effects over {}s, {}",
        path.display(),
        timeline.effects().len(),
        timeline.duration(),
        script.settings.looping
    );

    let scheduler = PhaseScheduler::new();
    let host = TweenHost::new(timeline, script.settings, &scheduler);
    host.manager().on_start(|event| tracing::info!("Started {:?} (iteration {})", event.direction, event.iteration));
    host.manager().on_end(|event| tracing::info!("Ended {:?} (iteration {})", event.direction, event.iteration));

    let mut driver = FrameDriver::new(1.0 / 50.0);
    driver.set_time_scale(script.time_scale);
    host.on_activate()?;

    let delta = 1.0 / script.frame_rate;
    for _ in 0..script.frames {
        driver.step(&scheduler, delta)?;
        let values: Vec<String> = properties
            .snapshot()
            .into_iter()
            .map(|(name, value)| format!("{name}={value:?}"))
            .collect();
        tracing::info!(
            "Frame {:>4} t={:.3} clock={:.3} {:?}: {}",
            driver.frame_count,
            driver.elapsed_time,
            host.manager().clock(),
            host.manager().state(),
            values.join(" ")
        );
    }

    host.on_deactivate()?;
    Ok(())
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ordoplay_tween_preview=info,ordoplay_tween=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting OrdoPlay Tween Preview v{}", env!("CARGO_PKG_VERSION"));

    let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        tracing::error!("Usage: ordoplay_tween_preview <script.ron>");
        std::process::exit(2);
    };

    if let Err(e) = run(&path) {
        tracing::error!("Preview failed: {e}");
        std::process::exit(1);
    }
}

/// Error raised by a preview run
#[derive(Debug, thiserror::Error)]
enum PreviewError {
    /// Script could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Script could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Timeline description could not be resolved
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// An effect failed during playback
    #[error("Effect error: {0}")]
    Effect(#[from] EffectError),

    /// Frame rate is not positive
    #[error("Invalid frame rate: {0}")]
    FrameRate(f32),
}
