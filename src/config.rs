//! Session configuration parsed from environment variables.

use std::env::VarError;
use std::str::FromStr;

use canvas::camera::Size;
use canvas::consts::{FOCUS_ZOOM, HISTORY_CAPACITY};
use canvas::engine::EngineConfig;

pub const DEFAULT_VIEWPORT_WIDTH: f64 = 1280.0;
pub const DEFAULT_VIEWPORT_HEIGHT: f64 = 800.0;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },
    #[error("{var} is not valid unicode")]
    NotUnicode { var: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Comparison viewport in CSS pixels.
    pub viewport: Size,
    pub history_capacity: usize,
    pub focus_zoom: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            viewport: Size::new(DEFAULT_VIEWPORT_WIDTH, DEFAULT_VIEWPORT_HEIGHT),
            history_capacity: HISTORY_CAPACITY,
            focus_zoom: FOCUS_ZOOM,
        }
    }
}

impl SessionConfig {
    /// Build session config from environment variables.
    ///
    /// Optional:
    /// - `VISUALQA_VIEWPORT_WIDTH`: default 1280
    /// - `VISUALQA_VIEWPORT_HEIGHT`: default 800
    /// - `VISUALQA_HISTORY_CAPACITY`: default 20
    /// - `VISUALQA_FOCUS_ZOOM`: default 1.5
    ///
    /// Set-but-unparsable values are errors rather than silently defaulted.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let width = env_parse("VISUALQA_VIEWPORT_WIDTH", defaults.viewport.width)?;
        let height = env_parse("VISUALQA_VIEWPORT_HEIGHT", defaults.viewport.height)?;
        let history_capacity = env_parse("VISUALQA_HISTORY_CAPACITY", defaults.history_capacity)?;
        let focus_zoom = env_parse("VISUALQA_FOCUS_ZOOM", defaults.focus_zoom)?;

        if !(width > 0.0 && height > 0.0) {
            return Err(ConfigError::Invalid { var: "VISUALQA_VIEWPORT_WIDTH", value: format!("{width}x{height}") });
        }
        if !(focus_zoom.is_finite() && focus_zoom > 0.0) {
            return Err(ConfigError::Invalid { var: "VISUALQA_FOCUS_ZOOM", value: focus_zoom.to_string() });
        }

        Ok(Self { viewport: Size::new(width, height), history_capacity, focus_zoom })
    }

    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig { history_capacity: self.history_capacity, focus_zoom: self.focus_zoom, ..EngineConfig::default() }
    }
}

fn env_parse<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode { var }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
