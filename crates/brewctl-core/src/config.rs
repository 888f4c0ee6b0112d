//! Controller configuration
use std::{fmt, time::Duration};

use thiserror::Error;

use crate::util::magnitude;

/// The way an actuator affects the controlled temperature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    /// The actuator heats
    Rising,

    /// The actuator cools
    Falling,
}

impl Direction {
    pub const fn from_rising(rising: bool) -> Self {
        if rising {
            Self::Rising
        } else {
            Self::Falling
        }
    }

    pub const fn is_rising(self) -> bool {
        matches!(self, Self::Rising)
    }
}

impl Default for Direction {
    fn default() -> Self {
        Self::Rising
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rising => f.write_str("rising"),
            Self::Falling => f.write_str("falling"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{parameter} must be a finite number (got {value})")]
    NotFinite { parameter: &'static str, value: f64 },

    #[error("{parameter} of {value}s is out of range")]
    DurationOutOfRange { parameter: &'static str, value: f64 },

    #[error("{parameter} must be greater than zero")]
    NotPositive { parameter: &'static str },
}

/// Hysteresis controller configuration
///
/// Immutable for the lifetime of a controller instance. All offsets
/// are distances from the target temperature in °, all dwell times
/// are given in seconds. Negative values are accepted and normalized
/// to their magnitude, see [`HysteresisConfig::validate()`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(default))]
pub struct HysteresisConfig {
    pub direction: Direction,

    /// Distance behind the target at which the actuator is switched on
    pub on_offset: f64,

    /// Distance beyond the target at which the actuator is switched off
    pub off_offset: f64,

    /// Minimum time the actuator stays on before it can be switched off
    pub min_on_seconds: f64,

    /// Minimum time the actuator stays off before it can be switched on again
    pub min_off_seconds: f64,

    /// Distance beyond the target at which a secondary sensor forces
    /// the actuator off
    ///
    /// `None` disables the override.
    pub safety_offset: Option<f64>,
}

impl Default for HysteresisConfig {
    fn default() -> Self {
        HysteresisConfig {
            direction: Direction::Rising,
            on_offset: 0.0,
            off_offset: 1.0,
            min_on_seconds: 60.0,
            min_off_seconds: 60.0,
            safety_offset: None,
        }
    }
}

pub(crate) fn finite(parameter: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() {
        Ok(magnitude(value))
    } else {
        Err(ConfigError::NotFinite { parameter, value })
    }
}

pub(crate) fn seconds(parameter: &'static str, value: f64) -> Result<f64, ConfigError> {
    let value = finite(parameter, value)?;
    Duration::try_from_secs_f64(value)
        .map(|_| value)
        .map_err(|_| ConfigError::DurationOutOfRange { parameter, value })
}

impl HysteresisConfig {
    /// Normalize and check all parameters
    ///
    /// Negative values are replaced by their magnitude. Values that are
    /// not finite are rejected.
    pub fn validate(self) -> Result<Self, ConfigError> {
        let Self {
            direction,
            on_offset,
            off_offset,
            min_on_seconds,
            min_off_seconds,
            safety_offset,
        } = self;
        Ok(Self {
            direction,
            on_offset: finite("on_offset", on_offset)?,
            off_offset: finite("off_offset", off_offset)?,
            min_on_seconds: seconds("min_on_seconds", min_on_seconds)?,
            min_off_seconds: seconds("min_off_seconds", min_off_seconds)?,
            safety_offset: safety_offset
                .map(|offset| finite("safety_offset", offset))
                .transpose()?,
        })
    }

    /// Minimum dwell time in the on state
    ///
    /// Only valid after [`HysteresisConfig::validate()`].
    pub fn min_on(&self) -> Duration {
        Duration::from_secs_f64(self.min_on_seconds)
    }

    /// Minimum dwell time in the off state
    ///
    /// Only valid after [`HysteresisConfig::validate()`].
    pub fn min_off(&self) -> Duration {
        Duration::from_secs_f64(self.min_off_seconds)
    }
}
