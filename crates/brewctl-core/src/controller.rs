//! The composed controller
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use brewctl_core::{time::ManualClock, CascadeController, HysteresisConfig};
//!
//! let cfg = HysteresisConfig {
//!     on_offset: 1.0,
//!     off_offset: 1.0,
//!     min_on_seconds: 60.0,
//!     min_off_seconds: 60.0,
//!     safety_offset: Some(2.0),
//!     ..Default::default()
//! };
//! let clock = ManualClock::new();
//! let mut c = CascadeController::new(cfg, clock.clone()).unwrap();
//!
//! assert_eq!(c.evaluate(60.0, 65.0, Some(61.0)), Ok(true));
//!
//! // The coil outlet overheats, but the heater has just been switched on
//! clock.advance(Duration::from_secs(30));
//! assert!(c.evaluate(60.0, 65.0, Some(68.0)).is_err());
//!
//! clock.advance(Duration::from_secs(30));
//! assert_eq!(c.evaluate(60.0, 65.0, Some(68.0)), Ok(false));
//! ```
use std::time::Instant;

use crate::{
    config::{ConfigError, HysteresisConfig},
    dwell::{DwellBlocked, DwellTime},
    safety::SafetyOverride,
    time::{Clock, MonotonicClock},
    Switching,
};

/// Snapshot of the mutable controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerState {
    /// The commanded actuator state
    pub action: bool,

    /// Time stamp of the last actual transition
    pub last_transition: Option<Instant>,
}

/// Hysteresis controller with minimum dwell times and a safety override
///
/// The layers are stacked in a fixed order: the safety override
/// wraps the dwell time gate which wraps the hysteresis core.
///
/// One instance is supposed to be created for each regulation session
/// and driven by a single caller.
#[derive(Debug, Clone)]
pub struct CascadeController<C> {
    cfg: HysteresisConfig,
    layers: SafetyOverride<DwellTime<C>>,
}

impl<C: Clock> CascadeController<C> {
    /// Create a new controller instance with the given configuration.
    pub fn new(cfg: HysteresisConfig, clock: C) -> Result<Self, ConfigError> {
        let cfg = cfg.validate()?;
        let dwell_time = DwellTime::from_config(&cfg, clock)?;
        let layers = SafetyOverride::new(dwell_time, cfg.safety_offset);
        Ok(Self { cfg, layers })
    }

    /// The normalized configuration
    pub fn config(&self) -> &HysteresisConfig {
        &self.cfg
    }

    pub fn is_on(&self) -> bool {
        self.layers.inner().is_on()
    }

    pub fn state(&self) -> ControllerState {
        let dwell_time = self.layers.inner();
        ControllerState {
            action: dwell_time.is_on(),
            last_transition: dwell_time.last_transition(),
        }
    }

    pub fn clock(&self) -> &C {
        self.layers.inner().clock()
    }

    /// Calculate the actuator state for the next control cycle
    ///
    /// `current` is the regulated reading, `control` the optional
    /// reading of the safety sensor.
    ///
    /// A deferred transition is reported as [`DwellBlocked`]. The
    /// actuator should then be kept in its previous state, i.e.
    /// [`CascadeController::is_on()`], until a subsequent invocation
    /// succeeds.
    pub fn evaluate(
        &mut self,
        current: f64,
        target: f64,
        control: Option<f64>,
    ) -> Result<bool, DwellBlocked> {
        self.layers.decide(current, target, control)
    }
}

impl CascadeController<MonotonicClock> {
    pub fn with_monotonic_clock(cfg: HysteresisConfig) -> Result<Self, ConfigError> {
        Self::new(cfg, MonotonicClock)
    }
}
