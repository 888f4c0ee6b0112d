// FIXME: Enable all warnings before the release
//#![deny(missing_docs)]
#![allow(clippy::must_use_candidate)]

mod measure;

pub use self::measure::*;

pub mod config;
pub mod controller;
pub mod dwell;
pub mod hysteresis;
pub mod regulation;
pub mod safety;
pub mod sensor;
pub mod sync;
pub mod time;
pub mod util;

pub use self::{
    config::{ConfigError, Direction, HysteresisConfig},
    controller::{CascadeController, ControllerState},
    dwell::{DwellBlocked, DwellTime},
    hysteresis::{Hysteresis, Transition},
    safety::SafetyOverride,
};

/// A switching controller layer
///
/// Every layer of the decision engine implements this trait: the bare
/// [`Hysteresis`] core at the bottom, the [`DwellTime`] gate around it,
/// and the [`SafetyOverride`] on top. A layer issues its transitions
/// through the layer beneath it.
pub trait Switching {
    /// Rejection of a requested transition
    type Error;

    /// The direction in which the actuator drives the temperature.
    fn direction(&self) -> Direction;

    /// The currently commanded actuator state.
    fn is_on(&self) -> bool;

    /// Request the actuator to be switched on.
    fn switch_on(&mut self) -> Result<(), Self::Error>;

    /// Request the actuator to be switched off.
    fn switch_off(&mut self) -> Result<(), Self::Error>;

    /// Decide the actuator state for the given temperatures.
    ///
    /// Returns the commanded state after applying the decision.
    fn decide(&mut self, current: f64, target: f64) -> Result<bool, Self::Error>;
}
