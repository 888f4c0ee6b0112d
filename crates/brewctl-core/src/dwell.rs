//! Minimum dwell time enforcement
//!
//! Wraps the [`Hysteresis`] core and gates every transition that
//! would flip the actuator state. Entering the on state requires
//! the minimum off time to be elapsed since the last transition and
//! vice versa. The very first transition is never gated.
//!
//! A rejected transition is reported as [`DwellBlocked`]. This is
//! an expected outcome and not a fault: the actuator state remains
//! unchanged and the transition is supposed to be retried during
//! the next control cycle.
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::{
    config::{ConfigError, HysteresisConfig},
    hysteresis::{Hysteresis, Transition},
    time::Clock,
    Direction, Switching,
};

/// A transition has been deferred, because the actuator did not
/// dwell long enough in its current state.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error(
    "should be switching {transition} now, but can't because of the minimum dwell time of {min_dwell:?} (time since last switch: {elapsed:?})"
)]
pub struct DwellBlocked {
    /// The deferred transition
    pub transition: Transition,

    /// Time since the last transition
    pub elapsed: Duration,

    /// The required minimum dwell time
    pub min_dwell: Duration,
}

impl DwellBlocked {
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Time that still needs to pass until the transition is permitted
    pub fn remaining(&self) -> Duration {
        self.min_dwell.saturating_sub(self.elapsed)
    }
}

/// Hysteresis controller with minimum dwell times
#[derive(Debug, Clone)]
pub struct DwellTime<C> {
    core: Hysteresis,
    min_on: Duration,
    min_off: Duration,
    last_transition: Option<Instant>,
    clock: C,
}

impl<C: Clock> DwellTime<C> {
    pub fn new(core: Hysteresis, min_on: Duration, min_off: Duration, clock: C) -> Self {
        Self {
            core,
            min_on,
            min_off,
            last_transition: None,
            clock,
        }
    }

    pub fn from_config(cfg: &HysteresisConfig, clock: C) -> Result<Self, ConfigError> {
        let cfg = cfg.clone().validate()?;
        Ok(Self::new(
            Hysteresis::from_config(&cfg),
            cfg.min_on(),
            cfg.min_off(),
            clock,
        ))
    }

    pub fn core(&self) -> &Hysteresis {
        &self.core
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn min_on(&self) -> Duration {
        self.min_on
    }

    pub fn min_off(&self) -> Duration {
        self.min_off
    }

    /// Time stamp of the last transition
    ///
    /// `None` until the actuator has been switched for the first time.
    pub fn last_transition(&self) -> Option<Instant> {
        self.last_transition
    }

    /// Try to perform a transition at the given time
    ///
    /// Transitions that would not change the actuator state are
    /// silently ignored.
    pub fn transit_at(&mut self, transition: Transition, now: Instant) -> Result<(), DwellBlocked> {
        if transition.target_state() == self.core.is_on() {
            return Ok(());
        }
        // Entering a state is gated by the minimum dwell time of
        // the state that is left
        let min_dwell = match transition {
            Transition::SwitchOn => self.min_off,
            Transition::SwitchOff => self.min_on,
        };
        if let Some(last_transition) = self.last_transition {
            let elapsed = now.saturating_duration_since(last_transition);
            if elapsed < min_dwell {
                log::debug!(
                    "Deferring switching {} after {:?} (minimum dwell time: {:?})",
                    transition,
                    elapsed,
                    min_dwell
                );
                return Err(DwellBlocked {
                    transition,
                    elapsed,
                    min_dwell,
                });
            }
            log::debug!("Switching {} after {:?}", transition, elapsed);
        } else {
            log::debug!("Switching {} for the first time", transition);
        }
        self.core.apply(transition);
        self.last_transition = Some(now);
        Ok(())
    }

    fn transit(&mut self, transition: Transition) -> Result<(), DwellBlocked> {
        let now = self.clock.now();
        self.transit_at(transition, now)
    }
}

impl<C: Clock> Switching for DwellTime<C> {
    type Error = DwellBlocked;

    fn direction(&self) -> Direction {
        self.core.direction()
    }

    fn is_on(&self) -> bool {
        self.core.is_on()
    }

    fn switch_on(&mut self) -> Result<(), Self::Error> {
        self.transit(Transition::SwitchOn)
    }

    fn switch_off(&mut self) -> Result<(), Self::Error> {
        self.transit(Transition::SwitchOff)
    }

    fn decide(&mut self, current: f64, target: f64) -> Result<bool, Self::Error> {
        if let Some(transition) = self.core.request(current, target) {
            self.transit(transition)?;
        } else {
            log::trace!(
                "Keeping actuator {} at {} (target: {})",
                if self.is_on() { "on" } else { "off" },
                current,
                target
            );
        }
        Ok(self.is_on())
    }
}

#[cfg(test)]
mod tests;
