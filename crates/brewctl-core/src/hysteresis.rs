//! Two-threshold on/off controller
//!
//! # Example
//! ```rust
//! use brewctl_core::{Direction, Hysteresis, Switching, hysteresis::Thresholds};
//!
//! // Heating towards 55°, switch off above 56° and on again below 54°
//! let mut h = Hysteresis::new(Thresholds::new(Direction::Rising, 1.0, 1.0));
//!
//! assert_eq!(h.decide(53.99, 55.0), Ok(true));
//! assert_eq!(h.decide(55.5, 55.0), Ok(true)); // inside the band
//! assert_eq!(h.decide(56.01, 55.0), Ok(false));
//! assert_eq!(h.decide(54.5, 55.0), Ok(false)); // inside the band
//! ```

use std::{convert::Infallible, fmt};

use crate::{config::HysteresisConfig, util::round_temperature, Direction, Switching};

/// A requested change of the actuator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    SwitchOn,
    SwitchOff,
}

impl Transition {
    /// The actuator state after the transition
    pub const fn target_state(self) -> bool {
        matches!(self, Self::SwitchOn)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SwitchOn => f.write_str("on"),
            Self::SwitchOff => f.write_str("off"),
        }
    }
}

/// Switching thresholds relative to the target
///
/// The offsets are independent from each other. An asymmetric band
/// is permitted and never corrected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub direction: Direction,
    pub on_offset: f64,
    pub off_offset: f64,
}

impl Thresholds {
    pub fn new(direction: Direction, on_offset: f64, off_offset: f64) -> Self {
        Self {
            direction,
            on_offset: on_offset.abs(),
            off_offset: off_offset.abs(),
        }
    }

    /// Compare the current against the target temperature
    ///
    /// Both temperatures and the resulting thresholds are rounded to
    /// 2 decimal places. A reading that lies exactly on a threshold
    /// doesn't request a transition. Returns `None` while the reading
    /// is inside the hysteresis band.
    pub fn request(&self, current: f64, target: f64) -> Option<Transition> {
        let current = round_temperature(current);
        let target = round_temperature(target);
        let upper_off = round_temperature(target + self.off_offset);
        let lower_off = round_temperature(target - self.off_offset);
        let upper_on = round_temperature(target + self.on_offset);
        let lower_on = round_temperature(target - self.on_offset);
        match self.direction {
            Direction::Rising => {
                if current > upper_off {
                    Some(Transition::SwitchOff)
                } else if current < lower_on {
                    Some(Transition::SwitchOn)
                } else {
                    None
                }
            }
            Direction::Falling => {
                if current < lower_off {
                    Some(Transition::SwitchOff)
                } else if current > upper_on {
                    Some(Transition::SwitchOn)
                } else {
                    None
                }
            }
        }
    }
}

impl From<&HysteresisConfig> for Thresholds {
    fn from(from: &HysteresisConfig) -> Self {
        Self::new(from.direction, from.on_offset, from.off_offset)
    }
}

/// The bare hysteresis controller
///
/// Applies every requested transition immediately.
#[derive(Debug, Clone)]
pub struct Hysteresis {
    thresholds: Thresholds,
    action: bool,
}

impl Hysteresis {
    /// Create a new controller instance that starts switched off.
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            action: false,
        }
    }

    pub fn from_config(cfg: &HysteresisConfig) -> Self {
        Self::new(cfg.into())
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// The transition that the given temperatures ask for, if any.
    ///
    /// Requests that match the current state are filtered out.
    pub fn request(&self, current: f64, target: f64) -> Option<Transition> {
        self.thresholds
            .request(current, target)
            .filter(|transition| transition.target_state() != self.action)
    }

    /// Apply a transition unconditionally
    ///
    /// Returns `true` if the actuator state has changed.
    pub fn apply(&mut self, transition: Transition) -> bool {
        let action = transition.target_state();
        let changed = self.action != action;
        self.action = action;
        changed
    }
}

impl Switching for Hysteresis {
    type Error = Infallible;

    fn direction(&self) -> Direction {
        self.thresholds.direction
    }

    fn is_on(&self) -> bool {
        self.action
    }

    fn switch_on(&mut self) -> Result<(), Self::Error> {
        self.apply(Transition::SwitchOn);
        Ok(())
    }

    fn switch_off(&mut self) -> Result<(), Self::Error> {
        self.apply(Transition::SwitchOff);
        Ok(())
    }

    fn decide(&mut self, current: f64, target: f64) -> Result<bool, Self::Error> {
        if let Some(transition) = self.request(current, target) {
            self.apply(transition);
        }
        Ok(self.action)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn rising(on_offset: f64, off_offset: f64) -> Hysteresis {
        Hysteresis::new(Thresholds::new(Direction::Rising, on_offset, off_offset))
    }

    fn falling(on_offset: f64, off_offset: f64) -> Hysteresis {
        Hysteresis::new(Thresholds::new(Direction::Falling, on_offset, off_offset))
    }

    fn decide(h: &mut Hysteresis, current: f64, target: f64) -> bool {
        match h.decide(current, target) {
            Ok(on) => on,
            Err(never) => match never {},
        }
    }

    #[test]
    fn starts_switched_off() {
        let h = rising(1.0, 1.0);
        assert!(!h.is_on());
        assert_eq!(h.direction(), Direction::Rising);
    }

    #[test]
    fn band_holds_the_previous_state() {
        let mut h = rising(1.0, 1.0);
        let states = vec![
            (55.0, false),
            (54.0, false),
            (53.99, true),
            (54.0, true),
            (55.0, true),
            (56.0, true),
            (56.01, false),
            (56.0, false),
            (55.0, false),
            (54.0, false),
            (53.99, true),
        ];
        for (input, output) in states {
            assert_eq!(decide(&mut h, input, 55.0), output, "current = {input}");
        }
    }

    #[test]
    fn falling_mirrors_rising() {
        let readings = [
            60.0, 58.0, 56.5, 56.01, 56.0, 55.5, 55.0, 54.0, 53.99, 53.0, 54.5, 57.0, 57.01,
        ];
        for (on_offset, off_offset) in [(1.0, 1.0), (0.5, 2.0), (0.0, 0.0)] {
            let mut r = rising(on_offset, off_offset);
            let mut f = falling(on_offset, off_offset);
            for current in readings {
                assert_eq!(
                    decide(&mut f, current, 55.0),
                    decide(&mut r, -current, -55.0),
                    "current = {current}, offsets = ({on_offset}, {off_offset})"
                );
            }
        }
    }

    #[test]
    fn falling_switches_on_above_target() {
        let mut h = falling(1.0, 0.5);
        assert!(!decide(&mut h, 5.0, 4.0)); // on the threshold
        assert!(decide(&mut h, 5.01, 4.0));
        assert!(decide(&mut h, 3.5, 4.0)); // on the threshold
        assert!(!decide(&mut h, 3.49, 4.0));
    }

    #[test]
    fn rounding_suppresses_jitter() {
        let mut h = rising(0.0, 0.0);
        h.switch_on().unwrap();
        assert!(decide(&mut h, 55.004, 55.0));
        assert!(!decide(&mut h, 55.006, 55.0));
        assert!(!decide(&mut h, 54.996, 55.0));
        assert!(decide(&mut h, 54.994, 55.0));
    }

    #[test]
    fn asymmetric_band_is_not_corrected() {
        let mut h = rising(2.0, 0.5);
        assert!(decide(&mut h, 52.99, 55.0));
        assert!(decide(&mut h, 55.5, 55.0));
        assert!(!decide(&mut h, 55.51, 55.0));
        assert!(!decide(&mut h, 53.0, 55.0));
    }

    #[test]
    fn negative_offsets_are_normalized() {
        let t = Thresholds::new(Direction::Rising, -1.0, -2.0);
        assert_eq!(t.on_offset, 1.0);
        assert_eq!(t.off_offset, 2.0);
    }

    #[test]
    fn request_filters_the_current_state() {
        let mut h = rising(1.0, 1.0);
        assert_eq!(h.request(60.0, 55.0), None);
        assert_eq!(h.request(50.0, 55.0), Some(Transition::SwitchOn));
        h.switch_on().unwrap();
        assert_eq!(h.request(50.0, 55.0), None);
        assert_eq!(h.request(60.0, 55.0), Some(Transition::SwitchOff));
    }

    #[test]
    fn thresholds_are_rounded() {
        // 54.7 - 0.3 is not exactly 54.4 in binary floating point
        let mut h = rising(0.3, 0.3);
        assert!(!decide(&mut h, 54.4, 54.7));
        assert!(decide(&mut h, 54.39, 54.7));
    }

    #[test]
    fn ignore_nan_input() {
        let mut h = rising(0.5, 0.5);
        assert!(decide(&mut h, -0.6, 0.0));
        assert!(decide(&mut h, f64::NAN, 0.0));
        assert!(!decide(&mut h, 0.6, 0.0));
        assert!(!decide(&mut h, f64::NAN, 0.0));
    }

    #[test]
    fn calculate_with_infinity_input() {
        let mut h = rising(0.0, 0.0);
        assert!(decide(&mut h, f64::NEG_INFINITY, 0.0));
        assert!(!decide(&mut h, f64::INFINITY, 0.0));
    }
}
