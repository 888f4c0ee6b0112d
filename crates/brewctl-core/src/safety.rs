//! Safety switch driven by a secondary sensor
//!
//! In a HERMS or RIMS brewery the temperature at the end of the heat
//! exchanger coil or tube rises much faster than the temperature that
//! is actually regulated. The safety override switches the actuator
//! off as soon as this secondary reading exceeds the target by its
//! own offset, regardless of the primary reading.
//!
//! The override is evaluated anew for every decision and never latched.
//! It re-arms automatically when the secondary reading returns into
//! bounds.
use crate::{util::round_temperature, Direction, Switching};

/// Switching layer with a secondary safety reading that takes
/// precedence over the primary reading
#[derive(Debug, Clone)]
pub struct SafetyOverride<S> {
    inner: S,
    offset: Option<f64>,
}

impl<S> SafetyOverride<S>
where
    S: Switching,
{
    /// Wrap a switching layer
    ///
    /// Without an `offset` the override is inactive and all decisions
    /// are delegated.
    pub fn new(inner: S, offset: Option<f64>) -> Self {
        Self {
            inner,
            offset: offset.map(f64::abs),
        }
    }

    pub fn offset(&self) -> Option<f64> {
        self.offset
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Check if the secondary reading has exceeded its threshold
    ///
    /// Always `false` if either no offset is configured or no
    /// secondary reading is available.
    pub fn is_breached(&self, target: f64, control: Option<f64>) -> bool {
        let (Some(offset), Some(control)) = (self.offset, control) else {
            return false;
        };
        let target = round_temperature(target);
        let control = round_temperature(control);
        match self.inner.direction() {
            Direction::Rising => control >= round_temperature(target + offset),
            Direction::Falling => control <= round_temperature(target - offset),
        }
    }

    /// Decide the actuator state
    ///
    /// A breached secondary reading requests the actuator to be switched
    /// off through the wrapped layer, i.e. the request is still subject
    /// to any gating that the wrapped layer applies. Otherwise the
    /// decision is delegated.
    pub fn decide(
        &mut self,
        current: f64,
        target: f64,
        control: Option<f64>,
    ) -> Result<bool, S::Error> {
        if self.is_breached(target, control) {
            log::debug!(
                "Safety reading {:?} exceeds target {} by more than {:?}",
                control,
                target,
                self.offset
            );
            self.inner.switch_off()?;
            return Ok(self.inner.is_on());
        }
        self.inner.decide(current, target)
    }
}
