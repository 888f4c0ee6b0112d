//! Cascade regulation of a mash tun
//!
//! The target temperature is defined for the mash tun, but the heater
//! is regulated by a hysteresis on the hot liquor tank (HLT) temperature.
//! This keeps the HLT from overshooting far beyond the mash target. An
//! optional sensor after the HERMS coil or RIMS tube acts as safety
//! switch, see [`crate::safety`].
//!
//! A [`Regulation`] session is driven periodically, either by invoking
//! [`Regulation::tick()`] from an external loop or by handing over the
//! control to [`Regulation::run()`].
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use thiserror::Error;

use crate::{
    config::{finite, seconds, ConfigError, Direction, HysteresisConfig},
    controller::CascadeController,
    dwell::DwellBlocked,
    sensor::{SensorCache, SensorError, SensorId},
    sync::StopSignal,
    time::Clock,
    util::magnitude,
};

/// Cycles with less remaining time are considered too short
pub const MIN_CYCLE_SLACK: Duration = Duration::from_millis(250);

/// Power level for switching the heater on
pub const FULL_POWER: u8 = 100;

mod defaults {
    pub const fn positive_offset() -> f64 {
        1.0
    }

    pub const fn negative_offset() -> f64 {
        0.0
    }

    pub const fn min_on_seconds() -> f64 {
        60.0
    }

    pub const fn min_off_seconds() -> f64 {
        60.0
    }

    pub const fn coil_offset() -> f64 {
        1.5
    }

    pub const fn cycle_seconds() -> f64 {
        3.0
    }

    pub const fn heater_power() -> u8 {
        super::FULL_POWER
    }
}

/// Configuration of a cascade regulation session
///
/// Numeric parameters are magnitudes, their sign is ignored.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CascadeConfig {
    /// The sensor of the mash tun
    ///
    /// The heater is switched off unconditionally as soon as this
    /// sensor reaches the target temperature.
    pub kettle_sensor: SensorId,

    /// The sensor of the hot liquor tank that drives the hysteresis
    pub hysteresis_sensor: SensorId,

    /// The optional sensor after the HERMS coil or RIMS tube
    #[cfg_attr(feature = "with-serde", serde(default))]
    pub coil_sensor: Option<SensorId>,

    /// Permitted overshoot above the target with the heater still switched on
    #[cfg_attr(feature = "with-serde", serde(default = "defaults::positive_offset"))]
    pub positive_offset: f64,

    /// Permitted undershoot below the target with the heater still switched off
    #[cfg_attr(feature = "with-serde", serde(default = "defaults::negative_offset"))]
    pub negative_offset: f64,

    #[cfg_attr(feature = "with-serde", serde(default = "defaults::min_on_seconds"))]
    pub min_on_seconds: f64,

    #[cfg_attr(feature = "with-serde", serde(default = "defaults::min_off_seconds"))]
    pub min_off_seconds: f64,

    /// Overshoot of the coil sensor above the target that switches the
    /// heater off
    ///
    /// Ignored without a `coil_sensor`.
    #[cfg_attr(feature = "with-serde", serde(default = "defaults::coil_offset"))]
    pub coil_offset: f64,

    /// Nominal duration of a control cycle
    #[cfg_attr(feature = "with-serde", serde(default = "defaults::cycle_seconds"))]
    pub cycle_seconds: f64,

    /// Power level when switching the heater on, at most [`FULL_POWER`]
    #[cfg_attr(feature = "with-serde", serde(default = "defaults::heater_power"))]
    pub heater_power: u8,
}

impl CascadeConfig {
    /// Create a configuration with default parameters and without
    /// a coil sensor.
    pub fn new(kettle_sensor: impl Into<SensorId>, hysteresis_sensor: impl Into<SensorId>) -> Self {
        Self {
            kettle_sensor: kettle_sensor.into(),
            hysteresis_sensor: hysteresis_sensor.into(),
            coil_sensor: None,
            positive_offset: defaults::positive_offset(),
            negative_offset: defaults::negative_offset(),
            min_on_seconds: defaults::min_on_seconds(),
            min_off_seconds: defaults::min_off_seconds(),
            coil_offset: defaults::coil_offset(),
            cycle_seconds: defaults::cycle_seconds(),
            heater_power: defaults::heater_power(),
        }
    }

    /// The configuration of the heater's hysteresis controller
    ///
    /// The safety override is only activated if a coil sensor exists.
    pub fn hysteresis_config(&self) -> HysteresisConfig {
        HysteresisConfig {
            direction: Direction::Rising,
            on_offset: magnitude(self.negative_offset),
            off_offset: magnitude(self.positive_offset),
            min_on_seconds: magnitude(self.min_on_seconds),
            min_off_seconds: magnitude(self.min_off_seconds),
            safety_offset: self
                .coil_sensor
                .as_ref()
                .map(|_| magnitude(self.coil_offset)),
        }
    }

    pub fn cycle_time(&self) -> Result<Duration, ConfigError> {
        let secs = seconds("cycle_seconds", self.cycle_seconds)?;
        if secs == 0.0 {
            return Err(ConfigError::NotPositive {
                parameter: "cycle_seconds",
            });
        }
        Ok(Duration::from_secs_f64(secs))
    }

    /// Normalize and check all parameters
    pub fn validate(self) -> Result<Self, ConfigError> {
        self.cycle_time()?;
        let hysteresis = self.hysteresis_config().validate()?;
        Ok(Self {
            positive_offset: hysteresis.off_offset,
            negative_offset: hysteresis.on_offset,
            min_on_seconds: hysteresis.min_on_seconds,
            min_off_seconds: hysteresis.min_off_seconds,
            coil_offset: finite("coil_offset", self.coil_offset)?,
            cycle_seconds: magnitude(self.cycle_seconds),
            heater_power: self.heater_power.min(FULL_POWER),
            ..self
        })
    }
}

/// The shared target temperature of a kettle
///
/// The target may be changed at any time, e.g. when a brewing step
/// finishes, and is read anew during each control cycle.
#[derive(Debug, Clone)]
pub struct SetPoint(Arc<Mutex<f64>>);

impl SetPoint {
    pub fn new(target: f64) -> Self {
        Self(Arc::new(Mutex::new(target)))
    }

    pub fn get(&self) -> f64 {
        *self.0.lock()
    }

    /// Replace the target and return the previous one.
    pub fn set(&self, target: f64) -> f64 {
        std::mem::replace(&mut *self.0.lock(), target)
    }
}

/// The heating actor
pub trait Heater {
    /// Switch on with the given power level in percent
    fn switch_on(&mut self, power: u8) -> anyhow::Result<()>;

    fn switch_off(&mut self) -> anyhow::Result<()>;
}

impl<H> Heater for &mut H
where
    H: Heater + ?Sized,
{
    fn switch_on(&mut self, power: u8) -> anyhow::Result<()> {
        (**self).switch_on(power)
    }

    fn switch_off(&mut self) -> anyhow::Result<()> {
        (**self).switch_off()
    }
}

/// Notifications about the progress of a regulation session
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The kettle reached its target and the heater has been switched off
    TargetReached { current: f64, target: f64 },

    /// The heater has been commanded for the current cycle
    HeaterCommanded { on: bool },

    /// The controller wanted to switch, but had to defer the transition
    TransitionDeferred(DwellBlocked),

    /// A sensor could not be read and the heater has been switched off
    SensorFailure(SensorError),

    /// Too little time was left until the end of the control cycle
    CycleOverrun { slack: Duration },

    /// The session has ended with the heater switched off
    Stopped,
}

/// Event callbacks
pub trait Events {
    fn on_event(&mut self, event: Event);
}

pub type EventsBoxed = Box<dyn Events + Send + 'static>;

impl Events for EventsBoxed {
    fn on_event(&mut self, event: Event) {
        (**self).on_event(event)
    }
}

/// Ignore all events
impl Events for () {
    fn on_event(&mut self, _event: Event) {}
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error("failed to drive the heater: {0}")]
    Heater(anyhow::Error),
}

/// The outcome of a single control cycle
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The controller has been skipped, because the kettle reached
    /// its target
    TargetReached,

    /// The controller has been evaluated
    Evaluated {
        heater_on: bool,

        /// A transition that has been deferred during this cycle
        deferred: Option<DwellBlocked>,
    },
}

impl TickOutcome {
    /// The commanded heater state
    pub fn heater_on(&self) -> bool {
        match self {
            Self::TargetReached => false,
            Self::Evaluated { heater_on, .. } => *heater_on,
        }
    }
}

/// A regulation session for a single kettle
pub struct Regulation<C, S, H> {
    cfg: CascadeConfig,
    cycle_time: Duration,
    controller: CascadeController<C>,
    set_point: SetPoint,
    sensors: S,
    heater: H,
    heater_on: bool,
}

impl<C, S, H> Regulation<C, S, H>
where
    C: Clock,
    S: SensorCache,
    H: Heater,
{
    pub fn new(
        cfg: CascadeConfig,
        set_point: SetPoint,
        sensors: S,
        heater: H,
        clock: C,
    ) -> Result<Self, ConfigError> {
        let cfg = cfg.validate()?;
        let cycle_time = cfg.cycle_time()?;
        let controller = CascadeController::new(cfg.hysteresis_config(), clock)?;
        Ok(Self {
            cfg,
            cycle_time,
            controller,
            set_point,
            sensors,
            heater,
            heater_on: false,
        })
    }

    /// The normalized configuration
    pub fn config(&self) -> &CascadeConfig {
        &self.cfg
    }

    pub fn controller(&self) -> &CascadeController<C> {
        &self.controller
    }

    pub fn set_point(&self) -> &SetPoint {
        &self.set_point
    }

    pub fn heater(&self) -> &H {
        &self.heater
    }

    /// Finish the session and recover the sensors and the heater
    pub fn into_parts(self) -> (S, H) {
        let Self {
            sensors, heater, ..
        } = self;
        (sensors, heater)
    }

    fn command_heater(&mut self, on: bool) -> Result<(), Error> {
        let result = if on {
            self.heater.switch_on(self.cfg.heater_power)
        } else {
            self.heater.switch_off()
        };
        result.map_err(Error::Heater)
    }

    /// Perform a single control cycle
    ///
    /// Reaching the target in the mash tun switches the heater off
    /// immediately and bypasses the controller, including its minimum
    /// on time.
    pub fn tick<E: Events>(&mut self, events: &mut E) -> Result<TickOutcome, Error> {
        let target = self.set_point.get();
        let current = self.sensors.latest_value(&self.cfg.kettle_sensor)?;
        if current >= target {
            self.command_heater(false)?;
            log::info!("Target temperature {} reached ({})", target, current);
            events.on_event(Event::TargetReached { current, target });
            return Ok(TickOutcome::TargetReached);
        }
        let control = self
            .cfg
            .coil_sensor
            .as_ref()
            .map(|id| self.sensors.latest_value(id))
            .transpose()?;
        let hysteresis_temp = self.sensors.latest_value(&self.cfg.hysteresis_sensor)?;
        let deferred = match self.controller.evaluate(hysteresis_temp, target, control) {
            Ok(heater_on) => {
                self.heater_on = heater_on;
                None
            }
            Err(blocked) => {
                // The previous command remains in effect
                log::warn!("{}", blocked);
                events.on_event(Event::TransitionDeferred(blocked));
                Some(blocked)
            }
        };
        let heater_on = self.heater_on;
        self.command_heater(heater_on)?;
        log::info!("Heater stays {}", if heater_on { "ON" } else { "OFF" });
        events.on_event(Event::HeaterCommanded { on: heater_on });
        Ok(TickOutcome::Evaluated {
            heater_on,
            deferred,
        })
    }

    /// Switch the heater off
    pub fn stop(&mut self) -> Result<(), Error> {
        self.command_heater(false)
    }

    /// Perform control cycles until stopped
    ///
    /// The heater is switched off when a sensor cannot be read and
    /// the next cycle is awaited. Failing to drive the heater aborts
    /// the session.
    ///
    /// The heater is always switched off before returning.
    pub fn run<E: Events>(&mut self, stop_signal: &StopSignal, events: &mut E) -> Result<(), Error> {
        log::info!(
            "Starting regulation (kettle: {}, hysteresis: {}, coil: {:?})",
            self.cfg.kettle_sensor,
            self.cfg.hysteresis_sensor,
            self.cfg.coil_sensor.as_ref().map(SensorId::as_str),
        );
        let result = self.run_cycles(stop_signal, events);
        if let Err(err) = &result {
            log::error!("Aborting regulation: {}", err);
        }
        let stopped = self.stop();
        if let Err(err) = &stopped {
            log::error!("Failed to switch off the heater: {}", err);
        }
        log::info!("Regulation stopped");
        events.on_event(Event::Stopped);
        result.and(stopped)
    }

    fn run_cycles<E: Events>(
        &mut self,
        stop_signal: &StopSignal,
        events: &mut E,
    ) -> Result<(), Error> {
        while !stop_signal.is_raised() {
            let cycle_deadline = Instant::now() + self.cycle_time;
            match self.tick(events) {
                Ok(_) => (),
                Err(Error::Sensor(err)) => {
                    log::error!("Switching off the heater: {}", err);
                    self.command_heater(false)?;
                    events.on_event(Event::SensorFailure(err));
                }
                Err(err) => return Err(err),
            }
            let slack = cycle_deadline.saturating_duration_since(Instant::now());
            if slack <= MIN_CYCLE_SLACK {
                log::warn!("Update interval is too short (slack: {:?})", slack);
                events.on_event(Event::CycleOverrun { slack });
            }
            if stop_signal.wait_until(cycle_deadline) {
                break;
            }
        }
        Ok(())
    }
}
