//! Read-only access to the latest sensor readings
use std::{collections::HashMap, fmt, time::Instant};

use parking_lot::RwLock;
use thiserror::Error;

use crate::Measurement;

/// Identifier of a temperature sensor
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(transparent))]
pub struct SensorId(String);

impl SensorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SensorId {
    fn from(from: &str) -> Self {
        Self::new(from)
    }
}

impl From<String> for SensorId {
    fn from(from: String) -> Self {
        Self(from)
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    #[error("unknown sensor {0}")]
    NotFound(SensorId),

    #[error("sensor {0} has not delivered a value yet")]
    NoValue(SensorId),

    #[error("sensor {id} delivered an invalid value ({value})")]
    InvalidValue { id: SensorId, value: f64 },
}

/// Access to the latest value of each sensor
///
/// Implemented by the host, e.g. on top of a sensor registry that is
/// updated independently of the control loop.
pub trait SensorCache {
    /// Read the latest value of a sensor.
    fn latest_value(&self, id: &SensorId) -> Result<f64, SensorError>;
}

impl<T> SensorCache for &T
where
    T: SensorCache + ?Sized,
{
    fn latest_value(&self, id: &SensorId) -> Result<f64, SensorError> {
        (**self).latest_value(id)
    }
}

impl<T> SensorCache for std::sync::Arc<T>
where
    T: SensorCache + ?Sized,
{
    fn latest_value(&self, id: &SensorId) -> Result<f64, SensorError> {
        (**self).latest_value(id)
    }
}

/// Thread-safe in-memory sensor cache
///
/// Sensors are registered implicitly when their first measurement
/// is recorded.
#[derive(Debug, Default)]
pub struct SensorReadings {
    latest: RwLock<HashMap<SensorId, Measurement<f64>>>,
}

impl SensorReadings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sensor without a value
    pub fn register(&self, id: impl Into<SensorId>) {
        self.latest
            .write()
            .entry(id.into())
            .or_insert_with(|| Measurement::new(Instant::now(), None));
    }

    /// Record a new value, replacing the previous one
    pub fn record(&self, id: impl Into<SensorId>, measurement: Measurement<f64>) {
        self.latest.write().insert(id.into(), measurement);
    }

    /// Record a new value that has been observed just now
    pub fn update(&self, id: impl Into<SensorId>, value: f64) {
        self.record(id, Measurement::now(value));
    }

    /// The latest measurement of a sensor including its time stamp
    pub fn latest_measurement(&self, id: &SensorId) -> Option<Measurement<f64>> {
        self.latest.read().get(id).cloned()
    }
}

impl SensorCache for SensorReadings {
    fn latest_value(&self, id: &SensorId) -> Result<f64, SensorError> {
        let measurement = self
            .latest_measurement(id)
            .ok_or_else(|| SensorError::NotFound(id.clone()))?;
        let value = measurement
            .val
            .ok_or_else(|| SensorError::NoValue(id.clone()))?;
        if !value.is_finite() {
            return Err(SensorError::InvalidValue {
                id: id.clone(),
                value,
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn sensor_readings_as_sensor_cache() {
        let readings = SensorReadings::new();
        let hlt = SensorId::from("hlt");
        assert_eq!(
            Err(SensorError::NotFound(hlt.clone())),
            readings.latest_value(&hlt)
        );

        readings.register("hlt");
        assert_eq!(
            Err(SensorError::NoValue(hlt.clone())),
            readings.latest_value(&hlt)
        );

        readings.update("hlt", 66.5);
        assert_eq!(Ok(66.5), readings.latest_value(&hlt));

        readings.update("hlt", 67.0);
        assert_eq!(Ok(67.0), (&readings).latest_value(&hlt));
    }

    #[test]
    fn reject_values_that_are_not_finite() {
        let readings = SensorReadings::new();
        readings.update("coil", f64::INFINITY);
        assert!(matches!(
            readings.latest_value(&"coil".into()),
            Err(SensorError::InvalidValue { .. })
        ));
    }

    #[test]
    fn register_keeps_existing_values() {
        let readings = SensorReadings::new();
        readings.update("mt", 64.0);
        readings.register("mt");
        assert_eq!(Ok(64.0), readings.latest_value(&"mt".into()));
    }

    #[test]
    fn display_sensor_id() {
        assert_eq!("hlt", SensorId::new("hlt").to_string());
        assert_eq!("hlt", SensorId::from("hlt".to_string()).as_str());
    }
}
