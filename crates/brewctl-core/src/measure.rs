use std::time::Instant;

/// A sensor reading
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement<V> {
    /// When the value has been observed
    pub ts: Instant,

    /// The observed value
    ///
    /// `None` if the sensor has been polled but didn't deliver a value.
    pub val: Option<V>,
}

impl<V> Measurement<V> {
    pub const fn new(ts: Instant, val: Option<V>) -> Self {
        Self { ts, val }
    }

    pub fn now(val: impl Into<Option<V>>) -> Self {
        Self::new(Instant::now(), val.into())
    }
}
