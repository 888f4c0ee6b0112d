//! Little helpers

/// Number of decimal places that are considered for temperature comparisons.
pub const TEMPERATURE_DECIMALS: i32 = 2;

/// Round a value to the given number of decimal places.
///
/// Halfway cases are rounded away from zero, i.e. the result is
/// symmetric for negated inputs.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Round a temperature before comparing it against a threshold.
///
/// Sensor jitter below 0.01° must not decide about switching.
pub fn round_temperature(value: f64) -> f64 {
    round_to(value, TEMPERATURE_DECIMALS)
}

/// Normalize a user supplied magnitude, i.e. drop its sign.
pub fn magnitude(value: f64) -> f64 {
    value.abs()
}
