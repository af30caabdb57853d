//! Unit conversions.
//!
//! Sensors publish SI units (radians, m/s, Kelvin, Pascal, m³/s). Everything
//! downstream wants the units shown on a boat's instruments. These are total
//! functions: NaN and infinities pass straight through.

use std::f64::consts::PI;

/// Radians to degrees.
pub fn radians_to_degrees(rad: f64) -> f64 {
    rad * 180.0 / PI
}

/// Meters per second to knots.
pub fn meters_per_second_to_knots(mps: f64) -> f64 {
    mps * 1.943844
}

/// Meters to feet.
pub fn meters_to_feet(m: f64) -> f64 {
    m * 3.28084
}

/// Kelvin to degrees Fahrenheit.
pub fn kelvin_to_fahrenheit(k: f64) -> f64 {
    (k - 273.15) * 1.8 + 32.0
}

/// Kelvin to degrees Celsius.
pub fn kelvin_to_celsius(k: f64) -> f64 {
    k - 273.15
}

/// Millibar (hPa) to inches of mercury.
pub fn millibar_to_in_hg(mb: f64) -> f64 {
    mb / 33.8639
}

/// Pascal to pounds per square inch.
pub fn pascal_to_psi(pa: f64) -> f64 {
    pa * 0.000145038
}

pub fn cubic_meters_per_second_to_gallons_per_hour(cms: f64) -> f64 {
    cms * 951019.4
}

pub fn cubic_meters_per_second_to_gallons_per_minute(cms: f64) -> f64 {
    cms * 15850.323
}

pub fn cubic_meters_per_second_to_gallons_per_second(cms: f64) -> f64 {
    cms * 264.172056
}
