pub mod aerodynamics;
pub mod atmosphere;
pub mod geodetic;
pub mod gravity;
pub mod mass;
pub mod wind;

// ---------------------------------------------------------------------------
// Physical constants
// ---------------------------------------------------------------------------

pub const G0: f64 = 9.80665; // standard gravity, m/s^2
pub const EARTH_RADIUS: f64 = 6_371_000.0; // mean Earth radius, m

/// Numerical epsilon for "is this quantity effectively zero" tests.
pub const EPSILON: f64 = 1e-10;
