use nalgebra::Vector3;

use crate::physics::EARTH_RADIUS;

/// Earth's sidereal angular velocity, rad/s.
const EARTH_ANGULAR_VELOCITY: f64 = 7.292_115e-5;

// ---------------------------------------------------------------------------
// World coordinate
// ---------------------------------------------------------------------------

/// Geodetic position: latitude, longitude (rad) and altitude above mean sea
/// level (m).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldCoordinate {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl WorldCoordinate {
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self { latitude, longitude, altitude }
    }

    pub fn is_nan(&self) -> bool {
        self.latitude.is_nan() || self.longitude.is_nan() || self.altitude.is_nan()
    }
}

impl Default for WorldCoordinate {
    fn default() -> Self {
        // 45 N, sea level
        Self::new(std::f64::consts::FRAC_PI_4, 0.0, 0.0)
    }
}

// ---------------------------------------------------------------------------
// Geodetic computation strategy
// ---------------------------------------------------------------------------

/// Strategy for mapping local ENU displacements onto the Earth and for the
/// rotating-frame correction terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeodeticComputation {
    /// Flat, non-rotating Earth: latitude/longitude stay fixed, Coriolis is
    /// zero.
    Flat,
    /// Spherical Earth with the Coriolis term from its rotation.
    #[default]
    Spherical,
}

impl GeodeticComputation {
    /// Advance a world coordinate by a local ENU displacement from the
    /// launch site (x = east, y = north, z = up).
    pub fn add_coordinate(&self, site: &WorldCoordinate, local: &Vector3<f64>) -> WorldCoordinate {
        match self {
            GeodeticComputation::Flat => WorldCoordinate {
                latitude: site.latitude,
                longitude: site.longitude,
                altitude: site.altitude + local.z,
            },
            GeodeticComputation::Spherical => {
                let radius = EARTH_RADIUS + site.altitude;
                let dlat = local.y / radius;
                let cos_lat = site.latitude.cos();
                let dlon = if cos_lat.abs() > 1e-9 {
                    local.x / (radius * cos_lat)
                } else {
                    0.0
                };
                WorldCoordinate {
                    latitude: site.latitude + dlat,
                    longitude: site.longitude + dlon,
                    altitude: site.altitude + local.z,
                }
            }
        }
    }

    /// Coriolis acceleration a = -2 Ω × v for a velocity in the local ENU
    /// frame at the given position.
    pub fn coriolis_acceleration(
        &self,
        position: &WorldCoordinate,
        velocity: &Vector3<f64>,
    ) -> Vector3<f64> {
        match self {
            GeodeticComputation::Flat => Vector3::zeros(),
            GeodeticComputation::Spherical => {
                let omega = Vector3::new(
                    0.0,
                    EARTH_ANGULAR_VELOCITY * position.latitude.cos(),
                    EARTH_ANGULAR_VELOCITY * position.latitude.sin(),
                );
                -2.0 * omega.cross(velocity)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn flat_strategy_keeps_latitude_and_longitude() {
        let site = WorldCoordinate::new(0.5, 1.0, 100.0);
        let w = GeodeticComputation::Flat
            .add_coordinate(&site, &Vector3::new(5_000.0, 5_000.0, 2_000.0));
        assert_eq!(w.latitude, 0.5);
        assert_eq!(w.longitude, 1.0);
        assert_relative_eq!(w.altitude, 2_100.0);
    }

    #[test]
    fn northward_displacement_increases_latitude() {
        let site = WorldCoordinate::new(0.0, 0.0, 0.0);
        let w = GeodeticComputation::Spherical
            .add_coordinate(&site, &Vector3::new(0.0, 10_000.0, 0.0));
        assert!(w.latitude > 0.0);
        assert_relative_eq!(w.latitude, 10_000.0 / EARTH_RADIUS);
    }

    #[test]
    fn flat_strategy_has_no_coriolis() {
        let site = WorldCoordinate::default();
        let a = GeodeticComputation::Flat
            .coriolis_acceleration(&site, &Vector3::new(0.0, 0.0, 300.0));
        assert_eq!(a.norm(), 0.0);
    }

    #[test]
    fn coriolis_deflects_upward_motion_westward() {
        // At the equator, Ω points north; v up => -2 Ω × v points west.
        let site = WorldCoordinate::new(0.0, 0.0, 0.0);
        let a = GeodeticComputation::Spherical
            .coriolis_acceleration(&site, &Vector3::new(0.0, 0.0, 100.0));
        assert!(a.x < 0.0, "upward motion should deflect west, got {a:?}");
        assert!(a.y.abs() < 1e-12);
    }
}
