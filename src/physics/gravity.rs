use crate::physics::geodetic::WorldCoordinate;
use crate::physics::{EARTH_RADIUS, G0};

/// Model mapping a world position to scalar gravitational acceleration
/// (positive down).
pub trait GravityModel: Send + Sync {
    fn gravity(&self, position: &WorldCoordinate) -> f64;
}

/// Inverse-square gravity over a spherical Earth.
#[derive(Debug, Clone, Copy, Default)]
pub struct InverseSquareGravity;

impl GravityModel for InverseSquareGravity {
    fn gravity(&self, position: &WorldCoordinate) -> f64 {
        let alt = position.altitude.max(0.0);
        G0 * (EARTH_RADIUS / (EARTH_RADIUS + alt)).powi(2)
    }
}

/// Constant gravity, useful for flat-earth test setups.
#[derive(Debug, Clone, Copy)]
pub struct ConstantGravity(pub f64);

impl GravityModel for ConstantGravity {
    fn gravity(&self, _position: &WorldCoordinate) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sea_level_gravity() {
        let site = WorldCoordinate::new(0.0, 0.0, 0.0);
        let g = InverseSquareGravity.gravity(&site);
        assert!((g - G0).abs() < 1e-6);
    }

    #[test]
    fn gravity_decreases_with_altitude() {
        let g0 = InverseSquareGravity.gravity(&WorldCoordinate::new(0.0, 0.0, 0.0));
        let g100k = InverseSquareGravity.gravity(&WorldCoordinate::new(0.0, 0.0, 100_000.0));
        assert!(g100k < g0);
    }

    #[test]
    fn constant_gravity_ignores_position() {
        let g = ConstantGravity(9.81);
        assert_eq!(g.gravity(&WorldCoordinate::new(1.0, 2.0, 50_000.0)), 9.81);
    }
}
