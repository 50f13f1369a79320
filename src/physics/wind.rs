use nalgebra::Vector3;

/// Model producing the local wind vector (ENU frame, m/s) as a function of
/// simulation time and altitude.
pub trait WindModel: Send + Sync {
    fn wind_velocity(&self, time: f64, altitude: f64) -> Vector3<f64>;
}

/// Perfectly calm air.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalmWind;

impl WindModel for CalmWind {
    fn wind_velocity(&self, _time: f64, _altitude: f64) -> Vector3<f64> {
        Vector3::zeros()
    }
}

/// Constant horizontal wind blowing toward the given azimuth.
#[derive(Debug, Clone, Copy)]
pub struct ConstantWind {
    pub speed: f64,       // m/s
    pub direction: f64,   // rad, azimuth the wind blows toward (0 = north)
}

impl ConstantWind {
    pub fn new(speed: f64, direction: f64) -> Self {
        Self { speed, direction }
    }
}

impl WindModel for ConstantWind {
    fn wind_velocity(&self, _time: f64, _altitude: f64) -> Vector3<f64> {
        Vector3::new(
            self.speed * self.direction.sin(),
            self.speed * self.direction.cos(),
            0.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calm_wind_is_zero() {
        assert_eq!(CalmWind.wind_velocity(10.0, 500.0).norm(), 0.0);
    }

    #[test]
    fn constant_wind_direction() {
        // Wind toward north
        let w = ConstantWind::new(5.0, 0.0).wind_velocity(0.0, 0.0);
        assert!((w.y - 5.0).abs() < 1e-12);
        assert!(w.x.abs() < 1e-12);

        // Wind toward east
        let w = ConstantWind::new(5.0, std::f64::consts::FRAC_PI_2).wind_velocity(0.0, 0.0);
        assert!((w.x - 5.0).abs() < 1e-12);
    }
}
