use crate::physics::G0;

// ---------------------------------------------------------------------------
// ISA 1976 Standard Atmosphere (sea level to 86 km)
// ---------------------------------------------------------------------------

const R_AIR: f64 = 287.052_87; // specific gas constant for dry air, J/(kg·K)
const GAMMA: f64 = 1.4;        // ratio of specific heats

/// Atmospheric properties at a given geometric altitude.
#[derive(Debug, Clone, Copy)]
pub struct Atmosphere {
    pub density: f64,             // kg/m^3
    pub pressure: f64,            // Pa
    pub temperature: f64,         // K
    pub speed_of_sound: f64,      // m/s
    pub kinematic_viscosity: f64, // m^2/s
}

impl Atmosphere {
    /// Build the derived quantities from temperature and pressure.
    pub fn from_temperature_pressure(temperature: f64, pressure: f64) -> Atmosphere {
        let density = if temperature > 0.0 {
            pressure / (R_AIR * temperature)
        } else {
            0.0
        };
        // Sutherland's law for dynamic viscosity of air
        let dynamic_viscosity =
            1.458e-6 * temperature.powf(1.5) / (temperature + 110.4);
        Atmosphere {
            density,
            pressure,
            temperature,
            speed_of_sound: (GAMMA * R_AIR * temperature).sqrt(),
            kinematic_viscosity: if density > 0.0 {
                dynamic_viscosity / density
            } else {
                f64::INFINITY
            },
        }
    }
}

/// Model mapping altitude to atmospheric conditions.
pub trait AtmosphereModel: Send + Sync {
    fn conditions(&self, altitude_m: f64) -> Atmosphere;
}

// ---------------------------------------------------------------------------
// ISA layer table
// ---------------------------------------------------------------------------

struct IsaLayer {
    base_altitude: f64, // m
    base_temperature: f64, // K
    base_pressure: f64, // Pa
    lapse: f64,         // K/m, 0 = isothermal
}

const ISA_LAYERS: &[IsaLayer] = &[
    IsaLayer { base_altitude: 0.0, base_temperature: 288.15, base_pressure: 101_325.0, lapse: -0.0065 },
    IsaLayer { base_altitude: 11_000.0, base_temperature: 216.65, base_pressure: 22_632.1, lapse: 0.0 },
    IsaLayer { base_altitude: 20_000.0, base_temperature: 216.65, base_pressure: 5_474.89, lapse: 0.001 },
    IsaLayer { base_altitude: 32_000.0, base_temperature: 228.65, base_pressure: 868.019, lapse: 0.0028 },
    IsaLayer { base_altitude: 47_000.0, base_temperature: 270.65, base_pressure: 110.906, lapse: 0.0 },
    IsaLayer { base_altitude: 51_000.0, base_temperature: 270.65, base_pressure: 66.9389, lapse: -0.0028 },
    IsaLayer { base_altitude: 71_000.0, base_temperature: 214.65, base_pressure: 3.956_42, lapse: -0.002 },
];

const ISA_TOP: f64 = 86_000.0;

/// ISA 1976 standard atmosphere model.
///
/// Piecewise temperature profile with 7 layers from 0-86 km.
/// Clamps negative altitudes to sea level; returns near-vacuum above 86 km.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsaAtmosphere;

impl AtmosphereModel for IsaAtmosphere {
    fn conditions(&self, altitude_m: f64) -> Atmosphere {
        let h = altitude_m.max(0.0);

        if h >= ISA_TOP {
            // Above 86 km: exponential decay approximation
            let t = 186.87;
            let p = (0.3734 * (-0.000_15 * (h - ISA_TOP)).exp()).max(0.0);
            return Atmosphere::from_temperature_pressure(t, p);
        }

        let layer = ISA_LAYERS
            .iter()
            .rev()
            .find(|l| h >= l.base_altitude)
            .unwrap_or(&ISA_LAYERS[0]);

        let dh = h - layer.base_altitude;
        let (temperature, pressure) = if layer.lapse.abs() > 1e-12 {
            // Gradient layer: T = T_base + lapse * dh
            let t = layer.base_temperature + layer.lapse * dh;
            let p = layer.base_pressure
                * (t / layer.base_temperature).powf(-G0 / (layer.lapse * R_AIR));
            (t, p)
        } else {
            // Isothermal layer: pressure decays exponentially
            let t = layer.base_temperature;
            let p = layer.base_pressure * ((-G0 / (R_AIR * t)) * dh).exp();
            (t, p)
        };

        Atmosphere::from_temperature_pressure(temperature, pressure)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn isa(h: f64) -> Atmosphere {
        IsaAtmosphere.conditions(h)
    }

    #[test]
    fn sea_level_standard_values() {
        let a = isa(0.0);
        assert_relative_eq!(a.temperature, 288.15, epsilon = 0.01);
        assert_relative_eq!(a.pressure, 101_325.0, epsilon = 1.0);
        assert_relative_eq!(a.density, 1.225, epsilon = 0.001);
        assert_relative_eq!(a.speed_of_sound, 340.29, epsilon = 0.1);
    }

    #[test]
    fn tropopause_11km() {
        let a = isa(11_000.0);
        assert!((a.temperature - 216.65).abs() < 0.5);
        assert!((a.pressure - 22_632.0).abs() < 100.0);
    }

    #[test]
    fn density_monotonically_decreases() {
        let rho_0 = isa(0.0).density;
        let rho_10k = isa(10_000.0).density;
        let rho_50k = isa(50_000.0).density;
        assert!(rho_0 > rho_10k);
        assert!(rho_10k > rho_50k);
        assert!(rho_50k > 0.0);
    }

    #[test]
    fn negative_altitude_clamps_to_sea_level() {
        let a = isa(-500.0);
        assert!((a.temperature - 288.15).abs() < 0.01);
    }

    #[test]
    fn near_vacuum_above_86km() {
        let a = isa(100_000.0);
        assert!(a.density < 1e-5);
        assert!(a.pressure < 1.0);
    }

    #[test]
    fn sea_level_kinematic_viscosity() {
        // Standard air: nu ~ 1.46e-5 m^2/s
        let a = isa(0.0);
        assert!((a.kinematic_viscosity - 1.46e-5).abs() < 0.05e-5);
    }
}
