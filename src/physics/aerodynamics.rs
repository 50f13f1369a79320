use crate::data::warnings::{Warning, WarningSet};
use crate::physics::atmosphere::Atmosphere;
use crate::vehicle::FlightConfiguration;

// ---------------------------------------------------------------------------
// Flight conditions
// ---------------------------------------------------------------------------

/// Instantaneous conditions the aerodynamic model is evaluated at.
#[derive(Debug, Clone, Copy)]
pub struct FlightConditions {
    pub atmosphere: Atmosphere,
    /// Airspeed magnitude (velocity relative to the air), m/s.
    pub velocity: f64,
    pub mach: f64,
    /// Angle of attack, rad.
    pub aoa: f64,
    pub sin_aoa: f64,
    /// Direction of the lateral airflow component around the body axis, rad.
    pub theta: f64,
    pub roll_rate: f64,
    pub pitch_rate: f64,
    pub yaw_rate: f64,
    pub reference_area: f64,
    pub reference_length: f64,
}

impl FlightConditions {
    /// Conditions for a configuration at rest in the given air.
    pub fn still_air(config: &FlightConfiguration, atmosphere: Atmosphere) -> Self {
        Self {
            atmosphere,
            velocity: 0.0,
            mach: 0.0,
            aoa: 0.0,
            sin_aoa: 0.0,
            theta: 0.0,
            roll_rate: 0.0,
            pitch_rate: 0.0,
            yaw_rate: 0.0,
            reference_area: config.reference_area(),
            reference_length: config.reference_length(),
        }
    }
}

// ---------------------------------------------------------------------------
// Aerodynamic coefficients
// ---------------------------------------------------------------------------

/// Force and moment coefficients.  Moments are taken about the nose tip;
/// the integrator shifts them to the instantaneous CG.
#[derive(Debug, Clone, Copy, Default)]
pub struct AeroCoefficients {
    /// Normal force coefficient.
    pub cn: f64,
    /// Side force coefficient.
    pub cside: f64,
    /// Axial (body-axis) drag coefficient.
    pub caxial: f64,
    /// Total drag coefficient.
    pub cd: f64,
    /// Pitch moment coefficient about the nose.
    pub cm: f64,
    /// Yaw moment coefficient about the nose.
    pub cyaw: f64,
    /// Roll moment coefficient.
    pub croll: f64,
    /// Roll damping part of `croll`.
    pub croll_damp: f64,
    /// Roll forcing part of `croll`.
    pub croll_force: f64,
    /// Center of pressure, m aft of the nose.
    pub cp_x: f64,
}

/// Strategy computing aerodynamic coefficients for a configuration under
/// given flight conditions.  Warnings are only recorded when the engine
/// hands in a set; suppression windows are the caller's concern.
pub trait AerodynamicModel: Send + Sync {
    fn coefficients(
        &self,
        config: &FlightConfiguration,
        conditions: &FlightConditions,
        warnings: Option<&mut WarningSet>,
    ) -> AeroCoefficients;
}

// ---------------------------------------------------------------------------
// Slender-body default model
// ---------------------------------------------------------------------------

/// Normal force slope of a slender axisymmetric body, per radian.
const CN_ALPHA: f64 = 2.0;

/// Angle of attack beyond which the slender-body assumptions break down.
const AOA_WARNING_LIMIT: f64 = 20.0 * std::f64::consts::PI / 180.0;

/// Slender-body aerodynamics: linear normal force, CP from the aft-most
/// active stage's fins, axial drag from the stages' drag coefficients, and
/// rate-proportional pitch/roll damping.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlenderBodyAero;

impl AerodynamicModel for SlenderBodyAero {
    fn coefficients(
        &self,
        config: &FlightConfiguration,
        conditions: &FlightConditions,
        warnings: Option<&mut WarningSet>,
    ) -> AeroCoefficients {
        let mut coeffs = AeroCoefficients::default();

        // Normal/side force from angle of attack.  The lateral airflow
        // direction theta is resolved by the integrator; here the force
        // lives in the pitch plane.
        coeffs.cn = CN_ALPHA * conditions.sin_aoa;
        coeffs.cside = 0.0;

        // CP: fins of the aft-most active stage dominate.
        let rocket = config.rocket();
        coeffs.cp_x = config
            .active_stages()
            .last()
            .map(|(n, stage)| rocket.stage_offset(n) + stage.cp_x)
            .unwrap_or(0.0);

        // Axial drag: compressibility-corrected sum of the active stages'
        // drag coefficients (Prandtl-Glauert below the transonic region).
        let cd0: f64 = config.active_stages().map(|(_, s)| s.cd).sum();
        let compressibility = if conditions.mach < 0.8 {
            1.0 / (1.0 - conditions.mach * conditions.mach).sqrt()
        } else {
            // Flat transonic plateau; good enough for a slender body.
            1.0 / (1.0 - 0.8f64 * 0.8).sqrt()
        };
        coeffs.cd = cd0 * compressibility;
        // Signed axial component: negative past 90 degrees, so drag still
        // opposes the airflow when the body flies tail-first.
        coeffs.caxial = coeffs.cd * conditions.aoa.cos();

        // Moments about the nose.
        let ref_len = conditions.reference_length.max(1e-9);
        coeffs.cm = coeffs.cn * coeffs.cp_x / ref_len;
        coeffs.cyaw = coeffs.cside * coeffs.cp_x / ref_len;

        // Rate-proportional pitch/yaw damping folded into the moments.
        // The yaw moment enters the dynamics as -cyaw, hence the opposite
        // sign.
        if conditions.velocity > 1.0 {
            let damping = 0.3 * config.active_length() / conditions.velocity;
            coeffs.cm -= damping * conditions.pitch_rate;
            coeffs.cyaw += damping * conditions.yaw_rate;
        }

        // Roll damping from the fins.
        if conditions.velocity > 1.0 {
            let fin_area: f64 = config.active_stages().map(|(_, s)| s.fin_area).sum();
            coeffs.croll_damp = fin_area / conditions.reference_area.max(1e-9)
                * conditions.roll_rate
                * config.reference_length()
                / conditions.velocity;
            coeffs.croll = coeffs.croll_force - coeffs.croll_damp;
        }

        if let Some(warnings) = warnings {
            if conditions.aoa > AOA_WARNING_LIMIT {
                warnings.add(Warning::LargeAngleOfAttack);
            }
        }

        coeffs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::atmosphere::{AtmosphereModel, IsaAtmosphere};
    use crate::vehicle::{Rocket, RocketBuilder, StageBuilder};

    fn test_config() -> FlightConfiguration {
        let rocket: Rocket = RocketBuilder::new("aero-test")
            .stage(
                StageBuilder::new("single")
                    .diameter(0.1)
                    .length(1.2)
                    .cd(0.4)
                    .cp(0.9)
                    .build(),
            )
            .build();
        FlightConfiguration::new(rocket)
    }

    fn conditions(aoa: f64, mach: f64) -> FlightConditions {
        let config = test_config();
        let mut c = FlightConditions::still_air(&config, IsaAtmosphere.conditions(0.0));
        c.aoa = aoa;
        c.sin_aoa = aoa.sin();
        c.mach = mach;
        c.velocity = mach * c.atmosphere.speed_of_sound;
        c
    }

    #[test]
    fn zero_aoa_gives_zero_normal_force() {
        let config = test_config();
        let coeffs = SlenderBodyAero.coefficients(&config, &conditions(0.0, 0.3), None);
        assert_eq!(coeffs.cn, 0.0);
        assert!(coeffs.caxial > 0.0);
    }

    #[test]
    fn normal_force_grows_with_aoa() {
        let config = test_config();
        let small = SlenderBodyAero.coefficients(&config, &conditions(0.05, 0.3), None);
        let large = SlenderBodyAero.coefficients(&config, &conditions(0.15, 0.3), None);
        assert!(large.cn > small.cn);
    }

    #[test]
    fn drag_rises_toward_transonic() {
        let config = test_config();
        let slow = SlenderBodyAero.coefficients(&config, &conditions(0.0, 0.1), None);
        let fast = SlenderBodyAero.coefficients(&config, &conditions(0.0, 0.7), None);
        assert!(fast.cd > slow.cd);
    }

    #[test]
    fn large_aoa_warns_when_requested() {
        let config = test_config();
        let mut warnings = WarningSet::new();
        SlenderBodyAero.coefficients(&config, &conditions(0.5, 0.3), Some(&mut warnings));
        assert!(warnings.contains(&Warning::LargeAngleOfAttack));
    }
}
