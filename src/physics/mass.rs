use crate::sim::motor::MotorClusterState;
use crate::vehicle::FlightConfiguration;

// ---------------------------------------------------------------------------
// Mass properties
// ---------------------------------------------------------------------------

/// Mass properties of the active configuration at an instant.
#[derive(Debug, Clone, Copy)]
pub struct MassData {
    pub mass: f64,                  // kg
    pub cg_x: f64,                  // m aft of the nose
    pub longitudinal_inertia: f64,  // kg·m^2 about the CG, pitch/yaw
    pub rotational_inertia: f64,    // kg·m^2 about the roll axis
    pub propellant_mass: f64,       // kg remaining
}

/// Strategy computing mass, CG and inertia from the configuration and the
/// motor states at a given time.
pub trait MassModel: Send + Sync {
    fn mass_data(
        &self,
        config: &FlightConfiguration,
        motors: &[MotorClusterState],
        time: f64,
    ) -> MassData;
}

// ---------------------------------------------------------------------------
// Default component composition
// ---------------------------------------------------------------------------

/// Composes stage dry masses and linearly depleting motor propellant.
/// Motor mass sits at the aft end of its stage; stage inertias combine with
/// the parallel-axis shift to the composite CG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentMassModel;

impl MassModel for ComponentMassModel {
    fn mass_data(
        &self,
        config: &FlightConfiguration,
        motors: &[MotorClusterState],
        time: f64,
    ) -> MassData {
        let rocket = config.rocket();

        // (mass, absolute position) point masses
        let mut points: Vec<(f64, f64)> = Vec::new();
        let mut propellant_total = 0.0;

        for (n, stage) in config.active_stages() {
            let offset = rocket.stage_offset(n);
            points.push((stage.dry_mass, offset + stage.cg_x));

            if let Some(motor) = motors.iter().find(|m| m.id().stage == n) {
                let propellant = motor.propellant_mass_at(time);
                propellant_total += propellant;
                points.push((propellant, offset + stage.length));
            }
        }

        let mass: f64 = points.iter().map(|(m, _)| m).sum();
        if mass <= 0.0 {
            return MassData {
                mass: 0.0,
                cg_x: 0.0,
                longitudinal_inertia: 0.0,
                rotational_inertia: 0.0,
                propellant_mass: 0.0,
            };
        }

        let cg_x = points.iter().map(|(m, x)| m * x).sum::<f64>() / mass;

        // Parallel-axis composition of the stage inertias about the
        // composite CG; propellant treated as a point mass.
        let mut longitudinal = 0.0;
        let mut rotational = 0.0;
        for (n, stage) in config.active_stages() {
            let offset = rocket.stage_offset(n);
            let d = offset + stage.cg_x - cg_x;
            longitudinal += stage.longitudinal_inertia + stage.dry_mass * d * d;
            rotational += stage.rotational_inertia;

            if let Some(motor) = motors.iter().find(|m| m.id().stage == n) {
                let dp = offset + stage.length - cg_x;
                longitudinal += motor.propellant_mass_at(time) * dp * dp;
            }
        }

        MassData {
            mass,
            cg_x,
            longitudinal_inertia: longitudinal,
            rotational_inertia: rotational,
            propellant_mass: propellant_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::motor::MotorClusterState;
    use crate::vehicle::{Motor, MotorMount, RocketBuilder, StageBuilder};

    fn config_with_motor() -> (FlightConfiguration, Vec<MotorClusterState>) {
        let rocket = RocketBuilder::new("mass-test")
            .stage(
                StageBuilder::new("single")
                    .dry_mass(1.0)
                    .length(1.0)
                    .cg(0.5)
                    .motor_mount(MotorMount::new(Motor::constant("M", 20.0, 2.0, 0.5)))
                    .build(),
            )
            .build();
        let config = FlightConfiguration::new(rocket);
        let motors: Vec<MotorClusterState> = config
            .active_motor_mounts()
            .map(|(n, mount)| {
                let mut m = MotorClusterState::new(n, mount, true);
                m.arm();
                m
            })
            .collect();
        (config, motors)
    }

    #[test]
    fn full_propellant_before_ignition() {
        let (config, motors) = config_with_motor();
        let data = ComponentMassModel.mass_data(&config, &motors, 0.0);
        assert!((data.mass - 1.5).abs() < 1e-12);
        assert!((data.propellant_mass - 0.5).abs() < 1e-12);
        // Propellant at the aft end pulls the CG aft of the dry CG.
        assert!(data.cg_x > 0.5);
    }

    #[test]
    fn propellant_depletes_during_burn() {
        let (config, mut motors) = config_with_motor();
        motors[0].ignite(0.0);
        let data = ComponentMassModel.mass_data(&config, &motors, 1.0);
        assert!((data.propellant_mass - 0.25).abs() < 1e-9);
        let end = ComponentMassModel.mass_data(&config, &motors, 2.0);
        assert!(end.propellant_mass < 1e-9);
    }

    #[test]
    fn inertia_positive_and_shrinks_with_burn() {
        let (config, mut motors) = config_with_motor();
        let full = ComponentMassModel.mass_data(&config, &motors, 0.0);
        motors[0].ignite(0.0);
        let late = ComponentMassModel.mass_data(&config, &motors, 2.0);
        assert!(full.longitudinal_inertia > 0.0);
        assert!(late.mass < full.mass);
    }
}
