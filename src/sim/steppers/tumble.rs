use tracing::trace;

use crate::error::{SimResult, SimulationError};
use crate::physics::EPSILON;
use crate::sim::state::SimulationState;

use super::{
    check_nan_vec, euler_integrate, ground_impact_time, model_atmosphere, model_gravity,
    model_mass, model_wind, record_descent_point, DescentRecord, StepContext, Stepper,
    MIN_TIME_STEP, RECOVERY_TIME_STEP,
};

// ---------------------------------------------------------------------------
// Tumble stepper: unstable descent of a tumbling airframe
// ---------------------------------------------------------------------------

/// Drag coefficient of a flat-plate fin, from experiment.
const CD_FIN: f64 = 1.42;

/// Drag coefficient of a body tube broadside to the flow.
const CD_BODY_TUBE: f64 = 0.56;

/// Fin efficiency by fin count; index 0 is padding so `FIN_EFF[n]` is the
/// factor for n fins.
const FIN_EFF: [f64; 8] = [0.0, 0.5, 1.0, 1.41, 1.81, 1.73, 1.90, 1.85];

/// Integrates linear motion of a tumbling airframe; drag comes from the
/// fin and body-tube projected areas.  Orientation is not propagated.
#[derive(Debug, Clone, Default)]
pub struct TumbleStepper {
    cd: f64,
}

impl TumbleStepper {
    pub fn new() -> Self {
        Self::default()
    }

    fn compute_cd(state: &SimulationState) -> f64 {
        let mut fin_area = 0.0;
        let mut body_area = 0.0;
        for (_, stage) in state.configuration.active_stages() {
            if stage.fin_count > 0 && stage.fin_area > 0.0 {
                let count = stage.fin_count.min(FIN_EFF.len() - 1);
                fin_area += stage.fin_area * FIN_EFF[count] / count as f64;
            }
            body_area += stage.body_tube_area;
        }
        (CD_FIN * fin_area + CD_BODY_TUBE * body_area)
            / state.configuration.reference_area().max(EPSILON)
    }
}

impl Stepper for TumbleStepper {
    fn initialize(
        &mut self,
        state: &mut SimulationState,
        _ctx: &mut StepContext<'_>,
    ) -> SimResult<()> {
        self.cd = Self::compute_cd(state);
        trace!(cd = self.cd, "tumble stepper initialized");
        Ok(())
    }

    fn step(
        &mut self,
        state: &mut SimulationState,
        ctx: &mut StepContext<'_>,
        max_time_step: f64,
    ) -> SimResult<()> {
        let atmosphere = model_atmosphere(state, ctx)?;
        let wind = model_wind(state, ctx)?;
        let airspeed = state.velocity + wind;
        let speed = airspeed.norm();

        let mach = speed / atmosphere.speed_of_sound;
        let dynamic_pressure = 0.5 * atmosphere.density * speed * speed;
        let drag_force =
            state.configuration.reference_area() * self.cd * dynamic_pressure;

        let mass_data = model_mass(state, ctx)?;
        if mass_data.mass < EPSILON {
            return Err(SimulationError::NoActiveMass);
        }

        let mut acceleration = if speed > 0.001 {
            airspeed.normalize() * (-drag_force / mass_data.mass)
        } else {
            nalgebra::Vector3::zeros()
        };
        let gravity = model_gravity(state, ctx)?;
        acceleration.z -= gravity;
        let coriolis = ctx
            .conditions
            .geodetic
            .coriolis_acceleration(&state.world_position, &state.velocity);
        acceleration += coriolis;
        check_nan_vec(&acceleration, "tumble acceleration")?;

        // Step bound inversely proportional to the acceleration, refined by
        // the jerk since the previous step.
        let mut time_step = if acceleration.norm() > EPSILON {
            (0.5 / acceleration.norm()).min(RECOVERY_TIME_STEP)
        } else {
            RECOVERY_TIME_STEP
        };
        if state.previous_time_step > 0.0 {
            let jerk =
                ((acceleration - state.acceleration) / state.previous_time_step).norm();
            if jerk > EPSILON {
                time_step = time_step.min(1.0 / jerk);
            }
        }
        time_step = time_step.clamp(MIN_TIME_STEP, max_time_step.max(MIN_TIME_STEP));

        let (mut new_position, mut new_velocity) =
            euler_integrate(&state.position, &state.velocity, &acceleration, time_step);

        // Exact ground impact: shorten to the quadratic root and clamp the
        // altitude so no negative residue survives.
        if new_position.z < 0.0 {
            time_step =
                ground_impact_time(acceleration.z, state.velocity.z, state.position.z)
                    .max(MIN_TIME_STEP);
            let (p, v) =
                euler_integrate(&state.position, &state.velocity, &acceleration, time_step);
            new_position = p;
            new_velocity = v;
            new_position.z = 0.0;
            trace!(time_step, "tumble descent hit the ground");
        }

        state.time += time_step;
        state.previous_time_step = time_step;
        state.position = new_position;
        state.velocity = new_velocity;
        state.acceleration = acceleration;
        state.world_position = ctx
            .conditions
            .geodetic
            .add_coordinate(&ctx.conditions.launch_site, &state.position);

        record_descent_point(
            state,
            ctx,
            &DescentRecord {
                atmosphere,
                wind_speed: wind.norm(),
                airspeed: speed,
                mach,
                cd: self.cd,
                drag_force,
                mass: mass_data,
                gravity,
                coriolis,
                acceleration,
                time_step,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::physics::geodetic::GeodeticComputation;
    use crate::physics::gravity::ConstantGravity;
    use crate::sim::conditions::SimulationConditions;
    use crate::sim::listener::ListenerSet;
    use crate::vehicle::{FlightConfiguration, RocketBuilder, StageBuilder};

    fn tumble_setup() -> (SimulationState, SimulationConditions, TumbleStepper) {
        let rocket = RocketBuilder::new("tumble-test")
            .stage(
                StageBuilder::new("single")
                    .dry_mass(0.5)
                    .diameter(0.05)
                    .fins(4, 0.012)
                    .body_tube_area(0.04)
                    .build(),
            )
            .build();
        let mut conditions = SimulationConditions::default();
        conditions.geodetic = GeodeticComputation::Flat;
        conditions.gravity = Arc::new(ConstantGravity(9.81));

        let mut state = SimulationState::new(FlightConfiguration::new(rocket), &conditions);
        state.position.z = 400.0;
        state.velocity.z = -20.0;
        state.liftoff = true;
        state.launch_rod_cleared = true;
        state.apogee_reached = true;
        state.tumbling = true;
        state.branch.add_point();
        (state, conditions, TumbleStepper::new())
    }

    #[test]
    fn cd_combines_fin_and_body_areas() {
        let (mut state, conditions, mut stepper) = tumble_setup();
        let mut listeners = ListenerSet::new();
        let mut ctx = StepContext { conditions: &conditions, listeners: &mut listeners };
        stepper.initialize(&mut state, &mut ctx).unwrap();

        let ref_area = std::f64::consts::FRAC_PI_4 * 0.05 * 0.05;
        let expected = (CD_FIN * 0.012 * FIN_EFF[4] / 4.0 + CD_BODY_TUBE * 0.04) / ref_area;
        assert!((stepper.cd - expected).abs() < 1e-9);
    }

    #[test]
    fn tumbling_descent_approaches_terminal_velocity() {
        let (mut state, conditions, mut stepper) = tumble_setup();
        let mut listeners = ListenerSet::new();
        let mut ctx = StepContext { conditions: &conditions, listeners: &mut listeners };
        stepper.initialize(&mut state, &mut ctx).unwrap();

        let mut previous_vz = state.velocity.z;
        for _ in 0..200 {
            if state.position.z <= 0.0 {
                break;
            }
            stepper.step(&mut state, &mut ctx, f64::MAX).unwrap();
            previous_vz = state.velocity.z;
        }
        // High broadside drag keeps a light airframe slow.
        assert!(previous_vz > -60.0);
        assert!(state.time > 0.0);
    }

    #[test]
    fn tumble_ground_hit_clamps_altitude() {
        let (mut state, conditions, mut stepper) = tumble_setup();
        state.position.z = 0.3;
        state.velocity.z = -15.0;
        let mut listeners = ListenerSet::new();
        let mut ctx = StepContext { conditions: &conditions, listeners: &mut listeners };
        stepper.initialize(&mut state, &mut ctx).unwrap();
        stepper.step(&mut state, &mut ctx, f64::MAX).unwrap();
        assert_eq!(state.position.z, 0.0);
    }
}
