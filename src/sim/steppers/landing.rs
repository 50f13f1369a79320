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
// Landing stepper: ballistic descent under deployed-device drag
// ---------------------------------------------------------------------------

/// Integrates linear motion only; orientation is not propagated.  Drag
/// comes from the sum of the deployed recovery devices' CdA.
#[derive(Debug, Clone, Default)]
pub struct LandingStepper {
    /// ΣCdA of the deployed devices, m^2.
    drag_area: f64,
}

impl LandingStepper {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Stepper for LandingStepper {
    fn initialize(
        &mut self,
        state: &mut SimulationState,
        _ctx: &mut StepContext<'_>,
    ) -> SimResult<()> {
        let rocket = state.configuration.rocket();
        self.drag_area = state
            .deployed_recovery_devices
            .iter()
            .filter(|(stage, _)| state.configuration.is_stage_active(*stage))
            .filter_map(|&(stage, index)| {
                rocket.stages[stage].recovery_devices.get(index)
            })
            .map(|device| device.drag_area())
            .sum();
        trace!(drag_area = self.drag_area, "landing stepper initialized");
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
        let drag_force = 0.5 * self.drag_area * atmosphere.density * speed * speed;

        let mass_data = model_mass(state, ctx)?;
        if mass_data.mass < EPSILON {
            return Err(SimulationError::NoActiveMass);
        }

        let mut acceleration = if speed > EPSILON {
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
        check_nan_vec(&acceleration, "descent acceleration")?;

        // Tentative step: the fixed recovery step, shrunk where the
        // acceleration is large.
        let mut time_step = RECOVERY_TIME_STEP;
        let accel_norm = acceleration.norm();
        if accel_norm > EPSILON {
            time_step = time_step.min(1.0 / accel_norm);
        }

        // Honor the event bound; stop just short of it to capture
        // discontinuities such as a chute opening.
        if max_time_step < time_step {
            time_step = if max_time_step > MIN_TIME_STEP {
                max_time_step - MIN_TIME_STEP
            } else {
                max_time_step
            };
        }
        time_step = time_step.max(MIN_TIME_STEP);

        let (mut new_position, mut new_velocity) =
            euler_integrate(&state.position, &state.velocity, &acceleration, time_step);

        // Check whether altitude or either of its first two derivatives
        // changes sign inside the step and shorten to that instant.
        let mut hit_ground = false;
        let mut t = time_step;
        if new_position.z < 0.0 {
            t = ground_impact_time(acceleration.z, state.velocity.z, state.position.z);
            hit_ground = true;
            trace!(t, "ground hit shortens the descent step");
        } else if state.velocity.z * new_velocity.z < 0.0 {
            // Vertical velocity changes sign: apogee crossing.
            t = (state.velocity.z / acceleration.z).abs();
            trace!(t, "apogee crossing shortens the descent step");
        } else if speed > EPSILON {
            // Estimate the end-of-step acceleration from the jerk
            // (dA/dt = dA/dV · dV/dt) and shorten the step if the vertical
            // acceleration would change sign, to keep descent-rate
            // oscillation from building up.
            let df_dv = self.drag_area * atmosphere.density * speed;
            let da_dv = airspeed.normalize() * (df_dv / mass_data.mass);
            let jerk = acceleration.component_mul(&da_dv);
            let projected = acceleration.z + jerk.z * time_step;
            if projected * acceleration.z < -EPSILON && jerk.z.abs() > EPSILON {
                t = (acceleration.z / jerk.z).abs();
                trace!(t, "oscillation avoidance shortens the descent step");
            }
        }
        t = t.max(MIN_TIME_STEP);

        if (t - time_step).abs() > EPSILON {
            time_step = t;
            if max_time_step - time_step < MIN_TIME_STEP {
                time_step = max_time_step;
            }
            let (p, v) =
                euler_integrate(&state.position, &state.velocity, &acceleration, time_step);
            new_position = p;
            new_velocity = v;
            if hit_ground {
                // No negative residue after the exact-impact re-integration.
                new_position.z = 0.0;
            }
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
                cd: self.drag_area / state.configuration.reference_area().max(EPSILON),
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
