use std::f64::consts::PI;

use nalgebra::{UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::data::types::FlightDataType;
use crate::error::{SimResult, SimulationError};
use crate::physics::aerodynamics::{AeroCoefficients, FlightConditions};
use crate::physics::atmosphere::Atmosphere;
use crate::physics::geodetic::GeodeticComputation;
use crate::physics::mass::MassData;
use crate::physics::EPSILON;
use crate::sim::listener::AccelerationData;
use crate::sim::state::SimulationState;

use super::{
    check_nan, check_nan_vec, model_atmosphere, model_gravity, model_mass, model_thrust,
    model_wind, StepContext, Stepper, MIN_TIME_STEP,
};

// ---------------------------------------------------------------------------
// Tuning constants
// ---------------------------------------------------------------------------

/// XORed into the user seed so a zero seed still jitters.
const SEED_RANDOMIZATION: u64 = 0x23E3_A01F;

/// Random amount added to the pitch and yaw moment coefficients, plus or
/// minus, to break artificial symmetry in an otherwise perfect flight.
const PITCH_YAW_RANDOM: f64 = 0.0005;

/// Maximum roll step.  An uneven division of the full circle so the
/// simulation samples many roll orientations against the wind.
const MAX_ROLL_STEP_ANGLE: f64 = 2.0 * 28.32 * PI / 180.0;

const MAX_ROLL_RATE_CHANGE: f64 = 2.0 * PI / 180.0;
const MAX_PITCH_CHANGE: f64 = 4.0 * PI / 180.0;

/// Magnitude-squared bound beyond which the run is a numerical blow-up.
const SANITY_BOUND_SQ: f64 = 1e18;

// ---------------------------------------------------------------------------
// Immutable snapshots and derivatives
// ---------------------------------------------------------------------------

/// The 13 dynamic degrees of freedom an RK4 sub-stage is evaluated at.
/// Snapshots are explicit copies, so the k1..k4 evaluations never alias the
/// state being updated.
#[derive(Debug, Clone, Copy)]
struct Snapshot {
    time: f64,
    position: Vector3<f64>,
    velocity: Vector3<f64>,
    orientation: UnitQuaternion<f64>,
    angular_velocity: Vector3<f64>,
}

impl Snapshot {
    fn of(state: &SimulationState) -> Self {
        Self {
            time: state.time,
            position: state.position,
            velocity: state.velocity,
            orientation: state.orientation,
            angular_velocity: state.angular_velocity,
        }
    }

    /// The snapshot advanced by `derivs` over `dt`, orientation composed
    /// with the rotation increment.
    fn advanced(&self, derivs: &Derivs, dt: f64) -> Self {
        Self {
            time: self.time + dt,
            position: self.position + derivs.velocity * dt,
            velocity: self.velocity + derivs.acceleration * dt,
            orientation: UnitQuaternion::from_scaled_axis(derivs.angular_velocity * dt)
                * self.orientation,
            angular_velocity: self.angular_velocity + derivs.angular_acceleration * dt,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Derivs {
    velocity: Vector3<f64>,
    acceleration: Vector3<f64>,
    angular_velocity: Vector3<f64>,
    angular_acceleration: Vector3<f64>,
}

/// Intermediate values of one step, for data recording and step selection.
#[derive(Debug, Clone, Default)]
struct StepData {
    time_step: f64,
    thrust: f64,
    drag: f64,
    gravity: f64,
    wind_speed: f64,
    atmosphere: Option<Atmosphere>,
    conditions: Option<FlightConditions>,
    coefficients: Option<AeroCoefficients>,
    mass: Option<MassData>,
    coriolis: Vector3<f64>,
    linear_acceleration: Vector3<f64>,
    angular_acceleration: Vector3<f64>,
    lateral_pitch_rate: f64,
    roll_acceleration: f64,
    lateral_pitch_acceleration: f64,
    theta: f64,
}

/// Rotate the xy components of a vector by `theta` around the z axis.
fn rotate_z(v: &Vector3<f64>, theta: f64) -> Vector3<f64> {
    let (s, c) = theta.sin_cos();
    Vector3::new(c * v.x - s * v.y, s * v.x + c * v.y, v.z)
}

// ---------------------------------------------------------------------------
// RK4 ascent stepper
// ---------------------------------------------------------------------------

/// Powered/aerodynamic ascent integrator: classical RK4 over position,
/// velocity, orientation quaternion and angular velocity, with adaptive
/// step selection and a thrust estimate-then-correct pass.
pub struct Rk4Stepper {
    launch_rod_direction: Vector3<f64>,
    rng: StdRng,
    max_z_velocity: f64,
    start_warning_time: Option<f64>,
}

impl Default for Rk4Stepper {
    fn default() -> Self {
        Self::new()
    }
}

impl Rk4Stepper {
    pub fn new() -> Self {
        Self {
            launch_rod_direction: Vector3::z(),
            rng: StdRng::seed_from_u64(SEED_RANDOMIZATION),
            max_z_velocity: 0.0,
            start_warning_time: None,
        }
    }

    // -- flight conditions ---------------------------------------------------

    fn calculate_flight_conditions(
        &mut self,
        snap: &Snapshot,
        state: &SimulationState,
        ctx: &mut StepContext<'_>,
        data: &mut StepData,
    ) -> SimResult<FlightConditions> {
        if let Some(c) = ctx.listeners.pre_flight_conditions(state) {
            data.theta = c.theta;
            data.lateral_pitch_rate = c.pitch_rate.hypot(c.yaw_rate);
            data.atmosphere = Some(c.atmosphere);
            return Ok(c);
        }

        let atmosphere = model_atmosphere(state, ctx)?;
        let wind = model_wind(state, ctx)?;
        data.wind_speed = wind.norm();

        // Airspeed in body axes
        let airspeed_world = snap.velocity + wind;
        let airspeed = snap.orientation.inverse_transform_vector(&airspeed_world);

        let lateral = airspeed.x.hypot(airspeed.y);
        let theta = if lateral > 1e-4 {
            airspeed.y.atan2(airspeed.x)
        } else {
            0.0
        };

        let velocity = airspeed.norm();
        let (aoa, sin_aoa) = if velocity > 0.01 {
            // The monotonic cosine gives the angle; the sine is a division.
            (
                (airspeed.z / velocity).clamp(-1.0, 1.0).acos(),
                lateral / velocity,
            )
        } else {
            (0.0, 0.0)
        };

        // Roll, pitch and yaw rates in the theta-aligned body frame
        let rot = snap
            .orientation
            .inverse_transform_vector(&snap.angular_velocity);
        let rot = rotate_z(&rot, -theta);
        let (pitch_rate, yaw_rate) = if lateral < 0.001 {
            (0.0, 0.0)
        } else {
            (rot.y, rot.x)
        };

        let conditions = FlightConditions {
            atmosphere,
            velocity,
            mach: velocity / atmosphere.speed_of_sound,
            aoa,
            sin_aoa,
            theta,
            roll_rate: rot.z,
            pitch_rate,
            yaw_rate,
            reference_area: state.configuration.reference_area(),
            reference_length: state.configuration.reference_length(),
        };
        let conditions = ctx.listeners.post_flight_conditions(state, conditions);

        data.theta = conditions.theta;
        data.lateral_pitch_rate = conditions.pitch_rate.hypot(conditions.yaw_rate);
        data.atmosphere = Some(conditions.atmosphere);
        Ok(conditions)
    }

    // -- aerodynamic coefficients -------------------------------------------

    fn calculate_coefficients(
        &mut self,
        snap: &Snapshot,
        state: &mut SimulationState,
        ctx: &mut StepContext<'_>,
        conditions: &FlightConditions,
    ) -> SimResult<AeroCoefficients> {
        if let Some(coeffs) = ctx.listeners.pre_aerodynamics(state) {
            return Ok(coeffs);
        }

        // Aerodynamic warnings are suppressed while on the rod, for 0.25 s
        // after leaving it, and once the vertical velocity has dropped below
        // 20 % of its maximum.
        self.max_z_velocity = self.max_z_velocity.max(snap.velocity.z);
        let mut use_warnings = state.launch_rod_cleared;
        if state.launch_rod_cleared && self.start_warning_time.is_none() {
            self.start_warning_time = Some(snap.time + 0.25);
        }
        match self.start_warning_time {
            Some(t0) if snap.time >= t0 => {}
            _ => use_warnings = false,
        }
        if snap.velocity.z < 0.2 * self.max_z_velocity {
            use_warnings = false;
        }

        let mut coeffs = if use_warnings {
            ctx.conditions.aerodynamics.coefficients(
                &state.configuration,
                conditions,
                Some(&mut state.warnings),
            )
        } else {
            ctx.conditions
                .aerodynamics
                .coefficients(&state.configuration, conditions, None)
        };

        // Break artificial symmetry so the flight is not over-perfect.
        coeffs.cm += PITCH_YAW_RANDOM * 2.0 * (self.rng.gen::<f64>() - 0.5);
        coeffs.cyaw += PITCH_YAW_RANDOM * 2.0 * (self.rng.gen::<f64>() - 0.5);

        Ok(ctx.listeners.post_aerodynamics(state, coeffs))
    }

    // -- derivative evaluation ----------------------------------------------

    /// Evaluate the state derivative at a snapshot.  Pure in the dynamic
    /// quantities; warnings and hook side effects go through `state`/`ctx`.
    fn compute_derivatives(
        &mut self,
        snap: &Snapshot,
        state: &mut SimulationState,
        ctx: &mut StepContext<'_>,
        data: &mut StepData,
    ) -> SimResult<Derivs> {
        if let Some(a) = ctx.listeners.pre_acceleration(state) {
            data.linear_acceleration = a.linear;
            data.angular_acceleration = a.angular;
            return Ok(Derivs {
                velocity: snap.velocity,
                acceleration: a.linear,
                angular_velocity: snap.angular_velocity,
                angular_acceleration: a.angular,
            });
        }

        let conditions = self.calculate_flight_conditions(snap, state, ctx, data)?;
        let coeffs = self.calculate_coefficients(snap, state, ctx, &conditions)?;
        let mass = model_mass(state, ctx)?;
        if mass.mass < EPSILON {
            return Err(SimulationError::NoActiveMass);
        }

        let dyn_p = 0.5 * conditions.atmosphere.density * conditions.velocity * conditions.velocity;
        let ref_area = conditions.reference_area;
        let ref_len = conditions.reference_length.max(EPSILON);

        // Linear forces in rocket coordinates: normal and side forces
        // oppose the lateral airflow, thrust minus axial drag along the
        // body axis.
        data.drag = coeffs.caxial * dyn_p * ref_area;
        let normal_force = coeffs.cn * dyn_p * ref_area;
        let side_force = coeffs.cside * dyn_p * ref_area;
        let force_z = data.thrust - data.drag;

        let mut linear = Vector3::new(
            -normal_force / mass.mass,
            -side_force / mass.mass,
            force_z / mass.mass,
        );
        linear = rotate_z(&linear, data.theta);
        linear = snap.orientation.transform_vector(&linear);

        data.gravity = model_gravity(state, ctx)?;
        linear.z -= data.gravity;

        data.coriolis = ctx
            .conditions
            .geodetic
            .coriolis_acceleration(&state.world_position, &snap.velocity);
        linear += data.coriolis;

        let angular;
        if !state.launch_rod_cleared {
            // Still guided: project onto the rod axis, no rotation.
            linear = self.launch_rod_direction * linear.dot(&self.launch_rod_direction);
            angular = Vector3::zeros();
            data.roll_acceleration = 0.0;
            data.lateral_pitch_acceleration = 0.0;
        } else {
            // Shift the moments from the nose to the CG.
            let cm_cg = coeffs.cm - coeffs.cn * mass.cg_x / ref_len;
            let cyaw_cg = coeffs.cyaw - coeffs.cside * mass.cg_x / ref_len;

            let moment_x = -cyaw_cg * dyn_p * ref_area * ref_len;
            let moment_y = cm_cg * dyn_p * ref_area * ref_len;
            let moment_z = coeffs.croll * dyn_p * ref_area * ref_len;

            let mut a = Vector3::new(
                moment_x / mass.longitudinal_inertia,
                moment_y / mass.longitudinal_inertia,
                moment_z / mass.rotational_inertia,
            );
            data.roll_acceleration = a.z;
            data.lateral_pitch_acceleration = a.x.abs().max(a.y.abs());

            a = rotate_z(&a, data.theta);
            angular = snap.orientation.transform_vector(&a);
        }

        data.linear_acceleration = linear;
        data.angular_acceleration = angular;

        let hooked = ctx.listeners.post_acceleration(
            state,
            AccelerationData { linear, angular },
        );
        data.linear_acceleration = hooked.linear;
        data.angular_acceleration = hooked.angular;

        data.conditions = Some(conditions);
        data.coefficients = Some(coeffs);
        data.mass = Some(mass);

        let derivs = Derivs {
            velocity: snap.velocity,
            acceleration: hooked.linear,
            angular_velocity: snap.angular_velocity,
            angular_acceleration: hooked.angular,
        };
        check_nan_vec(&derivs.velocity, "velocity")?;
        check_nan_vec(&derivs.acceleration, "linear acceleration")?;
        check_nan_vec(&derivs.angular_velocity, "angular velocity")?;
        check_nan_vec(&derivs.angular_acceleration, "angular acceleration")?;
        Ok(derivs)
    }

    // -- data recording ------------------------------------------------------

    fn record_point(&self, state: &mut SimulationState, ctx: &StepContext<'_>, data: &StepData) {
        let position = state.position;
        let velocity = state.velocity;
        let world = state.world_position;
        let rod_cleared = state.launch_rod_cleared;
        let length = state.configuration.active_length();

        let branch = &mut state.branch;
        branch.add_point();
        branch.set_value(FlightDataType::Time, state.time);
        branch.set_value(FlightDataType::TimeStep, data.time_step);
        branch.set_value(FlightDataType::Altitude, position.z);
        branch.set_value(FlightDataType::PositionEast, position.x);
        branch.set_value(FlightDataType::PositionNorth, position.y);
        branch.set_value(FlightDataType::LateralDistance, position.x.hypot(position.y));
        branch.set_value(FlightDataType::Latitude, world.latitude);
        branch.set_value(FlightDataType::Longitude, world.longitude);

        branch.set_value(FlightDataType::VelocityZ, velocity.z);
        branch.set_value(FlightDataType::VelocityXY, velocity.x.hypot(velocity.y));
        branch.set_value(FlightDataType::VelocityTotal, velocity.norm());

        branch.set_value(FlightDataType::AccelerationZ, data.linear_acceleration.z);
        branch.set_value(
            FlightDataType::AccelerationXY,
            data.linear_acceleration.x.hypot(data.linear_acceleration.y),
        );
        branch.set_value(
            FlightDataType::AccelerationTotal,
            data.linear_acceleration.norm(),
        );

        branch.set_value(FlightDataType::ThrustForce, data.thrust);
        branch.set_value(FlightDataType::DragForce, data.drag);
        branch.set_value(FlightDataType::Gravity, data.gravity);
        branch.set_value(FlightDataType::WindVelocity, data.wind_speed);

        if let Some(mass) = &data.mass {
            branch.set_value(FlightDataType::Mass, mass.mass);
            branch.set_value(FlightDataType::PropellantMass, mass.propellant_mass);
            branch.set_value(FlightDataType::LongitudinalInertia, mass.longitudinal_inertia);
            branch.set_value(FlightDataType::RotationalInertia, mass.rotational_inertia);
            branch.set_value(FlightDataType::CgLocation, mass.cg_x);
        }

        if let Some(coeffs) = &data.coefficients {
            branch.set_value(FlightDataType::DragCoeff, coeffs.cd);
            branch.set_value(FlightDataType::AxialDragCoeff, coeffs.caxial);

            // CP and stability are meaningless at the huge launch AoA.
            if rod_cleared {
                branch.set_value(FlightDataType::CpLocation, coeffs.cp_x);
                if let (Some(mass), Some(conditions)) = (&data.mass, &data.conditions) {
                    branch.set_value(
                        FlightDataType::Stability,
                        (coeffs.cp_x - mass.cg_x) / conditions.reference_length.max(EPSILON),
                    );
                }
            }
        }

        if let Some(conditions) = &data.conditions {
            branch.set_value(FlightDataType::MachNumber, conditions.mach);
            branch.set_value(FlightDataType::AngleOfAttack, conditions.aoa);
            branch.set_value(FlightDataType::RollRate, conditions.roll_rate);
            branch.set_value(FlightDataType::PitchRate, conditions.pitch_rate);
            branch.set_value(FlightDataType::YawRate, conditions.yaw_rate);
            branch.set_value(FlightDataType::ReferenceLength, conditions.reference_length);
            branch.set_value(FlightDataType::ReferenceArea, conditions.reference_area);
            branch.set_value(
                FlightDataType::ReynoldsNumber,
                conditions.velocity * length / conditions.atmosphere.kinematic_viscosity,
            );
            branch.set_value(FlightDataType::AirTemperature, conditions.atmosphere.temperature);
            branch.set_value(FlightDataType::AirPressure, conditions.atmosphere.pressure);
            branch.set_value(FlightDataType::SpeedOfSound, conditions.atmosphere.speed_of_sound);
        }

        if ctx.conditions.geodetic != GeodeticComputation::Flat {
            branch.set_value(FlightDataType::CoriolisAcceleration, data.coriolis.norm());
        }
    }
}

impl Stepper for Rk4Stepper {
    fn initialize(
        &mut self,
        _state: &mut SimulationState,
        ctx: &mut StepContext<'_>,
    ) -> SimResult<()> {
        let angle = ctx.conditions.launch_rod_angle;
        let azimuth = ctx.conditions.launch_rod_direction;
        self.launch_rod_direction = Vector3::new(
            angle.sin() * (std::f64::consts::FRAC_PI_2 - azimuth).cos(),
            angle.sin() * (std::f64::consts::FRAC_PI_2 - azimuth).sin(),
            angle.cos(),
        );
        self.rng = StdRng::seed_from_u64(ctx.conditions.random_seed ^ SEED_RANDOMIZATION);
        self.max_z_velocity = 0.0;
        self.start_warning_time = None;
        Ok(())
    }

    fn step(
        &mut self,
        state: &mut SimulationState,
        ctx: &mut StepContext<'_>,
        max_time_step: f64,
    ) -> SimResult<()> {
        let mut data = StepData::default();

        // Start from the previous step, which the initial thrust estimate
        // is computed over; at most maxTimeStep, at least MIN_TIME_STEP.
        data.time_step = state
            .previous_time_step
            .min(max_time_step)
            .max(MIN_TIME_STEP);
        check_nan(data.time_step, "time step")?;

        data.thrust = model_thrust(state, ctx, data.time_step)?;

        let base = Snapshot::of(state);
        let mut k1 = self.compute_derivatives(&base, state, ctx, &mut data)?;

        // Select the actual time step: the minimum of
        //   dt[0]  user-selected step (1/5th while on the rod)
        //   dt[1]  the caller's bound (time to the next event)
        //   dt[2]  max angle step / lateral pitch rate
        //   dt[3]  max roll step / roll rate
        //   dt[4]  max roll rate change / roll acceleration
        //   dt[5]  max pitch change / lateral pitch acceleration
        //   dt[6]  (remaining rod length / speed) / 10 while on the rod
        //   dt[7]  1.5x the previous step
        // floored at 1/20th of the user step.
        let user_step = ctx.conditions.time_step.max(MIN_TIME_STEP);
        let roll_rate = data.conditions.as_ref().map_or(0.0, |c| c.roll_rate);

        let mut dt = [f64::MAX; 8];
        dt[0] = user_step;
        dt[1] = max_time_step;
        dt[2] = ctx.conditions.max_angle_step / data.lateral_pitch_rate;
        dt[3] = (MAX_ROLL_STEP_ANGLE / roll_rate).abs();
        dt[4] = (MAX_ROLL_RATE_CHANGE / data.roll_acceleration).abs();
        dt[5] = (MAX_PITCH_CHANGE / data.lateral_pitch_acceleration).abs();
        if !state.launch_rod_cleared {
            dt[0] /= 5.0;
            let speed = k1.velocity.norm();
            if speed > EPSILON {
                let remaining =
                    (state.effective_launch_rod_length - base.position.norm()).max(0.0);
                dt[6] = remaining / speed / 10.0;
            }
        }
        dt[7] = 1.5 * state.previous_time_step;

        data.time_step = f64::MAX;
        let mut limiting = 0;
        for (i, &candidate) in dt.iter().enumerate() {
            if candidate < data.time_step {
                data.time_step = candidate;
                limiting = i;
            }
        }
        let floor = user_step / 20.0;
        if data.time_step < floor {
            trace!(
                step = data.time_step,
                limiting,
                floor,
                "time step too small, clamping to floor"
            );
            data.time_step = floor;
        } else {
            trace!(step = data.time_step, limiting, "selected time step");
        }
        check_nan(data.time_step, "time step")?;

        // The thrust was estimated over the previous step's length; correct
        // it for the chosen step.  A >10 % discrepancy recomputes k1 (the
        // error affects 1/6th of the total, so up to 10 % is tolerable).
        let thrust_estimate = data.thrust;
        data.thrust = model_thrust(state, ctx, data.time_step)?;
        let thrust_diff = (data.thrust - thrust_estimate).abs();
        if thrust_diff > 0.01 * thrust_estimate {
            if thrust_diff > 0.1 * thrust_estimate + 0.001 {
                debug!(
                    estimate = thrust_estimate,
                    correct = data.thrust,
                    step = data.time_step,
                    "thrust estimate off by more than 10%, recomputing k1"
                );
                k1 = self.compute_derivatives(&base, state, ctx, &mut data)?;
            } else {
                trace!(
                    estimate = thrust_estimate,
                    correct = data.thrust,
                    "thrust estimate differs, error acceptable"
                );
            }
        }

        // The values recorded for this step are the k1-phase ones.
        let record = data.clone();
        let h = data.time_step;

        //// k2 = f(t + h/2, y + k1*h/2)
        let k2 = self.compute_derivatives(&base.advanced(&k1, h / 2.0), state, ctx, &mut data)?;
        //// k3 = f(t + h/2, y + k2*h/2)
        let k3 = self.compute_derivatives(&base.advanced(&k2, h / 2.0), state, ctx, &mut data)?;
        //// k4 = f(t + h, y + k3*h)
        let k4 = self.compute_derivatives(&base.advanced(&k3, h), state, ctx, &mut data)?;

        //// y(n+1) = y(n) + h*(k1 + 2*k2 + 2*k3 + k4)/6
        let delta_v = (k1.acceleration
            + 2.0 * (k2.acceleration + k3.acceleration)
            + k4.acceleration)
            * (h / 6.0);
        let delta_p =
            (k1.velocity + 2.0 * (k2.velocity + k3.velocity) + k4.velocity) * (h / 6.0);
        let delta_r = (k1.angular_acceleration
            + 2.0 * (k2.angular_acceleration + k3.angular_acceleration)
            + k4.angular_acceleration)
            * (h / 6.0);
        let delta_o = (k1.angular_velocity
            + 2.0 * (k2.angular_velocity + k3.angular_velocity)
            + k4.angular_velocity)
            * (h / 6.0);

        state.velocity += delta_v;
        state.position += delta_p;
        state.angular_velocity += delta_r;
        let mut orientation = UnitQuaternion::from_scaled_axis(delta_o) * state.orientation;
        orientation.renormalize();
        state.orientation = orientation;

        state.world_position = ctx
            .conditions
            .geodetic
            .add_coordinate(&ctx.conditions.launch_site, &state.position);
        state.time += h;
        state.previous_time_step = h;
        state.acceleration = record.linear_acceleration;

        // Hard sanity bound on the propagated magnitudes.
        if state.velocity.norm_squared() > SANITY_BOUND_SQ
            || state.position.norm_squared() > SANITY_BOUND_SQ
            || state.angular_velocity.norm_squared() > SANITY_BOUND_SQ
        {
            return Err(SimulationError::ValuesOutOfRange);
        }

        self.record_point(state, ctx, &record);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::data::warnings::WarningSet;
    use crate::physics::aerodynamics::AerodynamicModel;
    use crate::physics::gravity::ConstantGravity;
    use crate::physics::wind::CalmWind;
    use crate::sim::conditions::SimulationConditions;
    use crate::sim::listener::ListenerSet;
    use crate::vehicle::{
        FlightConfiguration, Motor, MotorMount, RocketBuilder, StageBuilder,
    };

    /// No aerodynamic forces at all.
    struct NoAero;

    impl AerodynamicModel for NoAero {
        fn coefficients(
            &self,
            _config: &FlightConfiguration,
            _conditions: &FlightConditions,
            _warnings: Option<&mut WarningSet>,
        ) -> AeroCoefficients {
            AeroCoefficients::default()
        }
    }

    fn vacuum_conditions() -> SimulationConditions {
        let mut c = SimulationConditions::default();
        c.geodetic = GeodeticComputation::Flat;
        c.gravity = Arc::new(ConstantGravity(9.81));
        c.wind = Arc::new(CalmWind);
        c.aerodynamics = Arc::new(NoAero);
        c.time_step = 0.01;
        c
    }

    fn free_state(conditions: &SimulationConditions) -> SimulationState {
        let rocket = RocketBuilder::new("rk4-test")
            .stage(StageBuilder::new("single").dry_mass(1.0).build())
            .build();
        let mut state = SimulationState::new(FlightConfiguration::new(rocket), conditions);
        state.liftoff = true;
        state.launch_rod_cleared = true;
        state
    }

    #[test]
    fn freefall_step_matches_kinematics() {
        let conditions = vacuum_conditions();
        let mut state = free_state(&conditions);
        state.position.z = 1000.0;

        let mut listeners = ListenerSet::new();
        let mut ctx = StepContext { conditions: &conditions, listeners: &mut listeners };
        let mut stepper = Rk4Stepper::new();
        stepper.initialize(&mut state, &mut ctx).unwrap();
        stepper.step(&mut state, &mut ctx, 0.01).unwrap();

        let h = state.previous_time_step;
        assert!(h > 0.0);
        let expected_z = 1000.0 - 0.5 * 9.81 * h * h;
        let expected_vz = -9.81 * h;
        assert!((state.position.z - expected_z).abs() < 1e-9, "z = {}", state.position.z);
        assert!((state.velocity.z - expected_vz).abs() < 1e-9, "vz = {}", state.velocity.z);
    }

    #[test]
    fn rod_projection_keeps_motion_axial_and_rotation_zero() {
        let conditions = vacuum_conditions();
        let rocket = RocketBuilder::new("rod-test")
            .stage(
                StageBuilder::new("single")
                    .dry_mass(0.08)
                    .motor_mount(MotorMount::new(Motor::constant("T20", 20.0, 2.0, 0.02)))
                    .build(),
            )
            .build();
        let mut state = SimulationState::new(FlightConfiguration::new(rocket), &conditions);
        let id = state.motors[0].id();
        state.motor_mut(id).unwrap().ignite(0.0);
        state.motor_ignited = true;

        let mut listeners = ListenerSet::new();
        let mut ctx = StepContext { conditions: &conditions, listeners: &mut listeners };
        let mut stepper = Rk4Stepper::new();
        stepper.initialize(&mut state, &mut ctx).unwrap();
        stepper.step(&mut state, &mut ctx, f64::MAX).unwrap();

        assert!(state.velocity.z > 0.0, "TWR > 1 must accelerate upward");
        assert!(state.velocity.x.abs() < 1e-9);
        assert!(state.velocity.y.abs() < 1e-9);
        assert_eq!(state.angular_velocity.norm(), 0.0);
    }

    #[test]
    fn step_respects_growth_and_floor_bounds() {
        let conditions = vacuum_conditions();
        let mut state = free_state(&conditions);
        state.position.z = 5000.0;
        state.previous_time_step = 0.004;

        let mut listeners = ListenerSet::new();
        let mut ctx = StepContext { conditions: &conditions, listeners: &mut listeners };
        let mut stepper = Rk4Stepper::new();
        stepper.initialize(&mut state, &mut ctx).unwrap();
        stepper.step(&mut state, &mut ctx, f64::MAX).unwrap();

        let h = state.previous_time_step;
        assert!(h <= 1.5 * 0.004 + 1e-12, "growth bound violated: {h}");
        assert!(h >= conditions.time_step / 20.0 - 1e-12, "floor violated: {h}");
    }

    #[test]
    fn blow_up_is_a_fatal_numerical_error() {
        let conditions = vacuum_conditions();
        let mut state = free_state(&conditions);
        state.position.z = 100.0;
        state.velocity = Vector3::new(0.0, 0.0, 1e10);

        let mut listeners = ListenerSet::new();
        let mut ctx = StepContext { conditions: &conditions, listeners: &mut listeners };
        let mut stepper = Rk4Stepper::new();
        stepper.initialize(&mut state, &mut ctx).unwrap();
        let err = stepper.step(&mut state, &mut ctx, 0.01).unwrap_err();
        assert!(matches!(err, SimulationError::ValuesOutOfRange));
    }

    #[test]
    fn quaternion_stays_unit_through_many_steps() {
        let conditions = vacuum_conditions();
        let mut state = free_state(&conditions);
        state.position.z = 2000.0;
        state.angular_velocity = Vector3::new(0.3, 0.2, 1.0);

        let mut listeners = ListenerSet::new();
        let mut ctx = StepContext { conditions: &conditions, listeners: &mut listeners };
        let mut stepper = Rk4Stepper::new();
        stepper.initialize(&mut state, &mut ctx).unwrap();
        for _ in 0..100 {
            stepper.step(&mut state, &mut ctx, f64::MAX).unwrap();
        }
        let norm = state.orientation.as_ref().norm();
        assert!((norm - 1.0).abs() < 1e-9, "quaternion norm drifted to {norm}");
    }
}
