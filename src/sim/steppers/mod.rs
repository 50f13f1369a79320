pub mod ground;
pub mod landing;
pub mod rk4;
pub mod tumble;

use nalgebra::Vector3;

use crate::error::{SimResult, SimulationError};
use crate::physics::atmosphere::Atmosphere;
use crate::physics::mass::MassData;
use crate::physics::EPSILON;

use super::conditions::SimulationConditions;
use super::listener::ListenerSet;
use super::state::SimulationState;

pub use ground::GroundStepper;
pub use landing::LandingStepper;
pub use rk4::Rk4Stepper;
pub use tumble::TumbleStepper;

/// Smallest time step any stepper will take, s.
pub const MIN_TIME_STEP: f64 = 0.001;

/// Fixed upper bound on descent steps, s.
pub const RECOVERY_TIME_STEP: f64 = 0.5;

// ---------------------------------------------------------------------------
// Stepper contract
// ---------------------------------------------------------------------------

/// The models and hooks a stepper evaluates against.  Borrowed from the
/// engine for the duration of one call, so steppers carry no shared state.
pub struct StepContext<'a> {
    pub conditions: &'a SimulationConditions,
    pub listeners: &'a mut ListenerSet,
}

/// A pluggable integrator advancing the state by a bounded time increment.
///
/// `step` mutates the state in place and advances time by at most
/// `max_time_step`; the engine caps that to the time remaining until the
/// next queued event.
pub trait Stepper {
    fn initialize(
        &mut self,
        state: &mut SimulationState,
        ctx: &mut StepContext<'_>,
    ) -> SimResult<()>;

    fn step(
        &mut self,
        state: &mut SimulationState,
        ctx: &mut StepContext<'_>,
        max_time_step: f64,
    ) -> SimResult<()>;
}

// ---------------------------------------------------------------------------
// NaN guards
// ---------------------------------------------------------------------------

pub(crate) fn check_nan(value: f64, what: &str) -> SimResult<()> {
    if value.is_nan() {
        Err(SimulationError::NotANumber(what.to_string()))
    } else {
        Ok(())
    }
}

pub(crate) fn check_nan_vec(value: &Vector3<f64>, what: &str) -> SimResult<()> {
    if value.iter().any(|v| v.is_nan()) {
        Err(SimulationError::NotANumber(what.to_string()))
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Model evaluation with listener hooks
// ---------------------------------------------------------------------------

pub(crate) fn model_atmosphere(
    state: &SimulationState,
    ctx: &mut StepContext<'_>,
) -> SimResult<Atmosphere> {
    if let Some(a) = ctx.listeners.pre_atmosphere(state) {
        return Ok(a);
    }
    let altitude = state.position.z + ctx.conditions.launch_site.altitude;
    let a = ctx.conditions.atmosphere.conditions(altitude);
    let a = ctx.listeners.post_atmosphere(state, a);
    check_nan(a.pressure, "atmospheric pressure")?;
    check_nan(a.temperature, "atmospheric temperature")?;
    Ok(a)
}

pub(crate) fn model_wind(
    state: &SimulationState,
    ctx: &mut StepContext<'_>,
) -> SimResult<Vector3<f64>> {
    if let Some(w) = ctx.listeners.pre_wind(state) {
        return Ok(w);
    }
    let altitude = state.position.z + ctx.conditions.launch_site.altitude;
    let w = ctx.conditions.wind.wind_velocity(state.time, altitude);
    let w = ctx.listeners.post_wind(state, w);
    check_nan_vec(&w, "wind velocity")?;
    Ok(w)
}

pub(crate) fn model_gravity(state: &SimulationState, ctx: &mut StepContext<'_>) -> SimResult<f64> {
    if let Some(g) = ctx.listeners.pre_gravity(state) {
        return Ok(g);
    }
    let g = ctx.conditions.gravity.gravity(&state.world_position);
    let g = ctx.listeners.post_gravity(state, g);
    check_nan(g, "gravity")?;
    Ok(g)
}

pub(crate) fn model_mass(state: &SimulationState, ctx: &mut StepContext<'_>) -> SimResult<MassData> {
    if let Some(m) = ctx.listeners.pre_mass(state) {
        return Ok(m);
    }
    let m = ctx
        .conditions
        .mass
        .mass_data(&state.configuration, &state.motors, state.time);
    let m = ctx.listeners.post_mass(state, m);
    check_nan(m.mass, "mass")?;
    check_nan(m.cg_x, "center of gravity")?;
    check_nan(m.longitudinal_inertia, "longitudinal inertia")?;
    check_nan(m.rotational_inertia, "rotational inertia")?;
    Ok(m)
}

/// Average thrust of the active motors over `[t, t + time_step]`.
pub(crate) fn model_thrust(
    state: &SimulationState,
    ctx: &mut StepContext<'_>,
    time_step: f64,
) -> SimResult<f64> {
    if let Some(t) = ctx.listeners.pre_thrust(state) {
        return Ok(t);
    }
    let thrust = state
        .active_motors()
        .map(|m| m.average_thrust(state.time, time_step))
        .sum();
    let thrust = ctx.listeners.post_thrust(state, thrust);
    check_nan(thrust, "thrust")?;
    Ok(thrust)
}

// ---------------------------------------------------------------------------
// Shared integration helpers
// ---------------------------------------------------------------------------

/// First-order position/velocity update under constant acceleration.
pub(crate) fn euler_integrate(
    position: &Vector3<f64>,
    velocity: &Vector3<f64>,
    acceleration: &Vector3<f64>,
    dt: f64,
) -> (Vector3<f64>, Vector3<f64>) {
    (
        position + velocity * dt + acceleration * (dt * dt / 2.0),
        velocity + acceleration * dt,
    )
}

/// Exact time of ground impact: the non-negative root of
/// `0.5·a·t² + v·t + z0 = 0`.
pub(crate) fn ground_impact_time(accel_z: f64, vel_z: f64, altitude: f64) -> f64 {
    if accel_z.abs() < EPSILON {
        // Drag balances gravity: linear descent.
        return if vel_z.abs() > EPSILON { -altitude / vel_z } else { 0.0 };
    }
    let discriminant = (vel_z * vel_z - 2.0 * accel_z * altitude).max(0.0);
    (-vel_z - discriminant.sqrt()) / accel_z
}

// ---------------------------------------------------------------------------
// Descent data recording (landing and tumble steppers)
// ---------------------------------------------------------------------------

/// Values computed during a descent step, recorded after the state update.
pub(crate) struct DescentRecord {
    pub atmosphere: Atmosphere,
    pub wind_speed: f64,
    pub airspeed: f64,
    pub mach: f64,
    pub cd: f64,
    pub drag_force: f64,
    pub mass: MassData,
    pub gravity: f64,
    pub coriolis: Vector3<f64>,
    pub acceleration: Vector3<f64>,
    pub time_step: f64,
}

pub(crate) fn record_descent_point(
    state: &mut SimulationState,
    ctx: &StepContext<'_>,
    record: &DescentRecord,
) {
    use crate::data::types::FlightDataType;
    use crate::physics::geodetic::GeodeticComputation;

    let branch = &mut state.branch;
    branch.add_point();
    branch.set_value(FlightDataType::Time, state.time);
    branch.set_value(FlightDataType::TimeStep, record.time_step);
    branch.set_value(FlightDataType::Altitude, state.position.z);
    branch.set_value(FlightDataType::PositionEast, state.position.x);
    branch.set_value(FlightDataType::PositionNorth, state.position.y);
    branch.set_value(
        FlightDataType::LateralDistance,
        state.position.x.hypot(state.position.y),
    );
    branch.set_value(FlightDataType::Latitude, state.world_position.latitude);
    branch.set_value(FlightDataType::Longitude, state.world_position.longitude);

    branch.set_value(FlightDataType::VelocityZ, state.velocity.z);
    branch.set_value(
        FlightDataType::VelocityXY,
        state.velocity.x.hypot(state.velocity.y),
    );
    branch.set_value(FlightDataType::VelocityTotal, state.velocity.norm());

    branch.set_value(FlightDataType::AccelerationZ, record.acceleration.z);
    branch.set_value(
        FlightDataType::AccelerationXY,
        record.acceleration.x.hypot(record.acceleration.y),
    );
    branch.set_value(FlightDataType::AccelerationTotal, record.acceleration.norm());

    branch.set_value(FlightDataType::Mass, record.mass.mass);
    branch.set_value(FlightDataType::PropellantMass, record.mass.propellant_mass);

    branch.set_value(FlightDataType::ThrustForce, 0.0);
    branch.set_value(FlightDataType::DragForce, record.drag_force);
    branch.set_value(FlightDataType::DragCoeff, record.cd);
    branch.set_value(FlightDataType::AxialDragCoeff, record.cd);
    branch.set_value(FlightDataType::Gravity, record.gravity);
    branch.set_value(FlightDataType::WindVelocity, record.wind_speed);
    branch.set_value(FlightDataType::MachNumber, record.mach);

    let reynolds = record.airspeed * state.configuration.active_length()
        / record.atmosphere.kinematic_viscosity;
    branch.set_value(FlightDataType::ReynoldsNumber, reynolds);

    if ctx.conditions.geodetic != GeodeticComputation::Flat {
        branch.set_value(FlightDataType::CoriolisAcceleration, record.coriolis.norm());
    }

    branch.set_value(FlightDataType::AirTemperature, record.atmosphere.temperature);
    branch.set_value(FlightDataType::AirPressure, record.atmosphere.pressure);
    branch.set_value(FlightDataType::SpeedOfSound, record.atmosphere.speed_of_sound);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euler_step_matches_kinematics() {
        let (pos, vel) = euler_integrate(
            &Vector3::new(0.0, 0.0, 100.0),
            &Vector3::new(0.0, 0.0, -5.0),
            &Vector3::new(0.0, 0.0, -10.0),
            1.0,
        );
        assert!((pos.z - 90.0).abs() < 1e-12);
        assert!((vel.z + 15.0).abs() < 1e-12);
    }

    #[test]
    fn impact_time_solves_the_quadratic_exactly() {
        let (a, v, z0) = (-9.81, -10.0, 0.5);
        let t = ground_impact_time(a, v, z0);
        assert!(t > 0.0);
        let residual = 0.5 * a * t * t + v * t + z0;
        assert!(residual.abs() < 1e-12, "residual {residual}");
    }

    #[test]
    fn impact_time_linear_fallback_at_zero_acceleration() {
        let t = ground_impact_time(0.0, -4.0, 2.0);
        assert!((t - 0.5).abs() < 1e-12);
    }
}
