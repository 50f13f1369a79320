use std::collections::BTreeSet;

use nalgebra::{UnitQuaternion, Vector3};

use crate::data::branch::FlightDataBranch;
use crate::data::warnings::WarningSet;
use crate::error::{SimResult, SimulationError};
use crate::physics::geodetic::WorldCoordinate;
use crate::vehicle::FlightConfiguration;

use super::conditions::SimulationConditions;
use super::event::MotorId;
use super::motor::MotorClusterState;
use super::queue::EventQueue;

// ---------------------------------------------------------------------------
// Per-branch simulation state
// ---------------------------------------------------------------------------

/// The full dynamic state of one simulation branch.  Exclusively owned by
/// the engine iteration running it; a stage separation clones it and the
/// copies never share mutable data again.
///
/// The boolean flags only ever transition false → true within a branch run.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub branch_name: String,

    pub time: f64,
    pub previous_time_step: f64,

    /// Position in the launch-site ENU frame, m.
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    /// Last computed linear acceleration (world frame).
    pub acceleration: Vector3<f64>,
    pub world_position: WorldCoordinate,
    /// Body → world rotation.
    pub orientation: UnitQuaternion<f64>,
    /// Angular velocity, world frame, rad/s.
    pub angular_velocity: Vector3<f64>,

    pub effective_launch_rod_length: f64,

    pub configuration: FlightConfiguration,
    pub motors: Vec<MotorClusterState>,
    pub burnt_out_motors: BTreeSet<MotorId>,

    pub motor_ignited: bool,
    pub liftoff: bool,
    pub launch_rod_cleared: bool,
    pub apogee_reached: bool,
    pub tumbling: bool,
    pub landed: bool,

    /// Deployed recovery devices as (stage, device index).
    pub deployed_recovery_devices: BTreeSet<(usize, usize)>,

    pub max_altitude: f64,
    /// Time at which `max_altitude` was recorded.
    pub max_altitude_time: f64,

    pub events: EventQueue,
    pub branch: FlightDataBranch,
    pub warnings: WarningSet,
}

impl SimulationState {
    /// Fresh state on the pad: oriented along the launch rod, motors armed.
    pub fn new(configuration: FlightConfiguration, conditions: &SimulationConditions) -> Self {
        let branch_name = configuration.topmost_stage_name().to_string();

        let angle = conditions.launch_rod_angle;
        let azimuth = conditions.launch_rod_direction;
        let rod_direction = Vector3::new(
            angle.sin() * (std::f64::consts::FRAC_PI_2 - azimuth).cos(),
            angle.sin() * (std::f64::consts::FRAC_PI_2 - azimuth).sin(),
            angle.cos(),
        );
        let orientation = UnitQuaternion::rotation_between(&Vector3::z(), &rod_direction)
            .unwrap_or_else(UnitQuaternion::identity);

        let stage_count = configuration.stage_count();
        let motors: Vec<MotorClusterState> = configuration
            .active_motor_mounts()
            .map(|(n, mount)| {
                let mut m = MotorClusterState::new(n, mount, n + 1 == stage_count);
                m.arm();
                m
            })
            .collect();

        Self {
            branch: FlightDataBranch::new(&branch_name),
            branch_name,
            time: 0.0,
            previous_time_step: conditions.time_step,
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            acceleration: Vector3::zeros(),
            world_position: conditions.launch_site,
            orientation,
            angular_velocity: Vector3::zeros(),
            effective_launch_rod_length: conditions.launch_rod_length,
            configuration,
            motors,
            burnt_out_motors: BTreeSet::new(),
            motor_ignited: false,
            liftoff: false,
            launch_rod_cleared: false,
            apogee_reached: false,
            tumbling: false,
            landed: false,
            deployed_recovery_devices: BTreeSet::new(),
            max_altitude: 0.0,
            max_altitude_time: 0.0,
            events: EventQueue::new(),
            warnings: WarningSet::new(),
        }
    }

    pub fn altitude(&self) -> f64 {
        self.position.z
    }

    /// Motor states on still-active stages.
    pub fn active_motors(&self) -> impl Iterator<Item = &MotorClusterState> {
        self.motors
            .iter()
            .filter(|m| self.configuration.is_stage_active(m.id().stage))
    }

    pub fn motor_mut(&mut self, id: MotorId) -> Option<&mut MotorClusterState> {
        self.motors.iter_mut().find(|m| m.id() == id)
    }

    /// Sum of active motor thrust at `time`.
    pub fn total_thrust(&self, time: f64) -> f64 {
        self.active_motors().map(|m| m.thrust(time)).sum()
    }

    /// Check every tracked dynamic quantity for NaN.  Any hit is a fatal
    /// numerical error carrying the full state for diagnosis.
    pub fn check_nan(&self) -> SimResult<()> {
        let scalars = self.time
            + self.previous_time_step
            + self.effective_launch_rod_length;
        let vectors = self.position.iter().any(|v| v.is_nan())
            || self.velocity.iter().any(|v| v.is_nan())
            || self.angular_velocity.iter().any(|v| v.is_nan())
            || self.orientation.coords.iter().any(|v| v.is_nan());

        if scalars.is_nan() || vectors {
            return Err(SimulationError::NotANumber(format!(
                "t={} step={} position={:?} velocity={:?} orientation={:?} \
                 angular_velocity={:?} rod_length={}",
                self.time,
                self.previous_time_step,
                self.position,
                self.velocity,
                self.orientation,
                self.angular_velocity,
                self.effective_launch_rod_length,
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::{Motor, MotorMount, RocketBuilder, StageBuilder};

    fn conditions() -> SimulationConditions {
        SimulationConditions::default()
    }

    fn single_stage_state() -> SimulationState {
        let rocket = RocketBuilder::new("state-test")
            .stage(
                StageBuilder::new("single")
                    .motor_mount(MotorMount::new(Motor::constant("T", 10.0, 1.0, 0.05)))
                    .build(),
            )
            .build();
        SimulationState::new(FlightConfiguration::new(rocket), &conditions())
    }

    #[test]
    fn new_state_is_armed_on_the_pad() {
        let s = single_stage_state();
        assert_eq!(s.time, 0.0);
        assert_eq!(s.motors.len(), 1);
        assert!(!s.motor_ignited && !s.liftoff && !s.landed);
        assert_eq!(
            s.motors[0].state(),
            crate::sim::motor::ThrustState::Armed
        );
    }

    #[test]
    fn vertical_rod_keeps_identity_orientation() {
        let s = single_stage_state();
        let body_z = s.orientation * Vector3::z();
        assert!((body_z.z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn canted_rod_tilts_the_body_axis() {
        let rocket = RocketBuilder::new("tilt")
            .stage(StageBuilder::new("s").build())
            .build();
        let mut c = conditions();
        c.launch_rod_angle = 0.2;
        let s = SimulationState::new(FlightConfiguration::new(rocket), &c);
        let body_z = s.orientation * Vector3::z();
        assert!((body_z.z - 0.2f64.cos()).abs() < 1e-9);
    }

    #[test]
    fn nan_check_reports_offending_state() {
        let mut s = single_stage_state();
        assert!(s.check_nan().is_ok());
        s.velocity.x = f64::NAN;
        let err = s.check_nan().unwrap_err();
        assert!(matches!(err, SimulationError::NotANumber(_)));
        assert!(!err.is_precondition());
    }
}
