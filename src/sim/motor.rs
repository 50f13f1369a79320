use tracing::trace;

use crate::vehicle::motor::{IgnitionTrigger, Motor, MotorMount};

use super::event::{EventSource, FlightEvent, FlightEventKind, MotorId};

// ---------------------------------------------------------------------------
// Thrust state machine
// ---------------------------------------------------------------------------

/// Lifecycle of a motor cluster.  The chain is strictly linear:
/// PREFLIGHT → ARMED → THRUSTING → DELAYING → SPENT.  A transition from any
/// state but the exact predecessor is a programming error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrustState {
    Preflight,
    Armed,
    Thrusting,
    Delaying,
    Spent,
}

impl ThrustState {
    /// Whether the engine must recompute thrust/CG for this motor each step.
    pub fn needs_simulation(self) -> bool {
        matches!(self, ThrustState::Thrusting | ThrustState::Delaying)
    }
}

// ---------------------------------------------------------------------------
// Per-cluster motor state
// ---------------------------------------------------------------------------

/// The dynamic state of one motor cluster during flight.
#[derive(Debug, Clone)]
pub struct MotorClusterState {
    motor: Motor,
    id: MotorId,
    cluster_count: usize,
    ignition_trigger: IgnitionTrigger,
    ignition_delay: f64,
    lowest_stage: bool,
    state: ThrustState,
    burn_time_estimate: f64,
    ignition_time: Option<f64>,
    burnout_time: Option<f64>,
    ejection_time: Option<f64>,
}

impl MotorClusterState {
    /// Build the cluster state for a mount on `stage`.  `lowest_stage`
    /// selects the launch leg of the AUTOMATIC ignition trigger.
    pub fn new(stage: usize, mount: &MotorMount, lowest_stage: bool) -> Self {
        Self {
            burn_time_estimate: mount.motor.burn_time_estimate(),
            motor: mount.motor.clone(),
            id: MotorId { stage },
            cluster_count: mount.cluster_count,
            ignition_trigger: mount.ignition.trigger,
            ignition_delay: mount.ignition.delay,
            lowest_stage,
            state: ThrustState::Preflight,
            ignition_time: None,
            burnout_time: None,
            ejection_time: None,
        }
    }

    pub fn id(&self) -> MotorId {
        self.id
    }

    pub fn motor(&self) -> &Motor {
        &self.motor
    }

    pub fn state(&self) -> ThrustState {
        self.state
    }

    pub fn burn_time_estimate(&self) -> f64 {
        self.burn_time_estimate
    }

    pub fn ignition_delay(&self) -> f64 {
        self.ignition_delay
    }

    pub fn ignition_time(&self) -> Option<f64> {
        self.ignition_time
    }

    fn transition(&mut self, from: ThrustState, to: ThrustState) {
        assert!(
            self.state == from,
            "illegal motor state transition for {:?}: {:?} -> {:?} requires {:?}",
            self.id,
            self.state,
            to,
            from,
        );
        trace!(motor = ?self.id, ?from, ?to, "motor state transition");
        self.state = to;
    }

    /// PREFLIGHT → ARMED.
    pub fn arm(&mut self) {
        self.transition(ThrustState::Preflight, ThrustState::Armed);
    }

    /// ARMED → THRUSTING, recording the ignition time.
    pub fn ignite(&mut self, time: f64) {
        self.transition(ThrustState::Armed, ThrustState::Thrusting);
        self.ignition_time = Some(time);
    }

    /// THRUSTING → DELAYING, recording the burnout time.
    pub fn burn_out(&mut self, time: f64) {
        self.transition(ThrustState::Thrusting, ThrustState::Delaying);
        self.burnout_time = Some(time);
    }

    /// Alias for [`MotorClusterState::burn_out`].
    pub fn cut_off(&mut self, time: f64) {
        self.burn_out(time);
    }

    /// DELAYING → SPENT, recording the ejection charge time.
    pub fn fire_ejection_charge(&mut self, time: f64) {
        self.transition(ThrustState::Delaying, ThrustState::Spent);
        self.ejection_time = Some(time);
    }

    /// Whether the engine must recompute thrust/CG for this motor.
    pub fn needs_simulation(&self) -> bool {
        self.state.needs_simulation()
    }

    pub fn is_spent(&self) -> bool {
        self.state == ThrustState::Spent
    }

    pub fn is_delaying(&self) -> bool {
        self.state == ThrustState::Delaying
    }

    /// Instantaneous thrust at simulation time `time`, scaled by the
    /// cluster's motor count.  Nonzero only while THRUSTING.
    pub fn thrust(&self, time: f64) -> f64 {
        match (self.state, self.ignition_time) {
            (ThrustState::Thrusting, Some(t0)) => {
                self.motor.thrust_at(time - t0) * self.cluster_count as f64
            }
            _ => 0.0,
        }
    }

    /// Average thrust over [time, time + dt], for the adaptive step's
    /// thrust estimate.
    pub fn average_thrust(&self, time: f64, dt: f64) -> f64 {
        match (self.state, self.ignition_time) {
            (ThrustState::Thrusting, Some(t0)) => {
                let a = self.motor.thrust_at(time - t0);
                let b = self.motor.thrust_at(time - t0 + dt);
                0.5 * (a + b) * self.cluster_count as f64
            }
            _ => 0.0,
        }
    }

    /// Remaining propellant at simulation time `time` (whole cluster).
    pub fn propellant_mass_at(&self, time: f64) -> f64 {
        let full = self.motor.propellant_mass * self.cluster_count as f64;
        match (self.state, self.ignition_time) {
            (ThrustState::Preflight | ThrustState::Armed, _) => full,
            (ThrustState::Thrusting, Some(t0)) => {
                if self.burn_time_estimate <= 0.0 {
                    return 0.0;
                }
                let fraction = ((time - t0) / self.burn_time_estimate).clamp(0.0, 1.0);
                full * (1.0 - fraction)
            }
            _ => 0.0,
        }
    }

    /// The burn-time estimate has elapsed while still THRUSTING: the motor
    /// is no longer producing thrust and a BURNOUT event is due.
    pub fn has_burned_out(&self, time: f64) -> bool {
        matches!((self.state, self.ignition_time),
            (ThrustState::Thrusting, Some(t0)) if time - t0 >= self.burn_time_estimate)
    }

    /// Delay from burnout to the ejection charge; `None` for a plugged
    /// motor.
    pub fn ejection_delay(&self) -> Option<f64> {
        self.motor.ejection_delay
    }

    /// Whether `event` triggers this motor's ignition.  Only meaningful
    /// while ARMED.
    pub fn test_for_ignition(&self, event: &FlightEvent) -> bool {
        if self.state != ThrustState::Armed {
            return false;
        }
        let lower_neighbor = |kind: FlightEventKind| {
            event.kind == kind
                && matches!(event.source, Some(EventSource::Motor(id)) if id.stage == self.id.stage + 1)
        };
        match self.ignition_trigger {
            IgnitionTrigger::Launch => event.kind == FlightEventKind::Launch,
            IgnitionTrigger::Automatic => {
                if self.lowest_stage {
                    event.kind == FlightEventKind::Launch
                } else {
                    lower_neighbor(FlightEventKind::Burnout)
                }
            }
            IgnitionTrigger::LowerStageBurnout => lower_neighbor(FlightEventKind::Burnout),
            IgnitionTrigger::LowerStageEjectionCharge => {
                lower_neighbor(FlightEventKind::EjectionCharge)
            }
            IgnitionTrigger::Never => false,
        }
    }
}
