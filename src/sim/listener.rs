use nalgebra::Vector3;

use crate::error::SimulationError;
use crate::physics::aerodynamics::{AeroCoefficients, FlightConditions};
use crate::physics::atmosphere::Atmosphere;
use crate::physics::mass::MassData;

use super::event::{FlightEvent, FlightEventKind};
use super::state::SimulationState;

// ---------------------------------------------------------------------------
// Acceleration override payload
// ---------------------------------------------------------------------------

/// Linear and angular acceleration (world frame) as computed by, or handed
/// to, the acceleration hooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccelerationData {
    pub linear: Vector3<f64>,
    pub angular: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// Simulation listener
// ---------------------------------------------------------------------------

/// Synchronous hooks invoked around each sub-computation, each event and
/// each physical step.
///
/// A `pre_*` hook returning `Some(value)` short-circuits the default
/// computation, so "overridden" is never ambiguous with a genuine zero.  A
/// `post_*` hook receives the computed value and may rewrite it.  The
/// boolean hooks veto the surrounded operation by returning `false`.
#[allow(unused_variables)]
pub trait SimulationListener {
    fn start_simulation(&mut self, state: &SimulationState) {}
    fn end_simulation(&mut self, state: &SimulationState, error: Option<&SimulationError>) {}

    /// Veto hook called before a physical step is taken.
    fn pre_step(&mut self, state: &SimulationState) -> bool {
        true
    }
    fn post_step(&mut self, state: &mut SimulationState) {}

    /// Veto hook called before an event is handled.
    fn pre_event(&mut self, state: &SimulationState, event: &FlightEvent) -> bool {
        true
    }
    fn post_event(&mut self, state: &SimulationState, event: &FlightEvent) {}

    /// Veto hook called before an event is pushed onto the queue.
    fn add_event(&mut self, state: &SimulationState, event: &FlightEvent) -> bool {
        true
    }

    fn pre_atmosphere(&mut self, state: &SimulationState) -> Option<Atmosphere> {
        None
    }
    fn post_atmosphere(&mut self, state: &SimulationState, value: Atmosphere) -> Atmosphere {
        value
    }

    fn pre_wind(&mut self, state: &SimulationState) -> Option<Vector3<f64>> {
        None
    }
    fn post_wind(&mut self, state: &SimulationState, value: Vector3<f64>) -> Vector3<f64> {
        value
    }

    fn pre_gravity(&mut self, state: &SimulationState) -> Option<f64> {
        None
    }
    fn post_gravity(&mut self, state: &SimulationState, value: f64) -> f64 {
        value
    }

    fn pre_mass(&mut self, state: &SimulationState) -> Option<MassData> {
        None
    }
    fn post_mass(&mut self, state: &SimulationState, value: MassData) -> MassData {
        value
    }

    fn pre_thrust(&mut self, state: &SimulationState) -> Option<f64> {
        None
    }
    fn post_thrust(&mut self, state: &SimulationState, value: f64) -> f64 {
        value
    }

    fn pre_flight_conditions(&mut self, state: &SimulationState) -> Option<FlightConditions> {
        None
    }
    fn post_flight_conditions(
        &mut self,
        state: &SimulationState,
        value: FlightConditions,
    ) -> FlightConditions {
        value
    }

    fn pre_aerodynamics(&mut self, state: &SimulationState) -> Option<AeroCoefficients> {
        None
    }
    fn post_aerodynamics(
        &mut self,
        state: &SimulationState,
        value: AeroCoefficients,
    ) -> AeroCoefficients {
        value
    }

    fn pre_acceleration(&mut self, state: &SimulationState) -> Option<AccelerationData> {
        None
    }
    fn post_acceleration(
        &mut self,
        state: &SimulationState,
        value: AccelerationData,
    ) -> AccelerationData {
        value
    }
}

// ---------------------------------------------------------------------------
// Listener set with dispatch helpers
// ---------------------------------------------------------------------------

macro_rules! fire_pre {
    ($name:ident, $ret:ty) => {
        pub fn $name(&mut self, state: &SimulationState) -> Option<$ret> {
            self.listeners.iter_mut().find_map(|l| l.$name(state))
        }
    };
}

macro_rules! fire_post {
    ($name:ident, $ret:ty) => {
        pub fn $name(&mut self, state: &SimulationState, mut value: $ret) -> $ret {
            for l in &mut self.listeners {
                value = l.$name(state, value);
            }
            value
        }
    };
}

/// The listeners attached to an engine, with helpers that fold each hook
/// over the collection.
#[derive(Default)]
pub struct ListenerSet {
    listeners: Vec<Box<dyn SimulationListener>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, listener: Box<dyn SimulationListener>) {
        self.listeners.push(listener);
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn start_simulation(&mut self, state: &SimulationState) {
        for l in &mut self.listeners {
            l.start_simulation(state);
        }
    }

    pub fn end_simulation(&mut self, state: &SimulationState, error: Option<&SimulationError>) {
        for l in &mut self.listeners {
            l.end_simulation(state, error);
        }
    }

    pub fn pre_step(&mut self, state: &SimulationState) -> bool {
        self.listeners.iter_mut().all(|l| l.pre_step(state))
    }

    pub fn post_step(&mut self, state: &mut SimulationState) {
        for l in &mut self.listeners {
            l.post_step(state);
        }
    }

    pub fn pre_event(&mut self, state: &SimulationState, event: &FlightEvent) -> bool {
        self.listeners.iter_mut().all(|l| l.pre_event(state, event))
    }

    pub fn post_event(&mut self, state: &SimulationState, event: &FlightEvent) {
        for l in &mut self.listeners {
            l.post_event(state, event);
        }
    }

    pub fn add_event(&mut self, state: &SimulationState, event: &FlightEvent) -> bool {
        self.listeners.iter_mut().all(|l| l.add_event(state, event))
    }

    fire_pre!(pre_atmosphere, Atmosphere);
    fire_post!(post_atmosphere, Atmosphere);
    fire_pre!(pre_wind, Vector3<f64>);
    fire_post!(post_wind, Vector3<f64>);
    fire_pre!(pre_gravity, f64);
    fire_post!(post_gravity, f64);
    fire_pre!(pre_mass, MassData);
    fire_post!(post_mass, MassData);
    fire_pre!(pre_thrust, f64);
    fire_post!(post_thrust, f64);
    fire_pre!(pre_flight_conditions, FlightConditions);
    fire_post!(post_flight_conditions, FlightConditions);
    fire_pre!(pre_aerodynamics, AeroCoefficients);
    fire_post!(post_aerodynamics, AeroCoefficients);
    fire_pre!(pre_acceleration, AccelerationData);
    fire_post!(post_acceleration, AccelerationData);
}

// ---------------------------------------------------------------------------
// Coast listener
// ---------------------------------------------------------------------------

/// Vetoes recovery deployment so the nested coast-estimate run flies
/// ballistic to apogee.
pub struct CoastListener;

impl SimulationListener for CoastListener {
    fn add_event(&mut self, _state: &SimulationState, event: &FlightEvent) -> bool {
        event.kind != FlightEventKind::RecoveryDeviceDeployment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct GravityOverride(f64);

    impl SimulationListener for GravityOverride {
        fn pre_gravity(&mut self, _state: &SimulationState) -> Option<f64> {
            Some(self.0)
        }
    }

    struct WindDoubler;

    impl SimulationListener for WindDoubler {
        fn post_wind(&mut self, _state: &SimulationState, value: Vector3<f64>) -> Vector3<f64> {
            value * 2.0
        }
    }

    fn dummy_state() -> SimulationState {
        use crate::sim::conditions::SimulationConditions;
        use crate::vehicle::{FlightConfiguration, RocketBuilder, StageBuilder};

        let rocket = RocketBuilder::new("listener-test")
            .stage(StageBuilder::new("s").build())
            .build();
        SimulationState::new(
            FlightConfiguration::new(rocket),
            &SimulationConditions::default(),
        )
    }

    #[test]
    fn pre_hook_short_circuits() {
        let mut set = ListenerSet::new();
        let state = dummy_state();
        assert!(set.pre_gravity(&state).is_none());

        set.push(Box::new(GravityOverride(3.7)));
        assert_eq!(set.pre_gravity(&state), Some(3.7));
    }

    #[test]
    fn post_hooks_chain() {
        let mut set = ListenerSet::new();
        set.push(Box::new(WindDoubler));
        set.push(Box::new(WindDoubler));
        let state = dummy_state();
        let w = set.post_wind(&state, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(w.x, 4.0);
    }

    #[test]
    fn coast_listener_vetoes_deployment_only() {
        let mut set = ListenerSet::new();
        set.push(Box::new(CoastListener));
        let state = dummy_state();
        let deploy = FlightEvent::new(FlightEventKind::RecoveryDeviceDeployment, 1.0);
        let apogee = FlightEvent::new(FlightEventKind::Apogee, 1.0);
        assert!(!set.add_event(&state, &deploy));
        assert!(set.add_event(&state, &apogee));
    }
}
