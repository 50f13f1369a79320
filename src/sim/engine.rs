use std::f64::consts::PI;

use tracing::{debug, error, info, trace, warn};

use crate::data::branch::FlightDataBranch;
use crate::data::flight_data::FlightData;
use crate::data::types::FlightDataType;
use crate::data::warnings::Warning;
use crate::error::{SimResult, SimulationError};
use crate::vehicle::{FlightConfiguration, Rocket};

use super::conditions::SimulationConditions;
use super::event::{EventPayload, EventSource, FlightEvent, FlightEventKind};
use super::listener::{CoastListener, ListenerSet, SimulationListener};
use super::motor::ThrustState;
use super::state::SimulationState;
use super::steppers::{
    GroundStepper, LandingStepper, Rk4Stepper, StepContext, Stepper, TumbleStepper,
    MIN_TIME_STEP,
};

// ---------------------------------------------------------------------------
// Tumble transition thresholds
// ---------------------------------------------------------------------------

/// Angle of attack beyond which an unstable airframe transitions to
/// tumbling: 20 degrees.
const AOA_TUMBLE_CONDITION: f64 = PI / 9.0;

/// Thrust must be below this for the tumble transition, N.
const THRUST_TUMBLE_CONDITION: f64 = 0.01;

// ---------------------------------------------------------------------------
// Event-driven simulation engine
// ---------------------------------------------------------------------------

/// The discrete-event simulation engine: owns the event loop, the active
/// stepper, and the LIFO stack of per-stage simulation branches.
pub struct SimulationEngine {
    conditions: SimulationConditions,
    listeners: ListenerSet,
    /// Nesting depth of the coast-estimate re-entry; at most one level.
    coast_depth: u8,
}

impl SimulationEngine {
    pub fn new(conditions: SimulationConditions) -> Self {
        Self {
            conditions,
            listeners: ListenerSet::new(),
            coast_depth: 0,
        }
    }

    pub fn add_listener(&mut self, listener: Box<dyn SimulationListener>) {
        self.listeners.push(listener);
    }

    pub fn conditions(&self) -> &SimulationConditions {
        &self.conditions
    }

    /// Run the full simulation: the main branch from the pad, plus one
    /// branch per separated stage, until the branch stack is empty.
    pub fn simulate(&mut self, rocket: &Rocket) -> SimResult<FlightData> {
        let configuration = FlightConfiguration::new(rocket.clone());
        if !configuration.has_motors() {
            return Err(SimulationError::NoMotorsDefined);
        }

        let mut state = SimulationState::new(configuration, &self.conditions);
        state.events.push(
            FlightEvent::new(FlightEventKind::Launch, 0.0).with_source(EventSource::Rocket),
        );

        let mut flight_data = FlightData::new();
        let mut stack = vec![state];

        while let Some(mut state) = stack.pop() {
            info!(branch = %state.branch_name, "starting simulation of branch");
            self.listeners.start_simulation(&state);

            match self.simulate_branch(&mut state, &mut stack) {
                Ok(()) => self.listeners.end_simulation(&state, None),
                Err(e) => {
                    self.listeners.end_simulation(&state, Some(&e));
                    if e.is_precondition() {
                        return Err(e);
                    }
                    // Fatal numerical failure: this branch is dead, but the
                    // branches already simulated keep their results.
                    warn!(branch = %state.branch_name, error = %e, "branch aborted");
                    state.branch.add_event(
                        FlightEvent::new(FlightEventKind::Exception, state.time)
                            .with_payload(EventPayload::Message(e.to_string())),
                    );
                    state.warnings.add(Warning::SimulationAbort {
                        message: e.to_string(),
                    });
                }
            }

            info!(
                branch = %state.branch_name,
                time = state.time,
                "finished simulating branch"
            );
            flight_data.warnings_mut().merge(&state.warnings);
            state.branch.immute();
            flight_data.add_branch(state.branch);
        }

        if !flight_data.warnings().is_empty() {
            info!(warnings = %flight_data.warnings(), "warnings at the end of simulation");
        }
        Ok(flight_data)
    }

    // -- branch loop ---------------------------------------------------------

    fn simulate_branch(
        &mut self,
        state: &mut SimulationState,
        stack: &mut Vec<SimulationState>,
    ) -> SimResult<()> {
        let mut stepper: Box<dyn Stepper> = if state.landed {
            Box::new(GroundStepper)
        } else {
            Box::new(Rk4Stepper::new())
        };
        {
            let mut ctx = StepContext {
                conditions: &self.conditions,
                listeners: &mut self.listeners,
            };
            stepper.initialize(state, &mut ctx)?;
        }

        // Origin for liftoff/rod-clearance detection; a listener may have
        // moved the launch position during initialization.
        let origin = state.position;
        let origin_velocity = state.velocity;

        if state.branch.is_empty() {
            record_initial_point(state);
        }

        while self.handle_events(state, stack, &mut stepper)? {
            let old_altitude = state.position.z;

            if self.listeners.pre_step(state) {
                // Step at most to the next queued event.
                let max_step = state
                    .events
                    .peek()
                    .map_or(f64::MAX, |e| (e.time - state.time).max(MIN_TIME_STEP));
                trace!(time = state.time, altitude = old_altitude, "taking simulation step");
                let mut ctx = StepContext {
                    conditions: &self.conditions,
                    listeners: &mut self.listeners,
                };
                stepper.step(state, &mut ctx, max_step)?;
            }
            self.listeners.post_step(state);

            state.check_nan()?;

            if !state.landed {
                let altitude_event = FlightEvent::new(FlightEventKind::Altitude, state.time)
                    .with_source(EventSource::Rocket)
                    .with_payload(EventPayload::AltitudeChange {
                        old: old_altitude,
                        new: state.position.z,
                    });
                self.add_event(state, altitude_event);
            }

            if state.position.z > state.max_altitude {
                state.max_altitude = state.position.z;
                state.max_altitude_time = state.time;
            }

            let relative = state.position - origin;
            if !state.liftoff {
                // Do not sink into the pad before liftoff.
                if relative.z < 0.0 {
                    state.position = origin;
                    state.velocity = origin_velocity;
                }
                if relative.z > 0.02 {
                    self.add_event(
                        state,
                        FlightEvent::new(FlightEventKind::Liftoff, state.time),
                    );
                }
            } else if state.position.z <= 0.0 && !state.landed {
                // The descent steppers land exactly at zero; anything the
                // RK4 stepper carried below ground is clamped here.
                state.position.z = 0.0;
                self.add_event(
                    state,
                    FlightEvent::new(FlightEventKind::GroundHit, state.time),
                );
            }

            if state.liftoff
                && !state.launch_rod_cleared
                && relative.norm() > state.effective_launch_rod_length
            {
                self.add_event(
                    state,
                    FlightEvent::new(FlightEventKind::LaunchRod, state.time),
                );
            }

            // Apogee: the altitude has dropped measurably below the running
            // maximum.  The event carries the time the maximum was recorded,
            // not the detection time.
            if !state.apogee_reached && state.position.z < state.max_altitude - 0.01 {
                self.add_event(
                    state,
                    FlightEvent::new(FlightEventKind::Apogee, state.max_altitude_time)
                        .with_source(EventSource::Rocket),
                );
            }

            // Per-motor burnout: the thrust curve has run out.
            let mut burnouts = Vec::new();
            for motor in state.active_motors() {
                if motor.has_burned_out(state.time)
                    && !state.burnt_out_motors.contains(&motor.id())
                {
                    let burnout_time = motor
                        .ignition_time()
                        .map_or(state.time, |t0| t0 + motor.burn_time_estimate());
                    burnouts.push((motor.id(), burnout_time));
                }
            }
            for (id, time) in burnouts {
                state.burnt_out_motors.insert(id);
                self.add_event(
                    state,
                    FlightEvent::new(FlightEventKind::Burnout, time)
                        .with_source(EventSource::Motor(id)),
                );
            }

            self.check_tumble(state);

            // On the ground with nothing left to do: end the branch.
            if state.landed && state.events.is_empty() {
                self.add_event(
                    state,
                    FlightEvent::new(FlightEventKind::SimulationEnd, state.time),
                );
            }
        }

        Ok(())
    }

    /// Tumble transition: apogee reached, not already tumbling, CG aft of
    /// CP, angle of attack past the threshold, and thrust effectively zero.
    /// Tumbling under thrust is a warning, not a transition.
    fn check_tumble(&mut self, state: &mut SimulationState) {
        if state.tumbling || state.landed || !state.apogee_reached {
            return;
        }
        let (Some(cp), Some(cg), Some(aoa)) = (
            state.branch.last(FlightDataType::CpLocation),
            state.branch.last(FlightDataType::CgLocation),
            state.branch.last(FlightDataType::AngleOfAttack),
        ) else {
            return;
        };
        if cg > cp && aoa > AOA_TUMBLE_CONDITION {
            let thrust = state.branch.last(FlightDataType::ThrustForce).unwrap_or(0.0);
            if thrust > THRUST_TUMBLE_CONDITION {
                state.warnings.add(Warning::TumbleUnderThrust);
            } else {
                state.tumbling = true;
                self.add_event(
                    state,
                    FlightEvent::new(FlightEventKind::Tumble, state.time),
                );
            }
        }
    }

    // -- event handling ------------------------------------------------------

    /// Handle every event due at or before the current time.  Returns false
    /// once the branch is finished (SIMULATION_END handled or the time cap
    /// hit).
    fn handle_events(
        &mut self,
        state: &mut SimulationState,
        stack: &mut Vec<SimulationState>,
        stepper: &mut Box<dyn Stepper>,
    ) -> SimResult<bool> {
        let mut ret = true;

        while let Some(event) = self.next_event(state) {
            trace!(%event, queued = state.events.len(), "handling event");

            // Anything but bookkeeping arriving after landing is suspect.
            if state.landed
                && event.kind != FlightEventKind::Altitude
                && event.kind != FlightEventKind::SimulationEnd
            {
                state.warnings.add(Warning::EventAfterLanding { kind: event.kind });
            }

            // Scan armed motors for ignition triggers.
            let mut ignitions = Vec::new();
            for motor in state.active_motors() {
                if motor.test_for_ignition(&event) {
                    let ignition_time = state.time + motor.ignition_delay();
                    info!(motor = ?motor.id(), time = ignition_time, "queueing ignition");
                    ignitions.push(
                        FlightEvent::new(FlightEventKind::Ignition, ignition_time)
                            .with_source(EventSource::Motor(motor.id())),
                    );
                }
            }
            for ev in ignitions {
                self.add_event(state, ev);
            }

            // Ignore events sourced from stages no longer attached.
            if let Some(stage) = event.source.and_then(|s| s.stage()) {
                if !state.configuration.is_stage_active(stage) {
                    trace!(%event, stage, "ignoring event from detached stage");
                    continue;
                }
            }

            if !self.listeners.pre_event(state, &event) {
                continue;
            }

            // Scan stage separation triggers (the topmost stage never
            // separates).
            let mut separations = Vec::new();
            for (n, stage) in state.configuration.active_stages() {
                if n == 0 {
                    continue;
                }
                if stage.separation.separates_on(&event, n) {
                    separations.push(
                        FlightEvent::new(
                            FlightEventKind::StageSeparation,
                            event.time + stage.separation.delay,
                        )
                        .with_source(EventSource::Stage(n)),
                    );
                }
            }
            for ev in separations {
                self.add_event(state, ev);
            }

            // Scan recovery device deployment triggers.  Deployment is
            // delayed at least 1 ms so stage separation sorts first.
            let mut deployments = Vec::new();
            for (n, stage) in state.configuration.active_stages() {
                for (i, device) in stage.recovery_devices.iter().enumerate() {
                    if device
                        .deployment
                        .activates_on(&event, n, state.apogee_reached)
                    {
                        deployments.push(
                            FlightEvent::new(
                                FlightEventKind::RecoveryDeviceDeployment,
                                event.time + device.deployment.delay.max(0.001),
                            )
                            .with_source(EventSource::RecoveryDevice { stage: n, index: i }),
                        );
                    }
                }
            }
            for ev in deployments {
                self.add_event(state, ev);
            }

            self.handle_event(state, stack, stepper, &event, &mut ret)?;

            self.listeners.post_event(state, &event);
        }

        if state.time > self.conditions.max_simulation_time {
            ret = false;
            error!(time = state.time, "maximum simulated time exceeded, ending branch");
            state
                .branch
                .add_event(FlightEvent::new(FlightEventKind::SimulationEnd, state.time));
        }

        // If nothing ever ignited, the rocket never flew.
        if !state.motor_ignited {
            return Err(SimulationError::NoIgnition);
        }

        Ok(ret)
    }

    fn handle_event(
        &mut self,
        state: &mut SimulationState,
        stack: &mut Vec<SimulationState>,
        stepper: &mut Box<dyn Stepper>,
        event: &FlightEvent,
        ret: &mut bool,
    ) -> SimResult<()> {
        match event.kind {
            FlightEventKind::Launch => {
                state.branch.add_event(event.clone());
            }

            FlightEventKind::Ignition => {
                if let Some(EventSource::Motor(id)) = event.source {
                    if let Some(motor) = state.motor_mut(id) {
                        if motor.state() == ThrustState::Armed {
                            info!(motor = ?id, time = event.time, "igniting motor");
                            motor.ignite(event.time);
                            state.motor_ignited = true;
                            state.branch.add_event(event.clone());
                        } else {
                            trace!(motor = ?id, "redundant ignition ignored");
                        }
                    }
                }
            }

            FlightEventKind::Liftoff => {
                state.liftoff = true;
                state.branch.add_event(event.clone());
            }

            FlightEventKind::LaunchRod => {
                state.launch_rod_cleared = true;
                state.branch.add_event(event.clone());
            }

            FlightEventKind::Burnout => {
                // Burnout without liftoff means the rocket never left the
                // pad; abort the whole run.
                if !state.liftoff {
                    return Err(SimulationError::EarlyMotorBurnout);
                }
                if let Some(EventSource::Motor(id)) = event.source {
                    let mut ejection_delay = None;
                    if let Some(motor) = state.motor_mut(id) {
                        if motor.state() == ThrustState::Thrusting {
                            debug!(motor = ?id, time = event.time, "motor burnout");
                            motor.burn_out(event.time);
                            ejection_delay = motor.ejection_delay();
                        }
                    }
                    // Plugged motors have no charge to schedule.
                    if let Some(delay) = ejection_delay {
                        self.add_event(
                            state,
                            FlightEvent::new(
                                FlightEventKind::EjectionCharge,
                                event.time + delay,
                            )
                            .with_source(EventSource::Motor(id)),
                        );
                    }
                }
                state.branch.add_event(event.clone());
            }

            FlightEventKind::EjectionCharge => {
                if let Some(EventSource::Motor(id)) = event.source {
                    if let Some(motor) = state.motor_mut(id) {
                        if motor.is_delaying() {
                            motor.fire_ejection_charge(event.time);
                        }
                    }
                }
                state.branch.add_event(event.clone());
            }

            FlightEventKind::StageSeparation => {
                if let Some(EventSource::Stage(n)) = event.source {
                    state.branch.add_event(event.clone());

                    // The separated stage becomes its own branch, owning
                    // independent copies of configuration and motor state.
                    let mut booster = state.clone();
                    state.configuration.retain_above(n);
                    booster.configuration.set_only_stage(n);
                    booster.branch_name = booster.configuration.topmost_stage_name().to_string();
                    booster.branch = FlightDataBranch::new(&booster.branch_name);

                    info!(
                        time = state.time,
                        parent = %state.branch_name,
                        booster = %booster.branch_name,
                        "stage separation, branching"
                    );
                    stack.push(booster);
                }
            }

            FlightEventKind::Apogee => {
                state.apogee_reached = true;
                state.branch.add_event(event.clone());
                // This apogee is the optimum if recovery has not deployed.
                if self.conditions.calculate_extras
                    && state.deployed_recovery_devices.is_empty()
                {
                    state
                        .branch
                        .set_optimum_altitude(state.max_altitude, state.max_altitude_time);
                }
            }

            FlightEventKind::RecoveryDeviceDeployment => {
                let Some(EventSource::RecoveryDevice { stage, index }) = event.source else {
                    return Ok(());
                };
                // Ignore if the device's stage has been dropped meanwhile.
                if !state.configuration.is_stage_active(stage) {
                    return Ok(());
                }

                if state
                    .active_motors()
                    .any(|m| m.state() == ThrustState::Thrusting)
                {
                    state.warnings.add(Warning::RecoveryDeploymentWhileBurning);
                }
                if !state.launch_rod_cleared {
                    state.warnings.add(Warning::RecoveryBeforeRodClearance);
                }
                let speed = state.velocity.norm();
                if speed > 20.0 {
                    state.warnings.add(Warning::HighSpeedDeployment { speed });
                }

                state.liftoff = true;
                state.deployed_recovery_devices.insert((stage, index));

                // Deployment before apogee: estimate how high the rocket
                // would have coasted without it.
                if self.conditions.calculate_extras && !state.apogee_reached {
                    if let Some((altitude, time)) = self.compute_coast_estimate(state) {
                        state.branch.set_optimum_altitude(altitude, time);
                    }
                }

                if !state.landed {
                    *stepper = Box::new(LandingStepper::new());
                    let mut ctx = StepContext {
                        conditions: &self.conditions,
                        listeners: &mut self.listeners,
                    };
                    stepper.initialize(state, &mut ctx)?;
                }
                state.branch.add_event(event.clone());
            }

            FlightEventKind::GroundHit => {
                state.landed = true;
                *stepper = Box::new(GroundStepper);
                let mut ctx = StepContext {
                    conditions: &self.conditions,
                    listeners: &mut self.listeners,
                };
                stepper.initialize(state, &mut ctx)?;
                state.branch.add_event(event.clone());
            }

            FlightEventKind::SimulationEnd => {
                *ret = false;
                state.branch.add_event(event.clone());
            }

            FlightEventKind::Altitude => {
                // Informational only.
            }

            FlightEventKind::Tumble => {
                if !state.landed {
                    *stepper = Box::new(TumbleStepper::new());
                    let mut ctx = StepContext {
                        conditions: &self.conditions,
                        listeners: &mut self.listeners,
                    };
                    stepper.initialize(state, &mut ctx)?;
                }
                state.branch.add_event(event.clone());
            }

            FlightEventKind::Exception => {
                state.branch.add_event(event.clone());
            }
        }
        Ok(())
    }

    /// The next event to handle, or `None` when physics must advance first.
    /// While no motor has ignited, time jumps straight to the head event.
    fn next_event(&mut self, state: &mut SimulationState) -> Option<FlightEvent> {
        let head_time = state.events.peek()?.time;
        if !state.motor_ignited && head_time > state.time {
            trace!(from = state.time, to = head_time, "idle before ignition, jumping to event");
            state.time = head_time;
        }
        state.events.pop_due(state.time)
    }

    /// Queue an event unless a listener vetoes it.
    fn add_event(&mut self, state: &mut SimulationState, event: FlightEvent) {
        if self.listeners.add_event(state, &event) {
            state.events.push(event);
        } else {
            trace!(%event, "listener vetoed event");
        }
    }

    /// Bounded nested re-entry: re-run the whole flight with recovery
    /// vetoed to find the altitude it would have coasted to.  Never recurses
    /// past one level; the nested run's warnings are discarded.
    fn compute_coast_estimate(&self, state: &SimulationState) -> Option<(f64, f64)> {
        if self.coast_depth >= 1 {
            return None;
        }
        let mut conditions = self.conditions.clone();
        conditions.calculate_extras = false;

        let mut engine = SimulationEngine {
            conditions,
            listeners: ListenerSet::new(),
            coast_depth: self.coast_depth + 1,
        };
        engine.add_listener(Box::new(CoastListener));

        let rocket = state.configuration.rocket().clone();
        match engine.simulate(&rocket) {
            Ok(data) => {
                let summary = data.summary();
                summary.time_to_apogee.map(|t| (summary.max_altitude, t))
            }
            Err(e) => {
                warn!(error = %e, "coast estimate failed");
                None
            }
        }
    }
}

fn record_initial_point(state: &mut SimulationState) {
    let position = state.position;
    let velocity = state.velocity;
    let world = state.world_position;
    let branch = &mut state.branch;
    branch.add_point();
    branch.set_value(FlightDataType::Time, state.time);
    branch.set_value(FlightDataType::Altitude, position.z);
    branch.set_value(FlightDataType::PositionEast, position.x);
    branch.set_value(FlightDataType::PositionNorth, position.y);
    branch.set_value(FlightDataType::VelocityZ, velocity.z);
    branch.set_value(FlightDataType::VelocityTotal, velocity.norm());
    branch.set_value(FlightDataType::Latitude, world.latitude);
    branch.set_value(FlightDataType::Longitude, world.longitude);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::physics::geodetic::GeodeticComputation;
    use crate::physics::gravity::ConstantGravity;
    use crate::vehicle::{
        DeploymentTrigger, IgnitionTrigger, Motor, MotorMount, RecoveryDevice, RocketBuilder,
        StageBuilder,
    };

    fn test_conditions() -> SimulationConditions {
        let mut c = SimulationConditions::default();
        c.geodetic = GeodeticComputation::Flat;
        c.gravity = Arc::new(ConstantGravity(9.81));
        c.calculate_extras = false;
        c
    }

    fn sport_rocket() -> Rocket {
        RocketBuilder::new("sport")
            .stage(
                StageBuilder::new("sustainer")
                    .dry_mass(0.08)
                    .length(0.8)
                    .diameter(0.05)
                    .cd(0.35)
                    .cg(0.45)
                    .cp(0.6)
                    .longitudinal_inertia(0.02)
                    .rotational_inertia(0.0002)
                    .motor_mount(MotorMount::new(
                        Motor::constant("T20", 20.0, 2.0, 0.02).with_ejection_delay(3.0),
                    ))
                    .recovery_device(
                        RecoveryDevice::parachute("main", 0.45)
                            .deploy_on(DeploymentTrigger::Apogee, 0.0),
                    )
                    .build(),
            )
            .build()
    }

    #[test]
    fn no_motors_is_a_fatal_precondition() {
        let rocket = RocketBuilder::new("glider")
            .stage(StageBuilder::new("body").build())
            .build();
        let mut engine = SimulationEngine::new(test_conditions());
        let err = engine.simulate(&rocket).unwrap_err();
        assert!(matches!(err, SimulationError::NoMotorsDefined));
        assert!(err.is_precondition());
    }

    #[test]
    fn no_ignition_is_a_fatal_precondition() {
        let rocket = RocketBuilder::new("dud")
            .stage(
                StageBuilder::new("single")
                    .dry_mass(0.1)
                    .motor_mount(
                        MotorMount::new(Motor::constant("T20", 20.0, 2.0, 0.02))
                            .ignition(IgnitionTrigger::Never, 0.0),
                    )
                    .build(),
            )
            .build();
        let mut engine = SimulationEngine::new(test_conditions());
        let err = engine.simulate(&rocket).unwrap_err();
        assert!(matches!(err, SimulationError::NoIgnition));
    }

    #[test]
    fn burnout_on_the_pad_is_a_fatal_precondition() {
        // 0.2 N of thrust can never lift 1 kg.
        let rocket = RocketBuilder::new("brick")
            .stage(
                StageBuilder::new("single")
                    .dry_mass(1.0)
                    .motor_mount(MotorMount::new(Motor::constant("tiny", 0.2, 1.0, 0.001)))
                    .build(),
            )
            .build();
        let mut engine = SimulationEngine::new(test_conditions());
        let err = engine.simulate(&rocket).unwrap_err();
        assert!(matches!(err, SimulationError::EarlyMotorBurnout));
    }

    #[test]
    fn full_flight_produces_one_branch_and_lands() {
        let mut engine = SimulationEngine::new(test_conditions());
        let data = engine.simulate(&sport_rocket()).unwrap();

        assert_eq!(data.branch_count(), 1);
        let branch = data.branch(0).unwrap();
        assert!(!branch.is_mutable());

        let summary = data.summary();
        assert!(summary.max_altitude > 50.0, "apogee {}", summary.max_altitude);
        assert!(summary.flight_time.is_some());
        assert_eq!(branch.last(FlightDataType::Altitude), Some(0.0));
    }

    #[test]
    fn ignition_delay_skips_idle_time() {
        let mut rocket = sport_rocket();
        rocket.stages[0]
            .motor_mount
            .as_mut()
            .unwrap()
            .ignition = crate::vehicle::IgnitionConfig {
            trigger: IgnitionTrigger::Launch,
            delay: 2.5,
        };
        let mut engine = SimulationEngine::new(test_conditions());
        let data = engine.simulate(&rocket).unwrap();

        let branch = data.branch(0).unwrap();
        let ignition = branch
            .events()
            .iter()
            .find(|e| e.kind == FlightEventKind::Ignition)
            .unwrap();
        assert!((ignition.time - 2.5).abs() < 1e-9);

        // No physics happened before ignition: the second sample jumps
        // straight past the idle period.
        let times = branch.get(FlightDataType::Time).unwrap();
        assert_eq!(times[0], 0.0);
        assert!(times[1] >= 2.5);
    }

    #[test]
    fn coast_estimate_sets_optimum_altitude_for_early_deployment() {
        let mut rocket = sport_rocket();
        // Deploy on the ejection charge, which fires well before apogee.
        rocket.stages[0].recovery_devices[0] = RecoveryDevice::parachute("main", 0.45)
            .deploy_on(DeploymentTrigger::EjectionCharge, 0.0);
        rocket.stages[0].motor_mount.as_mut().unwrap().motor =
            Motor::constant("T20", 20.0, 2.0, 0.02).with_ejection_delay(0.5);

        let mut conditions = test_conditions();
        conditions.calculate_extras = true;
        let mut engine = SimulationEngine::new(conditions);
        let data = engine.simulate(&rocket).unwrap();

        let summary = data.summary();
        let optimum = summary.optimum_altitude.expect("optimum altitude not computed");
        assert!(
            optimum >= summary.max_altitude - 1e-6,
            "coasting further cannot lose altitude: optimum {optimum} < max {}",
            summary.max_altitude
        );
        assert!(summary.deployment_velocity.is_some());
    }

    #[test]
    fn deployment_before_apogee_warns_about_speed() {
        let mut rocket = sport_rocket();
        rocket.stages[0].recovery_devices[0] = RecoveryDevice::parachute("main", 0.45)
            .deploy_on(DeploymentTrigger::EjectionCharge, 0.0);
        rocket.stages[0].motor_mount.as_mut().unwrap().motor =
            Motor::constant("T20", 20.0, 2.0, 0.02).with_ejection_delay(0.1);

        let mut engine = SimulationEngine::new(test_conditions());
        let data = engine.simulate(&rocket).unwrap();
        assert!(data
            .warnings()
            .contains(&Warning::HighSpeedDeployment { speed: 0.0 }));
    }
}
