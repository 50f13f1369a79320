use nalgebra::Vector3;

use crate::data::types::FlightDataType;
use crate::error::SimResult;
use crate::sim::state::SimulationState;

use super::{StepContext, Stepper, MIN_TIME_STEP, RECOVERY_TIME_STEP};

// ---------------------------------------------------------------------------
// Ground stepper: post-impact idle advancement
// ---------------------------------------------------------------------------

/// Advances time only; the rocket sits on the ground while remaining
/// queued events (late charges, bookkeeping) play out.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroundStepper;

impl Stepper for GroundStepper {
    fn initialize(
        &mut self,
        state: &mut SimulationState,
        _ctx: &mut StepContext<'_>,
    ) -> SimResult<()> {
        state.velocity = Vector3::zeros();
        state.acceleration = Vector3::zeros();
        state.angular_velocity = Vector3::zeros();
        state.position.z = state.position.z.max(0.0);
        Ok(())
    }

    fn step(
        &mut self,
        state: &mut SimulationState,
        _ctx: &mut StepContext<'_>,
        max_time_step: f64,
    ) -> SimResult<()> {
        let time_step = max_time_step.clamp(MIN_TIME_STEP, RECOVERY_TIME_STEP);
        state.time += time_step;
        state.previous_time_step = time_step;

        let branch = &mut state.branch;
        branch.add_point();
        branch.set_value(FlightDataType::Time, state.time);
        branch.set_value(FlightDataType::TimeStep, time_step);
        branch.set_value(FlightDataType::Altitude, state.position.z);
        branch.set_value(FlightDataType::PositionEast, state.position.x);
        branch.set_value(FlightDataType::PositionNorth, state.position.y);
        branch.set_value(FlightDataType::VelocityZ, 0.0);
        branch.set_value(FlightDataType::VelocityTotal, 0.0);
        branch.set_value(FlightDataType::AccelerationTotal, 0.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::conditions::SimulationConditions;
    use crate::sim::listener::ListenerSet;
    use crate::vehicle::{FlightConfiguration, RocketBuilder, StageBuilder};

    #[test]
    fn ground_stepper_only_advances_time() {
        let rocket = RocketBuilder::new("ground-test")
            .stage(StageBuilder::new("s").build())
            .build();
        let conditions = SimulationConditions::default();
        let mut state = SimulationState::new(FlightConfiguration::new(rocket), &conditions);
        state.velocity.z = -3.0;
        state.landed = true;

        let mut listeners = ListenerSet::new();
        let mut ctx = StepContext { conditions: &conditions, listeners: &mut listeners };
        let mut stepper = GroundStepper;
        stepper.initialize(&mut state, &mut ctx).unwrap();
        assert_eq!(state.velocity.norm(), 0.0);

        let before = state.position;
        stepper.step(&mut state, &mut ctx, 0.2).unwrap();
        assert!((state.time - 0.2).abs() < 1e-12);
        assert_eq!(state.position, before);
    }
}
