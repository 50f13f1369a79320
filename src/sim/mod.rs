pub mod conditions;
pub mod engine;
pub mod event;
pub mod listener;
pub mod motor;
pub mod queue;
pub mod state;
pub mod steppers;

pub use conditions::SimulationConditions;
pub use engine::SimulationEngine;
pub use event::{EventPayload, EventSource, FlightEvent, FlightEventKind, MotorId};
pub use listener::{AccelerationData, CoastListener, ListenerSet, SimulationListener};
pub use motor::{MotorClusterState, ThrustState};
pub use queue::EventQueue;
pub use state::SimulationState;
