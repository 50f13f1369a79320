pub mod data;
pub mod error;
pub mod io;
pub mod physics;
pub mod sim;
pub mod vehicle;

pub use error::{SimResult, SimulationError};

// Commonly used types at the crate root
pub use data::{DataTypeCatalog, FlightData, FlightDataBranch, FlightDataType, FlightSummary};
pub use sim::{
    FlightEvent, FlightEventKind, SimulationConditions, SimulationEngine, SimulationListener,
};
pub use vehicle::{
    DeploymentTrigger, IgnitionTrigger, Motor, MotorMount, RecoveryDevice, Rocket, RocketBuilder,
    SeparationTrigger, Stage, StageBuilder,
};
