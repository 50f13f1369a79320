pub mod motor;
pub mod rocket;
pub mod stage;

pub use motor::{IgnitionConfig, IgnitionTrigger, Motor, MotorMount};
pub use rocket::{FlightConfiguration, Rocket, RocketBuilder};
pub use stage::{
    DeploymentConfig, DeploymentTrigger, RecoveryDevice, SeparationConfig, SeparationTrigger,
    Stage, StageBuilder,
};
