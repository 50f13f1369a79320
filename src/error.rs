use thiserror::Error;

/// Unified error type for the simulation core.
///
/// The variants split into two families.  Fatal preconditions abort the
/// whole run before any useful data exists.  Everything else is a fatal
/// numerical failure that aborts only the branch being simulated;
/// already-completed branches keep their results.
#[derive(Debug, Clone, Error)]
pub enum SimulationError {
    /// The selected flight configuration has no motors at all.
    #[error("no motors defined in the flight configuration")]
    NoMotorsDefined,

    /// The event loop finished without a single motor ignition.
    #[error("no motor ignited during the simulation")]
    NoIgnition,

    /// A motor burned out while the rocket was still on the pad.
    #[error("motor burnout before liftoff")]
    EarlyMotorBurnout,

    /// A tracked quantity became not-a-number.  Carries a dump of the
    /// offending state for the bug report.
    #[error("simulation produced a not-a-number value: {0}")]
    NotANumber(String),

    /// Velocity, position, or angular velocity exploded past any
    /// physically meaningful magnitude.
    #[error("simulation values out of range (numerical blow-up)")]
    ValuesOutOfRange,

    /// The active configuration has zero mass, so no acceleration can be
    /// computed.
    #[error("active configuration has zero mass")]
    NoActiveMass,
}

impl SimulationError {
    /// Fatal preconditions abort the whole run; all other errors abort
    /// only the branch in which they occurred.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            SimulationError::NoMotorsDefined
                | SimulationError::NoIgnition
                | SimulationError::EarlyMotorBurnout
        )
    }
}

/// Convenience alias for `Result<T, SimulationError>`.
pub type SimResult<T> = Result<T, SimulationError>;
