use std::fmt;

use crate::sim::event::FlightEventKind;

// ---------------------------------------------------------------------------
// Physically-motivated warnings
// ---------------------------------------------------------------------------

/// Non-fatal diagnostics accumulated during a simulation branch.  These
/// never interrupt the run.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// Tumble condition met while a motor was still producing thrust.
    TumbleUnderThrust,
    /// A recovery device deployed while a motor was burning.
    RecoveryDeploymentWhileBurning,
    /// A recovery device deployed before launch rod clearance.
    RecoveryBeforeRodClearance,
    /// A recovery device deployed at high speed.
    HighSpeedDeployment { speed: f64 },
    /// An event other than bookkeeping arrived after ground hit.
    EventAfterLanding { kind: FlightEventKind },
    /// The angle of attack left the range where the aerodynamic
    /// coefficients are trustworthy.
    LargeAngleOfAttack,
    /// The branch was aborted by a simulation error.
    SimulationAbort { message: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::TumbleUnderThrust => {
                write!(f, "tumble conditions met while the motor was thrusting")
            }
            Warning::RecoveryDeploymentWhileBurning => {
                write!(f, "recovery device deployed while a motor was burning")
            }
            Warning::RecoveryBeforeRodClearance => {
                write!(f, "recovery device deployed before launch rod clearance")
            }
            Warning::HighSpeedDeployment { speed } => {
                write!(f, "recovery device deployed at high speed ({speed:.1} m/s)")
            }
            Warning::EventAfterLanding { kind } => {
                write!(f, "event {kind} occurred after landing")
            }
            Warning::LargeAngleOfAttack => {
                write!(f, "large angle of attack encountered")
            }
            Warning::SimulationAbort { message } => {
                write!(f, "simulation aborted: {message}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Warning set
// ---------------------------------------------------------------------------

/// An ordered set of warnings, de-duplicated by warning kind so a repeated
/// condition is reported once.
#[derive(Debug, Clone, Default)]
pub struct WarningSet {
    warnings: Vec<Warning>,
}

impl WarningSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a warning unless one of the same kind is already present.
    pub fn add(&mut self, warning: Warning) {
        let kind = std::mem::discriminant(&warning);
        if !self.warnings.iter().any(|w| std::mem::discriminant(w) == kind) {
            self.warnings.push(warning);
        }
    }

    /// Fold another set into this one.
    pub fn merge(&mut self, other: &WarningSet) {
        for w in &other.warnings {
            self.add(w.clone());
        }
    }

    pub fn contains(&self, warning: &Warning) -> bool {
        let kind = std::mem::discriminant(warning);
        self.warnings.iter().any(|w| std::mem::discriminant(w) == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.warnings.iter()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}

impl fmt::Display for WarningSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, w) in self.warnings.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{w}")?;
        }
        Ok(())
    }
}
