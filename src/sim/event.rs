use std::fmt;

// ---------------------------------------------------------------------------
// Flight events
// ---------------------------------------------------------------------------

/// Identifier of a motor cluster: one mount per stage, clusters are scaled
/// by the mount's motor count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MotorId {
    pub stage: usize,
}

/// What caused an event.  Sources are plain copyable ids, so retaining an
/// event cannot keep a torn-down configuration alive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventSource {
    Rocket,
    Stage(usize),
    Motor(MotorId),
    RecoveryDevice { stage: usize, index: usize },
}

impl EventSource {
    /// The stage this source belongs to, if any.
    pub fn stage(&self) -> Option<usize> {
        match self {
            EventSource::Rocket => None,
            EventSource::Stage(n) => Some(*n),
            EventSource::Motor(id) => Some(id.stage),
            EventSource::RecoveryDevice { stage, .. } => Some(*stage),
        }
    }
}

/// Extra data carried by an event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// Altitude before and after the step (ALTITUDE events).
    AltitudeChange { old: f64, new: f64 },
    /// Free-form diagnostic text (EXCEPTION events).
    Message(String),
}

/// Kinds of flight events.  The declaration order doubles as the rank used
/// to break ties between events scheduled for the same instant, so LAUNCH
/// sorts before IGNITION at equal time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlightEventKind {
    Launch,
    Ignition,
    Liftoff,
    LaunchRod,
    Burnout,
    EjectionCharge,
    StageSeparation,
    Apogee,
    RecoveryDeviceDeployment,
    GroundHit,
    SimulationEnd,
    /// Informational altitude change, fired every physical step.
    Altitude,
    Tumble,
    Exception,
}

impl FlightEventKind {
    /// Tie-break rank: declaration order.
    pub fn rank(self) -> u8 {
        match self {
            FlightEventKind::Launch => 0,
            FlightEventKind::Ignition => 1,
            FlightEventKind::Liftoff => 2,
            FlightEventKind::LaunchRod => 3,
            FlightEventKind::Burnout => 4,
            FlightEventKind::EjectionCharge => 5,
            FlightEventKind::StageSeparation => 6,
            FlightEventKind::Apogee => 7,
            FlightEventKind::RecoveryDeviceDeployment => 8,
            FlightEventKind::GroundHit => 9,
            FlightEventKind::SimulationEnd => 10,
            FlightEventKind::Altitude => 11,
            FlightEventKind::Tumble => 12,
            FlightEventKind::Exception => 13,
        }
    }
}

impl fmt::Display for FlightEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlightEventKind::Launch => "LAUNCH",
            FlightEventKind::Ignition => "IGNITION",
            FlightEventKind::Liftoff => "LIFTOFF",
            FlightEventKind::LaunchRod => "LAUNCHROD",
            FlightEventKind::Burnout => "BURNOUT",
            FlightEventKind::EjectionCharge => "EJECTION_CHARGE",
            FlightEventKind::StageSeparation => "STAGE_SEPARATION",
            FlightEventKind::Apogee => "APOGEE",
            FlightEventKind::RecoveryDeviceDeployment => "RECOVERY_DEVICE_DEPLOYMENT",
            FlightEventKind::GroundHit => "GROUND_HIT",
            FlightEventKind::SimulationEnd => "SIMULATION_END",
            FlightEventKind::Altitude => "ALTITUDE",
            FlightEventKind::Tumble => "TUMBLE",
            FlightEventKind::Exception => "EXCEPTION",
        };
        f.write_str(name)
    }
}

/// A discrete event occurring during the flight.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightEvent {
    pub kind: FlightEventKind,
    pub time: f64,
    pub source: Option<EventSource>,
    pub payload: Option<EventPayload>,
}

impl FlightEvent {
    pub fn new(kind: FlightEventKind, time: f64) -> Self {
        Self { kind, time, source: None, payload: None }
    }

    pub fn with_source(mut self, source: EventSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_payload(mut self, payload: EventPayload) -> Self {
        self.payload = Some(payload);
        self
    }
}

impl fmt::Display for FlightEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ t={:.4}s", self.kind, self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_follows_declaration_order() {
        assert!(FlightEventKind::Launch.rank() < FlightEventKind::Ignition.rank());
        assert!(FlightEventKind::Ignition.rank() < FlightEventKind::Liftoff.rank());
        assert!(FlightEventKind::GroundHit.rank() < FlightEventKind::SimulationEnd.rank());
    }

    #[test]
    fn source_stage_resolution() {
        assert_eq!(EventSource::Rocket.stage(), None);
        assert_eq!(EventSource::Stage(2).stage(), Some(2));
        assert_eq!(EventSource::Motor(MotorId { stage: 1 }).stage(), Some(1));
        assert_eq!(
            EventSource::RecoveryDevice { stage: 0, index: 3 }.stage(),
            Some(0)
        );
    }
}
