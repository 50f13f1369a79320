use std::cell::OnceCell;

use super::branch::FlightDataBranch;
use super::types::FlightDataType;
use super::warnings::WarningSet;
use crate::sim::event::FlightEventKind;

// ---------------------------------------------------------------------------
// Aggregate flight data
// ---------------------------------------------------------------------------

/// Derived scalar results of a flight, computed from the primary branch and
/// its event timestamps.
#[derive(Debug, Clone, Default)]
pub struct FlightSummary {
    pub max_altitude: f64,
    pub max_velocity: f64,
    pub max_mach: f64,
    /// Largest acceleration before the first recovery deployment, so the
    /// chute-opening shock does not mask the boost phase.
    pub max_acceleration: f64,
    pub time_to_apogee: Option<f64>,
    pub flight_time: Option<f64>,
    pub ground_hit_velocity: Option<f64>,
    pub launch_rod_velocity: Option<f64>,
    pub deployment_velocity: Option<f64>,
    /// Altitude the flight would have reached without recovery deployment.
    pub optimum_altitude: Option<f64>,
    pub time_to_optimum_altitude: Option<f64>,
}

/// The terminal result of a simulation: one branch per simulated stage,
/// the merged warning set, and a lazily computed summary.
#[derive(Debug, Default)]
pub struct FlightData {
    branches: Vec<FlightDataBranch>,
    warnings: WarningSet,
    summary: OnceCell<FlightSummary>,
}

impl FlightData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_branch(&mut self, branch: FlightDataBranch) {
        self.branches.push(branch);
    }

    pub fn branches(&self) -> &[FlightDataBranch] {
        &self.branches
    }

    pub fn branch(&self, index: usize) -> Option<&FlightDataBranch> {
        self.branches.get(index)
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    pub fn warnings(&self) -> &WarningSet {
        &self.warnings
    }

    pub fn warnings_mut(&mut self) -> &mut WarningSet {
        &mut self.warnings
    }

    /// The summary scalars, computed on first access from branch 0.
    pub fn summary(&self) -> &FlightSummary {
        self.summary.get_or_init(|| self.compute_summary())
    }

    fn compute_summary(&self) -> FlightSummary {
        let Some(branch) = self.branches.first() else {
            return FlightSummary::default();
        };

        let event_time = |kind: FlightEventKind| {
            branch.events().iter().find(|e| e.kind == kind).map(|e| e.time)
        };

        let time_to_apogee = event_time(FlightEventKind::Apogee);
        let flight_time = event_time(FlightEventKind::GroundHit);
        let deployment_time = event_time(FlightEventKind::RecoveryDeviceDeployment);

        let velocity_at = |time: Option<f64>| {
            time.and_then(|t| branch.value_at_time(FlightDataType::VelocityTotal, t))
        };

        // Max acceleration only counts up to the first deployment.
        let max_acceleration = match (
            branch.get(FlightDataType::AccelerationTotal),
            branch.get(FlightDataType::Time),
        ) {
            (Some(accel), Some(times)) => {
                let cutoff = deployment_time.unwrap_or(f64::INFINITY);
                accel
                    .iter()
                    .zip(times)
                    .filter(|(a, t)| !a.is_nan() && **t <= cutoff)
                    .map(|(a, _)| *a)
                    .fold(0.0, f64::max)
            }
            _ => 0.0,
        };

        FlightSummary {
            max_altitude: branch.max(FlightDataType::Altitude).unwrap_or(0.0),
            max_velocity: branch.max(FlightDataType::VelocityTotal).unwrap_or(0.0),
            max_mach: branch.max(FlightDataType::MachNumber).unwrap_or(0.0),
            max_acceleration,
            time_to_apogee,
            flight_time,
            ground_hit_velocity: velocity_at(flight_time),
            launch_rod_velocity: velocity_at(event_time(FlightEventKind::LaunchRod)),
            deployment_velocity: velocity_at(deployment_time),
            optimum_altitude: branch.optimum_altitude(),
            time_to_optimum_altitude: branch.time_to_optimum_altitude(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::event::FlightEvent;

    fn sample_branch() -> FlightDataBranch {
        let mut b = FlightDataBranch::new("main");
        let rows = [
            // (time, altitude, velocity, acceleration)
            (0.0, 0.0, 0.0, 150.0),
            (1.0, 70.0, 140.0, 150.0),
            (2.0, 240.0, 120.0, 9.8),
            (6.0, 500.0, 0.0, 9.8),
            (8.0, 450.0, 30.0, 400.0), // chute shock after deployment
            (20.0, 0.0, 5.0, 0.0),
        ];
        for (t, alt, vel, acc) in rows {
            b.add_point();
            b.set_value(FlightDataType::Time, t);
            b.set_value(FlightDataType::Altitude, alt);
            b.set_value(FlightDataType::VelocityTotal, vel);
            b.set_value(FlightDataType::AccelerationTotal, acc);
        }
        b.add_event(FlightEvent::new(FlightEventKind::Apogee, 6.0));
        b.add_event(FlightEvent::new(FlightEventKind::RecoveryDeviceDeployment, 6.5));
        b.add_event(FlightEvent::new(FlightEventKind::GroundHit, 20.0));
        b
    }

    #[test]
    fn summary_from_branch_and_events() {
        let mut data = FlightData::new();
        data.add_branch(sample_branch());
        let s = data.summary();

        assert_eq!(s.max_altitude, 500.0);
        assert_eq!(s.max_velocity, 140.0);
        assert_eq!(s.time_to_apogee, Some(6.0));
        assert_eq!(s.flight_time, Some(20.0));
        assert_eq!(s.ground_hit_velocity, Some(5.0));
        // Chute shock at t=8 lies after deployment and is excluded.
        assert_eq!(s.max_acceleration, 150.0);
    }

    #[test]
    fn empty_flight_data_has_default_summary() {
        let data = FlightData::new();
        assert_eq!(data.summary().max_altitude, 0.0);
        assert!(data.summary().time_to_apogee.is_none());
    }
}
