use std::sync::Arc;

use crate::physics::aerodynamics::{AerodynamicModel, SlenderBodyAero};
use crate::physics::atmosphere::{AtmosphereModel, IsaAtmosphere};
use crate::physics::geodetic::{GeodeticComputation, WorldCoordinate};
use crate::physics::gravity::{GravityModel, InverseSquareGravity};
use crate::physics::mass::{ComponentMassModel, MassModel};
use crate::physics::wind::{CalmWind, WindModel};

// ---------------------------------------------------------------------------
// Simulation conditions
// ---------------------------------------------------------------------------

/// A recommended reasonably accurate user time step, s.
pub const RECOMMENDED_TIME_STEP: f64 = 0.05;

/// A recommended maximum angle step, rad.
pub const RECOMMENDED_ANGLE_STEP: f64 = 3.0 * std::f64::consts::PI / 180.0;

/// Everything about a run that is not the rocket itself: the launch site
/// and rod, the step limits, and the external models.  Model handles are
/// shared immutably, so cloning conditions for a nested run is cheap.
#[derive(Clone)]
pub struct SimulationConditions {
    pub launch_site: WorldCoordinate,
    pub launch_rod_length: f64,     // m
    pub launch_rod_angle: f64,      // rad from vertical
    pub launch_rod_direction: f64,  // azimuth, rad
    pub time_step: f64,             // user-selected step, s
    pub max_angle_step: f64,        // rad
    pub geodetic: GeodeticComputation,
    pub atmosphere: Arc<dyn AtmosphereModel>,
    pub wind: Arc<dyn WindModel>,
    pub gravity: Arc<dyn GravityModel>,
    pub aerodynamics: Arc<dyn AerodynamicModel>,
    pub mass: Arc<dyn MassModel>,
    /// Seed for the integrator's symmetry-breaking jitter.
    pub random_seed: u64,
    /// Compute the optional extras (optimum coast altitude etc.).
    pub calculate_extras: bool,
    /// Hard cap on simulated time, s.
    pub max_simulation_time: f64,
}

impl Default for SimulationConditions {
    fn default() -> Self {
        Self {
            launch_site: WorldCoordinate::default(),
            launch_rod_length: 1.0,
            launch_rod_angle: 0.0,
            launch_rod_direction: 0.0,
            time_step: RECOMMENDED_TIME_STEP,
            max_angle_step: RECOMMENDED_ANGLE_STEP,
            geodetic: GeodeticComputation::Spherical,
            atmosphere: Arc::new(IsaAtmosphere),
            wind: Arc::new(CalmWind),
            gravity: Arc::new(InverseSquareGravity),
            aerodynamics: Arc::new(SlenderBodyAero),
            mass: Arc::new(ComponentMassModel),
            random_seed: 0,
            calculate_extras: true,
            max_simulation_time: 1200.0,
        }
    }
}

impl std::fmt::Debug for SimulationConditions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationConditions")
            .field("launch_site", &self.launch_site)
            .field("launch_rod_length", &self.launch_rod_length)
            .field("launch_rod_angle", &self.launch_rod_angle)
            .field("launch_rod_direction", &self.launch_rod_direction)
            .field("time_step", &self.time_step)
            .field("max_angle_step", &self.max_angle_step)
            .field("geodetic", &self.geodetic)
            .field("random_seed", &self.random_seed)
            .field("calculate_extras", &self.calculate_extras)
            .field("max_simulation_time", &self.max_simulation_time)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let c = SimulationConditions::default();
        assert_eq!(c.time_step, RECOMMENDED_TIME_STEP);
        assert!(c.launch_rod_length > 0.0);
        assert!(c.max_simulation_time > 0.0);
    }

    #[test]
    fn clone_shares_models() {
        let c = SimulationConditions::default();
        let d = c.clone();
        assert!(Arc::ptr_eq(&c.atmosphere, &d.atmosphere));
    }
}
