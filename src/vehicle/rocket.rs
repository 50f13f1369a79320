use std::collections::BTreeSet;

use super::motor::MotorMount;
use super::stage::Stage;

// ---------------------------------------------------------------------------
// Rocket: ordered stack of stages, stage 0 topmost
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Rocket {
    pub name: String,
    pub stages: Vec<Stage>,
}

impl Rocket {
    /// Total length of all stages.
    pub fn total_length(&self) -> f64 {
        self.stages.iter().map(|s| s.length).sum()
    }

    /// Axial position of a stage's forward end, measured aft from the nose.
    pub fn stage_offset(&self, stage_number: usize) -> f64 {
        self.stages[..stage_number].iter().map(|s| s.length).sum()
    }

    /// Total dry mass, all stages.
    pub fn dry_mass(&self) -> f64 {
        self.stages.iter().map(|s| s.dry_mass).sum()
    }
}

// ---------------------------------------------------------------------------
// Rocket builder
// ---------------------------------------------------------------------------

pub struct RocketBuilder {
    name: String,
    stages: Vec<Stage>,
}

impl RocketBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), stages: vec![] }
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> Rocket {
        Rocket { name: self.name, stages: self.stages }
    }
}

// ---------------------------------------------------------------------------
// Flight configuration: a rocket plus the set of stages still attached
// ---------------------------------------------------------------------------

/// The per-branch view of the rocket.  Every simulation branch owns an
/// independent copy, so restricting the active set never aliases a parent
/// branch's configuration.
#[derive(Debug, Clone)]
pub struct FlightConfiguration {
    rocket: Rocket,
    active: BTreeSet<usize>,
}

impl FlightConfiguration {
    /// All stages active.
    pub fn new(rocket: Rocket) -> Self {
        let active = (0..rocket.stages.len()).collect();
        Self { rocket, active }
    }

    pub fn rocket(&self) -> &Rocket {
        &self.rocket
    }

    pub fn stage_count(&self) -> usize {
        self.rocket.stages.len()
    }

    pub fn is_stage_active(&self, stage_number: usize) -> bool {
        self.active.contains(&stage_number)
    }

    /// Iterate over (stage number, stage) for the active stages, top first.
    pub fn active_stages(&self) -> impl Iterator<Item = (usize, &Stage)> {
        self.active.iter().map(move |&n| (n, &self.rocket.stages[n]))
    }

    /// Active motor mounts as (stage number, mount).
    pub fn active_motor_mounts(&self) -> impl Iterator<Item = (usize, &MotorMount)> {
        self.active_stages()
            .filter_map(|(n, s)| s.motor_mount.as_ref().map(|m| (n, m)))
    }

    /// Whether any stage of the full rocket carries a motor.
    pub fn has_motors(&self) -> bool {
        self.rocket.stages.iter().any(|s| s.motor_mount.is_some())
    }

    /// Restrict the configuration to a single stage (the separated booster).
    pub fn set_only_stage(&mut self, stage_number: usize) {
        self.active.retain(|&n| n == stage_number);
    }

    /// Drop `stage_number` and everything below it (the parent branch after
    /// a separation).
    pub fn retain_above(&mut self, stage_number: usize) {
        self.active.retain(|&n| n < stage_number);
    }

    /// Reference diameter: the widest active stage.
    pub fn reference_diameter(&self) -> f64 {
        self.active_stages()
            .map(|(_, s)| s.diameter)
            .fold(0.0, f64::max)
    }

    /// Reference length for moment coefficients (the reference diameter).
    pub fn reference_length(&self) -> f64 {
        self.reference_diameter()
    }

    pub fn reference_area(&self) -> f64 {
        let d = self.reference_diameter();
        std::f64::consts::FRAC_PI_4 * d * d
    }

    /// Aerodynamic length of the active configuration.
    pub fn active_length(&self) -> f64 {
        self.active_stages().map(|(_, s)| s.length).sum()
    }

    /// Name of the topmost active stage; used to label data branches.
    pub fn topmost_stage_name(&self) -> &str {
        self.active
            .iter()
            .next()
            .map(|&n| self.rocket.stages[n].name.as_str())
            .unwrap_or(self.rocket.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::stage::StageBuilder;

    fn three_stage() -> Rocket {
        RocketBuilder::new("Test")
            .stage(StageBuilder::new("Sustainer").length(1.0).diameter(0.08).build())
            .stage(StageBuilder::new("Interstage").length(0.5).diameter(0.10).build())
            .stage(StageBuilder::new("Booster").length(0.8).diameter(0.12).build())
            .build()
    }

    #[test]
    fn stage_offsets_stack_downward() {
        let r = three_stage();
        assert_eq!(r.stage_offset(0), 0.0);
        assert!((r.stage_offset(1) - 1.0).abs() < 1e-12);
        assert!((r.stage_offset(2) - 1.5).abs() < 1e-12);
        assert!((r.total_length() - 2.3).abs() < 1e-12);
    }

    #[test]
    fn separation_restricts_active_sets() {
        let mut parent = FlightConfiguration::new(three_stage());
        let mut booster = parent.clone();

        parent.retain_above(2);
        booster.set_only_stage(2);

        assert!(parent.is_stage_active(0));
        assert!(parent.is_stage_active(1));
        assert!(!parent.is_stage_active(2));

        assert!(!booster.is_stage_active(0));
        assert!(booster.is_stage_active(2));
        assert_eq!(booster.topmost_stage_name(), "Booster");
    }

    #[test]
    fn reference_uses_widest_active_stage() {
        let mut config = FlightConfiguration::new(three_stage());
        assert!((config.reference_diameter() - 0.12).abs() < 1e-12);
        config.retain_above(2);
        assert!((config.reference_diameter() - 0.10).abs() < 1e-12);
    }
}
