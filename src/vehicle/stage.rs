use crate::sim::event::{FlightEvent, FlightEventKind, EventPayload};

use super::motor::MotorMount;

// ---------------------------------------------------------------------------
// Recovery devices
// ---------------------------------------------------------------------------

/// What causes a recovery device to deploy.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DeploymentTrigger {
    /// Deploy at launch (tethered streamer tests and the like).
    Launch,
    /// Deploy on this stage's ejection charge.
    EjectionCharge,
    /// Deploy at apogee.
    #[default]
    Apogee,
    /// Deploy when descending through the given altitude after apogee.
    Altitude(f64),
    /// Never deploy.
    Never,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeploymentConfig {
    pub trigger: DeploymentTrigger,
    pub delay: f64,
}

impl DeploymentConfig {
    /// Whether `event` activates this deployment for a device on
    /// `device_stage`.
    pub fn activates_on(
        &self,
        event: &FlightEvent,
        device_stage: usize,
        apogee_reached: bool,
    ) -> bool {
        match self.trigger {
            DeploymentTrigger::Launch => event.kind == FlightEventKind::Launch,
            DeploymentTrigger::EjectionCharge => {
                event.kind == FlightEventKind::EjectionCharge
                    && event.source.and_then(|s| s.stage()) == Some(device_stage)
            }
            DeploymentTrigger::Apogee => event.kind == FlightEventKind::Apogee,
            DeploymentTrigger::Altitude(limit) => {
                if event.kind != FlightEventKind::Altitude || !apogee_reached {
                    return false;
                }
                matches!(
                    event.payload,
                    Some(EventPayload::AltitudeChange { old, new })
                        if old >= limit && new <= limit
                )
            }
            DeploymentTrigger::Never => false,
        }
    }
}

/// A parachute or streamer.
#[derive(Debug, Clone)]
pub struct RecoveryDevice {
    pub name: String,
    pub cd: f64,
    pub area: f64, // m^2
    pub deployment: DeploymentConfig,
}

impl RecoveryDevice {
    pub fn parachute(name: impl Into<String>, diameter: f64) -> Self {
        Self {
            name: name.into(),
            cd: 0.8,
            area: std::f64::consts::FRAC_PI_4 * diameter * diameter,
            deployment: DeploymentConfig::default(),
        }
    }

    pub fn cd(mut self, cd: f64) -> Self {
        self.cd = cd;
        self
    }

    pub fn deploy_on(mut self, trigger: DeploymentTrigger, delay: f64) -> Self {
        self.deployment = DeploymentConfig { trigger, delay };
        self
    }

    /// Drag area contribution CdA.
    pub fn drag_area(&self) -> f64 {
        self.cd * self.area
    }
}

// ---------------------------------------------------------------------------
// Stage separation
// ---------------------------------------------------------------------------

/// What causes a stage (other than the topmost) to separate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeparationTrigger {
    /// Ignition of a motor on a stage above this one.
    UpperStageIgnition,
    /// Ignition of this stage's own motor.
    CurrentStageIgnition,
    /// Burnout of this stage's own motor.
    #[default]
    CurrentStageBurnout,
    /// This stage's ejection charge.
    EjectionCharge,
    /// Separation at launch.
    Launch,
    /// Never separate.
    Never,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SeparationConfig {
    pub trigger: SeparationTrigger,
    pub delay: f64,
}

impl SeparationConfig {
    /// Whether `event` separates stage `stage_number`.
    pub fn separates_on(&self, event: &FlightEvent, stage_number: usize) -> bool {
        let source_stage = event.source.and_then(|s| s.stage());
        match self.trigger {
            SeparationTrigger::UpperStageIgnition => {
                event.kind == FlightEventKind::Ignition
                    && source_stage.is_some_and(|n| n < stage_number)
            }
            SeparationTrigger::CurrentStageIgnition => {
                event.kind == FlightEventKind::Ignition && source_stage == Some(stage_number)
            }
            SeparationTrigger::CurrentStageBurnout => {
                event.kind == FlightEventKind::Burnout && source_stage == Some(stage_number)
            }
            SeparationTrigger::EjectionCharge => {
                event.kind == FlightEventKind::EjectionCharge
                    && source_stage == Some(stage_number)
            }
            SeparationTrigger::Launch => event.kind == FlightEventKind::Launch,
            SeparationTrigger::Never => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Stage definition
// ---------------------------------------------------------------------------

/// One stage of the rocket.  Stage 0 is the topmost (sustainer); higher
/// indices sit below it.  Positions (`cg_x`, `cp_x`) are measured aft from
/// the stage's own forward end.
#[derive(Debug, Clone)]
pub struct Stage {
    pub name: String,
    pub dry_mass: f64,              // kg, structure without motor propellant
    pub length: f64,                // m
    pub diameter: f64,              // m, reference diameter
    pub cd: f64,                    // axial drag coefficient
    pub cg_x: f64,                  // m aft of the stage's forward end
    pub cp_x: f64,                  // m aft of the stage's forward end
    pub longitudinal_inertia: f64,  // kg·m^2 about the CG
    pub rotational_inertia: f64,    // kg·m^2 about the roll axis
    pub fin_count: usize,
    pub fin_area: f64,              // m^2, planform area of the fin set
    pub body_tube_area: f64,        // m^2, planform area of the body tube
    pub motor_mount: Option<MotorMount>,
    pub recovery_devices: Vec<RecoveryDevice>,
    pub separation: SeparationConfig,
}

impl Stage {
    pub fn reference_area(&self) -> f64 {
        std::f64::consts::FRAC_PI_4 * self.diameter * self.diameter
    }
}

// ---------------------------------------------------------------------------
// Stage builder
// ---------------------------------------------------------------------------

pub struct StageBuilder {
    stage: Stage,
}

impl StageBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            stage: Stage {
                name: name.into(),
                dry_mass: 10.0,
                length: 1.5,
                diameter: 0.1,
                cd: 0.3,
                cg_x: 0.8,
                cp_x: 1.0,
                longitudinal_inertia: 5.0,
                rotational_inertia: 0.05,
                fin_count: 3,
                fin_area: 0.01,
                body_tube_area: 0.15,
                motor_mount: None,
                recovery_devices: Vec::new(),
                separation: SeparationConfig::default(),
            },
        }
    }

    pub fn dry_mass(mut self, v: f64) -> Self { self.stage.dry_mass = v; self }
    pub fn length(mut self, v: f64) -> Self { self.stage.length = v; self }
    pub fn diameter(mut self, v: f64) -> Self { self.stage.diameter = v; self }
    pub fn cd(mut self, v: f64) -> Self { self.stage.cd = v; self }
    pub fn cg(mut self, v: f64) -> Self { self.stage.cg_x = v; self }
    pub fn cp(mut self, v: f64) -> Self { self.stage.cp_x = v; self }
    pub fn longitudinal_inertia(mut self, v: f64) -> Self { self.stage.longitudinal_inertia = v; self }
    pub fn rotational_inertia(mut self, v: f64) -> Self { self.stage.rotational_inertia = v; self }
    pub fn fins(mut self, count: usize, area: f64) -> Self {
        self.stage.fin_count = count;
        self.stage.fin_area = area;
        self
    }
    pub fn body_tube_area(mut self, v: f64) -> Self { self.stage.body_tube_area = v; self }
    pub fn motor_mount(mut self, mount: MotorMount) -> Self {
        self.stage.motor_mount = Some(mount);
        self
    }
    pub fn recovery_device(mut self, device: RecoveryDevice) -> Self {
        self.stage.recovery_devices.push(device);
        self
    }
    pub fn separation(mut self, trigger: SeparationTrigger, delay: f64) -> Self {
        self.stage.separation = SeparationConfig { trigger, delay };
        self
    }

    pub fn build(self) -> Stage {
        self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::event::EventSource;

    #[test]
    fn altitude_deployment_requires_descending_crossing_after_apogee() {
        let config = DeploymentConfig {
            trigger: DeploymentTrigger::Altitude(300.0),
            delay: 0.0,
        };
        let crossing = FlightEvent::new(FlightEventKind::Altitude, 20.0)
            .with_payload(EventPayload::AltitudeChange { old: 310.0, new: 295.0 });

        assert!(config.activates_on(&crossing, 0, true));
        assert!(!config.activates_on(&crossing, 0, false));

        let ascending = FlightEvent::new(FlightEventKind::Altitude, 5.0)
            .with_payload(EventPayload::AltitudeChange { old: 295.0, new: 310.0 });
        assert!(!config.activates_on(&ascending, 0, true));
    }

    #[test]
    fn separation_on_own_burnout_only() {
        let config = SeparationConfig::default();
        let own = FlightEvent::new(FlightEventKind::Burnout, 2.0)
            .with_source(EventSource::Motor(crate::sim::event::MotorId { stage: 1 }));
        let other = FlightEvent::new(FlightEventKind::Burnout, 2.0)
            .with_source(EventSource::Motor(crate::sim::event::MotorId { stage: 0 }));

        assert!(config.separates_on(&own, 1));
        assert!(!config.separates_on(&other, 1));
    }

    #[test]
    fn upper_stage_ignition_separation() {
        let config = SeparationConfig {
            trigger: SeparationTrigger::UpperStageIgnition,
            delay: 0.0,
        };
        let upper = FlightEvent::new(FlightEventKind::Ignition, 3.0)
            .with_source(EventSource::Motor(crate::sim::event::MotorId { stage: 0 }));
        assert!(config.separates_on(&upper, 1));
        assert!(!config.separates_on(&upper, 0));
    }
}
