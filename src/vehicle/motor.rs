// ---------------------------------------------------------------------------
// Motor definition
// ---------------------------------------------------------------------------

/// A solid rocket motor described by its thrust curve.
///
/// The curve is a list of (time, thrust) samples from ignition; thrust is
/// interpolated linearly between samples and zero outside the curve.
#[derive(Debug, Clone)]
pub struct Motor {
    pub designation: String,
    pub thrust_curve: Vec<(f64, f64)>, // (s, N), ascending times
    pub propellant_mass: f64,          // kg
    /// Delay from burnout to the ejection charge; `None` for a plugged motor
    /// with no charge at all.
    pub ejection_delay: Option<f64>,
}

impl Motor {
    /// Constant-thrust motor burning for `burn_time` seconds.
    pub fn constant(
        designation: impl Into<String>,
        thrust: f64,
        burn_time: f64,
        propellant_mass: f64,
    ) -> Self {
        Self {
            designation: designation.into(),
            thrust_curve: vec![(0.0, thrust), (burn_time, thrust)],
            propellant_mass,
            ejection_delay: None,
        }
    }

    pub fn with_ejection_delay(mut self, delay: f64) -> Self {
        self.ejection_delay = Some(delay);
        self
    }

    pub fn is_plugged(&self) -> bool {
        self.ejection_delay.is_none()
    }

    /// Thrust at `motor_time` seconds after ignition.
    pub fn thrust_at(&self, motor_time: f64) -> f64 {
        let curve = &self.thrust_curve;
        if curve.is_empty() || motor_time < 0.0 {
            return 0.0;
        }
        let last = curve.len() - 1;
        if motor_time > curve[last].0 {
            return 0.0;
        }
        if motor_time <= curve[0].0 {
            return curve[0].1;
        }
        for window in curve.windows(2) {
            let (t0, f0) = window[0];
            let (t1, f1) = window[1];
            if motor_time <= t1 {
                if t1 - t0 < 1e-12 {
                    return f1;
                }
                let frac = (motor_time - t0) / (t1 - t0);
                return f0 + frac * (f1 - f0);
            }
        }
        0.0
    }

    /// End of the thrust curve: the burn-time estimate.
    pub fn burn_time_estimate(&self) -> f64 {
        self.thrust_curve.last().map_or(0.0, |&(t, _)| t)
    }

    /// Total impulse of the curve (trapezoidal).
    pub fn total_impulse(&self) -> f64 {
        self.thrust_curve
            .windows(2)
            .map(|w| 0.5 * (w[0].1 + w[1].1) * (w[1].0 - w[0].0))
            .sum()
    }

    /// Average thrust over the burn.
    pub fn average_thrust(&self) -> f64 {
        let t = self.burn_time_estimate();
        if t > 0.0 {
            self.total_impulse() / t
        } else {
            0.0
        }
    }
}

// ---------------------------------------------------------------------------
// Ignition configuration
// ---------------------------------------------------------------------------

/// What causes a mounted motor to ignite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IgnitionTrigger {
    /// Ignite at launch.
    #[default]
    Launch,
    /// Launch for the bottom-most stage, burnout of the stage below
    /// otherwise.
    Automatic,
    /// Burnout of the stage directly below this one.
    LowerStageBurnout,
    /// Ejection charge of the stage directly below this one.
    LowerStageEjectionCharge,
    /// Never ignite.
    Never,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IgnitionConfig {
    pub trigger: IgnitionTrigger,
    pub delay: f64,
}

/// A motor mount: the motor, how many of them fly in the cluster, and when
/// they ignite.
#[derive(Debug, Clone)]
pub struct MotorMount {
    pub motor: Motor,
    pub cluster_count: usize,
    pub ignition: IgnitionConfig,
}

impl MotorMount {
    pub fn new(motor: Motor) -> Self {
        Self { motor, cluster_count: 1, ignition: IgnitionConfig::default() }
    }

    pub fn cluster(mut self, count: usize) -> Self {
        self.cluster_count = count.max(1);
        self
    }

    pub fn ignition(mut self, trigger: IgnitionTrigger, delay: f64) -> Self {
        self.ignition = IgnitionConfig { trigger, delay };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_motor_thrust_profile() {
        let m = Motor::constant("C6", 6.0, 1.8, 0.011);
        assert_eq!(m.thrust_at(-0.1), 0.0);
        assert_eq!(m.thrust_at(0.0), 6.0);
        assert_eq!(m.thrust_at(1.0), 6.0);
        assert_eq!(m.thrust_at(1.81), 0.0);
        assert!((m.burn_time_estimate() - 1.8).abs() < 1e-12);
    }

    #[test]
    fn tabulated_curve_interpolates() {
        let m = Motor {
            designation: "tab".into(),
            thrust_curve: vec![(0.0, 0.0), (0.1, 20.0), (1.9, 20.0), (2.0, 0.0)],
            propellant_mass: 0.05,
            ejection_delay: Some(3.0),
        };
        assert!((m.thrust_at(0.05) - 10.0).abs() < 1e-9);
        assert!((m.thrust_at(1.0) - 20.0).abs() < 1e-9);
        assert!((m.thrust_at(1.95) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn impulse_and_average() {
        let m = Motor::constant("test", 20.0, 2.0, 0.1);
        assert!((m.total_impulse() - 40.0).abs() < 1e-9);
        assert!((m.average_thrust() - 20.0).abs() < 1e-9);
    }
}
