// ---------------------------------------------------------------------------
// Flight data channels
// ---------------------------------------------------------------------------

/// A typed quantity recorded per simulation step.
///
/// Built-in channels cover everything the steppers record; additional
/// channels are registered through a [`DataTypeCatalog`] and referenced as
/// `Custom` values, so no global mutable registry exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FlightDataType {
    Time,
    TimeStep,
    Altitude,
    PositionEast,
    PositionNorth,
    LateralDistance,
    Latitude,
    Longitude,
    VelocityZ,
    VelocityXY,
    VelocityTotal,
    AccelerationZ,
    AccelerationXY,
    AccelerationTotal,
    Mass,
    PropellantMass,
    LongitudinalInertia,
    RotationalInertia,
    CgLocation,
    CpLocation,
    Stability,
    ThrustForce,
    DragForce,
    DragCoeff,
    AxialDragCoeff,
    Gravity,
    WindVelocity,
    AngleOfAttack,
    MachNumber,
    ReynoldsNumber,
    RollRate,
    PitchRate,
    YawRate,
    CoriolisAcceleration,
    AirTemperature,
    AirPressure,
    SpeedOfSound,
    ReferenceLength,
    ReferenceArea,
    Custom(u16),
}

impl FlightDataType {
    /// Name of a built-in channel; custom channels resolve through the
    /// catalog.
    pub fn built_in_name(&self) -> &'static str {
        match self {
            FlightDataType::Time => "time",
            FlightDataType::TimeStep => "time_step",
            FlightDataType::Altitude => "altitude",
            FlightDataType::PositionEast => "position_east",
            FlightDataType::PositionNorth => "position_north",
            FlightDataType::LateralDistance => "lateral_distance",
            FlightDataType::Latitude => "latitude",
            FlightDataType::Longitude => "longitude",
            FlightDataType::VelocityZ => "velocity_z",
            FlightDataType::VelocityXY => "velocity_xy",
            FlightDataType::VelocityTotal => "velocity_total",
            FlightDataType::AccelerationZ => "acceleration_z",
            FlightDataType::AccelerationXY => "acceleration_xy",
            FlightDataType::AccelerationTotal => "acceleration_total",
            FlightDataType::Mass => "mass",
            FlightDataType::PropellantMass => "propellant_mass",
            FlightDataType::LongitudinalInertia => "longitudinal_inertia",
            FlightDataType::RotationalInertia => "rotational_inertia",
            FlightDataType::CgLocation => "cg_location",
            FlightDataType::CpLocation => "cp_location",
            FlightDataType::Stability => "stability",
            FlightDataType::ThrustForce => "thrust",
            FlightDataType::DragForce => "drag",
            FlightDataType::DragCoeff => "drag_coeff",
            FlightDataType::AxialDragCoeff => "axial_drag_coeff",
            FlightDataType::Gravity => "gravity",
            FlightDataType::WindVelocity => "wind_velocity",
            FlightDataType::AngleOfAttack => "angle_of_attack",
            FlightDataType::MachNumber => "mach",
            FlightDataType::ReynoldsNumber => "reynolds",
            FlightDataType::RollRate => "roll_rate",
            FlightDataType::PitchRate => "pitch_rate",
            FlightDataType::YawRate => "yaw_rate",
            FlightDataType::CoriolisAcceleration => "coriolis_acceleration",
            FlightDataType::AirTemperature => "air_temperature",
            FlightDataType::AirPressure => "air_pressure",
            FlightDataType::SpeedOfSound => "speed_of_sound",
            FlightDataType::ReferenceLength => "reference_length",
            FlightDataType::ReferenceArea => "reference_area",
            FlightDataType::Custom(_) => "custom",
        }
    }
}

// ---------------------------------------------------------------------------
// Custom channel catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CustomDataType {
    pub name: String,
    pub unit: String,
}

/// Catalog of custom data channels.  Constructed once and passed by
/// reference wherever channel names must be resolved.
#[derive(Debug, Clone, Default)]
pub struct DataTypeCatalog {
    custom: Vec<CustomDataType>,
}

impl DataTypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom channel and return the type value that addresses
    /// it.  Registering the same name twice returns the existing value.
    pub fn register(&mut self, name: impl Into<String>, unit: impl Into<String>) -> FlightDataType {
        let name = name.into();
        if let Some(idx) = self.custom.iter().position(|c| c.name == name) {
            return FlightDataType::Custom(idx as u16);
        }
        self.custom.push(CustomDataType { name, unit: unit.into() });
        FlightDataType::Custom((self.custom.len() - 1) as u16)
    }

    /// Resolve a channel to its display name.
    pub fn name_of(&self, ty: FlightDataType) -> &str {
        match ty {
            FlightDataType::Custom(idx) => self
                .custom
                .get(idx as usize)
                .map(|c| c.name.as_str())
                .unwrap_or("custom"),
            other => other.built_in_name(),
        }
    }

    pub fn custom_types(&self) -> &[CustomDataType] {
        &self.custom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_resolve_custom_channel() {
        let mut catalog = DataTypeCatalog::new();
        let ty = catalog.register("airbrake_angle", "rad");
        assert_eq!(catalog.name_of(ty), "airbrake_angle");
        assert_eq!(catalog.name_of(FlightDataType::Altitude), "altitude");
    }

    #[test]
    fn duplicate_registration_returns_same_type() {
        let mut catalog = DataTypeCatalog::new();
        let a = catalog.register("foo", "m");
        let b = catalog.register("foo", "m");
        assert_eq!(a, b);
        assert_eq!(catalog.custom_types().len(), 1);
    }
}
