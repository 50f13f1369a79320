use crate::sim::event::FlightEvent;

use super::types::FlightDataType;

// ---------------------------------------------------------------------------
// Per-stage flight data branch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Channel {
    ty: FlightDataType,
    values: Vec<f64>,
    min: f64,
    max: f64,
}

impl Channel {
    fn new(ty: FlightDataType, length: usize) -> Self {
        Self { ty, values: vec![f64::NAN; length], min: f64::NAN, max: f64::NAN }
    }

    fn track(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        if self.min.is_nan() || value < self.min {
            self.min = value;
        }
        if self.max.is_nan() || value > self.max {
            self.max = value;
        }
    }
}

/// A single branch of flight data: one append-only time series per channel,
/// ordered by time, plus the branch's event log.
///
/// Channels may be added after creation; earlier rows of a late channel are
/// unset (NaN).  Min/max are maintained incrementally and the last value of
/// any channel is O(1).  Once a stage's simulation completes the branch is
/// made immutable with [`FlightDataBranch::immute`].
#[derive(Debug, Clone)]
pub struct FlightDataBranch {
    name: String,
    channels: Vec<Channel>,
    length: usize,
    events: Vec<FlightEvent>,
    optimum_altitude: Option<f64>,
    time_to_optimum_altitude: Option<f64>,
    mutable: bool,
}

impl FlightDataBranch {
    /// New branch seeded with the time channel.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channels: vec![Channel::new(FlightDataType::Time, 0)],
            length: 0,
            events: Vec::new(),
            optimum_altitude: None,
            time_to_optimum_altitude: None,
            mutable: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of data points.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    fn check_mutable(&self) {
        assert!(self.mutable, "flight data branch '{}' is immutable", self.name);
    }

    /// Append a new point; every channel defaults to unset until
    /// [`FlightDataBranch::set_value`] is called.
    pub fn add_point(&mut self) {
        self.check_mutable();
        self.length += 1;
        for channel in &mut self.channels {
            channel.values.push(f64::NAN);
        }
    }

    /// Set a channel's value at the latest point, creating the channel on
    /// first use (prior rows unset).
    pub fn set_value(&mut self, ty: FlightDataType, value: f64) {
        self.check_mutable();
        assert!(self.length > 0, "set_value before the first add_point");

        let idx = match self.channels.iter().position(|c| c.ty == ty) {
            Some(idx) => idx,
            None => {
                self.channels.push(Channel::new(ty, self.length));
                self.channels.len() - 1
            }
        };
        let channel = &mut self.channels[idx];
        if let Some(last) = channel.values.last_mut() {
            *last = value;
        }
        channel.track(value);
    }

    fn channel(&self, ty: FlightDataType) -> Option<&Channel> {
        self.channels.iter().find(|c| c.ty == ty)
    }

    /// The full series for a channel, or `None` if never recorded.
    pub fn get(&self, ty: FlightDataType) -> Option<&[f64]> {
        self.channel(ty).map(|c| c.values.as_slice())
    }

    /// Latest set value of a channel; `None` when the channel is absent,
    /// empty, or its latest sample is unset.
    pub fn last(&self, ty: FlightDataType) -> Option<f64> {
        self.channel(ty)
            .and_then(|c| c.values.last().copied())
            .filter(|v| !v.is_nan())
    }

    /// Incrementally tracked minimum of a channel.
    pub fn min(&self, ty: FlightDataType) -> Option<f64> {
        self.channel(ty).map(|c| c.min).filter(|v| !v.is_nan())
    }

    /// Incrementally tracked maximum of a channel.
    pub fn max(&self, ty: FlightDataType) -> Option<f64> {
        self.channel(ty).map(|c| c.max).filter(|v| !v.is_nan())
    }

    /// The channels recorded in this branch, in creation order.
    pub fn types(&self) -> impl Iterator<Item = FlightDataType> + '_ {
        self.channels.iter().map(|c| c.ty)
    }

    pub fn add_event(&mut self, event: FlightEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[FlightEvent] {
        &self.events
    }

    pub fn set_optimum_altitude(&mut self, altitude: f64, time: f64) {
        self.optimum_altitude = Some(altitude);
        self.time_to_optimum_altitude = Some(time);
    }

    /// Altitude the branch would have reached with no recovery deployment.
    pub fn optimum_altitude(&self) -> Option<f64> {
        self.optimum_altitude
    }

    pub fn time_to_optimum_altitude(&self) -> Option<f64> {
        self.time_to_optimum_altitude
    }

    /// Freeze the branch; any further mutation is a programming error.
    pub fn immute(&mut self) {
        self.mutable = false;
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    /// Value of `ty` at the first sample whose time is >= `time`.
    pub fn value_at_time(&self, ty: FlightDataType, time: f64) -> Option<f64> {
        let times = self.get(FlightDataType::Time)?;
        let idx = times.partition_point(|&t| t < time);
        self.get(ty)?.get(idx.min(times.len().saturating_sub(1)))
            .copied()
            .filter(|v| !v.is_nan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_max_last_bookkeeping() {
        let mut b = FlightDataBranch::new("main");
        for (t, alt) in [(0.0, 0.0), (1.0, 50.0), (2.0, 120.0), (3.0, 80.0)] {
            b.add_point();
            b.set_value(FlightDataType::Time, t);
            b.set_value(FlightDataType::Altitude, alt);
        }

        assert_eq!(b.len(), 4);
        assert_eq!(b.last(FlightDataType::Altitude), Some(80.0));
        assert_eq!(b.min(FlightDataType::Altitude), Some(0.0));
        assert_eq!(b.max(FlightDataType::Altitude), Some(120.0));
    }

    #[test]
    fn late_channel_backfills_with_unset() {
        let mut b = FlightDataBranch::new("main");
        b.add_point();
        b.set_value(FlightDataType::Time, 0.0);
        b.add_point();
        b.set_value(FlightDataType::Time, 1.0);
        b.set_value(FlightDataType::MachNumber, 0.3);

        let mach = b.get(FlightDataType::MachNumber).unwrap();
        assert_eq!(mach.len(), 2);
        assert!(mach[0].is_nan());
        assert_eq!(mach[1], 0.3);
    }

    #[test]
    fn missing_channel_yields_no_data() {
        let b = FlightDataBranch::new("main");
        assert!(b.last(FlightDataType::CpLocation).is_none());
        assert!(b.get(FlightDataType::CpLocation).is_none());
    }

    #[test]
    #[should_panic(expected = "immutable")]
    fn mutation_after_immute_panics() {
        let mut b = FlightDataBranch::new("main");
        b.add_point();
        b.immute();
        b.add_point();
    }

    #[test]
    fn value_at_time_picks_first_sample_at_or_after() {
        let mut b = FlightDataBranch::new("main");
        for (t, v) in [(0.0, 0.0), (1.0, 10.0), (2.0, 20.0)] {
            b.add_point();
            b.set_value(FlightDataType::Time, t);
            b.set_value(FlightDataType::VelocityTotal, v);
        }
        assert_eq!(b.value_at_time(FlightDataType::VelocityTotal, 0.5), Some(10.0));
        assert_eq!(b.value_at_time(FlightDataType::VelocityTotal, 2.0), Some(20.0));
        assert_eq!(b.value_at_time(FlightDataType::VelocityTotal, 5.0), Some(20.0));
    }
}
