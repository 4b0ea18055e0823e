use voxlink_core::{GeoPoint, MotionStatus};

/// Point-in-time reading from the device's ambient sensors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    /// Coarse motion classification.
    pub motion: MotionStatus,
    /// Last known location, if the provider has one.
    pub location: Option<GeoPoint>,
    /// Ambient light level in lux, if a light sensor exists.
    pub illuminance: Option<f64>,
}

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self {
            motion: MotionStatus::Stationary,
            location: None,
            illuminance: None,
        }
    }
}

/// Provider the engine polls at session start instead of listening to
/// any platform sensor API directly.
pub trait SensorProvider: Send + Sync {
    /// The current reading. Must not block.
    fn snapshot(&self) -> SensorSnapshot;
}

/// Provider returning a fixed reading. The default for hosts with no
/// sensors, and the workhorse in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSensorProvider {
    snapshot: SensorSnapshot,
}

impl StaticSensorProvider {
    /// Wraps a fixed reading.
    pub fn new(snapshot: SensorSnapshot) -> Self {
        Self { snapshot }
    }
}

impl SensorProvider for StaticSensorProvider {
    fn snapshot(&self) -> SensorSnapshot {
        self.snapshot
    }
}
