//! Sample and sensor key types.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// One point in the local time base.
///
/// `time` is always local milliseconds after offset correction; a remote
/// device timestamp never ends up here unconverted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: i64,
    pub value: f64,
}

impl Sample {
    pub const fn new(time: i64, value: f64) -> Self {
        Self { time, value }
    }

    /// Age of this sample relative to `now`; negative for future-dated points.
    pub fn age_ms(&self, now: i64) -> i64 {
        now.saturating_sub(self.time)
    }
}

/// Stable identifier of one logical sensor channel (e.g. `Sensor1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SensorKey(Arc<str>);

impl SensorKey {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SensorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SensorKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for SensorKey {
    fn from(key: String) -> Self {
        Self(Arc::from(key))
    }
}

impl From<SensorKey> for String {
    fn from(key: SensorKey) -> Self {
        key.0.as_ref().to_owned()
    }
}

impl AsRef<str> for SensorKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_age() {
        let sample = Sample::new(1_000, 2.0);
        assert_eq!(sample.age_ms(1_500), 500);
        assert_eq!(sample.age_ms(900), -100);
    }

    #[test]
    fn test_sensor_key_equality_across_constructors() {
        let a = SensorKey::from("Sensor1");
        let b = SensorKey::from(String::from("Sensor1"));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "Sensor1");
        assert_eq!(format!("{a}"), "Sensor1");
    }

    #[test]
    fn test_sensor_key_serializes_as_string() -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(&SensorKey::from("P3"))?;
        assert_eq!(json, "\"P3\"");
        let back: SensorKey = serde_json::from_str(&json)?;
        assert_eq!(back, SensorKey::from("P3"));
        Ok(())
    }
}
