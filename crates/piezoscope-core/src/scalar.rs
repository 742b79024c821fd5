//! Last-write-wins scalar channels (temperature, humidity).

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

/// Latest value per named scalar channel, no history.
#[derive(Debug, Default)]
pub struct ScalarChannelStore {
    values: RwLock<HashMap<String, f64>>,
}

impl ScalarChannelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, channel: &str, value: f64) {
        self.values.write().insert(channel.to_string(), value);
    }

    /// Write several channels under one lock.
    pub fn set_many<'a>(&self, updates: impl IntoIterator<Item = (&'a str, f64)>) {
        let mut values = self.values.write();
        for (channel, value) in updates {
            values.insert(channel.to_string(), value);
        }
    }

    pub fn get(&self, channel: &str) -> Option<f64> {
        self.values.read().get(channel).copied()
    }

    /// Value of `channel`, zero until its first write.
    pub fn value_or_zero(&self, channel: &str) -> f64 {
        self.get(channel).unwrap_or(0.0)
    }

    /// Sorted copy of every channel.
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        self.values
            .read()
            .iter()
            .map(|(channel, value)| (channel.clone(), *value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let store = ScalarChannelStore::new();
        store.set("temp1", 21.0);
        store.set("temp1", 22.5);
        assert_eq!(store.get("temp1"), Some(22.5));
    }

    #[test]
    fn test_missing_channel() {
        let store = ScalarChannelStore::new();
        assert_eq!(store.get("hum2"), None);
        assert!(store.value_or_zero("hum2").abs() < f64::EPSILON);
    }

    #[test]
    fn test_set_many_and_snapshot() {
        let store = ScalarChannelStore::new();
        store.set_many([("temperature", 20.0), ("humidity", 55.0)]);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.keys().collect::<Vec<_>>(), vec!["humidity", "temperature"]);
        assert_eq!(snapshot.get("humidity"), Some(&55.0));
    }
}
