//! Static topic routing.
//!
//! A topic either carries a batch of windowed sensor samples (e.g. four piezo
//! channels from one board) or a pair of scalar readings. Topics missing from
//! the table are not of interest and are ignored by the dispatcher.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::RouterError;
use crate::sample::SensorKey;

/// Binds one payload field of a windowed topic to a sensor key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorBinding {
    /// Field name inside the payload object (e.g. `Sensor1`).
    pub field: String,
    pub key: SensorKey,
}

impl SensorBinding {
    pub fn new(field: impl Into<String>, key: impl Into<SensorKey>) -> Self {
        Self {
            field: field.into(),
            key: key.into(),
        }
    }
}

/// Scalar channel names a temperature/humidity topic writes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarBinding {
    pub temperature: String,
    pub humidity: String,
}

impl ScalarBinding {
    pub fn new(temperature: impl Into<String>, humidity: impl Into<String>) -> Self {
        Self {
            temperature: temperature.into(),
            humidity: humidity.into(),
        }
    }
}

impl Default for ScalarBinding {
    fn default() -> Self {
        Self::new("temperature", "humidity")
    }
}

/// What a routed topic carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Sensor batches; bindings are kept in declaration order.
    Windowed(Vec<SensorBinding>),
    Scalar(ScalarBinding),
}

impl Route {
    pub fn windowed(bindings: impl IntoIterator<Item = SensorBinding>) -> Self {
        Route::Windowed(bindings.into_iter().collect())
    }

    pub fn scalar(binding: ScalarBinding) -> Self {
        Route::Scalar(binding)
    }

    /// Ordered sensor keys this route feeds; empty for scalar routes.
    pub fn sensor_keys(&self) -> impl Iterator<Item = &SensorKey> {
        let bindings: &[SensorBinding] = match self {
            Route::Windowed(bindings) => bindings,
            Route::Scalar(_) => &[],
        };
        bindings.iter().map(|binding| &binding.key)
    }
}

/// Immutable topic → route table.
#[derive(Debug, Clone, Default)]
pub struct TopicRouter {
    routes: HashMap<String, Route>,
    order: Vec<String>,
}

impl TopicRouter {
    /// Build a router, rejecting duplicate topics and degenerate routes.
    ///
    /// # Errors
    ///
    /// Returns a [`RouterError`] if a topic is empty or appears twice, a
    /// windowed route has no bindings, or a sensor key is bound twice on
    /// the same topic.
    pub fn new<I, T>(routes: I) -> Result<Self, RouterError>
    where
        I: IntoIterator<Item = (T, Route)>,
        T: Into<String>,
    {
        let mut router = Self::default();

        for (topic, route) in routes {
            let topic = topic.into();
            if topic.is_empty() {
                return Err(RouterError::EmptyTopic);
            }
            if router.routes.contains_key(&topic) {
                return Err(RouterError::DuplicateTopic(topic));
            }
            if let Route::Windowed(bindings) = &route {
                if bindings.is_empty() {
                    return Err(RouterError::NoSensors { topic });
                }
                let mut seen = HashSet::new();
                for binding in bindings {
                    if !seen.insert(&binding.key) {
                        return Err(RouterError::DuplicateSensorKey {
                            topic,
                            key: binding.key.to_string(),
                        });
                    }
                }
            }

            router.order.push(topic.clone());
            router.routes.insert(topic, route);
        }

        Ok(router)
    }

    /// Look up a topic; `None` means "not of interest".
    pub fn route(&self, topic: &str) -> Option<&Route> {
        self.routes.get(topic)
    }

    /// Topics to subscribe to, in declaration order.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Every windowed sensor key across all topics, in declaration order.
    pub fn sensor_keys(&self) -> Vec<SensorKey> {
        self.order
            .iter()
            .filter_map(|topic| self.routes.get(topic))
            .flat_map(Route::sensor_keys)
            .cloned()
            .collect()
    }
}
