//! Configuration model and loading.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::Path;

use piezoscope_core::{
    OffsetRegistry, OffsetScope, Route, RouterError, ScalarBinding, ScalarChannelStore,
    SensorBinding, SensorWindowStore, TopicRouter, DEFAULT_OFFSET_SAMPLES, DEFAULT_WINDOW_MS,
    MAX_OFFSET_SAMPLES,
};
use piezoscope_view::DashboardLayout;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

/// Shipped configuration, used when no file is given.
pub const DEFAULT_CONFIG_YAML: &str = include_str!("default_config.yaml");

/// Default render tick in milliseconds.
pub const DEFAULT_RENDER_INTERVAL_MS: u64 = 10;

/// Default UDP bridge port.
pub const DEFAULT_BRIDGE_PORT: u16 = 5556;

/// Top-level piezoscope configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PiezoscopeConfig {
    /// Retention window W in milliseconds.
    #[serde(default = "default_window_ms")]
    pub window_ms: i64,
    /// Offset samples N averaged by each estimator.
    #[serde(default = "default_offset_samples")]
    pub offset_samples: usize,
    #[serde(default = "default_render_interval_ms")]
    pub render_interval_ms: u64,
    #[serde(default)]
    pub offset_scope: OffsetScope,
    pub routes: Vec<RouteConfig>,
    #[serde(default)]
    pub dashboard: DashboardLayout,
    #[serde(default)]
    pub source: SourceConfig,
}

/// One routed topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteConfig {
    Windowed {
        topic: String,
        sensors: Vec<SensorBinding>,
    },
    Scalar {
        topic: String,
        #[serde(default = "default_temperature_channel")]
        temperature: String,
        #[serde(default = "default_humidity_channel")]
        humidity: String,
    },
}

impl RouteConfig {
    pub fn topic(&self) -> &str {
        match self {
            RouteConfig::Windowed { topic, .. } | RouteConfig::Scalar { topic, .. } => topic,
        }
    }

    fn to_route(&self) -> Route {
        match self {
            RouteConfig::Windowed { sensors, .. } => Route::windowed(sensors.iter().cloned()),
            RouteConfig::Scalar {
                temperature,
                humidity,
                ..
            } => Route::scalar(ScalarBinding::new(temperature.as_str(), humidity.as_str())),
        }
    }
}

/// Where inbound messages come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// UDP bridge bind address.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_window_ms() -> i64 {
    DEFAULT_WINDOW_MS
}

fn default_offset_samples() -> usize {
    DEFAULT_OFFSET_SAMPLES
}

fn default_render_interval_ms() -> u64 {
    DEFAULT_RENDER_INTERVAL_MS
}

fn default_temperature_channel() -> String {
    ScalarBinding::default().temperature
}

fn default_humidity_channel() -> String {
    ScalarBinding::default().humidity
}

fn default_bind() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DEFAULT_BRIDGE_PORT))
}

impl PiezoscopeConfig {
    /// Parse and validate a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] for malformed YAML or unknown fields and
    /// any validation error from [`PiezoscopeConfig::validate`].
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the shipped default configuration.
    ///
    /// # Errors
    ///
    /// Only fails if the embedded document itself is broken.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::from_yaml_str(DEFAULT_CONFIG_YAML)
    }

    /// Read, parse and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`PiezoscopeConfig::from_yaml_str`].
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Load `path` if given, the shipped default otherwise.
    ///
    /// # Errors
    ///
    /// See [`PiezoscopeConfig::load_from_path`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load_default(),
        }
    }

    /// Serialize back to YAML.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check every invariant the pipeline relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_ms <= 0 {
            return Err(ConfigError::invalid("window_ms must be positive"));
        }
        if self.offset_samples == 0 {
            return Err(ConfigError::invalid("offset_samples must be positive"));
        }
        if self.offset_samples > MAX_OFFSET_SAMPLES {
            return Err(ConfigError::invalid(format!(
                "offset_samples must be at most {MAX_OFFSET_SAMPLES}, got {}",
                self.offset_samples
            )));
        }
        if self.render_interval_ms == 0 {
            return Err(ConfigError::invalid("render_interval_ms must be positive"));
        }
        if self.routes.is_empty() {
            return Err(ConfigError::invalid("at least one route is required"));
        }

        let router = self.router()?;
        let keys: HashSet<_> = router.sensor_keys().into_iter().collect();
        for chart in &self.dashboard.charts {
            if !keys.contains(&chart.key) {
                return Err(ConfigError::invalid(format!(
                    "chart '{}' shows sensor {} which no route feeds",
                    chart.title, chart.key
                )));
            }
        }

        let channels: HashSet<&str> = self
            .routes
            .iter()
            .filter_map(|route| match route {
                RouteConfig::Scalar {
                    temperature,
                    humidity,
                    ..
                } => Some([temperature.as_str(), humidity.as_str()]),
                RouteConfig::Windowed { .. } => None,
            })
            .flatten()
            .collect();
        for gauge in &self.dashboard.gauges {
            if gauge.min.partial_cmp(&gauge.max) != Some(Ordering::Less) {
                return Err(ConfigError::invalid(format!(
                    "gauge '{}' needs min < max, got {}..{}",
                    gauge.label, gauge.min, gauge.max
                )));
            }
            if !channels.contains(gauge.channel.as_str()) {
                warn!(
                    channel = %gauge.channel,
                    label = %gauge.label,
                    "Gauge channel is not written by any route and will stay at zero"
                );
            }
        }

        Ok(())
    }

    /// Build the topic router.
    ///
    /// # Errors
    ///
    /// Returns a [`RouterError`] for duplicate topics or degenerate routes.
    pub fn router(&self) -> Result<TopicRouter, RouterError> {
        TopicRouter::new(
            self.routes
                .iter()
                .map(|route| (route.topic().to_string(), route.to_route())),
        )
    }

    pub fn offset_registry(&self) -> OffsetRegistry {
        OffsetRegistry::new(self.offset_scope, self.offset_samples)
    }

    pub fn window_store(&self) -> SensorWindowStore {
        SensorWindowStore::new(self.window_ms)
    }

    pub fn scalar_store(&self) -> ScalarChannelStore {
        ScalarChannelStore::new()
    }

    pub fn layout(&self) -> &DashboardLayout {
        &self.dashboard
    }
}
