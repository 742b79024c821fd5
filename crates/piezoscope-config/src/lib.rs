//! Configuration for piezoscope.
//!
//! A single YAML document describes the retention window, clock offset
//! averaging, the topic routing table, the dashboard layout and where
//! messages come from. A default document ships embedded in the crate.

pub mod error;
pub mod model;

pub use error::ConfigError;
pub use model::{
    DEFAULT_BRIDGE_PORT, DEFAULT_CONFIG_YAML, DEFAULT_RENDER_INTERVAL_MS, PiezoscopeConfig,
    RouteConfig, SourceConfig,
};
