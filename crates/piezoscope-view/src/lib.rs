//! Presentation models for the piezoscope dashboard.
//!
//! Nothing here draws pixels. A [`DashboardLayout`] reads the sensor windows
//! and scalar channels and produces a serializable [`DashboardFrame`]; a
//! [`Presenter`] decides where that frame goes.

pub mod chart;
pub mod format;
pub mod gauge;
pub mod layout;

pub use chart::{ChartPoint, ChartView};
pub use format::format_time_label;
pub use gauge::GaugeView;
pub use layout::{ChartSpec, DashboardFrame, DashboardLayout, GaugeSpec, Presenter};
