//! Dial gauge model for a scalar channel.

use serde::Serialize;

use crate::format::format_fixed2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeView {
    pub label: String,
    /// Displayed value; non-finite inputs are shown as zero.
    pub value: f64,
    pub min: f64,
    pub max: f64,
    /// Fill level in `[0, 100]`.
    pub percent: f64,
    /// Value with two decimals.
    pub text: String,
}

impl GaugeView {
    pub fn new(value: f64, label: impl Into<String>, min: f64, max: f64) -> Self {
        let value = if value.is_finite() { value } else { 0.0 };
        Self {
            label: label.into(),
            value,
            min,
            max,
            percent: percent(value, min, max),
            text: format_fixed2(value),
        }
    }
}

/// `(value - min) / (max - min) * 100`, clamped; a degenerate range is 0.
pub fn percent(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if !span.is_finite() || span <= 0.0 {
        return 0.0;
    }
    let pct = (value - min) / span * 100.0;
    if pct.is_finite() { pct.clamp(0.0, 100.0) } else { 0.0 }
}
