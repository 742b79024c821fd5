//! Line chart model for one sensor window.

use piezoscope_core::Sample;
use serde::Serialize;

use crate::format::{format_fixed2, format_time_label, round2};

/// Y-domain used when the window holds no samples.
pub const EMPTY_Y_DOMAIN: (f64, f64) = (0.0, 10.0);

/// Spacing between y-axis ticks.
pub const Y_TICK_STEP: f64 = 0.5;

/// Upper bound on generated y-axis ticks; wider ranges get a coarser step.
pub const MAX_Y_TICKS: usize = 200;

/// One plotted point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub time: i64,
    pub value: f64,
    /// `HH:MM:SS` label of `time`.
    pub label: String,
}

/// Everything needed to draw one sensor chart at a given instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartView {
    pub title: String,
    /// Points inside `[now - W, now]`, sorted by time.
    pub points: Vec<ChartPoint>,
    pub x_domain: (i64, i64),
    pub x_labels: (String, String),
    pub y_domain: (f64, f64),
    pub y_ticks: Vec<f64>,
    pub y_tick_labels: Vec<String>,
}

impl ChartView {
    /// Build a chart over `[now - window_ms, now]`.
    ///
    /// `samples` may be unsorted and may contain points outside the window;
    /// those are filtered here so a raw buffer can be passed directly.
    pub fn build(title: impl Into<String>, samples: &[Sample], now: i64, window_ms: i64) -> Self {
        let min_time = now.saturating_sub(window_ms.max(0));

        let mut visible: Vec<Sample> = samples
            .iter()
            .filter(|s| s.time >= min_time && s.time <= now)
            .copied()
            .collect();
        visible.sort_by_key(|s| s.time);

        let y_domain = y_domain(visible.iter().map(|s| s.value));
        let y_ticks = y_ticks(y_domain);
        let y_tick_labels = y_ticks.iter().map(|t| format_fixed2(*t)).collect();

        let points = visible
            .into_iter()
            .map(|s| ChartPoint {
                time: s.time,
                value: s.value,
                label: format_time_label(s.time),
            })
            .collect();

        Self {
            title: title.into(),
            points,
            x_domain: (min_time, now),
            x_labels: (format_time_label(min_time), format_time_label(now)),
            y_domain,
            y_ticks,
            y_tick_labels,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent plotted point.
    pub fn last(&self) -> Option<&ChartPoint> {
        self.points.last()
    }
}

/// Snap min/max outward to the nearest half unit.
pub fn y_domain(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let mut values = values.into_iter().filter(|v| v.is_finite());
    let Some(first) = values.next() else {
        return EMPTY_Y_DOMAIN;
    };
    let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));

    let lo = (min * 2.0).floor() / 2.0;
    let hi = (max * 2.0).ceil() / 2.0;
    if (hi - lo).abs() < f64::EPSILON {
        (lo - 0.5, hi + 0.5)
    } else {
        (lo, hi)
    }
}

/// Ticks from `lo` to `hi` inclusive, rounded to two decimals.
pub fn y_ticks((lo, hi): (f64, f64)) -> Vec<f64> {
    let span = hi - lo;
    if !span.is_finite() || span < 0.0 {
        return Vec::new();
    }
    let step = Y_TICK_STEP.max(span / (MAX_Y_TICKS - 1) as f64);

    let mut ticks = Vec::new();
    let mut i = 0u32;
    loop {
        let tick = lo + f64::from(i) * step;
        if tick > hi + 1e-9 || ticks.len() >= MAX_Y_TICKS {
            break;
        }
        ticks.push(round2(tick));
        i += 1;
    }
    ticks
}
