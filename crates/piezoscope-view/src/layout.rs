//! Dashboard layout and the frames rendered from it.

use piezoscope_core::{ScalarChannelStore, SensorKey, SensorWindowStore};
use serde::{Deserialize, Serialize};

use crate::chart::ChartView;
use crate::format::format_time_label;
use crate::gauge::GaugeView;

/// One chart bound to a sensor window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub key: SensorKey,
    pub title: String,
}

impl ChartSpec {
    pub fn new(key: impl Into<SensorKey>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
        }
    }
}

/// One gauge bound to a scalar channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeSpec {
    pub channel: String,
    pub label: String,
    #[serde(default)]
    pub min: f64,
    #[serde(default = "default_gauge_max")]
    pub max: f64,
}

fn default_gauge_max() -> f64 {
    100.0
}

impl GaugeSpec {
    pub fn new(channel: impl Into<String>, label: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            channel: channel.into(),
            label: label.into(),
            min,
            max,
        }
    }

    /// Ambient temperature dial, -20..60 °C.
    pub fn temperature(channel: impl Into<String>) -> Self {
        Self::new(channel, "Temperature (°C)", -20.0, 60.0)
    }

    /// Relative humidity dial, 0..100 %.
    pub fn humidity(channel: impl Into<String>) -> Self {
        Self::new(channel, "Humidity (%)", 0.0, 100.0)
    }
}

/// Which charts and gauges a dashboard shows, in display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardLayout {
    #[serde(default)]
    pub charts: Vec<ChartSpec>,
    #[serde(default)]
    pub gauges: Vec<GaugeSpec>,
}

impl DashboardLayout {
    /// Render the current state of the stores at local time `now`.
    ///
    /// Only reads: windows are snapshotted, never pruned, and channels
    /// that were never written show as zero.
    pub fn frame(
        &self,
        windows: &SensorWindowStore,
        scalars: &ScalarChannelStore,
        now: i64,
    ) -> DashboardFrame {
        let window_ms = windows.retention_ms();
        let charts = self
            .charts
            .iter()
            .map(|spec| {
                let samples = windows.snapshot(&spec.key, now);
                ChartView::build(spec.title.clone(), &samples, now, window_ms)
            })
            .collect();
        let gauges = self
            .gauges
            .iter()
            .map(|spec| {
                GaugeView::new(
                    scalars.value_or_zero(&spec.channel),
                    spec.label.clone(),
                    spec.min,
                    spec.max,
                )
            })
            .collect();

        DashboardFrame {
            now,
            time_label: format_time_label(now),
            charts,
            gauges,
        }
    }
}

/// Everything drawn on one render tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardFrame {
    pub now: i64,
    pub time_label: String,
    pub charts: Vec<ChartView>,
    pub gauges: Vec<GaugeView>,
}

/// Sink for rendered frames (terminal, log, socket, ...).
pub trait Presenter: Send {
    /// Present one frame.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the frame cannot be written out.
    fn present(&mut self, frame: &DashboardFrame) -> std::io::Result<()>;
}

impl<P: Presenter + ?Sized> Presenter for Box<P> {
    fn present(&mut self, frame: &DashboardFrame) -> std::io::Result<()> {
        (**self).present(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use piezoscope_core::Sample;

    fn layout() -> DashboardLayout {
        DashboardLayout {
            charts: vec![ChartSpec::new("Sensor1", "Sensor 1"), ChartSpec::new("Sensor2", "Sensor 2")],
            gauges: vec![GaugeSpec::temperature("temperature"), GaugeSpec::humidity("humidity")],
        }
    }

    #[test]
    fn test_frame_reads_windows_and_channels() {
        let windows = SensorWindowStore::new(20_000);
        let scalars = ScalarChannelStore::new();
        windows.append(&SensorKey::from("Sensor1"), [Sample::new(10_000, 1.5)], 10_000);
        scalars.set("humidity", 55.0);

        let frame = layout().frame(&windows, &scalars, 10_000);

        assert_eq!(frame.charts.len(), 2);
        assert_eq!(frame.charts.first().map(|c| c.points.len()), Some(1));
        assert_eq!(frame.charts.get(1).map(ChartView::is_empty), Some(true));
        assert_eq!(frame.gauges.first().map(|g| g.text.as_str()), Some("0.00"));
        assert_eq!(frame.gauges.get(1).map(|g| g.text.as_str()), Some("55.00"));
        assert_eq!(frame.time_label, "00:00:10");
    }

    #[test]
    fn test_frame_does_not_prune() {
        let windows = SensorWindowStore::new(20_000);
        let key = SensorKey::from("Sensor1");
        windows.append(&key, [Sample::new(0, 1.0)], 0);

        let frame = layout().frame(&windows, &ScalarChannelStore::new(), 50_000);

        assert_eq!(frame.charts.first().map(ChartView::is_empty), Some(true));
        assert_eq!(windows.stored_len(&key), 1);
    }
}
