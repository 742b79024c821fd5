//! Render loop and frame presenters.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use piezoscope_core::{LocalClock, ScalarChannelStore, SensorWindowStore};
use piezoscope_view::{DashboardFrame, DashboardLayout, Presenter};
use tokio::sync::broadcast;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

/// Logs a one-line summary of each frame at debug level.
#[derive(Debug, Default)]
pub struct TracingPresenter;

impl Presenter for TracingPresenter {
    fn present(&mut self, frame: &DashboardFrame) -> std::io::Result<()> {
        let charts: Vec<String> = frame
            .charts
            .iter()
            .map(|chart| match chart.last() {
                Some(point) => format!("{}={:.2} ({} pts)", chart.title, point.value, chart.points.len()),
                None => format!("{}=-", chart.title),
            })
            .collect();
        let gauges: Vec<String> = frame
            .gauges
            .iter()
            .map(|gauge| format!("{}={}", gauge.label, gauge.text))
            .collect();

        debug!(
            time = %frame.time_label,
            charts = %charts.join(", "),
            gauges = %gauges.join(", "),
            "Frame"
        );
        Ok(())
    }
}

/// Writes each frame as one JSON document per line.
#[derive(Debug)]
pub struct JsonLinesPresenter<W> {
    writer: W,
}

impl<W: Write + Send> JsonLinesPresenter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Presenter for JsonLinesPresenter<W> {
    fn present(&mut self, frame: &DashboardFrame) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, frame)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

/// Renders [`DashboardFrame`]s on a fixed tick until shutdown.
pub struct RenderLoop<C, P> {
    pub layout: DashboardLayout,
    pub windows: Arc<SensorWindowStore>,
    pub scalars: Arc<ScalarChannelStore>,
    pub clock: C,
    pub presenter: P,
    pub tick: Duration,
}

impl<C: LocalClock, P: Presenter> RenderLoop<C, P> {
    /// Render the stores as they are right now.
    pub fn render_once(&self) -> DashboardFrame {
        self.layout.frame(&self.windows, &self.scalars, self.clock.now_ms())
    }

    /// Run until `shutdown` fires or its sender is dropped.
    ///
    /// Missed ticks are skipped rather than replayed. Returns the number of
    /// frames presented.
    ///
    /// # Errors
    ///
    /// Stops on the first presenter error, e.g. a closed stdout.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> anyhow::Result<u64> {
        let mut ticker = interval(self.tick.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut frames = 0u64;

        let tick_ms = u64::try_from(self.tick.as_millis()).unwrap_or(u64::MAX);
        info!(tick_ms, "Render loop started");
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {
                    let frame = self.render_once();
                    self.presenter.present(&frame)?;
                    frames = frames.saturating_add(1);
                }
            }
        }
        info!(frames, "Render loop stopped");
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use piezoscope_core::{ManualClock, Sample, SensorKey};
    use piezoscope_view::{ChartSpec, GaugeSpec};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn render_loop<P: Presenter>(presenter: P) -> RenderLoop<ManualClock, P> {
        let windows = Arc::new(SensorWindowStore::new(20_000));
        windows.append(&SensorKey::from("Sensor1"), [Sample::new(1_000, 2.5)], 1_000);
        let scalars = Arc::new(ScalarChannelStore::new());
        scalars.set("temperature", 21.0);
        RenderLoop {
            layout: DashboardLayout {
                charts: vec![ChartSpec::new("Sensor1", "Sensor 1")],
                gauges: vec![GaugeSpec::temperature("temperature")],
            },
            windows,
            scalars,
            clock: ManualClock::new(1_000),
            presenter,
            tick: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_json_lines_presenter_writes_one_line_per_frame() -> TestResult {
        let render = render_loop(JsonLinesPresenter::new(Vec::new()));
        let frame = render.render_once();
        let mut presenter = render.presenter;
        presenter.present(&frame)?;
        presenter.present(&frame)?;

        let out = String::from_utf8(presenter.into_inner())?;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let value: serde_json::Value = serde_json::from_str(lines.first().copied().unwrap_or_default())?;
        assert_eq!(value["now"], 1_000);
        assert_eq!(value["charts"][0]["points"][0]["value"], 2.5);
        assert_eq!(value["gauges"][0]["text"], "21.00");
        Ok(())
    }

    #[test]
    fn test_tracing_presenter_never_fails() -> TestResult {
        let render = render_loop(TracingPresenter);
        let frame = render.render_once();
        let mut presenter = render.presenter;
        presenter.present(&frame)?;
        Ok(())
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() -> TestResult {
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(render_loop(TracingPresenter).run(rx));

        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(())?;

        let frames = tokio::time::timeout(Duration::from_secs(5), handle).await???;
        assert!(frames >= 1);
        Ok(())
    }
}
