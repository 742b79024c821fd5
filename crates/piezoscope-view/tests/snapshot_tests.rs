//! Snapshot tests for rendered chart and gauge text

use piezoscope_core::Sample;
use piezoscope_view::{ChartView, GaugeView};

// 2024-01-01T13:05:09Z
const NOW: i64 = 1_704_114_309_000;

#[test]
fn test_chart_axis_labels_snapshot() {
    let samples = [Sample::new(NOW - 1_000, 0.74), Sample::new(NOW - 500, 1.26)];
    let chart = ChartView::build("Sensor 1", &samples, NOW, 20_000);

    insta::assert_snapshot!(
        format!("{} .. {}", chart.x_labels.0, chart.x_labels.1),
        @"13:04:49 .. 13:05:09"
    );
    insta::assert_snapshot!(chart.y_tick_labels.join(" "), @"0.50 1.00 1.50");
}

#[test]
fn test_gauge_text_snapshot() {
    let temperature = GaugeView::new(21.456, "Temperature (°C)", -20.0, 60.0);
    let humidity = GaugeView::new(f64::INFINITY, "Humidity (%)", 0.0, 100.0);

    insta::assert_snapshot!(
        format!("{}: {} [{:.1}%]", temperature.label, temperature.text, temperature.percent),
        @"Temperature (°C): 21.46 [51.8%]"
    );
    insta::assert_snapshot!(
        format!("{}: {} [{:.1}%]", humidity.label, humidity.text, humidity.percent),
        @"Humidity (%): 0.00 [0.0%]"
    );
}

#[test]
fn test_empty_chart_json_snapshot() -> Result<(), serde_json::Error> {
    let chart = ChartView::build("Sensor 4", &[], 20_000, 20_000);
    insta::assert_snapshot!(
        serde_json::to_string(&chart.x_domain)?,
        @"[0,20000]"
    );
    insta::assert_snapshot!(
        serde_json::to_string(&chart.y_domain)?,
        @"[0.0,10.0]"
    );
    insta::assert_snapshot!(
        format!("{:?} .. {:?}", chart.y_tick_labels.first(), chart.y_tick_labels.last()),
        @r#"Some("0.00") .. Some("10.00")"#
    );
    Ok(())
}
