//! Property-based tests for chart domains and gauge fill levels.

use piezoscope_core::Sample;
use piezoscope_view::{ChartView, GaugeView};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_y_domain_covers_every_visible_point(
        values in prop::collection::vec(-1_000.0f64..1_000.0, 1..50),
    ) {
        let now = 1_000_000;
        let samples: Vec<Sample> = values
            .iter()
            .enumerate()
            .map(|(i, v)| Sample::new(now - i as i64, *v))
            .collect();
        let chart = ChartView::build("Sensor", &samples, now, 20_000);

        let (lo, hi) = chart.y_domain;
        prop_assert!(lo < hi);
        for point in &chart.points {
            prop_assert!(point.value >= lo && point.value <= hi);
        }
        let points_sorted = chart.points.windows(2).all(|w| match w {
            [a, b] => a.time <= b.time,
            _ => true,
        });
        prop_assert!(points_sorted);
    }

    #[test]
    fn test_gauge_percent_is_always_in_range(
        value in prop::num::f64::ANY,
        min in -1_000.0f64..1_000.0,
        span in -10.0f64..1_000.0,
    ) {
        let gauge = GaugeView::new(value, "g", min, min + span);
        prop_assert!((0.0..=100.0).contains(&gauge.percent));
        prop_assert!(gauge.value.is_finite());
    }
}
