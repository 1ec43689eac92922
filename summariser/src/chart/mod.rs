//! Chart builders for a collection of latency series.
//!
//! Every builder is a pure function of the series it is given, so the same input always produces
//! the same chart options.

mod boxplot;
mod combined;
mod line;
mod render;
mod violin;

pub use boxplot::boxplot_chart;
pub use combined::{combined_chart, combined_chart_height, PANEL_HEIGHT};
pub use line::test_chart;
pub use render::ChartRenderer;
pub use violin::violin_chart;

use polars::prelude::*;
use stress_tunnel_series::{AVG, MAX, MIN, TIME};

/// The per-sample channels that are plotted, with their labels.
pub(crate) const CHANNELS: [(&str, &str); 3] = [(MIN, "Min"), (AVG, "Avg"), (MAX, "Max")];

pub(crate) const LATENCY_AXIS_NAME: &str = "Latency (µs)";
pub(crate) const TIME_AXIS_NAME: &str = "Time (minutes)";

/// A column as `f64` values, nulls dropped.
pub(crate) fn column_values(frame: &DataFrame, column: &str) -> PolarsResult<Vec<f64>> {
    let values = frame.column(column)?.cast(&DataType::Float64)?;
    Ok(values.f64()?.into_iter().flatten().collect())
}

/// Sample times converted from seconds to minutes.
pub(crate) fn minutes(frame: &DataFrame) -> PolarsResult<Vec<f64>> {
    Ok(column_values(frame, TIME)?
        .into_iter()
        .map(|seconds| seconds / 60.0)
        .collect())
}

/// Pair up x and y values as chart points.
pub(crate) fn points(x: &[f64], y: &[f64]) -> Vec<Vec<f64>> {
    x.iter().zip(y).map(|(x, y)| vec![*x, *y]).collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn points_pair_values() {
        assert_eq!(
            vec![vec![0.0, 5.0], vec![0.5, 7.0]],
            points(&[0.0, 0.5], &[5.0, 7.0])
        );
    }

    #[test]
    fn time_is_in_minutes() {
        let series = test_support::collection();
        let first = series.iter().next().unwrap();

        let minutes = minutes(&first.frame).unwrap();
        assert_eq!(0.0, minutes[0]);
        assert_eq!(1.0, minutes[1]);
    }
}
