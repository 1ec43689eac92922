use charming::component::{Axis, Grid, Legend, Title};
use charming::element::{AxisType, Tooltip, Trigger};
use charming::series::Line;
use charming::Chart;
use stress_tunnel_series::SeriesCollection;

use crate::chart::{column_values, minutes, points, CHANNELS, LATENCY_AXIS_NAME, TIME_AXIS_NAME};

/// Height of each test's panel in the combined chart, in pixels.
pub const PANEL_HEIGHT: u32 = 300;

/// Space above the first panel for the title and legend, in pixels.
const HEADER_HEIGHT: u32 = 100;

/// Pixel height needed to render [combined_chart] for `panels` tests.
pub fn combined_chart_height(panels: usize) -> u32 {
    HEADER_HEIGHT + PANEL_HEIGHT * panels.max(1) as u32
}

/// Every test's line chart stacked in one chart, one panel per test.
///
/// All panels share the same time range so that tests of different length line up.
pub fn combined_chart(collection: &SeriesCollection) -> anyhow::Result<Chart> {
    let total_height = combined_chart_height(collection.len()) as f64;
    let percent = |pixels: f64| format!("{:.2}%", pixels / total_height * 100.0);

    let mut end_minutes = 0.0_f64;
    for series in collection.iter() {
        if let Some(last) = minutes(&series.frame)?.last() {
            end_minutes = end_minutes.max(*last);
        }
    }

    let mut chart = Chart::new()
        .title(Title::new().text("Combined Stress Test Results"))
        .tooltip(Tooltip::new().trigger(Trigger::Axis))
        .legend(Legend::new().top(percent(30.0).as_str()));

    for (index, series) in collection.iter().enumerate() {
        let panel_top = HEADER_HEIGHT as f64 + (index as u32 * PANEL_HEIGHT) as f64;
        let grid_index = index as f64;

        chart = chart
            .title(
                Title::new()
                    .text(series.name.clone())
                    .top(percent(panel_top).as_str())
                    .left("center"),
            )
            .grid(
                Grid::new()
                    .top(percent(panel_top + 30.0).as_str())
                    .height(percent(PANEL_HEIGHT as f64 - 80.0).as_str()),
            )
            .x_axis(
                Axis::new()
                    .type_(AxisType::Value)
                    .grid_index(grid_index)
                    .name(TIME_AXIS_NAME)
                    .min(0.0)
                    .max(end_minutes),
            )
            .y_axis(
                Axis::new()
                    .type_(AxisType::Log)
                    .grid_index(grid_index)
                    .name(LATENCY_AXIS_NAME),
            );

        let time = minutes(&series.frame)?;
        for (column, label) in CHANNELS {
            let values = column_values(&series.frame, column)?;
            chart = chart.series(
                Line::new()
                    .name(format!("{} {label}", series.name))
                    .show_symbol(false)
                    .x_axis_index(grid_index)
                    .y_axis_index(grid_index)
                    .data(points(&time, &values)),
            );
        }
    }

    Ok(chart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::test_support::collection;
    use pretty_assertions::assert_eq;

    #[test]
    fn chart_is_deterministic() {
        let collection = collection();

        assert_eq!(
            combined_chart(&collection).unwrap().to_string(),
            combined_chart(&collection).unwrap().to_string()
        );
    }

    #[test]
    fn one_panel_per_test() {
        let collection = collection();

        let options = combined_chart(&collection).unwrap().to_string();
        assert_eq!(2, options.matches(TIME_AXIS_NAME).count(), "{options}");
        assert!(options.contains("Baseline Test Max"), "{options}");
        assert!(options.contains("Cpu Stress Test Min"), "{options}");
    }

    #[test]
    fn height_grows_with_tests() {
        assert_eq!(400, combined_chart_height(1));
        assert_eq!(1600, combined_chart_height(5));
        assert_eq!(400, combined_chart_height(0));
    }
}
