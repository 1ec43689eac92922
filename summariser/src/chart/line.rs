use charming::component::{Axis, Legend, Title};
use charming::element::{AxisType, Tooltip, Trigger};
use charming::series::Line;
use charming::Chart;
use stress_tunnel_series::LoadedSeries;

use crate::chart::{column_values, minutes, points, CHANNELS, LATENCY_AXIS_NAME, TIME_AXIS_NAME};

/// Min, avg and max latency of one test over time, on a log latency axis.
pub fn test_chart(series: &LoadedSeries) -> anyhow::Result<Chart> {
    let time = minutes(&series.frame)?;

    let mut chart = Chart::new()
        .title(Title::new().text(format!("{} Results", series.name)))
        .tooltip(Tooltip::new().trigger(Trigger::Axis))
        .legend(Legend::new())
        .x_axis(Axis::new().type_(AxisType::Value).name(TIME_AXIS_NAME))
        .y_axis(Axis::new().type_(AxisType::Log).name(LATENCY_AXIS_NAME));

    for (column, label) in CHANNELS {
        let values = column_values(&series.frame, column)?;
        chart = chart.series(
            Line::new()
                .name(label)
                .show_symbol(false)
                .data(points(&time, &values)),
        );
    }

    Ok(chart)
}
