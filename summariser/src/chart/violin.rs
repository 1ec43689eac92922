use charming::component::{Axis, Legend, Title};
use charming::element::{AxisType, ItemStyle, Tooltip, Trigger};
use charming::series::Line;
use charming::Chart;
use itertools::Itertools;
use stress_tunnel_series::SeriesCollection;

use crate::chart::{column_values, CHANNELS, LATENCY_AXIS_NAME};

/// Points along the latency axis at which each density is evaluated.
const DENSITY_POINTS: usize = 64;

/// Half the width of the widest violin, in test slots.
const HALF_WIDTH: f64 = 0.12;

/// Offset of each channel's violin from the centre of its test's slot.
const CHANNEL_OFFSETS: [f64; 3] = [-0.28, 0.0, 0.28];

const CHANNEL_COLORS: [&str; 3] = ["#5470c6", "#91cc75", "#ee6666"];

/// Bandwidth used when every value is the same, in log10 units.
const FALLBACK_BANDWIDTH: f64 = 0.05;

/// Latency distributions as violins, one per channel grouped in a slot per test.
///
/// Each violin is a Gaussian kernel density estimate over log10 latency with Silverman's
/// bandwidth, scaled so its widest point is the same for every violin and mirrored around its
/// centre line. Slot `i` on the horizontal axis is the `i`th test, in collection order.
pub fn violin_chart(collection: &SeriesCollection) -> anyhow::Result<Chart> {
    let tests = collection
        .iter()
        .filter(|s| s.frame.height() > 0)
        .collect::<Vec<_>>();
    let legend = tests
        .iter()
        .enumerate()
        .map(|(slot, s)| format!("{slot}: {}", s.name))
        .join(", ");

    let mut chart = Chart::new()
        .title(
            Title::new()
                .text("Latency Distribution by Test")
                .subtext(legend),
        )
        .tooltip(Tooltip::new().trigger(Trigger::Item))
        .legend(Legend::new())
        .x_axis(
            Axis::new()
                .type_(AxisType::Value)
                .name("Test")
                .min(-0.5)
                .max(tests.len() as f64 - 0.5),
        )
        .y_axis(Axis::new().type_(AxisType::Log).name(LATENCY_AXIS_NAME));

    for (slot, series) in tests.iter().enumerate() {
        for (index, (column, label)) in CHANNELS.iter().enumerate() {
            let values = column_values(&series.frame, column)?;
            let Some(outline) = violin_outline(&values, slot as f64 + CHANNEL_OFFSETS[index])
            else {
                continue;
            };

            chart = chart.series(
                Line::new()
                    .name(*label)
                    .show_symbol(false)
                    .item_style(ItemStyle::new().color(CHANNEL_COLORS[index]))
                    .data(outline),
            );
        }
    }

    Ok(chart)
}

/// Closed outline of a violin centred on `centre`, as `[x, latency]` points.
///
/// Values that can't be shown on a log axis are ignored. Returns `None` if nothing is left.
fn violin_outline(values: &[f64], centre: f64) -> Option<Vec<Vec<f64>>> {
    let logs = values
        .iter()
        .filter(|v| v.is_finite() && **v > 0.0)
        .map(|v| v.log10())
        .sorted_by(|a, b| a.total_cmp(b))
        .collect::<Vec<_>>();
    let (low, high) = logs.iter().copied().minmax().into_option()?;

    let bandwidth = silverman_bandwidth(&logs);
    let start = low - 3.0 * bandwidth;
    let step = (high - low + 6.0 * bandwidth) / (DENSITY_POINTS - 1) as f64;
    let grid = (0..DENSITY_POINTS)
        .map(|i| start + step * i as f64)
        .collect::<Vec<_>>();

    let density = grid
        .iter()
        .map(|y| gaussian_kde(&logs, bandwidth, *y))
        .collect::<Vec<_>>();
    let peak = density.iter().copied().fold(0.0_f64, f64::max);
    if peak <= 0.0 {
        return None;
    }

    let left = grid
        .iter()
        .zip(&density)
        .map(|(y, d)| vec![centre - HALF_WIDTH * d / peak, 10f64.powf(*y)]);
    let right = grid
        .iter()
        .zip(&density)
        .rev()
        .map(|(y, d)| vec![centre + HALF_WIDTH * d / peak, 10f64.powf(*y)]);

    let mut outline = left.chain(right).collect::<Vec<_>>();
    if let Some(first) = outline.first().cloned() {
        outline.push(first);
    }

    Some(outline)
}

/// Silverman's rule of thumb, `0.9 * min(sd, IQR / 1.34) * n^(-1/5)`, for sorted values.
fn silverman_bandwidth(sorted: &[f64]) -> f64 {
    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let sd = (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    let iqr = linear_quantile(sorted, 0.75) - linear_quantile(sorted, 0.25);

    let spread = if iqr > 0.0 { sd.min(iqr / 1.34) } else { sd };
    let bandwidth = 0.9 * spread * n.powf(-0.2);
    if bandwidth > 0.0 {
        bandwidth
    } else {
        FALLBACK_BANDWIDTH
    }
}

/// Quantile of sorted values, interpolating linearly at `h = q * (n - 1)`.
fn linear_quantile(sorted: &[f64], q: f64) -> f64 {
    let h = q * (sorted.len() - 1) as f64;
    let below = h.floor() as usize;
    let above = h.ceil() as usize;
    sorted[below] + (h - below as f64) * (sorted[above] - sorted[below])
}

fn gaussian_kde(values: &[f64], bandwidth: f64, at: f64) -> f64 {
    let norm = 1.0 / (values.len() as f64 * bandwidth * (2.0 * std::f64::consts::PI).sqrt());
    values
        .iter()
        .map(|v| {
            let z = (at - v) / bandwidth;
            (-0.5 * z * z).exp()
        })
        .sum::<f64>()
        * norm
}
