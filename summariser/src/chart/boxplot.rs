use charming::component::{Axis, Legend, Title};
use charming::datatype::{CompositeValue, Dataset, Source};
use charming::element::{AxisType, Tooltip, Trigger};
use charming::series::Boxplot;
use charming::Chart;
use stress_tunnel_series::SeriesCollection;

use crate::analyze::five_number_summary;
use crate::chart::{CHANNELS, LATENCY_AXIS_NAME};

/// Dimensions of each box row: the test, then its five-number summary.
const BOX_DIMENSIONS: [&str; 6] = ["test", "min", "Q1", "median", "Q3", "max"];

/// Box and whisker summaries of min, avg and max latency, grouped by test.
///
/// Each channel's boxes are one dataset source with a `[test, min, q1, median, q3, max]` row
/// per test, drawn by the box series with the same index. Tests without samples are left out.
pub fn boxplot_chart(collection: &SeriesCollection) -> anyhow::Result<Chart> {
    let mut tests = Vec::new();
    let mut boxes: [Vec<Vec<CompositeValue>>; 3] = Default::default();
    for series in collection.iter() {
        if series.frame.height() == 0 {
            continue;
        }

        tests.push(series.name.clone());
        for (index, (column, _)) in CHANNELS.iter().enumerate() {
            if let Some(summary) = five_number_summary(&series.frame, column)? {
                let mut row = vec![CompositeValue::from(series.name.as_str())];
                row.extend(summary.into_iter().map(CompositeValue::from));
                boxes[index].push(row);
            }
        }
    }

    let mut dataset = Dataset::new();
    for rows in boxes {
        dataset = dataset.source(Source::from(rows).dimensions(BOX_DIMENSIONS.to_vec()));
    }

    let mut chart = Chart::new()
        .title(Title::new().text("Distribution of Latencies Across All Tests"))
        .tooltip(Tooltip::new().trigger(Trigger::Item))
        .legend(Legend::new())
        .dataset(dataset)
        .x_axis(Axis::new().type_(AxisType::Category).data(tests))
        .y_axis(Axis::new().type_(AxisType::Log).name(LATENCY_AXIS_NAME));

    for (index, (_, label)) in CHANNELS.iter().enumerate() {
        chart = chart.series(Boxplot::new().name(*label).dataset_index(index as u64));
    }

    Ok(chart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::test_support::{collection, loaded};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use stress_tunnel_core::prelude::LatencySample;

    fn options(chart: &Chart) -> Value {
        serde_json::from_str(&chart.to_string()).unwrap()
    }

    #[test]
    fn chart_is_deterministic() {
        let collection = collection();

        assert_eq!(
            boxplot_chart(&collection).unwrap().to_string(),
            boxplot_chart(&collection).unwrap().to_string()
        );
    }

    #[test]
    fn boxes_hold_five_number_summaries() {
        let mut collection = SeriesCollection::default();
        let series = loaded(
            "Baseline Test",
            &[
                LatencySample::new(0.0, 1, 10, 100),
                LatencySample::new(1.0, 2, 20, 200),
                LatencySample::new(2.0, 3, 30, 300),
                LatencySample::new(3.0, 4, 40, 400),
                LatencySample::new(4.0, 5, 50, 500),
            ],
        );
        collection.series.insert(series.name.clone(), series);

        let options = options(&boxplot_chart(&collection).unwrap());

        let sources = options["dataset"].as_array().unwrap();
        assert_eq!(3, sources.len());
        assert_eq!(
            json!([["Baseline Test", 1.0, 2.0, 3.0, 4.0, 5.0]]),
            sources[0]["source"]
        );
        assert_eq!(
            json!([["Baseline Test", 10.0, 20.0, 30.0, 40.0, 50.0]]),
            sources[1]["source"]
        );
        assert_eq!(
            json!([["Baseline Test", 100.0, 200.0, 300.0, 400.0, 500.0]]),
            sources[2]["source"]
        );

        let series = options["series"].as_array().unwrap();
        let indexes = series
            .iter()
            .map(|s| s["datasetIndex"].as_u64().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(vec![0, 1, 2], indexes);
    }

    #[test]
    fn quartiles_are_interpolated() {
        let mut collection = SeriesCollection::default();
        let series = loaded(
            "Baseline Test",
            &[
                LatencySample::new(0.0, 10, 10, 10),
                LatencySample::new(1.0, 20, 20, 20),
            ],
        );
        collection.series.insert(series.name.clone(), series);

        let options = options(&boxplot_chart(&collection).unwrap());

        assert_eq!(
            json!([["Baseline Test", 10.0, 12.5, 15.0, 17.5, 20.0]]),
            options["dataset"][0]["source"]
        );
    }

    #[test]
    fn empty_tests_are_left_out() {
        let mut collection = collection();
        let empty = loaded("Idle Test", &[]);
        collection.series.insert(empty.name.clone(), empty);

        let options = options(&boxplot_chart(&collection).unwrap());

        assert_eq!(
            json!(["Baseline Test", "Cpu Stress Test"]),
            options["xAxis"][0]["data"]
        );
        for source in options["dataset"].as_array().unwrap() {
            let tests = source["source"]
                .as_array()
                .unwrap()
                .iter()
                .map(|row| row[0].as_str().unwrap())
                .collect::<Vec<_>>();
            assert_eq!(vec!["Baseline Test", "Cpu Stress Test"], tests);
        }
    }
}
