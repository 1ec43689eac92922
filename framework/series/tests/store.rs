use std::fs;

use pretty_assertions::assert_eq;
use stress_tunnel_core::prelude::LatencySample;
use stress_tunnel_series::{read, read_all, series_file_name, write, SeriesError, STD_DEV};

fn samples() -> Vec<LatencySample> {
    vec![
        LatencySample::new(0.0, 10, 20, 30),
        LatencySample::new(1.0003, 9, 14, 250),
        LatencySample::new(60.125, 12, 18, 28),
        LatencySample::new(61.7, 3, 4, 1_000_000),
    ]
}

#[test]
fn write_then_read_preserves_samples() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join(series_file_name("Baseline Test"));

    write(&samples(), &path)?;
    let loaded = read(&path)?;

    assert_eq!(samples(), loaded);
    Ok(())
}

#[test]
fn write_produces_fixed_header() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("baseline_test_results.csv");

    write(&samples()[..1], &path)?;
    let content = fs::read_to_string(&path)?;

    assert_eq!(Some("time,min,avg,max"), content.lines().next());
    assert_eq!(2, content.lines().count());
    Ok(())
}

#[test]
fn write_overwrites_existing_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("baseline_test_results.csv");

    write(&samples(), &path)?;
    write(&samples()[..2], &path)?;

    assert_eq!(samples()[..2].to_vec(), read(&path)?);
    Ok(())
}

#[test]
fn empty_series_round_trips() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("empty_results.csv");

    write(&[], &path)?;

    assert!(read(&path)?.is_empty());
    Ok(())
}

#[test]
fn read_all_skips_bad_and_unrelated_files() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write(&samples(), &dir.path().join("cpu_stress_test_results.csv"))?;
    write(&samples()[..1], &dir.path().join("baseline_test_results.csv"))?;
    fs::write(dir.path().join("notes.txt"), "not a series")?;
    fs::write(dir.path().join("run_summary.jsonl"), "{}\n")?;
    fs::write(
        dir.path().join("broken_results.csv"),
        "time,min,avg,max\n0.5,abc,2,3\n",
    )?;
    fs::write(dir.path().join("wrong_columns_results.csv"), "a,b\n1,2\n")?;
    fs::create_dir(dir.path().join("nested_results.csv"))?;

    let collection = read_all(dir.path())?;

    assert_eq!(
        vec!["Baseline Test", "Cpu Stress Test"],
        collection.series.keys().map(String::as_str).collect::<Vec<_>>()
    );
    let mut skipped = collection
        .skipped
        .iter()
        .map(|s| s.path.file_name().unwrap().to_string_lossy().to_string())
        .collect::<Vec<_>>();
    skipped.sort();
    assert_eq!(
        vec!["broken_results.csv", "wrong_columns_results.csv"],
        skipped
    );

    let cpu = &collection.series["Cpu Stress Test"];
    assert_eq!("cpu_stress_test", cpu.stem);
    assert_eq!(4, cpu.frame.height());
    assert!(cpu.frame.column(STD_DEV).is_ok());
    Ok(())
}

#[test]
fn read_all_fails_for_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does_not_exist");

    let result = read_all(&missing);

    assert!(matches!(result, Err(SeriesError::MissingDirectory(_))));
}
