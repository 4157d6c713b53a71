//! Integration tests for reference lap persistence.

use racing_overlay_fuel::{ConsumptionSample, CurveStore, ReferenceLap};
use std::fs;
use tempfile::TempDir;

#[track_caller]
fn must<T, E: std::fmt::Debug>(r: Result<T, E>) -> T {
    match r {
        Ok(v) => v,
        Err(e) => panic!("unexpected Err: {e:?}"),
    }
}

fn sample_lap(knots: usize) -> ReferenceLap {
    let samples = (0..knots)
        .map(|i| ConsumptionSample::new(i as f64 * 37.5, i as f64 * 0.0625))
        .collect::<Vec<_>>();
    let last_position = (knots.saturating_sub(1)) as f64 * 37.5;
    let used = knots as f64 * 0.0625;
    ReferenceLap::from_completed_lap(samples, last_position, used, 92.375)
}

#[test]
fn test_save_and_reload_is_identical() {
    let dir = must(TempDir::new());
    let store = CurveStore::new(dir.path(), "fuel");
    let lap = sample_lap(60);

    must(store.save("Spa - GT3", &lap));
    let loaded = must(store.load("Spa - GT3"));

    assert_eq!(loaded, lap);
    assert_eq!(loaded.to_rows(), lap.to_rows());
}

#[test]
fn test_short_even_curve_survives_reload() {
    let dir = must(TempDir::new());
    let store = CurveStore::new(dir.path(), "fuel");
    let samples = (0..11)
        .map(|i| ConsumptionSample::new(f64::from(i) * 100.0, f64::from(i) * 0.25))
        .collect::<Vec<_>>();
    let lap = ReferenceLap::from_completed_lap(samples, 1000.0, 2.6, 58.0);
    assert_eq!(lap.len(), 12);

    must(store.save("Zandvoort - GT4", &lap));
    let loaded = must(store.load("Zandvoort - GT4"));

    assert_eq!(loaded, lap);
    assert!(!store.load_or_default("Zandvoort - GT4").is_placeholder());
}

#[test]
fn test_save_creates_directory_and_uses_extension() {
    let dir = must(TempDir::new());
    let nested = dir.path().join("consumption").join("nested");
    let store = CurveStore::new(&nested, "energy");

    must(store.save("Monza - LMH", &sample_lap(20)));

    assert!(nested.join("Monza - LMH.energy").exists());
    assert!(!nested.join("Monza - LMH.tmp").exists());
}

#[test]
fn test_stale_rows_are_removed_and_resaved() {
    let dir = must(TempDir::new());
    let store = CurveStore::new(dir.path(), "fuel");
    let path = store.path_for("Imola - GT3");

    let mut content = String::from("0,0\n1990,0.01\n");
    for i in 2..30 {
        content.push_str(&format!("{},{}\n", i * 50, f64::from(i) * 0.1));
    }
    content.push_str("1500,3.0,75.5\n");
    must(fs::write(&path, content));

    let lap = must(store.load("Imola - GT3"));
    assert_eq!(lap.len(), 30);
    assert!(lap.samples().iter().all(|s| s.position <= 1500.0));

    let rewritten = must(fs::read_to_string(&path));
    assert!(!rewritten.contains("1990"));
    assert_eq!(rewritten.lines().count(), 30);
}

#[test]
fn test_malformed_file_falls_back_to_placeholder() {
    let dir = must(TempDir::new());
    let store = CurveStore::new(dir.path(), "fuel");
    must(fs::write(store.path_for("Broken - GT3"), "0,0\nnot,a,number\n"));

    assert!(store.load("Broken - GT3").is_err());
    assert!(store.load_or_default("Broken - GT3").is_placeholder());
}

#[test]
fn test_decreasing_terminal_falls_back_to_placeholder() {
    let dir = must(TempDir::new());
    let store = CurveStore::new(dir.path(), "fuel");
    let mut content = String::new();
    for i in 0..20 {
        content.push_str(&format!("{},{}\n", i * 50, f64::from(i) * 0.1));
    }
    content.push_str("1010,0.5,60\n");
    must(fs::write(store.path_for("Reset - GT3"), content));

    assert!(store.load_or_default("Reset - GT3").is_placeholder());
}
