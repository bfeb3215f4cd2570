use assert_cmd::Command;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use serde_json::Value;
use tempfile::tempdir;

fn write_truss_png(path: &std::path::Path) {
    let img = RgbImage::from_fn(160, 100, |x, y| {
        let dx = x as f32 - 80.0;
        let dy = y as f32 - 60.0;
        if dx * dx + dy * dy <= 22.0 * 22.0 {
            Rgb([210, 40, 40])
        } else if (20..=24).contains(&y) && (30..=130).contains(&x) {
            Rgb([60, 140, 50])
        } else {
            Rgb([90, 100, 140])
        }
    });
    img.save(path).unwrap();
}

#[test]
fn detects_fruit_and_writes_report() {
    let dir = tempdir().unwrap();
    let image_path = dir.path().join("truss.png");
    let config_path = dir.path().join("config.json");
    let report_path = dir.path().join("report.json");
    let mask_dir = dir.path().join("masks");
    write_truss_png(&image_path);

    let config = serde_json::json!({
        "image_path": image_path.to_string_lossy(),
        "output_path": report_path.to_string_lossy(),
        "mask_dir": mask_dir.to_string_lossy(),
    });
    std::fs::write(&config_path, config.to_string()).unwrap();

    Command::cargo_bin("truss-vision")
        .unwrap()
        .args(["--config", config_path.to_str().unwrap(), "--log-level", "warn"])
        .assert()
        .success();

    let report: Value = serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["image_size"], serde_json::json!([160, 100]));
    assert!(report["error"].is_null(), "{report}");
    assert_eq!(report["segmentation"]["stem_visible"], Value::Bool(true));
    assert!(report["fruit"]["detection"]["circles"].as_array().unwrap().len() >= 1);
    assert_eq!(report["fruit"]["centroid_original"]["frame"], "original");
    assert!(report["timings"]["total"].is_u64());
    for name in ["fruit", "stem", "background"] {
        assert!(mask_dir.join(format!("{name}.png")).exists());
    }
}

#[test]
fn pipeline_failure_is_recorded_in_report() {
    let dir = tempdir().unwrap();
    let image_path = dir.path().join("stem_only.png");
    let config_path = dir.path().join("config.json");
    let report_path = dir.path().join("report.json");
    RgbImage::from_fn(40, 30, |_, y| {
        if y < 8 {
            Rgb([60, 140, 50])
        } else {
            Rgb([90, 100, 140])
        }
    })
    .save(&image_path)
    .unwrap();

    let config = serde_json::json!({
        "image_path": image_path.to_string_lossy(),
        "output_path": report_path.to_string_lossy(),
    });
    std::fs::write(&config_path, config.to_string()).unwrap();

    Command::cargo_bin("truss-vision")
        .unwrap()
        .args(["--config", config_path.to_str().unwrap()])
        .assert()
        .success();

    let report: Value = serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["error"], "fruit mask is empty");
    assert!(report["fruit"].is_null());
}

#[test]
fn missing_config_fails() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("truss-vision")
        .unwrap()
        .args(["--config", dir.path().join("nope.json").to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No such file").or(predicate::str::contains("cannot find")));
}
