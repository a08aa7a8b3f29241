use image::{Rgb, RgbImage};
use predicates::prelude::*;

fn write_frames(dir: &std::path::Path, n: usize) {
    for i in 0..n {
        RgbImage::from_pixel(32, 24, Rgb([10 * i as u8, 50, 50]))
            .save_with_format(dir.join(format!("{i:03}.png")), image::ImageFormat::Png)
            .unwrap();
    }
}

#[test]
fn missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("chessboard.avi");
    let mut cmd = assert_cmd::cargo_bin_cmd!("brickcast");
    cmd.arg(&missing)
        .arg("--headless")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot read the given input"));
}

#[test]
fn headless_run_over_image_directory() {
    let input = tempfile::tempdir().unwrap();
    write_frames(input.path(), 3);
    let out = tempfile::tempdir().unwrap();

    let mut cmd = assert_cmd::cargo_bin_cmd!("brickcast");
    cmd.arg(input.path())
        .arg("--headless")
        .arg("--output-dir")
        .arg(out.path())
        .args(["--log-level", "warn"])
        .assert()
        .success()
        .stdout(predicate::str::contains("frames: 3"));

    for i in 0..3 {
        assert!(out.path().join(format!("frame_{i:06}.png")).is_file());
    }
}

#[test]
fn config_file_is_applied() {
    let input = tempfile::tempdir().unwrap();
    write_frames(input.path(), 1);
    let cfg = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(cfg.path(), r#"{ "board": { "cols": 9, "rows": 6 } }"#).unwrap();

    let mut cmd = assert_cmd::cargo_bin_cmd!("brickcast");
    cmd.arg(input.path())
        .arg("--headless")
        .arg("--config")
        .arg(cfg.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("no board: 1"));
}

#[test]
fn broken_config_is_reported() {
    let input = tempfile::tempdir().unwrap();
    write_frames(input.path(), 1);
    let cfg = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(cfg.path(), "{ not json").unwrap();

    let mut cmd = assert_cmd::cargo_bin_cmd!("brickcast");
    cmd.arg(input.path())
        .arg("--headless")
        .arg("--config")
        .arg(cfg.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config"));
}

#[test]
fn log_level_scopes_workspace_records() {
    let input = tempfile::tempdir().unwrap();
    write_frames(input.path(), 2);

    let mut cmd = assert_cmd::cargo_bin_cmd!("brickcast");
    cmd.arg(input.path())
        .arg("--headless")
        .args(["--log-level", "debug"])
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stderr(predicate::str::contains("DEBUG"))
        .stderr(predicate::str::contains("playback finished"));

    let mut cmd = assert_cmd::cargo_bin_cmd!("brickcast");
    cmd.arg(input.path())
        .arg("--headless")
        .args(["--log-level", "error"])
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stderr(predicate::str::contains("playback finished").not());
}
