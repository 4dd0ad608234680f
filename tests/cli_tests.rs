use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn gifsmith(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("gifsmith").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("GIFSMITH_FFMPEG")
        .env_remove("GIFSMITH_LOG_LEVEL")
        .arg("--config")
        .arg(config_dir.path().join("config.toml"))
        .arg("--log-level")
        .arg("warn");
    cmd
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("gifsmith")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("encode"))
        .stdout(predicate::str::contains("preview"))
        .stdout(predicate::str::contains("probe"))
        .stdout(predicate::str::contains("settings"));
}

#[test]
fn test_settings_show_defaults_without_file() {
    let dir = TempDir::new().unwrap();

    gifsmith(&dir)
        .args(["settings", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fps:        50"))
        .stdout(predicate::str::contains("height:     (unset)"))
        .stdout(predicate::str::contains("mpdecimate: 3"));
}

#[test]
fn test_settings_set_persists_and_clears_fields() {
    let dir = TempDir::new().unwrap();

    gifsmith(&dir)
        .args(["settings", "set", "--fps", "12", "--height", "320"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fps:        12"))
        .stdout(predicate::str::contains("height:     320"));

    let saved = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(saved.contains("fps = 12"));
    assert!(saved.contains("height = 320"));

    gifsmith(&dir)
        .args(["settings", "set", "--mpdecimate", ""])
        .assert()
        .success()
        .stdout(predicate::str::contains("fps:        12"))
        .stdout(predicate::str::contains("mpdecimate: (unset)"));

    gifsmith(&dir)
        .args(["settings", "show", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"fps\": 12"))
        .stdout(predicate::str::contains("\"height\": 320"));
}

#[test]
fn test_settings_set_rejects_non_positive() {
    let dir = TempDir::new().unwrap();

    gifsmith(&dir)
        .args(["settings", "set", "--fps", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be positive"));

    assert!(!dir.path().join("config.toml").exists());
}

#[test]
fn test_settings_reset_restores_factory_values() {
    let dir = TempDir::new().unwrap();

    gifsmith(&dir)
        .args(["settings", "set", "--fps", "8"])
        .assert()
        .success();

    gifsmith(&dir)
        .args(["settings", "reset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fps:        50"))
        .stdout(predicate::str::contains("mpdecimate: 3"));
}

#[test]
fn test_encode_requires_input() {
    let dir = TempDir::new().unwrap();

    gifsmith(&dir).arg("encode").assert().failure();
}

#[test]
fn test_encode_rejects_out_of_range_fps() {
    let dir = TempDir::new().unwrap();

    gifsmith(&dir)
        .args(["encode", "clip.mp4", "--fps", "0"])
        .assert()
        .failure();
}

#[test]
fn test_encode_gestures_conflict_with_trim_flags() {
    let dir = TempDir::new().unwrap();

    gifsmith(&dir)
        .args(["encode", "clip.mp4", "--gestures", "edit.json", "--start", "00:00:01"])
        .assert()
        .failure();
}

#[test]
fn test_encode_fails_without_engine() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("clip.mp4");
    std::fs::write(&input, b"not really a video").unwrap();

    gifsmith(&dir)
        .arg("--ffmpeg")
        .arg(dir.path().join("no-such-ffmpeg"))
        .arg("encode")
        .arg(&input)
        .arg("--out-dir")
        .arg(dir.path().join("out"))
        .args(["--progress", "none"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("inputs failed"));

    assert!(!dir.path().join("out").join("clip.gif").exists());
}
