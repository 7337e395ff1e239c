use std::path::Path;
use std::process::{Command, Output};

fn run(args: &[&str], envs: &[(&str, &Path)]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_boardkeep_cli"));
    command.args(args).env_remove("BOARDKEEP_HISTORY_DIR");
    for (key, value) in envs {
        command.env(key, value);
    }
    command.output().unwrap()
}

fn stats(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let summary = stdout.split_once('\n').map_or("", |(_, rest)| rest);
    serde_json::from_str(summary).unwrap()
}

#[test]
fn board_name_alone_uses_environment_history_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("board-demo.json"),
        br#"{"l1": {"x": 1, "y": 1}, "l2": {"size": 3}}"#,
    )
    .unwrap();

    let output = run(&["demo"], &[("BOARDKEEP_HISTORY_DIR", dir.path())]);
    assert!(output.status.success());
    let summary = stats(&output);
    assert_eq!(summary["items"], 2);
    assert_eq!(summary["readiness"], "ready");
    assert!(dir.path().join("logs").is_dir());
}

#[test]
fn explicit_history_dir_overrides_environment() {
    let configured = tempfile::tempdir().unwrap();
    let explicit = tempfile::tempdir().unwrap();
    std::fs::write(explicit.path().join("board-demo.json"), br#"{"l1": {}}"#).unwrap();

    let explicit_arg = explicit.path().to_string_lossy().into_owned();
    let output = run(
        &[&explicit_arg, "demo"],
        &[("BOARDKEEP_HISTORY_DIR", configured.path())],
    );
    assert!(output.status.success());
    assert_eq!(stats(&output)["items"], 1);
    assert!(explicit.path().join("logs").is_dir());
    assert!(!configured.path().join("logs").exists());
}

#[test]
fn invalid_environment_override_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_boardkeep_cli"))
        .arg("demo")
        .env("BOARDKEEP_HISTORY_DIR", dir.path())
        .env("BOARDKEEP_MAX_CHILDREN", "many")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("BOARDKEEP_MAX_CHILDREN"));
    assert!(!dir.path().join("logs").exists());
}
