use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn run_infer(args: &[&str], path: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_paraminfer"))
        .args(args)
        .arg("infer")
        .arg(path)
        .output()
        .expect("Failed to run paraminfer infer")
}

fn run_infer_with(path: &Path, extra: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_paraminfer"))
        .arg("infer")
        .arg(path)
        .args(extra)
        .output()
        .expect("Failed to run paraminfer infer")
}

#[test]
fn test_text_output_for_directory() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.ts"), "function f(x) { return x + 3 }\n").unwrap();
    fs::create_dir(dir.path().join("lib")).unwrap();
    fs::write(dir.path().join("lib").join("b.ts"), "function typed(x: number) {}\n\nfunction g(o) { return o.y }\n")
        .unwrap();
    fs::write(dir.path().join("lib").join("b.d.ts"), "declare function h(z): void;\n").unwrap();

    let output = run_infer(&[], dir.path());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("a.ts:1: f(x: number)"), "{}", lines[0]);
    assert!(lines[1].ends_with("b.ts:3: g(o: { y: any; })"), "{}", lines[1]);
}

#[test]
fn test_json_output() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("a.ts");
    fs::write(&file, "function f(p, q?) { p.push(10) }\n").unwrap();

    let output = run_infer_with(&file, &["--format", "json"]);
    assert!(output.status.success());

    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let params = &reports[0]["functions"][0]["parameters"];
    assert_eq!(params[0]["type"], "number[]");
    assert_eq!(params[1]["declaration"]["name"], "q");
    assert_eq!(params[1]["is_optional"], true);
}

#[test]
fn test_strategy_flag_overrides_config() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("a.ts");
    let config = dir.path().join("options.json");
    fs::write(&file, "function f(p) { p.push(10) }\n").unwrap();
    fs::write(&config, r#"{ "strategy": "refined" }"#).unwrap();

    let config_arg = config.to_string_lossy().to_string();
    let output = Command::new(env!("CARGO_BIN_EXE_paraminfer"))
        .args(["--config", config_arg.as_str(), "infer"])
        .arg(&file)
        .args(["--strategy", "baseline"])
        .output()
        .expect("Failed to run paraminfer infer");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("f(p: { push: (arg0: number) => any; })"), "{}", stdout);
}

#[test]
fn test_parse_failure_sets_exit_code() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("bad.ts"), "function f(p { p.x").unwrap();
    fs::write(dir.path().join("good.ts"), "function g(s) { return s.length }\n").unwrap();

    let output = run_infer(&[], dir.path());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Expected non-zero exit code for a parse failure");
    assert!(stderr.contains("Parse error"), "{}", stderr);
    assert!(stdout.contains("g(s: { length: any; })"), "{}", stdout);
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("options.json");
    fs::write(&config, r#"{ "max_depth": 0 }"#).unwrap();

    let config_arg = config.to_string_lossy().to_string();
    let output = run_infer(&["--config", config_arg.as_str()], dir.path());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to load config"));
}
