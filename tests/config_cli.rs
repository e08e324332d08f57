use predicates::str::{contains, diff};
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

fn write_temp_config(contents: &str, extension: &str) -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should be available")
        .as_nanos();
    path.push(format!("sysdesign-config-{}.{}", nanos, extension));
    fs::write(&path, contents).expect("config write should succeed");
    path
}

#[test]
fn show_config_prints_resolved_scenario() {
    let config = r#"
challenge = "c1"
faults = ["az-down"]
components = [
  { id = "gw", type_id = "api-gateway", params = { replicas = 3 } },
  { id = "app", type_id = "web" },
]
connections = [{ id = "e1", from = "gw", to = "app" }]
"#;
    let path = write_temp_config(config, "toml");

    let expected = concat!(
        "Challenge: c1 (Design image sharing for 2M DAU)\n",
        "SLA: p95 <= 200ms, availability >= 99.900%\n",
        "Budget: $3000.00/month\n",
        "Traffic: 15000 rps (read ratio 0.8, peak x1)\n",
        "Latency model: dominant-path\n",
        "Components:\n",
        "- gw (api-gateway; replicas=3)\n",
        "- app (web)\n",
        "Connections:\n",
        "- e1: gw -> app\n",
        "Faults: az-down, disk-full\n",
    );
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("sysdesign-sim");
    cmd.args([
        "show-config",
        "--config",
        path.to_str().unwrap(),
        "--fault",
        "disk-full",
    ]);
    cmd.assert().success().stdout(diff(expected));
}

#[test]
fn json_config_runs_with_challenge_override() {
    let config = r#"{
  "challenge": "c1",
  "components": [
    { "id": "gw", "type_id": "api-gateway" },
    { "id": "app", "type_id": "web" },
    { "id": "db", "type_id": "db" }
  ],
  "connections": [
    { "id": "e1", "from": "gw", "to": "app" },
    { "id": "e2", "from": "app", "to": "db" }
  ]
}"#;
    let path = write_temp_config(config, "json");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("sysdesign-sim");
    cmd.args([
        "run",
        "--config",
        path.to_str().unwrap(),
        "--challenge",
        "c2",
        "--format",
        "summary",
    ]);
    cmd.assert()
        .success()
        .stdout(contains("challenge: c2\n"))
        .stdout(contains("main_path: gw -> app -> db\n"));
}

#[test]
fn design_warnings_do_not_fail_the_run() {
    let config = r#"
challenge = "c1"
components = [
  { id = "gw", type_id = "api-gateway" },
  { id = "x", type_id = "quantum-router" },
]
connections = [
  { id = "e1", from = "gw", to = "ghost" },
  { id = "e2", from = "gw", to = "x" },
]
"#;
    let path = write_temp_config(config, "toml");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("sysdesign-sim");
    cmd.args(["run", "--config", path.to_str().unwrap()]);
    cmd.assert()
        .success()
        .stdout(contains("main_path: gw\n"))
        .stdout(contains("- component 'x' has unknown type 'quantum-router'\n"))
        .stdout(contains("- connection 'e1' references missing component 'ghost'\n"));
}

#[test]
fn local_feedback_provider_is_reported_as_supplementary() {
    let config = r#"
challenge = "c1"
components = [{ id = "gw", type_id = "api-gateway" }]

[feedback]
provider = "local"
"#;
    let path = write_temp_config(config, "toml");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("sysdesign-sim");
    cmd.args(["run", "--config", path.to_str().unwrap(), "--format", "json"]);
    let output = cmd.output().expect("command should run");
    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(json["supplementary_feedback_available"], true);
    assert!(json.get("local_summary").is_none());

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("sysdesign-sim");
    cmd.args([
        "run",
        "--config",
        path.to_str().unwrap(),
        "--format",
        "json",
        "--no-feedback",
    ]);
    let output = cmd.output().expect("command should run");
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(json["supplementary_feedback_available"], false);
    assert!(json.get("local_summary").is_some());
}
