use predicates::str::{contains, diff};
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

const SINGLE_GATEWAY: &str = r#"
components = [{ id = "gw", type_id = "api-gateway" }]

[challenge]
id = "scenario-a"
title = "Single gateway"
budget = 1000
traffic = { rps = 1000, peak_multiplier = 2.0 }
sla = { max_latency = 200, min_availability = 0.99 }
"#;

fn write_temp_config(contents: &str, extension: &str) -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should be available")
        .as_nanos();
    path.push(format!("sysdesign-smoke-{}.{}", nanos, extension));
    fs::write(&path, contents).expect("config write should succeed");
    path
}

#[test]
fn summary_single_gateway_is_stable() {
    let path = write_temp_config(SINGLE_GATEWAY, "toml");
    let expected = concat!(
        "Metadata:\n",
        "challenge: scenario-a\n",
        "latency_model: dominant-path\n",
        "faults: none\n",
        "main_path: gw\n",
        "Metrics:\n",
        "latency: p50 4.8ms, p95 9.0ms, p99 12.0ms\n",
        "throughput: 1000 rps\n",
        "availability: 99.990%\n",
        "cost: $101.00/month\n",
        "Score: 32/100\n",
        "Violations: 0 | Warnings: 0\n",
    );

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("sysdesign-sim");
    cmd.args(["run", "--config", path.to_str().unwrap(), "--format", "summary"]);
    cmd.assert().success().stdout(diff(expected));
}

#[test]
fn fault_flag_degrades_metrics_without_touching_other_rules() {
    let path = write_temp_config(SINGLE_GATEWAY, "toml");
    let expected = concat!(
        "Metadata:\n",
        "challenge: scenario-a\n",
        "latency_model: dominant-path\n",
        "faults: cache-miss-storm\n",
        "main_path: gw\n",
        "Metrics:\n",
        "latency: p50 9.6ms, p95 18.0ms, p99 24.0ms\n",
        "throughput: 1000 rps\n",
        "availability: 99.990%\n",
        "cost: $121.20/month\n",
        "Score: 32/100\n",
        "Violations: 0 | Warnings: 0\n",
    );

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("sysdesign-sim");
    cmd.args([
        "run",
        "--config",
        path.to_str().unwrap(),
        "--format",
        "summary",
        "--fault",
        "cache-miss-storm",
    ]);
    cmd.assert().success().stdout(diff(expected));
}

#[test]
fn human_output_includes_rubric_and_local_summary() {
    let path = write_temp_config(SINGLE_GATEWAY, "toml");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("sysdesign-sim");
    cmd.args(["run", "--config", path.to_str().unwrap()]);
    cmd.assert()
        .success()
        .stdout(contains(concat!(
            "Feedback:\n",
            "- 1 components placed (+4)\n",
            "- P95 latency 9.0ms meets the 200ms SLA\n",
            "- Availability 99.990% meets the 99.000% SLA\n",
            "- Monthly cost $101.00 is within the $1000.00 budget\n",
            "- Load balancing in place (+3)\n",
        )))
        .stdout(contains("Local summary (grade F):\n"))
        .stdout(contains("- Missing a database layer\n"));
}

#[test]
fn json_output_is_machine_readable() {
    let path = write_temp_config(SINGLE_GATEWAY, "toml");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("sysdesign-sim");
    cmd.args(["run", "--config", path.to_str().unwrap(), "--format", "json"]);
    let output = cmd.output().expect("command should run");
    assert!(output.status.success());

    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(json["score"], 32);
    assert_eq!(json["metrics"]["cost"], 101.0);
    assert_eq!(json["supplementary_feedback_available"], false);
    assert_eq!(json["metadata"]["main_path"][0], "gw");
    assert_eq!(json["local_summary"]["architectureGrade"], "F");
}

#[test]
fn critical_path_model_is_selectable() {
    let config = r#"
challenge = "c1"
latency_model = "critical-path"
components = [
  { id = "gw", type_id = "api-gateway" },
  { id = "app", type_id = "web" },
  { id = "cache", type_id = "cache" },
  { id = "db", type_id = "db" },
]
connections = [
  { id = "e1", from = "gw", to = "cache" },
  { id = "e2", from = "gw", to = "app" },
  { id = "e3", from = "app", to = "db" },
]
"#;
    let path = write_temp_config(config, "toml");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("sysdesign-sim");
    cmd.args(["run", "--config", path.to_str().unwrap(), "--format", "summary"]);
    cmd.assert()
        .success()
        .stdout(contains("latency_model: critical-path\n"))
        .stdout(contains("main_path: gw -> app -> db\n"));
}
