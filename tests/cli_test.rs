use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::tempdir;

// Helper function to run the CLI command and capture output
fn run_command(args: &[&str]) -> (bool, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_conductor"))
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute conductor command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    (output.status.success(), stdout, stderr)
}

// Helper function to answer the interactive prompts through stdin
fn run_with_input(args: &[&str], input: &str) -> (bool, String, String) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_conductor"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn conductor command");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(input.as_bytes())
        .expect("Failed to write answers");

    let output = child.wait_with_output().expect("Failed to wait for conductor");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    (output.status.success(), stdout, stderr)
}

// Helper function to write a config whose simulated drones fly fast
fn fast_config(dir: &std::path::Path, extra: &str) -> String {
    let path = dir.join("conductor.toml");
    let content = format!(
        r#"
[swarm]
poll_interval_ms = 2
wait_timeout_ms = 20000

[simulation]
use_sim_time = true
time_scale = 200.0
{}
"#,
        extra
    );
    fs::write(&path, content).expect("Failed to write test config file");
    path.to_str().unwrap().to_string()
}

#[test]
fn test_help_command() {
    let (success, stdout, stderr) = run_command(&["--help"]);
    assert!(success, "Help command failed: {}", stderr);
    assert!(
        stdout.contains("Conductor - synchronized formation flight for drone swarms"),
        "Help output doesn't contain expected text"
    );
    assert!(stdout.contains("plan"));
    assert!(stdout.contains("--namespaces"));
}

#[test]
fn test_plan_prints_default_mission() {
    let (success, stdout, stderr) = run_command(&["plan"]);
    assert!(success, "Plan command failed: {}", stderr);

    let plan: serde_json::Value = serde_json::from_str(&stdout).expect("plan is JSON");
    let agents = plan.as_array().unwrap();
    assert_eq!(agents.len(), 3);
    assert_eq!(agents[0]["namespace"], "drone0");
    assert_eq!(agents[2]["index"], 2);
    let first = &agents[0]["waypoints"][0];
    assert_eq!(first["x"], -1.0);
    assert_eq!(first["y"], 1.0);
    assert_eq!(first["z"], 1.0);
    for agent in agents {
        assert_eq!(agent["waypoints"].as_array().unwrap().len(), 4);
    }
}

#[test]
fn test_plan_uses_namespaces_and_stages_from_config() {
    let dir = tempdir().unwrap();
    let config = fast_config(
        dir.path(),
        r#"
[[choreography.stages]]
altitude = 1.0
formation = { kind = "triangle", base = 2.0, height = 2.0 }

[[choreography.stages]]
altitude = 2.0
formation = { kind = "line", length = 3.0, orientation = 90.0 }
"#,
    );
    let (success, stdout, stderr) =
        run_command(&["-c", config.as_str(), "-n", "cf1,cf2", "plan"]);
    assert!(success, "Plan command failed: {}", stderr);

    let plan: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let agents = plan.as_array().unwrap();
    assert_eq!(agents.len(), 2);
    assert_eq!(agents[1]["namespace"], "cf2");
    assert_eq!(agents[1]["waypoints"].as_array().unwrap().len(), 7);
    assert_eq!(agents[1]["waypoints"][3]["z"], 2.0);
}

#[test]
fn test_invalid_config_fails() {
    let dir = tempdir().unwrap();
    let config = fast_config(dir.path(), "[motion]\nspeed = 0.0\n");
    let (success, _, stderr) = run_command(&["-c", config.as_str(), "plan"]);
    assert!(!success);
    assert!(stderr.contains("motion.speed"), "stderr: {}", stderr);

    let (success, _, stderr) = run_command(&["-c", "/nonexistent/conductor.toml", "plan"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_declining_takeoff_only_shuts_down() {
    let dir = tempdir().unwrap();
    let config = fast_config(dir.path(), "");
    let (success, stdout, stderr) = run_with_input(&["-c", config.as_str()], "n\n");
    assert!(success, "Fly command failed: {}", stderr);
    assert!(stdout.contains("Takeoff? (y/n)"));
    assert!(!stdout.contains("Go to?"));
    assert!(stdout.contains("Shutdown"));
    assert!(!stderr.contains("Taking off"));
}

#[test]
fn test_interactive_mission_with_replay() {
    let dir = tempdir().unwrap();
    let config = fast_config(dir.path(), "");
    let (success, stdout, stderr) =
        run_with_input(&["-c", config.as_str(), "fly"], "y\ny\ny\nn\ny\n");
    assert!(success, "Fly command failed: {}", stderr);
    assert_eq!(stdout.matches("Replay?").count(), 2);
    assert_eq!(stderr.matches("Choreography complete").count(), 2);
    assert!(stderr.contains("Landing"));
    assert!(stderr.contains("Mission complete"));
}

#[test]
fn test_scripted_mission() {
    let dir = tempdir().unwrap();
    let config = fast_config(dir.path(), "");
    let (success, stdout, stderr) = run_command(&[
        "-c",
        config.as_str(),
        "--namespaces",
        "a,b,c,d",
        "fly",
        "--yes",
        "--replays",
        "1",
    ]);
    assert!(success, "Fly command failed: {}", stderr);
    assert!(stdout.contains("Takeoff? (y/n): y"));
    assert!(stdout.contains("Replay? (y/n): n"));
    assert_eq!(stderr.matches("Choreography complete").count(), 2);
    assert!(stderr.contains("Swarm: a, b, c, d"));
    assert!(stderr.contains("Mission complete"));
}
