//! Build command integration tests.
//!
//! Builds run real scripts with `/bin/sh` and a no-op package manager.

use predicates::prelude::*;

use super::common::TestEnv;

fn scripted_env(setup: &str) -> TestEnv {
  let env = TestEnv::from_fixture("scripts_only.yaml");
  env.package("app-setup", &[("configure", setup)]);
  env.package(
    "app-finish",
    &[("finish.sh", "echo finished >> \"$DOCKYARD_ROOTFS/steps\"\n")],
  );
  env
}

#[test]
fn build_runs_scripts_and_writes_config() {
  let env = scripted_env("echo setup >> \"$DOCKYARD_ROOTFS/steps\"\n");

  env
    .dockyard_cmd()
    .arg("build")
    .arg(&env.manifest_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("Built scripted-app:2.0"))
    .stdout(predicate::str::contains("8080"));

  let work = env.work_path();
  let steps = std::fs::read_to_string(work.join("rootfs").join("steps")).unwrap();
  assert_eq!(steps, "setup\nfinished\n");

  let config: serde_json::Value =
    serde_json::from_str(&std::fs::read_to_string(work.join("image.json")).unwrap()).unwrap();
  assert_eq!(config["config"]["Env"], serde_json::json!(["APP_MODE=production"]));
  assert_eq!(config["config"]["User"], "0");
}

#[test]
fn build_stops_at_failing_script() {
  let env = scripted_env("exit 4\n");

  env
    .dockyard_cmd()
    .arg("build")
    .arg(&env.manifest_path)
    .assert()
    .failure()
    .stderr(predicate::str::contains("app-setup/configure"));

  assert!(!env.work_path().join("rootfs").join("steps").exists());
  assert!(!env.work_path().join("image.json").exists());
}

#[test]
fn build_respects_work_dir_flag() {
  let env = scripted_env("true\n");
  let custom = env.temp.path().join("custom-work");

  env
    .dockyard_cmd()
    .arg("build")
    .arg(&env.manifest_path)
    .arg("--work-dir")
    .arg(&custom)
    .assert()
    .success();

  assert!(custom.join("image.json").is_file());
}

#[test]
fn build_json_reports_final_image() {
  let env = scripted_env("true\n");

  let output = env
    .dockyard_cmd()
    .args(["build", "--format", "json"])
    .arg(&env.manifest_path)
    .output()
    .unwrap();
  assert!(output.status.success());

  let image: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(image["base_image"], "centos:7");
  assert_eq!(image["metadata"]["ports"], serde_json::json!([8080]));
}
