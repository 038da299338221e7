//! Plan command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn plan_lists_steps_in_order() {
  let env = TestEnv::from_fixture("eap.yaml");
  env.eap_packages();

  env
    .dockyard_cmd()
    .arg("plan")
    .arg(&env.manifest_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("install hostname unzip"))
    .stdout(predicate::str::contains("run os-eap64-launch/configure as 185"))
    .stdout(predicate::str::contains("apply metadata (5 labels, 1 env, 2 ports)"));
}

#[test]
fn plan_json_is_machine_readable() {
  let env = TestEnv::from_fixture("eap.yaml");
  env.eap_packages();

  let output = env
    .dockyard_cmd()
    .args(["plan", "--format", "json"])
    .arg(&env.manifest_path)
    .output()
    .unwrap();
  assert!(output.status.success());

  let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let kinds: Vec<&str> = plan["steps"]
    .as_array()
    .unwrap()
    .iter()
    .map(|s| s["kind"].as_str().unwrap())
    .collect();
  assert_eq!(
    kinds,
    vec!["install_os_packages", "run_script", "run_script", "run_script", "apply_metadata"]
  );

  let metadata = &plan["steps"][4];
  assert_eq!(metadata["ports"], serde_json::json!([8443, 8778]));
  assert_eq!(metadata["user"], 185);
  assert!(metadata["env"].get("OPENSHIFT_KUBE_PING_NAMESPACE").is_none());
  assert_eq!(
    metadata["labels"]["io.k8s.description"],
    "Platform for building and running JavaEE applications on JBoss EAP 6.4"
  );
}

#[test]
fn plan_fails_for_unknown_package() {
  let env = TestEnv::from_fixture("eap.yaml");
  env.package("os-java-jolokia", &[("prepare.sh", "true\n"), ("configure", "true\n")]);

  env
    .dockyard_cmd()
    .arg("plan")
    .arg(&env.manifest_path)
    .assert()
    .failure()
    .stderr(predicate::str::contains("os-eap64-launch"));
}

#[test]
fn plan_honors_packages_dir_flag() {
  let env = TestEnv::from_fixture("scripts_only.yaml");
  env.write_file("elsewhere/app-setup/configure", "true\n");
  env.write_file("elsewhere/app-finish/finish.sh", "true\n");

  env
    .dockyard_cmd()
    .arg("plan")
    .arg(&env.manifest_path)
    .arg("--packages-dir")
    .arg(env.temp.path().join("elsewhere"))
    .assert()
    .success()
    .stdout(predicate::str::contains("run app-finish/finish.sh"));
}
