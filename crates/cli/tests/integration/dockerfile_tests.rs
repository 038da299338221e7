//! Dockerfile command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn dockerfile_to_stdout() {
  let env = TestEnv::from_fixture("eap.yaml");
  env.eap_packages();

  env
    .dockyard_cmd()
    .arg("dockerfile")
    .arg(&env.manifest_path)
    .assert()
    .success()
    .stdout(predicate::str::starts_with("FROM jboss-eap-6/eap64:6.4\n"))
    .stdout(predicate::str::contains("EXPOSE 8443\nEXPOSE 8778\n"))
    .stdout(predicate::str::contains("rpm -q 'hostname' 'unzip'"))
    .stdout(predicate::str::contains("USER 185\nCMD [\"/opt/eap/bin/openshift-launch.sh\"]"));
}

#[test]
fn dockerfile_to_file() {
  let env = TestEnv::from_fixture("eap.yaml");
  env.eap_packages();
  let target = env.temp.path().join("Dockerfile");

  env
    .dockyard_cmd()
    .args(["--param", "FROM=centos:7", "dockerfile"])
    .arg(&env.manifest_path)
    .arg("--output")
    .arg(&target)
    .assert()
    .success()
    .stdout(predicate::str::contains("Wrote"));

  let content = std::fs::read_to_string(&target).unwrap();
  assert!(content.starts_with("FROM centos:7\n"));
}

#[test]
fn dockerfile_enables_repo_files() {
  let env = TestEnv::from_fixture("eap.yaml");
  env.eap_packages();
  env.write_file("repos/jboss-ocp.repo", "[jboss-ocp]\n");

  env
    .dockyard_cmd()
    .arg("dockerfile")
    .arg(&env.manifest_path)
    .arg("--repo-files-dir")
    .arg(env.temp.path().join("repos"))
    .assert()
    .success()
    .stdout(predicate::str::contains("COPY repos/jboss-ocp.repo /etc/yum.repos.d/\n"))
    .stdout(predicate::str::contains("--enablerepo='jboss-ocp' 'hostname' 'unzip'"));
}
