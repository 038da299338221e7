//! End-to-end builds through `pipeline::prepare` and `pipeline::build`.

use dockyard_lib::execute::ExecuteError;
use dockyard_lib::platform;
use dockyard_lib::pipeline::{BuildError, build, prepare};
use dockyard_lib::plan::CompileError;
use dockyard_lib::util::hash::{HashAlgorithm, hash_bytes};

use super::common::{Workspace, params};

const AGENT: &[u8] = b"jolokia-jvm-agent";

const MANIFEST: &str = r#"
name: jolokia-app
version: "1.0"
from: centos:7
envs:
  - name: JOLOKIA_PORT
    value: "8778"
  - name: CLUSTER_NAMESPACE
    example: myproject
    description: Project used for clustering.
ports:
  - value: 8443
  - value: 8778
cmd:
  - /opt/run.sh
packages:
  - unzip
scripts:
  - package: os-java-jolokia
    exec: prepare.sh
  - package: os-java-jolokia
sources:
  - artifact: "{{SERVER}}/jolokia.jar"
    md5: "{{MD5}}"
"#;

const PREPARE: &str = "echo prepare >> \"$DOCKYARD_ROOTFS/log\"\n";
const CONFIGURE: &str = "cp \"$DOCKYARD_ARTIFACTS_DIR/jolokia.jar\" \"$DOCKYARD_ROOTFS/jolokia.jar\"\necho configure >> \"$DOCKYARD_ROOTFS/log\"\n";

fn jolokia_workspace() -> Workspace {
  let ws = Workspace::new(MANIFEST);
  ws.package("os-java-jolokia", &[("prepare.sh", PREPARE), ("configure", CONFIGURE)]);
  ws
}

#[tokio::test]
async fn builds_image_from_manifest() {
  let mut server = mockito::Server::new_async().await;
  let mock = server
    .mock("GET", "/jolokia.jar")
    .with_status(200)
    .with_body(AGENT)
    .create_async()
    .await;

  let ws = jolokia_workspace();
  let md5 = hash_bytes(HashAlgorithm::Md5, AGENT);
  let url = server.url();
  let params = params(&[("SERVER", url.as_str()), ("MD5", md5.as_str())]);

  let (descriptor, plan) = prepare(&ws.manifest, &params, &ws.config).unwrap();
  assert_eq!(descriptor.name, "jolokia-app");

  let image = build(&plan, &ws.config).await.unwrap();
  mock.assert_async().await;

  let rootfs = ws.config.rootfs_dir();
  assert_eq!(std::fs::read_to_string(rootfs.join("log")).unwrap(), "prepare\nconfigure\n");
  assert_eq!(std::fs::read(rootfs.join("jolokia.jar")).unwrap(), AGENT);

  assert_eq!(image.exposed_ports(), &[8443, 8778]);
  assert_eq!(image.metadata.user, 0);
  assert_eq!(image.metadata.env.get("JOLOKIA_PORT").map(String::as_str), Some("8778"));
  assert!(!image.metadata.env.contains_key("CLUSTER_NAMESPACE"));

  let config_path = image.config_path.unwrap();
  let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(config_path).unwrap()).unwrap();
  let ports: Vec<&String> = written["config"]["ExposedPorts"].as_object().unwrap().keys().collect();
  assert_eq!(ports, vec!["8443/tcp", "8778/tcp"]);
  assert_eq!(written["config"]["Env"], serde_json::json!(["JOLOKIA_PORT=8778"]));
  assert_eq!(written["config"]["Labels"]["name"], "jolokia-app");
}

#[tokio::test]
async fn checksum_mismatch_stops_before_scripts() {
  let mut server = mockito::Server::new_async().await;
  let _mock = server
    .mock("GET", "/jolokia.jar")
    .with_status(200)
    .with_body(b"tampered")
    .create_async()
    .await;

  let ws = jolokia_workspace();
  let md5 = hash_bytes(HashAlgorithm::Md5, AGENT);
  let url = server.url();
  let params = params(&[("SERVER", url.as_str()), ("MD5", md5.as_str())]);

  let (_, plan) = prepare(&ws.manifest, &params, &ws.config).unwrap();
  let err = build(&plan, &ws.config).await.unwrap_err();

  match err {
    BuildError::Execute(ExecuteError::ChecksumMismatch { url: failed, expected, .. }) => {
      assert_eq!(failed, format!("{url}/jolokia.jar"));
      assert_eq!(expected, md5);
    }
    other => panic!("expected checksum mismatch, got {other:?}"),
  }
  assert!(!ws.config.rootfs_dir().join("log").exists());
  assert!(!ws.config.image_config_path().exists());
}

#[tokio::test]
async fn failing_script_stops_later_scripts() {
  let ws = Workspace::new(
    r#"
name: app
from: centos:7
cmd: [/bin/true]
scripts:
  - package: first
  - package: second
"#,
  );
  ws.package("first", &[("configure", "exit 2\n")]);
  ws.package("second", &[("configure", "touch \"$DOCKYARD_ROOTFS/second\"\n")]);

  let (_, plan) = prepare(&ws.manifest, &params(&[]), &ws.config).unwrap();
  let err = build(&plan, &ws.config).await.unwrap_err();

  assert!(matches!(
    err,
    BuildError::Execute(ExecuteError::ScriptExecution { ref package, code: Some(2), .. }) if package == "first"
  ));
  assert!(!ws.config.rootfs_dir().join("second").exists());
}

#[tokio::test]
async fn package_manager_failure_aborts_build() {
  let mut ws = Workspace::new(
    r#"
name: app
from: centos:7
cmd: [/bin/true]
packages: [unzip]
scripts:
  - package: only
"#,
  );
  ws.package("only", &[("configure", "touch \"$DOCKYARD_ROOTFS/ran\"\n")]);
  ws.config.package_manager = "false".to_string();

  let (_, plan) = prepare(&ws.manifest, &params(&[]), &ws.config).unwrap();
  let err = build(&plan, &ws.config).await.unwrap_err();

  assert!(matches!(err, BuildError::Execute(ExecuteError::PackageInstall { .. })));
  assert!(!ws.config.rootfs_dir().join("ran").exists());
}

#[test]
fn missing_script_is_reported_at_compile_time() {
  let ws = Workspace::new(
    r#"
name: app
from: centos:7
cmd: [/bin/true]
scripts:
  - package: only
    exec: install.sh
"#,
  );
  ws.package("only", &[("configure", "true\n")]);

  let err = prepare(&ws.manifest, &params(&[]), &ws.config).unwrap_err();
  match err {
    BuildError::Compile(CompileError::MissingScript { package, exec, .. }) => {
      assert_eq!(package, "only");
      assert_eq!(exec, "install.sh");
    }
    other => panic!("expected missing script, got {other:?}"),
  }
}

#[test]
fn missing_parameter_is_a_load_error() {
  let ws = jolokia_workspace();
  let err = prepare(&ws.manifest, &params(&[("MD5", "x")]), &ws.config).unwrap_err();
  assert!(err.to_string().contains("SERVER"));
}

#[tokio::test]
async fn script_runs_as_manifest_user() {
  if !platform::is_elevated() {
    return;
  }
  let ws = Workspace::new(
    r#"
name: app
from: centos:7
cmd: [/bin/true]
scripts:
  - package: as-jboss
    user: 185
"#,
  );
  ws.package("as-jboss", &[("configure", "id -u > \"$DOCKYARD_ROOTFS/uid\"\n")]);
  ws.share_with_all_users();

  let (_, plan) = prepare(&ws.manifest, &params(&[]), &ws.config).unwrap();
  build(&plan, &ws.config).await.unwrap();

  let uid = std::fs::read_to_string(ws.config.rootfs_dir().join("uid")).unwrap();
  assert_eq!(uid.trim(), "185");
}

#[tokio::test]
async fn package_manager_installs_into_rootfs_with_repositories() {
  let mut ws = Workspace::new(
    r#"
name: app
from: centos:7
cmd: [/bin/true]
packages: [unzip]
"#,
  );
  let repos = ws.root.join("repos");
  std::fs::create_dir_all(&repos).unwrap();
  std::fs::write(repos.join("jboss-ocp.repo"), "[jboss-ocp]\n").unwrap();
  ws.config.repo_files_dir = Some(repos);
  ws.config.package_manager = "echo --installroot=#rootfs# > \"$DOCKYARD_ROOTFS/install.log\"".to_string();

  let (_, plan) = prepare(&ws.manifest, &params(&[]), &ws.config).unwrap();
  build(&plan, &ws.config).await.unwrap();

  let rootfs = ws.config.rootfs_dir();
  let log = std::fs::read_to_string(rootfs.join("install.log")).unwrap();
  assert_eq!(
    log.trim(),
    format!("--installroot={} --enablerepo=jboss-ocp unzip", rootfs.display())
  );
  assert!(rootfs.join("etc/yum.repos.d/jboss-ocp.repo").is_file());
}

#[tokio::test]
async fn configured_script_user_is_the_default() {
  if !platform::is_elevated() {
    return;
  }
  let mut ws = Workspace::new(
    r#"
name: app
from: centos:7
cmd: [/bin/true]
scripts:
  - package: default-user
  - package: root-user
    user: 0
"#,
  );
  ws.package("default-user", &[("configure", "id -u > \"$DOCKYARD_ROOTFS/default\"\n")]);
  ws.package("root-user", &[("configure", "id -u > \"$DOCKYARD_ROOTFS/root\"\n")]);
  ws.share_with_all_users();
  ws.config.script_user = Some(185);

  let (_, plan) = prepare(&ws.manifest, &params(&[]), &ws.config).unwrap();
  build(&plan, &ws.config).await.unwrap();

  let rootfs = ws.config.rootfs_dir();
  assert_eq!(std::fs::read_to_string(rootfs.join("default")).unwrap().trim(), "185");
  assert_eq!(std::fs::read_to_string(rootfs.join("root")).unwrap().trim(), "0");
}

#[test]
fn script_outside_bundle_is_rejected_at_load_time() {
  let ws = Workspace::new(
    r#"
name: app
from: centos:7
cmd: [/bin/true]
scripts:
  - package: only
    exec: ../../../etc/hostname
"#,
  );
  ws.package("only", &[("configure", "true\n")]);

  let err = prepare(&ws.manifest, &params(&[]), &ws.config).unwrap_err();
  assert!(matches!(err, BuildError::Load(_)), "got {err:?}");
  assert!(err.to_string().contains("scripts[0].exec"), "got {err}");
}
