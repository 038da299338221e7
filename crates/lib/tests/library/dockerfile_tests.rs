//! Dockerfile rendering from manifests on disk.

use dockyard_lib::dockerfile::render;
use dockyard_lib::pipeline::prepare;

use super::common::{Workspace, params};

const MANIFEST: &str = r#"
name: eap64-openshift
version: 1.4
description: Platform for building and running JavaEE applications
from: "{{FROM:rhel:7}}"
user: 185
volumes:
  - /opt/eap/standalone/data
cmd:
  - /opt/eap/bin/openshift-launch.sh
scripts:
  - package: os-eap64-launch
    user: 0
"#;

fn workspace() -> Workspace {
  let ws = Workspace::new(MANIFEST);
  ws.package("os-eap64-launch", &[("configure", "true\n")]);
  ws
}

#[test]
fn parameter_default_selects_base_image() {
  let ws = workspace();
  let (_, plan) = prepare(&ws.manifest, &params(&[]), &ws.config).unwrap();
  assert!(render(&plan).starts_with("FROM rhel:7\n"));
}

#[test]
fn parameter_overrides_base_image() {
  let ws = workspace();
  let (_, plan) = prepare(&ws.manifest, &params(&[("FROM", "centos:7")]), &ws.config).unwrap();
  assert!(render(&plan).starts_with("FROM centos:7\n"));
}

#[test]
fn descriptor_fields_become_instructions() {
  let ws = workspace();
  let (_, plan) = prepare(&ws.manifest, &params(&[]), &ws.config).unwrap();
  let dockerfile = render(&plan);

  assert!(dockerfile.contains("description=\"Platform for building and running JavaEE applications\""));
  assert!(dockerfile.contains("version=\"1.4\""));
  assert!(dockerfile.contains("USER 0\nWORKDIR /tmp/scripts/os-eap64-launch\n"));
  assert!(dockerfile.contains("VOLUME [\"/opt/eap/standalone/data\"]"));
  assert!(dockerfile.ends_with("USER 185\nCMD [\"/opt/eap/bin/openshift-launch.sh\"]\n"));
}
