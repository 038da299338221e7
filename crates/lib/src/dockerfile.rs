//! Dockerfile rendering.
//!
//! [`render`] emits a Dockerfile that performs the same build as a
//! [`BuildPlan`] when run by a container engine. The build context is
//! expected to hold each fetched artifact under its file name, each package
//! bundle under `scripts/<package>` and each extra repository under
//! `repos/<id>.repo`.

use std::fmt::{self, Write};

use serde_json::Value;

use crate::consts::DEFAULT_IMAGE_USER;
use crate::execute::actions::cmd::shell_quote;
use crate::plan::{BuildPlan, PlanStep};

/// Where bundles are copied inside the image.
pub const SCRIPTS_DIR: &str = "/tmp/scripts";

/// Where artifacts are copied inside the image.
pub const ARTIFACTS_DIR: &str = "/tmp/artifacts";

/// Where extra repositories are installed for the package step.
pub const REPOS_DIR: &str = "/etc/yum.repos.d";

/// Render `plan` as a Dockerfile.
pub fn render(plan: &BuildPlan) -> String {
  let mut out = String::new();
  // Writing into a String cannot fail.
  write_dockerfile(&mut out, plan).ok();
  out
}

/// Write the Dockerfile for `plan` into `out`.
pub fn write_dockerfile(out: &mut impl Write, plan: &BuildPlan) -> fmt::Result {
  let metadata = plan.metadata().cloned().unwrap_or_default();

  writeln!(out, "FROM {}", plan.base_image)?;

  if !metadata.labels.is_empty() {
    write!(out, "\n{}", key_values("LABEL", &metadata.labels))?;
  }

  if !metadata.env.is_empty() {
    write!(out, "\n{}", key_values("ENV", &metadata.env))?;
  }

  if !metadata.ports.is_empty() {
    writeln!(out)?;
    for port in &metadata.ports {
      writeln!(out, "EXPOSE {port}")?;
    }
  }

  let packages = plan.os_packages();
  if !packages.is_empty() {
    let names: Vec<String> = packages.iter().map(|n| shell_quote(n)).collect();
    let names = names.join(" ");
    let repos = plan.repos();

    writeln!(out, "\nUSER root")?;
    for repo in repos {
      writeln!(out, "COPY repos/{} {REPOS_DIR}/", repo.file_name())?;
    }

    let mut install = String::from("yum install -y");
    for repo in repos {
      install.push_str(&format!(" --enablerepo={}", shell_quote(&repo.id)));
    }
    write!(out, "RUN {install} {names} \\\n    && yum clean all \\\n    && rpm -q {names}")?;
    if !repos.is_empty() {
      let files: Vec<String> = repos.iter().map(|r| format!("{REPOS_DIR}/{}", r.file_name())).collect();
      write!(out, " \\\n    && rm -f {}", files.join(" "))?;
    }
    writeln!(out)?;
  }

  let fetches: Vec<_> = plan.fetches().collect();
  if !fetches.is_empty() {
    writeln!(out)?;
    for fetch in &fetches {
      let filename = fetch
        .dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
      writeln!(out, "COPY {filename} {ARTIFACTS_DIR}/")?;
    }
  }

  let mut bundles: Vec<&str> = Vec::new();
  for script in plan.scripts() {
    if !bundles.contains(&script.package.as_str()) {
      bundles.push(&script.package);
    }
  }
  if !bundles.is_empty() {
    writeln!(out)?;
    for package in &bundles {
      writeln!(out, "COPY scripts/{package} {SCRIPTS_DIR}/{package}")?;
    }

    for script in plan.scripts() {
      let path = format!("{SCRIPTS_DIR}/{}/{}", script.package, script.exec);
      writeln!(out, "\n# {}", script.package)?;
      writeln!(out, "USER {}", script.user.unwrap_or(DEFAULT_IMAGE_USER))?;
      writeln!(out, "WORKDIR {SCRIPTS_DIR}/{}", script.package)?;
      writeln!(out, "RUN {}", json_array(&["bash".to_string(), "-x".to_string(), path]))?;
    }
  }

  if !bundles.is_empty() || !fetches.is_empty() {
    writeln!(out, "\nUSER root")?;
    writeln!(out, "RUN rm -rf {SCRIPTS_DIR} {ARTIFACTS_DIR}")?;
  }

  if !metadata.volumes.is_empty() {
    writeln!(out)?;
    for volume in &metadata.volumes {
      writeln!(out, "VOLUME {}", json_array(std::slice::from_ref(volume)))?;
    }
  }

  writeln!(out)?;
  if let Some(workdir) = &metadata.workdir {
    writeln!(out, "WORKDIR {workdir}")?;
  }
  if let Some(entrypoint) = &metadata.entrypoint {
    writeln!(out, "ENTRYPOINT {}", json_array(entrypoint))?;
  }
  writeln!(out, "USER {}", metadata.user)?;
  writeln!(out, "CMD {}", json_array(&metadata.cmd))
}

/// One instruction with a `key="value"` pair per line.
fn key_values<'a>(instruction: &str, pairs: impl IntoIterator<Item = (&'a String, &'a String)>) -> String {
  let indent = " ".repeat(instruction.len() + 1);
  let lines: Vec<String> = pairs
    .into_iter()
    .map(|(k, v)| format!("{k}={}", Value::from(v.as_str())))
    .collect();
  format!("{instruction} {}\n", lines.join(&format!(" \\\n{indent}")))
}

fn json_array(items: &[String]) -> String {
  Value::from(items.to_vec()).to_string()
}
