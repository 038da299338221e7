//! Script and package manager execution.
//!
//! Scripts run with an isolated environment: the caller's variables are
//! cleared and only a fixed set is provided, so a build behaves the same
//! regardless of who starts it.

use std::future::Future;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::consts::ROOTFS_MARKER;
use crate::execute::types::{CommandOutcome, ExecuteError, WorkingImage};
use crate::plan::{RepoFile, RunScript};
use crate::platform;
use crate::platform::account::Account;

/// `PATH` handed to scripts and the package manager.
pub const SCRIPT_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// January 1, 1980 00:00:00 UTC.
const SOURCE_DATE_EPOCH: &str = "315532800";

/// Installs OS packages into the working image.
pub trait PackageManager {
  /// Install `names` with the extra repositories in `repos` enabled.
  fn install(
    &self,
    image: &WorkingImage,
    names: &[String],
    repos: &[RepoFile],
  ) -> impl Future<Output = Result<CommandOutcome, ExecuteError>> + Send;
}

/// Runs a resolved script step against the working image.
pub trait ScriptRunner {
  fn run(&self, image: &WorkingImage, step: &RunScript) -> impl Future<Output = Result<CommandOutcome, ExecuteError>> + Send;
}

/// Package manager invoked as a shell command line with the names appended.
///
/// `#rootfs#` in the command is replaced by the working root filesystem, so
/// the default `yum install -y --installroot=#rootfs#` installs into the image
/// rather than the host. Extra repositories are copied into the image's
/// `etc/yum.repos.d` and enabled by id.
#[derive(Debug, Clone)]
pub struct CommandPackageManager {
  command: String,
  shell: Option<String>,
}

impl CommandPackageManager {
  pub fn new(command: impl Into<String>, shell: Option<String>) -> Self {
    Self {
      command: command.into(),
      shell,
    }
  }

  /// The full command line for `names` installed into `rootfs`.
  pub fn command_line(&self, rootfs: &Path, names: &[String], repos: &[RepoFile]) -> String {
    let root = shell_quote(&rootfs.to_string_lossy());
    let mut line = self.command.replace(ROOTFS_MARKER, &root);
    for repo in repos {
      line.push_str(&format!(" --enablerepo={}", shell_quote(&repo.id)));
    }
    for name in names {
      line.push(' ');
      line.push_str(&shell_quote(name));
    }
    line
  }
}

impl PackageManager for CommandPackageManager {
  fn install(
    &self,
    image: &WorkingImage,
    names: &[String],
    repos: &[RepoFile],
  ) -> impl Future<Output = Result<CommandOutcome, ExecuteError>> + Send {
    let line = self.command_line(&image.rootfs, names, repos);
    let (shell, args) = get_shell(self.shell.as_deref());
    let rootfs = image.rootfs.clone();
    let repos = repos.to_vec();

    async move {
      info!(cmd = %line, "installing packages");
      tokio::fs::create_dir_all(&rootfs).await?;

      if !repos.is_empty() {
        let repos_dir = rootfs.join("etc/yum.repos.d");
        tokio::fs::create_dir_all(&repos_dir).await?;
        for repo in &repos {
          debug!(repo = %repo.id, "enabling repository");
          tokio::fs::copy(&repo.path, repos_dir.join(repo.file_name())).await?;
        }
      }

      let mut command = Command::new(&shell);
      command.args(&args).arg(&line).current_dir(&rootfs);
      isolate(&mut command, &rootfs, "/root");

      let output = command
        .output()
        .await
        .map_err(|source| ExecuteError::PackageManagerSpawn { source })?;
      Ok(outcome(output))
    }
  }
}

/// Runs each script with a POSIX shell from inside its bundle directory.
///
/// Scripts see:
/// - `DOCKYARD_ROOTFS`: the working root filesystem
/// - `DOCKYARD_ARTIFACTS_DIR`: where fetched artifacts live
/// - `DOCKYARD_PACKAGE`: the package the script belongs to
///
/// A step with a user runs under that uid, with the primary group and home
/// of that user in the image (see [`Account::lookup`]). Switching identity
/// needs privileges; without them the step fails before anything is spawned.
#[derive(Debug, Clone, Default)]
pub struct ShellScriptRunner {
  shell: Option<String>,
}

impl ShellScriptRunner {
  pub fn new(shell: Option<String>) -> Self {
    Self { shell }
  }
}

impl ScriptRunner for ShellScriptRunner {
  fn run(&self, image: &WorkingImage, step: &RunScript) -> impl Future<Output = Result<CommandOutcome, ExecuteError>> + Send {
    let (shell, _) = get_shell(self.shell.as_deref());
    let image = image.clone();
    let step = step.clone();

    async move {
      let spawn_error = |source: std::io::Error| ExecuteError::ScriptSpawn {
        package: step.package.clone(),
        exec: step.exec.clone(),
        source,
      };

      if let Some(uid) = step.user
        && !platform::can_run_as(uid)
      {
        return Err(spawn_error(std::io::Error::new(
          std::io::ErrorKind::PermissionDenied,
          format!("cannot switch to uid {uid} without elevated privileges"),
        )));
      }

      info!(package = %step.package, exec = %step.exec, user = ?step.user, "running script");

      let account = step.user.map(|uid| Account::lookup(&image.rootfs, uid));
      let home = account.as_ref().map_or("/root", |a| a.home.as_str());

      let mut command = Command::new(&shell);
      command.arg(step.script_path()).current_dir(&step.bundle);
      isolate(&mut command, &image.rootfs, home);
      command
        .env("DOCKYARD_ARTIFACTS_DIR", &image.artifacts_dir)
        .env("DOCKYARD_PACKAGE", &step.package);

      #[cfg(unix)]
      if let Some(account) = &account {
        command.uid(account.uid).gid(account.gid);
      }

      debug!(shell = %shell, bundle = ?step.bundle, "spawning script");
      let output = command.output().await.map_err(spawn_error)?;
      Ok(outcome(output))
    }
  }
}

fn isolate(command: &mut Command, rootfs: &Path, home: &str) {
  command
    .env_clear()
    .env("PATH", SCRIPT_PATH)
    .env("HOME", home)
    .env("LANG", "C")
    .env("LC_ALL", "C")
    .env("SOURCE_DATE_EPOCH", SOURCE_DATE_EPOCH)
    .env("DOCKYARD_ROOTFS", rootfs)
    .stdin(Stdio::null());
}

fn outcome(output: std::process::Output) -> CommandOutcome {
  let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
  let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

  if !stdout.is_empty() {
    debug!(stdout = %stdout, "command stdout");
  }
  if !stderr.is_empty() {
    debug!(stderr = %stderr, "command stderr");
  }

  CommandOutcome {
    code: output.status.code(),
    stdout,
    stderr,
  }
}

/// Single-quote `value` for a POSIX shell.
pub fn shell_quote(value: &str) -> String {
  format!("'{}'", value.replace('\'', r"'\''"))
}

/// Shell command and the argument that passes it a command string.
///
/// Defaults to `/bin/sh` rather than `$SHELL`, since interactive shells may
/// source profile files that change the environment.
fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  match override_shell {
    Some(shell) => (shell.to_string(), vec!["-c".to_string()]),
    None => ("/bin/sh".to_string(), vec!["-c".to_string()]),
  }
}
