//! Build plan execution.
//!
//! The [`Executor`] walks a [`BuildPlan`] step by step against a
//! [`WorkingImage`]. It never reorders steps and stops at the first failure:
//! a checksum mismatch means no script runs, a failed package install means
//! nothing is fetched, and a failed script means no later script runs.
//!
//! Side effects go through four collaborators so the state machine can be
//! driven without a network, a package manager or root privileges:
//! - [`ArtifactFetcher`] for downloads
//! - [`PackageManager`] for OS packages
//! - [`ScriptRunner`] for package scripts
//! - [`ImageCommitter`] for the final metadata

pub mod actions;
pub mod commit;
pub mod types;

use tracing::{debug, error, info};

use crate::plan::{BuildPlan, PlanStep};

pub use actions::cmd::{CommandPackageManager, PackageManager, ScriptRunner, ShellScriptRunner};
pub use actions::fetch::{ArtifactFetcher, HttpFetcher, TransportError, fetch_artifact};
pub use commit::{ImageCommitter, JsonImageCommitter};
pub use types::{BuildState, CommandOutcome, ExecuteError, FinalImage, WorkingImage};

/// Drives a build plan through its states.
///
/// An executor runs one plan. Its state only moves forward through
/// [`BuildState`], ending in `Done` or `Failed`.
pub struct Executor<F, P, S, C> {
  fetcher: F,
  packages: P,
  scripts: S,
  committer: C,
  state: BuildState,
}

impl<F, P, S, C> Executor<F, P, S, C>
where
  F: ArtifactFetcher,
  P: PackageManager,
  S: ScriptRunner,
  C: ImageCommitter,
{
  pub fn new(fetcher: F, packages: P, scripts: S, committer: C) -> Self {
    Self {
      fetcher,
      packages,
      scripts,
      committer,
      state: BuildState::Init,
    }
  }

  pub fn state(&self) -> BuildState {
    self.state
  }

  /// Execute every step of `plan` in order.
  ///
  /// On failure the executor is left in [`BuildState::Failed`] and the error
  /// of the failing step is returned.
  pub async fn execute(&mut self, plan: &BuildPlan, image: &WorkingImage) -> Result<FinalImage, ExecuteError> {
    if self.state.is_terminal() {
      return Err(ExecuteError::InvalidPlan(format!(
        "executor already ran (state: {})",
        self.state
      )));
    }

    info!(base = %plan.base_image, steps = plan.steps.len(), "starting build");

    let result = match check_order(plan) {
      Ok(()) => self.run(plan, image).await,
      Err(e) => Err(e),
    };

    match result {
      Ok(final_image) => {
        self.enter(BuildState::Done)?;
        info!(image = %final_image.metadata.reference(), "build complete");
        Ok(final_image)
      }
      Err(e) => {
        error!(state = %self.state, error = %e, "build failed");
        self.state = BuildState::Failed;
        Err(e)
      }
    }
  }

  async fn run(&mut self, plan: &BuildPlan, image: &WorkingImage) -> Result<FinalImage, ExecuteError> {
    let mut committed = None;

    for (index, step) in plan.steps.iter().enumerate() {
      debug!(step = index, "{step}");

      match step {
        PlanStep::InstallOsPackages { names, repos } => {
          self.enter(BuildState::InstallingPackages)?;
          let outcome = self.packages.install(image, names, repos).await?;
          if !outcome.success() {
            if !outcome.stderr.is_empty() {
              error!(stderr = %outcome.stderr, "package manager output");
            }
            return Err(ExecuteError::PackageInstall {
              packages: names.join(" "),
              code: outcome.code,
            });
          }
        }
        PlanStep::FetchArtifact(fetch) => {
          self.enter(BuildState::FetchingArtifacts)?;
          fetch_artifact(&self.fetcher, fetch).await?;
        }
        PlanStep::RunScript(script) => {
          self.enter(BuildState::RunningScripts)?;
          let outcome = self.scripts.run(image, script).await?;
          if !outcome.success() {
            if !outcome.stderr.is_empty() {
              error!(package = %script.package, stderr = %outcome.stderr, "script output");
            }
            return Err(ExecuteError::ScriptExecution {
              package: script.package.clone(),
              exec: script.exec.clone(),
              code: outcome.code,
            });
          }
        }
        PlanStep::ApplyMetadata(metadata) => {
          self.enter(BuildState::ApplyingMetadata)?;
          committed = Some(self.committer.commit(image, metadata)?);
        }
      }
    }

    committed.ok_or_else(|| ExecuteError::InvalidPlan("plan has no metadata step".to_string()))
  }

  fn enter(&mut self, next: BuildState) -> Result<(), ExecuteError> {
    if next < self.state {
      return Err(ExecuteError::InvalidPlan(format!(
        "{next} step after {}",
        self.state
      )));
    }
    if next != self.state {
      info!(from = %self.state, to = %next, "build state");
      self.state = next;
    }
    Ok(())
  }
}

fn state_of(step: &PlanStep) -> BuildState {
  match step {
    PlanStep::InstallOsPackages { .. } => BuildState::InstallingPackages,
    PlanStep::FetchArtifact(_) => BuildState::FetchingArtifacts,
    PlanStep::RunScript(_) => BuildState::RunningScripts,
    PlanStep::ApplyMetadata(_) => BuildState::ApplyingMetadata,
  }
}

/// Reject a plan the state machine could not finish, before any step runs.
///
/// Steps must be grouped by state in [`BuildState`] order, with at most one
/// package install and exactly one metadata step at the end.
pub fn check_order(plan: &BuildPlan) -> Result<(), ExecuteError> {
  let invalid = |message: String| Err(ExecuteError::InvalidPlan(message));
  let mut current = BuildState::Init;
  let mut installs = 0;

  for (index, step) in plan.steps.iter().enumerate() {
    let next = state_of(step);
    if next < current {
      return invalid(format!("step {index}: {next} step after {current}"));
    }
    if current == BuildState::ApplyingMetadata {
      return invalid(format!("step {index} follows the metadata step"));
    }
    if next == BuildState::InstallingPackages {
      installs += 1;
      if installs > 1 {
        return invalid(format!("step {index}: more than one package install step"));
      }
    }
    current = next;
  }

  if current != BuildState::ApplyingMetadata {
    return invalid("plan has no metadata step".to_string());
  }
  Ok(())
}
