pub mod account;
pub mod paths;

/// Effective uid of the current process.
#[cfg(unix)]
pub fn current_uid() -> u32 {
  rustix::process::geteuid().as_raw()
}

/// Effective uid of the current process.
///
/// Non-unix hosts have no uid concept; report the build default.
#[cfg(not(unix))]
pub fn current_uid() -> u32 {
  crate::consts::DEFAULT_IMAGE_USER
}

/// Returns true when running with root privileges.
pub fn is_elevated() -> bool {
  current_uid() == 0
}

/// Returns true if this process may run a child under `uid`.
///
/// Switching identity needs root; running as our own uid never does.
pub fn can_run_as(uid: u32) -> bool {
  is_elevated() || uid == current_uid()
}
