//! Side-effecting build steps.
//!
//! - [`fetch`]: artifact download and checksum verification
//! - [`cmd`]: package manager and script processes

pub mod cmd;
pub mod fetch;
