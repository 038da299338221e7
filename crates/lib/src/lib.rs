//! dockyard-lib: container image builds from declarative manifests.
//!
//! A build runs in three stages:
//! - [`manifest`]: load and validate an image manifest into an `ImageDescriptor`
//! - [`plan`]: resolve packages and compile the descriptor into a `BuildPlan`
//! - [`execute`]: run the plan against a working image and commit its metadata
//!
//! [`pipeline`] chains the three with the default collaborators.

pub mod config;
pub mod consts;
pub mod dockerfile;
pub mod execute;
pub mod manifest;
pub mod pipeline;
pub mod plan;
pub mod platform;
pub mod registry;
pub mod util;
