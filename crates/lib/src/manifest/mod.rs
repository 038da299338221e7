//! Image manifest loading.
//!
//! A manifest is the YAML document that declares the desired image. Loading
//! turns it into an immutable [`ImageDescriptor`] or fails before any package
//! or artifact is touched.

mod load;
pub mod overrides;
pub mod params;
mod types;

pub use load::{
  LoadError, REQUIRED_FIELDS, is_bundle_relative, load_file, load_file_with_overrides, load_str, load_str_with_overrides,
};
pub use types::*;
