//! Integration tests for dockyard-lib.

mod dockerfile_tests;
mod pipeline_tests;
