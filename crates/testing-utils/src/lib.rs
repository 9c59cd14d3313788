//! # Pipeline Testing Utils
//!
//! Shared testing utilities for the e2e pipeline workspace.
//!
//! - **Fake CI provider**: in-memory pipelines, workflows, job snapshots, tests and artifacts
//! - **Fake code host**: in-memory PR comments, commit lookups and commit statuses
//! - **Builders**: small constructors for jobs, test results and artifacts
//!
//! ```toml
//! [dev-dependencies]
//! pipeline-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod mocks;

pub use builders::*;
pub use mocks::*;
