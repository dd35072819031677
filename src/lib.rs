#![forbid(unsafe_code)]
//! Export/install verification for libevent's CMake packaging metadata.
//!
//! The tool rebuilds a tiny probe project against individual `find_package`
//! components of the library and asserts which link/code component
//! combinations build and run, across three package-discovery scenarios:
//! the build tree, a system-wide install, and a temporary-directory install.
//!
//! Execution is strictly sequential: one build-tool subprocess at a time,
//! no timeouts. All scenario state (prefix path, library search path,
//! package-config file location) is carried as explicit values and applied
//! per child-process invocation; the tool never mutates its own
//! environment.
//!
//! ## Panic Policy
//!
//! Production code uses `Result` with `?`; the `cli` module enforces
//! `#![deny(clippy::unwrap_used)]`. `.unwrap()` is acceptable in tests.

pub mod check;
pub mod cli;
pub mod cmake;
pub mod component;
pub mod scenario;

pub use check::{check, ConsoleReporter, Reporter, RunSummary, Runner};
pub use cmake::{BuildTool, CmakeCli, CmakeError, ToolEnv};
pub use component::{Component, LinkCase, LinkType, Outcome, LINK_MATRIX};
pub use scenario::{Dirs, Scenario, ScenarioEnv, ScenarioKind};
