#![forbid(unsafe_code)]

//! Regression-test driver for an external graph-layout tool.
//!
//! Design goals:
//! - bit-for-bit reproduction of the reference corpus's output naming
//! - deterministic, single-pass, sequential execution (CI-gated batch tool)
//! - per-subtest failure isolation: one crash or diff never aborts the run

pub mod compare;
pub mod config;
pub mod error;
pub mod harness;
pub mod naming;
pub mod report;
pub mod runner;
pub mod skip;
pub mod spec;

pub use config::{BuildContext, Platform, RunMode, Settings};
pub use error::{Error, Result};
pub use harness::{Harness, RunCounts};
pub use spec::{Subtest, Test};
