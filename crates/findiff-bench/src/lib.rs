//! # findiff-bench
//!
//! Verification and bandwidth driver for the `findiff-core` derivative
//! kernels. For each axis it synthesises a cosine test field, runs the small
//! and large pencil kernels on the selected backend, times repeated
//! invocations and compares the result with the analytic derivative.
//!
//! The `findiff` binary wraps this library; see `findiff --help`.

pub mod driver;
pub mod error;
pub mod report;
pub mod settings;
pub mod timing;
pub mod verify;

pub use driver::{Driver, RunRecord};
pub use error::{BenchError, BenchResult};
pub use settings::{AxisSelection, BackendKind, Overrides, RunSettings, Settings};
