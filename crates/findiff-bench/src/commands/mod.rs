//! CLI command implementations.

pub mod emit;
pub mod info;
pub mod run;

use std::path::Path;

use findiff_bench::{BenchResult, Overrides, Settings};
use findiff_core::DerivativeConfig;

/// Resolve settings and derive the kernel configuration they describe.
///
/// Fails before any kernel runs when the grid violates a tiling constraint.
pub fn prepare(path: Option<&Path>, overrides: &Overrides) -> BenchResult<(Settings, DerivativeConfig)> {
    let settings = Settings::resolve(path, overrides)?;
    let config = DerivativeConfig::new(settings.domain)?;
    Ok((settings, config))
}

/// Error for a CUDA request in a build without the `cuda` feature.
#[cfg(not(feature = "cuda"))]
pub fn cuda_unavailable() -> findiff_bench::BenchError {
    findiff_bench::BenchError::FeatureNotAvailable("CUDA backend".to_string(), "cuda".to_string())
}
