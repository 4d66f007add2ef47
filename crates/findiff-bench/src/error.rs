//! Error types for the findiff driver.

use thiserror::Error;

/// Driver result type alias.
pub type BenchResult<T> = Result<T, BenchError>;

/// Driver error type.
#[derive(Error, Debug)]
pub enum BenchError {
    /// Kernel configuration or execution error.
    #[error(transparent)]
    Core(#[from] findiff_core::FinDiffError),

    /// IO error while reading configuration or writing reports.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration file.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Report serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid command-line or configuration option.
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// Feature not available.
    #[error("Feature not available: {0}. Enable with --features {1}")]
    FeatureNotAvailable(String, String),

    /// A derivative missed its error tolerance.
    #[error("{kernel}: RMS error {rms:.3e} exceeds tolerance {tolerance:.1e}")]
    ToleranceExceeded {
        /// Kernel name.
        kernel: String,
        /// Measured RMS error.
        rms: f64,
        /// Accepted RMS error.
        tolerance: f64,
    },
}

impl From<findiff_core::ConfigError> for BenchError {
    fn from(e: findiff_core::ConfigError) -> Self {
        BenchError::Core(e.into())
    }
}

impl From<toml::de::Error> for BenchError {
    fn from(e: toml::de::Error) -> Self {
        BenchError::Config(e.to_string())
    }
}
