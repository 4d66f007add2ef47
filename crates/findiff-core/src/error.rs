//! Error types for derivative configuration and execution.

use thiserror::Error;

use crate::domain::{Dimension, Domain};

/// Fatal configuration errors, raised before any kernel is invoked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A domain extent is not an integral multiple of a tiling granularity.
    #[error(
        "'{dimension}' = {size} must be an integral multiple of {multiple} (pencil width {pencil_width})"
    )]
    NotMultiple {
        /// Offending extent.
        dimension: Dimension,
        /// Its size.
        size: usize,
        /// Required divisor.
        multiple: usize,
        /// Pencil width of the geometry being derived.
        pencil_width: u32,
    },

    /// A domain extent is too short for the halo or group layout.
    #[error("'{dimension}' = {size} is too short for pencil width {pencil_width} (minimum {minimum})")]
    TooShort {
        /// Offending extent.
        dimension: Dimension,
        /// Its size.
        size: usize,
        /// Smallest accepted size.
        minimum: usize,
        /// Pencil width of the geometry being derived.
        pencil_width: u32,
    },

    /// Pencil width other than the small or large tiling granularity.
    #[error("unsupported pencil width {0} (expected 4 or 32)")]
    UnsupportedPencilWidth(u32),

    /// Geometry does not fit the execution target.
    #[error("{kernel}: {resource} of {required} exceeds the device limit of {limit}")]
    ExceedsDeviceLimit {
        /// Kernel name.
        kernel: String,
        /// Limited resource.
        resource: &'static str,
        /// Amount the geometry needs.
        required: usize,
        /// Amount the device offers.
        limit: usize,
    },
}

/// Errors surfaced by kernel execution and backends.
#[derive(Error, Debug)]
pub enum FinDiffError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Field domain does not match the kernel's domain.
    #[error("field domain {actual} does not match kernel domain {expected}")]
    ShapeMismatch {
        /// Domain the kernel was configured for.
        expected: Domain,
        /// Domain of the supplied field.
        actual: Domain,
    },

    /// Sample buffer length does not match the domain.
    #[error("buffer holds {actual} samples, domain requires {expected}")]
    LengthMismatch {
        /// Samples required by the domain.
        expected: usize,
        /// Samples supplied.
        actual: usize,
    },

    /// Device initialisation or query failure.
    #[error("device error: {0}")]
    Device(String),

    /// Kernel source failed to compile.
    #[error("kernel compile error: {0}")]
    Compile(String),

    /// Kernel launch failure.
    #[error("kernel launch error: {0}")]
    Launch(String),

    /// Device memory failure.
    #[error("device memory error: {0}")]
    Memory(String),
}

/// Result type for findiff operations.
pub type Result<T> = std::result::Result<T, FinDiffError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_multiple_names_dimension_and_width() {
        let err = ConfigError::NotMultiple {
            dimension: Dimension::My,
            size: 48,
            multiple: 32,
            pencil_width: 32,
        };
        let msg = err.to_string();
        assert!(msg.contains("'my' = 48"));
        assert!(msg.contains("pencil width 32"));
    }

    #[test]
    fn test_config_error_converts() {
        let err: FinDiffError = ConfigError::UnsupportedPencilWidth(8).into();
        assert!(matches!(err, FinDiffError::Config(_)));
        assert!(err.to_string().contains("unsupported pencil width 8"));
    }
}
