//! # findiff-core
//!
//! First-order spatial derivatives of periodic scalar fields sampled on a
//! regular 3D grid, computed with a radius-4 compact stencil.
//!
//! Each derivative kernel works on *pencils*: 1D strips of grid points along
//! the stencil axis. A work group loads a bundle of pencils into a local
//! [`Tile`], replicates four periodic ghost cells on each side, and evaluates
//! the stencil from the tile only. Two tiling granularities exist per axis:
//!
//! - **small** ([`PencilVariant::Small`]): 4 pencils per group, one point per unit
//! - **large** ([`PencilVariant::Large`]): 32 pencils per group, each unit
//!   iterates strided points, about as many units per group as the small variant
//!
//! ```text
//!   ghost   |        domain-aligned core         |   ghost
//!  -4 .. -1 | 0 1 2 ...                    N-1   | N .. N+3
//!  (copied from N-5..N-2)               (copied from 1..4)
//! ```
//!
//! # Example
//!
//! ```rust
//! use findiff_core::prelude::*;
//!
//! # fn main() -> findiff_core::Result<()> {
//! let config = DerivativeConfig::new(Domain::cubic(32))?;
//! let backend = CpuBackend::new(Schedule::Lockstep);
//!
//! let field = Field::from_fn(config.domain(), |_, _, _| 3.0);
//! let kernel = config.kernel(Axis::X, PencilVariant::Small);
//! let df = differentiate(&backend, &kernel, &field)?;
//!
//! assert!(df.as_slice().iter().all(|&v| v == 0.0));
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`coefficients`]: stencil weights and coordinate samples
//! - [`launch_config`]: launch geometry derivation and device limits
//! - [`kernel`]: the parameterised derivative kernel and its tile
//! - [`backend`]: execution targets (CPU lockstep, CPU threaded, CUDA)
//! - [`codegen`]: CUDA C source for the six kernel instances

pub mod backend;
pub mod codegen;
pub mod coefficients;
pub mod config;
pub mod domain;
pub mod error;
pub mod kernel;
pub mod launch_config;
pub mod tile;

pub use error::{ConfigError, FinDiffError, Result};

/// Re-exports for convenient access.
pub mod prelude {
    pub use crate::backend::{differentiate, CpuBackend, DerivativeBackend, Schedule};
    pub use crate::coefficients::{CoordinateSamples, StencilCoefficients, STENCIL_RADIUS};
    pub use crate::config::DerivativeConfig;
    pub use crate::domain::{Axis, Dimension, Domain, Field};
    pub use crate::error::{ConfigError, FinDiffError, Result};
    pub use crate::kernel::{AxisMapping, DerivativeKernel, GroupId, UnitId};
    pub use crate::launch_config::{
        DeviceLimits, LaunchGeometry, PencilVariant, LARGE_PENCILS, SMALL_PENCILS,
    };
    pub use crate::tile::Tile;

    #[cfg(feature = "cuda")]
    pub use crate::backend::CudaBackend;
}

pub use prelude::*;
