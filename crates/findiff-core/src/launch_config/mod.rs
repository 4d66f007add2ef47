//! Launch geometry derivation and device limits.
//!
//! A derivative kernel never splits its stencil axis across work groups: the
//! halo fill assumes the entire axis is resident in one tile. The grid is
//! therefore tiled only along the two orthogonal axes, bundling `pencil_width`
//! pencils per group along the *packed* axis.
//!
//! # Example
//!
//! ```
//! use findiff_core::domain::{Axis, Domain};
//! use findiff_core::launch_config::{LaunchGeometry, PencilVariant};
//!
//! let geometry = LaunchGeometry::for_variant(Domain::cubic(64), PencilVariant::Large, Axis::Y)?;
//!
//! assert_eq!(geometry.block_dim(), (32, 8, 1));
//! assert_eq!(geometry.grid_dim(), (2, 64, 1));
//! # Ok::<(), findiff_core::ConfigError>(())
//! ```

mod geometry;
mod limits;

pub use geometry::{LaunchGeometry, PencilVariant, LARGE_PENCILS, SMALL_PENCILS};
pub use limits::DeviceLimits;
