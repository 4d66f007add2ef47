//! CUDA C source for the derivative kernels.
//!
//! Every instance is specialised for its domain: extents, pencil count and
//! strides are baked in as literals so the shared tile has a static size.
//! The stencil weights are passed as the four trailing `float` arguments.
//!
//! ```text
//! extern "C" __global__ void derivative_x(const float* f, float* df,
//!                                         float a, float b, float c, float d)
//! ```
//!
//! Shared memory holds the tile pencil-major with the halo at both ends, so
//! stencil position `s` lives at column `s + 4`.

use std::fmt;

use crate::coefficients::STENCIL_RADIUS;
use crate::config::DerivativeConfig;
use crate::domain::Axis;
use crate::kernel::AxisMapping;
use crate::launch_config::LaunchGeometry;

/// Kernel parameter list shared by all instances.
pub const KERNEL_PARAMS: &str =
    "const float* __restrict__ f, float* __restrict__ df, float a, float b, float c, float d";

/// `__shared__` declaration of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedTileDecl {
    pub pencils: usize,
    pub columns: usize,
}

impl SharedTileDecl {
    pub fn for_geometry(geometry: &LaunchGeometry) -> Self {
        Self {
            pencils: geometry.pencils(),
            columns: geometry.axis_len() + 2 * STENCIL_RADIUS,
        }
    }

    pub fn bytes(&self) -> usize {
        self.pencils * self.columns * std::mem::size_of::<f32>()
    }
}

impl fmt::Display for SharedTileDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "__shared__ float s_f[{}][{}];", self.pencils, self.columns)
    }
}

/// Source of one kernel instance.
#[derive(Debug, Clone, Copy)]
pub struct KernelSource<'a> {
    geometry: &'a LaunchGeometry,
}

impl<'a> KernelSource<'a> {
    pub fn new(geometry: &'a LaunchGeometry) -> Self {
        Self { geometry }
    }

    /// Global index expression of `(s, p)` in block `(gx, gy)`.
    fn index_expr(&self) -> String {
        let domain = self.geometry.domain();
        let pencils = self.geometry.pencils();
        let packed = format!("(gx * {pencils} + p)");
        let slice = domain.mx * domain.my;
        match self.geometry.axis() {
            Axis::X => format!("gy * {slice} + {packed} * {} + s", domain.mx),
            Axis::Y => format!("gy * {slice} + s * {} + {packed}", domain.mx),
            Axis::Z => format!("s * {slice} + gy * {} + {packed}", domain.mx),
        }
    }
}

impl fmt::Display for KernelSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = self.geometry;
        let n = g.axis_len();
        let pencils = g.pencils();
        let mapping = AxisMapping::new(g.axis(), g.domain(), pencils);
        let (bs, bp) = mapping.split_shape(g.block_dim());
        let (stencil_tid, packed_tid) = match g.axis() {
            Axis::X => ("threadIdx.x", "threadIdx.y"),
            Axis::Y | Axis::Z => ("threadIdx.y", "threadIdx.x"),
        };
        let index = self.index_expr();
        let r = STENCIL_RADIUS;

        writeln!(
            f,
            "// {}: grid ({}, {}), block ({}, {})",
            g.kernel_name(),
            g.grid_dim().0,
            g.grid_dim().1,
            g.block_dim().0,
            g.block_dim().1
        )?;
        writeln!(
            f,
            "extern \"C\" __global__ void __launch_bounds__({}) {}({})",
            g.units_per_group(),
            g.kernel_name(),
            KERNEL_PARAMS
        )?;
        writeln!(f, "{{")?;
        writeln!(f, "    {}", SharedTileDecl::for_geometry(g))?;
        writeln!(f)?;
        writeln!(f, "    const int us = {stencil_tid};")?;
        writeln!(f, "    const int up = {packed_tid};")?;
        writeln!(f, "    const int gx = blockIdx.x;")?;
        writeln!(f, "    const int gy = blockIdx.y;")?;
        writeln!(f)?;
        writeln!(f, "    for (int s = us; s < {n}; s += {bs}) {{")?;
        writeln!(f, "        for (int p = up; p < {pencils}; p += {bp}) {{")?;
        writeln!(f, "            s_f[p][s + {r}] = f[{index}];")?;
        writeln!(f, "        }}")?;
        writeln!(f, "    }}")?;
        writeln!(f)?;
        writeln!(f, "    __syncthreads();")?;
        writeln!(f)?;
        writeln!(f, "    // periodic halo, endpoints shared")?;
        writeln!(f, "    if (us < {r}) {{")?;
        writeln!(f, "        for (int p = up; p < {pencils}; p += {bp}) {{")?;
        writeln!(f, "            s_f[p][us] = s_f[p][us + {}];", n - 1)?;
        writeln!(f, "            s_f[p][us + {}] = s_f[p][us + {}];", n + r, r + 1)?;
        writeln!(f, "        }}")?;
        writeln!(f, "    }}")?;
        writeln!(f)?;
        writeln!(f, "    __syncthreads();")?;
        writeln!(f)?;
        writeln!(f, "    for (int s = us; s < {n}; s += {bs}) {{")?;
        writeln!(f, "        for (int p = up; p < {pencils}; p += {bp}) {{")?;
        writeln!(f, "            df[{index}] =")?;
        writeln!(f, "                a * (s_f[p][s + 5] - s_f[p][s + 3])")?;
        writeln!(f, "              + b * (s_f[p][s + 6] - s_f[p][s + 2])")?;
        writeln!(f, "              + c * (s_f[p][s + 7] - s_f[p][s + 1])")?;
        writeln!(f, "              + d * (s_f[p][s + 8] - s_f[p][s]);")?;
        writeln!(f, "        }}")?;
        writeln!(f, "    }}")?;
        writeln!(f, "}}")
    }
}

/// Source of a single kernel instance.
pub fn kernel_source(geometry: &LaunchGeometry) -> String {
    KernelSource::new(geometry).to_string()
}

/// Source of all six kernel instances of `config`, one translation unit.
pub fn cuda_source(config: &DerivativeConfig) -> String {
    let domain = config.domain();
    let mut code = format!(
        "// Radius-4 first-derivative kernels, domain {}x{}x{}\n",
        domain.mx, domain.my, domain.mz
    );
    for kernel in config.kernels() {
        code.push('\n');
        code.push_str(&kernel_source(kernel.geometry()));
    }
    code
}
