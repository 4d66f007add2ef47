//! Execution targets for derivative kernels.
//!
//! A backend owns device-resident field buffers and launches a
//! [`DerivativeKernel`] over its whole group grid. Buffers persist across
//! launches, so a benchmark uploads once and reads back once.
//!
//! ## Backends
//!
//! | Backend | Groups | Units within a group | Barrier |
//! |---------|--------|----------------------|---------|
//! | [`CpuBackend`] `Lockstep` | rayon pool | phase by phase | phase boundary |
//! | [`CpuBackend`] `Threaded` | sequential | one thread per unit | `std::sync::Barrier` |
//! | `CudaBackend` | CUDA blocks | CUDA threads | `__syncthreads()` |

mod cpu;
#[cfg(feature = "cuda")]
mod cuda;

pub use cpu::{CpuBackend, CpuBuffer, Schedule};
#[cfg(feature = "cuda")]
pub use cuda::{CudaBackend, CudaBuffer};

use crate::domain::{Domain, Field};
use crate::error::{FinDiffError, Result};
use crate::kernel::DerivativeKernel;
use crate::launch_config::DeviceLimits;

/// A field-shaped buffer owned by a backend.
pub trait FieldBuffer: Send + Sync {
    /// Domain of the samples held by this buffer.
    fn domain(&self) -> Domain;
}

/// Device binding for derivative kernels.
///
/// Launches may be asynchronous; [`synchronize`](Self::synchronize) waits
/// for every launch issued so far.
pub trait DerivativeBackend: Send + Sync {
    /// Buffer type for this backend.
    type Buffer: FieldBuffer;

    /// Short backend name.
    fn name(&self) -> &str;

    /// Human-readable description of the execution target.
    fn describe(&self) -> String {
        self.name().to_string()
    }

    /// Per-group limits launch geometries must respect.
    fn limits(&self) -> DeviceLimits;

    /// Copy a host field into a new buffer.
    fn upload(&self, field: &Field) -> Result<Self::Buffer>;

    /// Allocate a zeroed buffer.
    fn allocate(&self, domain: Domain) -> Result<Self::Buffer>;

    /// Zero an existing buffer.
    fn clear(&self, buffer: &mut Self::Buffer) -> Result<()>;

    /// Run `kernel` over its whole group grid, reading `input` and
    /// overwriting every sample of `output`.
    fn launch(
        &self,
        kernel: &DerivativeKernel,
        input: &Self::Buffer,
        output: &mut Self::Buffer,
    ) -> Result<()>;

    /// Wait for all outstanding launches.
    fn synchronize(&self) -> Result<()>;

    /// Copy a buffer back into a host field.
    fn download(&self, buffer: &Self::Buffer) -> Result<Field>;
}

/// Check that both buffers match the kernel's domain and its geometry fits
/// the backend.
pub(crate) fn check_launch<B: FieldBuffer>(
    kernel: &DerivativeKernel,
    limits: &DeviceLimits,
    input: &B,
    output: &B,
) -> Result<()> {
    let expected = kernel.domain();
    for actual in [input.domain(), output.domain()] {
        if actual != expected {
            return Err(FinDiffError::ShapeMismatch { expected, actual });
        }
    }
    kernel.geometry().check_limits(limits)?;
    Ok(())
}

/// Differentiate a host field in one call: upload, launch, synchronize,
/// download.
pub fn differentiate<B: DerivativeBackend>(
    backend: &B,
    kernel: &DerivativeKernel,
    field: &Field,
) -> Result<Field> {
    let input = backend.upload(field)?;
    let mut output = backend.allocate(field.domain())?;
    backend.launch(kernel, &input, &mut output)?;
    backend.synchronize()?;
    backend.download(&output)
}
