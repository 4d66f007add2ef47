//! CUDA execution of derivative kernels through cudarc.
//!
//! The six kernel instances of a [`DerivativeConfig`] are compiled with
//! NVRTC into one module when the backend is created. A backend is therefore
//! bound to a single domain.

use std::collections::HashMap;
use std::sync::Arc;

use cudarc::driver::{
    CudaContext, CudaFunction, CudaModule, CudaSlice, CudaStream, LaunchConfig, PushKernelArg,
};
use tracing::{debug, info, trace};

use super::{check_launch, DerivativeBackend, FieldBuffer};
use crate::codegen::cuda_source;
use crate::config::DerivativeConfig;
use crate::domain::{Domain, Field};
use crate::error::{FinDiffError, Result};
use crate::kernel::DerivativeKernel;
use crate::launch_config::DeviceLimits;

/// Device-resident field buffer.
pub struct CudaBuffer {
    domain: Domain,
    data: CudaSlice<f32>,
}

impl FieldBuffer for CudaBuffer {
    fn domain(&self) -> Domain {
        self.domain
    }
}

/// CUDA backend for one domain.
pub struct CudaBackend {
    ctx: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    #[allow(dead_code)]
    module: Arc<CudaModule>,
    /// Kernel functions by entry-point name.
    functions: HashMap<String, CudaFunction>,
    domain: Domain,
}

impl CudaBackend {
    /// Compile the kernels of `config` on device `ordinal`.
    pub fn new(config: &DerivativeConfig, ordinal: usize) -> Result<Self> {
        let ctx = CudaContext::new(ordinal).map_err(|e| FinDiffError::Device(e.to_string()))?;
        let stream = ctx.default_stream();

        let source = cuda_source(config);
        debug!("Compiling {} bytes of CUDA source", source.len());
        let ptx = cudarc::nvrtc::compile_ptx(source)
            .map_err(|e| FinDiffError::Compile(e.to_string()))?;

        let module = ctx
            .load_module(ptx)
            .map_err(|e| FinDiffError::Compile(e.to_string()))?;

        let mut functions = HashMap::new();
        for kernel in config.kernels() {
            let name = kernel.name();
            let function = module
                .load_function(&name)
                .map_err(|e| FinDiffError::Compile(e.to_string()))?;
            functions.insert(name, function);
        }

        info!(
            "Initialized CUDA backend on device {} for {} domain",
            ordinal,
            config.domain()
        );

        Ok(Self {
            ctx,
            stream,
            module,
            functions,
            domain: config.domain(),
        })
    }

    fn function(&self, kernel: &DerivativeKernel) -> Result<&CudaFunction> {
        if kernel.domain() != self.domain {
            return Err(FinDiffError::ShapeMismatch {
                expected: self.domain,
                actual: kernel.domain(),
            });
        }
        self.functions
            .get(&kernel.name())
            .ok_or_else(|| FinDiffError::Launch(format!("kernel {} not loaded", kernel.name())))
    }
}

impl DerivativeBackend for CudaBackend {
    type Buffer = CudaBuffer;

    fn name(&self) -> &str {
        "cuda"
    }

    fn describe(&self) -> String {
        format!("CUDA device {}", self.ctx.ordinal())
    }

    fn limits(&self) -> DeviceLimits {
        DeviceLimits::cuda_default()
    }

    fn upload(&self, field: &Field) -> Result<CudaBuffer> {
        let mut data = unsafe {
            self.stream
                .alloc::<f32>(field.domain().len())
                .map_err(|e| FinDiffError::Memory(e.to_string()))?
        };
        self.stream
            .memcpy_htod(field.as_slice(), &mut data)
            .map_err(|e| FinDiffError::Memory(e.to_string()))?;
        Ok(CudaBuffer {
            domain: field.domain(),
            data,
        })
    }

    fn allocate(&self, domain: Domain) -> Result<CudaBuffer> {
        let data = self
            .stream
            .alloc_zeros::<f32>(domain.len())
            .map_err(|e| FinDiffError::Memory(e.to_string()))?;
        Ok(CudaBuffer { domain, data })
    }

    fn clear(&self, buffer: &mut CudaBuffer) -> Result<()> {
        self.stream
            .memset_zeros(&mut buffer.data)
            .map_err(|e| FinDiffError::Memory(e.to_string()))
    }

    fn launch(
        &self,
        kernel: &DerivativeKernel,
        input: &CudaBuffer,
        output: &mut CudaBuffer,
    ) -> Result<()> {
        check_launch(kernel, &self.limits(), input, output)?;
        let function = self.function(kernel)?;

        let geometry = kernel.geometry();
        let config = LaunchConfig {
            grid_dim: geometry.grid_dim(),
            block_dim: geometry.block_dim(),
            shared_mem_bytes: 0,
        };
        let coeffs = *kernel.coefficients();

        trace!(
            "Launching {} (grid {:?}, block {:?})",
            kernel.name(),
            config.grid_dim,
            config.block_dim
        );

        unsafe {
            self.stream
                .launch_builder(function)
                .arg(&input.data)
                .arg(&mut output.data)
                .arg(&coeffs.a)
                .arg(&coeffs.b)
                .arg(&coeffs.c)
                .arg(&coeffs.d)
                .launch(config)
                .map_err(|e| FinDiffError::Launch(e.to_string()))?;
        }
        Ok(())
    }

    fn synchronize(&self) -> Result<()> {
        self.stream
            .synchronize()
            .map_err(|e| FinDiffError::Device(e.to_string()))
    }

    fn download(&self, buffer: &CudaBuffer) -> Result<Field> {
        let mut data = vec![0.0f32; buffer.domain.len()];
        self.stream
            .memcpy_dtoh(&buffer.data, &mut data)
            .map_err(|e| FinDiffError::Memory(e.to_string()))?;
        Field::from_vec(buffer.domain, data)
    }
}
