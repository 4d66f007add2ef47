//! CPU execution of derivative kernels.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Barrier;
use std::thread;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, trace};

use super::{check_launch, DerivativeBackend, FieldBuffer};
use crate::domain::{Domain, Field};
use crate::error::{FinDiffError, Result};
use crate::kernel::DerivativeKernel;
use crate::launch_config::DeviceLimits;

/// How the units of a work group are mapped onto host threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schedule {
    /// Groups run in parallel on the rayon pool; within a group every unit
    /// finishes a phase before any unit starts the next one.
    #[default]
    Lockstep,
    /// Each unit of a group is its own scoped thread and units meet at a
    /// shared barrier between phases. Groups run one after another.
    Threaded,
}

impl Schedule {
    pub fn name(self) -> &'static str {
        match self {
            Schedule::Lockstep => "lockstep",
            Schedule::Threaded => "threaded",
        }
    }
}

/// Host-memory field buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuBuffer {
    domain: Domain,
    data: Vec<f32>,
}

impl CpuBuffer {
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

impl FieldBuffer for CpuBuffer {
    fn domain(&self) -> Domain {
        self.domain
    }
}

/// CPU backend.
#[derive(Debug)]
pub struct CpuBackend {
    schedule: Schedule,
    /// Total kernel launches.
    launches: AtomicU64,
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new(Schedule::default())
    }
}

impl CpuBackend {
    /// Create a CPU backend with the given schedule.
    pub fn new(schedule: Schedule) -> Self {
        info!(
            "Initializing CPU backend (schedule={}, threads={})",
            schedule.name(),
            rayon::current_num_threads()
        );
        Self {
            schedule,
            launches: AtomicU64::new(0),
        }
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    /// Number of launches issued so far.
    pub fn launches(&self) -> u64 {
        self.launches.load(Ordering::Relaxed)
    }

    fn run_lockstep(&self, kernel: &DerivativeKernel, input: &[f32], output: &mut [f32]) {
        let groups: Vec<_> = kernel.groups().collect();
        let results: Vec<Vec<(usize, f32)>> = groups
            .par_iter()
            .map(|&group| {
                let tile = kernel.new_tile();
                let mut out = Vec::with_capacity(tile.axis_len() * tile.pencils());
                kernel.run_group(group, input, &tile, |idx, value| out.push((idx, value)));
                out
            })
            .collect();

        for (idx, value) in results.into_iter().flatten() {
            output[idx] = value;
        }
    }

    fn run_threaded(
        &self,
        kernel: &DerivativeKernel,
        input: &[f32],
        output: &mut [f32],
    ) -> Result<()> {
        let units: Vec<_> = kernel.units().collect();
        let barrier = Barrier::new(units.len());
        // One tile serves every group in turn; a third barrier keeps the
        // next group's load from overwriting samples still being read.
        let tile = kernel.new_tile();
        // Barrier has no poisoning. A panicking unit records the failure and
        // keeps meeting its peers so the scope can still be joined.
        let failed = AtomicBool::new(false);

        let results: Vec<thread::Result<Vec<(usize, f32)>>> = thread::scope(|scope| {
            let handles: Vec<_> = units
                .iter()
                .map(|&unit| {
                    let barrier = &barrier;
                    let tile = &tile;
                    let failed = &failed;
                    scope.spawn(move || {
                        let mut out = Vec::new();
                        let phase = |work: &mut dyn FnMut()| {
                            if !failed.load(Ordering::Relaxed)
                                && panic::catch_unwind(AssertUnwindSafe(work)).is_err()
                            {
                                failed.store(true, Ordering::Relaxed);
                            }
                            barrier.wait();
                        };
                        for group in kernel.groups() {
                            phase(&mut || kernel.load(group, unit, input, tile));
                            phase(&mut || kernel.fill_halo(unit, tile));
                            phase(&mut || {
                                kernel.compute(group, unit, tile, |idx, value| out.push((idx, value)))
                            });
                        }
                        out
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join()).collect()
        });

        if failed.load(Ordering::Relaxed) || results.iter().any(|r| r.is_err()) {
            return Err(FinDiffError::Launch(format!(
                "{}: unit thread panicked",
                kernel.name()
            )));
        }

        for pairs in results.into_iter().flatten() {
            for (idx, value) in pairs {
                output[idx] = value;
            }
        }
        Ok(())
    }
}

impl DerivativeBackend for CpuBackend {
    type Buffer = CpuBuffer;

    fn name(&self) -> &str {
        match self.schedule {
            Schedule::Lockstep => "cpu-lockstep",
            Schedule::Threaded => "cpu-threaded",
        }
    }

    fn describe(&self) -> String {
        match self.schedule {
            Schedule::Lockstep => format!(
                "CPU, lockstep groups on {} rayon threads",
                rayon::current_num_threads()
            ),
            Schedule::Threaded => "CPU, one thread per unit with group barriers".to_string(),
        }
    }

    fn limits(&self) -> DeviceLimits {
        match self.schedule {
            Schedule::Lockstep => DeviceLimits::unbounded(),
            Schedule::Threaded => DeviceLimits::unbounded().with_max_units(1024),
        }
    }

    fn upload(&self, field: &Field) -> Result<CpuBuffer> {
        Ok(CpuBuffer {
            domain: field.domain(),
            data: field.as_slice().to_vec(),
        })
    }

    fn allocate(&self, domain: Domain) -> Result<CpuBuffer> {
        Ok(CpuBuffer {
            domain,
            data: vec![0.0; domain.len()],
        })
    }

    fn clear(&self, buffer: &mut CpuBuffer) -> Result<()> {
        buffer.data.fill(0.0);
        Ok(())
    }

    fn launch(
        &self,
        kernel: &DerivativeKernel,
        input: &CpuBuffer,
        output: &mut CpuBuffer,
    ) -> Result<()> {
        check_launch(kernel, &self.limits(), input, output)?;

        trace!(
            "Launching {} on {} ({} groups x {} units)",
            kernel.name(),
            self.name(),
            kernel.geometry().group_count(),
            kernel.geometry().units_per_group()
        );

        match self.schedule {
            Schedule::Lockstep => self.run_lockstep(kernel, &input.data, &mut output.data),
            Schedule::Threaded => self.run_threaded(kernel, &input.data, &mut output.data)?,
        }

        self.launches.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn synchronize(&self) -> Result<()> {
        // Launches complete before returning.
        Ok(())
    }

    fn download(&self, buffer: &CpuBuffer) -> Result<Field> {
        Field::from_vec(buffer.domain, buffer.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::differentiate;
    use crate::config::DerivativeConfig;
    use crate::domain::Axis;
    use crate::launch_config::PencilVariant;

    fn wave(domain: Domain) -> Field {
        Field::from_fn(domain, |i, j, k| {
            let x = i as f32 / (domain.mx - 1) as f32;
            let y = j as f32 / (domain.my - 1) as f32;
            let z = k as f32 / (domain.mz - 1) as f32;
            (std::f32::consts::TAU * x).sin() + (std::f32::consts::TAU * y).cos() * z
        })
    }

    #[test]
    fn test_schedules_agree() {
        let config = DerivativeConfig::new(Domain::new(32, 32, 32)).unwrap();
        let field = wave(config.domain());
        let lockstep = CpuBackend::new(Schedule::Lockstep);
        let threaded = CpuBackend::new(Schedule::Threaded);

        for kernel in config.kernels() {
            let a = differentiate(&lockstep, &kernel, &field).unwrap();
            let b = differentiate(&threaded, &kernel, &field).unwrap();
            assert_eq!(a.as_slice(), b.as_slice(), "{} differs", kernel.name());
        }
        assert_eq!(lockstep.launches(), 6);
    }

    #[test]
    fn test_shape_mismatch() {
        let config = DerivativeConfig::new(Domain::cubic(32)).unwrap();
        let backend = CpuBackend::default();
        let kernel = config.kernel(Axis::Y, PencilVariant::Small);

        let field = Field::zeros(Domain::cubic(16));
        let err = differentiate(&backend, &kernel, &field).unwrap_err();
        assert!(matches!(err, FinDiffError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_output_is_overwritten() {
        let config = DerivativeConfig::new(Domain::cubic(32)).unwrap();
        let backend = CpuBackend::default();
        let kernel = config.kernel(Axis::Z, PencilVariant::Small);

        let input = backend.upload(&Field::from_fn(config.domain(), |_, _, _| 1.0)).unwrap();
        let mut output = backend.upload(&Field::from_fn(config.domain(), |_, _, _| 9.0)).unwrap();
        backend.launch(&kernel, &input, &mut output).unwrap();

        assert!(output.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_threaded_unit_panic_is_reported() {
        let config = DerivativeConfig::new(Domain::cubic(32)).unwrap();
        let backend = CpuBackend::new(Schedule::Threaded);
        let kernel = config.kernel(Axis::Y, PencilVariant::Small);

        // Units reading past the end panic during load; the rest must not
        // wait on them forever.
        let input = vec![0.0f32; config.domain().len() / 2];
        let mut output = vec![0.0f32; config.domain().len()];
        let err = backend.run_threaded(&kernel, &input, &mut output).unwrap_err();
        assert!(matches!(err, FinDiffError::Launch(msg) if msg.contains("panicked")));
    }

    #[test]
    fn test_threaded_unit_limit() {
        let config = DerivativeConfig::new(Domain::new(2048, 32, 32)).unwrap();
        let backend = CpuBackend::new(Schedule::Threaded);
        let kernel = config.kernel(Axis::X, PencilVariant::Small);

        let field = Field::zeros(config.domain());
        let err = differentiate(&backend, &kernel, &field).unwrap_err();
        assert!(matches!(
            err,
            FinDiffError::Config(crate::ConfigError::ExceedsDeviceLimit { .. })
        ));
    }
}
