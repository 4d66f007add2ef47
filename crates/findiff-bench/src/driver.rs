//! The benchmark loop: synthesise, launch, time, compare.

use findiff_core::{Axis, DerivativeBackend, DerivativeConfig, PencilVariant};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{BenchError, BenchResult};
use crate::settings::RunSettings;
use crate::timing::{bandwidth_gbps, Stopwatch};
use crate::verify::{ErrorNorms, TestField};

/// Outcome of one (axis, variant) run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub backend: String,
    pub axis: Axis,
    pub variant: PencilVariant,
    pub kernel: String,
    /// Tile core as `(axis_len, pencils)`.
    pub tile: (usize, usize),
    pub repetitions: usize,
    pub rms_error: f64,
    pub max_error: f64,
    pub avg_time_ms: f64,
    pub bandwidth_gbps: f64,
}

impl RunRecord {
    pub fn within(&self, tolerance: f64) -> bool {
        self.rms_error <= tolerance
    }
}

/// Runs every kernel of a configuration on one backend.
pub struct Driver<'a, B: DerivativeBackend> {
    backend: &'a B,
    config: &'a DerivativeConfig,
    settings: &'a RunSettings,
}

impl<'a, B: DerivativeBackend> Driver<'a, B> {
    pub fn new(backend: &'a B, config: &'a DerivativeConfig, settings: &'a RunSettings) -> Self {
        Self {
            backend,
            config,
            settings,
        }
    }

    /// Check every geometry against the backend before anything runs.
    pub fn preflight(&self) -> BenchResult<()> {
        self.config.check_limits(&self.backend.limits())?;
        Ok(())
    }

    /// Run both variants along `axis`.
    pub fn run_axis(&self, axis: Axis) -> BenchResult<Vec<RunRecord>> {
        let domain = self.config.domain();
        let samples = self.config.samples();
        let test = TestField::cosine(axis, self.settings.frequency(axis));

        let field = test.field(domain, samples);
        let solution = test.solution(domain, samples);

        let input = self.backend.upload(&field)?;
        let mut output = self.backend.allocate(domain)?;

        let mut records = Vec::with_capacity(PencilVariant::ALL.len());
        for variant in PencilVariant::ALL {
            let kernel = self.config.kernel(axis, variant);
            debug!("Running {} on {}", kernel.name(), self.backend.name());

            self.backend.clear(&mut output)?;
            for _ in 0..self.settings.warmup {
                self.backend.launch(&kernel, &input, &mut output)?;
            }
            self.backend.synchronize()?;

            let mut watch = Stopwatch::new();
            watch.start();
            for _ in 0..self.settings.repetitions {
                self.backend.launch(&kernel, &input, &mut output)?;
            }
            self.backend.synchronize()?;
            let elapsed = watch.stop();

            let derivative = self.backend.download(&output)?;
            let norms = ErrorNorms::compare(&solution, &derivative)?;

            let reps = self.settings.repetitions;
            let record = RunRecord {
                backend: self.backend.name().to_string(),
                axis,
                variant,
                kernel: kernel.name(),
                tile: kernel.geometry().tile_dims(),
                repetitions: reps,
                rms_error: norms.rms,
                max_error: norms.max,
                avg_time_ms: elapsed.as_secs_f64() * 1e3 / reps as f64,
                bandwidth_gbps: bandwidth_gbps(domain.bytes(), reps, elapsed),
            };

            info!(
                "{}: rms {:.3e}, max {:.3e}, {:.3} ms",
                record.kernel, record.rms_error, record.max_error, record.avg_time_ms
            );
            records.push(record);
        }

        Ok(records)
    }

    /// Run both variants along each of `axes`.
    pub fn run(&self, axes: &[Axis]) -> BenchResult<Vec<RunRecord>> {
        self.preflight()?;
        let mut records = Vec::new();
        for &axis in axes {
            records.extend(self.run_axis(axis)?);
        }
        Ok(records)
    }

    /// First record whose RMS error exceeds the tolerance, as an error.
    pub fn check_tolerance(&self, records: &[RunRecord]) -> BenchResult<()> {
        let tolerance = self.settings.tolerance;
        match records.iter().find(|r| !r.within(tolerance)) {
            Some(record) => Err(BenchError::ToleranceExceeded {
                kernel: record.kernel.clone(),
                rms: record.rms_error,
                tolerance,
            }),
            None => Ok(()),
        }
    }
}
