//! `findiff run` command - Verify and time the derivative kernels.

use std::io::{self, Write};
use std::path::Path;

use colored::Colorize;
use findiff_bench::report::{self, Format};
use findiff_bench::{AxisSelection, BackendKind, BenchResult, Driver, Overrides, Settings};
use findiff_core::{Axis, CpuBackend, DerivativeBackend, DerivativeConfig, Schedule};

use super::prepare;

/// Execute the `run` command.
pub fn execute(
    path: Option<&Path>,
    overrides: &Overrides,
    axis: AxisSelection,
    format: Format,
) -> BenchResult<()> {
    let (settings, config) = prepare(path, overrides)?;
    let axes = axis.axes();

    match settings.run.backend {
        BackendKind::Lockstep => {
            run_on(&CpuBackend::new(Schedule::Lockstep), &config, &settings, &axes, format)
        }
        BackendKind::Threaded => {
            run_on(&CpuBackend::new(Schedule::Threaded), &config, &settings, &axes, format)
        }
        BackendKind::Cuda => run_cuda(&config, &settings, &axes, format),
    }
}

#[cfg(feature = "cuda")]
fn run_cuda(config: &DerivativeConfig, settings: &Settings, axes: &[Axis], format: Format) -> BenchResult<()> {
    let backend = findiff_core::CudaBackend::new(config, settings.run.device)?;
    run_on(&backend, config, settings, axes, format)
}

#[cfg(not(feature = "cuda"))]
fn run_cuda(_: &DerivativeConfig, _: &Settings, _: &[Axis], _: Format) -> BenchResult<()> {
    Err(super::cuda_unavailable())
}

fn run_on<B: DerivativeBackend>(
    backend: &B,
    config: &DerivativeConfig,
    settings: &Settings,
    axes: &[Axis],
    format: Format,
) -> BenchResult<()> {
    let driver = Driver::new(backend, config, &settings.run);
    let mut stdout = io::stdout().lock();

    if format == Format::Text {
        report::write_header(&mut stdout, &backend.describe(), config)?;
    }

    let records = driver.run(axes)?;

    match format {
        Format::Text => {
            report::write_text(&mut stdout, &records, settings.run.tolerance)?;
            writeln!(
                stdout,
                "{} {} kernel runs, {} repetitions each",
                "✓".green(),
                records.len(),
                settings.run.repetitions
            )?;
        }
        Format::Json => writeln!(stdout, "{}", report::to_json(&records)?)?,
    }

    driver.check_tolerance(&records)
}
