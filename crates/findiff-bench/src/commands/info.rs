//! `findiff info` command - Show the execution target and launch geometries.

use std::io::{self, Write};
use std::path::Path;

use colored::Colorize;
use findiff_bench::report;
use findiff_bench::{BackendKind, BenchResult, Overrides, Settings};
use findiff_core::{CpuBackend, DerivativeBackend, DerivativeConfig, Schedule};

use super::prepare;

/// Execute the `info` command.
pub fn execute(path: Option<&Path>, overrides: &Overrides) -> BenchResult<()> {
    let (settings, config) = prepare(path, overrides)?;

    match settings.run.backend {
        BackendKind::Lockstep => show(&CpuBackend::new(Schedule::Lockstep), &config),
        BackendKind::Threaded => show(&CpuBackend::new(Schedule::Threaded), &config),
        BackendKind::Cuda => show_cuda(&config, &settings),
    }
}

#[cfg(feature = "cuda")]
fn show_cuda(config: &DerivativeConfig, settings: &Settings) -> BenchResult<()> {
    let backend = findiff_core::CudaBackend::new(config, settings.run.device)?;
    show(&backend, config)
}

#[cfg(not(feature = "cuda"))]
fn show_cuda(_: &DerivativeConfig, _: &Settings) -> BenchResult<()> {
    Err(super::cuda_unavailable())
}

fn show<B: DerivativeBackend>(backend: &B, config: &DerivativeConfig) -> BenchResult<()> {
    let mut stdout = io::stdout().lock();
    report::write_header(&mut stdout, &backend.describe(), config)?;
    report::write_geometries(&mut stdout, config)?;

    match config.check_limits(&backend.limits()) {
        Ok(()) => writeln!(stdout, "\n{} All geometries fit {}", "✓".green(), backend.name())?,
        Err(e) => writeln!(stdout, "\n{} {}", "Warning:".yellow(), e)?,
    }
    Ok(())
}
