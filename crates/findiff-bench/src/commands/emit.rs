//! `findiff emit` command - Print the generated CUDA kernels.

use std::fs;
use std::path::Path;

use colored::Colorize;
use findiff_bench::{BenchResult, Overrides};
use findiff_core::codegen::cuda_source;

use super::prepare;

/// Execute the `emit` command.
pub fn execute(path: Option<&Path>, overrides: &Overrides, output: Option<&Path>) -> BenchResult<()> {
    let (_, config) = prepare(path, overrides)?;
    let source = cuda_source(&config);

    match output {
        Some(output) => {
            fs::write(output, &source)?;
            eprintln!(
                "{} Wrote {} kernels to {}",
                "✓".green(),
                config.kernels().count(),
                output.display().to_string().bright_white()
            );
        }
        None => print!("{source}"),
    }
    Ok(())
}
