//! findiff - radius-4 derivative kernels: verification, benchmarks, codegen.
//!
//! # Commands
//!
//! - `findiff run` - Differentiate a test field along each axis and report
//!   error norms and bandwidth
//! - `findiff emit` - Print the generated CUDA source
//! - `findiff info` - Show the execution target and all launch geometries
//!
//! # Examples
//!
//! ```bash
//! # Default 64^3 grid on the CPU
//! findiff run
//!
//! # Larger grid along z only, as JSON
//! findiff run --mx 64 --my 64 --mz 256 --axis z --format json
//!
//! # Write the CUDA kernels for a 128^3 grid
//! findiff emit --mx 128 --my 128 --mz 128 -o derivative.cu
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use findiff_bench::report::Format;
use findiff_bench::{AxisSelection, BackendKind, Overrides};

mod commands;

/// findiff - periodic first-derivative stencil kernels
#[derive(Parser)]
#[command(name = "findiff")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Grid and target selection shared by all commands.
#[derive(Args, Debug, Clone)]
struct GridArgs {
    /// Settings file (TOML)
    #[arg(short, long, env = "FINDIFF_CONFIG")]
    config: Option<PathBuf>,

    /// Points along x
    #[arg(long)]
    mx: Option<usize>,

    /// Points along y
    #[arg(long)]
    my: Option<usize>,

    /// Points along z
    #[arg(long)]
    mz: Option<usize>,

    /// Execution backend
    #[arg(short, long, value_enum)]
    backend: Option<BackendKind>,
}

impl GridArgs {
    fn overrides(&self, repetitions: Option<usize>) -> Overrides {
        Overrides {
            mx: self.mx,
            my: self.my,
            mz: self.mz,
            repetitions,
            backend: self.backend,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Differentiate a test field and report error norms and bandwidth
    Run {
        #[command(flatten)]
        grid: GridArgs,

        /// Timed repetitions per kernel
        #[arg(short, long)]
        reps: Option<usize>,

        /// Axes to differentiate along
        #[arg(short, long, value_enum, default_value = "all")]
        axis: AxisSelection,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Print the generated CUDA source for all six kernels
    Emit {
        #[command(flatten)]
        grid: GridArgs,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the execution target and launch geometries
    Info {
        #[command(flatten)]
        grid: GridArgs,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Run {
            grid,
            reps,
            axis,
            format,
        } => commands::run::execute(grid.config.as_deref(), &grid.overrides(reps), axis, format),

        Commands::Emit { grid, output } => {
            commands::emit::execute(grid.config.as_deref(), &grid.overrides(None), output.as_deref())
        }

        Commands::Info { grid } => {
            commands::info::execute(grid.config.as_deref(), &grid.overrides(None))
        }

        Commands::Completions { shell } => {
            use clap::CommandFactory;
            clap_complete::generate(shell, &mut Cli::command(), "findiff", &mut std::io::stdout());
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
