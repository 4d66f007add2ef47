//! Text and JSON reports.

use std::io::Write;

use colored::Colorize;
use findiff_core::{Axis, DerivativeConfig, PencilVariant};

use crate::driver::RunRecord;
use crate::error::BenchResult;

/// Output format of `findiff run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}

/// Run header: target and grid.
pub fn write_header<W: Write>(out: &mut W, backend: &str, config: &DerivativeConfig) -> BenchResult<()> {
    let domain = config.domain();
    writeln!(out, "{} {}", "Backend:".bright_white(), backend.bright_yellow())?;
    writeln!(
        out,
        "{} {}",
        "Grid:".bright_white(),
        format!("{} x {} x {}", domain.mx, domain.my, domain.mz).bright_yellow()
    )?;
    writeln!(out)?;
    Ok(())
}

/// One block per record, grouped under an axis heading.
pub fn write_text<W: Write>(out: &mut W, records: &[RunRecord], tolerance: f64) -> BenchResult<()> {
    let mut current: Option<Axis> = None;
    for record in records {
        if current != Some(record.axis) {
            writeln!(
                out,
                "{} {}",
                "→".bright_cyan(),
                format!("{} derivatives", record.axis).bright_white().underline()
            )?;
            current = Some(record.axis);
        }

        let status = if record.within(tolerance) {
            "✓".green()
        } else {
            "✗".red()
        };
        writeln!(out, "  {} {}", status, record.kernel.bright_white())?;
        writeln!(
            out,
            "    Using tile of {} x {}",
            record.tile.0, record.tile.1
        )?;
        writeln!(
            out,
            "    RMS error: {:e}, MAX error: {:e}",
            record.rms_error, record.max_error
        )?;
        writeln!(out, "    Average time (ms): {:.6}", record.avg_time_ms)?;
        writeln!(
            out,
            "    Average bandwidth (GB/s): {}",
            format!("{:.3}", record.bandwidth_gbps).bright_green()
        )?;
        writeln!(out)?;
    }
    Ok(())
}

/// Records as a pretty-printed JSON array.
pub fn to_json(records: &[RunRecord]) -> BenchResult<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Launch geometry table for all six kernels.
pub fn write_geometries<W: Write>(out: &mut W, config: &DerivativeConfig) -> BenchResult<()> {
    writeln!(
        out,
        "  {:<24} {:>14} {:>14} {:>10}",
        "kernel", "grid", "block", "tile KiB"
    )?;
    for axis in Axis::ALL {
        for variant in PencilVariant::ALL {
            let g = config.geometry(axis, variant);
            let grid = format!("({}, {})", g.grid_dim().0, g.grid_dim().1);
            let block = format!("({}, {})", g.block_dim().0, g.block_dim().1);
            writeln!(
                out,
                "  {:<24} {:>14} {:>14} {:>10.1}",
                g.kernel_name(),
                grid,
                block,
                g.tile_bytes() as f64 / 1024.0
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use findiff_core::Domain;

    fn record(axis: Axis, rms: f64) -> RunRecord {
        RunRecord {
            backend: "cpu-lockstep".to_string(),
            axis,
            variant: PencilVariant::Small,
            kernel: format!("derivative_{axis}"),
            tile: (64, 4),
            repetitions: 20,
            rms_error: rms,
            max_error: rms * 2.0,
            avg_time_ms: 0.5,
            bandwidth_gbps: 12.0,
        }
    }

    #[test]
    fn test_text_report() {
        colored::control::set_override(false);
        let mut out = Vec::new();
        write_text(&mut out, &[record(Axis::X, 1e-6), record(Axis::Y, 1e-2)], 1e-3).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("x derivatives"));
        assert!(text.contains("Using tile of 64 x 4"));
        assert!(text.contains("✓ derivative_x"));
        assert!(text.contains("✗ derivative_y"));
        assert!(text.contains("Average bandwidth (GB/s): 12.000"));
    }

    #[test]
    fn test_json_report() {
        let json = to_json(&[record(Axis::Z, 1e-6)]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["axis"], "z");
        assert_eq!(value[0]["variant"], "small");
        assert_eq!(value[0]["tile"][0], 64);
    }

    #[test]
    fn test_geometry_table() {
        let config = DerivativeConfig::new(Domain::cubic(64)).unwrap();
        let mut out = Vec::new();
        write_geometries(&mut out, &config).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.lines().count(), 7);
        assert!(text.contains("derivative_y_lPencils"));
    }
}
