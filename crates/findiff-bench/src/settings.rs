//! Run settings: defaults, TOML file, command-line overrides.
//!
//! Precedence is command line over file over defaults.
//!
//! ```toml
//! [domain]
//! mx = 64
//! my = 64
//! mz = 64
//!
//! [run]
//! repetitions = 20
//! warmup = 1
//! frequencies = [1.0, 1.0, 1.0]
//! backend = "lockstep"
//! tolerance = 1e-3
//! ```

use std::fs;
use std::path::Path;

use clap::ValueEnum;
use findiff_core::{Axis, Domain};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BenchError, BenchResult};

/// Execution target selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// CPU, groups in parallel, units in lockstep.
    #[default]
    Lockstep,
    /// CPU, one thread per unit with group barriers.
    Threaded,
    /// CUDA device (requires the `cuda` feature).
    Cuda,
}

/// Axes to differentiate along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AxisSelection {
    X,
    Y,
    Z,
    #[default]
    All,
}

impl AxisSelection {
    pub fn axes(self) -> Vec<Axis> {
        match self {
            AxisSelection::X => vec![Axis::X],
            AxisSelection::Y => vec![Axis::Y],
            AxisSelection::Z => vec![Axis::Z],
            AxisSelection::All => Axis::ALL.to_vec(),
        }
    }
}

/// The `[run]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Timed invocations per kernel.
    pub repetitions: usize,
    /// Untimed invocations before timing starts.
    pub warmup: usize,
    /// Test-field wave number along x, y and z.
    pub frequencies: [f64; 3],
    pub backend: BackendKind,
    /// Largest accepted RMS error.
    pub tolerance: f64,
    /// CUDA device ordinal.
    pub device: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            repetitions: 20,
            warmup: 1,
            frequencies: [1.0; 3],
            backend: BackendKind::default(),
            tolerance: 1e-3,
            device: 0,
        }
    }
}

impl RunSettings {
    /// Wave number along `axis`.
    pub fn frequency(&self, axis: Axis) -> f64 {
        self.frequencies[axis.index()]
    }
}

/// Complete driver settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub domain: Domain,
    pub run: RunSettings,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub mx: Option<usize>,
    pub my: Option<usize>,
    pub mz: Option<usize>,
    pub repetitions: Option<usize>,
    pub backend: Option<BackendKind>,
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn from_toml(text: &str) -> BenchResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read settings from a TOML file.
    pub fn load(path: &Path) -> BenchResult<Self> {
        debug!("Loading settings from {}", path.display());
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Load from `path` if given, otherwise start from defaults, then apply
    /// `overrides` and validate.
    pub fn resolve(path: Option<&Path>, overrides: &Overrides) -> BenchResult<Self> {
        let mut settings = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        settings.apply(overrides);
        settings.validate()?;
        Ok(settings)
    }

    /// Apply command-line overrides.
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(mx) = overrides.mx {
            self.domain.mx = mx;
        }
        if let Some(my) = overrides.my {
            self.domain.my = my;
        }
        if let Some(mz) = overrides.mz {
            self.domain.mz = mz;
        }
        if let Some(repetitions) = overrides.repetitions {
            self.run.repetitions = repetitions;
        }
        if let Some(backend) = overrides.backend {
            self.run.backend = backend;
        }
    }

    /// Reject values no run could use. Domain divisibility is checked when
    /// the derivative configuration is built.
    pub fn validate(&self) -> BenchResult<()> {
        if self.run.repetitions == 0 {
            return Err(BenchError::InvalidOption(
                "repetitions must be at least 1".to_string(),
            ));
        }
        if !(self.run.tolerance.is_finite() && self.run.tolerance > 0.0) {
            return Err(BenchError::InvalidOption(format!(
                "tolerance must be positive, got {}",
                self.run.tolerance
            )));
        }
        if let Some(k) = self.run.frequencies.iter().find(|k| !k.is_finite()) {
            return Err(BenchError::InvalidOption(format!(
                "frequency must be finite, got {k}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.domain, Domain::cubic(64));
        assert_eq!(settings.run.repetitions, 20);
        assert_eq!(settings.run.warmup, 1);
        assert_eq!(settings.run.backend, BackendKind::Lockstep);
    }

    #[test]
    fn test_partial_file() {
        let settings = Settings::from_toml(
            r#"
            [run]
            repetitions = 5
            backend = "threaded"
            frequencies = [1.0, 2.0, 3.0]
            "#,
        )
        .unwrap();

        assert_eq!(settings.domain, Domain::cubic(64));
        assert_eq!(settings.run.repetitions, 5);
        assert_eq!(settings.run.backend, BackendKind::Threaded);
        assert_eq!(settings.run.frequency(Axis::Z), 3.0);
        assert_eq!(settings.run.tolerance, 1e-3);
    }

    #[test]
    fn test_overrides_win() {
        let mut settings = Settings::from_toml(
            r#"
            [domain]
            mx = 32
            my = 32
            mz = 32
            "#,
        )
        .unwrap();

        settings.apply(&Overrides {
            mz: Some(128),
            repetitions: Some(3),
            ..Default::default()
        });

        assert_eq!(settings.domain, Domain::new(32, 32, 128));
        assert_eq!(settings.run.repetitions, 3);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.run.repetitions = 0;
        assert!(matches!(
            settings.validate(),
            Err(BenchError::InvalidOption(_))
        ));

        assert!(matches!(
            Settings::from_toml("[run]\nbackend = \"opencl\""),
            Err(BenchError::Config(_))
        ));
    }
}
