//! Test-field synthesis and error norms.

use std::f64::consts::TAU;

use findiff_core::{Axis, CoordinateSamples, Domain, Field, FinDiffError};

/// A cosine wave along one axis, constant along the other two.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestField {
    pub axis: Axis,
    /// Whole periods across the unit domain.
    pub frequency: f64,
}

impl TestField {
    /// `cos(2πk·x)` along `axis`.
    pub fn cosine(axis: Axis, frequency: f64) -> Self {
        Self { axis, frequency }
    }

    fn sample(&self, samples: &CoordinateSamples, i: usize, j: usize, k: usize) -> f64 {
        let c = [i, j, k][self.axis.index()];
        samples.axis(self.axis)[c] as f64
    }

    /// Field values.
    pub fn field(&self, domain: Domain, samples: &CoordinateSamples) -> Field {
        let w = TAU * self.frequency;
        Field::from_fn(domain, |i, j, k| {
            (w * self.sample(samples, i, j, k)).cos() as f32
        })
    }

    /// Analytic derivative `-2πk·sin(2πk·x)`.
    pub fn solution(&self, domain: Domain, samples: &CoordinateSamples) -> Field {
        let w = TAU * self.frequency;
        Field::from_fn(domain, |i, j, k| {
            (-w * (w * self.sample(samples, i, j, k)).sin()) as f32
        })
    }
}

/// RMS and maximum absolute error of a derivative.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize)]
pub struct ErrorNorms {
    pub rms: f64,
    pub max: f64,
}

impl ErrorNorms {
    /// Compare a computed derivative with the analytic solution.
    ///
    /// Differences accumulate in `f64`.
    pub fn compare(solution: &Field, derivative: &Field) -> Result<Self, FinDiffError> {
        if solution.domain() != derivative.domain() {
            return Err(FinDiffError::ShapeMismatch {
                expected: solution.domain(),
                actual: derivative.domain(),
            });
        }

        let (sum, max) = solution
            .as_slice()
            .iter()
            .zip(derivative.as_slice())
            .fold((0.0f64, 0.0f64), |(sum, max), (&s, &d)| {
                let diff = (d as f64 - s as f64).abs();
                (sum + diff * diff, max.max(diff))
            });

        let len = solution.as_slice().len().max(1);
        Ok(Self {
            rms: (sum / len as f64).sqrt(),
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_endpoints() {
        let domain = Domain::new(16, 8, 8);
        let samples = CoordinateSamples::new(domain);
        let test = TestField::cosine(Axis::X, 1.0);

        let f = test.field(domain, &samples);
        assert_eq!(f.get(0, 3, 3), 1.0);
        assert!((f.get(15, 3, 3) - 1.0).abs() < 1e-6);

        let df = test.solution(domain, &samples);
        assert_eq!(df.get(0, 0, 0), 0.0);
    }

    #[test]
    fn test_varies_along_selected_axis_only() {
        let domain = Domain::cubic(8);
        let samples = CoordinateSamples::new(domain);
        let f = TestField::cosine(Axis::Y, 2.0).field(domain, &samples);

        assert_eq!(f.get(0, 3, 0), f.get(7, 3, 5));
        assert_ne!(f.get(0, 3, 0), f.get(0, 4, 0));
    }

    #[test]
    fn test_error_norms() {
        let domain = Domain::new(2, 1, 1);
        let solution = Field::from_vec(domain, vec![1.0, 2.0]).unwrap();
        let derivative = Field::from_vec(domain, vec![1.0, 4.0]).unwrap();

        let norms = ErrorNorms::compare(&solution, &derivative).unwrap();
        assert_eq!(norms.max, 2.0);
        assert!((norms.rms - 2.0f64.sqrt()).abs() < 1e-12);

        let other = Field::zeros(Domain::cubic(1));
        assert!(ErrorNorms::compare(&solution, &other).is_err());
    }
}
