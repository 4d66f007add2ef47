//! Immutable per-domain derivative configuration.

use tracing::info;

use crate::coefficients::{CoordinateSamples, StencilCoefficients};
use crate::domain::{Axis, Domain};
use crate::error::ConfigError;
use crate::kernel::DerivativeKernel;
use crate::launch_config::{DeviceLimits, LaunchGeometry, PencilVariant};

/// Coefficients, samples and all six launch geometries for one domain.
///
/// Built once, validated up front, and shared read-only by every kernel
/// invocation and by the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivativeConfig {
    domain: Domain,
    coefficients: [StencilCoefficients; 3],
    samples: CoordinateSamples,
    /// Indexed by `[axis][variant]`.
    geometries: [[LaunchGeometry; 2]; 3],
}

impl DerivativeConfig {
    /// Derive and validate the configuration for `domain`.
    ///
    /// Fails on the first geometry whose divisibility or size constraints
    /// the domain violates.
    pub fn new(domain: Domain) -> Result<Self, ConfigError> {
        let geometry = |axis: Axis| -> Result<[LaunchGeometry; 2], ConfigError> {
            Ok([
                LaunchGeometry::for_variant(domain, PencilVariant::Small, axis)?,
                LaunchGeometry::for_variant(domain, PencilVariant::Large, axis)?,
            ])
        };
        let geometries = [geometry(Axis::X)?, geometry(Axis::Y)?, geometry(Axis::Z)?];

        let coefficients = Axis::ALL.map(|axis| StencilCoefficients::derive(domain.axis_len(axis)));

        info!("Derivative configuration for {} domain", domain);

        Ok(Self {
            domain,
            coefficients,
            samples: CoordinateSamples::new(domain),
            geometries,
        })
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Stencil weights along `axis`.
    pub fn coefficients(&self, axis: Axis) -> StencilCoefficients {
        self.coefficients[axis.index()]
    }

    pub fn samples(&self) -> &CoordinateSamples {
        &self.samples
    }

    pub fn geometry(&self, axis: Axis, variant: PencilVariant) -> LaunchGeometry {
        self.geometries[axis.index()][variant.index()]
    }

    /// Kernel instance for one (axis, variant) pair.
    pub fn kernel(&self, axis: Axis, variant: PencilVariant) -> DerivativeKernel {
        DerivativeKernel::new(self.geometry(axis, variant), self.coefficients(axis))
    }

    /// All six kernel instances, axis-major, small before large.
    pub fn kernels(&self) -> impl Iterator<Item = DerivativeKernel> + '_ {
        Axis::ALL.into_iter().flat_map(move |axis| {
            PencilVariant::ALL
                .into_iter()
                .map(move |variant| self.kernel(axis, variant))
        })
    }

    /// Check every geometry against a target's limits.
    pub fn check_limits(&self, limits: &DeviceLimits) -> Result<(), ConfigError> {
        self.geometries
            .iter()
            .flatten()
            .try_for_each(|geometry| geometry.check_limits(limits))
    }
}
