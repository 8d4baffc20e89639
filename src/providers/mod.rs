use glam::DVec3;

use crate::aabb::Aabb;
use crate::medium::MediumDensity;
use crate::spectrum::{SampledSpectrum, SampledWavelengths};

pub mod cloud;
pub mod sparse_grid;
pub mod uniform_grid;

/// A coarse 3-D array of per-cell upper-bound densities, linearised
/// `i = x + Rx·(y + Ry·z)` (spec.md §3). Built once at medium construction
/// and never mutated again.
#[derive(Debug, Clone)]
pub struct MajorantGrid {
    resolution: (usize, usize, usize),
    values: Vec<f32>,
}

impl MajorantGrid {
    pub fn new(resolution: (usize, usize, usize), values: Vec<f32>) -> Self {
        let (rx, ry, rz) = resolution;
        assert_eq!(values.len(), rx * ry * rz, "majorant grid size mismatch");
        MajorantGrid { resolution, values }
    }

    pub fn resolution(&self) -> (usize, usize, usize) {
        self.resolution
    }

    fn linear_index(&self, x: usize, y: usize, z: usize) -> usize {
        let (rx, ry, _) = self.resolution;
        x + rx * (y + ry * z)
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        self.values[self.linear_index(x, y, z)]
    }
}

/// A polymorphic source of spatially varying density inside an
/// axis-aligned box in medium space (spec.md §2.3, §4.5). Implementations
/// must be safe to query concurrently from many path-tracing workers.
pub trait DensityProvider: Send + Sync {
    fn bounds(&self) -> Aabb;
    fn is_emissive(&self) -> bool;
    fn density(&self, p: DVec3, lambdas: &SampledWavelengths) -> MediumDensity;
    fn le(&self, p: DVec3, lambdas: &SampledWavelengths) -> SampledSpectrum;
    fn majorant_grid(&self) -> &MajorantGrid;
}
