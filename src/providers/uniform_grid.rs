use std::sync::Arc;

use glam::DVec3;
use rayon::prelude::*;

use crate::aabb::Aabb;
use crate::error::MediaError;
use crate::medium::MediumDensity;
use crate::params::ParamSet;
use crate::providers::{DensityProvider, MajorantGrid};
use crate::spectrum::{SampledSpectrum, SampledWavelengths, Spectrum};

const MAJORANT_RESOLUTION: (usize, usize, usize) = (16, 16, 16);

/// A dense `nx·ny·nz` array of `f32` samples, trilinearly interpolated with
/// clamp-at-border sampling. Grounded on the trilinear lookup pbrt-family
/// renderers use for their `GridDensityMedium`.
#[derive(Debug, Clone)]
struct Grid1 {
    nx: usize,
    ny: usize,
    nz: usize,
    values: Vec<f32>,
}

impl Grid1 {
    fn new(nx: usize, ny: usize, nz: usize, values: Vec<f32>) -> Result<Self, MediaError> {
        if values.len() != nx * ny * nz {
            return Err(MediaError::Configuration {
                field: "density".to_string(),
                message: format!(
                    "grid resolution {nx}x{ny}x{nz} needs {} samples, got {}",
                    nx * ny * nz,
                    values.len()
                ),
            });
        }
        Ok(Grid1 { nx, ny, nz, values })
    }

    fn at(&self, x: i64, y: i64, z: i64) -> f32 {
        if x < 0
            || y < 0
            || z < 0
            || x >= self.nx as i64
            || y >= self.ny as i64
            || z >= self.nz as i64
        {
            return 0.0;
        }
        self.values[(x as usize) + self.nx * ((y as usize) + self.ny * (z as usize))]
    }

    /// `p` in `[0, 1]^3` unit-cube coordinates relative to the provider's
    /// bounds.
    fn lookup(&self, p: DVec3) -> f64 {
        let samples = DVec3::new(
            p.x * self.nx as f64 - 0.5,
            p.y * self.ny as f64 - 0.5,
            p.z * self.nz as f64 - 0.5,
        );
        let pi = samples.floor();
        let d = samples - pi;
        let (ix, iy, iz) = (pi.x as i64, pi.y as i64, pi.z as i64);

        let d00 = lerp(d.x as f32, self.at(ix, iy, iz), self.at(ix + 1, iy, iz));
        let d10 = lerp(
            d.x as f32,
            self.at(ix, iy + 1, iz),
            self.at(ix + 1, iy + 1, iz),
        );
        let d01 = lerp(
            d.x as f32,
            self.at(ix, iy, iz + 1),
            self.at(ix + 1, iy, iz + 1),
        );
        let d11 = lerp(
            d.x as f32,
            self.at(ix, iy + 1, iz + 1),
            self.at(ix + 1, iy + 1, iz + 1),
        );
        let d0 = lerp(d.y as f32, d00, d10);
        let d1 = lerp(d.y as f32, d01, d11);
        lerp(d.z as f32, d0, d1) as f64
    }

    /// Maximum sample value over the native-grid indices whose support
    /// touches the unit-cube cell `[lo, hi]` — padded by one cell on each
    /// side since trilinear interpolation reaches one cell past a sample.
    fn max_over_unit_cell(&self, lo: DVec3, hi: DVec3) -> f32 {
        let lo_i = (
            (lo.x * self.nx as f64 - 1.5).floor() as i64,
            (lo.y * self.ny as f64 - 1.5).floor() as i64,
            (lo.z * self.nz as f64 - 1.5).floor() as i64,
        );
        let hi_i = (
            (hi.x * self.nx as f64 + 0.5).ceil() as i64,
            (hi.y * self.ny as f64 + 0.5).ceil() as i64,
            (hi.z * self.nz as f64 + 0.5).ceil() as i64,
        );
        let mut m = 0.0f32;
        for z in lo_i.2.max(0)..=hi_i.2.min(self.nz as i64 - 1) {
            for y in lo_i.1.max(0)..=hi_i.1.min(self.ny as i64 - 1) {
                for x in lo_i.0.max(0)..=hi_i.0.min(self.nx as i64 - 1) {
                    m = m.max(self.at(x, y, z));
                }
            }
        }
        m
    }
}

fn lerp(t: f32, a: f32, b: f32) -> f32 {
    (1.0 - t) * a + t * b
}

enum DensityGrid {
    Scalar(Grid1),
    SigmaPair { sigma_a: Grid1, sigma_s: Grid1 },
}

/// Dense voxel-grid density provider. Holds either a scalar density grid or
/// a `(σ_a, σ_s)` grid pair (an RGB-spectrum grid, the third source variant,
/// is dropped — upsampling RGB to a full spectrum is exactly the "spectral
/// rendering machinery beyond the sampled-spectrum data type" spec.md §1
/// excludes), plus an optional emission spectrum and scale grid.
pub struct UniformGridProvider {
    bounds: Aabb,
    density: DensityGrid,
    le_spectrum: Option<Arc<dyn Spectrum>>,
    le_scale_grid: Option<Grid1>,
    majorant: MajorantGrid,
}

impl UniformGridProvider {
    pub fn new(
        bounds: Aabb,
        density: DensityGrid,
        le_spectrum: Option<Arc<dyn Spectrum>>,
        le_scale_grid: Option<Grid1>,
    ) -> Self {
        let majorant = Self::build_majorant_grid(&density);
        UniformGridProvider {
            bounds,
            density,
            le_spectrum,
            le_scale_grid,
            majorant,
        }
    }

    pub fn from_params(params: &ParamSet) -> Result<Self, MediaError> {
        let p0 = params.get_float_array("p0");
        let p1 = params.get_float_array("p1");
        let bounds = match (p0, p1) {
            (Some(lo), Some(hi)) if lo.len() == 3 && hi.len() == 3 => Aabb::new(
                DVec3::new(lo[0], lo[1], lo[2]),
                DVec3::new(hi[0], hi[1], hi[2]),
            ),
            _ => Aabb::new(DVec3::ZERO, DVec3::ONE),
        };

        let nx = params.get_int("nx", 0) as usize;
        let ny = params.get_int("ny", 0) as usize;
        let nz = params.get_int("nz", 0) as usize;

        let density = if let Some(values) = params.get_float_array("density") {
            let values: Vec<f32> = values.iter().map(|&v| v as f32).collect();
            DensityGrid::Scalar(Grid1::new(nx, ny, nz, values)?)
        } else {
            let sigma_a = params.require_float_array("sigma_a_grid")?;
            let sigma_s = params.require_float_array("sigma_s_grid")?;
            DensityGrid::SigmaPair {
                sigma_a: Grid1::new(nx, ny, nz, sigma_a.iter().map(|&v| v as f32).collect())?,
                sigma_s: Grid1::new(nx, ny, nz, sigma_s.iter().map(|&v| v as f32).collect())?,
            }
        };

        let le_spectrum = params.get_spectrum("Le");
        let le_scale_grid = params
            .get_float_array("Lescale_grid")
            .map(|values| Grid1::new(nx, ny, nz, values.iter().map(|&v| v as f32).collect()))
            .transpose()?;

        Ok(UniformGridProvider::new(
            bounds,
            density,
            le_spectrum,
            le_scale_grid,
        ))
    }

    fn build_majorant_grid(density: &DensityGrid) -> MajorantGrid {
        let (rx, ry, rz) = MAJORANT_RESOLUTION;
        let values: Vec<f32> = (0..rx * ry * rz)
            .into_par_iter()
            .map(|i| {
                let x = i % rx;
                let y = (i / rx) % ry;
                let z = i / (rx * ry);
                let lo = DVec3::new(x as f64 / rx as f64, y as f64 / ry as f64, z as f64 / rz as f64);
                let hi = DVec3::new(
                    (x + 1) as f64 / rx as f64,
                    (y + 1) as f64 / ry as f64,
                    (z + 1) as f64 / rz as f64,
                );
                match density {
                    DensityGrid::Scalar(g) => g.max_over_unit_cell(lo, hi),
                    // Open question in spec.md §9: the DDA wants a scalar
                    // majorant for sigma_t but the provider reports a pair.
                    // sigma_aGrid.max + sigma_sGrid.max is conservative but
                    // may be loose; preserved verbatim per that note.
                    DensityGrid::SigmaPair { sigma_a, sigma_s } => {
                        sigma_a.max_over_unit_cell(lo, hi) + sigma_s.max_over_unit_cell(lo, hi)
                    }
                }
            })
            .collect();
        MajorantGrid::new(MAJORANT_RESOLUTION, values)
    }
}

impl DensityProvider for UniformGridProvider {
    fn bounds(&self) -> Aabb {
        self.bounds
    }

    fn is_emissive(&self) -> bool {
        self.le_spectrum
            .as_ref()
            .map(|s| s.max_value() > 0.0)
            .unwrap_or(false)
    }

    fn density(&self, p: DVec3, _lambdas: &SampledWavelengths) -> MediumDensity {
        let unit = self.bounds.offset(p);
        match &self.density {
            DensityGrid::Scalar(g) => MediumDensity::Scalar(g.lookup(unit)),
            DensityGrid::SigmaPair { sigma_a, sigma_s } => MediumDensity::SigmaPair {
                sigma_a: sigma_a.lookup(unit),
                sigma_s: sigma_s.lookup(unit),
            },
        }
    }

    fn le(&self, p: DVec3, lambdas: &SampledWavelengths) -> SampledSpectrum {
        match &self.le_spectrum {
            None => SampledSpectrum::ZERO,
            Some(spectrum) => {
                let scale = match &self.le_scale_grid {
                    Some(g) => g.lookup(self.bounds.offset(p)),
                    None => 1.0,
                };
                spectrum.sample_multi(lambdas) * scale
            }
        }
    }

    fn majorant_grid(&self) -> &MajorantGrid {
        &self.majorant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn constant_grid_lookup_matches_its_constant() {
        let grid = Grid1::new(2, 2, 2, vec![0.7; 8]).unwrap();
        assert_abs_diff_eq!(grid.lookup(DVec3::splat(0.5)), 0.7, epsilon = 1e-6);
        assert_abs_diff_eq!(grid.lookup(DVec3::splat(0.05)), 0.7, epsilon = 1e-6);
    }

    #[test]
    fn border_lookup_clamps_rather_than_wraps() {
        let mut values = vec![0.0f32; 8];
        values[0] = 1.0; // (0,0,0)
        let grid = Grid1::new(2, 2, 2, values).unwrap();
        let corner = grid.lookup(DVec3::splat(0.0));
        assert!(corner > 0.0);
    }

    #[test]
    fn provider_reports_density_within_bounds() {
        let grid = Grid1::new(4, 4, 4, vec![2.0; 64]).unwrap();
        let provider = UniformGridProvider::new(
            Aabb::new(DVec3::ZERO, DVec3::ONE),
            DensityGrid::Scalar(grid),
            None,
            None,
        );
        let lambdas = SampledWavelengths::hero_at(550.0);
        match provider.density(DVec3::splat(0.5), &lambdas) {
            MediumDensity::Scalar(d) => assert_abs_diff_eq!(d, 2.0, epsilon = 1e-5),
            _ => panic!("expected scalar density"),
        }
    }

    #[test]
    fn majorant_grid_bounds_the_constant_density() {
        let grid = Grid1::new(4, 4, 4, vec![3.0; 64]).unwrap();
        let provider = UniformGridProvider::new(
            Aabb::new(DVec3::ZERO, DVec3::ONE),
            DensityGrid::Scalar(grid),
            None,
            None,
        );
        let majorant = provider.majorant_grid();
        let (rx, ry, rz) = majorant.resolution();
        for z in 0..rz {
            for y in 0..ry {
                for x in 0..rx {
                    assert!(majorant.get(x, y, z) >= 3.0 - 1e-4);
                }
            }
        }
    }
}
