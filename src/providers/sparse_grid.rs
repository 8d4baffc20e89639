use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use glam::{DVec3, IVec3};
use rayon::prelude::*;

use crate::aabb::Aabb;
use crate::error::MediaError;
use crate::medium::MediumDensity;
use crate::params::ParamSet;
use crate::providers::{DensityProvider, MajorantGrid};
use crate::spectrum::physical::BlackbodySpectrum;
use crate::spectrum::{SampledSpectrum, SampledWavelengths, Spectrum};

const BRICK_SIZE: i32 = 8;
const BRICK_VOLUME: usize = (BRICK_SIZE * BRICK_SIZE * BRICK_SIZE) as usize;
const MAJORANT_RESOLUTION: (usize, usize, usize) = (64, 64, 64);

fn div_floor(a: i32, b: i32) -> i32 {
    let d = a / b;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        d - 1
    } else {
        d
    }
}

/// An opaque sparse scalar field over index space, brick-indexed for sparsity
/// (most of a volumetric effect's bounding box is empty). The on-disk format
/// itself is out of scope (spec.md §1 non-goals) — this just needs to behave
/// like one: a point-sampling operator plus a world↔index affine mapping,
/// grounded on the teacher's `VoxelOctree::load` binary-reader idiom.
pub struct SparseFloatGrid {
    origin: DVec3,
    voxel_size: f64,
    active_min: IVec3,
    active_max: IVec3,
    bricks: HashMap<IVec3, Box<[f32; BRICK_VOLUME]>>,
}

impl SparseFloatGrid {
    pub fn empty(origin: DVec3, voxel_size: f64, active_min: IVec3, active_max: IVec3) -> Self {
        SparseFloatGrid {
            origin,
            voxel_size,
            active_min,
            active_max,
            bricks: HashMap::new(),
        }
    }

    pub fn set_brick(&mut self, brick_coord: IVec3, values: Box<[f32; BRICK_VOLUME]>) {
        self.bricks.insert(brick_coord, values);
    }

    /// Header: origin (3×f64), voxel_size (f64), active_min (3×i32),
    /// active_max (3×i32), brick_count (u32), then `brick_count` records of
    /// brick_coord (3×i32) followed by `BRICK_VOLUME` f32 samples.
    pub fn load<R: Read>(reader: &mut R, path: &str) -> Result<Self, MediaError> {
        fn read_f64<R: Read>(reader: &mut R, path: &str) -> Result<f64, MediaError> {
            let mut buf = [0u8; 8];
            reader.read_exact(&mut buf).map_err(|source| MediaError::SparseGridIo {
                path: path.to_string(),
                source,
            })?;
            Ok(f64::from_le_bytes(buf))
        }
        fn read_i32<R: Read>(reader: &mut R, path: &str) -> Result<i32, MediaError> {
            let mut buf = [0u8; 4];
            reader.read_exact(&mut buf).map_err(|source| MediaError::SparseGridIo {
                path: path.to_string(),
                source,
            })?;
            Ok(i32::from_le_bytes(buf))
        }
        fn io_err(path: &str, source: std::io::Error) -> MediaError {
            MediaError::SparseGridIo { path: path.to_string(), source }
        }
        fn fmt_err(path: &str, reason: &str) -> MediaError {
            MediaError::SparseGridFormat { path: path.to_string(), reason: reason.to_string() }
        }

        let origin = DVec3::new(
            read_f64(reader, path)?,
            read_f64(reader, path)?,
            read_f64(reader, path)?,
        );
        let voxel_size = read_f64(reader, path)?;
        if voxel_size <= 0.0 {
            return Err(fmt_err(path, "voxel_size must be positive"));
        }

        let active_min = IVec3::new(
            read_i32(reader, path)?,
            read_i32(reader, path)?,
            read_i32(reader, path)?,
        );
        let active_max = IVec3::new(
            read_i32(reader, path)?,
            read_i32(reader, path)?,
            read_i32(reader, path)?,
        );

        let mut u32_buf = [0u8; 4];
        reader.read_exact(&mut u32_buf).map_err(|source| io_err(path, source))?;
        let brick_count = u32::from_le_bytes(u32_buf);

        let mut grid = SparseFloatGrid::empty(origin, voxel_size, active_min, active_max);
        for _ in 0..brick_count {
            let coord = IVec3::new(
                read_i32(reader, path)?,
                read_i32(reader, path)?,
                read_i32(reader, path)?,
            );
            let mut values = vec![0.0f32; BRICK_VOLUME];
            let mut sample_buf = [0u8; 4];
            for v in values.iter_mut() {
                reader.read_exact(&mut sample_buf).map_err(|source| io_err(path, source))?;
                *v = f32::from_le_bytes(sample_buf);
            }
            let boxed: Box<[f32; BRICK_VOLUME]> = values
                .into_boxed_slice()
                .try_into()
                .map_err(|_| fmt_err(path, "malformed brick payload"))?;
            grid.set_brick(coord, boxed);
        }
        Ok(grid)
    }

    pub fn world_bounds(&self) -> Aabb {
        Aabb::new(
            self.origin + self.active_min.as_dvec3() * self.voxel_size,
            self.origin + (self.active_max + IVec3::ONE).as_dvec3() * self.voxel_size,
        )
    }

    pub fn world_to_index(&self, p: DVec3) -> DVec3 {
        (p - self.origin) / self.voxel_size
    }

    fn voxel(&self, idx: IVec3) -> f32 {
        if idx.cmplt(self.active_min).any() || idx.cmpgt(self.active_max).any() {
            return 0.0;
        }
        let brick_coord = IVec3::new(
            div_floor(idx.x, BRICK_SIZE),
            div_floor(idx.y, BRICK_SIZE),
            div_floor(idx.z, BRICK_SIZE),
        );
        let Some(brick) = self.bricks.get(&brick_coord) else {
            return 0.0;
        };
        let local = idx - brick_coord * BRICK_SIZE;
        let i = (local.x + BRICK_SIZE * (local.y + BRICK_SIZE * local.z)) as usize;
        brick[i]
    }

    /// Point-samples the grid at the nearest index-space voxel to `p_index`.
    pub fn sample(&self, p_index: DVec3) -> f32 {
        self.voxel(IVec3::new(
            p_index.x.floor() as i32,
            p_index.y.floor() as i32,
            p_index.z.floor() as i32,
        ))
    }

    /// Maximum sample across the inclusive integer index range
    /// `[lo, hi]`, clamped to the grid's active index box.
    fn max_over_index_range(&self, lo: IVec3, hi: IVec3) -> f32 {
        let lo = lo.max(self.active_min);
        let hi = hi.min(self.active_max);
        let mut m = 0.0f32;
        for z in lo.z..=hi.z {
            for y in lo.y..=hi.y {
                for x in lo.x..=hi.x {
                    m = m.max(self.voxel(IVec3::new(x, y, z)));
                }
            }
        }
        m
    }
}

/// Sparse VDB-like density/temperature provider (spec.md §4.5). Bounds are
/// the union of both grids' world boxes; emission follows from an optional
/// temperature field through a blackbody spectrum.
pub struct SparseGridProvider {
    density: SparseFloatGrid,
    temperature: Option<SparseFloatGrid>,
    temperature_cutoff: f64,
    temperature_scale: f64,
    le_scale: f64,
    bounds: Aabb,
    majorant: MajorantGrid,
}

impl SparseGridProvider {
    pub fn new(
        density: SparseFloatGrid,
        temperature: Option<SparseFloatGrid>,
        temperature_cutoff: f64,
        temperature_scale: f64,
        le_scale: f64,
    ) -> Self {
        let mut bounds = density.world_bounds();
        if let Some(t) = &temperature {
            let tb = t.world_bounds();
            bounds = Aabb::new(bounds.min.min(tb.min), bounds.max.max(tb.max));
        }
        let majorant = Self::build_majorant_grid(&density, &bounds);
        SparseGridProvider {
            density,
            temperature,
            temperature_cutoff,
            temperature_scale,
            le_scale,
            bounds,
            majorant,
        }
    }

    pub fn from_params(params: &ParamSet) -> Result<Self, MediaError> {
        let path = params.require_string("filename")?;
        let bytes = std::fs::read(path).map_err(|source| MediaError::SparseGridIo {
            path: path.to_string(),
            source,
        })?;
        let mut cursor = std::io::Cursor::new(bytes);
        let density = SparseFloatGrid::load(&mut cursor, path)?;
        let temperature = match params.get_string("temperature_filename") {
            Some(tpath) => {
                let tbytes = std::fs::read(tpath).map_err(|source| MediaError::SparseGridIo {
                    path: tpath.to_string(),
                    source,
                })?;
                let mut tcursor = std::io::Cursor::new(tbytes);
                Some(SparseFloatGrid::load(&mut tcursor, tpath)?)
            }
            None => None,
        };
        let temperature_cutoff = params.get_float("temperaturecutoff", 0.0);
        let temperature_scale = params.get_float("temperaturescale", 1.0);
        let le_scale = params.get_float("Lescale", 1.0);
        Ok(SparseGridProvider::new(
            density,
            temperature,
            temperature_cutoff,
            temperature_scale,
            le_scale,
        ))
    }

    /// Per spec.md §4.5: resolution 64³, each cell computed in parallel by
    /// converting its world bounds to index space, expanding by one voxel
    /// of filter slop, clamping to the active index box, and taking the
    /// maximum sample across that inclusive range.
    fn build_majorant_grid(density: &SparseFloatGrid, bounds: &Aabb) -> MajorantGrid {
        let (rx, ry, rz) = MAJORANT_RESOLUTION;
        let diag = bounds.diagonal();
        let values: Vec<f32> = (0..rx * ry * rz)
            .into_par_iter()
            .map(|i| {
                let x = i % rx;
                let y = (i / rx) % ry;
                let z = i / (rx * ry);
                let lo_world = bounds.min
                    + DVec3::new(
                        x as f64 / rx as f64 * diag.x,
                        y as f64 / ry as f64 * diag.y,
                        z as f64 / rz as f64 * diag.z,
                    );
                let hi_world = bounds.min
                    + DVec3::new(
                        (x + 1) as f64 / rx as f64 * diag.x,
                        (y + 1) as f64 / ry as f64 * diag.y,
                        (z + 1) as f64 / rz as f64 * diag.z,
                    );
                let lo_idx = density.world_to_index(lo_world);
                let hi_idx = density.world_to_index(hi_world);
                let lo = IVec3::new(
                    lo_idx.x.floor() as i32 - 1,
                    lo_idx.y.floor() as i32 - 1,
                    lo_idx.z.floor() as i32 - 1,
                );
                let hi = IVec3::new(
                    hi_idx.x.ceil() as i32 + 1,
                    hi_idx.y.ceil() as i32 + 1,
                    hi_idx.z.ceil() as i32 + 1,
                );
                density.max_over_index_range(lo, hi)
            })
            .collect();
        MajorantGrid::new(MAJORANT_RESOLUTION, values)
    }
}

impl DensityProvider for SparseGridProvider {
    fn bounds(&self) -> Aabb {
        self.bounds
    }

    fn is_emissive(&self) -> bool {
        self.temperature.is_some()
    }

    fn density(&self, p: DVec3, _lambdas: &SampledWavelengths) -> MediumDensity {
        MediumDensity::Scalar(self.density.sample(self.density.world_to_index(p)) as f64)
    }

    fn le(&self, p: DVec3, lambdas: &SampledWavelengths) -> SampledSpectrum {
        let Some(temperature) = &self.temperature else {
            return SampledSpectrum::ZERO;
        };
        let t = temperature.sample(temperature.world_to_index(p)) as f64;
        let t_prime = (t - self.temperature_cutoff) * self.temperature_scale;
        if t_prime <= 100.0 {
            return SampledSpectrum::ZERO;
        }
        let blackbody: Arc<dyn Spectrum> = Arc::new(BlackbodySpectrum::new(t_prime));
        blackbody.sample_multi(lambdas) * self.le_scale
    }

    fn majorant_grid(&self) -> &MajorantGrid {
        &self.majorant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_brick_grid(value: f32) -> SparseFloatGrid {
        let mut grid = SparseFloatGrid::empty(
            DVec3::ZERO,
            1.0,
            IVec3::ZERO,
            IVec3::splat(BRICK_SIZE - 1),
        );
        grid.set_brick(IVec3::ZERO, Box::new([value; BRICK_VOLUME]));
        grid
    }

    #[test]
    fn voxel_outside_active_box_is_zero() {
        let grid = single_brick_grid(5.0);
        assert_eq!(grid.sample(DVec3::new(100.0, 100.0, 100.0)), 0.0);
    }

    #[test]
    fn voxel_inside_active_box_reads_the_brick() {
        let grid = single_brick_grid(5.0);
        assert_eq!(grid.sample(DVec3::new(1.0, 1.0, 1.0)), 5.0);
    }

    #[test]
    fn provider_without_temperature_is_never_emissive() {
        let provider = SparseGridProvider::new(single_brick_grid(1.0), None, 0.0, 1.0, 1.0);
        assert!(!provider.is_emissive());
        let lambdas = SampledWavelengths::hero_at(550.0);
        assert!(provider.le(DVec3::new(1.0, 1.0, 1.0), &lambdas).is_zero());
    }

    #[test]
    fn cold_temperature_below_cutoff_emits_nothing() {
        let density = single_brick_grid(1.0);
        let temperature = single_brick_grid(50.0);
        let provider = SparseGridProvider::new(density, Some(temperature), 0.0, 1.0, 1.0);
        let lambdas = SampledWavelengths::hero_at(550.0);
        assert!(provider.le(DVec3::new(1.0, 1.0, 1.0), &lambdas).is_zero());
    }

    #[test]
    fn hot_temperature_above_cutoff_emits() {
        let density = single_brick_grid(1.0);
        let temperature = single_brick_grid(2000.0);
        let provider = SparseGridProvider::new(density, Some(temperature), 0.0, 1.0, 1.0);
        let lambdas = SampledWavelengths::hero_at(550.0);
        assert!(provider.le(DVec3::new(1.0, 1.0, 1.0), &lambdas).max_element() > 0.0);
    }

    #[test]
    fn majorant_grid_bounds_the_active_density() {
        let provider = SparseGridProvider::new(single_brick_grid(3.0), None, 0.0, 1.0, 1.0);
        let majorant = provider.majorant_grid();
        let (rx, ry, rz) = majorant.resolution();
        let mut saw_nonzero = false;
        for z in 0..rz {
            for y in 0..ry {
                for x in 0..rx {
                    if majorant.get(x, y, z) > 0.0 {
                        saw_nonzero = true;
                        assert!(majorant.get(x, y, z) >= 3.0 - 1e-4);
                    }
                }
            }
        }
        assert!(saw_nonzero);
    }
}
