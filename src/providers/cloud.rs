use glam::DVec3;

use crate::aabb::Aabb;
use crate::error::MediaError;
use crate::medium::MediumDensity;
use crate::params::ParamSet;
use crate::providers::{DensityProvider, MajorantGrid};
use crate::spectrum::{SampledSpectrum, SampledWavelengths};

/// Standard Ken Perlin permutation table, duplicated to avoid wraparound
/// checks in the lookup. There is no noise crate anywhere in the retrieved
/// corpus, so this is hand-rolled the way the teacher hand-rolls other
/// closed-form math (`Draine::sample`, `Blackbody::sample`).
#[rustfmt::skip]
const PERM: [u8; 256] = [
    151,160,137,91,90,15,131,13,201,95,96,53,194,233,7,225,140,36,103,30,69,142,
    8,99,37,240,21,10,23,190,6,148,247,120,234,75,0,26,197,62,94,252,219,203,117,
    35,11,32,57,177,33,88,237,149,56,87,174,20,125,136,171,168,68,175,74,165,71,
    134,139,48,27,166,77,146,158,231,83,111,229,122,60,211,133,230,220,105,92,41,
    55,46,245,40,244,102,143,54,65,25,63,161,1,216,80,73,209,76,132,187,208,89,
    18,169,200,196,135,130,116,188,159,86,164,100,109,198,173,186,3,64,52,217,226,
    250,124,123,5,202,38,147,118,126,255,82,85,212,207,206,59,227,47,16,58,17,182,
    189,28,42,223,183,170,213,119,248,152,2,44,154,163,70,221,153,101,155,167,43,
    172,9,129,22,39,253,19,98,108,110,79,113,224,232,178,185,112,104,218,246,97,
    228,251,34,242,193,238,210,144,12,191,179,162,241,81,51,145,235,249,14,239,
    107,49,192,214,31,181,199,106,157,184,84,204,176,115,121,50,45,127,4,150,254,
    138,236,205,93,222,114,67,29,24,72,243,141,128,195,78,66,215,61,156,180,
];

fn perm(i: i32) -> u8 {
    PERM[(i & 255) as usize]
}

fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(t: f64, a: f64, b: f64) -> f64 {
    a + t * (b - a)
}

fn grad(hash: u8, x: f64, y: f64, z: f64) -> f64 {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        z
    };
    (if h & 1 == 0 { u } else { -u }) + (if h & 2 == 0 { v } else { -v })
}

/// Classic Perlin gradient noise, range approximately `[-1, 1]`.
fn perlin_noise(p: DVec3) -> f64 {
    let xi = p.x.floor() as i32;
    let yi = p.y.floor() as i32;
    let zi = p.z.floor() as i32;
    let x = p.x - p.x.floor();
    let y = p.y - p.y.floor();
    let z = p.z - p.z.floor();
    let u = fade(x);
    let v = fade(y);
    let w = fade(z);

    let a = perm(xi) as i32 + yi;
    let aa = perm(a) as i32 + zi;
    let ab = perm(a + 1) as i32 + zi;
    let b = perm(xi + 1) as i32 + yi;
    let ba = perm(b) as i32 + zi;
    let bb = perm(b + 1) as i32 + zi;

    lerp(
        w,
        lerp(
            v,
            lerp(u, grad(perm(aa), x, y, z), grad(perm(ba), x - 1.0, y, z)),
            lerp(
                u,
                grad(perm(ab), x, y - 1.0, z),
                grad(perm(bb), x - 1.0, y - 1.0, z),
            ),
        ),
        lerp(
            v,
            lerp(
                u,
                grad(perm(aa + 1), x, y, z - 1.0),
                grad(perm(ba + 1), x - 1.0, y, z - 1.0),
            ),
            lerp(
                u,
                grad(perm(ab + 1), x, y - 1.0, z - 1.0),
                grad(perm(bb + 1), x - 1.0, y - 1.0, z - 1.0),
            ),
        ),
    )
}

/// Vector-valued noise used to warp the sample point before accumulating
/// scalar octaves, built from three independently offset scalar lookups.
fn vec_noise(p: DVec3) -> DVec3 {
    const OFFSET_Y: DVec3 = DVec3::new(19.3, 71.1, 5.7);
    const OFFSET_Z: DVec3 = DVec3::new(113.5, 2.1, 49.9);
    DVec3::new(
        perlin_noise(p),
        perlin_noise(p + OFFSET_Y),
        perlin_noise(p + OFFSET_Z),
    )
}

/// Procedural cloud density field (spec.md §4.5): five octaves of Perlin
/// noise with optional wispy domain warping, shaped by an altitude falloff
/// so clouds thin out with height and thicken below `y = 0`.
pub struct CloudProvider {
    bounds: Aabb,
    density: f64,
    wispiness: f64,
    frequency: f64,
    majorant: MajorantGrid,
}

impl CloudProvider {
    pub fn new(bounds: Aabb, density: f64, wispiness: f64, frequency: f64) -> Self {
        CloudProvider {
            bounds,
            density,
            wispiness,
            frequency,
            majorant: MajorantGrid::new((1, 1, 1), vec![1.0]),
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
            _ => Aabb::new(DVec3::splat(-1.0), DVec3::splat(1.0)),
        };
        let density = params.get_float("density", 1.0);
        let wispiness = params.get_float("wispiness", 0.0);
        let frequency = params.get_float("frequency", 1.0);
        Ok(CloudProvider::new(bounds, density, wispiness, frequency))
    }

    fn eval(&self, p: DVec3) -> f64 {
        let mut pp = p * self.frequency;
        if self.wispiness > 0.0 {
            let warp = vec_noise(pp * 10.0) * (0.05 * self.wispiness)
                + vec_noise(pp * 19.9) * (0.025 * self.wispiness);
            pp += warp;
        }

        let mut d = 0.0;
        let mut omega = 0.5;
        let mut lambda = 1.0;
        for _ in 0..5 {
            d += omega * perlin_noise(pp * lambda);
            omega *= 0.5;
            lambda *= 1.99;
        }

        let shaped = ((1.0 - p.y) * 4.5 * self.density * d).clamp(0.0, 1.0)
            + 2.0 * (0.5 - p.y).max(0.0);
        shaped.clamp(0.0, 1.0)
    }
}

impl DensityProvider for CloudProvider {
    fn bounds(&self) -> Aabb {
        self.bounds
    }

    fn is_emissive(&self) -> bool {
        false
    }

    fn density(&self, p: DVec3, _lambdas: &SampledWavelengths) -> MediumDensity {
        MediumDensity::Scalar(self.eval(p))
    }

    fn le(&self, _p: DVec3, _lambdas: &SampledWavelengths) -> SampledSpectrum {
        SampledSpectrum::ZERO
    }

    fn majorant_grid(&self) -> &MajorantGrid {
        &self.majorant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn density_stays_within_unit_range() {
        let provider = CloudProvider::new(Aabb::new(DVec3::splat(-1.0), DVec3::splat(1.0)), 1.0, 0.3, 1.0);
        let lambdas = SampledWavelengths::hero_at(550.0);
        for i in 0..20 {
            let p = DVec3::new(i as f64 * 0.37, i as f64 * -0.11, i as f64 * 0.71);
            match provider.density(p, &lambdas) {
                MediumDensity::Scalar(d) => assert!((0.0..=1.0).contains(&d), "density {d} out of range"),
                _ => panic!("cloud provider always returns scalar density"),
            }
        }
    }

    #[test]
    fn well_below_horizon_density_clamps_high() {
        let provider = CloudProvider::new(Aabb::new(DVec3::splat(-10.0), DVec3::splat(10.0)), 1.0, 0.0, 1.0);
        let lambdas = SampledWavelengths::hero_at(550.0);
        match provider.density(DVec3::new(0.0, -5.0, 0.0), &lambdas) {
            MediumDensity::Scalar(d) => assert!(d > 0.9),
            _ => panic!("cloud provider always returns scalar density"),
        }
    }

    #[test]
    fn is_never_emissive() {
        let provider = CloudProvider::new(Aabb::new(DVec3::ZERO, DVec3::ONE), 1.0, 0.0, 1.0);
        assert!(!provider.is_emissive());
    }

    #[test]
    fn majorant_is_a_single_cell_of_one() {
        let provider = CloudProvider::new(Aabb::new(DVec3::ZERO, DVec3::ONE), 1.0, 0.0, 1.0);
        assert_eq!(provider.majorant_grid().resolution(), (1, 1, 1));
        assert_eq!(provider.majorant_grid().get(0, 0, 0), 1.0);
    }
}
