use std::sync::Arc;

use glam::{DAffine3, DVec3};
use rand::Rng;

use crate::aabb::Aabb;
use crate::error::MediaError;
use crate::medium::{Medium, MediumDensity, MediumInteraction, MediumProperties, MediumSample, Ray};
use crate::params::ParamSet;
use crate::phase::{HenyeyGreensteinPhase, PhaseFunction};
use crate::providers::DensityProvider;
use crate::sampling::sample_exponential;
use crate::spectrum::{SampledSpectrum, SampledWavelengths, Spectrum};

/// A cuboid medium parameterised over its density provider, per the
/// "single cuboid-medium struct holding a tagged variant of provider kinds"
/// re-architecture note in spec.md §9. The majorant DDA below is identical
/// regardless of `P`; only `provider.density`/`provider.le` differ.
pub struct CuboidMedium<P: DensityProvider> {
    provider: P,
    bounds: Aabb,
    sigma_a: Arc<dyn Spectrum>,
    sigma_s: Arc<dyn Spectrum>,
    scale: f64,
    phase: PhaseFunction,
    render_from_medium: DAffine3,
    medium_from_render: DAffine3,
}

impl<P: DensityProvider> CuboidMedium<P> {
    pub fn new(
        provider: P,
        sigma_a: Arc<dyn Spectrum>,
        sigma_s: Arc<dyn Spectrum>,
        scale: f64,
        g: f64,
        render_from_medium: DAffine3,
    ) -> Self {
        let bounds = provider.bounds();
        CuboidMedium {
            provider,
            bounds,
            sigma_a,
            sigma_s,
            scale,
            phase: PhaseFunction::HenyeyGreenstein(HenyeyGreensteinPhase::new(g)),
            render_from_medium,
            medium_from_render: render_from_medium.inverse(),
        }
    }

    /// Reads the cuboid-medium-common parameters (`sigma_a`, `sigma_s`,
    /// `scale`, `g`, `preset`) and pairs them with an already-constructed
    /// provider — each provider variant has its own `from_params` for its
    /// own recognised keys (spec.md §6).
    pub fn from_params(
        params: &ParamSet,
        provider: P,
        render_from_medium: DAffine3,
    ) -> Result<Self, MediaError> {
        let (sigma_a, sigma_s) = match params.get_string("preset") {
            Some(name) => match crate::presets::scattering_preset(name) {
                Some(pair) => pair,
                None => {
                    log::warn!("unknown scattering preset `{name}`, falling back to direct sigma_a/sigma_s");
                    (
                        params
                            .get_spectrum("sigma_a")
                            .ok_or_else(|| MediaError::MissingParameter("sigma_a".to_string()))?,
                        params
                            .get_spectrum("sigma_s")
                            .ok_or_else(|| MediaError::MissingParameter("sigma_s".to_string()))?,
                    )
                }
            },
            None => (
                params
                    .get_spectrum("sigma_a")
                    .ok_or_else(|| MediaError::MissingParameter("sigma_a".to_string()))?,
                params
                    .get_spectrum("sigma_s")
                    .ok_or_else(|| MediaError::MissingParameter("sigma_s".to_string()))?,
            ),
        };
        let scale = params.get_float("scale", 1.0);
        let g = params.get_float("g", 0.0);
        if !(-1.0..1.0).contains(&g) {
            return Err(MediaError::Configuration {
                field: "g".to_string(),
                message: format!("asymmetry parameter must lie in (-1, 1), got {g}"),
            });
        }
        Ok(CuboidMedium::new(
            provider,
            sigma_a,
            sigma_s,
            scale,
            g,
            render_from_medium,
        ))
    }

    pub fn is_emissive(&self) -> bool {
        self.provider.is_emissive()
    }

    /// Spec.md §4.2 cuboid case: transform into medium space, query the
    /// provider's density at that point, and scale the dense σ_a/σ_s
    /// spectra by it.
    pub(crate) fn sample(&self, p: DVec3, _wo: DVec3, lambdas: &SampledWavelengths) -> MediumProperties {
        let p_medium = self.medium_from_render.transform_point3(p);
        let sigma_a = self.sigma_a.sample_multi(lambdas) * self.scale;
        let sigma_s = self.sigma_s.sample_multi(lambdas) * self.scale;
        let (a_density, s_density) = match self.provider.density(p_medium, lambdas) {
            MediumDensity::Scalar(d) => (d, d),
            MediumDensity::SigmaPair { sigma_a, sigma_s } => (sigma_a, sigma_s),
        };
        MediumProperties {
            sigma_a: sigma_a * a_density,
            sigma_s: sigma_s * s_density,
            phase: self.phase,
            le: self.provider.le(p_medium, lambdas),
        }
    }

    /// The majorant DDA (spec.md §4.4), the centerpiece of this crate.
    pub(crate) fn sample_t_maj<F>(
        &self,
        medium: &Medium,
        r_render: Ray,
        ray_t_max: f64,
        mut u: f64,
        rng: &mut impl Rng,
        lambdas: &SampledWavelengths,
        mut callback: F,
    ) -> SampledSpectrum
    where
        F: FnMut(MediumSample) -> bool,
    {
        // Ray preparation: into medium space, then normalise exactly as the
        // homogeneous medium does.
        let o_medium = self.medium_from_render.transform_point3(r_render.o);
        let d_medium = self.medium_from_render.transform_vector3(r_render.d);
        let mut t_max_normalized = ray_t_max;
        t_max_normalized *= d_medium.length();
        let dir = d_medium.normalize();

        let Some((t_min, t_max)) = self.bounds.ray_intersect(o_medium, dir, t_max_normalized) else {
            return SampledSpectrum::ONE;
        };
        debug_assert!(t_max <= t_max_normalized);

        let sigma_t = (self.sigma_a.sample_multi(lambdas) + self.sigma_s.sample_multi(lambdas))
            * self.scale;

        let diag = self.bounds.diagonal();
        let origin_unit = self.bounds.offset(o_medium);
        let d_grid = dir / diag;
        let (rx, ry, rz) = self.provider.majorant_grid().resolution();
        let resolution = DVec3::new(rx as f64, ry as f64, rz as f64);

        let rg = |t: f64, axis: usize| -> f64 {
            match axis {
                0 => origin_unit.x + t * d_grid.x,
                1 => origin_unit.y + t * d_grid.y,
                _ => origin_unit.z + t * d_grid.z,
            }
        };

        let mut voxel = [0i32; 3];
        let mut delta_t = [0f64; 3];
        let mut next_crossing_t = [0f64; 3];
        let mut step = [0i32; 3];
        let mut voxel_limit = [0i32; 3];
        let d_grid_arr = [d_grid.x, d_grid.y, d_grid.z];
        let res_arr = [resolution.x, resolution.y, resolution.z];

        for a in 0..3 {
            // Spec.md §4.4: "If D_a == -0, set to +0" — otherwise a signed
            // zero takes the `>= 0.0` branch below but divides by `-0.0`,
            // sending `next_crossing_t` to `-inf` and poisoning the DDA with
            // NaNs once `delta_t` (`+inf`) is added back in.
            let d_a = if d_grid_arr[a] == 0.0 { 0.0 } else { d_grid_arr[a] };
            let r_a = res_arr[a];
            let v = ((rg(t_min, a)) * r_a).floor() as i32;
            voxel[a] = v.clamp(0, r_a as i32 - 1);
            delta_t[a] = 1.0 / (d_a * r_a).abs();
            if d_a >= 0.0 {
                next_crossing_t[a] = t_min + ((voxel[a] as f64 + 1.0) / r_a - rg(t_min, a)) / d_a;
                step[a] = 1;
                voxel_limit[a] = r_a as i32;
            } else {
                next_crossing_t[a] = t_min + (voxel[a] as f64 / r_a - rg(t_min, a)) / d_a;
                step[a] = -1;
                voxel_limit[a] = -1;
            }
        }

        let mut t0 = t_min;
        let mut t_maj_accum = SampledSpectrum::ONE;

        loop {
            let step_axis = if next_crossing_t[0] <= next_crossing_t[1]
                && next_crossing_t[0] <= next_crossing_t[2]
            {
                0
            } else if next_crossing_t[1] <= next_crossing_t[2] {
                1
            } else {
                2
            };
            let t1 = t_max.min(next_crossing_t[step_axis]);

            let max_density = self
                .provider
                .majorant_grid()
                .get(voxel[0] as usize, voxel[1] as usize, voxel[2] as usize) as f64;
            let sigma_maj = sigma_t * max_density;

            if sigma_maj[0] == 0.0 {
                t_maj_accum = t_maj_accum * (sigma_maj * -(t1 - t0)).exp();
            } else {
                loop {
                    let t = t0 + sample_exponential(u, sigma_maj[0]);
                    u = rng.gen::<f64>();

                    if t >= t1 {
                        t_maj_accum = t_maj_accum * (sigma_maj * -(t1 - t0)).exp();
                        break;
                    }

                    let t_maj = (sigma_maj * -(t - t0)).exp() * t_maj_accum;
                    t_maj_accum = SampledSpectrum::ONE;

                    let p_medium = o_medium + dir * t;
                    let density = self.provider.density(p_medium, lambdas);
                    let (a_density, s_density) = match density {
                        MediumDensity::Scalar(d) => (d, d),
                        MediumDensity::SigmaPair { sigma_a, sigma_s } => (sigma_a, sigma_s),
                    };
                    let resolved_sigma_a = self.sigma_a.sample_multi(lambdas) * self.scale * a_density;
                    let resolved_sigma_s = self.sigma_s.sample_multi(lambdas) * self.scale * s_density;
                    let le = self.provider.le(p_medium, lambdas);

                    let p_render = self.render_from_medium.transform_point3(p_medium);
                    let intr = MediumInteraction {
                        p: p_render,
                        wo: -r_render.d.normalize(),
                        time: r_render.time,
                        sigma_a: resolved_sigma_a,
                        sigma_s: resolved_sigma_s,
                        sigma_maj,
                        le,
                        medium,
                        phase: self.phase,
                    };

                    if !callback(MediumSample { intr, t_maj }) {
                        return SampledSpectrum::ONE;
                    }
                    t0 = t;
                }
            }

            if next_crossing_t[step_axis] > t_max {
                return t_maj_accum;
            }
            voxel[step_axis] += step[step_axis];
            if voxel[step_axis] == voxel_limit[step_axis] {
                return t_maj_accum;
            }
            next_crossing_t[step_axis] += delta_t[step_axis];
            t0 = t1;
        }
    }
}
