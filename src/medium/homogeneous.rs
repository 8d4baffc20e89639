use std::sync::Arc;

use crate::error::MediaError;
use crate::medium::{Medium, MediumInteraction, MediumProperties, MediumSample, Ray};
use crate::params::ParamSet;
use crate::phase::{HenyeyGreensteinPhase, PhaseFunction};
use crate::sampling::sample_exponential;
use crate::spectrum::{SampledSpectrum, SampledWavelengths, Spectrum};

/// A medium with spatially constant σ_a, σ_s and Le, grounded on the
/// teacher's `vol_trace.rs::sample_tmaj` — the density is uniform so the
/// majorant equals σ_t everywhere and the free-flight distance is a single
/// closed-form exponential draw (spec.md §4.3).
pub struct HomogeneousMedium {
    sigma_a: Arc<dyn Spectrum>,
    sigma_s: Arc<dyn Spectrum>,
    le_spectrum: Arc<dyn Spectrum>,
    scale: f64,
    le_scale: f64,
    phase: PhaseFunction,
}

impl HomogeneousMedium {
    pub fn new(
        sigma_a: Arc<dyn Spectrum>,
        sigma_s: Arc<dyn Spectrum>,
        le_spectrum: Arc<dyn Spectrum>,
        scale: f64,
        le_scale: f64,
        g: f64,
    ) -> Self {
        HomogeneousMedium {
            sigma_a,
            sigma_s,
            le_spectrum,
            scale,
            le_scale,
            phase: PhaseFunction::HenyeyGreenstein(HenyeyGreensteinPhase::new(g)),
        }
    }

    /// Builds a homogeneous medium from a parameter dictionary. `preset`
    /// (if given and recognised) supplies σ_a/σ_s; otherwise both must be
    /// given directly, matching spec.md §6's "named scattering presets ...
    /// resolved at construction time, not re-looked-up per sample".
    pub fn from_params(params: &ParamSet) -> Result<Self, MediaError> {
        let (sigma_a, sigma_s) = match params.get_string("preset") {
            Some(name) => match crate::presets::scattering_preset(name) {
                Some(pair) => pair,
                None => {
                    log::warn!("unknown scattering preset `{name}`, falling back to direct sigma_a/sigma_s");
                    (
                        params.get_spectrum("sigma_a").ok_or_else(|| {
                            MediaError::MissingParameter("sigma_a".to_string())
                        })?,
                        params.get_spectrum("sigma_s").ok_or_else(|| {
                            MediaError::MissingParameter("sigma_s".to_string())
                        })?,
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
        let le_spectrum = params
            .get_spectrum("Le")
            .unwrap_or_else(|| Arc::new(crate::spectrum::ZERO));
        let scale = params.get_float("scale", 1.0);
        let le_scale = params.get_float("Lescale", 1.0);
        let g = params.get_float("g", 0.0);
        if !(-1.0..1.0).contains(&g) {
            return Err(MediaError::Configuration {
                field: "g".to_string(),
                message: format!("asymmetry parameter must lie in (-1, 1), got {g}"),
            });
        }
        Ok(HomogeneousMedium::new(
            sigma_a, sigma_s, le_spectrum, scale, le_scale, g,
        ))
    }

    pub fn is_emissive(&self) -> bool {
        self.le_spectrum.max_value() * self.le_scale > 0.0
    }

    pub(crate) fn sample(&self, lambdas: &SampledWavelengths) -> MediumProperties {
        MediumProperties {
            sigma_a: self.sigma_a.sample_multi(lambdas) * self.scale,
            sigma_s: self.sigma_s.sample_multi(lambdas) * self.scale,
            phase: self.phase,
            le: self.le_spectrum.sample_multi(lambdas) * self.le_scale,
        }
    }

    /// Spec.md §4.3, verbatim: normalise the ray, resolve σ_a/σ_s/Le once
    /// (they don't vary spatially), set σ_maj = σ_t, and draw a single
    /// exponential free-flight distance. If it lands before `t_max` the
    /// callback fires exactly once with the accumulated majorant
    /// transmittance up to that point; otherwise the whole-segment
    /// transmittance is returned directly with no callback invocation.
    pub(crate) fn sample_t_maj<F>(
        &self,
        medium: &Medium,
        ray: Ray,
        mut t_max: f64,
        u: f64,
        lambdas: &SampledWavelengths,
        mut callback: F,
    ) -> SampledSpectrum
    where
        F: FnMut(MediumSample) -> bool,
    {
        t_max *= ray.d.length();
        let dir = ray.d.normalize();

        let props = self.sample(lambdas);
        let sigma_maj = props.sigma_a + props.sigma_s;

        if t_max.is_infinite() {
            t_max = f64::MAX;
        }
        if sigma_maj[0] == 0.0 {
            return (sigma_maj * -t_max).exp();
        }

        let t = sample_exponential(u, sigma_maj[0]);
        if t < t_max {
            let t_maj = (sigma_maj * -t).exp();
            let intr = MediumInteraction {
                p: ray.o + dir * t,
                wo: -dir,
                time: ray.time,
                sigma_a: props.sigma_a,
                sigma_s: props.sigma_s,
                sigma_maj,
                le: props.le,
                medium,
                phase: props.phase,
            };
            callback(MediumSample { intr, t_maj });
            SampledSpectrum::ONE
        } else {
            (sigma_maj * -t_max).exp()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::ConstantSpectrum;
    use approx::assert_abs_diff_eq;
    use glam::DVec3;

    fn homogeneous(sigma_a: f64, sigma_s: f64) -> Medium {
        Medium::Homogeneous(HomogeneousMedium::new(
            Arc::new(ConstantSpectrum(sigma_a)),
            Arc::new(ConstantSpectrum(sigma_s)),
            Arc::new(ConstantSpectrum(0.0)),
            1.0,
            1.0,
            0.0,
        ))
    }

    #[test]
    fn zero_density_returns_full_transmittance_with_no_callback() {
        let medium = homogeneous(0.0, 0.0);
        let mut calls = 0;
        let lambdas = SampledWavelengths::hero_at(550.0);
        let t = medium.sample_t_maj(
            Ray { o: DVec3::ZERO, d: DVec3::X, time: 0.0 },
            10.0,
            0.5,
            &mut rand::thread_rng(),
            &lambdas,
            |_| {
                calls += 1;
                true
            },
        );
        assert_eq!(calls, 0);
        assert_abs_diff_eq!(t.average(), 1.0);
    }

    #[test]
    fn short_segment_in_dense_medium_usually_exits_without_collision() {
        let medium = homogeneous(0.0, 50.0);
        let lambdas = SampledWavelengths::hero_at(550.0);
        let t = medium.sample_t_maj(
            Ray { o: DVec3::ZERO, d: DVec3::X, time: 0.0 },
            1e-6,
            0.999999,
            &mut rand::thread_rng(),
            &lambdas,
            |_| true,
        );
        assert!(t.average() > 0.9);
    }

    #[test]
    fn callback_receives_back_pointer_to_the_same_medium() {
        let medium = homogeneous(1.0, 1.0);
        let lambdas = SampledWavelengths::hero_at(550.0);
        medium.sample_t_maj(
            Ray { o: DVec3::ZERO, d: DVec3::X, time: 0.0 },
            100.0,
            0.2,
            &mut rand::thread_rng(),
            &lambdas,
            |sample| {
                assert!(std::ptr::eq(sample.intr.medium, &medium));
                true
            },
        );
    }

    /// Round-trip property (spec.md §8): `u → 1` drives the exponential
    /// draw `t = -ln(1-u)/rate` to infinity, so the whole segment is
    /// reported with no callback and `T = exp(-tMax * sigma_t)`. (Note:
    /// spec.md §8's scenario-1 table row labels this case "u=0", which is
    /// inconsistent with its own formula in §4.3 and with this round-trip
    /// paragraph — `u=0` actually draws `t=0`, immediately below any
    /// positive tMax. The round-trip wording and the sampling formula agree
    /// with each other, so they're what's tested here.)
    #[test]
    fn u_near_one_returns_whole_segment_transmittance_no_callback() {
        let medium = homogeneous(0.5, 0.5);
        let mut calls = 0;
        let lambdas = SampledWavelengths::hero_at(550.0);
        let t = medium.sample_t_maj(
            Ray { o: DVec3::ZERO, d: DVec3::X, time: 0.0 },
            2.0,
            1.0,
            &mut rand::thread_rng(),
            &lambdas,
            |_| {
                calls += 1;
                true
            },
        );
        assert_eq!(calls, 0);
        assert_abs_diff_eq!(t.average(), (-2.0f64).exp(), epsilon = 1e-9);
    }

    /// spec.md §8 scenario 2: σ_a=σ_s=0.5 ⇒ σ_maj=1, u=0.5 ⇒ t=ln(2), the
    /// callback fires once with T_maj = exp(-ln 2) = 0.5, and the whole call
    /// returns `SampledSpectrum(1)`.
    #[test]
    fn scenario_2_closed_form_collision_distance_and_transmittance() {
        let medium = homogeneous(0.5, 0.5);
        let mut calls = 0;
        let mut observed_t_maj = 0.0;
        let lambdas = SampledWavelengths::hero_at(550.0);
        let result = medium.sample_t_maj(
            Ray { o: DVec3::ZERO, d: DVec3::X, time: 0.0 },
            2.0,
            0.5,
            &mut rand::thread_rng(),
            &lambdas,
            |sample| {
                calls += 1;
                observed_t_maj = sample.t_maj.average();
                assert_abs_diff_eq!(sample.intr.p.x, 2.0_f64.ln(), epsilon = 1e-9);
                true
            },
        );
        assert_eq!(calls, 1);
        assert_abs_diff_eq!(observed_t_maj, 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(result.average(), 1.0);
    }

    /// A non-gray (per-lane-varying) extinction whose hero lane happens to
    /// be zero must still return the componentwise `exp(-tMax * sigma_maj)`
    /// transmittance on the other lanes (spec.md §4.3), not an all-ones
    /// `SampledSpectrum` — the hero lane alone decides whether a collision
    /// *can* be drawn, not what the reported transmittance is.
    #[test]
    fn zero_hero_lane_still_reports_non_gray_transmittance() {
        use crate::spectrum::{SampledSpectrum, Spectrum};

        struct HeroZeroSpectrum;
        impl Spectrum for HeroZeroSpectrum {
            fn sample(&self, _lambda: f64) -> f64 {
                0.0
            }
            fn sample_multi(&self, _lambdas: &SampledWavelengths) -> SampledSpectrum {
                // Hero lane (index 0) is zero; the other three are not.
                SampledSpectrum(glam::DVec4::new(0.0, 2.0, 2.0, 2.0))
            }
            fn max_value(&self) -> f64 {
                2.0
            }
        }

        let medium = Medium::Homogeneous(HomogeneousMedium::new(
            Arc::new(HeroZeroSpectrum),
            Arc::new(ConstantSpectrum(0.0)),
            Arc::new(ConstantSpectrum(0.0)),
            1.0,
            1.0,
            0.0,
        ));
        let lambdas = SampledWavelengths::hero_at(550.0);
        let t = medium.sample_t_maj(
            Ray { o: DVec3::ZERO, d: DVec3::X, time: 0.0 },
            3.0,
            0.5,
            &mut rand::thread_rng(),
            &lambdas,
            |_| true,
        );
        assert_abs_diff_eq!(t.0.x, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(t.0.y, (-3.0f64 * 2.0).exp(), epsilon = 1e-9);
    }

    /// spec.md §8 statistical law: over many independent free-flight draws
    /// through a homogeneous medium of extinction σ, the sampled distances
    /// must follow `Exponential(σ)`. Checked with a Kolmogorov–Smirnov
    /// two-sided statistic against a generous critical value (scaled up from
    /// the classical `1.63/sqrt(n)` bound at α=0.01 to absorb the rare bad
    /// seed) rather than a full p-value computation, since no stats crate is
    /// in the dependency stack.
    #[test]
    fn free_flight_distances_pass_kolmogorov_smirnov_against_exponential() {
        let rate = 1.0;
        let medium = homogeneous(0.0, rate);
        let lambdas = SampledWavelengths::hero_at(550.0);
        let mut rng = rand::thread_rng();

        let n = 20_000;
        let mut distances = Vec::with_capacity(n);
        for _ in 0..n {
            let u: f64 = rng.gen();
            medium.sample_t_maj(
                Ray { o: DVec3::ZERO, d: DVec3::X, time: 0.0 },
                1.0e9,
                u,
                &mut rng,
                &lambdas,
                |sample| {
                    distances.push(sample.intr.p.x);
                    true
                },
            );
        }
        assert_eq!(distances.len(), n, "tMax chosen so a collision is drawn every time");

        distances.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let n_f = n as f64;
        let mut d_max = 0.0f64;
        for (i, &x) in distances.iter().enumerate() {
            let cdf = 1.0 - (-rate * x).exp();
            let empirical_lo = i as f64 / n_f;
            let empirical_hi = (i as f64 + 1.0) / n_f;
            d_max = d_max.max((cdf - empirical_lo).abs()).max((cdf - empirical_hi).abs());
        }
        let critical = 1.63 / n_f.sqrt();
        assert!(
            d_max < critical * 2.0,
            "KS statistic {d_max} exceeds 2x the alpha=0.01 critical value {critical}"
        );
    }
}
