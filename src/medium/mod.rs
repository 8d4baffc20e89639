use glam::DVec3;
use rand::Rng;

use crate::phase::PhaseFunction;
use crate::spectrum::{SampledSpectrum, SampledWavelengths};

pub mod cuboid;
pub mod homogeneous;

pub use cuboid::CuboidMedium;
pub use homogeneous::HomogeneousMedium;

/// A ray in render space: origin, (possibly unnormalised) direction, and the
/// time it was cast at. `SampleT_maj` normalises `d` internally and scales
/// `t_max` to match (spec.md §4.3/§4.4: "Normalise the ray").
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub o: DVec3,
    pub d: DVec3,
    pub time: f64,
}

/// Either a scalar density or a `(σ_a, σ_s)` density pair, as returned by a
/// provider's `Density` query (spec.md §3).
#[derive(Debug, Clone, Copy)]
pub enum MediumDensity {
    Scalar(f64),
    SigmaPair { sigma_a: f64, sigma_s: f64 },
}

/// `{ σ_a, σ_s, phase, Le }` resolved at a point and a set of wavelengths.
/// Componentwise finite and non-negative; pure, side-effect-free, safe under
/// concurrent invocation (spec.md §4.2).
#[derive(Debug, Clone, Copy)]
pub struct MediumProperties {
    pub sigma_a: SampledSpectrum,
    pub sigma_s: SampledSpectrum,
    pub phase: PhaseFunction,
    pub le: SampledSpectrum,
}

/// A tentative or real scattering event reported to a `SampleT_maj` callback.
///
/// `medium`/`phase` are back-pointers used only to resolve phase-function
/// dispatch later — a relation, never ownership. In the source this is a
/// weak handle with a lookup table; in Rust the borrow checker gives us the
/// same guarantee for free, so it's modeled as a plain shared reference tied
/// to the `SampleT_maj` call's lifetime.
#[derive(Debug, Clone, Copy)]
pub struct MediumInteraction<'a> {
    pub p: DVec3,
    pub wo: DVec3,
    pub time: f64,
    pub sigma_a: SampledSpectrum,
    pub sigma_s: SampledSpectrum,
    pub sigma_maj: SampledSpectrum,
    pub le: SampledSpectrum,
    pub medium: &'a Medium,
    pub phase: PhaseFunction,
}

/// A `MediumInteraction` plus the majorant transmittance along the segment
/// since the previously reported interaction (or voxel entry) — per-segment,
/// not cumulative from the ray origin (see DESIGN.md open question #2).
#[derive(Debug, Clone, Copy)]
pub struct MediumSample<'a> {
    pub intr: MediumInteraction<'a>,
    pub t_maj: SampledSpectrum,
}

/// The polymorphic object the integrator sees: a tagged variant over
/// {Homogeneous, CuboidMedium<Provider>}. Lives for the entire render;
/// immutable after construction, shared read-only by all ray-sampling
/// workers (spec.md §3/§5).
pub enum Medium {
    Homogeneous(HomogeneousMedium),
    Cuboid(CuboidKind),
}

/// The cuboid medium's three recognised density providers (spec.md §2.3),
/// kept as a flat enum rather than a trait object so `SampleT_maj` stays
/// monomorphic per design note 9 ("single cuboid-medium struct holding a
/// tagged variant of provider kinds... the DDA is identical regardless of
/// provider").
pub enum CuboidKind {
    UniformGrid(CuboidMedium<crate::providers::uniform_grid::UniformGridProvider>),
    Cloud(CuboidMedium<crate::providers::cloud::CloudProvider>),
    Vdb(CuboidMedium<crate::providers::sparse_grid::SparseGridProvider>),
}

impl Medium {
    pub fn is_emissive(&self) -> bool {
        match self {
            Medium::Homogeneous(m) => m.is_emissive(),
            Medium::Cuboid(CuboidKind::UniformGrid(m)) => m.is_emissive(),
            Medium::Cuboid(CuboidKind::Cloud(m)) => m.is_emissive(),
            Medium::Cuboid(CuboidKind::Vdb(m)) => m.is_emissive(),
        }
    }

    /// `Sample(p, λ)` (spec.md §4.2): point query for the local
    /// scattering/absorption/emission coefficients. Pure and safe under
    /// concurrent invocation.
    pub fn sample(&self, p: DVec3, wo: DVec3, lambdas: &SampledWavelengths) -> MediumProperties {
        match self {
            Medium::Homogeneous(m) => m.sample(lambdas),
            Medium::Cuboid(CuboidKind::UniformGrid(m)) => m.sample(p, wo, lambdas),
            Medium::Cuboid(CuboidKind::Cloud(m)) => m.sample(p, wo, lambdas),
            Medium::Cuboid(CuboidKind::Vdb(m)) => m.sample(p, wo, lambdas),
        }
    }

    /// The central algorithm (spec.md §4.3/§4.4): draws a free-flight
    /// distance along `ray` up to `t_max` using null-scattering majorant
    /// transmittance sampling, invoking `callback` once per tentative
    /// scattering event in strictly increasing `t` order. `callback`
    /// returns `true` to keep sampling (null collision consumed) or `false`
    /// to stop (real collision accepted); this function returns within one
    /// more step of a `false`.
    pub fn sample_t_maj<F>(
        &self,
        ray: Ray,
        t_max: f64,
        u: f64,
        rng: &mut impl Rng,
        lambdas: &SampledWavelengths,
        callback: F,
    ) -> SampledSpectrum
    where
        F: FnMut(MediumSample) -> bool,
    {
        match self {
            Medium::Homogeneous(m) => m.sample_t_maj(self, ray, t_max, u, lambdas, callback),
            Medium::Cuboid(CuboidKind::UniformGrid(m)) => {
                m.sample_t_maj(self, ray, t_max, u, rng, lambdas, callback)
            }
            Medium::Cuboid(CuboidKind::Cloud(m)) => {
                m.sample_t_maj(self, ray, t_max, u, rng, lambdas, callback)
            }
            Medium::Cuboid(CuboidKind::Vdb(m)) => {
                m.sample_t_maj(self, ray, t_max, u, rng, lambdas, callback)
            }
        }
    }
}
