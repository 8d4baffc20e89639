use std::f64::consts::PI;

use glam::{DVec2, DVec3};

/// Result of sampling a phase function: the outgoing direction and its
/// density, which equal `p(ω_o, ω_i)` for a perfectly importance-sampled
/// phase function (as Henyey–Greenstein is here).
#[derive(Debug, Clone, Copy)]
pub struct PhaseFunctionSample {
    pub pdf: f64,
    pub wi: DVec3,
    pub p: f64,
}

/// A directional probability distribution over outgoing scattering
/// direction given an incident direction. Polymorphism is a tagged variant
/// (design note: no virtual allocation on the hot sampling path); the only
/// required variant is Henyey–Greenstein.
#[derive(Debug, Clone, Copy)]
pub enum PhaseFunction {
    HenyeyGreenstein(HenyeyGreensteinPhase),
}

impl PhaseFunction {
    pub fn p(&self, wo: DVec3, wi: DVec3) -> f64 {
        match self {
            PhaseFunction::HenyeyGreenstein(hg) => hg.p(wo, wi),
        }
    }

    pub fn sample_p(&self, wo: DVec3, u: DVec2) -> Option<PhaseFunctionSample> {
        match self {
            PhaseFunction::HenyeyGreenstein(hg) => hg.sample_p(wo, u),
        }
    }

    pub fn pdf(&self, wo: DVec3, wi: DVec3) -> f64 {
        match self {
            PhaseFunction::HenyeyGreenstein(hg) => hg.pdf(wo, wi),
        }
    }
}

/// Henyey–Greenstein phase function, parameterised by asymmetry `g ∈ (-1, 1)`.
/// `g > 0` favours forward scattering, `g < 0` backward, `g == 0` isotropic.
#[derive(Debug, Clone, Copy)]
pub struct HenyeyGreensteinPhase {
    pub g: f64,
}

impl HenyeyGreensteinPhase {
    pub fn new(g: f64) -> Self {
        debug_assert!(g > -1.0 && g < 1.0, "HG asymmetry must be in (-1, 1)");
        HenyeyGreensteinPhase { g }
    }

    fn density(cos_theta: f64, g: f64) -> f64 {
        let denom = 1.0 + g * g + 2.0 * g * cos_theta;
        (1.0 - g * g) / (4.0 * PI * denom * denom.sqrt())
    }

    pub fn p(&self, wo: DVec3, wi: DVec3) -> f64 {
        Self::density(wo.dot(wi), self.g)
    }

    pub fn pdf(&self, wo: DVec3, wi: DVec3) -> f64 {
        self.p(wo, wi)
    }

    pub fn sample_p(&self, wo: DVec3, u: DVec2) -> Option<PhaseFunctionSample> {
        let g = self.g;
        let cos_theta = if g.abs() > 1e-3 {
            let s = (1.0 - g * g) / (1.0 - g + 2.0 * g * u.x);
            -(1.0 / (2.0 * g)) * (1.0 + g * g - s * s)
        } else {
            1.0 - 2.0 * u.x
        };

        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
        let phi = 2.0 * PI * u.y;
        let (sin_phi, cos_phi) = phi.sin_cos();
        let (tangent, bitangent) = wo.any_orthonormal_pair();
        let wi = cos_theta * wo + sin_theta * (cos_phi * tangent + sin_phi * bitangent);

        let pdf = Self::density(cos_theta, g);
        if pdf <= 0.0 {
            return None;
        }
        Some(PhaseFunctionSample { pdf, wi, p: pdf })
    }
}
