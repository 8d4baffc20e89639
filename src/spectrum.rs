use std::cmp::Ordering;
use std::ops::{Add, AddAssign, Div, Index, Mul, MulAssign, Sub};

use glam::DVec4;
use ordered_float::OrderedFloat;

pub mod physical;

/// The set of wavelengths a path is currently carrying samples at.
///
/// Cardinality equals [`SampledSpectrum`]'s width (4); the first lane is the
/// "hero" wavelength used whenever a single scalar extinction is needed, see
/// [`crate::medium::homogeneous`] and the majorant DDA.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampledWavelengths(pub DVec4);

impl SampledWavelengths {
    pub fn new(lambdas: DVec4) -> Self {
        SampledWavelengths(lambdas)
    }

    pub fn hero(&self) -> f64 {
        self.0.x
    }

    /// All four lanes pinned to the same wavelength. Convenient for tests
    /// and for callers that haven't set up proper hero-wavelength spacing.
    pub fn hero_at(lambda: f64) -> Self {
        SampledWavelengths(DVec4::splat(lambda))
    }
}

/// A fixed-width vector of spectral values, one per sampled wavelength.
///
/// Componentwise non-negative for every physical quantity this crate
/// produces (`σ_a`, `σ_s`, `Le`, transmittance); a value type, cheap to
/// copy, safe to share across worker threads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampledSpectrum(pub DVec4);

impl SampledSpectrum {
    pub const ZERO: SampledSpectrum = SampledSpectrum(DVec4::ZERO);
    pub const ONE: SampledSpectrum = SampledSpectrum(DVec4::ONE);

    pub fn splat(v: f64) -> Self {
        SampledSpectrum(DVec4::splat(v))
    }

    pub fn is_zero(self) -> bool {
        self.0 == DVec4::ZERO
    }

    pub fn max_element(self) -> f64 {
        self.0.max_element()
    }

    pub fn average(self) -> f64 {
        self.0.element_sum() / 4.0
    }

    pub fn exp(self) -> Self {
        SampledSpectrum(DVec4::new(
            self.0.x.exp(),
            self.0.y.exp(),
            self.0.z.exp(),
            self.0.w.exp(),
        ))
    }

    /// Componentwise finite and non-negative, as required of every
    /// `MediumProperties` field (spec invariant: no NaNs, no negative
    /// coefficients leak out of a provider).
    pub fn is_finite_non_negative(self) -> bool {
        self.0.x.is_finite()
            && self.0.y.is_finite()
            && self.0.z.is_finite()
            && self.0.w.is_finite()
            && self.0.cmpge(DVec4::ZERO).all()
    }
}

impl Index<usize> for SampledSpectrum {
    type Output = f64;
    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

impl Add for SampledSpectrum {
    type Output = SampledSpectrum;
    fn add(self, rhs: SampledSpectrum) -> SampledSpectrum {
        SampledSpectrum(self.0 + rhs.0)
    }
}

impl AddAssign for SampledSpectrum {
    fn add_assign(&mut self, rhs: SampledSpectrum) {
        self.0 += rhs.0;
    }
}

impl Sub for SampledSpectrum {
    type Output = SampledSpectrum;
    fn sub(self, rhs: SampledSpectrum) -> SampledSpectrum {
        SampledSpectrum(self.0 - rhs.0)
    }
}

impl Mul for SampledSpectrum {
    type Output = SampledSpectrum;
    fn mul(self, rhs: SampledSpectrum) -> SampledSpectrum {
        SampledSpectrum(self.0 * rhs.0)
    }
}

impl MulAssign for SampledSpectrum {
    fn mul_assign(&mut self, rhs: SampledSpectrum) {
        self.0 *= rhs.0;
    }
}

impl Mul<f64> for SampledSpectrum {
    type Output = SampledSpectrum;
    fn mul(self, rhs: f64) -> SampledSpectrum {
        SampledSpectrum(self.0 * rhs)
    }
}

impl Div for SampledSpectrum {
    type Output = SampledSpectrum;
    fn div(self, rhs: SampledSpectrum) -> SampledSpectrum {
        SampledSpectrum(self.0 / rhs.0)
    }
}

impl Div<f64> for SampledSpectrum {
    type Output = SampledSpectrum;
    fn div(self, rhs: f64) -> SampledSpectrum {
        SampledSpectrum(self.0 / rhs)
    }
}

/// An opaque spectral distribution: a continuous function of wavelength that
/// can be resolved at the hero wavelengths carried by a path.
pub trait Spectrum: Send + Sync {
    fn sample(&self, lambda: f64) -> f64;

    fn sample_multi(&self, lambdas: &SampledWavelengths) -> SampledSpectrum {
        SampledSpectrum(lambdas.0.map(|l| self.sample(l)))
    }

    fn max_value(&self) -> f64;
}

impl<S: Spectrum + ?Sized> Spectrum for &S {
    fn sample(&self, lambda: f64) -> f64 {
        S::sample(self, lambda)
    }

    fn max_value(&self) -> f64 {
        S::max_value(self)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConstantSpectrum(pub f64);

pub const ZERO: ConstantSpectrum = ConstantSpectrum(0.0);

impl Spectrum for ConstantSpectrum {
    fn sample(&self, _lambda: f64) -> f64 {
        self.0
    }

    fn max_value(&self) -> f64 {
        self.0
    }
}

/// Piecewise-linear spectrum over sorted `(lambda, value)` control points,
/// clamped (not extrapolated) outside the given range.
#[derive(Debug, Clone)]
pub struct PiecewiseLinearSpectrum {
    points: Box<[(f64, f64)]>,
}

impl PiecewiseLinearSpectrum {
    pub fn from_points(points: &[(f64, f64)]) -> Self {
        assert!(!points.is_empty(), "spectrum needs at least one point");
        let mut points = points.to_vec();
        points.sort_by_key(|&(l, _)| OrderedFloat(l));
        PiecewiseLinearSpectrum {
            points: points.into_boxed_slice(),
        }
    }
}

impl Spectrum for PiecewiseLinearSpectrum {
    fn sample(&self, lambda: f64) -> f64 {
        if self.points.len() == 1 || lambda <= self.points[0].0 {
            return self.points[0].1;
        }
        if lambda >= self.points[self.points.len() - 1].0 {
            return self.points[self.points.len() - 1].1;
        }
        let i = self
            .points
            .binary_search_by(|&(l, _)| match l <= lambda {
                true => Ordering::Less,
                false => Ordering::Greater,
            })
            .unwrap_err();
        let (l0, v0) = self.points[i - 1];
        let (l1, v1) = self.points[i];
        let t = (lambda - l0) / (l1 - l0);
        v0 + (v1 - v0) * t
    }

    fn max_value(&self) -> f64 {
        self.points
            .iter()
            .map(|&(_, v)| OrderedFloat(v))
            .max()
            .unwrap()
            .0
    }
}
