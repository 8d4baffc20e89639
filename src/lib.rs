//! Participating-media sampling core: phase functions, the medium
//! abstraction, and the majorant-DDA null-scattering free-flight sampler.
//! Surrounding renderer scaffolding (scene parsing, cameras, integrators,
//! BVH, materials, image output) is someone else's crate.

pub mod aabb;
pub mod error;
pub mod medium;
pub mod params;
pub mod phase;
pub mod presets;
pub mod providers;
pub mod sampling;
pub mod spectrum;

pub use aabb::Aabb;
pub use error::MediaError;
pub use medium::{CuboidKind, CuboidMedium, HomogeneousMedium, Medium, MediumInteraction, MediumProperties, MediumSample, Ray};
pub use params::{ParamSet, ParamValue};
pub use phase::{HenyeyGreensteinPhase, PhaseFunction, PhaseFunctionSample};
pub use spectrum::{SampledSpectrum, SampledWavelengths, Spectrum};
