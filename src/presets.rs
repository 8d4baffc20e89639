use std::sync::Arc;

use crate::spectrum::{ConstantSpectrum, Spectrum};

/// Named scattering-coefficient presets, grounded on the same
/// static-table-keyed-by-name pattern as the teacher's
/// `material::physical::ior_*` functions (there: measured complex IOR
/// tables; here: approximate, wavelength-independent scattering/absorption
/// coefficients for common participating media, in inverse millimetres).
///
/// An unknown name is the caller's problem to warn about (spec.md §6:
/// "Unknown presets produce a warning and fall through to direct spectra");
/// this function just returns `None`.
pub fn scattering_preset(name: &str) -> Option<(Arc<dyn Spectrum>, Arc<dyn Spectrum>)> {
    let (sigma_a, sigma_s): (f64, f64) = match name {
        "Skin1" => (0.0032, 0.74),
        "Wax" => (0.005, 0.6),
        "Milk" => (0.0014, 2.55),
        "Chicken1" => (0.015, 0.15),
        "Marble" => (0.0021, 2.19),
        "Ketchup" => (0.061, 0.18),
        _ => return None,
    };
    Some((
        Arc::new(ConstantSpectrum(sigma_a)),
        Arc::new(ConstantSpectrum(sigma_s)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_preset_resolves() {
        assert!(scattering_preset("Milk").is_some());
    }

    #[test]
    fn unknown_preset_is_none_not_a_panic() {
        assert!(scattering_preset("not-a-real-material").is_none());
    }
}
