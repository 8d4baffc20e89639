/// Draws a free-flight distance from `Exponential(rate)` given a canonical
/// uniform sample `u ∈ [0, 1)`, i.e. `t = -ln(1 - u) / rate`.
///
/// `rate` must be strictly positive; callers branch around `rate == 0`
/// before reaching here (spec: "if σ_maj[0] = 0, no interaction is
/// possible").
pub fn sample_exponential(u: f64, rate: f64) -> f64 {
    debug_assert!(rate > 0.0, "sample_exponential called with non-positive rate");
    -(1.0 - u).ln() / rate
}
