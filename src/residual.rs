//! Fixed-length per-compartment residual vectors that seed the next cycle.

/// Per-compartment end-of-interval concentrations. Length equals the maximum
/// `residual_size()` across every calculator present in an intake series.
pub type Residuals = Vec<f64>;

pub fn zeros(size: usize) -> Residuals {
    vec![0.0; size]
}
