pub mod one_compartment;
pub mod three_compartment;
pub mod two_compartment;

use crate::intake::pertinent_times;
use crate::intake::IntakeEvent;

/// Builds the time grid for one cycle, honoring `fixed_density` (used by a
/// caller retrying after `ComputingStatus::DensityError`) over the intake's
/// own requested point count.
pub(crate) fn pertinent_times_for(intake: &IntakeEvent, fixed_density: Option<usize>) -> Vec<f64> {
    let nb_points = fixed_density.unwrap_or(intake.nb_points);
    pertinent_times::for_route(intake.route).calculate_times(intake, nb_points)
}

/// (e^{-at} - e^{-bt}) / (b - a), the building block every multi-exponential
/// closed form below reduces to. Falls back to the t·e^{-at} coincident-root
/// limit when a and b are numerically indistinguishable.
pub(crate) fn exp_diff_over_rate(a: f64, b: f64, t: f64) -> f64 {
    if (a - b).abs() < 1e-9 {
        t * (-a * t).exp()
    } else {
        ((-a * t).exp() - (-b * t).exp()) / (b - a)
    }
}

/// (a·e^{-at} - b·e^{-bt}) / (a - b), the companion term that appears
/// alongside `exp_diff_over_rate` when decomposing a two-pole transfer
/// function's own-initial-condition response.
pub(crate) fn weighted_exp(a: f64, b: f64, t: f64) -> f64 {
    if (a - b).abs() < 1e-9 {
        (-a * t).exp() * (1.0 - a * t)
    } else {
        (a * (-a * t).exp() - b * (-b * t).exp()) / (a - b)
    }
}

/// (1 - e^{-rate·t}) / rate, the step-response integral used when a
/// compartment is driven by a constant-rate infusion.
pub(crate) fn integral_one_minus_exp(rate: f64, t: f64) -> f64 {
    if rate.abs() < 1e-12 {
        t
    } else {
        (1.0 - (-rate * t).exp()) / rate
    }
}
