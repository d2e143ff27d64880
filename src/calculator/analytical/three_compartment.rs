//! Three-compartment analytical calculators. The cubic `Alpha`/`Beta`/`Gamma`
//! hybrid rate constants are grounded on
//! `original_source/src/tucucore/pkmodels/threecompartmentbolus.cpp`
//! (`computeExponentials`'s trigonometric cubic solution). The original's own
//! `computeConcentrations` leaves the second and third compartments as
//! placeholder scalars (0.4/0.4/0.2 of the dose) rather than solving the
//! mammillary system; this file replaces that with the general closed-form
//! solution for an arbitrary three-state initial condition, derived by
//! Laplace transform of the linear system and partial-fraction expansion.

use crate::calculator::{
    check_condition, check_positive, check_strictly_positive, IntakeIntervalCalculator,
    IntakePointsResult, SinglePointResult,
};
use crate::error::ComputingStatus;
use crate::intake::IntakeEvent;
use crate::parameter::{ParameterId, ParameterSetEvent};
use crate::residual::Residuals;

use super::{exp_diff_over_rate, pertinent_times_for};

struct Resolved {
    d: f64,
    v1: f64,
    k12: f64,
    k21: f64,
    k13: f64,
    k31: f64,
    alpha: f64,
    beta: f64,
    gamma: f64,
}

/// Solves `s^3 + a2 s^2 + a1 s + a0 = 0` for the three positive hybrid rate
/// constants via the trigonometric (Cardano) depressed-cubic method, exactly
/// as the original's `computeExponentials` does.
fn cubic_rates(ke: f64, k12: f64, k13: f64, k21: f64, k31: f64) -> (f64, f64, f64) {
    let a0 = ke * k21 * k31;
    let a1 = ke * k31 + k21 * k31 + k21 * k13 + ke * k21 + k31 * k12;
    let a2 = ke + k12 + k13 + k21 + k31;

    let p = a1 - a2 * a2 / 3.0;
    let q = 2.0 * a2.powi(3) / 27.0 - a1 * a2 / 3.0 + a0;
    let r1 = (-(p.powi(3) / 27.0)).max(0.0).sqrt();
    let r2 = 2.0 * r1.cbrt();
    let phi = (-q / (2.0 * r1)).clamp(-1.0, 1.0).acos() / 3.0;

    let alpha = -((phi.cos()) * r2 - a2 / 3.0);
    let beta = -(((phi + 2.0 * std::f64::consts::PI / 3.0).cos()) * r2 - a2 / 3.0);
    let gamma = -(((phi + 4.0 * std::f64::consts::PI / 3.0).cos()) * r2 - a2 / 3.0);
    (alpha, beta, gamma)
}

fn resolve(macro_form: bool, intake: &IntakeEvent, parameters: &ParameterSetEvent) -> Option<Resolved> {
    let d = intake.dose;
    let v1 = parameters.get_value(ParameterId::V1)?;

    let (ke, k12, k21, k13, k31) = if macro_form {
        let cl = parameters.get_value(ParameterId::CL)?;
        let q2 = parameters.get_value(ParameterId::Q2)?;
        let v2 = parameters.get_value(ParameterId::V2)?;
        let q3 = parameters.get_value(ParameterId::Q3)?;
        let v3 = parameters.get_value(ParameterId::V3)?;
        if !check_strictly_positive(v2, "V2") || !check_strictly_positive(v3, "V3") {
            return None;
        }
        (cl / v1, q2 / v1, q2 / v2, q3 / v1, q3 / v3)
    } else {
        (
            parameters.get_value(ParameterId::Ke)?,
            parameters.get_value(ParameterId::K12)?,
            parameters.get_value(ParameterId::K21)?,
            parameters.get_value(ParameterId::K13)?,
            parameters.get_value(ParameterId::K31)?,
        )
    };

    let ok = check_positive(d, "The dose")
        && check_strictly_positive(v1, "V1")
        && check_strictly_positive(ke, "Ke")
        && check_strictly_positive(k12, "K12")
        && check_strictly_positive(k21, "K21")
        && check_strictly_positive(k13, "K13")
        && check_strictly_positive(k31, "K31")
        && check_condition(intake.nb_points > 0, "The number of points is zero or negative.")
        && check_condition(intake.interval > 0.0, "The interval time is negative.");
    if !ok {
        return None;
    }

    let (alpha, beta, gamma) = cubic_rates(ke, k12, k13, k21, k31);
    Some(Resolved { d, v1, k12, k21, k13, k31, alpha, beta, gamma })
}

/// Partial-fraction residue of `(s+p)(s+q) / [(s+alpha)(s+beta)(s+gamma)]` at
/// `s = -root`, with `(o1, o2)` the other two roots. This is the standard
/// Gibaldi & Perrier coefficient for the central-compartment bolus response.
fn r_coeff(root: f64, o1: f64, o2: f64, p: f64, q: f64) -> f64 {
    (p - root) * (q - root) / ((o1 - root) * (o2 - root))
}

/// Residue of `(s+p) / [(s+alpha)(s+beta)(s+gamma)]` at `s = -root`.
fn s_coeff(root: f64, o1: f64, o2: f64, p: f64) -> f64 {
    (p - root) / ((o1 - root) * (o2 - root))
}

/// Central-compartment exponential coefficients `(c_alpha, c_beta, c_gamma)`
/// for an impulse `y1` placed in the central compartment plus initial
/// peripheral states `x2_0`, `x3_0`.
fn central_coeffs(r: &Resolved, y1: f64, x2_0: f64, x3_0: f64) -> [f64; 3] {
    let (a, b, g) = (r.alpha, r.beta, r.gamma);
    let ra = r_coeff(a, b, g, r.k21, r.k31);
    let rb = r_coeff(b, a, g, r.k21, r.k31);
    let rg = r_coeff(g, a, b, r.k21, r.k31);
    let sa21 = s_coeff(a, b, g, r.k31);
    let sb21 = s_coeff(b, a, g, r.k31);
    let sg21 = s_coeff(g, a, b, r.k31);
    let sa31 = s_coeff(a, b, g, r.k21);
    let sb31 = s_coeff(b, a, g, r.k21);
    let sg31 = s_coeff(g, a, b, r.k21);

    [
        y1 * ra + r.k21 * x2_0 * sa21 + r.k31 * x3_0 * sa31,
        y1 * rb + r.k21 * x2_0 * sb21 + r.k31 * x3_0 * sb31,
        y1 * rg + r.k21 * x2_0 * sg21 + r.k31 * x3_0 * sg31,
    ]
}

/// Evaluates (central, peripheral2, peripheral3) given the central
/// compartment's exponential decomposition `components` (rate 0 denotes a
/// constant term, used by the infusion forcing) and the peripheral
/// compartments' own initial states. Exact: each peripheral compartment's ODE
/// depends only on the central compartment and itself, so once central(t) is
/// known as a sum of exponentials, integrating the peripheral ODEs is a
/// direct convolution.
fn three_state(r: &Resolved, components: &[(f64, f64)], x2_0: f64, x3_0: f64, t: f64) -> (f64, f64, f64) {
    let x1 = components.iter().map(|&(rate, c)| c * (-rate * t).exp()).sum();
    let x2 = x2_0 * (-r.k21 * t).exp()
        + r.k12 * components.iter().map(|&(rate, c)| c * exp_diff_over_rate(rate, r.k21, t)).sum::<f64>();
    let x3 = x3_0 * (-r.k31 * t).exp()
        + r.k13 * components.iter().map(|&(rate, c)| c * exp_diff_over_rate(rate, r.k31, t)).sum::<f64>();
    (x1, x2, x3)
}

fn bolus_at(r: &Resolved, c_in: (f64, f64, f64), t: f64) -> (f64, f64, f64) {
    let y1 = c_in.0 + r.d / r.v1;
    let coeffs = central_coeffs(r, y1, c_in.1, c_in.2);
    let components = [(r.alpha, coeffs[0]), (r.beta, coeffs[1]), (r.gamma, coeffs[2])];
    three_state(r, &components, c_in.1, c_in.2, t)
}

#[derive(Debug, Clone, Copy)]
pub struct ThreeCompBolus {
    pub macro_form: bool,
}

impl IntakeIntervalCalculator for ThreeCompBolus {
    fn required_parameters(&self) -> &'static [ParameterId] {
        if self.macro_form {
            &[ParameterId::CL, ParameterId::V1, ParameterId::Q2, ParameterId::V2, ParameterId::Q3, ParameterId::V3]
        } else {
            &[ParameterId::Ke, ParameterId::V1, ParameterId::K12, ParameterId::K21, ParameterId::K13, ParameterId::K31]
        }
    }

    fn residual_size(&self) -> usize {
        3
    }

    fn check_inputs(&self, intake: &IntakeEvent, parameters: &ParameterSetEvent) -> bool {
        resolve(self.macro_form, intake, parameters).is_some()
    }

    fn calculate_intake_points(
        &self,
        intake: &IntakeEvent,
        parameters: &ParameterSetEvent,
        residuals_in: &Residuals,
        compute_all_compartments: bool,
        fixed_density: Option<usize>,
    ) -> Result<IntakePointsResult, ComputingStatus> {
        let r = resolve(self.macro_form, intake, parameters).ok_or(ComputingStatus::BadParameters)?;
        let times = pertinent_times_for(intake, fixed_density);
        let c_in = (
            residuals_in.first().copied().unwrap_or(0.0),
            residuals_in.get(1).copied().unwrap_or(0.0),
            residuals_in.get(2).copied().unwrap_or(0.0),
        );

        let mut central = Vec::with_capacity(times.len());
        let mut p2 = Vec::with_capacity(times.len());
        let mut p3 = Vec::with_capacity(times.len());
        for &t in &times {
            let (x1, x2, x3) = bolus_at(&r, c_in, t);
            central.push(x1);
            p2.push(x2);
            p3.push(x3);
        }

        let (mut e1, mut e2, mut e3) = if intake.interval == 0.0 { (0.0, 0.0, 0.0) } else { bolus_at(&r, c_in, intake.interval) };
        e1 = e1.max(0.0);
        e2 = e2.max(0.0);
        e3 = e3.max(0.0);

        let mut concentrations = vec![central];
        if compute_all_compartments {
            concentrations.push(p2);
            concentrations.push(p3);
        }

        Ok(IntakePointsResult { times, concentrations, residuals_out: vec![e1, e2, e3] })
    }

    fn calculate_intake_single_point(
        &self,
        intake: &IntakeEvent,
        parameters: &ParameterSetEvent,
        residuals_in: &Residuals,
        at_time: f64,
        compute_all_compartments: bool,
    ) -> Result<SinglePointResult, ComputingStatus> {
        let r = resolve(self.macro_form, intake, parameters).ok_or(ComputingStatus::BadParameters)?;
        let c_in = (
            residuals_in.first().copied().unwrap_or(0.0),
            residuals_in.get(1).copied().unwrap_or(0.0),
            residuals_in.get(2).copied().unwrap_or(0.0),
        );
        let (c_at, p2_at, p3_at) = bolus_at(&r, c_in, at_time);
        let (mut e1, mut e2, mut e3) = if intake.interval == 0.0 { (0.0, 0.0, 0.0) } else { bolus_at(&r, c_in, intake.interval) };
        e1 = e1.max(0.0);
        e2 = e2.max(0.0);
        e3 = e3.max(0.0);

        let mut concentrations = vec![c_at];
        if compute_all_compartments {
            concentrations.push(p2_at);
            concentrations.push(p3_at);
        }
        Ok(SinglePointResult { concentrations, residuals_out: vec![e1, e2, e3] })
    }
}

/// Central-compartment components (rate, coeff) for a pure decay of
/// `(c1, c2, c3)` with no forcing: one term per hybrid rate constant.
fn homogeneous_components(r: &Resolved, c_in: (f64, f64, f64)) -> [(f64, f64); 3] {
    let coeffs = central_coeffs(r, c_in.0, c_in.1, c_in.2);
    [(r.alpha, coeffs[0]), (r.beta, coeffs[1]), (r.gamma, coeffs[2])]
}

/// Central-compartment components due to a constant-rate infusion alone
/// (zero initial state), obtained by convolving the unit-impulse response
/// with the step forcing: `integral_one_minus_exp(lambda, t) = 1/lambda -
/// e^{-lambda t}/lambda` contributes a constant term plus one exponential
/// term per pole.
fn forced_components(r: &Resolved, rate: f64) -> [(f64, f64); 4] {
    let unit = central_coeffs(r, 1.0, 0.0, 0.0);
    let k0 = rate * (unit[0] / r.alpha + unit[1] / r.beta + unit[2] / r.gamma);
    [
        (0.0, k0),
        (r.alpha, -rate * unit[0] / r.alpha),
        (r.beta, -rate * unit[1] / r.beta),
        (r.gamma, -rate * unit[2] / r.gamma),
    ]
}

fn infusion_at(r: &Resolved, rate: f64, tinf: f64, c_in: (f64, f64, f64), t: f64) -> (f64, f64, f64) {
    if t <= tinf {
        let homog = homogeneous_components(r, c_in);
        let forced = forced_components(r, rate);
        let components: Vec<(f64, f64)> = homog.into_iter().chain(forced).collect();
        three_state(r, &components, c_in.1, c_in.2, t)
    } else {
        let homog = homogeneous_components(r, c_in);
        let forced = forced_components(r, rate);
        let components: Vec<(f64, f64)> = homog.into_iter().chain(forced).collect();
        let at_tinf = three_state(r, &components, c_in.1, c_in.2, tinf);
        let post = homogeneous_components(r, at_tinf);
        three_state(r, &post, at_tinf.1, at_tinf.2, t - tinf)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ThreeCompInfusion {
    pub macro_form: bool,
}

impl IntakeIntervalCalculator for ThreeCompInfusion {
    fn required_parameters(&self) -> &'static [ParameterId] {
        if self.macro_form {
            &[ParameterId::CL, ParameterId::V1, ParameterId::Q2, ParameterId::V2, ParameterId::Q3, ParameterId::V3]
        } else {
            &[ParameterId::Ke, ParameterId::V1, ParameterId::K12, ParameterId::K21, ParameterId::K13, ParameterId::K31]
        }
    }

    fn residual_size(&self) -> usize {
        3
    }

    fn check_inputs(&self, intake: &IntakeEvent, parameters: &ParameterSetEvent) -> bool {
        resolve(self.macro_form, intake, parameters).is_some()
            && check_strictly_positive(intake.infusion_time.min(intake.interval), "The infusion time")
    }

    fn calculate_intake_points(
        &self,
        intake: &IntakeEvent,
        parameters: &ParameterSetEvent,
        residuals_in: &Residuals,
        compute_all_compartments: bool,
        fixed_density: Option<usize>,
    ) -> Result<IntakePointsResult, ComputingStatus> {
        let r = resolve(self.macro_form, intake, parameters).ok_or(ComputingStatus::BadParameters)?;
        let tinf = intake.infusion_time.min(intake.interval);
        if tinf <= 0.0 {
            return Err(ComputingStatus::BadParameters);
        }
        let rate = r.d / tinf / r.v1;
        let times = pertinent_times_for(intake, fixed_density);
        let c_in = (
            residuals_in.first().copied().unwrap_or(0.0),
            residuals_in.get(1).copied().unwrap_or(0.0),
            residuals_in.get(2).copied().unwrap_or(0.0),
        );

        let mut central = Vec::with_capacity(times.len());
        let mut p2 = Vec::with_capacity(times.len());
        let mut p3 = Vec::with_capacity(times.len());
        for &t in &times {
            let (x1, x2, x3) = infusion_at(&r, rate, tinf, c_in, t);
            central.push(x1);
            p2.push(x2);
            p3.push(x3);
        }

        let (mut e1, mut e2, mut e3) =
            if intake.interval == 0.0 { (0.0, 0.0, 0.0) } else { infusion_at(&r, rate, tinf, c_in, intake.interval) };
        e1 = e1.max(0.0);
        e2 = e2.max(0.0);
        e3 = e3.max(0.0);

        let mut concentrations = vec![central];
        if compute_all_compartments {
            concentrations.push(p2);
            concentrations.push(p3);
        }

        Ok(IntakePointsResult { times, concentrations, residuals_out: vec![e1, e2, e3] })
    }

    fn calculate_intake_single_point(
        &self,
        intake: &IntakeEvent,
        parameters: &ParameterSetEvent,
        residuals_in: &Residuals,
        at_time: f64,
        compute_all_compartments: bool,
    ) -> Result<SinglePointResult, ComputingStatus> {
        let r = resolve(self.macro_form, intake, parameters).ok_or(ComputingStatus::BadParameters)?;
        let tinf = intake.infusion_time.min(intake.interval);
        let rate = r.d / tinf / r.v1;
        let c_in = (
            residuals_in.first().copied().unwrap_or(0.0),
            residuals_in.get(1).copied().unwrap_or(0.0),
            residuals_in.get(2).copied().unwrap_or(0.0),
        );
        let (c_at, p2_at, p3_at) = infusion_at(&r, rate, tinf, c_in, at_time);
        let (mut e1, mut e2, mut e3) =
            if intake.interval == 0.0 { (0.0, 0.0, 0.0) } else { infusion_at(&r, rate, tinf, c_in, intake.interval) };
        e1 = e1.max(0.0);
        e2 = e2.max(0.0);
        e3 = e3.max(0.0);

        let mut concentrations = vec![c_at];
        if compute_all_compartments {
            concentrations.push(p2_at);
            concentrations.push(p3_at);
        }
        Ok(SinglePointResult { concentrations, residuals_out: vec![e1, e2, e3] })
    }
}

struct ResolvedExtra {
    base: Resolved,
    ka: f64,
    f: f64,
}

fn resolve_extra(macro_form: bool, intake: &IntakeEvent, parameters: &ParameterSetEvent) -> Option<ResolvedExtra> {
    let base = resolve(macro_form, intake, parameters)?;
    let ka = parameters.get_value(ParameterId::Ka)?;
    let f = parameters.get_value(ParameterId::F).unwrap_or(1.0);
    if !check_strictly_positive(ka, "Ka") || !check_strictly_positive(f, "F") {
        return None;
    }
    Some(ResolvedExtra { base, ka, f })
}

/// Central-compartment components due to depot absorption alone (zero
/// initial central/peripheral state): the depot decays at `ka`, contributing
/// a fourth pole alongside the three hybrid rate constants. Same convolution
/// shape as `forced_components`, with the constant infusion term replaced by
/// the depot's own exponential.
fn forced_components_extra(r: &Resolved, ka: f64, depot0: f64) -> [(f64, f64); 4] {
    let unit = central_coeffs(r, 1.0, 0.0, 0.0);
    let amp = ka * depot0;
    [
        (ka, amp * (unit[0] / (r.alpha - ka) + unit[1] / (r.beta - ka) + unit[2] / (r.gamma - ka))),
        (r.alpha, -amp * unit[0] / (r.alpha - ka)),
        (r.beta, -amp * unit[1] / (r.beta - ka)),
        (r.gamma, -amp * unit[2] / (r.gamma - ka)),
    ]
}

/// Returns (central, peripheral2, peripheral3, depot) at `t`.
fn extra_at(r: &ResolvedExtra, c_in: (f64, f64, f64), depot_in: f64, t: f64) -> (f64, f64, f64, f64) {
    let b = &r.base;
    let depot0 = depot_in + r.f * b.d;
    let depot = (depot0 * (-r.ka * t).exp()).max(0.0);

    let homog = homogeneous_components(b, c_in);
    let forced = forced_components_extra(b, r.ka, depot0);
    let components: Vec<(f64, f64)> = homog.into_iter().chain(forced).collect();
    let (x1, x2, x3) = three_state(b, &components, c_in.1, c_in.2, t);
    (x1, x2, x3, depot)
}

#[derive(Debug, Clone, Copy)]
pub struct ThreeCompExtra {
    pub macro_form: bool,
}

impl IntakeIntervalCalculator for ThreeCompExtra {
    fn required_parameters(&self) -> &'static [ParameterId] {
        if self.macro_form {
            &[
                ParameterId::CL,
                ParameterId::V1,
                ParameterId::Q2,
                ParameterId::V2,
                ParameterId::Q3,
                ParameterId::V3,
                ParameterId::Ka,
                ParameterId::F,
            ]
        } else {
            &[
                ParameterId::Ke,
                ParameterId::V1,
                ParameterId::K12,
                ParameterId::K21,
                ParameterId::K13,
                ParameterId::K31,
                ParameterId::Ka,
                ParameterId::F,
            ]
        }
    }

    fn residual_size(&self) -> usize {
        4
    }

    fn check_inputs(&self, intake: &IntakeEvent, parameters: &ParameterSetEvent) -> bool {
        resolve_extra(self.macro_form, intake, parameters).is_some()
    }

    fn calculate_intake_points(
        &self,
        intake: &IntakeEvent,
        parameters: &ParameterSetEvent,
        residuals_in: &Residuals,
        compute_all_compartments: bool,
        fixed_density: Option<usize>,
    ) -> Result<IntakePointsResult, ComputingStatus> {
        let r = resolve_extra(self.macro_form, intake, parameters).ok_or(ComputingStatus::BadParameters)?;
        let times = pertinent_times_for(intake, fixed_density);
        let c_in = (
            residuals_in.first().copied().unwrap_or(0.0),
            residuals_in.get(1).copied().unwrap_or(0.0),
            residuals_in.get(2).copied().unwrap_or(0.0),
        );
        let depot_in = residuals_in.get(3).copied().unwrap_or(0.0);

        let mut central = Vec::with_capacity(times.len());
        let mut p2 = Vec::with_capacity(times.len());
        let mut p3 = Vec::with_capacity(times.len());
        let mut depot = Vec::with_capacity(times.len());
        for &t in &times {
            let (x1, x2, x3, x4) = extra_at(&r, c_in, depot_in, t);
            central.push(x1);
            p2.push(x2);
            p3.push(x3);
            depot.push(x4);
        }

        let (mut e1, mut e2, mut e3, mut e4) =
            if intake.interval == 0.0 { (0.0, 0.0, 0.0, 0.0) } else { extra_at(&r, c_in, depot_in, intake.interval) };
        e1 = e1.max(0.0);
        e2 = e2.max(0.0);
        e3 = e3.max(0.0);
        e4 = e4.max(0.0);

        let mut concentrations = vec![central];
        if compute_all_compartments {
            concentrations.push(p2);
            concentrations.push(p3);
            concentrations.push(depot);
        }

        Ok(IntakePointsResult { times, concentrations, residuals_out: vec![e1, e2, e3, e4] })
    }

    fn calculate_intake_single_point(
        &self,
        intake: &IntakeEvent,
        parameters: &ParameterSetEvent,
        residuals_in: &Residuals,
        at_time: f64,
        compute_all_compartments: bool,
    ) -> Result<SinglePointResult, ComputingStatus> {
        let r = resolve_extra(self.macro_form, intake, parameters).ok_or(ComputingStatus::BadParameters)?;
        let c_in = (
            residuals_in.first().copied().unwrap_or(0.0),
            residuals_in.get(1).copied().unwrap_or(0.0),
            residuals_in.get(2).copied().unwrap_or(0.0),
        );
        let depot_in = residuals_in.get(3).copied().unwrap_or(0.0);
        let (c_at, p2_at, p3_at, d_at) = extra_at(&r, c_in, depot_in, at_time);
        let (mut e1, mut e2, mut e3, mut e4) =
            if intake.interval == 0.0 { (0.0, 0.0, 0.0, 0.0) } else { extra_at(&r, c_in, depot_in, intake.interval) };
        e1 = e1.max(0.0);
        e2 = e2.max(0.0);
        e3 = e3.max(0.0);
        e4 = e4.max(0.0);

        let mut concentrations = vec![c_at];
        if compute_all_compartments {
            concentrations.push(p2_at);
            concentrations.push(p3_at);
            concentrations.push(d_at);
        }
        Ok(SinglePointResult { concentrations, residuals_out: vec![e1, e2, e3, e4] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::CalculatorId;
    use approx::assert_relative_eq;
    use std::rc::Rc;

    fn make_params(values: &[(ParameterId, f64)]) -> ParameterSetEvent {
        let mut event = ParameterSetEvent::new(0.0);
        for &(id, value) in values {
            event.add_parameter_event(crate::parameter::definition::ParameterDefinition::fixed(id, value), value);
        }
        event
    }

    #[test]
    fn cubic_roots_are_positive_and_ordered() {
        let (alpha, beta, gamma) = cubic_rates(0.1, 0.3, 0.2, 0.2, 0.1);
        assert!(alpha > 0.0 && beta > 0.0 && gamma > 0.0);
        assert!(alpha >= beta && beta >= gamma);
        // Sum and product of roots must match the cubic's own coefficients.
        let a2 = 0.1 + 0.3 + 0.2 + 0.2 + 0.1;
        assert_relative_eq!(alpha + beta + gamma, a2, max_relative = 1e-6);
    }

    #[test]
    fn bolus_dose_appears_entirely_at_t_zero_and_decays() {
        let intake = IntakeEvent::new(
            0.0,
            1000.0,
            24.0,
            0.0,
            crate::intake::AbsorptionRoute::IntravascularBolus,
            6,
            Rc::new(CalculatorId::ThreeCompartmentBolusMicro),
        );
        let parameters = make_params(&[
            (ParameterId::V1, 10.0),
            (ParameterId::Ke, 0.1),
            (ParameterId::K12, 0.3),
            (ParameterId::K21, 0.2),
            (ParameterId::K13, 0.2),
            (ParameterId::K31, 0.1),
        ]);
        let calc = ThreeCompBolus { macro_form: false };
        let residuals_in = vec![0.0, 0.0, 0.0];

        let result = calc.calculate_intake_points(&intake, &parameters, &residuals_in, true, None).unwrap();
        assert_relative_eq!(result.concentrations[0][0], 100.0, max_relative = 1e-6);
        assert!(result.residuals_out.iter().all(|&c| c >= 0.0 && c.is_finite()));
        assert!(result.residuals_out[0] < 100.0);
    }

    #[test]
    fn coefficients_are_not_the_fixed_placeholder() {
        // The teacher's naive implementation hardcoded A=0.4, B=0.4, C=0.2
        // regardless of the rate constants; this derivation must not.
        let r = resolve(
            false,
            &IntakeEvent::new(
                0.0,
                1000.0,
                24.0,
                0.0,
                crate::intake::AbsorptionRoute::IntravascularBolus,
                2,
                Rc::new(CalculatorId::ThreeCompartmentBolusMicro),
            ),
            &make_params(&[
                (ParameterId::V1, 10.0),
                (ParameterId::Ke, 0.1),
                (ParameterId::K12, 0.3),
                (ParameterId::K21, 0.2),
                (ParameterId::K13, 0.2),
                (ParameterId::K31, 0.1),
            ]),
        )
        .unwrap();
        let coeffs = central_coeffs(&r, 100.0, 0.0, 0.0);
        let sum: f64 = coeffs.iter().sum();
        assert_relative_eq!(sum, 100.0, max_relative = 1e-6);
        assert!((coeffs[0] - 40.0).abs() > 1e-3 || (coeffs[1] - 40.0).abs() > 1e-3);
    }

    #[test]
    fn extra_depot_residual_decays_and_dose_eventually_clears_all_compartments() {
        let intake = IntakeEvent::new(
            0.0,
            500.0,
            24.0,
            0.0,
            crate::intake::AbsorptionRoute::Extravascular,
            6,
            Rc::new(CalculatorId::ThreeCompartmentExtraMicro),
        );
        let parameters = make_params(&[
            (ParameterId::V1, 10.0),
            (ParameterId::Ke, 0.1),
            (ParameterId::K12, 0.3),
            (ParameterId::K21, 0.2),
            (ParameterId::K13, 0.2),
            (ParameterId::K31, 0.1),
            (ParameterId::Ka, 1.0),
            (ParameterId::F, 1.0),
        ]);
        let calc = ThreeCompExtra { macro_form: false };
        let residuals_in = vec![0.0, 0.0, 0.0, 0.0];

        let result = calc.calculate_intake_points(&intake, &parameters, &residuals_in, true, None).unwrap();
        assert!(result.residuals_out.iter().all(|&c| c >= 0.0 && c.is_finite()));
        // The depot residual (last compartment) must have decayed well below the dose.
        assert!(result.residuals_out[3] < 500.0);
        assert!(result.concentrations.iter().all(|series| series.iter().all(|&c| c.is_finite())));
    }
}
