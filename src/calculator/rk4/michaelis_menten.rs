//! One-compartment Michaelis-Menten elimination, integrated numerically
//! since the nonlinear `Vmax*C/(Km+C)` elimination term has no closed form.
//! Grounded on
//! `original_source/src/tucucore/pkmodels/rkmichaelismentenonecomp.h/.cpp`.
//! State: `[central, depot]`.

use crate::calculator::{
    check_condition, check_positive, check_strictly_positive, IntakeIntervalCalculator,
    IntakePointsResult, SinglePointResult,
};
use crate::error::ComputingStatus;
use crate::intake::IntakeEvent;
use crate::parameter::{ParameterId, ParameterSetEvent};
use crate::residual::Residuals;

use super::super::analytical::pertinent_times_for;
use super::{all_finite, integrate_at_times};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmRoute {
    Bolus,
    Infusion,
    Extravascular,
}

struct Resolved {
    dose: f64,
    v: f64,
    km: f64,
    vmax: f64,
    ka: f64,
    f: f64,
    tinf: f64,
}

fn resolve(route: MmRoute, intake: &IntakeEvent, parameters: &ParameterSetEvent) -> Option<Resolved> {
    let dose = intake.dose;
    let v = parameters.get_value(ParameterId::V)?;
    let km = parameters.get_value(ParameterId::Km)?;
    let vmax = parameters.get_value(ParameterId::Vmax)?;

    let (ka, f, tinf) = match route {
        MmRoute::Bolus => (0.0, parameters.get_optional_value(ParameterId::F, 1.0), 0.0),
        MmRoute::Infusion => (
            parameters.get_optional_value(ParameterId::Ka, 0.0),
            parameters.get_optional_value(ParameterId::F, 1.0),
            intake.infusion_time.min(intake.interval),
        ),
        MmRoute::Extravascular => (
            parameters.get_value(ParameterId::Ka)?,
            parameters.get_value(ParameterId::F)?,
            0.0,
        ),
    };

    let ok = check_positive(dose, "The dose")
        && check_strictly_positive(v, "The volume")
        && check_strictly_positive(f, "The bioavailability")
        && check_strictly_positive(km, "The Michaelis Menten constant")
        && check_strictly_positive(vmax, "VMax")
        && check_positive(ka, "The absorption rate")
        && check_condition(intake.nb_points > 0, "The number of points is zero or negative.")
        && check_condition(intake.interval > 0.0, "The interval time is negative.")
        && (route != MmRoute::Infusion || check_strictly_positive(tinf, "The infusion time"));
    if !ok {
        return None;
    }

    Some(Resolved { dose, v, km, vmax, ka, f, tinf })
}

fn initial_state(route: MmRoute, r: &Resolved, residuals_in: &Residuals) -> [f64; 2] {
    let c0 = residuals_in.first().copied().unwrap_or(0.0);
    let c1 = residuals_in.get(1).copied().unwrap_or(0.0);
    match route {
        MmRoute::Bolus => [c0 + r.dose / r.v, c1],
        MmRoute::Infusion => [c0, c1],
        MmRoute::Extravascular => [c0, c1 + r.dose / r.v * r.f],
    }
}

fn derive(r: &Resolved, is_infusion: bool, infusion_rate: f64, t: f64, c: &[f64]) -> Vec<f64> {
    let mut d0 = r.ka * c[1] - r.vmax * c[0] / (r.km + c[0]);
    let d1 = -r.ka * c[1];
    if is_infusion && t < r.tinf - 0.001 {
        d0 += infusion_rate;
    }
    vec![d0, d1]
}

#[derive(Debug, Clone, Copy)]
pub struct MichaelisMentenOneComp {
    pub route: MmRoute,
}

impl IntakeIntervalCalculator for MichaelisMentenOneComp {
    fn required_parameters(&self) -> &'static [ParameterId] {
        match self.route {
            MmRoute::Bolus | MmRoute::Infusion => &[ParameterId::V, ParameterId::Km, ParameterId::Vmax],
            MmRoute::Extravascular => {
                &[ParameterId::V, ParameterId::Km, ParameterId::Vmax, ParameterId::F, ParameterId::Ka]
            }
        }
    }

    fn residual_size(&self) -> usize {
        2
    }

    fn check_inputs(&self, intake: &IntakeEvent, parameters: &ParameterSetEvent) -> bool {
        resolve(self.route, intake, parameters).is_some()
    }

    fn calculate_intake_points(
        &self,
        intake: &IntakeEvent,
        parameters: &ParameterSetEvent,
        residuals_in: &Residuals,
        compute_all_compartments: bool,
        fixed_density: Option<usize>,
    ) -> Result<IntakePointsResult, ComputingStatus> {
        let r = resolve(self.route, intake, parameters).ok_or(ComputingStatus::BadParameters)?;
        let y0 = initial_state(self.route, &r, residuals_in);
        let is_infusion = self.route == MmRoute::Infusion;
        let infusion_rate = if is_infusion { r.dose / r.v / r.tinf } else { 0.0 };

        let mut times = pertinent_times_for(intake, fixed_density);
        let needs_residual = !times.iter().any(|&t| t == intake.interval);
        if needs_residual && intake.interval > 0.0 {
            times.push(intake.interval);
        }

        let f = |t: f64, c: &[f64]| derive(&r, is_infusion, infusion_rate, t, c);
        let straddle = if is_infusion { Some(r.tinf) } else { None };
        let states = integrate_at_times(&f, &y0, &times, straddle);

        if states.iter().any(|s| !all_finite(s)) {
            return Err(ComputingStatus::Nan);
        }

        let residual_idx = times.len() - if needs_residual && intake.interval > 0.0 { 1 } else { 0 };
        let (output_times, output_states): (Vec<f64>, Vec<&Vec<f64>>) = if needs_residual && intake.interval > 0.0 {
            (times[..residual_idx].to_vec(), states[..residual_idx].iter().collect())
        } else {
            (times.clone(), states.iter().collect())
        };

        let central: Vec<f64> = output_states.iter().map(|s| s[0]).collect();
        let depot: Vec<f64> = output_states.iter().map(|s| s[1]).collect();

        let end_state = if intake.interval == 0.0 { vec![0.0, 0.0] } else { states.last().unwrap().clone() };
        let residual_out = vec![end_state[0].max(0.0), end_state[1].max(0.0)];

        let mut concentrations = vec![central];
        if compute_all_compartments {
            concentrations.push(depot);
        }

        Ok(IntakePointsResult { times: output_times, concentrations, residuals_out: residual_out })
    }

    fn calculate_intake_single_point(
        &self,
        intake: &IntakeEvent,
        parameters: &ParameterSetEvent,
        residuals_in: &Residuals,
        at_time: f64,
        compute_all_compartments: bool,
    ) -> Result<SinglePointResult, ComputingStatus> {
        let r = resolve(self.route, intake, parameters).ok_or(ComputingStatus::BadParameters)?;
        let y0 = initial_state(self.route, &r, residuals_in);
        let is_infusion = self.route == MmRoute::Infusion;
        let infusion_rate = if is_infusion { r.dose / r.v / r.tinf } else { 0.0 };

        let f = |t: f64, c: &[f64]| derive(&r, is_infusion, infusion_rate, t, c);
        let straddle = if is_infusion { Some(r.tinf) } else { None };
        let times = vec![at_time, intake.interval];
        let states = integrate_at_times(&f, &y0, &times, straddle);

        if states.iter().any(|s| !all_finite(s)) {
            return Err(ComputingStatus::Nan);
        }

        let at_state = &states[0];
        let end_state = if intake.interval == 0.0 { vec![0.0, 0.0] } else { states[1].clone() };
        let residual_out = vec![end_state[0].max(0.0), end_state[1].max(0.0)];

        let mut concentrations = vec![at_state[0]];
        if compute_all_compartments {
            concentrations.push(at_state[1]);
        }

        Ok(SinglePointResult { concentrations, residuals_out: residual_out })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::CalculatorId;
    use std::rc::Rc;

    fn make_params(values: &[(ParameterId, f64)]) -> ParameterSetEvent {
        let mut event = ParameterSetEvent::new(0.0);
        for &(id, value) in values {
            event.add_parameter_event(crate::parameter::definition::ParameterDefinition::fixed(id, value), value);
        }
        event
    }

    #[test]
    fn bolus_dose_decays_and_stays_nonnegative() {
        let intake = IntakeEvent::new(
            0.0,
            1000.0,
            24.0,
            0.0,
            crate::intake::AbsorptionRoute::IntravascularBolus,
            6,
            Rc::new(CalculatorId::RkMichaelisMentenOneCompBolus),
        );
        let parameters = make_params(&[(ParameterId::V, 10.0), (ParameterId::Km, 5.0), (ParameterId::Vmax, 20.0)]);
        let calc = MichaelisMentenOneComp { route: MmRoute::Bolus };
        let residuals_in = vec![0.0, 0.0];

        let result = calc.calculate_intake_points(&intake, &parameters, &residuals_in, false, None).unwrap();
        assert!(result.concentrations[0][0] > 0.0);
        assert!(result.residuals_out[0] < result.concentrations[0][0]);
        assert!(result.residuals_out.iter().all(|&c| c >= 0.0 && c.is_finite()));
    }

    #[test]
    fn extravascular_requires_ka_and_f() {
        let intake = IntakeEvent::new(
            0.0,
            500.0,
            24.0,
            0.0,
            crate::intake::AbsorptionRoute::Extravascular,
            4,
            Rc::new(CalculatorId::RkMichaelisMentenOneCompExtra),
        );
        let parameters = make_params(&[(ParameterId::V, 10.0), (ParameterId::Km, 5.0), (ParameterId::Vmax, 20.0)]);
        let calc = MichaelisMentenOneComp { route: MmRoute::Extravascular };
        assert!(!calc.check_inputs(&intake, &parameters));
    }

    #[test]
    fn infusion_straddle_does_not_blow_up() {
        let intake = IntakeEvent::new(
            0.0,
            1000.0,
            12.0,
            2.0,
            crate::intake::AbsorptionRoute::IntravascularInfusion,
            8,
            Rc::new(CalculatorId::RkMichaelisMentenOneCompInfusion),
        );
        let parameters = make_params(&[(ParameterId::V, 10.0), (ParameterId::Km, 5.0), (ParameterId::Vmax, 20.0)]);
        let calc = MichaelisMentenOneComp { route: MmRoute::Infusion };
        let residuals_in = vec![0.0, 0.0];

        let result = calc.calculate_intake_points(&intake, &parameters, &residuals_in, false, None).unwrap();
        assert!(result.concentrations[0].iter().all(|&c| c.is_finite()));
    }
}
