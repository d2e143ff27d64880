//! One-compartment analytical calculators. Grounded on
//! `original_source/src/tucucore/pkmodels/onecompartmentbolus.cpp` and
//! `onecompartmentinfusion.cpp`; the extravascular (+lag) forms follow the
//! standard Ka/Ke partial-fraction solution, since the distilled spec leaves
//! that variant's exact formula to the conventional PK identity.

use crate::calculator::{
    check_condition, check_positive, check_strictly_positive, IntakeIntervalCalculator,
    IntakePointsResult, SinglePointResult,
};
use crate::error::ComputingStatus;
use crate::intake::IntakeEvent;
use crate::parameter::{ParameterId, ParameterSetEvent};
use crate::residual::Residuals;

use super::pertinent_times_for;

struct Resolved {
    d: f64,
    v: f64,
    ke: f64,
}

fn resolve(macro_form: bool, intake: &IntakeEvent, parameters: &ParameterSetEvent) -> Option<Resolved> {
    let d = intake.dose;
    let v = parameters.get_value(ParameterId::V)?;
    let ke = if macro_form {
        let cl = parameters.get_value(ParameterId::CL)?;
        if !check_strictly_positive(cl, "CL") {
            return None;
        }
        cl / v
    } else {
        parameters.get_value(ParameterId::Ke)?
    };

    let ok = check_positive(d, "The dose")
        && check_strictly_positive(v, "The volume")
        && check_strictly_positive(ke, "Ke")
        && check_condition(intake.nb_points > 0, "The number of points is zero or negative.")
        && check_condition(intake.interval > 0.0, "The interval time is negative.");

    if ok {
        Some(Resolved { d, v, ke })
    } else {
        None
    }
}

fn bolus_at(r: &Resolved, c_in: f64, t: f64) -> f64 {
    (r.d / r.v + c_in) * (-r.ke * t).exp()
}

#[derive(Debug, Clone, Copy)]
pub struct OneCompBolus {
    pub macro_form: bool,
}

impl IntakeIntervalCalculator for OneCompBolus {
    fn required_parameters(&self) -> &'static [ParameterId] {
        if self.macro_form {
            &[ParameterId::CL, ParameterId::V]
        } else {
            &[ParameterId::Ke, ParameterId::V]
        }
    }

    fn residual_size(&self) -> usize {
        1
    }

    fn check_inputs(&self, intake: &IntakeEvent, parameters: &ParameterSetEvent) -> bool {
        resolve(self.macro_form, intake, parameters).is_some()
    }

    fn calculate_intake_points(
        &self,
        intake: &IntakeEvent,
        parameters: &ParameterSetEvent,
        residuals_in: &Residuals,
        _compute_all_compartments: bool,
        fixed_density: Option<usize>,
    ) -> Result<IntakePointsResult, ComputingStatus> {
        let resolved = resolve(self.macro_form, intake, parameters).ok_or(ComputingStatus::BadParameters)?;
        let times = pertinent_times_for(intake, fixed_density);
        let c_in = residuals_in.first().copied().unwrap_or(0.0);

        let concentrations: Vec<f64> = times.iter().map(|&t| bolus_at(&resolved, c_in, t)).collect();
        let mut residual_out = if intake.interval == 0.0 {
            0.0
        } else {
            bolus_at(&resolved, c_in, intake.interval)
        };
        if residual_out < 0.0 {
            log::warn!("The concentration is negative.");
            residual_out = residual_out.max(0.0);
        }

        Ok(IntakePointsResult {
            times,
            concentrations: vec![concentrations],
            residuals_out: vec![residual_out],
        })
    }

    fn calculate_intake_single_point(
        &self,
        intake: &IntakeEvent,
        parameters: &ParameterSetEvent,
        residuals_in: &Residuals,
        at_time: f64,
        _compute_all_compartments: bool,
    ) -> Result<SinglePointResult, ComputingStatus> {
        let resolved = resolve(self.macro_form, intake, parameters).ok_or(ComputingStatus::BadParameters)?;
        let c_in = residuals_in.first().copied().unwrap_or(0.0);
        let c_at = bolus_at(&resolved, c_in, at_time);
        let residual_out = if intake.interval == 0.0 { 0.0 } else { bolus_at(&resolved, c_in, intake.interval) };

        Ok(SinglePointResult {
            concentrations: vec![c_at],
            residuals_out: vec![residual_out.max(0.0)],
        })
    }
}

fn infusion_at(r: &Resolved, tinf: f64, c_in: f64, t: f64) -> f64 {
    if t <= tinf {
        (r.d / (r.v * tinf * r.ke)) * (1.0 - (-r.ke * t).exp()) + c_in * (-r.ke * t).exp()
    } else {
        let c_end = (r.d / (r.v * tinf * r.ke)) * (1.0 - (-r.ke * tinf).exp()) + c_in * (-r.ke * tinf).exp();
        c_end * (-r.ke * (t - tinf)).exp()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OneCompInfusion {
    pub macro_form: bool,
}

impl IntakeIntervalCalculator for OneCompInfusion {
    fn required_parameters(&self) -> &'static [ParameterId] {
        if self.macro_form {
            &[ParameterId::CL, ParameterId::V]
        } else {
            &[ParameterId::Ke, ParameterId::V]
        }
    }

    fn residual_size(&self) -> usize {
        1
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
        _compute_all_compartments: bool,
        fixed_density: Option<usize>,
    ) -> Result<IntakePointsResult, ComputingStatus> {
        let resolved = resolve(self.macro_form, intake, parameters).ok_or(ComputingStatus::BadParameters)?;
        let tinf = intake.infusion_time.min(intake.interval);
        if tinf <= 0.0 {
            return Err(ComputingStatus::BadParameters);
        }
        let times = pertinent_times_for(intake, fixed_density);
        let c_in = residuals_in.first().copied().unwrap_or(0.0);

        let concentrations: Vec<f64> = times.iter().map(|&t| infusion_at(&resolved, tinf, c_in, t)).collect();
        let mut residual_out = if intake.interval == 0.0 {
            0.0
        } else {
            infusion_at(&resolved, tinf, c_in, intake.interval)
        };
        if residual_out < 0.0 {
            log::warn!("The concentration is negative.");
            residual_out = residual_out.max(0.0);
        }

        Ok(IntakePointsResult {
            times,
            concentrations: vec![concentrations],
            residuals_out: vec![residual_out],
        })
    }

    fn calculate_intake_single_point(
        &self,
        intake: &IntakeEvent,
        parameters: &ParameterSetEvent,
        residuals_in: &Residuals,
        at_time: f64,
        _compute_all_compartments: bool,
    ) -> Result<SinglePointResult, ComputingStatus> {
        let resolved = resolve(self.macro_form, intake, parameters).ok_or(ComputingStatus::BadParameters)?;
        let tinf = intake.infusion_time.min(intake.interval);
        let c_in = residuals_in.first().copied().unwrap_or(0.0);
        let c_at = infusion_at(&resolved, tinf, c_in, at_time);
        let residual_out = if intake.interval == 0.0 { 0.0 } else { infusion_at(&resolved, tinf, c_in, intake.interval) };

        Ok(SinglePointResult {
            concentrations: vec![c_at],
            residuals_out: vec![residual_out.max(0.0)],
        })
    }
}

struct ResolvedExtra {
    d: f64,
    v: f64,
    ke: f64,
    ka: f64,
    f: f64,
    tlag: f64,
}

fn resolve_extra(macro_form: bool, lag: bool, intake: &IntakeEvent, parameters: &ParameterSetEvent) -> Option<ResolvedExtra> {
    let d = intake.dose;
    let v = parameters.get_value(ParameterId::V)?;
    let ke = if macro_form {
        parameters.get_value(ParameterId::CL)? / v
    } else {
        parameters.get_value(ParameterId::Ke)?
    };
    let ka = parameters.get_value(ParameterId::Ka)?;
    let f = parameters.get_value(ParameterId::F).unwrap_or(1.0);
    let tlag = if lag { parameters.get_value(ParameterId::Tlag)? } else { 0.0 };

    let ok = check_positive(d, "The dose")
        && check_strictly_positive(v, "The volume")
        && check_strictly_positive(ke, "Ke")
        && check_strictly_positive(ka, "Ka")
        && check_strictly_positive(f, "F")
        && check_positive(tlag, "Tlag")
        && check_condition(intake.nb_points > 0, "The number of points is zero or negative.")
        && check_condition(intake.interval > 0.0, "The interval time is negative.");

    if ok {
        Some(ResolvedExtra { d, v, ke, ka, f, tlag })
    } else {
        None
    }
}

/// Returns (central, depot) at time `t`, given the residuals-in (central,
/// depot) and the time elapsed since `Tlag` (zero while still lagging).
fn extra_at(r: &ResolvedExtra, c_in: f64, depot_in: f64, t: f64) -> (f64, f64) {
    if t < r.tlag {
        return (c_in * (-r.ke * t).exp(), depot_in);
    }

    let tt = t - r.tlag;
    let depot0 = depot_in + r.f * r.d;
    let depot = depot0 * (-r.ka * tt).exp();
    let central_at_lag = c_in * (-r.ke * r.tlag).exp();

    let central = if (r.ka - r.ke).abs() > 1e-10 {
        central_at_lag * (-r.ke * tt).exp()
            + (r.ka * depot0 / (r.ka - r.ke)) * ((-r.ke * tt).exp() - (-r.ka * tt).exp())
    } else {
        central_at_lag * (-r.ke * tt).exp() + r.ka * depot0 * tt * (-r.ke * tt).exp()
    };

    (central, depot)
}

#[derive(Debug, Clone, Copy)]
pub struct OneCompExtra {
    pub macro_form: bool,
    pub lag: bool,
}

impl IntakeIntervalCalculator for OneCompExtra {
    fn required_parameters(&self) -> &'static [ParameterId] {
        match (self.macro_form, self.lag) {
            (false, false) => &[ParameterId::Ke, ParameterId::V, ParameterId::Ka, ParameterId::F],
            (true, false) => &[ParameterId::CL, ParameterId::V, ParameterId::Ka, ParameterId::F],
            (false, true) => &[ParameterId::Ke, ParameterId::V, ParameterId::Ka, ParameterId::F, ParameterId::Tlag],
            (true, true) => &[ParameterId::CL, ParameterId::V, ParameterId::Ka, ParameterId::F, ParameterId::Tlag],
        }
    }

    fn residual_size(&self) -> usize {
        2
    }

    fn check_inputs(&self, intake: &IntakeEvent, parameters: &ParameterSetEvent) -> bool {
        resolve_extra(self.macro_form, self.lag, intake, parameters).is_some()
    }

    fn calculate_intake_points(
        &self,
        intake: &IntakeEvent,
        parameters: &ParameterSetEvent,
        residuals_in: &Residuals,
        compute_all_compartments: bool,
        fixed_density: Option<usize>,
    ) -> Result<IntakePointsResult, ComputingStatus> {
        let resolved = resolve_extra(self.macro_form, self.lag, intake, parameters).ok_or(ComputingStatus::BadParameters)?;
        let times = pertinent_times_for(intake, fixed_density);
        let c_in = residuals_in.first().copied().unwrap_or(0.0);
        let depot_in = residuals_in.get(1).copied().unwrap_or(0.0);

        let mut central = Vec::with_capacity(times.len());
        let mut depot = Vec::with_capacity(times.len());
        for &t in &times {
            let (c, d) = extra_at(&resolved, c_in, depot_in, t);
            central.push(c);
            depot.push(d);
        }

        let (mut central_end, mut depot_end) = if intake.interval == 0.0 {
            (0.0, 0.0)
        } else {
            extra_at(&resolved, c_in, depot_in, intake.interval)
        };
        central_end = central_end.max(0.0);
        depot_end = depot_end.max(0.0);

        let mut concentrations = vec![central];
        if compute_all_compartments {
            concentrations.push(depot);
        }

        Ok(IntakePointsResult {
            times,
            concentrations,
            residuals_out: vec![central_end, depot_end],
        })
    }

    fn calculate_intake_single_point(
        &self,
        intake: &IntakeEvent,
        parameters: &ParameterSetEvent,
        residuals_in: &Residuals,
        at_time: f64,
        compute_all_compartments: bool,
    ) -> Result<SinglePointResult, ComputingStatus> {
        let resolved = resolve_extra(self.macro_form, self.lag, intake, parameters).ok_or(ComputingStatus::BadParameters)?;
        let c_in = residuals_in.first().copied().unwrap_or(0.0);
        let depot_in = residuals_in.get(1).copied().unwrap_or(0.0);

        let (c_at, depot_at) = extra_at(&resolved, c_in, depot_in, at_time);
        let (mut central_end, mut depot_end) = if intake.interval == 0.0 {
            (0.0, 0.0)
        } else {
            extra_at(&resolved, c_in, depot_in, intake.interval)
        };
        central_end = central_end.max(0.0);
        depot_end = depot_end.max(0.0);

        let mut concentrations = vec![c_at];
        if compute_all_compartments {
            concentrations.push(depot_at);
        }

        Ok(SinglePointResult {
            concentrations,
            residuals_out: vec![central_end, depot_end],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::CalculatorId;
    use crate::parameter::definition::{ParameterDefinition, Variability, VariabilityKind};
    use approx::assert_relative_eq;
    use std::rc::Rc;

    fn fixed(id: ParameterId, value: f64) -> (ParameterDefinition, f64) {
        (ParameterDefinition::fixed(id, value), value)
    }

    fn make_params(values: &[(ParameterId, f64)]) -> ParameterSetEvent {
        let mut event = ParameterSetEvent::new(0.0);
        for &(id, value) in values {
            let (def, v) = fixed(id, value);
            event.add_parameter_event(def, v);
        }
        event
    }

    #[test]
    fn one_compartment_bolus_micro_matches_scenario_1() {
        let intake = IntakeEvent::new(
            0.0,
            1000.0,
            24.0,
            0.0,
            crate::intake::AbsorptionRoute::IntravascularBolus,
            2,
            Rc::new(CalculatorId::OneCompartmentBolusMicro),
        );
        let parameters = make_params(&[(ParameterId::V, 10.0), (ParameterId::Ke, 0.1)]);
        let calc = OneCompBolus { macro_form: false };
        let residuals_in = vec![0.0];

        let result = calc
            .calculate_intake_points(&intake, &parameters, &residuals_in, false, None)
            .unwrap();

        assert_relative_eq!(result.concentrations[0][0], 100.0, max_relative = 1e-9);
        assert_relative_eq!(result.concentrations[0][1], 100.0 * (-2.4_f64).exp(), max_relative = 1e-9);
        assert_relative_eq!(result.residuals_out[0], 100.0 * (-2.4_f64).exp(), max_relative = 1e-9);
    }

    #[test]
    fn one_compartment_infusion_macro_matches_scenario_2() {
        let intake = IntakeEvent::new(
            0.0,
            2000.0,
            8.0,
            1.0,
            crate::intake::AbsorptionRoute::IntravascularInfusion,
            2,
            Rc::new(CalculatorId::OneCompartmentInfusionMacro),
        );
        let parameters = make_params(&[(ParameterId::V, 20.0), (ParameterId::CL, 2.0)]);
        let calc = OneCompInfusion { macro_form: true };
        let residuals_in = vec![0.0];

        let result = calc
            .calculate_intake_points(&intake, &parameters, &residuals_in, false, None)
            .unwrap();

        assert_relative_eq!(result.residuals_out[0], 47.27, max_relative = 1e-2);
    }

    #[test]
    fn interval_zero_forces_residual_to_zero() {
        let intake = IntakeEvent::new(
            0.0,
            100.0,
            0.0,
            0.0,
            crate::intake::AbsorptionRoute::IntravascularBolus,
            2,
            Rc::new(CalculatorId::OneCompartmentBolusMicro),
        );
        let parameters = make_params(&[(ParameterId::V, 10.0), (ParameterId::Ke, 0.1)]);
        let calc = OneCompBolus { macro_form: false };
        let residuals_in = vec![0.0];

        let result = calc
            .calculate_intake_single_point(&intake, &parameters, &residuals_in, 0.0, false)
            .unwrap();
        assert_relative_eq!(result.residuals_out[0], 0.0);
    }
}
